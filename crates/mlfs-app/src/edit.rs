// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use time::OffsetDateTime;

use crate::ids::RowId;

/// Where a cell change came from. Carried through the edit pipeline so that
/// grid-driven undo replays never produce requests of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditSource {
    User,
    UndoReplay,
    ManualRevert,
}

/// A committed cell change as reported by the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row_id: RowId,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub source: EditSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub row_id: RowId,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub source: EditSource,
    pub seq: u64,
}

impl PendingEdit {
    pub fn cell(&self) -> (RowId, &str) {
        (self.row_id, self.field.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LastChange {
    pub row_id: RowId,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub confirmed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}
