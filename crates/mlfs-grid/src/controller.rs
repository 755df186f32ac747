// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Optimistic cell editing against the remote API.
//!
//! The grid applies a committed edit visually before the controller sees it.
//! The controller then PATCHes the single field and reconciles:
//!
//! - 2xx: the whole row is replaced by the response, since the server may
//!   derive other fields from the patch.
//! - non-2xx: the grid's own undo restores the old value and the server's
//!   field message becomes the notice.
//!
//! Responses are sequenced per cell: only the latest in-flight edit for a
//! `(row, field)` pair may touch the grid. Older responses are discarded, but
//! they still move the cell's baseline (the last value the server holds) and
//! a rejected one still reports its failure.

use std::collections::HashMap;

use mlfs_api::{RemoteData, Request, RequestError};
use mlfs_app::{
    CellEdit, EditSource, LastChange, Notice, PendingEdit, ResourceKind, Row, RowId,
};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::grid::{GridApi, Transaction};
use crate::values::values_equal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UndoReplay,
    Unchanged,
    NothingToRevert,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Skipped(SkipReason),
    Confirmed {
        row_id: RowId,
        field: String,
        notice: Notice,
    },
    Reverted {
        row_id: RowId,
        field: String,
        notice: Notice,
    },
    RolledBack {
        row_id: RowId,
        field: String,
        notice: Notice,
    },
    /// A newer edit to the same cell (or a cancellation) superseded this one.
    /// Carries a notice only when the superseded request was rejected.
    Discarded {
        row_id: RowId,
        field: String,
        notice: Option<Notice>,
    },
}

impl EditOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Confirmed { notice, .. }
            | Self::Reverted { notice, .. }
            | Self::RolledBack { notice, .. } => Some(notice),
            Self::Discarded { notice, .. } => notice.as_ref(),
            Self::Skipped(_) => None,
        }
    }
}

/// Requests outstanding for one cell.
#[derive(Debug, Clone, PartialEq)]
struct CellFlight {
    latest: u64,
    latest_open: bool,
    latest_rejected: bool,
    outstanding: usize,
    baseline: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditController {
    resource: ResourceKind,
    last_change: Option<LastChange>,
    in_flight: HashMap<(RowId, String), CellFlight>,
    next_seq: u64,
}

impl EditController {
    pub fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            last_change: None,
            in_flight: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn last_change(&self) -> Option<&LastChange> {
        self.last_change.as_ref()
    }

    /// Requests sent and not yet resolved.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.values().map(|flight| flight.outstanding).sum()
    }

    /// Forgets every in-flight edit; their responses will be discarded.
    pub fn cancel_all(&mut self) {
        if !self.in_flight.is_empty() {
            tracing::debug!(count = self.in_flight_count(), "canceling in-flight edits");
        }
        self.in_flight.clear();
    }

    /// Idle -> Pending. Undo replays and no-op edits never leave Idle.
    pub fn begin(&mut self, edit: CellEdit) -> Result<PendingEdit, SkipReason> {
        if edit.source == EditSource::UndoReplay {
            return Err(SkipReason::UndoReplay);
        }
        if values_equal(&edit.old_value, &edit.new_value) {
            return Err(SkipReason::Unchanged);
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        match self.in_flight.get_mut(&(edit.row_id, edit.field.clone())) {
            Some(flight) => {
                tracing::debug!(row = %edit.row_id, field = %edit.field, "superseding in-flight edit");
                flight.latest = seq;
                flight.latest_open = true;
                flight.latest_rejected = false;
                flight.outstanding += 1;
            }
            None => {
                self.in_flight.insert(
                    (edit.row_id, edit.field.clone()),
                    CellFlight {
                        latest: seq,
                        latest_open: true,
                        latest_rejected: false,
                        outstanding: 1,
                        baseline: edit.old_value.clone(),
                    },
                );
            }
        }

        Ok(PendingEdit {
            row_id: edit.row_id,
            field: edit.field,
            old_value: edit.old_value,
            new_value: edit.new_value,
            source: edit.source,
            seq,
        })
    }

    pub fn patch_request(&self, pending: &PendingEdit) -> Request {
        let mut body = Map::new();
        body.insert(pending.field.clone(), pending.new_value.clone());
        Request::patch(self.resource.row_path(pending.row_id), Value::Object(body))
    }

    /// Pending -> Confirmed | RolledBack (or Discarded when superseded).
    pub fn resolve<G: GridApi + ?Sized>(
        &mut self,
        grid: &mut G,
        pending: PendingEdit,
        result: Result<Value, RequestError>,
    ) -> EditOutcome {
        let key = (pending.row_id, pending.field.clone());
        let Some(flight) = self.in_flight.get_mut(&key) else {
            tracing::debug!(
                row = %pending.row_id,
                field = %pending.field,
                seq = pending.seq,
                "discarding canceled edit response"
            );
            return EditOutcome::Discarded {
                row_id: pending.row_id,
                field: pending.field,
                notice: None,
            };
        };
        flight.outstanding = flight.outstanding.saturating_sub(1);
        let is_latest = flight.latest == pending.seq && flight.latest_open;
        let baseline = flight.baseline.clone();

        if !is_latest {
            tracing::warn!(
                row = %pending.row_id,
                field = %pending.field,
                seq = pending.seq,
                "discarding superseded edit response"
            );
            let notice = match result {
                // The server now holds this value; a later rollback returns to it.
                Ok(_) if flight.latest_open => {
                    flight.baseline = pending.new_value.clone();
                    None
                }
                // The newer edit was rejected and rolled back, so this response
                // is the server's current row.
                Ok(record) if flight.latest_rejected => {
                    flight.baseline = pending.new_value.clone();
                    if let Ok(row) = Row::from_record(record) {
                        grid.apply_transaction(Transaction { update: vec![row] });
                    }
                    None
                }
                Ok(_) => None,
                Err(error) => Some(Notice::error(failure_message(&pending.field, &error))),
            };
            if flight.outstanding == 0 {
                self.in_flight.remove(&key);
            }
            return EditOutcome::Discarded {
                row_id: pending.row_id,
                field: pending.field,
                notice,
            };
        }

        flight.latest_open = false;
        flight.latest_rejected = result.is_err();
        if result.is_ok() {
            flight.baseline = pending.new_value.clone();
        }
        if flight.outstanding == 0 {
            self.in_flight.remove(&key);
        }

        match result {
            Ok(record) => self.confirm(grid, pending, baseline, record),
            Err(error) => self.roll_back(grid, pending, baseline, &error),
        }
    }

    /// Synchronous round trip for one grid edit.
    pub fn apply_edit<G, R>(&mut self, grid: &mut G, remote: &R, edit: CellEdit) -> EditOutcome
    where
        G: GridApi + ?Sized,
        R: RemoteData + ?Sized,
    {
        let pending = match self.begin(edit) {
            Ok(pending) => pending,
            Err(reason) => return EditOutcome::Skipped(reason),
        };
        let result = remote.send(&self.patch_request(&pending));
        self.resolve(grid, pending, result)
    }

    /// Starts a manual revert of the last confirmed change. The record is
    /// cleared here, so it is gone whatever the round trip's outcome.
    ///
    /// When the row is still loaded the old value goes through the grid's
    /// setter so the cell updates immediately; otherwise the old value is
    /// patched with no grid mutation.
    pub fn begin_revert<G: GridApi + ?Sized>(
        &mut self,
        grid: &mut G,
    ) -> Result<PendingEdit, SkipReason> {
        let Some(last) = self.last_change.take() else {
            return Err(SkipReason::NothingToRevert);
        };

        let edit = match grid.set_data_value(
            last.row_id,
            &last.field,
            last.old_value.clone(),
            EditSource::ManualRevert,
        ) {
            Some(edit) => edit,
            None => {
                tracing::debug!(row = %last.row_id, field = %last.field, "reverting row that is not loaded");
                CellEdit {
                    row_id: last.row_id,
                    field: last.field,
                    old_value: last.new_value,
                    new_value: last.old_value,
                    source: EditSource::ManualRevert,
                }
            }
        };
        self.begin(edit)
    }

    pub fn revert_last<G, R>(&mut self, grid: &mut G, remote: &R) -> EditOutcome
    where
        G: GridApi + ?Sized,
        R: RemoteData + ?Sized,
    {
        let pending = match self.begin_revert(grid) {
            Ok(pending) => pending,
            Err(reason) => return EditOutcome::Skipped(reason),
        };
        let result = remote.send(&self.patch_request(&pending));
        self.resolve(grid, pending, result)
    }

    fn confirm<G: GridApi + ?Sized>(
        &mut self,
        grid: &mut G,
        pending: PendingEdit,
        baseline: Value,
        record: Value,
    ) -> EditOutcome {
        match Row::from_record(record) {
            Ok(row) => {
                grid.apply_transaction(Transaction { update: vec![row] });
            }
            Err(error) => {
                tracing::warn!(row = %pending.row_id, field = %pending.field, "keeping optimistic value: {error:#}");
            }
        }

        if pending.source == EditSource::ManualRevert {
            tracing::info!(row = %pending.row_id, field = %pending.field, "change reverted");
            self.last_change = None;
            return EditOutcome::Reverted {
                row_id: pending.row_id,
                notice: Notice::success(format!("Reverted {}", pending.field)),
                field: pending.field,
            };
        }

        tracing::info!(row = %pending.row_id, field = %pending.field, "edit confirmed");
        let notice = Notice::success(format!("Updated {}", pending.field));
        self.last_change = Some(LastChange {
            row_id: pending.row_id,
            field: pending.field.clone(),
            old_value: baseline,
            new_value: pending.new_value,
            confirmed_at: OffsetDateTime::now_utc(),
        });
        EditOutcome::Confirmed {
            row_id: pending.row_id,
            field: pending.field,
            notice,
        }
    }

    /// Restores `baseline`, the last value the server accepted for the cell.
    /// It differs from `pending.old_value` when an earlier overlapping edit
    /// was rejected.
    fn roll_back<G: GridApi + ?Sized>(
        &mut self,
        grid: &mut G,
        pending: PendingEdit,
        baseline: Value,
        error: &RequestError,
    ) -> EditOutcome {
        tracing::warn!(row = %pending.row_id, field = %pending.field, "edit rejected: {error}");

        let top_is_this_edit = grid.peek_undo().is_some_and(|top| {
            top.row_id == pending.row_id
                && top.field == pending.field
                && values_equal(&top.new_value, &pending.new_value)
        });
        if top_is_this_edit {
            grid.undo_cell_editing();
        }
        // Undo history may not hold this edit (evicted, or another cell edited
        // since); force the old value in that case.
        let current = grid
            .row(pending.row_id)
            .map(|row| row.value(&pending.field));
        if let Some(current) = current
            && !values_equal(&current, &baseline)
        {
            grid.set_data_value(pending.row_id, &pending.field, baseline, EditSource::UndoReplay);
        }

        if pending.source == EditSource::ManualRevert {
            self.last_change = None;
        }

        EditOutcome::RolledBack {
            row_id: pending.row_id,
            notice: Notice::error(failure_message(&pending.field, error)),
            field: pending.field,
        }
    }
}

/// The server's message for `field` when it sent one, else a generic line.
fn failure_message(field: &str, error: &RequestError) -> String {
    match error {
        RequestError::Status { .. } => error
            .message_for(field)
            .unwrap_or_else(|| format!("Failed to update {field}")),
        other => format!("Failed to update {field}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{EditController, EditOutcome, SkipReason};
    use crate::grid::{GridApi, MemoryGrid};
    use anyhow::Result;
    use mlfs_api::RequestError;
    use mlfs_app::{CellEdit, ColumnDef, EditSource, Editable, ResourceKind, Row, RowId};
    use serde_json::json;

    fn grid() -> Result<MemoryGrid> {
        Ok(MemoryGrid::new(
            vec![
                ColumnDef::text("title", "Title").editable(Editable::Always),
                ColumnDef::text("remarks", "Remarks").editable(Editable::Always),
            ],
            vec![Row::from_record(json!({"id": 4, "title": "Old", "remarks": ""}))?],
        ))
    }

    fn user_edit(grid: &mut MemoryGrid, field: &str, value: &str) -> CellEdit {
        grid.set_data_value(RowId::new(4), field, json!(value), EditSource::User)
            .expect("row 4 is loaded")
    }

    #[test]
    fn patch_request_targets_row_path_with_single_field() -> Result<()> {
        let mut grid = grid()?;
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);
        let edit = user_edit(&mut grid, "title", "New");
        let pending = controller.begin(edit).expect("pending");

        let request = controller.patch_request(&pending);
        assert_eq!(request.path, "api/projects/4/");
        assert_eq!(request.body, Some(json!({"title": "New"})));
        assert_eq!(request.method, mlfs_api::Method::Patch);
        Ok(())
    }

    #[test]
    fn undo_replays_are_skipped() {
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);
        let result = controller.begin(CellEdit {
            row_id: RowId::new(4),
            field: "title".to_owned(),
            old_value: json!("a"),
            new_value: json!("b"),
            source: EditSource::UndoReplay,
        });
        assert_eq!(result, Err(SkipReason::UndoReplay));
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[test]
    fn out_of_order_response_is_discarded() -> Result<()> {
        let mut grid = grid()?;
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);

        let first = user_edit(&mut grid, "title", "First");
        let first = controller.begin(first).expect("first pending");
        let second = user_edit(&mut grid, "title", "Second");
        let second = controller.begin(second).expect("second pending");

        let outcome = controller.resolve(
            &mut grid,
            second,
            Ok(json!({"id": 4, "title": "Second", "remarks": ""})),
        );
        assert!(matches!(outcome, EditOutcome::Confirmed { .. }));

        let stale = controller.resolve(
            &mut grid,
            first,
            Ok(json!({"id": 4, "title": "First", "remarks": ""})),
        );
        assert!(matches!(stale, EditOutcome::Discarded { .. }));
        assert_eq!(
            grid.row(RowId::new(4)).map(|row| row.value("title")),
            Some(json!("Second"))
        );
        Ok(())
    }

    #[test]
    fn cancel_all_discards_late_responses() -> Result<()> {
        let mut grid = grid()?;
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);
        let edit = user_edit(&mut grid, "title", "New");
        let pending = controller.begin(edit).expect("pending");

        controller.cancel_all();
        let outcome = controller.resolve(&mut grid, pending, Err(RequestError::status(500, json!({}))));
        assert!(matches!(outcome, EditOutcome::Discarded { .. }));
        assert_eq!(controller.last_change(), None);
        Ok(())
    }

    #[test]
    fn rollback_restores_old_value_when_other_cell_edited_meanwhile() -> Result<()> {
        let mut grid = grid()?;
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);

        let title = user_edit(&mut grid, "title", "New");
        let title = controller.begin(title).expect("title pending");
        let _remarks = user_edit(&mut grid, "remarks", "checked");

        let outcome = controller.resolve(
            &mut grid,
            title,
            Err(RequestError::status(400, json!({"title": ["Title is locked"]}))),
        );
        let notice = outcome.notice().expect("notice");
        assert!(notice.is_error());
        assert_eq!(notice.message, "Title is locked");

        let row = grid.row(RowId::new(4)).expect("row");
        assert_eq!(row.value("title"), json!("Old"));
        assert_eq!(row.value("remarks"), json!("checked"));
        Ok(())
    }

    #[test]
    fn connection_failure_uses_generic_message() -> Result<()> {
        let mut grid = grid()?;
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);
        let edit = user_edit(&mut grid, "title", "New");
        let pending = controller.begin(edit).expect("pending");

        let outcome = controller.resolve(
            &mut grid,
            pending,
            Err(RequestError::Connection {
                url: "http://127.0.0.1:1/api/projects/4/".to_owned(),
                message: "connection refused".to_owned(),
            }),
        );
        let notice = outcome.notice().expect("notice");
        assert!(notice.message.starts_with("Failed to update title"));
        assert!(notice.message.contains("connection refused"));
        Ok(())
    }

    #[test]
    fn revert_without_last_change_is_skipped() -> Result<()> {
        let mut grid = grid()?;
        let mut controller = EditController::new(ResourceKind::ProjectSubmissions);
        assert_eq!(
            controller.begin_revert(&mut grid),
            Err(SkipReason::NothingToRevert)
        );
        Ok(())
    }
}
