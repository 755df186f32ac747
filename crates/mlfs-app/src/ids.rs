// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Server primary key of a record. Stable across reloads, so the grid and
/// the edit controller locate rows by it rather than by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(i64);

impl RowId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Reads the `id` field of a record, if it is an integer.
    pub fn of_record(record: &Value) -> Option<Self> {
        record.get("id").and_then(Value::as_i64).map(Self)
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::RowId;
    use serde_json::json;

    #[test]
    fn record_id_must_be_integer() {
        assert_eq!(RowId::of_record(&json!({"id": 12})), Some(RowId::new(12)));
        assert_eq!(RowId::of_record(&json!({"id": "12"})), None);
        assert_eq!(RowId::of_record(&json!({"title": "x"})), None);
    }
}
