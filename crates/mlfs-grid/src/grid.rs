// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use mlfs_app::{CellEdit, ColumnDef, EditSource, Row, RowId, ValueFormat};
use serde_json::Value;

use crate::adapter::OptionLookup;
use crate::values::{parse_input, values_equal};

pub const UNDO_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transaction {
    pub update: Vec<Row>,
}

/// Imperative handle onto a grid widget.
pub trait GridApi {
    fn row(&self, id: RowId) -> Option<&Row>;

    /// Sets a cell and reports the change. `None` when the row is not loaded.
    fn set_data_value(
        &mut self,
        id: RowId,
        field: &str,
        value: Value,
        source: EditSource,
    ) -> Option<CellEdit>;

    /// Replays the most recent recorded cell edit in reverse.
    fn undo_cell_editing(&mut self) -> Option<CellEdit>;

    fn peek_undo(&self) -> Option<&CellEdit>;

    /// Replaces loaded rows by id; unknown ids are ignored. Returns the number
    /// of rows replaced.
    fn apply_transaction(&mut self, transaction: Transaction) -> usize;
}

/// Server-derived display text set aside while its source cell holds a value
/// the server has not confirmed.
#[derive(Debug, Clone, PartialEq)]
struct HiddenDisplay {
    field: String,
    source_value: Value,
    text: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryGrid {
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    undo: Vec<CellEdit>,
    hidden_displays: HashMap<(RowId, String), HiddenDisplay>,
}

impl MemoryGrid {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            undo: Vec::new(),
            hidden_displays: HashMap::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.field == field)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_at(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replaces all rows. The undo history refers to the old rows and is dropped.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.undo.clear();
        self.hidden_displays.clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// User edit path: checks editability, parses the raw input for the
    /// column's editor, and applies it.
    pub fn commit_input(
        &mut self,
        id: RowId,
        field: &str,
        input: &str,
        lookup: &OptionLookup,
    ) -> Result<CellEdit> {
        let row = self
            .row(id)
            .ok_or_else(|| anyhow!("row {id} is no longer loaded"))?;
        let column = self
            .column(field)
            .ok_or_else(|| anyhow!("unknown column {field:?}"))?;
        if !column.is_editable(row) {
            bail!("{} is not editable for this row", column.label);
        }
        let options = lookup.options_for(column, row);
        let value = parse_input(&column.editor, input, &options)
            .map_err(|error| anyhow!("{}: {error}", column.label))?;
        self.set_data_value(id, field, value, EditSource::User)
            .ok_or_else(|| anyhow!("row {id} is no longer loaded"))
    }

    fn row_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    fn display_field(&self, field: &str) -> Option<String> {
        match &self.column(field)?.format {
            ValueFormat::DisplayField(display) => Some(display.clone()),
            _ => None,
        }
    }

    /// Writes a cell. A column rendered through a display field hides that
    /// field while the cell differs from the value the display was derived
    /// from, and shows it again once the cell returns to that value.
    fn write_cell(&mut self, id: RowId, field: &str, value: Value) -> bool {
        let display = self.display_field(field);
        let Some(row) = self.rows.iter_mut().find(|row| row.id == id) else {
            return false;
        };
        let previous = row.value(field);
        row.set(field, value.clone());

        let Some(display) = display else {
            return true;
        };
        let key = (id, field.to_owned());
        match self.hidden_displays.get(&key) {
            Some(hidden) if values_equal(&hidden.source_value, &value) => {
                if let Some(hidden) = self.hidden_displays.remove(&key) {
                    row.set(&hidden.field, hidden.text);
                }
            }
            Some(_) => {}
            None => {
                if row.is_set(&display)
                    && let Some(text) = row.fields.remove(&display)
                {
                    self.hidden_displays.insert(
                        key,
                        HiddenDisplay {
                            field: display,
                            source_value: previous,
                            text,
                        },
                    );
                }
            }
        }
        true
    }

    fn record_undo(&mut self, edit: CellEdit) {
        self.undo.push(edit);
        if self.undo.len() > UNDO_LIMIT {
            self.undo.remove(0);
        }
    }
}

impl GridApi for MemoryGrid {
    fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    fn set_data_value(
        &mut self,
        id: RowId,
        field: &str,
        value: Value,
        source: EditSource,
    ) -> Option<CellEdit> {
        let old_value = self.row(id)?.value(field);
        let edit = CellEdit {
            row_id: id,
            field: field.to_owned(),
            old_value,
            new_value: value,
            source,
        };
        if values_equal(&edit.old_value, &edit.new_value) {
            return Some(edit);
        }
        self.write_cell(id, field, edit.new_value.clone());
        if source != EditSource::UndoReplay {
            self.record_undo(edit.clone());
        }
        Some(edit)
    }

    fn undo_cell_editing(&mut self) -> Option<CellEdit> {
        let last = self.undo.pop()?;
        if !self.write_cell(last.row_id, &last.field, last.old_value.clone()) {
            return None;
        }
        Some(CellEdit {
            row_id: last.row_id,
            field: last.field,
            old_value: last.new_value,
            new_value: last.old_value,
            source: EditSource::UndoReplay,
        })
    }

    fn peek_undo(&self) -> Option<&CellEdit> {
        self.undo.last()
    }

    fn apply_transaction(&mut self, transaction: Transaction) -> usize {
        let mut replaced = 0;
        for update in transaction.update {
            self.hidden_displays
                .retain(|(row_id, _), _| *row_id != update.id);
            if let Some(row) = self.row_mut(update.id) {
                *row = update;
                replaced += 1;
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::{GridApi, MemoryGrid, Transaction, UNDO_LIMIT};
    use crate::adapter::OptionLookup;
    use crate::values::format_value;
    use anyhow::Result;
    use mlfs_app::{ColumnDef, EditSource, Editable, Row, RowId, ValueFormat};
    use serde_json::json;

    fn grid() -> Result<MemoryGrid> {
        let columns = vec![
            ColumnDef::text("title", "Title").editable(Editable::Always),
            ColumnDef::number("funds_allocated", "Funds").editable(Editable::Always),
            ColumnDef::text("code", "Code"),
        ];
        let rows = vec![
            Row::from_record(json!({"id": 1, "title": "HPMP stage II", "funds_allocated": 1000, "code": "ARG/PHA/90/01"}))?,
            Row::from_record(json!({"id": 2, "title": "Chiller demo", "funds_allocated": 250, "code": "BRA/REF/88/02"}))?,
        ];
        Ok(MemoryGrid::new(columns, rows))
    }

    #[test]
    fn set_and_undo_restore_previous_value() -> Result<()> {
        let mut grid = grid()?;
        let edit = grid
            .set_data_value(RowId::new(1), "funds_allocated", json!(-5), EditSource::User)
            .expect("row exists");
        assert_eq!(edit.old_value, json!(1000));
        assert_eq!(grid.row(RowId::new(1)).map(|r| r.value("funds_allocated")), Some(json!(-5)));

        let replay = grid.undo_cell_editing().expect("undo entry");
        assert_eq!(replay.source, EditSource::UndoReplay);
        assert_eq!(replay.new_value, json!(1000));
        assert_eq!(grid.row(RowId::new(1)).map(|r| r.value("funds_allocated")), Some(json!(1000)));
        assert_eq!(grid.undo_depth(), 0);
        Ok(())
    }

    #[test]
    fn unchanged_and_replayed_values_are_not_recorded() -> Result<()> {
        let mut grid = grid()?;
        grid.set_data_value(RowId::new(1), "funds_allocated", json!(1000.0), EditSource::User);
        grid.set_data_value(RowId::new(2), "title", json!("x"), EditSource::UndoReplay);
        assert_eq!(grid.undo_depth(), 0);
        Ok(())
    }

    #[test]
    fn set_on_missing_row_reports_none() -> Result<()> {
        let mut grid = grid()?;
        assert!(grid
            .set_data_value(RowId::new(99), "title", json!("x"), EditSource::User)
            .is_none());
        Ok(())
    }

    #[test]
    fn undo_history_is_bounded() -> Result<()> {
        let mut grid = grid()?;
        for step in 0..(UNDO_LIMIT + 5) {
            grid.set_data_value(RowId::new(2), "funds_allocated", json!(step + 1_000), EditSource::User);
        }
        assert_eq!(grid.undo_depth(), UNDO_LIMIT);
        Ok(())
    }

    #[test]
    fn transaction_replaces_known_rows_only() -> Result<()> {
        let mut grid = grid()?;
        let replaced = grid.apply_transaction(Transaction {
            update: vec![
                Row::from_record(json!({"id": 2, "title": "Chiller demo (revised)"}))?,
                Row::from_record(json!({"id": 50, "title": "not loaded"}))?,
            ],
        });
        assert_eq!(replaced, 1);
        let row = grid.row(RowId::new(2)).expect("row 2");
        assert_eq!(row.value("title"), json!("Chiller demo (revised)"));
        assert_eq!(row.value("funds_allocated"), json!(null));
        assert_eq!(grid.len(), 2);
        Ok(())
    }

    #[test]
    fn commit_input_parses_and_rejects_read_only_columns() -> Result<()> {
        let mut grid = grid()?;
        let lookup = OptionLookup::default();

        let edit = grid.commit_input(RowId::new(1), "funds_allocated", "2,500", &lookup)?;
        assert_eq!(edit.new_value, json!(2500));
        assert_eq!(edit.source, EditSource::User);

        let error = grid
            .commit_input(RowId::new(1), "code", "X", &lookup)
            .expect_err("code is read-only");
        assert!(error.to_string().contains("not editable"));

        let error = grid
            .commit_input(RowId::new(1), "funds_allocated", "lots", &lookup)
            .expect_err("bad number");
        assert!(error.to_string().contains("invalid number"));
        Ok(())
    }

    fn status_grid() -> Result<MemoryGrid> {
        let columns = vec![
            ColumnDef::text("status", "Status")
                .editable(Editable::Always)
                .format(ValueFormat::DisplayField("status_display".to_owned())),
        ];
        let rows = vec![Row::from_record(
            json!({"id": 3, "status": "Pending", "status_display": "Pending review"}),
        )?];
        Ok(MemoryGrid::new(columns, rows))
    }

    #[test]
    fn unconfirmed_value_hides_stale_display_until_undone() -> Result<()> {
        let mut grid = status_grid()?;
        grid.set_data_value(RowId::new(3), "status", json!("Approved"), EditSource::User);
        let row = grid.row(RowId::new(3)).expect("row 3");
        assert!(!row.is_set("status_display"));
        assert_eq!(
            format_value(&grid.columns()[0].format, row, "status"),
            "Approved"
        );

        grid.undo_cell_editing().expect("undo entry");
        let row = grid.row(RowId::new(3)).expect("row 3");
        assert_eq!(row.value("status_display"), json!("Pending review"));
        assert_eq!(
            format_value(&grid.columns()[0].format, row, "status"),
            "Pending review"
        );
        Ok(())
    }

    #[test]
    fn forced_old_value_restores_display_after_several_edits() -> Result<()> {
        let mut grid = status_grid()?;
        grid.set_data_value(RowId::new(3), "status", json!("Approved"), EditSource::User);
        grid.set_data_value(RowId::new(3), "status", json!("Rejected"), EditSource::User);
        assert!(!grid.row(RowId::new(3)).expect("row 3").is_set("status_display"));

        grid.set_data_value(RowId::new(3), "status", json!("Pending"), EditSource::UndoReplay);
        let row = grid.row(RowId::new(3)).expect("row 3");
        assert_eq!(row.value("status_display"), json!("Pending review"));
        Ok(())
    }

    #[test]
    fn transaction_drops_hidden_display_for_replaced_row() -> Result<()> {
        let mut grid = status_grid()?;
        grid.set_data_value(RowId::new(3), "status", json!("Approved"), EditSource::User);
        grid.apply_transaction(Transaction {
            update: vec![Row::from_record(
                json!({"id": 3, "status": "Approved", "status_display": "Approved (final)"}),
            )?],
        });
        grid.set_data_value(RowId::new(3), "status", json!("Pending"), EditSource::UndoReplay);
        grid.set_data_value(RowId::new(3), "status", json!("Approved"), EditSource::UndoReplay);
        let row = grid.row(RowId::new(3)).expect("row 3");
        assert_eq!(row.value("status_display"), json!("Approved (final)"));
        Ok(())
    }

    #[test]
    fn set_rows_drops_undo_history() -> Result<()> {
        let mut grid = grid()?;
        grid.set_data_value(RowId::new(1), "title", json!("new"), EditSource::User);
        grid.set_rows(Vec::new());
        assert_eq!(grid.undo_depth(), 0);
        assert!(grid.is_empty());
        Ok(())
    }
}
