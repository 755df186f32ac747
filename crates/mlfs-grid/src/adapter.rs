// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use mlfs_app::{ColumnDef, EditorKind, OptionSource, Row, RowId, SelectOption};
use serde_json::Value;

use crate::values::{display_value, format_value, values_equal};

/// Side tables for select editors: named flat lists and named lists keyed by
/// a parent value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionLookup {
    lists: BTreeMap<String, Vec<SelectOption>>,
    keyed: BTreeMap<String, BTreeMap<String, Vec<SelectOption>>>,
}

impl OptionLookup {
    pub fn set_list(&mut self, name: &str, options: Vec<SelectOption>) {
        self.lists.insert(name.to_owned(), options);
    }

    pub fn push_keyed(&mut self, name: &str, parent: &Value, option: SelectOption) {
        self.keyed
            .entry(name.to_owned())
            .or_default()
            .entry(lookup_key(parent))
            .or_default()
            .push(option);
    }

    pub fn list(&self, name: &str) -> &[SelectOption] {
        self.lists.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn keyed(&self, name: &str, parent: &Value) -> &[SelectOption] {
        self.keyed
            .get(name)
            .and_then(|table| table.get(&lookup_key(parent)))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Choices for `column` on `row`. Dependent columns with an unset parent
    /// get an empty list.
    pub fn options_for(&self, column: &ColumnDef, row: &Row) -> Vec<SelectOption> {
        let EditorKind::Select(source) = &column.editor else {
            return Vec::new();
        };
        match source {
            OptionSource::Static(options) => options.clone(),
            OptionSource::Lookup(name) => self.list(name).to_vec(),
            OptionSource::DependsOn { parent, lookup } => {
                if !row.is_set(parent) {
                    return Vec::new();
                }
                self.keyed(lookup, &row.value(parent)).to_vec()
            }
        }
    }
}

fn lookup_key(value: &Value) -> String {
    display_value(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub field: String,
    pub label: String,
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub text: String,
    pub editable: bool,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: RowId,
    pub skeleton: bool,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridView {
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
}

pub fn build_view(rows: &[Row], columns: &[ColumnDef], lookup: &OptionLookup) -> GridView {
    GridView {
        columns: columns
            .iter()
            .map(|column| ColumnView {
                field: column.field.clone(),
                label: column.label.clone(),
                width: column.width,
            })
            .collect(),
        rows: rows
            .iter()
            .map(|row| build_row(row, columns, lookup))
            .collect(),
    }
}

fn build_row(row: &Row, columns: &[ColumnDef], lookup: &OptionLookup) -> RowView {
    if row.is_skeleton() {
        return RowView {
            id: row.id,
            skeleton: true,
            cells: columns
                .iter()
                .map(|_| CellView {
                    text: String::new(),
                    editable: false,
                    options: Vec::new(),
                })
                .collect(),
        };
    }

    RowView {
        id: row.id,
        skeleton: false,
        cells: columns
            .iter()
            .map(|column| build_cell(row, column, lookup))
            .collect(),
    }
}

pub fn build_cell(row: &Row, column: &ColumnDef, lookup: &OptionLookup) -> CellView {
    let options = lookup.options_for(column, row);
    let mut editable = column.is_editable(row);
    if matches!(
        column.editor,
        EditorKind::Select(OptionSource::DependsOn { .. })
    ) && options.is_empty()
    {
        editable = false;
    }

    let text = match &column.editor {
        EditorKind::Select(_) if matches!(column.format, mlfs_app::ValueFormat::Plain) => {
            let value = row.value(&column.field);
            options
                .iter()
                .find(|option| values_equal(&option.value, &value))
                .map_or_else(|| display_value(&value), |option| option.label.clone())
        }
        _ => format_value(&column.format, row, &column.field),
    };

    CellView {
        text,
        editable,
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::{OptionLookup, build_view};
    use anyhow::Result;
    use mlfs_app::{ColumnDef, Editable, OptionSource, Row, RowId, SelectOption};
    use serde_json::json;

    fn lookup() -> OptionLookup {
        let mut lookup = OptionLookup::default();
        lookup.set_list(
            "sectors",
            vec![
                SelectOption::new(1, "Refrigeration"),
                SelectOption::new(2, "Foam"),
            ],
        );
        lookup.push_keyed("subsectors", &json!(1), SelectOption::new(10, "Domestic"));
        lookup.push_keyed("subsectors", &json!(1), SelectOption::new(11, "Commercial"));
        lookup
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::select(
                "sector_id",
                "Sector",
                OptionSource::Lookup("sectors".to_owned()),
            )
            .editable(Editable::Always),
            ColumnDef::select(
                "subsector_id",
                "Subsector",
                OptionSource::DependsOn {
                    parent: "sector_id".to_owned(),
                    lookup: "subsectors".to_owned(),
                },
            )
            .editable(Editable::WhenSet("sector_id".to_owned())),
        ]
    }

    #[test]
    fn subsector_options_follow_selected_sector() -> Result<()> {
        let rows = vec![
            Row::from_record(json!({"id": 1, "sector_id": 1, "subsector_id": 11}))?,
            Row::from_record(json!({"id": 2, "sector_id": null, "subsector_id": null}))?,
            Row::from_record(json!({"id": 3, "sector_id": 2, "subsector_id": null}))?,
        ];
        let view = build_view(&rows, &columns(), &lookup());

        let first = &view.rows[0];
        assert_eq!(first.cells[0].text, "Refrigeration");
        assert_eq!(first.cells[1].text, "Commercial");
        assert!(first.cells[1].editable);
        assert_eq!(first.cells[1].options.len(), 2);

        let unset = &view.rows[1];
        assert!(unset.cells[1].options.is_empty());
        assert!(!unset.cells[1].editable);

        // Sector with no eligible subsectors: empty list, not an error.
        let no_children = &view.rows[2];
        assert!(no_children.cells[1].options.is_empty());
        assert!(!no_children.cells[1].editable);
        Ok(())
    }

    #[test]
    fn skeleton_rows_render_blank_and_read_only() {
        let rows = vec![Row::skeleton(RowId::new(-1))];
        let view = build_view(&rows, &columns(), &lookup());
        assert!(view.rows[0].skeleton);
        assert!(view.rows[0].cells.iter().all(|cell| cell.text.is_empty() && !cell.editable));
    }

    #[test]
    fn column_views_keep_labels_and_order() {
        let view = build_view(&[], &columns(), &lookup());
        let labels = view
            .columns
            .iter()
            .map(|column| column.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Sector", "Subsector"]);
    }
}
