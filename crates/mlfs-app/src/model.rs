// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    BusinessPlanActivities,
    CountryProgrammeRecords,
    ProjectSubmissions,
    Contributions,
}

impl ResourceKind {
    pub const ALL: [Self; 4] = [
        Self::BusinessPlanActivities,
        Self::CountryProgrammeRecords,
        Self::ProjectSubmissions,
        Self::Contributions,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BusinessPlanActivities => "business_plans",
            Self::CountryProgrammeRecords => "country_programme",
            Self::ProjectSubmissions => "projects",
            Self::Contributions => "contributions",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "business_plans" => Some(Self::BusinessPlanActivities),
            "country_programme" => Some(Self::CountryProgrammeRecords),
            "projects" => Some(Self::ProjectSubmissions),
            "contributions" => Some(Self::Contributions),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BusinessPlanActivities => "Business plans",
            Self::CountryProgrammeRecords => "Country programme",
            Self::ProjectSubmissions => "Project submissions",
            Self::Contributions => "Contributions",
        }
    }

    /// Collection path relative to the API root, without leading or trailing slash.
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::BusinessPlanActivities => "api/business-plan-activity",
            Self::CountryProgrammeRecords => "api/country-programme/records",
            Self::ProjectSubmissions => "api/projects",
            Self::Contributions => "api/replenishment/contributions",
        }
    }

    pub fn row_path(self, id: RowId) -> String {
        format!("{}/{}/", self.api_path(), id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowType {
    Skeleton,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub row_type: Option<RowType>,
    pub fields: Map<String, Value>,
}

impl Row {
    pub fn new(id: RowId, fields: Map<String, Value>) -> Self {
        Self {
            id,
            row_type: None,
            fields,
        }
    }

    pub fn skeleton(id: RowId) -> Self {
        Self {
            id,
            row_type: Some(RowType::Skeleton),
            fields: Map::new(),
        }
    }

    /// Builds a row from a server record. The record must be an object with an
    /// integer `id`.
    pub fn from_record(record: Value) -> Result<Self> {
        if !record.is_object() {
            bail!("expected a JSON object for a row record, got {record}");
        }
        let id = RowId::of_record(&record)
            .ok_or_else(|| anyhow!("row record is missing an integer `id` field"))?;
        let Value::Object(fields) = record else {
            bail!("expected a JSON object for a row record");
        };
        Ok(Self::new(id, fields))
    }

    pub fn is_skeleton(&self) -> bool {
        self.row_type == Some(RowType::Skeleton)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn value(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_owned(), value);
    }

    /// A field counts as set when it is present, non-null, and not an empty string.
    pub fn is_set(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Editable {
    Never,
    Always,
    /// Editable only once the named parent field is set on the row.
    WhenSet(String),
}

impl Editable {
    pub fn allows(&self, row: &Row) -> bool {
        if row.is_skeleton() {
            return false;
        }
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::WhenSet(parent) => row.is_set(parent),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionSource {
    Static(Vec<SelectOption>),
    /// A named option list loaded at runtime.
    Lookup(String),
    /// A named lookup keyed by the parent field's value, e.g. sector to subsectors.
    DependsOn { parent: String, lookup: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorKind {
    Text,
    Number,
    Select(OptionSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFormat {
    Plain,
    Grouped { decimals: u8 },
    Percent,
    /// Render the value of another field, falling back to this column's own value.
    DisplayField(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub field: String,
    pub label: String,
    pub editable: Editable,
    pub editor: EditorKind,
    pub format: ValueFormat,
    pub width: u16,
}

impl ColumnDef {
    pub fn text(field: &str, label: &str) -> Self {
        Self {
            field: field.to_owned(),
            label: label.to_owned(),
            editable: Editable::Never,
            editor: EditorKind::Text,
            format: ValueFormat::Plain,
            width: 16,
        }
    }

    pub fn number(field: &str, label: &str) -> Self {
        Self {
            editor: EditorKind::Number,
            format: ValueFormat::Grouped { decimals: 2 },
            width: 14,
            ..Self::text(field, label)
        }
    }

    pub fn select(field: &str, label: &str, source: OptionSource) -> Self {
        Self {
            editor: EditorKind::Select(source),
            ..Self::text(field, label)
        }
    }

    pub fn editable(mut self, editable: Editable) -> Self {
        self.editable = editable;
        self
    }

    pub fn format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn is_editable(&self, row: &Row) -> bool {
        self.editable.allows(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    EditCell,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}
