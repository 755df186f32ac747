// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use mlfs_api::{Method, RemoteData, Request, RequestError};
use mlfs_app::ResourceKind;
use serde_json::{Map, Value, json};

use crate::{
    MlfsFaker, SECTORS, plan_statuses, project_statuses, sector_table, status_display,
    subsector_parent, subsector_table,
};

const READ_ONLY: [&str; 7] = [
    "id",
    "code",
    "country",
    "agency",
    "year",
    "status_display",
    "outstanding_contributions",
];

const NUMERIC: [&str; 11] = [
    "funds_allocated",
    "imports",
    "exports",
    "production",
    "total_fund",
    "support_cost_psc",
    "agreed_contributions",
    "cash_payments",
    "bilateral_assistance",
    "promissory_notes",
    "outstanding_contributions",
];

type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Sectors,
    Subsectors,
    Collection(ResourceKind),
    Item(ResourceKind, i64),
}

/// In-memory stand-in for the REST backend: serves list pages and applies
/// PATCHes with the server's validation and derived fields.
#[derive(Debug, Default)]
pub struct DemoBackend {
    tables: Mutex<BTreeMap<&'static str, Vec<Record>>>,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64, rows_per_resource: usize) -> Self {
        let backend = Self::new();
        let mut faker = MlfsFaker::new(seed);
        for resource in ResourceKind::ALL {
            for record in faker.records(resource, rows_per_resource) {
                backend.insert(resource, record);
            }
        }
        backend
    }

    /// Inserts or replaces a record by `id`. Non-object values are ignored.
    pub fn insert(&self, resource: ResourceKind, record: Value) {
        let Value::Object(record) = record else {
            return;
        };
        let id = record.get("id").and_then(Value::as_i64);
        let mut tables = lock(&self.tables);
        let table = tables.entry(resource.as_str()).or_default();
        match table
            .iter_mut()
            .find(|existing| existing.get("id").and_then(Value::as_i64) == id)
        {
            Some(existing) => *existing = record,
            None => table.push(record),
        }
    }

    pub fn record(&self, resource: ResourceKind, id: i64) -> Option<Value> {
        lock(&self.tables)
            .get(resource.as_str())
            .and_then(|table| find(table, id))
            .map(|record| Value::Object(record.clone()))
    }

    pub fn len(&self, resource: ResourceKind) -> usize {
        lock(&self.tables)
            .get(resource.as_str())
            .map_or(0, Vec::len)
    }

    fn list_page(&self, resource: ResourceKind, params: &[(String, String)]) -> Value {
        let tables = lock(&self.tables);
        let mut rows = tables
            .get(resource.as_str())
            .map(|table| {
                table
                    .iter()
                    .filter(|record| matches_filters(record, params))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(ordering) = param(params, "ordering") {
            let (field, descending) = match ordering.strip_prefix('-') {
                Some(field) => (field, true),
                None => (ordering, false),
            };
            rows.sort_by(|a, b| {
                let order = compare_values(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                );
                if descending { order.reverse() } else { order }
            });
        }

        let count = rows.len();
        let offset = param(params, "offset")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);
        let limit = param(params, "limit")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(count);
        let results = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(Value::Object)
            .collect::<Vec<_>>();
        json!({"count": count, "results": results})
    }

    fn patch(&self, resource: ResourceKind, id: i64, body: &Value) -> Result<Value, RequestError> {
        let Value::Object(changes) = body else {
            return Err(RequestError::status(
                400,
                json!({"non_field_errors": ["Invalid data. Expected a dictionary."]}),
            ));
        };

        let mut tables = lock(&self.tables);
        let table = tables.entry(resource.as_str()).or_default();
        let Some(existing) = table
            .iter_mut()
            .find(|record| record.get("id").and_then(Value::as_i64) == Some(id))
        else {
            return Err(RequestError::status(404, json!({"detail": "Not found."})));
        };

        let mut updated = existing.clone();
        let mut errors = Map::new();
        // Sector first so a subsector in the same patch is checked against it.
        let mut fields = changes.iter().collect::<Vec<_>>();
        fields.sort_by_key(|(field, _)| field.as_str() != "sector_id");
        for (field, value) in fields {
            if let Err(message) = apply_field(resource, &mut updated, field, value) {
                errors.insert(field.clone(), json!([message]));
            }
        }
        if !errors.is_empty() {
            tracing::debug!(resource = resource.as_str(), id, "demo patch rejected");
            return Err(RequestError::status(400, Value::Object(errors)));
        }

        derive_fields(&mut updated);
        *existing = updated.clone();
        Ok(Value::Object(updated))
    }
}

impl RemoteData for DemoBackend {
    fn send(&self, request: &Request) -> Result<Value, RequestError> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "demo request");
        let route = route(&request.path).ok_or_else(not_found)?;
        match (request.method, route) {
            (Method::Get, Route::Sectors) => Ok(sector_table()),
            (Method::Get, Route::Subsectors) => Ok(subsector_table()),
            (Method::Get, Route::Collection(resource)) => Ok(self.list_page(resource, &request.params)),
            (Method::Get, Route::Item(resource, id)) => {
                self.record(resource, id).ok_or_else(not_found)
            }
            (Method::Patch, Route::Item(resource, id)) => {
                self.patch(resource, id, request.body.as_ref().unwrap_or(&Value::Null))
            }
            _ => Err(RequestError::status(
                405,
                json!({"detail": format!("Method \"{}\" not allowed.", request.method.as_str())}),
            )),
        }
    }
}

fn route(path: &str) -> Option<Route> {
    let path = path.trim_matches('/');
    if path == "api/sectors" {
        return Some(Route::Sectors);
    }
    if path == "api/subsectors" {
        return Some(Route::Subsectors);
    }
    for resource in ResourceKind::ALL {
        let base = resource.api_path();
        if path == base {
            return Some(Route::Collection(resource));
        }
        if let Some(rest) = path.strip_prefix(base).and_then(|rest| rest.strip_prefix('/'))
            && let Ok(id) = rest.parse::<i64>()
        {
            return Some(Route::Item(resource, id));
        }
    }
    None
}

fn apply_field(
    resource: ResourceKind,
    record: &mut Record,
    field: &str,
    value: &Value,
) -> Result<(), String> {
    if READ_ONLY.contains(&field) {
        return Err("This field is read-only.".to_owned());
    }
    if !record.contains_key(field) {
        return Err("Unknown field.".to_owned());
    }

    if NUMERIC.contains(&field) {
        match value {
            Value::Null => {}
            Value::Number(number) if number.as_f64().is_some_and(|n| n < 0.0) => {
                return Err("Must be non-negative".to_owned());
            }
            Value::Number(_) => {}
            _ => return Err("A valid number is required.".to_owned()),
        }
    }

    match field {
        "title" => {
            if value.as_str().is_none_or(|title| title.trim().is_empty()) {
                return Err("This field may not be blank.".to_owned());
            }
        }
        "status" => {
            let allowed = match resource {
                ResourceKind::BusinessPlanActivities => plan_statuses(),
                _ => project_statuses(),
            };
            let status = value.as_str().unwrap_or_default();
            if !allowed.contains(&status) {
                return Err(format!("\"{status}\" is not a valid choice."));
            }
        }
        "sector_id" => {
            if !value.is_null() {
                let known = value
                    .as_i64()
                    .is_some_and(|id| SECTORS.iter().any(|(sector, _)| *sector == id));
                if !known {
                    return Err(format!("Invalid pk \"{value}\" - object does not exist."));
                }
            }
            let keeps_subsector = record
                .get("subsector_id")
                .and_then(Value::as_i64)
                .and_then(subsector_parent)
                .is_some_and(|parent| Some(parent) == value.as_i64());
            if !keeps_subsector {
                record.insert("subsector_id".to_owned(), Value::Null);
            }
        }
        "subsector_id" => {
            if !value.is_null() {
                let parent = value.as_i64().and_then(subsector_parent);
                if parent.is_none() || parent != record.get("sector_id").and_then(Value::as_i64) {
                    return Err("Subsector does not belong to the selected sector.".to_owned());
                }
            }
        }
        _ => {}
    }

    record.insert(field.to_owned(), value.clone());
    Ok(())
}

fn derive_fields(record: &mut Record) {
    if let Some(status) = record.get("status").and_then(Value::as_str) {
        let display = status_display(status);
        record.insert("status_display".to_owned(), Value::String(display));
    }
    if record.contains_key("outstanding_contributions") {
        let amount = |field: &str| record.get(field).and_then(Value::as_f64).unwrap_or(0.0);
        let outstanding = amount("agreed_contributions")
            - amount("cash_payments")
            - amount("bilateral_assistance")
            - amount("promissory_notes");
        record.insert("outstanding_contributions".to_owned(), json!(outstanding));
    }
}

fn matches_filters(record: &Record, params: &[(String, String)]) -> bool {
    params.iter().all(|(name, value)| match name.as_str() {
        "limit" | "offset" | "ordering" => true,
        "search" => {
            let needle = value.to_lowercase();
            record.values().any(|field| {
                field
                    .as_str()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
        field => record.get(field).is_some_and(|current| match current {
            Value::String(text) => text.eq_ignore_ascii_case(value),
            other => other.to_string() == *value,
        }),
    })
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn find(table: &[Record], id: i64) -> Option<&Record> {
    table
        .iter()
        .find(|record| record.get("id").and_then(Value::as_i64) == Some(id))
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn not_found() -> RequestError {
    RequestError::status(404, json!({"detail": "Not found."}))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
