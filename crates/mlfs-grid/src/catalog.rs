// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use mlfs_api::{RemoteData, Request};
use mlfs_app::{ColumnDef, Editable, OptionSource, ResourceKind, SelectOption, ValueFormat};
use serde_json::Value;

use crate::adapter::OptionLookup;

pub const SECTORS: &str = "sectors";
pub const SUBSECTORS: &str = "subsectors";
pub const SECTORS_PATH: &str = "api/sectors/";
pub const SUBSECTORS_PATH: &str = "api/subsectors/";

const BUSINESS_PLAN_STATUSES: [&str; 4] = ["Pending", "Approved", "Rejected", "Withdrawn"];
const SUBMISSION_STATUSES: [&str; 5] = ["Draft", "Submitted", "Recommended", "Approved", "Withdrawn"];

pub fn columns_for(resource: ResourceKind) -> Vec<ColumnDef> {
    match resource {
        ResourceKind::BusinessPlanActivities => vec![
            ColumnDef::text("country", "Country").width(14),
            ColumnDef::text("agency", "Agency").width(8),
            ColumnDef::text("title", "Title")
                .editable(Editable::Always)
                .width(28),
            ColumnDef::select(
                "sector_id",
                "Sector",
                OptionSource::Lookup(SECTORS.to_owned()),
            )
            .editable(Editable::Always),
            ColumnDef::select(
                "subsector_id",
                "Subsector",
                OptionSource::DependsOn {
                    parent: "sector_id".to_owned(),
                    lookup: SUBSECTORS.to_owned(),
                },
            )
            .editable(Editable::WhenSet("sector_id".to_owned())),
            status_column(&BUSINESS_PLAN_STATUSES),
            ColumnDef::number("funds_allocated", "Funds (US$)").editable(Editable::Always),
        ],
        ResourceKind::CountryProgrammeRecords => vec![
            ColumnDef::text("country", "Country").width(14),
            ColumnDef::text("year", "Year").width(6),
            ColumnDef::text("substance", "Substance").width(14),
            ColumnDef::number("imports", "Imports (MT)").editable(Editable::Always),
            ColumnDef::number("exports", "Exports (MT)").editable(Editable::Always),
            ColumnDef::number("production", "Production (MT)").editable(Editable::Always),
            ColumnDef::text("remarks", "Remarks")
                .editable(Editable::Always)
                .width(24),
        ],
        ResourceKind::ProjectSubmissions => vec![
            ColumnDef::text("code", "Code").width(16),
            ColumnDef::text("title", "Title")
                .editable(Editable::Always)
                .width(28),
            ColumnDef::text("agency", "Agency").width(8),
            status_column(&SUBMISSION_STATUSES),
            ColumnDef::number("total_fund", "Total fund (US$)").editable(Editable::Always),
            ColumnDef::number("support_cost_psc", "PSC (%)")
                .editable(Editable::Always)
                .format(ValueFormat::Percent)
                .width(8),
        ],
        ResourceKind::Contributions => vec![
            ColumnDef::text("country", "Country").width(14),
            ColumnDef::text("year", "Year").width(6),
            ColumnDef::number("agreed_contributions", "Agreed").editable(Editable::Always),
            ColumnDef::number("cash_payments", "Cash").editable(Editable::Always),
            ColumnDef::number("bilateral_assistance", "Bilateral").editable(Editable::Always),
            ColumnDef::number("promissory_notes", "Promissory").editable(Editable::Always),
            ColumnDef::number("outstanding_contributions", "Outstanding"),
        ],
    }
}

fn status_column(statuses: &[&str]) -> ColumnDef {
    ColumnDef::select(
        "status",
        "Status",
        OptionSource::Static(
            statuses
                .iter()
                .map(|status| SelectOption::new(*status, *status))
                .collect(),
        ),
    )
    .editable(Editable::Always)
    .format(ValueFormat::DisplayField("status_display".to_owned()))
    .width(18)
}

/// Loads the sector and subsector tables used by business plan selects.
pub fn load_option_lookup<R: RemoteData + ?Sized>(remote: &R) -> Result<OptionLookup> {
    let sectors = remote
        .send(&Request::get(SECTORS_PATH))
        .context("load sectors")?;
    let subsectors = remote
        .send(&Request::get(SUBSECTORS_PATH))
        .context("load subsectors")?;
    Ok(lookup_from_tables(&sectors, &subsectors))
}

pub fn lookup_from_tables(sectors: &Value, subsectors: &Value) -> OptionLookup {
    let mut lookup = OptionLookup::default();
    lookup.set_list(SECTORS, named_options(sectors));

    for entry in table_rows(subsectors) {
        let (Some(id), Some(name), Some(sector_id)) = (
            entry.get("id"),
            entry.get("name").and_then(Value::as_str),
            entry.get("sector_id"),
        ) else {
            continue;
        };
        lookup.push_keyed(SUBSECTORS, sector_id, SelectOption::new(id.clone(), name));
    }
    lookup
}

fn named_options(table: &Value) -> Vec<SelectOption> {
    table_rows(table)
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id")?;
            let name = entry.get("name").and_then(Value::as_str)?;
            Some(SelectOption::new(id.clone(), name))
        })
        .collect()
}

fn table_rows(table: &Value) -> &[Value] {
    match table {
        Value::Array(items) => items.as_slice(),
        Value::Object(envelope) => envelope
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}
