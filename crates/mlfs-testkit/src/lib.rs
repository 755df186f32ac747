// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod demo;
mod fake;

pub use demo::DemoBackend;
pub use fake::FakeRemote;

use mlfs_app::ResourceKind;
use serde_json::{Value, json};

const COUNTRIES: [&str; 12] = [
    "Argentina",
    "Bangladesh",
    "Brazil",
    "China",
    "Ghana",
    "India",
    "Kenya",
    "Mexico",
    "Nigeria",
    "Peru",
    "Thailand",
    "Viet Nam",
];

const AGENCIES: [&str; 5] = ["UNDP", "UNEP", "UNIDO", "IBRD", "Germany"];

const SUBSTANCES: [&str; 8] = [
    "HCFC-22",
    "HCFC-141b",
    "HCFC-142b",
    "HFC-134a",
    "HFC-32",
    "R-410A",
    "Methyl bromide",
    "CFC-12",
];

const CONTRIBUTORS: [&str; 10] = [
    "Australia",
    "Canada",
    "Denmark",
    "France",
    "Germany",
    "Italy",
    "Japan",
    "Norway",
    "Sweden",
    "United Kingdom",
];

const SECTORS: [(i64, &str); 5] = [
    (1, "Refrigeration"),
    (2, "Foam"),
    (3, "Solvents"),
    (4, "Fumigants"),
    (5, "Several"),
];

const SUBSECTORS: [(i64, &str, i64); 10] = [
    (10, "Domestic", 1),
    (11, "Commercial", 1),
    (12, "Mobile air-conditioning", 1),
    (20, "Rigid", 2),
    (21, "Flexible", 2),
    (22, "Integral skin", 2),
    (30, "Cleaning", 3),
    (40, "Soil", 4),
    (41, "Post-harvest", 4),
    (50, "Ozone unit support", 5),
];

const ACTIVITY_TITLES: [&str; 10] = [
    "HCFC phase-out management plan (stage II)",
    "HCFC phase-out management plan (stage III)",
    "Kigali HFC implementation plan",
    "Institutional strengthening renewal",
    "Conversion of foam manufacturing lines",
    "Servicing sector technician training",
    "Energy efficiency enabling activities",
    "Demonstration of low-GWP chillers",
    "Methyl bromide alternatives for soil fumigation",
    "Verification of HCFC consumption",
];

const PROJECT_STATUSES: [&str; 5] = ["Draft", "Submitted", "Recommended", "Approved", "Withdrawn"];
const PLAN_STATUSES: [&str; 4] = ["Pending", "Approved", "Rejected", "Withdrawn"];

const REFERENCE_YEAR: i64 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic record generator for the four grid resources.
#[derive(Debug, Clone)]
pub struct MlfsFaker {
    rng: DeterministicRng,
}

impl MlfsFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn record(&mut self, resource: ResourceKind, id: i64) -> Value {
        match resource {
            ResourceKind::BusinessPlanActivities => self.business_plan_activity(id),
            ResourceKind::CountryProgrammeRecords => self.country_programme_record(id),
            ResourceKind::ProjectSubmissions => self.project_submission(id),
            ResourceKind::Contributions => self.contribution(id),
        }
    }

    pub fn records(&mut self, resource: ResourceKind, count: usize) -> Vec<Value> {
        (1..=count as i64).map(|id| self.record(resource, id)).collect()
    }

    pub fn business_plan_activity(&mut self, id: i64) -> Value {
        let (sector_id, _) = *self.pick(&SECTORS);
        let subsectors = SUBSECTORS
            .iter()
            .filter(|(_, _, parent)| *parent == sector_id)
            .collect::<Vec<_>>();
        let subsector_id = if subsectors.is_empty() || self.rng.bool() {
            Value::Null
        } else {
            json!(subsectors[self.rng.int_n(subsectors.len())].0)
        };
        let status = *self.pick(&PLAN_STATUSES);
        json!({
            "id": id,
            "country": self.pick(&COUNTRIES),
            "agency": self.pick(&AGENCIES),
            "title": self.pick(&ACTIVITY_TITLES),
            "sector_id": sector_id,
            "subsector_id": subsector_id,
            "status": status,
            "status_display": status_display(status),
            "funds_allocated": self.amount(50_000, 2_500_000),
            "year": REFERENCE_YEAR + self.rng.int_n(3) as i64,
        })
    }

    pub fn country_programme_record(&mut self, id: i64) -> Value {
        json!({
            "id": id,
            "country": self.pick(&COUNTRIES),
            "year": REFERENCE_YEAR - 1 - self.rng.int_n(4) as i64,
            "substance": self.pick(&SUBSTANCES),
            "imports": self.tonnes(),
            "exports": if self.rng.bool() { self.tonnes() } else { 0.0 },
            "production": 0.0,
            "remarks": "",
        })
    }

    pub fn project_submission(&mut self, id: i64) -> Value {
        let country = self.pick(&COUNTRIES).to_owned();
        let agency = self.pick(&AGENCIES).to_owned();
        let status = *self.pick(&PROJECT_STATUSES);
        let support_cost = *self.pick(&[7.0, 9.0, 13.0]);
        let prefix = country
            .chars()
            .filter(char::is_ascii_alphabetic)
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        json!({
            "id": id,
            "code": format!("{prefix}/PHA/{}/{id:02}", 90 + self.rng.int_n(9)),
            "title": self.pick(&ACTIVITY_TITLES),
            "agency": agency,
            "country": country,
            "status": status,
            "status_display": status_display(status),
            "total_fund": self.amount(40_000, 4_000_000),
            "support_cost_psc": support_cost,
        })
    }

    pub fn contribution(&mut self, id: i64) -> Value {
        let agreed = self.amount(1_000_000, 60_000_000);
        let cash = (agreed * (self.rng.int_n(101) as f64) / 100.0).round();
        let bilateral = if self.rng.bool() {
            (agreed * 0.05).round()
        } else {
            0.0
        };
        json!({
            "id": id,
            "country": self.pick(&CONTRIBUTORS),
            "year": REFERENCE_YEAR - self.rng.int_n(3) as i64,
            "agreed_contributions": agreed,
            "cash_payments": cash,
            "bilateral_assistance": bilateral,
            "promissory_notes": 0.0,
            "outstanding_contributions": agreed - cash - bilateral,
        })
    }

    fn pick<'a, T>(&mut self, values: &'a [T]) -> &'a T {
        &values[self.rng.int_n(values.len())]
    }

    fn amount(&mut self, min: u64, max: u64) -> f64 {
        let span = (max - min) / 1_000;
        (min + (self.rng.next_u64() % span.max(1)) * 1_000) as f64
    }

    fn tonnes(&mut self) -> f64 {
        ((self.rng.next_u64() % 100_000) as f64) / 100.0
    }
}

/// Display label the backend derives for a status.
pub fn status_display(status: &str) -> String {
    match status {
        "Approved" => "Approved (final)".to_owned(),
        other => other.to_owned(),
    }
}

pub fn sector_table() -> Value {
    Value::Array(
        SECTORS
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect(),
    )
}

pub fn subsector_table() -> Value {
    Value::Array(
        SUBSECTORS
            .iter()
            .map(|(id, name, sector_id)| json!({"id": id, "name": name, "sector_id": sector_id}))
            .collect(),
    )
}

pub fn subsector_parent(subsector_id: i64) -> Option<i64> {
    SUBSECTORS
        .iter()
        .find(|(id, _, _)| *id == subsector_id)
        .map(|(_, _, sector_id)| *sector_id)
}

pub fn plan_statuses() -> &'static [&'static str] {
    &PLAN_STATUSES
}

pub fn project_statuses() -> &'static [&'static str] {
    &PROJECT_STATUSES
}
