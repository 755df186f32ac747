// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use mlfs_app::{EditorKind, Row, SelectOption, ValueFormat};
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    InvalidNumber,
    UnknownOption,
    NoOptions,
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber => f.write_str("invalid number value"),
            Self::UnknownOption => f.write_str("value is not one of the available choices"),
            Self::NoOptions => f.write_str("no choices available for this cell"),
        }
    }
}

impl std::error::Error for ValueError {}

pub type ValueResult<T> = std::result::Result<T, ValueError>;

/// Parses raw editor input into the JSON value sent to the backend.
pub fn parse_input(
    editor: &EditorKind,
    input: &str,
    options: &[SelectOption],
) -> ValueResult<Value> {
    match editor {
        EditorKind::Text => Ok(parse_text(input)),
        EditorKind::Number => parse_number(input),
        EditorKind::Select(_) => parse_select(input, options),
    }
}

pub fn parse_text(input: &str) -> Value {
    Value::String(input.trim().to_owned())
}

pub fn parse_number(input: &str) -> ValueResult<Value> {
    let clean = input.trim().replace(',', "");
    if clean.is_empty() {
        return Ok(Value::Null);
    }
    if let Ok(whole) = clean.parse::<i64>() {
        return Ok(Value::from(whole));
    }
    let value = clean
        .parse::<f64>()
        .map_err(|_| ValueError::InvalidNumber)?;
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or(ValueError::InvalidNumber)
}

/// Matches input against option labels (case-insensitive) or raw option values.
pub fn parse_select(input: &str, options: &[SelectOption]) -> ValueResult<Value> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    if options.is_empty() {
        return Err(ValueError::NoOptions);
    }
    options
        .iter()
        .find(|option| {
            option.label.eq_ignore_ascii_case(trimmed) || display_value(&option.value) == trimmed
        })
        .map(|option| option.value.clone())
        .ok_or(ValueError::UnknownOption)
}

/// Deep equality where numbers compare by value, so `1000` equals `1000.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => left == right,
    }
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(true) => "yes".to_owned(),
        Value::Bool(false) => "no".to_owned(),
        other => other.to_string(),
    }
}

/// Editor seed text for a value: no grouping so it parses back unchanged.
pub fn edit_text(value: &Value) -> String {
    display_value(value)
}

pub fn format_value(format: &ValueFormat, row: &Row, field: &str) -> String {
    let value = row.value(field);
    match format {
        ValueFormat::Plain => display_value(&value),
        ValueFormat::Grouped { decimals } => match value.as_f64() {
            Some(number) => format_grouped(number, *decimals),
            None => display_value(&value),
        },
        ValueFormat::Percent => match value.as_f64() {
            Some(number) => format!("{}%", format_grouped(number, 1)),
            None => display_value(&value),
        },
        ValueFormat::DisplayField(display) => {
            if row.is_set(display) {
                display_value(&row.value(display))
            } else {
                display_value(&value)
            }
        }
    }
}

pub fn format_grouped(value: f64, decimals: u8) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.*}", usize::from(decimals), value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };
    let grouped = comma_format(whole);
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

fn comma_format(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let mut chars = digits.chars().collect::<Vec<_>>();
    let mut count = 0usize;
    while let Some(ch) = chars.pop() {
        if count == 3 {
            out.push(',');
            count = 0;
        }
        out.push(ch);
        count += 1;
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::{
        ValueError, format_grouped, format_value, parse_number, parse_select, values_equal,
    };
    use anyhow::Result;
    use mlfs_app::{Row, SelectOption, ValueFormat};
    use serde_json::{Value, json};

    #[test]
    fn parse_number_accepts_grouping_negatives_and_blank() {
        assert_eq!(parse_number("1,000"), Ok(json!(1000)));
        assert_eq!(parse_number(" -5 "), Ok(json!(-5)));
        assert_eq!(parse_number("12.5"), Ok(json!(12.5)));
        assert_eq!(parse_number(""), Ok(Value::Null));
        assert_eq!(parse_number("ten"), Err(ValueError::InvalidNumber));
        assert_eq!(parse_number("NaN"), Err(ValueError::InvalidNumber));
    }

    #[test]
    fn parse_select_matches_label_or_value() {
        let options = vec![
            SelectOption::new(1, "Foam"),
            SelectOption::new(2, "Refrigeration"),
        ];
        assert_eq!(parse_select("refrigeration", &options), Ok(json!(2)));
        assert_eq!(parse_select("1", &options), Ok(json!(1)));
        assert_eq!(parse_select("", &options), Ok(Value::Null));
        assert_eq!(
            parse_select("Solvents", &options),
            Err(ValueError::UnknownOption)
        );
        assert_eq!(parse_select("Foam", &[]), Err(ValueError::NoOptions));
    }

    #[test]
    fn values_equal_normalizes_numbers_deeply() {
        assert!(values_equal(&json!(1000), &json!(1000.0)));
        assert!(values_equal(
            &json!({"a": [1, 2.0], "b": null}),
            &json!({"b": null, "a": [1.0, 2]})
        ));
        assert!(!values_equal(&json!(1000), &json!(-5)));
        assert!(!values_equal(&json!("1000"), &json!(1000)));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn grouped_format_handles_sign_and_decimals() {
        assert_eq!(format_grouped(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_grouped(-1000.0, 0), "-1,000");
        assert_eq!(format_grouped(12.0, 2), "12.00");
    }

    #[test]
    fn display_field_prefers_derived_value() -> Result<()> {
        let format = ValueFormat::DisplayField("status_display".to_owned());
        let row = Row::from_record(json!({
            "id": 1,
            "status": "Approved",
            "status_display": "Approved (final)",
        }))?;
        assert_eq!(format_value(&format, &row, "status"), "Approved (final)");

        let row = Row::from_record(json!({"id": 2, "status": "Pending"}))?;
        assert_eq!(format_value(&format, &row, "status"), "Pending");
        Ok(())
    }
}
