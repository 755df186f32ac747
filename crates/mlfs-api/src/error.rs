// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};

/// Parsed error payload from a non-2xx response. The backend maps field names
/// (or `detail` / `non_field_errors`) to arrays of human-readable messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody(Map<String, Value>);

impl ErrorBody {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Lenient parse: anything that is not JSON yields an empty body.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::default(),
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            Value::Array(items) => {
                let mut fields = Map::new();
                fields.insert("non_field_errors".to_owned(), Value::Array(items));
                Self(fields)
            }
            Value::String(detail) => {
                let mut fields = Map::new();
                fields.insert("detail".to_owned(), Value::String(detail));
                Self(fields)
            }
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages_for(&self, field: &str) -> Vec<String> {
        self.0.get(field).map(collect_messages).unwrap_or_default()
    }

    pub fn detail(&self) -> Option<String> {
        self.messages_for("detail").into_iter().next()
    }

    /// Best message for `field`: its own errors, then `detail`, then
    /// `non_field_errors`, then whatever the first field carries.
    pub fn first_message(&self, field: &str) -> Option<String> {
        self.messages_for(field)
            .into_iter()
            .next()
            .or_else(|| self.detail())
            .or_else(|| self.messages_for("non_field_errors").into_iter().next())
            .or_else(|| {
                self.0
                    .values()
                    .flat_map(collect_messages)
                    .find(|message| !message.is_empty())
            })
    }
}

fn collect_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(message) => Some(message.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("request failed with status {status}")]
    Status { status: u16, body: ErrorBody },
    #[error("cannot reach {url}: {message} -- check [api].base_url and that the backend is running")]
    Connection { url: String, message: String },
    #[error("decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid request path {path:?}: {message}")]
    InvalidPath { path: String, message: String },
}

impl RequestError {
    pub fn status(status: u16, body: Value) -> Self {
        Self::Status {
            status,
            body: ErrorBody::from_value(body),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Message to show for a failure touching `field`.
    pub fn message_for(&self, field: &str) -> Option<String> {
        self.body().and_then(|body| body.first_message(field))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorBody, RequestError};
    use serde_json::json;

    #[test]
    fn field_messages_come_first() {
        let body = ErrorBody::from_value(json!({
            "funds_allocated": ["Must be non-negative", "Too precise"],
            "detail": "Validation failed",
        }));
        assert_eq!(
            body.messages_for("funds_allocated"),
            vec!["Must be non-negative".to_owned(), "Too precise".to_owned()]
        );
        assert_eq!(
            body.first_message("funds_allocated").as_deref(),
            Some("Must be non-negative")
        );
        assert_eq!(
            body.first_message("status").as_deref(),
            Some("Validation failed")
        );
    }

    #[test]
    fn falls_back_to_non_field_then_any_message() {
        let body = ErrorBody::from_value(json!(["Record is locked"]));
        assert_eq!(body.first_message("year").as_deref(), Some("Record is locked"));

        let body = ErrorBody::from_value(json!({"other": ["Unrelated failure"]}));
        assert_eq!(body.first_message("year").as_deref(), Some("Unrelated failure"));
    }

    #[test]
    fn non_json_text_is_an_empty_body() {
        let body = ErrorBody::from_text("<html>Bad Gateway</html>");
        assert!(body.is_empty());
        assert_eq!(body.first_message("anything"), None);
    }

    #[test]
    fn status_error_exposes_code_and_message() {
        let error = RequestError::status(403, json!({"detail": "Not allowed"}));
        assert_eq!(error.status_code(), Some(403));
        assert_eq!(error.message_for("title").as_deref(), Some("Not allowed"));
        assert_eq!(error.to_string(), "request failed with status 403");

        let error = RequestError::Connection {
            url: "http://127.0.0.1:1/".to_owned(),
            message: "refused".to_owned(),
        };
        assert_eq!(error.status_code(), None);
        assert_eq!(error.message_for("title"), None);
    }
}
