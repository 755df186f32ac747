// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod error;

pub use error::{ErrorBody, RequestError};

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    pub path: String,
    pub method: Method,
    pub body: Option<Value>,
    pub params: Vec<(String, String)>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            method: Method::Patch,
            body: Some(body),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub count: usize,
    pub results: Vec<Value>,
}

impl Page {
    /// Accepts a bare array or a `{count, results}` envelope.
    pub fn from_value(value: Value, source: &str) -> std::result::Result<Self, RequestError> {
        match value {
            Value::Array(results) => Ok(Self {
                count: results.len(),
                results,
            }),
            Value::Object(mut envelope) => {
                let Some(Value::Array(results)) = envelope.remove("results") else {
                    return Err(RequestError::Decode {
                        url: source.to_owned(),
                        message: "list response has no `results` array".to_owned(),
                    });
                };
                let count = envelope
                    .get("count")
                    .and_then(Value::as_u64)
                    .and_then(|count| usize::try_from(count).ok())
                    .unwrap_or(results.len());
                Ok(Self { count, results })
            }
            other => Err(RequestError::Decode {
                url: source.to_owned(),
                message: format!("expected a list response, got {other}"),
            }),
        }
    }
}

/// The request seam consumed by the grid layer.
pub trait RemoteData {
    fn send(&self, request: &Request) -> std::result::Result<Value, RequestError>;

    fn list(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> std::result::Result<Page, RequestError> {
        let value = self.send(&Request::get(path).with_params(params))?;
        Page::from_value(value, path)
    }
}

impl<T: RemoteData + ?Sized> RemoteData for &T {
    fn send(&self, request: &Request) -> std::result::Result<Value, RequestError> {
        (**self).send(request)
    }
}

impl<T: RemoteData + ?Sized> RemoteData for std::sync::Arc<T> {
    fn send(&self, request: &Request) -> std::result::Result<Value, RequestError> {
        (**self).send(request)
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        // Keep a trailing slash so relative joins append instead of replacing.
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "api.base_url {base_url} must use http or https, got {}",
                base_url.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url_for(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> std::result::Result<Url, RequestError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| RequestError::InvalidPath {
                path: path.to_owned(),
                message: error.to_string(),
            })?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    pub fn request(&self, request: &Request) -> std::result::Result<Value, RequestError> {
        let url = self.url_for(&request.path, &request.params)?;
        tracing::debug!(method = request.method.as_str(), %url, "sending request");

        let mut builder = self.http.request(request.method.to_reqwest(), url.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .map_err(|error| connection_error(&url, error))?;

        let status = response.status();
        let text = response.text().map_err(|error| RequestError::Decode {
            url: url.to_string(),
            message: error.to_string(),
        })?;

        if !status.is_success() {
            tracing::warn!(
                method = request.method.as_str(),
                %url,
                status = status.as_u16(),
                "request rejected"
            );
            return Err(RequestError::Status {
                status: status.as_u16(),
                body: ErrorBody::from_text(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|error| RequestError::Decode {
            url: url.to_string(),
            message: error.to_string(),
        })
    }

    pub fn get(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> std::result::Result<Value, RequestError> {
        self.request(&Request::get(path).with_params(params))
    }

    pub fn patch(&self, path: &str, body: Value) -> std::result::Result<Value, RequestError> {
        self.request(&Request::patch(path, body))
    }
}

impl RemoteData for Client {
    fn send(&self, request: &Request) -> std::result::Result<Value, RequestError> {
        self.request(request)
    }
}

fn connection_error(url: &Url, error: reqwest::Error) -> RequestError {
    let message = if error.is_timeout() {
        "timed out".to_owned()
    } else if error.is_connect() {
        "connection refused".to_owned()
    } else {
        error.to_string()
    };
    RequestError::Connection {
        url: url.to_string(),
        message,
    }
}
