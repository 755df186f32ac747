// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use mlfs_api::{Method, RemoteData, Request, RequestError};
use serde_json::Value;

/// Scripted remote: replies with queued results in order and records every
/// request it receives.
#[derive(Debug, Default)]
pub struct FakeRemote {
    responses: Mutex<VecDeque<Result<Value, RequestError>>>,
    requests: Mutex<Vec<Request>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_ok(&self, value: Value) -> &Self {
        lock(&self.responses).push_back(Ok(value));
        self
    }

    pub fn respond_status(&self, status: u16, body: Value) -> &Self {
        lock(&self.responses).push_back(Err(RequestError::status(status, body)));
        self
    }

    pub fn respond_err(&self, error: RequestError) -> &Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    pub fn patches(&self) -> Vec<Request> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.method == Method::Patch)
            .cloned()
            .collect()
    }

    pub fn pending_responses(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl RemoteData for FakeRemote {
    fn send(&self, request: &Request) -> Result<Value, RequestError> {
        lock(&self.requests).push(request.clone());
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| {
                Err(RequestError::Connection {
                    url: request.path.clone(),
                    message: "no scripted response".to_owned(),
                })
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::FakeRemote;
    use mlfs_api::{RemoteData, Request};
    use serde_json::json;

    #[test]
    fn replies_in_order_and_records_requests() {
        let remote = FakeRemote::new();
        remote
            .respond_ok(json!({"id": 1}))
            .respond_status(400, json!({"title": ["Required"]}));

        assert_eq!(remote.send(&Request::get("a/")), Ok(json!({"id": 1})));
        let error = remote
            .send(&Request::patch("b/", json!({"title": ""})))
            .expect_err("scripted failure");
        assert_eq!(error.status_code(), Some(400));

        let error = remote
            .send(&Request::get("c/"))
            .expect_err("queue exhausted");
        assert!(error.to_string().contains("no scripted response"));

        assert_eq!(remote.requests().len(), 3);
        assert_eq!(remote.patches().len(), 1);
        assert_eq!(remote.pending_responses(), 0);
    }
}
