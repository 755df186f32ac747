// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use mlfs_api::{Page, RemoteData, Request, RequestError};
use mlfs_app::{PendingEdit, ResourceKind};
use mlfs_grid::{OptionLookup, load_option_lookup};
use mlfs_tui::{GridRuntime, InternalEvent};
use serde_json::Value;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

pub type SharedRemote = Arc<dyn RemoteData + Send + Sync>;

/// Terminal runtime over any remote: pages and lookups load inline, patches
/// go out on worker threads.
pub struct RemoteRuntime {
    remote: SharedRemote,
}

impl RemoteRuntime {
    pub fn new(remote: SharedRemote) -> Self {
        Self { remote }
    }
}

pub fn list_path(resource: ResourceKind) -> String {
    format!("{}/", resource.api_path())
}

impl GridRuntime for RemoteRuntime {
    fn load_page(&mut self, resource: ResourceKind, params: Vec<(String, String)>) -> Result<Page> {
        self.remote
            .list(&list_path(resource), params)
            .with_context(|| format!("list {}", resource.label()))
    }

    fn load_lookup(&mut self) -> Result<OptionLookup> {
        load_option_lookup(&self.remote)
    }

    fn send_patch(&mut self, request: &Request) -> std::result::Result<Value, RequestError> {
        self.remote.send(request)
    }

    fn spawn_patch(
        &mut self,
        generation: u64,
        pending: PendingEdit,
        request: Request,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let remote = Arc::clone(&self.remote);
        thread::Builder::new()
            .name("mlfs-patch".to_owned())
            .spawn(move || {
                let result = remote.send(&request);
                let event = InternalEvent::PatchResolved {
                    generation,
                    pending,
                    result,
                };
                if tx.send(event).is_err() {
                    tracing::debug!(path = %request.path, "patch result dropped; view closed");
                }
            })
            .context("spawn patch worker")?;
        Ok(())
    }
}
