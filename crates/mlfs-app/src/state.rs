// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub resource: ResourceKind,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            resource: ResourceKind::BusinessPlanActivities,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextResource,
    PrevResource,
    SelectResource(ResourceKind),
    StartCellEdit,
    StartFilter,
    ExitToNav,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ResourceChanged(ResourceKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextResource => self.rotate_resource(1),
            AppCommand::PrevResource => self.rotate_resource(-1),
            AppCommand::SelectResource(resource) => {
                if self.resource == resource {
                    return Vec::new();
                }
                self.resource = resource;
                self.mode = AppMode::Nav;
                vec![AppEvent::ResourceChanged(resource)]
            }
            AppCommand::StartCellEdit => {
                self.mode = AppMode::EditCell;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::StartFilter => {
                self.mode = AppMode::Filter;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_resource(&mut self, delta: isize) -> Vec<AppEvent> {
        let all = ResourceKind::ALL;
        let current = all
            .iter()
            .position(|resource| *resource == self.resource)
            .unwrap_or(0);
        self.resource = all[wrap_index(current, delta, all.len())];
        self.mode = AppMode::Nav;
        vec![AppEvent::ResourceChanged(self.resource)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

/// Steps `index` by `delta` within `0..len`, wrapping at both ends.
pub fn wrap_index(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let step = delta.unsigned_abs() % len;
    if delta < 0 {
        (index % len + len - step) % len
    } else {
        (index % len + step) % len
    }
}
