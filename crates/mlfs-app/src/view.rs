// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::SortDirection;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_FILTER_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub direction: SortDirection,
}

impl Ordering {
    /// Backend ordering parameter: `field` or `-field` for descending.
    pub fn param(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.field.clone(),
            SortDirection::Desc => format!("-{}", self.field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub const fn offset(self) -> usize {
        self.page.saturating_sub(1) * self.page_size
    }

    pub fn page_count(self, total: usize) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        total.div_ceil(self.page_size).max(1)
    }
}

/// Filter, ordering, and pagination state for one list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    filters: BTreeMap<String, String>,
    ordering: Option<Ordering>,
    pagination: Pagination,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: BTreeMap::new(),
            ordering: None,
            pagination: Pagination {
                page: 1,
                page_size: page_size.max(1),
            },
        }
    }

    pub fn filter(&self, field: &str) -> Option<&str> {
        self.filters.get(field).map(String::as_str)
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&Ordering> {
        self.ordering.as_ref()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Sets or clears (on blank input) a filter. Returns whether the query changed;
    /// a change resets to the first page.
    pub fn set_filter(&mut self, field: &str, value: &str) -> bool {
        let trimmed = value.trim();
        let changed = if trimmed.is_empty() {
            self.filters.remove(field).is_some()
        } else if self.filters.get(field).map(String::as_str) == Some(trimmed) {
            false
        } else {
            self.filters.insert(field.to_owned(), trimmed.to_owned());
            true
        };
        if changed {
            self.pagination.page = 1;
        }
        changed
    }

    pub fn clear_filters(&mut self) -> bool {
        if self.filters.is_empty() {
            return false;
        }
        self.filters.clear();
        self.pagination.page = 1;
        true
    }

    pub fn set_ordering(&mut self, ordering: Option<Ordering>) -> bool {
        if self.ordering == ordering {
            return false;
        }
        self.ordering = ordering;
        self.pagination.page = 1;
        true
    }

    /// Cycles the ordering on `field`: unsorted, ascending, descending, unsorted.
    pub fn toggle_ordering(&mut self, field: &str) {
        let next = match &self.ordering {
            Some(current) if current.field == field => match current.direction {
                SortDirection::Asc => Some(Ordering {
                    field: field.to_owned(),
                    direction: current.direction.toggled(),
                }),
                SortDirection::Desc => None,
            },
            _ => Some(Ordering {
                field: field.to_owned(),
                direction: SortDirection::Asc,
            }),
        };
        self.set_ordering(next);
    }

    pub fn set_page(&mut self, page: usize) -> bool {
        let page = page.max(1);
        if self.pagination.page == page {
            return false;
        }
        self.pagination.page = page;
        true
    }

    pub fn next_page(&mut self, total: usize) -> bool {
        if self.pagination.page >= self.pagination.page_count(total) {
            return false;
        }
        self.set_page(self.pagination.page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        if self.pagination.page <= 1 {
            return false;
        }
        self.set_page(self.pagination.page - 1)
    }

    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("limit".to_owned(), self.pagination.page_size.to_string()),
            ("offset".to_owned(), self.pagination.offset().to_string()),
        ];
        if let Some(ordering) = &self.ordering {
            params.push(("ordering".to_owned(), ordering.param()));
        }
        for (field, value) in &self.filters {
            params.push((field.clone(), value.clone()));
        }
        params
    }
}

/// Trailing-edge debounce: fires once `delay` has passed since the last touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns true exactly once per burst of touches, after the delay elapses.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
