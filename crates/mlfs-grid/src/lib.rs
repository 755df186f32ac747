// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod adapter;
pub mod catalog;
pub mod controller;
pub mod grid;
pub mod values;

pub use adapter::{CellView, ColumnView, GridView, OptionLookup, RowView, build_view};
pub use catalog::{columns_for, load_option_lookup};
pub use controller::{EditController, EditOutcome, SkipReason};
pub use grid::{GridApi, MemoryGrid, Transaction, UNDO_LIMIT};
pub use values::ValueError;
