//! Typed in-memory column store for footfall analytics.
//!
//! This crate focuses on:
//! - An immutable, column-major [`Table`] whose columns each hold a single [`ColumnType`].
//! - Bit-vector row masks ([`BitVec`]) built from [`FilterExpr`] predicates.
//! - Grouped aggregation ([`Table::group_by`]) with deterministic group ordering.
//!
//! Every transformation returns a new table, so a loaded dataset can be shared read-only.

#![forbid(unsafe_code)]

mod bitmap;
mod filter;
mod query;
mod table;
mod types;

pub use crate::bitmap::BitVec;
pub use crate::filter::{CmpOp, FilterExpr, FilterValue};
pub use crate::query::{AggOp, AggSpec};
pub use crate::table::{
    Column, ColumnSchema, Table, TableBuilder, TableError, TableResult, TableScan,
};
pub use crate::types::{date_to_millis, millis_to_datetime, ColumnType, Value};
