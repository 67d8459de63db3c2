//! Footfall dashboard core: column roles, filtering, aggregation and dashboard assembly.
//!
//! The pipeline runs in one direction:
//! - a [`Session`] loads the dataset once, classifies its columns into a [`RoleMap`] and appends
//!   any synthetic group-key columns;
//! - [`apply`] turns a [`FilterSpec`] into a new filtered table;
//! - [`aggregate`] and [`aggregate_scalar`] compute grouped results and single metrics;
//! - [`Dashboard::build`] assembles every KPI and chart for one filter state.
//!
//! Missing source columns never fail a dashboard. They show up as
//! [`footfall_format::MetricValue::Unresolved`] metrics or [`PanelContent::Placeholder`] panels.

#![forbid(unsafe_code)]

mod aggregate;
mod cache;
mod dashboard;
mod error;
mod filter;
mod roles;
mod session;

pub use crate::aggregate::{
    aggregate, aggregate_scalar, AggregationRequest, AggregationResult, Operation,
};
pub use crate::cache::SessionCache;
pub use crate::dashboard::{
    ChartKind, Dashboard, DashboardOptions, Kpi, Panel, PanelContent, PanelDescriptor, TableData,
};
pub use crate::error::{DashError, DashResult};
pub use crate::filter::{apply, DateRange, FilterOptions, FilterSpec, Selection, ALL_OPTION};
pub use crate::roles::{classify, DerivedKind, Resolution, Role, RoleMap};
pub use crate::session::{ColumnRef, Session};
