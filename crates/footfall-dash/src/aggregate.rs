use std::fmt;

use footfall_format::MetricValue;
use footfall_table::{AggOp, AggSpec, Table, Value};
use serde::Serialize;

use crate::error::DashResult;
use crate::filter::column_index;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Sum,
    Mean,
    Max,
}

impl Operation {
    fn agg_op(self) -> AggOp {
        match self {
            Operation::Sum => AggOp::Sum,
            Operation::Mean => AggOp::Mean,
            Operation::Max => AggOp::Max,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.agg_op(), f)
    }
}

/// Group by `group_keys`, then reduce each of `value_columns` with `op`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationRequest {
    pub group_keys: Vec<String>,
    pub value_columns: Vec<String>,
    pub op: Operation,
}

impl AggregationRequest {
    pub fn new(group_key: impl Into<String>, value_column: impl Into<String>, op: Operation) -> Self {
        Self {
            group_keys: vec![group_key.into()],
            value_columns: vec![value_column.into()],
            op,
        }
    }
}

/// One row per distinct group: key columns first, then one column per requested value column.
#[derive(Clone, Debug)]
pub struct AggregationResult {
    request: AggregationRequest,
    table: Table,
}

impl AggregationResult {
    pub fn request(&self) -> &AggregationRequest {
        &self.request
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn group_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// `(keys, values)` for every group, in group order.
    pub fn groups(&self) -> impl Iterator<Item = (Vec<Value>, Vec<Value>)> + '_ {
        let split = self.request.group_keys.len();
        self.table.rows().map(move |mut row| {
            let values = row.split_off(split);
            (row, values)
        })
    }

    /// Aggregates for the `i`th requested value column.
    pub fn series(&self, i: usize) -> Vec<Value> {
        self.table
            .column(self.request.group_keys.len() + i)
            .map(|c| c.values().to_vec())
            .unwrap_or_default()
    }
}

/// Group `table` as described by `request`.
///
/// An empty table gives zero groups. Missing group keys form their own group, ordered last.
pub fn aggregate(table: &Table, request: &AggregationRequest) -> DashResult<AggregationResult> {
    let keys = request
        .group_keys
        .iter()
        .map(|name| column_index(table, name))
        .collect::<DashResult<Vec<_>>>()?;
    let aggs = request
        .value_columns
        .iter()
        .map(|name| Ok(AggSpec::new(request.op.agg_op(), column_index(table, name)?)))
        .collect::<DashResult<Vec<_>>>()?;

    let grouped = table.group_by(&keys, &aggs)?;
    log::debug!(
        "{} of {:?} by {:?}: {} groups",
        request.op,
        request.value_columns,
        request.group_keys,
        grouped.row_count()
    );

    Ok(AggregationResult {
        request: request.clone(),
        table: grouped,
    })
}

/// Reduce a whole column to one metric.
///
/// Zero rows, or no numeric values for `mean`/`max`, give [`MetricValue::NoData`]. `sum` over
/// rows that are all missing is `0`.
pub fn aggregate_scalar(table: &Table, column: &str, op: Operation) -> DashResult<MetricValue> {
    let col = column_index(table, column)?;
    if table.is_empty() {
        return Ok(MetricValue::NoData);
    }
    let scan = table.scan();
    let value = match op {
        Operation::Sum => scan.sum_f64(col),
        Operation::Mean => scan.mean_f64(col),
        Operation::Max => scan.max_f64(col),
    };
    Ok(MetricValue::from_option(value))
}
