use std::collections::BTreeMap;

use chrono::NaiveDate;
use footfall_table::{date_to_millis, CmpOp, FilterExpr, FilterValue, Table, Value};
use serde::Serialize;

use crate::error::{DashError, DashResult};
use crate::roles::{Role, RoleMap};

/// Inclusive range of calendar days. A missing bound is open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Selection {
    #[default]
    All,
    /// Rows whose value equals this exactly.
    Value(Value),
}

/// The operator's current filter choices. Roles not mentioned are unrestricted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    pub selections: BTreeMap<Role, Selection>,
}

impl FilterSpec {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn select(mut self, role: Role, value: impl Into<Value>) -> Self {
        self.selections.insert(role, Selection::Value(value.into()));
        self
    }

    /// The row predicate for `table`. Filters on unresolved roles are dropped.
    pub fn to_expr(&self, table: &Table, roles: &RoleMap) -> DashResult<FilterExpr> {
        let mut parts = Vec::new();

        if let (Some(range), Some(date_col)) = (self.date_range, roles.column(Role::Date)) {
            let col = column_index(table, date_col)?;
            if let Some(start) = range.start {
                parts.push(FilterExpr::Cmp {
                    col,
                    op: CmpOp::Gte,
                    value: FilterValue::DateTime(date_to_millis(start)),
                });
            }
            if let Some(next_day) = range.end.and_then(|end| end.succ_opt()) {
                parts.push(FilterExpr::Cmp {
                    col,
                    op: CmpOp::Lt,
                    value: FilterValue::DateTime(date_to_millis(next_day)),
                });
            }
        }

        for (role, selection) in &self.selections {
            let Selection::Value(value) = selection else {
                continue;
            };
            let Some(name) = roles.column(*role) else {
                log::debug!("ignoring filter on unresolved role {role}");
                continue;
            };
            let col = column_index(table, name)?;
            match FilterValue::from_value(value) {
                Some(value) => parts.push(FilterExpr::eq(col, value)),
                // A missing value matches nothing.
                None => parts.push(FilterExpr::Not(Box::new(FilterExpr::All))),
            }
        }

        Ok(match parts.len() {
            0 => FilterExpr::All,
            _ => FilterExpr::And(parts),
        })
    }
}

/// The rows of `table` passing every filter in `spec`, as a new table.
///
/// A combination that matches nothing yields an empty table, never an error.
pub fn apply(table: &Table, roles: &RoleMap, spec: &FilterSpec) -> DashResult<Table> {
    let expr = spec.to_expr(table, roles)?;
    let filtered = table.filter(&expr)?;
    log::debug!(
        "filter kept {} of {} rows",
        filtered.row_count(),
        table.row_count()
    );
    Ok(filtered)
}

pub(crate) fn column_index(table: &Table, name: &str) -> DashResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| DashError::UnknownColumn(name.to_owned()))
}

/// Choices offered to the operator, always computed from the unfiltered dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub date_bounds: Option<DateRange>,
    pub categorical: BTreeMap<Role, Vec<Value>>,
}

/// Label of the unrestricted choice.
pub const ALL_OPTION: &str = "All";

impl FilterOptions {
    pub fn from_table(table: &Table, roles: &RoleMap) -> DashResult<Self> {
        let date_bounds = match roles.column(Role::Date) {
            Some(name) => {
                let col = column_index(table, name)?;
                let days: Vec<NaiveDate> = table
                    .column(col)
                    .map(|c| c.values().iter().filter_map(Value::as_date).collect())
                    .unwrap_or_default();
                match (days.iter().min(), days.iter().max()) {
                    (Some(min), Some(max)) => Some(DateRange::new(*min, *max)),
                    _ => None,
                }
            }
            None => None,
        };

        let mut categorical = BTreeMap::new();
        for role in Role::FILTERS {
            let values = match roles.column(role) {
                Some(name) => table.distinct_values(column_index(table, name)?)?,
                None => Vec::new(),
            };
            categorical.insert(role, values);
        }

        Ok(Self {
            date_bounds,
            categorical,
        })
    }

    /// `All` followed by the display text of each distinct value.
    pub fn choices(&self, role: Role) -> Vec<String> {
        std::iter::once(ALL_OPTION.to_owned())
            .chain(
                self.categorical
                    .get(&role)
                    .into_iter()
                    .flatten()
                    .map(ToString::to_string),
            )
            .collect()
    }

    /// Map an operator's text choice to a selection. `All` (any case) is unrestricted; text
    /// matching a listed value selects that value with its original type.
    pub fn parse_choice(&self, role: Role, text: &str) -> Selection {
        if text.eq_ignore_ascii_case(ALL_OPTION) {
            return Selection::All;
        }
        let known = self
            .categorical
            .get(&role)
            .into_iter()
            .flatten()
            .find(|v| v.to_string() == text);
        Selection::Value(known.cloned().unwrap_or_else(|| Value::string(text)))
    }

    /// Fill the open ends of `range` from the dataset's bounds.
    pub fn complete_range(&self, range: DateRange) -> DateRange {
        let bounds = self.date_bounds.unwrap_or_default();
        DateRange {
            start: range.start.or(bounds.start),
            end: range.end.or(bounds.end),
        }
    }
}
