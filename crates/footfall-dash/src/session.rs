use footfall_format::MetricValue;
use footfall_io::{import_csv_bytes, CsvOptions};
use footfall_table::{ColumnSchema, ColumnType, Table, Value};

use crate::aggregate::{
    aggregate, aggregate_scalar, AggregationRequest, AggregationResult, Operation,
};
use crate::error::{DashError, DashResult};
use crate::filter::{apply, FilterOptions, FilterSpec};
use crate::roles::{classify, DerivedKind, Resolution, Role, RoleMap};

/// Where a group key or value column comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnRef {
    /// The first column resolved for a role.
    Role(Role),
    /// The day column, else the weekday of the date, else the row index.
    DayAxis,
    /// The date column, else the row index.
    DateOrRowIndex,
    Name(String),
}

/// A loaded dataset with everything derived from it once: the role map, synthetic columns and
/// the filter choices. Never modified after construction, so it can be shared across requests.
#[derive(Debug)]
pub struct Session {
    table: Table,
    source_columns: usize,
    roles: RoleMap,
    day_axis: Resolution,
    row_index: Option<String>,
    filter_options: FilterOptions,
}

impl Session {
    /// Load a CSV dataset. Columns named like a numeric role load as numbers even when a few of
    /// their values are not.
    pub fn from_csv_bytes(bytes: &[u8], options: &CsvOptions) -> DashResult<Self> {
        let mut options = options.clone();
        options.number_name_hints.extend(Role::number_hints());
        let table = import_csv_bytes(bytes, &options)?;
        Self::new(table)
    }

    pub fn new(source: Table) -> DashResult<Self> {
        let source_columns = source.column_count();
        let roles = classify(source.schema());
        let filter_options = FilterOptions::from_table(&source, &roles)?;

        let mut table = source;
        let day_axis = if let Some(day) = roles.column(Role::Day) {
            Resolution::Resolved {
                column: day.to_owned(),
            }
        } else if let Some(date) = roles.column(Role::Date) {
            let (next, column) = with_day_names(&table, date)?;
            table = next;
            Resolution::Derived {
                kind: DerivedKind::DayName,
                column,
            }
        } else {
            let (next, column) = with_row_index(&table)?;
            table = next;
            Resolution::Derived {
                kind: DerivedKind::RowIndex,
                column,
            }
        };

        let row_index = match (&day_axis, roles.is_resolved(Role::Date)) {
            (Resolution::Derived { kind: DerivedKind::RowIndex, column }, _) => Some(column.clone()),
            (_, true) => None,
            (_, false) => {
                let (next, column) = with_row_index(&table)?;
                table = next;
                Some(column)
            }
        };

        log::debug!("day axis: {day_axis:?}");
        Ok(Self {
            table,
            source_columns,
            roles,
            day_axis,
            row_index,
            filter_options,
        })
    }

    /// The loaded dataset plus any synthetic columns, unfiltered.
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn roles(&self) -> &RoleMap {
        &self.roles
    }

    pub fn day_axis(&self) -> &Resolution {
        &self.day_axis
    }

    pub fn filter_options(&self) -> &FilterOptions {
        &self.filter_options
    }

    pub fn filter(&self, spec: &FilterSpec) -> DashResult<Table> {
        apply(&self.table, &self.roles, spec)
    }

    /// `filtered` without the synthetic columns, i.e. with the loaded dataset's columns only.
    pub fn source_view(&self, filtered: &Table) -> DashResult<Table> {
        let cols: Vec<usize> = (0..self.source_columns).collect();
        Ok(filtered.project(&cols)?)
    }

    /// Load CSV text written from a [`Session::source_view`] of this session, keeping the loaded
    /// dataset's column types instead of inferring them from the subset.
    pub fn reload_export(&self, bytes: &[u8]) -> DashResult<Table> {
        let schema = &self.table.schema()[..self.source_columns];
        let options = CsvOptions::default().with_schema(schema);
        Ok(import_csv_bytes(bytes, &options)?)
    }

    pub fn resolve(&self, column: &ColumnRef) -> DashResult<String> {
        let name = match column {
            ColumnRef::Role(role) => self
                .roles
                .column(*role)
                .ok_or(DashError::UnresolvedRole(*role))?,
            ColumnRef::DayAxis => self
                .day_axis
                .column()
                .ok_or(DashError::UnresolvedRole(Role::Day))?,
            ColumnRef::DateOrRowIndex => match self.roles.column(Role::Date) {
                Some(date) => date,
                None => self
                    .row_index
                    .as_deref()
                    .ok_or(DashError::UnresolvedRole(Role::Date))?,
            },
            ColumnRef::Name(name) => {
                if self.table.column_index(name).is_none() {
                    return Err(DashError::UnknownColumn(name.clone()));
                }
                name
            }
        };
        Ok(name.to_owned())
    }

    pub fn request(
        &self,
        keys: &[ColumnRef],
        values: &[ColumnRef],
        op: Operation,
    ) -> DashResult<AggregationRequest> {
        Ok(AggregationRequest {
            group_keys: keys.iter().map(|k| self.resolve(k)).collect::<DashResult<_>>()?,
            value_columns: values.iter().map(|v| self.resolve(v)).collect::<DashResult<_>>()?,
            op,
        })
    }

    pub fn aggregate(
        &self,
        filtered: &Table,
        keys: &[ColumnRef],
        values: &[ColumnRef],
        op: Operation,
    ) -> DashResult<AggregationResult> {
        aggregate(filtered, &self.request(keys, values, op)?)
    }

    /// A role's column reduced to one value; [`MetricValue::Unresolved`] when the role has no
    /// column.
    pub fn metric(&self, filtered: &Table, role: Role, op: Operation) -> DashResult<MetricValue> {
        match self.roles.column(role) {
            Some(column) => aggregate_scalar(filtered, column, op),
            None => Ok(MetricValue::Unresolved),
        }
    }
}

fn unused_name(table: &Table, base: &str) -> String {
    let mut name = base.to_owned();
    let mut n = 1;
    while table.column_index(&name).is_some() {
        name = format!("{base}_{n}");
        n += 1;
    }
    name
}

fn with_day_names(table: &Table, date_column: &str) -> DashResult<(Table, String)> {
    let name = unused_name(table, DerivedKind::DayName.base_name());
    let values: Vec<Value> = table
        .column_index(date_column)
        .and_then(|c| table.column(c))
        .map(|c| {
            c.values()
                .iter()
                .map(|v| match v.as_date() {
                    Some(d) => Value::string(d.format("%A").to_string()),
                    None => Value::Null,
                })
                .collect()
        })
        .ok_or_else(|| DashError::UnknownColumn(date_column.to_owned()))?;
    let table = table.with_column(ColumnSchema::new(name.clone(), ColumnType::String), values)?;
    Ok((table, name))
}

fn with_row_index(table: &Table) -> DashResult<(Table, String)> {
    let name = unused_name(table, DerivedKind::RowIndex.base_name());
    let values = (0..table.row_count()).map(|i| Value::Number(i as f64)).collect();
    let table = table.with_column(ColumnSchema::new(name.clone(), ColumnType::Number), values)?;
    Ok((table, name))
}
