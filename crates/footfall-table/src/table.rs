#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::types::{ColumnType, HashKey, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("row length mismatch: expected {expected} values, got {actual}")]
    RowLength { expected: usize, actual: usize },
    #[error("column index {0} out of range")]
    ColumnOutOfRange(usize),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("column length mismatch for {column}: expected {expected} values, got {actual}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("mask length mismatch: expected {expected} bits, got {actual}")]
    MaskLength { expected: usize, actual: usize },
}

pub type TableResult<T> = Result<T, TableError>;

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Column {
    schema: ColumnSchema,
    values: Vec<Value>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.schema.column_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn from_values(schema: ColumnSchema, values: Vec<Value>) -> Self {
        let values: Vec<Value> = values
            .into_iter()
            .map(|v| coerce(schema.column_type, v))
            .collect();
        Self { schema, values }
    }
}

/// Values that do not match the declared column type become `Null`.
fn coerce(column_type: ColumnType, value: Value) -> Value {
    match (column_type, value) {
        (_, v) if v.is_null() => Value::Null,
        (ColumnType::Number, v @ Value::Number(_))
        | (ColumnType::Boolean, v @ Value::Boolean(_))
        | (ColumnType::String, v @ Value::String(_))
        | (ColumnType::DateTime, v @ Value::DateTime(_)) => v,
        _ => Value::Null,
    }
}

/// An immutable, typed, column-major table.
///
/// Every transformation (`select`, `head`, `with_column`) returns a new table; the receiver is
/// never modified.
#[derive(Clone, Debug)]
pub struct Table {
    schema: Vec<ColumnSchema>,
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// A zero-row table with the given schema.
    pub fn empty(schema: Vec<ColumnSchema>) -> Self {
        TableBuilder::new(schema).finalize()
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    /// Index of the column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().map(|c| c.name.as_str())
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Value {
        self.columns
            .get(col)
            .and_then(|c| c.values.get(row))
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        (0..self.columns.len())
            .map(|col| self.get_cell(row, col))
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.rows).map(|r| self.row(r))
    }

    /// Sorted distinct non-missing values of a column.
    pub fn distinct_values(&self, col: usize) -> TableResult<Vec<Value>> {
        let column = self
            .columns
            .get(col)
            .ok_or(TableError::ColumnOutOfRange(col))?;
        let mut seen = HashSet::new();
        let mut out: Vec<Value> = column
            .values
            .iter()
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert(HashKey::of(v)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.total_cmp(b));
        Ok(out)
    }

    /// Rows whose bit is set in `mask`, in their original order.
    pub fn select(&self, mask: &BitVec) -> TableResult<Table> {
        if mask.len() != self.rows {
            return Err(TableError::MaskLength {
                expected: self.rows,
                actual: mask.len(),
            });
        }
        if mask.all_true() {
            return Ok(self.clone());
        }
        let rows: Vec<usize> = mask.iter_ones().collect();
        Ok(self.take_rows(&rows))
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..n.min(self.rows)).collect();
        self.take_rows(&rows)
    }

    fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values: Vec<Value> = rows
                    .iter()
                    .map(|&r| c.values.get(r).cloned().unwrap_or(Value::Null))
                    .collect();
                Column::from_values(c.schema.clone(), values)
            })
            .collect();
        Table {
            schema: self.schema.clone(),
            columns,
            rows: rows.len(),
        }
    }

    /// Only the listed columns, in the listed order.
    pub fn project(&self, cols: &[usize]) -> TableResult<Table> {
        let mut schema = Vec::with_capacity(cols.len());
        let mut columns = Vec::with_capacity(cols.len());
        for &c in cols {
            let column = self.columns.get(c).ok_or(TableError::ColumnOutOfRange(c))?;
            schema.push(column.schema.clone());
            columns.push(column.clone());
        }
        Ok(Table {
            schema,
            columns,
            rows: self.rows,
        })
    }

    /// A copy of this table with one extra column appended.
    pub fn with_column(&self, schema: ColumnSchema, values: Vec<Value>) -> TableResult<Table> {
        if self.column_index(&schema.name).is_some() {
            return Err(TableError::DuplicateColumn(schema.name));
        }
        if values.len() != self.rows {
            return Err(TableError::ColumnLength {
                column: schema.name,
                expected: self.rows,
                actual: values.len(),
            });
        }

        let mut out = self.clone();
        out.schema.push(schema.clone());
        out.columns.push(Column::from_values(schema, values));
        Ok(out)
    }

    pub fn scan(&self) -> TableScan<'_> {
        TableScan { table: self }
    }
}

/// Whole-column numeric reductions that ignore missing values.
pub struct TableScan<'a> {
    table: &'a Table,
}

impl<'a> TableScan<'a> {
    /// `None` when the column is missing or not numeric; `0` when no value is present.
    pub fn sum_f64(&self, col: usize) -> Option<f64> {
        Some(self.numeric_values(col)?.sum())
    }

    /// `None` when no numeric value is present.
    pub fn mean_f64(&self, col: usize) -> Option<f64> {
        let (sum, count) = self.numeric_values(col)?.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// `None` when no numeric value is present.
    pub fn max_f64(&self, col: usize) -> Option<f64> {
        self.numeric_values(col)?.reduce(f64::max)
    }

    fn numeric_values(&self, col: usize) -> Option<impl Iterator<Item = f64> + 'a> {
        let column = self.table.columns.get(col)?;
        if !column.column_type().is_numeric() {
            return None;
        }
        Some(column.values.iter().filter_map(Value::as_f64))
    }
}

/// Row-at-a-time table construction.
pub struct TableBuilder {
    schema: Vec<ColumnSchema>,
    values: Vec<Vec<Value>>,
    rows: usize,
}

impl TableBuilder {
    pub fn new(schema: Vec<ColumnSchema>) -> Self {
        let values = schema.iter().map(|_| Vec::new()).collect();
        Self {
            schema,
            values,
            rows: 0,
        }
    }

    pub fn append_row(&mut self, row: &[Value]) -> TableResult<()> {
        if row.len() != self.schema.len() {
            return Err(TableError::RowLength {
                expected: self.schema.len(),
                actual: row.len(),
            });
        }

        for (idx, value) in row.iter().enumerate() {
            let value = coerce(self.schema[idx].column_type, value.clone());
            self.values[idx].push(value);
        }
        self.rows += 1;
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn finalize(self) -> Table {
        let columns = self
            .schema
            .iter()
            .cloned()
            .zip(self.values)
            .map(|(schema, values)| Column { schema, values })
            .collect();

        Table {
            schema: self.schema,
            columns,
            rows: self.rows,
        }
    }
}
