#![forbid(unsafe_code)]

use crate::table::{ColumnSchema, Table, TableBuilder, TableError, TableResult};
use crate::types::{ColumnType, HashKey, Value};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggOp {
    /// Missing values contribute nothing; a group with no numeric values sums to `0`.
    Sum,
    /// Missing values are excluded from the denominator; no values yields `Null`.
    Mean,
    /// No values yields `Null`.
    Max,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
            AggOp::Max => "max",
        })
    }
}

/// One output column of [`Table::group_by`]: `op` over the values of `column`. The output
/// column takes the value column's name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggSpec {
    pub op: AggOp,
    pub column: usize,
}

impl AggSpec {
    pub fn new(op: AggOp, column: usize) -> Self {
        Self { op, column }
    }
}

#[derive(Clone, Debug, Default)]
struct Accumulator {
    numeric: u64,
    sum: f64,
    max: Option<f64>,
}

impl Accumulator {
    fn push(&mut self, value: &Value) {
        if let Some(n) = value.as_f64() {
            self.numeric += 1;
            self.sum += n;
            self.max = Some(self.max.map_or(n, |m| m.max(n)));
        }
    }

    fn finish(&self, op: AggOp) -> Value {
        match op {
            AggOp::Sum => Value::Number(self.sum),
            AggOp::Mean if self.numeric == 0 => Value::Null,
            AggOp::Mean => Value::Number(self.sum / self.numeric as f64),
            AggOp::Max => self.max.map_or(Value::Null, Value::Number),
        }
    }
}

impl Table {
    /// Partition rows by the distinct values of `keys` and reduce each partition with `aggs`.
    ///
    /// The result has the key columns followed by one `Number` column per aggregation, one row
    /// per distinct key. Groups come out sorted by key (lexicographically for several keys,
    /// missing values last); groups whose keys compare equal keep first-appearance order.
    /// Missing keys form their own group so per-group sums always add up to the column total.
    pub fn group_by(&self, keys: &[usize], aggs: &[AggSpec]) -> TableResult<Table> {
        let columns = keys.iter().copied().chain(aggs.iter().map(|a| a.column));
        for col in columns {
            if col >= self.column_count() {
                return Err(TableError::ColumnOutOfRange(col));
            }
        }

        // Non-numeric value columns contribute nothing.
        let numeric: Vec<bool> = aggs
            .iter()
            .map(|a| self.schema()[a.column].column_type.is_numeric())
            .collect();

        let mut index: HashMap<Vec<HashKey>, usize> = HashMap::new();
        let mut group_keys: Vec<Vec<Value>> = Vec::new();
        let mut group_accs: Vec<Vec<Accumulator>> = Vec::new();

        for row in 0..self.row_count() {
            let key_values: Vec<Value> = keys.iter().map(|&k| self.get_cell(row, k)).collect();
            let hashed: Vec<HashKey> = key_values.iter().map(HashKey::of).collect();
            let slot = *index.entry(hashed).or_insert_with(|| {
                group_keys.push(key_values);
                group_accs.push(vec![Accumulator::default(); aggs.len()]);
                group_keys.len() - 1
            });

            for (i, agg) in aggs.iter().enumerate() {
                if numeric[i] {
                    group_accs[slot][i].push(&self.get_cell(row, agg.column));
                }
            }
        }

        let mut order: Vec<usize> = (0..group_keys.len()).collect();
        order.sort_by(|&a, &b| {
            group_keys[a]
                .iter()
                .zip(group_keys[b].iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut schema: Vec<ColumnSchema> = keys
            .iter()
            .map(|&k| self.schema()[k].clone())
            .collect();
        schema.extend(aggs.iter().map(|a| {
            ColumnSchema::new(self.schema()[a.column].name.clone(), ColumnType::Number)
        }));

        let mut builder = TableBuilder::new(schema);
        for g in order {
            let mut row = group_keys[g].clone();
            row.extend(
                aggs.iter()
                    .zip(group_accs[g].iter())
                    .map(|(a, acc)| acc.finish(a.op)),
            );
            builder.append_row(&row)?;
        }

        Ok(builder.finalize())
    }
}
