#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::table::{Table, TableError, TableResult};
use crate::types::Value;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    fn test(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Lte => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Gte => ord != Ordering::Less,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Number(f64),
    String(String),
    Boolean(bool),
    DateTime(i64),
}

impl FilterValue {
    /// `None` for missing values, which can never be matched.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            v if v.is_null() => None,
            Value::Number(n) => Some(FilterValue::Number(*n)),
            Value::Boolean(b) => Some(FilterValue::Boolean(*b)),
            Value::String(s) => Some(FilterValue::String(s.as_ref().to_owned())),
            Value::DateTime(ms) => Some(FilterValue::DateTime(*ms)),
            Value::Null => None,
        }
    }

    fn compare(&self, value: &Value) -> Option<Ordering> {
        match (value, self) {
            (Value::Number(a), FilterValue::Number(b)) => a.partial_cmp(b),
            (Value::Boolean(a), FilterValue::Boolean(b)) => Some(a.cmp(b)),
            (Value::String(a), FilterValue::String(b)) => Some(a.as_ref().cmp(b.as_str())),
            (Value::DateTime(a), FilterValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// A boolean row predicate over a [`Table`].
///
/// Comparisons never match missing cells or cells of a different type, including under
/// [`CmpOp::Ne`].
#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    All,
    Cmp {
        col: usize,
        op: CmpOp,
        value: FilterValue,
    },
    IsNull {
        col: usize,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(col: usize, value: FilterValue) -> Self {
        FilterExpr::Cmp {
            col,
            op: CmpOp::Eq,
            value,
        }
    }
}

impl Table {
    pub fn filter_mask(&self, expr: &FilterExpr) -> TableResult<BitVec> {
        let rows = self.row_count();
        match expr {
            FilterExpr::All => Ok(BitVec::with_len_all_true(rows)),
            FilterExpr::Cmp { col, op, value } => {
                let column = self.column(*col).ok_or(TableError::ColumnOutOfRange(*col))?;
                Ok(BitVec::from_bools(column.values().iter().map(|v| {
                    value.compare(v).is_some_and(|ord| op.test(ord))
                })))
            }
            FilterExpr::IsNull { col } => {
                let column = self.column(*col).ok_or(TableError::ColumnOutOfRange(*col))?;
                Ok(BitVec::from_bools(column.values().iter().map(Value::is_null)))
            }
            FilterExpr::And(parts) => {
                let mut mask = BitVec::with_len_all_true(rows);
                for part in parts {
                    mask.and_inplace(&self.filter_mask(part)?);
                }
                Ok(mask)
            }
            FilterExpr::Or(parts) => {
                let mut mask = BitVec::with_len_all_false(rows);
                for part in parts {
                    mask.or_inplace(&self.filter_mask(part)?);
                }
                Ok(mask)
            }
            FilterExpr::Not(inner) => {
                let mut mask = self.filter_mask(inner)?;
                mask.not_inplace();
                Ok(mask)
            }
        }
    }

    /// Rows matching `expr`, as a new table.
    pub fn filter(&self, expr: &FilterExpr) -> TableResult<Table> {
        let mask = self.filter_mask(expr)?;
        self.select(&mask)
    }
}
