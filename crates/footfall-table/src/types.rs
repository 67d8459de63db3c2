#![forbid(unsafe_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub(crate) const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Number,
    #[default]
    String,
    Boolean,
    /// Milliseconds since the Unix epoch, UTC.
    DateTime,
}

impl ColumnType {
    /// Whether values of this type take part in `sum`/`mean`/`max`.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Boolean)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Boolean(bool),
    String(Arc<str>),
    DateTime(i64),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::<str>::from(s.as_ref()))
    }

    pub fn date(date: NaiveDate) -> Self {
        Value::DateTime(date_to_millis(date))
    }

    /// A `NaN` number is missing data, same as `Null`.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Numeric view used by aggregations. Booleans count as `0`/`1`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_datetime_millis(&self) -> Option<i64> {
        match self {
            Value::DateTime(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Calendar day of a `DateTime` value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_datetime_millis().and_then(millis_to_datetime).map(|dt| dt.date())
    }

    /// Total order used for group keys and option lists.
    ///
    /// Booleans < numbers < date-times < strings, with missing values last.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            if v.is_null() {
                return 4;
            }
            match v {
                Value::Boolean(_) => 0,
                Value::Number(_) => 1,
                Value::DateTime(_) => 2,
                Value::String(_) => 3,
                Value::Null => 4,
            }
        }

        match (self, other) {
            (a, b) if a.is_null() || b.is_null() => rank(a).cmp(&rank(b)),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.as_ref().cmp(b.as_ref()),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) if n.is_nan() => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(s),
            Value::DateTime(ms) => f.write_str(&render_datetime(*ms)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            v if v.is_null() => serializer.serialize_none(),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::DateTime(ms) => serializer.serialize_str(&render_datetime(*ms)),
            Value::Null => serializer.serialize_none(),
        }
    }
}

/// Hashable projection of a [`Value`], used for distinct values and group keys.
///
/// `-0.0` folds into `0.0` and every `NaN` folds into `Null`, matching how aggregations treat
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum HashKey {
    Null,
    Number(u64),
    Boolean(bool),
    String(Arc<str>),
    DateTime(i64),
}

impl HashKey {
    pub fn of(value: &Value) -> Self {
        match value {
            v if v.is_null() => HashKey::Null,
            Value::Number(n) if *n == 0.0 => HashKey::Number(0f64.to_bits()),
            Value::Number(n) => HashKey::Number(n.to_bits()),
            Value::Boolean(b) => HashKey::Boolean(*b),
            Value::String(s) => HashKey::String(s.clone()),
            Value::DateTime(ms) => HashKey::DateTime(*ms),
            Value::Null => HashKey::Null,
        }
    }
}

pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

pub fn millis_to_datetime(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

/// Date-only values render as `YYYY-MM-DD`; anything with a clock part keeps it, so the
/// text parses back to the same instant.
fn render_datetime(ms: i64) -> String {
    let Some(dt) = millis_to_datetime(ms) else {
        return ms.to_string();
    };
    if ms.rem_euclid(MILLIS_PER_DAY) == 0 {
        return dt.format("%Y-%m-%d").to_string();
    }
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_missing() {
        assert!(Value::Number(f64::NAN).is_null());
        assert_eq!(Value::Number(f64::NAN).as_f64(), None);
        assert_eq!(Value::Boolean(true).as_f64(), Some(1.0));
    }

    #[test]
    fn columns_default_to_text() {
        assert_eq!(ColumnType::default(), ColumnType::String);
    }

    #[test]
    fn datetime_renders_date_only_at_midnight() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let v = Value::date(d);
        assert_eq!(v.to_string(), "2025-01-13");
        assert_eq!(v.as_date(), Some(d));

        let with_time = Value::DateTime(date_to_millis(d) + 8 * 3_600_000 + 30 * 60_000);
        assert_eq!(with_time.to_string(), "2025-01-13 08:30:00");
    }

    #[test]
    fn total_cmp_puts_missing_last() {
        let mut values = vec![
            Value::Null,
            Value::string("b"),
            Value::Number(2.0),
            Value::string("a"),
            Value::Number(f64::NAN),
            Value::Number(1.0),
        ];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values[0], Value::Number(1.0));
        assert_eq!(values[1], Value::Number(2.0));
        assert_eq!(values[2], Value::string("a"));
        assert_eq!(values[3], Value::string("b"));
        assert!(values[4].is_null() && values[5].is_null());
    }
}
