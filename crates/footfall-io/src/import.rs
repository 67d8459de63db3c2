use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use csv::ByteRecord;
use encoding_rs::WINDOWS_1252;
use footfall_table::{
    date_to_millis, ColumnSchema, ColumnType, Table, TableBuilder, TableError, Value,
};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Rows inspected before column types are fixed. Sampling continues past this while some
    /// column has shown no value yet. Later rows that do not parse as the inferred type load
    /// as missing values.
    pub sample_rows: usize,
    /// How to decode raw CSV bytes into text fields.
    pub encoding: CsvTextEncoding,
    /// Decimal separator used when parsing numbers.
    ///
    /// `.` matches inputs like `1,234.56`. `,` matches inputs like `1.234,56`.
    pub decimal_separator: char,
    /// Preferred order for ambiguous numeric dates like `01/02/2024`.
    pub date_order: CsvDateOrder,
    /// Field texts that mean "no value", in addition to the empty string.
    pub null_tokens: Vec<String>,
    /// Case-insensitive column-name fragments that force date parsing. Such a column loads as
    /// `DateTime` when any sampled value is a date (or it has no values at all); everything
    /// else in it becomes missing.
    pub date_name_hints: Vec<String>,
    /// Case-insensitive column-name fragments that mark a numeric column. Such a column loads
    /// as `Number` when any sampled value is a number; everything else in it becomes missing.
    pub number_name_hints: Vec<String>,
    /// Column types, in column order, that replace inference for the first `len()` columns.
    /// Used when re-loading a table written by [`crate::export_csv`].
    pub column_types: Option<Vec<ColumnType>>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            sample_rows: 100,
            encoding: CsvTextEncoding::Auto,
            decimal_separator: '.',
            date_order: CsvDateOrder::default(),
            null_tokens: ["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            date_name_hints: vec!["date".to_owned()],
            number_name_hints: Vec::new(),
            column_types: None,
        }
    }
}

impl CsvOptions {
    /// Pin every column to the type it has in `schema`.
    pub fn with_schema(mut self, schema: &[ColumnSchema]) -> Self {
        self.column_types = Some(schema.iter().map(|c| c.column_type).collect());
        self
    }

    fn pinned_type(&self, col: usize) -> Option<ColumnType> {
        self.column_types.as_ref()?.get(col).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvTextEncoding {
    /// Decode as UTF-8; a field with invalid UTF-8 falls back to Windows-1252.
    Auto,
    /// Decode as UTF-8 and reject invalid byte sequences.
    Utf8,
    /// Decode as Windows-1252 (aka CP-1252).
    Windows1252,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CsvDateOrder {
    /// Month / day / year (e.g. `12/31/2024`).
    #[default]
    Mdy,
    /// Day / month / year (e.g. `31/12/2024`).
    Dmy,
    /// Year / month / day (e.g. `2024/12/31`).
    Ymd,
}

/// The dataset could not be loaded at all.
#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("csv input was empty")]
    EmptyInput,
    #[error("csv parse error at row {row}, column {column}: {reason}")]
    Parse { row: u64, column: u64, reason: String },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn import_csv_bytes(bytes: &[u8], options: &CsvOptions) -> Result<Table, CsvImportError> {
    import_csv(bytes, options)
}

/// Load a delimited-text stream into a [`Table`].
///
/// Column types are inferred from the first `sample_rows` rows. Individual fields that fail to
/// parse as their column's type load as missing values instead of failing the import.
pub fn import_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Table, CsvImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // Headers are handled here so row/column locations stay consistent in errors.
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut record = ByteRecord::new();
    let mut record_index: u64 = 0;

    let has_first = csv_reader
        .read_byte_record(&mut record)
        .map_err(|e| map_csv_error(e, record_index + 1))?;
    if !has_first {
        return Err(CsvImportError::EmptyInput);
    }
    record_index += 1;

    let mut header_names: Vec<String> = Vec::new();
    let mut sample_rows: Vec<Vec<String>> = Vec::new();
    // Columns whose type is settled: pinned, or a value has been sampled.
    let mut settled: Vec<bool> = Vec::new();

    if options.has_header {
        header_names = decode_record_to_strings(&record, record_index, options.encoding)?;
        note_sampled_row(&header_names, &[], &mut settled, options);
    } else {
        let row = decode_record_to_strings(&record, record_index, options.encoding)?;
        note_sampled_row(&row, &row, &mut settled, options);
        sample_rows.push(row);
    }

    while sample_rows.len() < options.sample_rows || settled.iter().any(|s| !s) {
        record.clear();
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                let row = decode_record_to_strings(&record, record_index, options.encoding)?;
                note_sampled_row(&row, &row, &mut settled, options);
                sample_rows.push(row);
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }
    let column_count = settled.len();

    let header_names = normalize_headers(header_names, column_count.max(1));
    let column_count = header_names.len();

    let column_types: Vec<ColumnType> = header_names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            if let Some(pinned) = options.pinned_type(col) {
                return pinned;
            }
            let samples = sample_rows
                .iter()
                .map(|row| row.get(col).map(String::as_str).unwrap_or(""));
            infer_column_type(name, samples, options)
        })
        .collect();

    let schema: Vec<ColumnSchema> = header_names
        .iter()
        .cloned()
        .zip(column_types.iter().copied())
        .map(|(name, column_type)| ColumnSchema { name, column_type })
        .collect();

    let mut builder = TableBuilder::new(schema);
    let mut string_pool = StringPool::new();
    let mut coerced = vec![0u64; column_count];
    let mut row_values: Vec<Value> = vec![Value::Null; column_count];

    for row in &sample_rows {
        for (i, column_type) in column_types.iter().copied().enumerate() {
            let field = row.get(i).map(String::as_str).unwrap_or("");
            row_values[i] =
                parse_or_null(field, column_type, options, &mut string_pool, &mut coerced[i]);
        }
        builder.append_row(&row_values)?;
    }

    // Stream the remainder.
    loop {
        record.clear();
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                for (i, column_type) in column_types.iter().copied().enumerate() {
                    let raw = record.get(i).unwrap_or(b"");
                    let field = decode_field(raw, record_index, i as u64 + 1, options.encoding)?;
                    row_values[i] = parse_or_null(
                        field.as_ref(),
                        column_type,
                        options,
                        &mut string_pool,
                        &mut coerced[i],
                    );
                }
                builder.append_row(&row_values)?;
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }

    for ((name, column_type), count) in header_names.iter().zip(&column_types).zip(&coerced) {
        if *count > 0 {
            log::warn!(
                "column {name:?}: {count} value(s) did not parse as {column_type:?} and were loaded as missing"
            );
        }
    }

    let table = builder.finalize();
    log::info!(
        "loaded dataset with {} rows and {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Pads the header to `column_count`, names blank headers `ColumnN`, and suffixes repeated
/// names (`Ghat`, `Ghat.1`, ...) so every column is addressable by name.
fn normalize_headers(mut names: Vec<String>, column_count: usize) -> Vec<String> {
    if names.len() < column_count {
        names.resize(column_count, String::new());
    }

    let mut seen: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.trim();
            let base = if name.is_empty() {
                format!("Column{}", idx + 1)
            } else {
                name.to_owned()
            };
            let mut candidate = base.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}.{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Widens `settled` to the row's width and marks columns that are pinned or where `values`
/// has a non-missing field.
fn note_sampled_row(
    row: &[String],
    values: &[String],
    settled: &mut Vec<bool>,
    options: &CsvOptions,
) {
    if settled.len() < row.len() {
        let start = settled.len();
        settled.extend((start..row.len()).map(|col| options.pinned_type(col).is_some()));
    }
    for (col, value) in values.iter().enumerate() {
        if !is_null_token(value.trim(), options) {
            settled[col] = true;
        }
    }
}

fn is_null_token(v: &str, options: &CsvOptions) -> bool {
    v.is_empty() || options.null_tokens.iter().any(|t| t == v)
}

fn parse_or_null(
    field: &str,
    column_type: ColumnType,
    options: &CsvOptions,
    string_pool: &mut StringPool,
    coerced: &mut u64,
) -> Value {
    match parse_typed_value(field, column_type, options, string_pool) {
        Some(v) => v,
        None => {
            *coerced += 1;
            Value::Null
        }
    }
}

/// `None` means the field had content that is not a valid `column_type`.
fn parse_typed_value(
    field: &str,
    column_type: ColumnType,
    options: &CsvOptions,
    string_pool: &mut StringPool,
) -> Option<Value> {
    let v = field.trim();
    if is_null_token(v, options) {
        return Some(Value::Null);
    }

    match column_type {
        ColumnType::Number => parse_number_f64(v, options).map(Value::Number),
        ColumnType::String => Some(Value::String(string_pool.intern(v))),
        ColumnType::Boolean => parse_bool(v).map(Value::Boolean),
        ColumnType::DateTime => parse_datetime_millis(v, options.date_order).map(Value::DateTime),
    }
}

fn infer_column_type<'a>(
    name: &str,
    samples: impl Iterator<Item = &'a str>,
    options: &CsvOptions,
) -> ColumnType {
    let mut saw_value = false;
    let mut is_bool = true;
    let mut saw_text_bool = false;
    let mut is_datetime = true;
    let mut saw_datetime = false;
    let mut is_number = true;
    let mut saw_number = false;

    for v in samples {
        let v = v.trim();
        if is_null_token(v, options) {
            continue;
        }
        saw_value = true;
        match parse_bool(v) {
            Some(_) if !matches!(v, "0" | "1") => saw_text_bool = true,
            Some(_) => {}
            None => is_bool = false,
        }
        if parse_datetime_millis(v, options.date_order).is_some() {
            saw_datetime = true;
        } else {
            is_datetime = false;
        }
        if parse_number_f64(v, options).is_some() {
            saw_number = true;
        } else {
            is_number = false;
        }
    }

    let lowered = name.to_lowercase();
    let hinted = |hints: &[String]| hints.iter().any(|h| lowered.contains(&h.to_lowercase()));
    if hinted(&options.date_name_hints) && (saw_datetime || !saw_value) {
        return ColumnType::DateTime;
    }
    if hinted(&options.number_name_hints) && (saw_number || !saw_value) {
        return ColumnType::Number;
    }

    if !saw_value {
        ColumnType::String
    } else if is_bool && saw_text_bool {
        ColumnType::Boolean
    } else if is_datetime {
        ColumnType::DateTime
    } else if is_number {
        ColumnType::Number
    } else {
        ColumnType::String
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number_f64(v: &str, options: &CsvOptions) -> Option<f64> {
    let (sign, body) = split_sign_and_body(v);
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let normalized = normalize_number(body, options.decimal_separator)?;
    let parsed: f64 = normalized.parse().ok()?;
    Some(parsed * sign)
}

fn normalize_number(s: &str, decimal_separator: char) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut saw_digit = false;
    let mut saw_decimal = false;
    let mut saw_exp = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            saw_digit = true;
            out.push(ch);
        } else if !saw_exp && ch == decimal_separator {
            if saw_decimal {
                return None;
            }
            saw_decimal = true;
            out.push('.');
        } else if !saw_exp && is_grouping_separator(ch, decimal_separator) {
            continue;
        } else if !saw_exp && saw_digit && matches!(ch, 'e' | 'E') {
            saw_exp = true;
            out.push('e');
        } else if saw_exp && out.ends_with('e') && matches!(ch, '+' | '-') {
            out.push(ch);
        } else {
            return None;
        }
    }

    if !saw_digit || out.ends_with(['e', '+', '-']) {
        return None;
    }
    Some(out)
}

/// Handles a leading `-`/`+` and accounting-style `(123)` negatives.
fn split_sign_and_body(mut s: &str) -> (f64, &str) {
    s = s.trim();
    let mut sign = 1.0;

    if let Some(inner) = s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        sign = -1.0;
        s = inner.trim();
    }

    if let Some(rest) = s.strip_prefix('-') {
        sign = -sign;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }

    (sign, s)
}

fn is_grouping_separator(ch: char, decimal_separator: char) -> bool {
    match ch {
        ',' => decimal_separator != ',',
        '.' => decimal_separator != '.',
        ' ' | '\u{00A0}' | '\u{202F}' | '_' | '\'' => true,
        _ => false,
    }
}

const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Milliseconds since the Unix epoch for dates like `2025-01-13`, `13/01/2025`,
/// `13-Jan-2025` or `2025-01-13 08:30:00`. Values with a UTC offset other than `Z` are
/// rejected.
pub(crate) fn parse_datetime_millis(v: &str, date_order: CsvDateOrder) -> Option<i64> {
    let s = v.trim();
    if let Some(date) = NAMED_MONTH_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(date_to_millis(date));
    }

    let (date, rest) = parse_numeric_date_prefix(s, date_order)?;
    let rest = rest.trim_start_matches(['T', ' ']);
    let rest = rest.strip_suffix(['Z', 'z']).unwrap_or(rest).trim();
    if rest.is_empty() {
        return Some(date_to_millis(date));
    }

    let time = TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(rest, f).ok())?;
    Some(date.and_time(time).and_utc().timestamp_millis())
}

fn parse_numeric_date_prefix(s: &str, date_order: CsvDateOrder) -> Option<(NaiveDate, &str)> {
    let date_end = s
        .bytes()
        .position(|b| !(b.is_ascii_digit() || b == b'-' || b == b'/' || b == b'.'))
        .unwrap_or(s.len());
    if date_end == 0 {
        return None;
    }

    // Safe to slice: the prefix is ASCII only.
    let date_part = &s[..date_end];
    let rest = &s[date_end..];

    let parts: Vec<&str> = date_part.split(['-', '/', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    if [a, b, c].iter().any(|p| p.is_empty()) {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)
    } else if c.len() == 4 {
        let first: u32 = a.parse().ok()?;
        let second: u32 = b.parse().ok()?;
        let (month, day) = if first > 12 && second <= 12 {
            (second, first)
        } else if second > 12 && first <= 12 {
            (first, second)
        } else {
            match date_order {
                CsvDateOrder::Dmy => (second, first),
                CsvDateOrder::Mdy | CsvDateOrder::Ymd => (first, second),
            }
        };
        (c.parse().ok()?, month, day)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, rest))
}

fn decode_record_to_strings(
    record: &ByteRecord,
    row: u64,
    encoding: CsvTextEncoding,
) -> Result<Vec<String>, CsvImportError> {
    record
        .iter()
        .enumerate()
        .map(|(idx, field)| decode_field(field, row, idx as u64 + 1, encoding).map(Cow::into_owned))
        .collect()
}

fn decode_field(
    field: &[u8],
    row: u64,
    column: u64,
    encoding: CsvTextEncoding,
) -> Result<Cow<'_, str>, CsvImportError> {
    // Excel-exported CSVs often start with a UTF-8 BOM.
    let field = if row == 1 && column == 1 && field.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &field[3..]
    } else {
        field
    };

    match encoding {
        CsvTextEncoding::Utf8 => std::str::from_utf8(field)
            .map(Cow::Borrowed)
            .map_err(|e| CsvImportError::Parse {
                row,
                column,
                reason: format!("invalid UTF-8: {e}"),
            }),
        CsvTextEncoding::Windows1252 => Ok(WINDOWS_1252.decode(field).0),
        CsvTextEncoding::Auto => match std::str::from_utf8(field) {
            Ok(s) => Ok(Cow::Borrowed(s)),
            Err(_) => Ok(WINDOWS_1252.decode(field).0),
        },
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> CsvImportError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => CsvImportError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record())
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            CsvImportError::Parse {
                row,
                column: 0,
                reason,
            }
        }
    }
}

struct StringPool {
    set: HashMap<Arc<str>, ()>,
}

impl StringPool {
    fn new() -> Self {
        Self {
            set: HashMap::new(),
        }
    }

    fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some((k, _)) = self.set.get_key_value(s) {
            return k.clone();
        }

        let arc: Arc<str> = Arc::<str>::from(s);
        self.set.insert(arc.clone(), ());
        arc
    }
}
