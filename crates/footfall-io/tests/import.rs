use std::io::Cursor;

use chrono::NaiveDate;
use footfall_io::{import_csv, import_csv_bytes, CsvImportError, CsvOptions, CsvTextEncoding};
use footfall_table::{ColumnType, Value};
use pretty_assertions::assert_eq;

const SAMPLE: &str = "\
Date,Ghat,Total_Footfall,Foreign_Visitors_%,Weather
2025-01-13,A,100,10.5,Clear
2025-01-14,A,50,NaN,Rain
2025-01-13,B,\"1,200\",20,Clear
";

fn day(y: i32, m: u32, d: u32) -> Value {
    Value::date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

#[test]
fn infers_column_types_and_parses_values() {
    let table = import_csv(Cursor::new(SAMPLE.as_bytes()), &CsvOptions::default())
        .expect("import csv");

    let types: Vec<ColumnType> = table.schema().iter().map(|c| c.column_type).collect();
    assert_eq!(
        types,
        vec![
            ColumnType::DateTime,
            ColumnType::String,
            ColumnType::Number,
            ColumnType::Number,
            ColumnType::String,
        ]
    );
    assert_eq!(table.row_count(), 3);
    assert_eq!(
        table.row(0),
        vec![
            day(2025, 1, 13),
            Value::string("A"),
            Value::Number(100.0),
            Value::Number(10.5),
            Value::string("Clear"),
        ]
    );
    assert_eq!(table.get_cell(1, 3), Value::Null);
    assert_eq!(table.get_cell(2, 2), Value::Number(1200.0));
}

#[test]
fn values_past_the_sample_that_do_not_parse_become_missing() {
    let csv = "Footfall,Ghat\n1,A\n2,B\noops,C\n4,D\n";
    let options = CsvOptions {
        sample_rows: 2,
        ..CsvOptions::default()
    };
    let table = import_csv_bytes(csv.as_bytes(), &options).unwrap();

    assert_eq!(table.schema()[0].column_type, ColumnType::Number);
    let footfall: Vec<Value> = table.column(0).unwrap().values().to_vec();
    assert_eq!(
        footfall,
        vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Null,
            Value::Number(4.0)
        ]
    );
    assert_eq!(table.get_cell(2, 1), Value::string("C"));
}

#[test]
fn date_named_columns_coerce_unparseable_values() {
    let csv = "Visit_Date,Footfall\n2025-01-13,1\nnot a date,2\n14/01/2025,3\n";
    let table = import_csv_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();

    assert_eq!(table.schema()[0].column_type, ColumnType::DateTime);
    assert_eq!(
        table.column(0).unwrap().values().to_vec(),
        vec![day(2025, 1, 13), Value::Null, day(2025, 1, 14)]
    );
}

#[test]
fn ragged_rows_and_duplicate_headers() {
    let csv = "Ghat,Ghat,\nA,1\nB,2,x,extra\n";
    let table = import_csv_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();

    let names: Vec<&str> = table.column_names().collect();
    assert_eq!(names, vec!["Ghat", "Ghat.1", "Column3", "Column4"]);
    assert_eq!(
        table.row(0),
        vec![Value::string("A"), Value::Number(1.0), Value::Null, Value::Null]
    );
    assert_eq!(table.get_cell(1, 3), Value::string("extra"));
}

#[test]
fn text_booleans_load_as_booleans_but_zero_one_stays_numeric() {
    let csv = "Holiday,Flag\nyes,1\nno,0\n";
    let table = import_csv_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(table.schema()[0].column_type, ColumnType::Boolean);
    assert_eq!(table.schema()[1].column_type, ColumnType::Number);
    assert_eq!(table.get_cell(0, 0), Value::Boolean(true));
}

#[test]
fn header_only_input_yields_empty_table() {
    let table = import_csv_bytes(b"Date,Ghat\n", &CsvOptions::default()).unwrap();
    assert_eq!(table.row_count(), 0);
    assert_eq!(table.schema()[0].column_type, ColumnType::DateTime);
    assert_eq!(table.schema()[1].column_type, ColumnType::String);
}

#[test]
fn empty_input_is_a_load_failure() {
    let err = import_csv_bytes(b"", &CsvOptions::default()).unwrap_err();
    assert!(matches!(err, CsvImportError::EmptyInput));
}

#[test]
fn strips_utf8_bom_and_falls_back_to_windows_1252() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"Ghat,Footfall\nR\xe9va,3\n");
    let table = import_csv_bytes(&bytes, &CsvOptions::default()).unwrap();

    assert_eq!(table.schema()[0].name, "Ghat");
    assert_eq!(table.get_cell(0, 0), Value::string("R\u{e9}va"));

    let strict = CsvOptions {
        encoding: CsvTextEncoding::Utf8,
        ..CsvOptions::default()
    };
    let err = import_csv_bytes(&bytes, &strict).unwrap_err();
    assert!(matches!(err, CsvImportError::Parse { row: 2, column: 1, .. }));
}

#[test]
fn semicolon_delimited_with_decimal_comma() {
    let csv = "Ghat;Waste_Tons\nA;1.234,5\n";
    let options = CsvOptions {
        delimiter: b';',
        decimal_separator: ',',
        ..CsvOptions::default()
    };
    let table = import_csv_bytes(csv.as_bytes(), &options).unwrap();
    assert_eq!(table.get_cell(0, 1), Value::Number(1234.5));
}

#[test]
fn number_hinted_columns_keep_numbers_and_null_the_rest() {
    let csv = "Ghat,Total_Footfall\nA,100\nB,unknown\nA,50\n";
    let plain = import_csv_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(plain.schema()[1].column_type, ColumnType::String);

    let options = CsvOptions {
        number_name_hints: vec!["footfall".to_owned()],
        ..CsvOptions::default()
    };
    let table = import_csv_bytes(csv.as_bytes(), &options).unwrap();
    assert_eq!(table.schema()[1].column_type, ColumnType::Number);
    assert_eq!(
        table.column(1).unwrap().values().to_vec(),
        vec![Value::Number(100.0), Value::Null, Value::Number(50.0)]
    );
    assert_eq!(table.schema()[0].column_type, ColumnType::String);
}

#[test]
fn sampling_continues_until_every_column_has_a_value() {
    let mut csv = String::from("Ghat,Count\n");
    for _ in 0..5 {
        csv.push_str("A,\n");
    }
    csv.push_str("A,10\nB,20\n");
    let options = CsvOptions {
        sample_rows: 3,
        ..CsvOptions::default()
    };
    let table = import_csv_bytes(csv.as_bytes(), &options).unwrap();

    assert_eq!(table.row_count(), 7);
    assert_eq!(table.schema()[1].column_type, ColumnType::Number);
    assert_eq!(table.get_cell(5, 1), Value::Number(10.0));
    assert_eq!(table.get_cell(6, 1), Value::Number(20.0));
}

#[test]
fn pinned_column_types_skip_inference() {
    let csv = "Code,When\n007,2025-01-13\n";
    let inferred = import_csv_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(inferred.get_cell(0, 0), Value::Number(7.0));

    let options = CsvOptions {
        column_types: Some(vec![ColumnType::String]),
        ..CsvOptions::default()
    };
    let table = import_csv_bytes(csv.as_bytes(), &options).unwrap();
    assert_eq!(table.get_cell(0, 0), Value::string("007"));
    // Columns past the pinned prefix are still inferred.
    assert_eq!(table.get_cell(0, 1), day(2025, 1, 13));
}
