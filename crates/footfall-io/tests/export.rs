use std::fs::File;

use footfall_io::{
    export_csv, export_csv_bytes, import_csv, import_csv_bytes, CsvOptions, EXPORT_FILE_NAME,
};
use footfall_table::{CmpOp, FilterExpr, FilterValue};
use pretty_assertions::assert_eq;

const SAMPLE: &str = "\
Date,Ghat,Total_Footfall,Notes
2025-01-13,A,100,\"crowded, calm later\"
2025-01-14,A,,
2025-01-13 08:30:00,B,150.5,ok
";

#[test]
fn writes_header_and_rows_with_empty_missing_fields() {
    let table = import_csv_bytes(SAMPLE.as_bytes(), &CsvOptions::default()).unwrap();
    let bytes = export_csv_bytes(&table).unwrap();

    assert_eq!(String::from_utf8(bytes).unwrap(), SAMPLE);
}

#[test]
fn filtered_table_reimports_identically() {
    let table = import_csv_bytes(SAMPLE.as_bytes(), &CsvOptions::default()).unwrap();
    let ghat_a = table
        .filter(&FilterExpr::Cmp {
            col: 1,
            op: CmpOp::Eq,
            value: FilterValue::String("A".to_owned()),
        })
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(EXPORT_FILE_NAME);
    export_csv(&ghat_a, File::create(&path).unwrap()).unwrap();

    let reloaded = import_csv(File::open(&path).unwrap(), &CsvOptions::default()).unwrap();
    assert_eq!(reloaded.schema(), ghat_a.schema());
    assert_eq!(
        reloaded.rows().collect::<Vec<_>>(),
        ghat_a.rows().collect::<Vec<_>>()
    );
}

#[test]
fn empty_selection_exports_header_only() {
    let table = import_csv_bytes(SAMPLE.as_bytes(), &CsvOptions::default()).unwrap();
    let none = table
        .filter(&FilterExpr::eq(1, FilterValue::String("Z".to_owned())))
        .unwrap();
    let text = String::from_utf8(export_csv_bytes(&none).unwrap()).unwrap();
    assert_eq!(text, "Date,Ghat,Total_Footfall,Notes\n");
}

#[test]
fn export_file_name_is_fixed() {
    assert_eq!(EXPORT_FILE_NAME, "filtered_mahakumbh.csv");
}

struct ClosedPipe;

impl std::io::Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn closed_reader_is_reported_as_broken_pipe() {
    let table = import_csv_bytes(SAMPLE.as_bytes(), &CsvOptions::default()).unwrap();
    let err = export_csv(&table, ClosedPipe).unwrap_err();
    assert!(err.is_broken_pipe(), "{err:?}");
}
