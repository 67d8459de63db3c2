//! CSV loading and export for footfall tables.
//!
//! Loading infers one [`footfall_table::ColumnType`] per column from a sample of rows, then
//! streams the rest of the input. Fields that do not fit their column's type load as missing
//! values; only unreadable input fails the whole load.

#![forbid(unsafe_code)]

mod export;
mod import;

pub use crate::export::{export_csv, export_csv_bytes, CsvExportError, EXPORT_FILE_NAME};
pub use crate::import::{
    import_csv, import_csv_bytes, CsvDateOrder, CsvImportError, CsvOptions, CsvTextEncoding,
};
