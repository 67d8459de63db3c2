use std::io::Write;

use footfall_table::Table;
use thiserror::Error;

/// File name offered for downloads of the filtered dataset.
pub const EXPORT_FILE_NAME: &str = "filtered_mahakumbh.csv";

#[derive(Debug, Error)]
pub enum CsvExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CsvExportError {
    /// The reader of the output stream went away.
    pub fn is_broken_pipe(&self) -> bool {
        let io = match self {
            CsvExportError::Io(e) => Some(e),
            CsvExportError::Csv(e) => match e.kind() {
                csv::ErrorKind::Io(e) => Some(e),
                _ => None,
            },
        };
        io.is_some_and(|e| e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

/// Write `table` as comma-separated UTF-8 text: a header row with the column names in table
/// order, then one line per row. Missing values are written as empty fields and dates as
/// `YYYY-MM-DD` (or `YYYY-MM-DD HH:MM:SS` when they carry a time).
pub fn export_csv<W: Write>(table: &Table, writer: W) -> Result<(), CsvExportError> {
    let mut out = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    out.write_record(table.column_names())?;
    let mut fields: Vec<String> = Vec::with_capacity(table.column_count());
    for row in table.rows() {
        fields.clear();
        fields.extend(row.iter().map(ToString::to_string));
        out.write_record(&fields)?;
    }
    out.flush()?;

    log::debug!(
        "exported {} rows and {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(())
}

pub fn export_csv_bytes(table: &Table) -> Result<Vec<u8>, CsvExportError> {
    let mut buf = Vec::new();
    export_csv(table, &mut buf)?;
    Ok(buf)
}
