use footfall_io::{CsvExportError, CsvImportError};
use footfall_table::TableError;
use thiserror::Error;

use crate::roles::Role;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("no column found for role {0}")]
    UnresolvedRole(Role),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("failed to load dataset: {0}")]
    Import(#[from] CsvImportError),
    #[error("failed to export dataset: {0}")]
    Export(#[from] CsvExportError),
}

impl DashError {
    /// Whether the error means "this metric or chart has no source column" rather than a real
    /// failure. Such errors become placeholders.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DashError::UnresolvedRole(_) | DashError::UnknownColumn(_))
    }
}

pub type DashResult<T> = Result<T, DashError>;
