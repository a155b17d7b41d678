use thiserror::Error;

use crate::storage::csv::CsvError;
use crate::storage::excel::ExcelError;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Excel error: {0}")]
    Excel(#[from] ExcelError),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No database is open")]
    NoDatabase,

    #[error("The database has no tables to export")]
    NoTables,

    #[error("Query result has no numeric column to chart")]
    NothingToChart,

    #[error("Conversion error: {0}")]
    Conversion(String),
}

pub type Result<T> = std::result::Result<T, DeskError>;
