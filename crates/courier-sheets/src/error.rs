use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("failed to open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("empty workbook: {path} has no sheets")]
    EmptyWorkbook { path: PathBuf },

    #[error("record index {index} out of range ({len} records)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SheetsError>;
