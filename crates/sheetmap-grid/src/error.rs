use thiserror::Error;

/// Errors raised by the reference grid engines.
#[derive(Debug, Error)]
pub enum GridError {
    /// A streaming sink already wrote this row out and can no longer change it.
    #[error("row {row} has already been flushed from the row window")]
    RowFlushed { row: u32 },

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("duplicate sheet name: {0}")]
    DuplicateSheet(String),

    #[error("{backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    pub(crate) fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        GridError::Backend {
            backend,
            message: message.into(),
        }
    }
}

impl From<GridError> for sheetmap::SheetMapError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::SheetNotFound(name) => {
                sheetmap::SheetMapError::schema_resolution(format!("no sheet for name `{name}`"))
            }
            other => sheetmap::SheetMapError::from_grid("grid", other),
        }
    }
}
