use crate::path::{FieldPath, PathParseError};
use crate::schema::SchemaIssue;
use sheetmap_common::{CellError, GridAddress};
use thiserror::Error;

/// Errors raised while building schemas, resolving sessions, or driving a
/// reader/writer.
#[derive(Debug, Error)]
pub enum SheetMapError {
    /// A requested sheet or schema could not be resolved against the grid.
    #[error("schema resolution failed: {message}")]
    SchemaResolution { message: String },

    /// Schema construction found one or more malformed column paths.
    #[error("invalid schema: {}", format_issues(.0))]
    InvalidSchema(Vec<SchemaIssue>),

    /// A bounds-checked accessor was used outside the schema's grid area.
    #[error("address {address} is outside the schema bounds ({reason})")]
    Bounds {
        address: GridAddress,
        reason: &'static str,
    },

    /// The record stream contained a field with no schema column.
    #[error("field `{path}` has no column in the schema")]
    UnmappedField { path: FieldPath },

    /// A schema column lies beyond what the physical grid provides.
    #[error("column `{path}` (grid column {column}) is missing from the sheet")]
    MissingColumn { path: FieldPath, column: u32 },

    /// A cell value could not be read as the column's declared type.
    #[error("invalid value for `{path}`: {error}")]
    InvalidCell { path: FieldPath, error: CellError },

    /// The event sequence handed to a writer was not well formed.
    #[error("invalid event sequence: {0}")]
    InvalidEvent(String),

    /// A record handed to the tree bridge was not an object.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    PathParse(#[from] PathParseError),

    /// Error surfaced by the grid engine behind a source or sink.
    #[error("{backend} grid error: {source}")]
    Grid {
        backend: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SheetMapError {
    /// Wrap an engine error, tagging it with the side of the session it came from.
    pub fn from_grid<E>(backend: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SheetMapError::Grid {
            backend,
            source: Box::new(err),
        }
    }

    pub fn schema_resolution(message: impl Into<String>) -> Self {
        SheetMapError::SchemaResolution {
            message: message.into(),
        }
    }
}

fn format_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = SheetMapError> = std::result::Result<T, E>;
