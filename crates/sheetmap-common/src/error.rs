//! Cell-level error values.
//!
//! A `CellError` is data, not control flow: it is what a cell *holds* when the
//! grid engine stored an error code, or when a value could not be coerced to
//! the type a column asks for. Readers attach it to the field and keep going.

use std::{error::Error, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::GridAddress;

/// Spreadsheet error codes a cell may carry.
///
/// **Note:** names are CamelCase while `Display` renders them the way
/// spreadsheet applications show them (`#DIV/0!`, …).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CellErrorKind {
    Null,
    Ref,
    Name,
    Value,
    Div,
    Na,
    Num,
}

impl fmt::Display for CellErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "#NULL!",
            Self::Ref => "#REF!",
            Self::Name => "#NAME?",
            Self::Value => "#VALUE!",
            Self::Div => "#DIV/0!",
            Self::Na => "#N/A",
            Self::Num => "#NUM!",
        })
    }
}

impl CellErrorKind {
    /// Recognise an error code as rendered by a spreadsheet (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "#null!" => Self::Null,
            "#ref!" => Self::Ref,
            "#name?" => Self::Name,
            "#value!" => Self::Value,
            "#div/0!" => Self::Div,
            "#n/a" => Self::Na,
            "#num!" => Self::Num,
            _ => return None,
        })
    }
}

/// Error value held by (or produced for) a single cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellError {
    pub kind: CellErrorKind,
    pub message: Option<String>,
    pub address: Option<GridAddress>,
}

impl From<CellErrorKind> for CellError {
    fn from(kind: CellErrorKind) -> Self {
        Self {
            kind,
            message: None,
            address: None,
        }
    }
}

impl CellError {
    pub fn new(kind: CellErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attach the cell the error belongs to.
    pub fn with_address(mut self, address: GridAddress) -> Self {
        self.address = Some(address);
        self
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(address) = self.address {
            write!(f, " ({address})")?;
        }
        Ok(())
    }
}

impl Error for CellError {}

impl PartialEq<str> for CellErrorKind {
    fn eq(&self, other: &str) -> bool {
        self.to_string() == other
    }
}
