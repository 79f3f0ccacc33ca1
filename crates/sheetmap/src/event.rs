use crate::path::PathSegment;
use sheetmap_common::CellValue;

/// Token of the record stream shared by readers and writers.
///
/// A record is `StartRecord`, then a balanced sequence of `Open`/`Close`
/// pairs, then `EndRecord`. Every scalar sits inside its own `Open(leaf)` /
/// `Close` pair, so the active path at a `Value` is the full field path.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordEvent {
    StartRecord,
    /// Enter a field (`Field`) or array element (`Index`).
    Open(PathSegment),
    /// Scalar at the active path; `None` for an absent/blank cell.
    Value(Option<CellValue>),
    Close,
    EndRecord,
}

impl RecordEvent {
    pub fn field(name: impl Into<String>) -> Self {
        RecordEvent::Open(PathSegment::Field(name.into()))
    }

    pub fn index(idx: usize) -> Self {
        RecordEvent::Open(PathSegment::Index(idx))
    }

    pub fn value(value: impl Into<CellValue>) -> Self {
        RecordEvent::Value(Some(value.into()))
    }

    pub fn absent() -> Self {
        RecordEvent::Value(None)
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, RecordEvent::Value(_))
    }
}
