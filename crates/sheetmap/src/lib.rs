//! Tree ↔ grid record mapping.
//!
//! A [`GridSchema`] lists [`FieldPath`]s in column order, anchored at an origin
//! cell whose row holds headers. [`RecordReader`] walks the data rows of a
//! [`GridSource`] and yields [`RecordEvent`]s that rebuild each row as a nested
//! record; [`RecordWriter`] consumes the same events and scatters scalars into
//! the matching columns of a [`GridSink`], committing one row per record.
//!
//! The grid engine itself is external: anything implementing the two grid
//! traits works, and [`SheetMapper`] wires an injected [`GridProvider`] to
//! sheet-level session descriptors.

mod error;
mod event;
mod feature;
mod grid;
mod path;
mod reader;
pub mod schema;
mod session;
pub mod tree;
mod writer;

#[cfg(test)]
mod test_grid;

pub use error::{Result, SheetMapError};
pub use event::RecordEvent;
pub use feature::{Feature, Features};
pub use grid::{GridSink, GridSource};
pub use path::{FieldPath, MAX_ARRAY_INDEX, PathParseError, PathSegment};
pub use reader::RecordReader;
pub use schema::{
    ColumnDefinition, ColumnSpec, GridSchema, GridSchemaBuilder, SCHEMA_TYPE, SchemaDefinition,
    SchemaIssue,
};
pub use session::{
    GridProvider, InputSource, OutputTarget, SheetInput, SheetMapper, SheetOutput, SheetRef,
};
pub use writer::RecordWriter;

pub use sheetmap_common::{CellError, CellErrorKind, CellValue, GridAddress, ValueType};
