//! Reference grid engines for `sheetmap`.
//!
//! These are deliberately small: an in-memory sheet/workbook pair (with
//! optional JSON persistence), a CSV reader/row writer, and [`WindowedSink`],
//! which keeps only a bounded number of rows in memory and streams the rest to
//! a [`RowWriter`]. The providers plug them into [`sheetmap::SheetMapper`].

#[cfg(feature = "csv")]
pub mod csv;
mod error;
pub mod memory;
pub mod provider;
pub mod window;

pub use error::GridError;
pub use memory::{DEFAULT_SHEET_NAME, MemorySheet, MemoryWorkbook};
#[cfg(feature = "csv")]
pub use provider::CsvProvider;
#[cfg(feature = "json")]
pub use provider::{JsonWorkbookProvider, WorkbookSink};
pub use window::{DEFAULT_ROW_WINDOW, RowWriter, WindowedSink};
