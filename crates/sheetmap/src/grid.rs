//! Capability traits over an external grid engine.
//!
//! Readers and writers only ever talk to a grid through these two traits, so a
//! file-backed workbook, an in-memory sheet and a streaming window sink are
//! interchangeable.

use sheetmap_common::{CellValue, GridAddress};

/// Read side of a grid.
pub trait GridSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether `row` exists in the underlying sheet.
    fn has_row(&self, row: u32) -> bool;

    /// Last used `(row, col)`, zero-based, or `None` for an empty sheet.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Value at `address`; `None` for an empty cell.
    fn cell_at(&mut self, address: GridAddress) -> Result<Option<CellValue>, Self::Error>;
}

/// Write side of a grid.
pub trait GridSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), Self::Error>;

    /// Mark `row` complete. Streaming sinks may persist and evict it.
    fn commit_row(&mut self, row: u32) -> Result<(), Self::Error>;

    /// Number of committed rows the sink keeps in memory, when bounded.
    fn row_window(&self) -> Option<usize> {
        None
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: GridSource + ?Sized> GridSource for &mut T {
    type Error = T::Error;

    fn has_row(&self, row: u32) -> bool {
        (**self).has_row(row)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (**self).dimensions()
    }

    fn cell_at(&mut self, address: GridAddress) -> Result<Option<CellValue>, Self::Error> {
        (**self).cell_at(address)
    }
}

impl<T: GridSink + ?Sized> GridSink for &mut T {
    type Error = T::Error;

    fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), Self::Error> {
        (**self).write_cell(address, value)
    }

    fn commit_row(&mut self, row: u32) -> Result<(), Self::Error> {
        (**self).commit_row(row)
    }

    fn row_window(&self) -> Option<usize> {
        (**self).row_window()
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}

impl<T: GridSource + ?Sized> GridSource for Box<T> {
    type Error = T::Error;

    fn has_row(&self, row: u32) -> bool {
        (**self).has_row(row)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (**self).dimensions()
    }

    fn cell_at(&mut self, address: GridAddress) -> Result<Option<CellValue>, Self::Error> {
        (**self).cell_at(address)
    }
}

impl<T: GridSink + ?Sized> GridSink for Box<T> {
    type Error = T::Error;

    fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), Self::Error> {
        (**self).write_cell(address, value)
    }

    fn commit_row(&mut self, row: u32) -> Result<(), Self::Error> {
        (**self).commit_row(row)
    }

    fn row_window(&self) -> Option<usize> {
        (**self).row_window()
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}
