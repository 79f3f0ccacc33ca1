//! Bounded row-window sink.
//!
//! [`WindowedSink`] keeps at most `window` rows in memory. When a commit pushes
//! the buffer past that size the lowest rows are handed, in order, to a
//! [`RowWriter`] and forgotten; any later write to a flushed row fails with
//! [`GridError::RowFlushed`]. Rows therefore have to be produced roughly in
//! order, which is exactly what a record writer does.

use crate::error::GridError;
use sheetmap::GridSink;
use sheetmap_common::{CellValue, GridAddress};
use std::collections::BTreeMap;

/// Rows kept in memory by default.
pub const DEFAULT_ROW_WINDOW: usize = 100;

/// Destination for rows evicted from a [`WindowedSink`].
pub trait RowWriter {
    /// Persist one row. Rows arrive in strictly increasing order; `cells` are
    /// sorted by column and never empty.
    fn write_row(&mut self, row: u32, cells: Vec<(u32, CellValue)>) -> Result<(), GridError>;

    /// Called once everything has been written.
    fn finish(&mut self) -> Result<(), GridError> {
        Ok(())
    }
}

impl<W: RowWriter + ?Sized> RowWriter for Box<W> {
    fn write_row(&mut self, row: u32, cells: Vec<(u32, CellValue)>) -> Result<(), GridError> {
        (**self).write_row(row, cells)
    }

    fn finish(&mut self) -> Result<(), GridError> {
        (**self).finish()
    }
}

#[derive(Debug)]
pub struct WindowedSink<W: RowWriter> {
    inner: W,
    window: usize,
    rows: BTreeMap<u32, BTreeMap<u32, CellValue>>,
    /// Highest row already handed to `inner`.
    flushed_through: Option<u32>,
    flushed_rows: usize,
}

impl<W: RowWriter> WindowedSink<W> {
    pub fn new(inner: W) -> Self {
        Self::with_window(inner, DEFAULT_ROW_WINDOW)
    }

    /// A window of 0 is treated as 1.
    pub fn with_window(inner: W, window: usize) -> Self {
        Self {
            inner,
            window: window.max(1),
            rows: BTreeMap::new(),
            flushed_through: None,
            flushed_rows: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Rows currently held in memory.
    pub fn buffered_rows(&self) -> usize {
        self.rows.len()
    }

    /// Rows handed to the inner writer so far.
    pub fn flushed_rows(&self) -> usize {
        self.flushed_rows
    }

    pub fn is_flushed(&self, row: u32) -> bool {
        self.flushed_through.is_some_and(|last| row <= last)
    }

    /// Buffered value at `address`, if the row is still in memory.
    pub fn get(&self, address: GridAddress) -> Option<&CellValue> {
        self.rows.get(&address.row())?.get(&address.col())
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    /// Flush everything and return the inner writer.
    pub fn into_inner(mut self) -> Result<W, GridError> {
        self.flush_all()?;
        Ok(self.inner)
    }

    fn flush_oldest(&mut self) -> Result<(), GridError> {
        let Some((row, cells)) = self.rows.pop_first() else {
            return Ok(());
        };
        self.flushed_through = Some(row);
        self.flushed_rows += 1;
        if cells.is_empty() {
            return Ok(());
        }
        self.inner.write_row(row, cells.into_iter().collect())
    }

    fn flush_all(&mut self) -> Result<(), GridError> {
        while !self.rows.is_empty() {
            self.flush_oldest()?;
        }
        Ok(())
    }
}

impl<W: RowWriter> GridSink for WindowedSink<W> {
    type Error = GridError;

    fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), GridError> {
        if self.is_flushed(address.row()) {
            return Err(GridError::RowFlushed { row: address.row() });
        }
        self.rows
            .entry(address.row())
            .or_default()
            .insert(address.col(), value);
        Ok(())
    }

    fn commit_row(&mut self, row: u32) -> Result<(), GridError> {
        if self.is_flushed(row) {
            return Err(GridError::RowFlushed { row });
        }
        // Committed empty rows still occupy a slot so row positions survive.
        self.rows.entry(row).or_default();
        while self.rows.len() > self.window {
            self.flush_oldest()?;
        }
        Ok(())
    }

    fn row_window(&self) -> Option<usize> {
        Some(self.window)
    }

    fn flush(&mut self) -> Result<(), GridError> {
        self.flush_all()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(rows = self.flushed_rows, "row window drained");
        self.inner.finish()
    }
}
