//! Minimal in-crate grid used by unit tests.

use crate::grid::{GridSink, GridSource};
use sheetmap_common::{CellValue, GridAddress};
use std::collections::BTreeMap;
use std::convert::Infallible;

#[derive(Debug, Default)]
pub(crate) struct TestGrid {
    pub cells: BTreeMap<GridAddress, CellValue>,
    pub rows: u32,
    /// Every sink call in order, for asserting write sequences.
    pub log: Vec<SinkCall>,
    pub window: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkCall {
    Write(GridAddress, CellValue),
    Commit(u32),
    Flush,
}

impl TestGrid {
    pub fn with_rows(rows: &[&[Option<CellValue>]]) -> Self {
        let mut grid = Self::default();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    grid.cells
                        .insert(GridAddress::new(r as u32, c as u32), value.clone());
                }
            }
        }
        grid.rows = rows.len() as u32;
        grid
    }

    /// Uncommitted rows: rows written to since their last commit.
    pub fn pending_rows(&self) -> usize {
        let mut pending = std::collections::BTreeSet::new();
        for call in &self.log {
            match call {
                SinkCall::Write(addr, _) => {
                    pending.insert(addr.row());
                }
                SinkCall::Commit(row) => {
                    pending.remove(row);
                }
                SinkCall::Flush => {}
            }
        }
        pending.len()
    }
}

impl GridSource for TestGrid {
    type Error = Infallible;

    fn has_row(&self, row: u32) -> bool {
        row < self.rows
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        let last_col = self.cells.keys().map(|a| a.col()).max()?;
        Some((self.rows.saturating_sub(1), last_col))
    }

    fn cell_at(&mut self, address: GridAddress) -> Result<Option<CellValue>, Infallible> {
        Ok(self.cells.get(&address).cloned())
    }
}

impl GridSink for TestGrid {
    type Error = Infallible;

    fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), Infallible> {
        self.log.push(SinkCall::Write(address, value.clone()));
        self.cells.insert(address, value);
        self.rows = self.rows.max(address.row() + 1);
        Ok(())
    }

    fn commit_row(&mut self, row: u32) -> Result<(), Infallible> {
        self.log.push(SinkCall::Commit(row));
        self.rows = self.rows.max(row + 1);
        Ok(())
    }

    fn row_window(&self) -> Option<usize> {
        self.window
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        self.log.push(SinkCall::Flush);
        Ok(())
    }
}
