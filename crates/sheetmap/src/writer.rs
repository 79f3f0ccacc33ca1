//! Record events → grid.
//!
//! The writer tracks the active field path with the same open/close discipline
//! the reader uses, resolves each scalar's path to a column through
//! [`GridSchema::column_index_of`], and writes straight through to the sink.
//! It keeps no cell buffer of its own: a row is committed on `EndRecord`, so at
//! most one uncommitted row exists at any time and any deeper row window is
//! the sink's business.

use crate::error::{Result, SheetMapError};
use crate::event::RecordEvent;
use crate::feature::Features;
use crate::grid::GridSink;
use crate::path::FieldPath;
use crate::schema::GridSchema;
use crate::tree::record_events;
use serde_json::Value;
use sheetmap_common::{CellValue, GridAddress};

/// Forward-only writer consuming [`RecordEvent`]s into a [`GridSink`].
///
/// After an error the writer should be discarded; the current row is left
/// uncommitted.
pub struct RecordWriter<'s, K: GridSink> {
    sink: K,
    schema: &'s GridSchema,
    features: Features,
    row: u32,
    path: FieldPath,
    in_record: bool,
    records_written: usize,
}

impl<'s, K: GridSink> RecordWriter<'s, K> {
    pub fn new(sink: K, schema: &'s GridSchema) -> Self {
        Self::with_features(sink, schema, Features::default())
    }

    pub fn with_features(sink: K, schema: &'s GridSchema, features: Features) -> Self {
        #[cfg(feature = "tracing")]
        if let Some(window) = sink.row_window() {
            tracing::debug!(window, "writing through a bounded row window");
        }
        Self {
            sink,
            schema,
            features,
            row: schema.data_row_start(),
            path: FieldPath::root(),
            in_record: false,
            records_written: 0,
        }
    }

    pub fn schema(&self) -> &'s GridSchema {
        self.schema
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Row the next (or current) record is written to.
    pub fn current_row(&self) -> u32 {
        self.row
    }

    /// Rows written to but not yet committed: 1 inside a record, else 0.
    pub fn pending_rows(&self) -> usize {
        usize::from(self.in_record)
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Write every column's textual path on the header row and commit it.
    /// Only valid before the first record.
    pub fn write_header(&mut self) -> Result<()> {
        if self.in_record || self.records_written > 0 {
            return Err(SheetMapError::InvalidEvent(
                "header must be written before any record".into(),
            ));
        }
        let header_row = self.schema.origin_row();
        for (idx, column) in self.schema.columns().iter().enumerate() {
            let address = self.schema.address_of(header_row, idx)?;
            self.sink
                .write_cell(address, CellValue::Text(column.path().to_string()))
                .map_err(|e| SheetMapError::from_grid("sink", e))?;
        }
        self.sink
            .commit_row(header_row)
            .map_err(|e| SheetMapError::from_grid("sink", e))
    }

    pub fn write_event(&mut self, event: RecordEvent) -> Result<()> {
        match event {
            RecordEvent::StartRecord => {
                if self.in_record {
                    return Err(SheetMapError::InvalidEvent(
                        "record started inside another record".into(),
                    ));
                }
                GridAddress::try_new(self.row, self.schema.origin_col()).map_err(|_| {
                    SheetMapError::Bounds {
                        address: GridAddress::new(
                            sheetmap_common::ROW_MAX,
                            self.schema.origin_col(),
                        ),
                        reason: "no rows left in the grid",
                    }
                })?;
                self.in_record = true;
            }
            RecordEvent::Open(segment) => {
                self.require_record("open")?;
                self.path.push(segment);
            }
            RecordEvent::Close => {
                self.require_record("close")?;
                if self.path.pop().is_none() {
                    return Err(SheetMapError::InvalidEvent("close without matching open".into()));
                }
            }
            RecordEvent::Value(value) => {
                self.require_record("value")?;
                self.write_value(value)?;
            }
            RecordEvent::EndRecord => {
                self.require_record("end of record")?;
                if !self.path.is_empty() {
                    return Err(SheetMapError::InvalidEvent(format!(
                        "record ended with `{}` still open",
                        self.path
                    )));
                }
                self.sink
                    .commit_row(self.row)
                    .map_err(|e| SheetMapError::from_grid("sink", e))?;
                self.in_record = false;
                self.row += 1;
                self.records_written += 1;
            }
        }
        Ok(())
    }

    pub fn write_events<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = RecordEvent>,
    {
        events.into_iter().try_for_each(|event| self.write_event(event))
    }

    /// Write one JSON object as a record.
    pub fn write_record(&mut self, record: &Value) -> Result<()> {
        if self.in_record {
            return Err(SheetMapError::InvalidEvent(
                "cannot write a record while another is open".into(),
            ));
        }
        self.write_events(record_events(record)?)
    }

    /// Check the stream ended cleanly, flush the sink and hand it back.
    pub fn finish(mut self) -> Result<K> {
        if self.in_record {
            return Err(SheetMapError::InvalidEvent(
                "stream finished inside a record".into(),
            ));
        }
        self.sink
            .flush()
            .map_err(|e| SheetMapError::from_grid("sink", e))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(records = self.records_written, "record writer finished");
        Ok(self.sink)
    }

    fn require_record(&self, what: &str) -> Result<()> {
        if !self.in_record {
            return Err(SheetMapError::InvalidEvent(format!("{what} outside a record")));
        }
        Ok(())
    }

    fn write_value(&mut self, value: Option<CellValue>) -> Result<()> {
        let Some(col) = self.schema.column_index_of(&self.path) else {
            if self.features.fail_on_unmapped_field {
                return Err(SheetMapError::UnmappedField {
                    path: self.path.clone(),
                });
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(path = %self.path, "dropping unmapped field");
            return Ok(());
        };
        let Some(value) = value else {
            return Ok(());
        };
        if self.features.treat_blank_as_absent && value.is_blank() {
            return Ok(());
        }
        let column = &self.schema.columns()[(col - self.schema.origin_col()) as usize];
        let address = GridAddress::new(self.row, col);
        let value = match column.value_type() {
            None => value,
            Some(value_type) => match value.coerce_to(value_type, column.format()) {
                Ok(coerced) => coerced,
                Err(error) if self.features.fail_on_invalid_cell => {
                    return Err(SheetMapError::InvalidCell {
                        path: self.path.clone(),
                        error: error.with_address(address),
                    });
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(%address, path = %self.path, "value does not match column type, written as is");
                    value
                }
            },
        };
        self.sink
            .write_cell(address, value)
            .map_err(|e| SheetMapError::from_grid("sink", e))
    }
}
