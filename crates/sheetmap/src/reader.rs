//! Grid → record events.
//!
//! The reader walks data rows from `data_row_start()` downward. For each row
//! it scans the schema's columns in order and keeps a stack of open container
//! segments: moving from one column to the next closes the segments the two
//! containers no longer share and opens the new ones, so adjacent columns such
//! as `address.city` and `address.zip` regroup into one nested object. Events
//! are produced lazily, one row at a time.

use crate::error::{Result, SheetMapError};
use crate::event::RecordEvent;
use crate::feature::Features;
use crate::grid::GridSource;
use crate::path::PathSegment;
use crate::schema::{ColumnSpec, GridSchema};
use crate::tree::TreeBuilder;
use serde_json::Value;
use sheetmap_common::{CellValue, GridAddress, ROW_MAX};
use std::collections::VecDeque;

/// Forward-only reader producing [`RecordEvent`]s from a [`GridSource`].
///
/// Iteration yields `Result<RecordEvent>`; the first error ends the sequence.
pub struct RecordReader<'s, S: GridSource> {
    source: S,
    schema: &'s GridSchema,
    features: Features,
    row: u32,
    pending: VecDeque<RecordEvent>,
    builder: TreeBuilder,
    done: bool,
}

impl<'s, S: GridSource> RecordReader<'s, S> {
    pub fn new(source: S, schema: &'s GridSchema) -> Result<Self> {
        Self::with_features(source, schema, Features::default())
    }

    /// Construct with explicit features. Column availability is checked here
    /// when `fail_on_missing_column` is set, before any row is read.
    pub fn with_features(source: S, schema: &'s GridSchema, features: Features) -> Result<Self> {
        if features.fail_on_missing_column {
            check_columns(&source, schema)?;
        }
        Ok(Self {
            source,
            schema,
            features,
            row: schema.data_row_start(),
            pending: VecDeque::new(),
            builder: TreeBuilder::new(),
            done: false,
        })
    }

    pub fn schema(&self) -> &'s GridSchema {
        self.schema
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Next row the reader will visit.
    pub fn current_row(&self) -> u32 {
        self.row
    }

    pub fn is_exhausted(&self) -> bool {
        self.done && self.pending.is_empty()
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Assemble the next row into a JSON record.
    ///
    /// Mixing this with event iteration mid-record is an error: the builder
    /// only accepts whole records. An error ends the sequence.
    pub fn next_record(&mut self) -> Result<Option<Value>> {
        while let Some(event) = self.next() {
            match self.builder.push(event?) {
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => {}
                Err(err) => {
                    self.abandon();
                    return Err(err);
                }
            }
        }
        Ok(None)
    }

    /// Iterator over whole records.
    pub fn records(&mut self) -> impl Iterator<Item = Result<Value>> + '_ {
        std::iter::from_fn(move || self.next_record().transpose())
    }

    fn abandon(&mut self) {
        self.done = true;
        self.pending.clear();
        self.builder = TreeBuilder::new();
    }

    fn fill_row(&mut self) -> Result<bool> {
        let schema = self.schema;
        loop {
            if self.row > ROW_MAX
                || !schema.is_in_row_bounds(self.row)
                || !self.source.has_row(self.row)
            {
                return Ok(false);
            }
            let row = self.row;
            self.row += 1;

            let mut cells = Vec::with_capacity(schema.len());
            for (idx, column) in schema.columns().iter().enumerate() {
                let address = schema.address_of(row, idx)?;
                cells.push(self.read_cell(column, address)?);
            }

            if self.features.skip_empty_rows && cells.iter().all(Option::is_none) {
                #[cfg(feature = "tracing")]
                tracing::debug!(row, "skipping empty row");
                continue;
            }

            self.emit_row(cells);
            return Ok(true);
        }
    }

    fn read_cell(&mut self, column: &ColumnSpec, address: GridAddress) -> Result<Option<CellValue>> {
        let raw = self
            .source
            .cell_at(address)
            .map_err(|e| SheetMapError::from_grid("source", e))?;
        let Some(value) = raw else {
            return Ok(None);
        };
        if self.features.treat_blank_as_absent && value.is_blank() {
            return Ok(None);
        }
        let Some(value_type) = column.value_type() else {
            return Ok(Some(value));
        };
        match value.coerce_to(value_type, column.format()) {
            Ok(coerced) => Ok(Some(coerced)),
            Err(error) => {
                let error = error.with_address(address);
                if self.features.fail_on_invalid_cell {
                    return Err(SheetMapError::InvalidCell {
                        path: column.path().clone(),
                        error,
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::warn!(%address, path = %column.path(), "cell does not match column type");
                Ok(Some(CellValue::Error(error)))
            }
        }
    }

    fn emit_row(&mut self, cells: Vec<Option<CellValue>>) {
        let schema = self.schema;
        let mut open: Vec<PathSegment> = Vec::new();
        self.pending.push_back(RecordEvent::StartRecord);
        for (column, cell) in schema.columns().iter().zip(cells) {
            let Some(leaf) = column.path().leaf() else {
                continue;
            };
            let container = column.path().container();
            let shared = open
                .iter()
                .zip(container)
                .take_while(|(a, b)| a == b)
                .count();
            for _ in shared..open.len() {
                self.pending.push_back(RecordEvent::Close);
            }
            open.truncate(shared);
            for segment in &container[shared..] {
                self.pending.push_back(RecordEvent::Open(segment.clone()));
                open.push(segment.clone());
            }
            self.pending.push_back(RecordEvent::Open(leaf.clone()));
            self.pending.push_back(RecordEvent::Value(cell));
            self.pending.push_back(RecordEvent::Close);
        }
        for _ in 0..open.len() {
            self.pending.push_back(RecordEvent::Close);
        }
        self.pending.push_back(RecordEvent::EndRecord);
    }
}

impl<S: GridSource> Iterator for RecordReader<'_, S> {
    type Item = Result<RecordEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        if self.done {
            return None;
        }
        match self.fill_row() {
            Ok(true) => self.pending.pop_front().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn check_columns<S: GridSource>(source: &S, schema: &GridSchema) -> Result<()> {
    let last_col = source.dimensions().map(|(_, col)| col);
    for (idx, column) in schema.columns().iter().enumerate() {
        let col = schema.origin_col() + idx as u32;
        if last_col.is_none_or(|last| col > last) {
            return Err(SheetMapError::MissingColumn {
                path: column.path().clone(),
                column: col,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_grid::TestGrid;
    use crate::path::FieldPath;
    use serde_json::json;
    use sheetmap_common::ValueType;

    fn text(s: &str) -> Option<CellValue> {
        Some(CellValue::Text(s.into()))
    }

    fn address_schema() -> GridSchema {
        GridSchema::builder(GridAddress::ORIGIN)
            .column("id")
            .column("address.city")
            .column("address.zip")
            .build()
            .unwrap()
    }

    #[test]
    fn emits_nested_events_for_a_row() {
        let grid = TestGrid::with_rows(&[
            &[text("id"), text("address.city"), text("address.zip")],
            &[Some(CellValue::Int(7)), text("Lyon"), text("69000")],
        ]);
        let schema = address_schema();
        let events: Vec<RecordEvent> = RecordReader::new(grid, &schema)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            events,
            vec![
                RecordEvent::StartRecord,
                RecordEvent::field("id"),
                RecordEvent::value(7i64),
                RecordEvent::Close,
                RecordEvent::field("address"),
                RecordEvent::field("city"),
                RecordEvent::value("Lyon"),
                RecordEvent::Close,
                RecordEvent::field("zip"),
                RecordEvent::value("69000"),
                RecordEvent::Close,
                RecordEvent::Close,
                RecordEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn records_regroup_nested_paths_and_skip_blanks() {
        let grid = TestGrid::with_rows(&[
            &[],
            &[Some(CellValue::Int(1)), text("Lyon"), None],
            &[Some(CellValue::Int(2)), text("   "), text("75001")],
        ]);
        let schema = address_schema();
        let features = Features::default().with(crate::Feature::TreatBlankAsAbsent, true);
        let mut reader = RecordReader::with_features(grid, &schema, features).unwrap();
        assert_eq!(
            reader.next_record().unwrap(),
            Some(json!({"id": 1, "address": {"city": "Lyon"}}))
        );
        assert_eq!(
            reader.next_record().unwrap(),
            Some(json!({"id": 2, "address": {"zip": "75001"}}))
        );
        assert_eq!(reader.next_record().unwrap(), None);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn blank_text_is_kept_unless_treated_as_absent() {
        let rows: &[&[Option<CellValue>]] = &[
            &[],
            &[Some(CellValue::Int(1)), text("  "), text("")],
            &[Some(CellValue::Int(2)), text(" Lyon "), None],
        ];
        let schema = address_schema();

        let mut reader = RecordReader::new(TestGrid::with_rows(rows), &schema).unwrap();
        assert_eq!(
            reader.next_record().unwrap(),
            Some(json!({"id": 1, "address": {"city": "  ", "zip": ""}}))
        );
        assert_eq!(
            reader.next_record().unwrap(),
            Some(json!({"id": 2, "address": {"city": " Lyon "}}))
        );

        let features = Features::default().with(crate::Feature::TreatBlankAsAbsent, true);
        let reader =
            RecordReader::with_features(TestGrid::with_rows(rows), &schema, features).unwrap();
        let values: Vec<Option<CellValue>> = reader
            .filter_map(|event| match event.unwrap() {
                RecordEvent::Value(value) => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(
            values,
            vec![
                Some(CellValue::Int(1)),
                None,
                None,
                Some(CellValue::Int(2)),
                Some(CellValue::from(" Lyon ")),
                None,
            ]
        );
    }

    #[test]
    fn skip_empty_rows_drops_blank_rows() {
        let grid = TestGrid::with_rows(&[
            &[],
            &[Some(CellValue::Int(1))],
            &[None, None, None],
            &[Some(CellValue::Int(3))],
        ]);
        let schema = address_schema();
        let features = Features {
            skip_empty_rows: true,
            ..Features::default()
        };
        let mut reader = RecordReader::with_features(grid, &schema, features).unwrap();
        let ids: Vec<Value> = reader
            .records()
            .map(|r| r.unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);

        let grid = TestGrid::with_rows(&[&[], &[None], &[Some(CellValue::Int(3))]]);
        let records: Vec<Value> = RecordReader::new(grid, &schema)
            .unwrap()
            .records()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records, vec![json!({}), json!({"id": 3})]);
    }

    #[test]
    fn typed_columns_coerce_or_report_errors() {
        let schema = GridSchema::builder(GridAddress::ORIGIN)
            .typed_column("qty", ValueType::Integer)
            .build()
            .unwrap();
        let rows: &[&[Option<CellValue>]] = &[&[], &[text("12")], &[text("twelve")]];

        let mut reader = RecordReader::new(TestGrid::with_rows(rows), &schema).unwrap();
        assert_eq!(reader.next_record().unwrap(), Some(json!({"qty": 12})));
        assert_eq!(reader.next_record().unwrap(), Some(json!({"qty": "#VALUE!"})));

        let strict = Features::default().with(crate::Feature::FailOnInvalidCell, true);
        let mut reader =
            RecordReader::with_features(TestGrid::with_rows(rows), &schema, strict).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        match reader.next_record() {
            Err(SheetMapError::InvalidCell { path, error }) => {
                assert_eq!(path.to_string(), "qty");
                assert_eq!(error.address, Some(GridAddress::new(2, 0)));
            }
            other => panic!("expected InvalidCell, got {other:?}"),
        }
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn missing_columns_fail_at_construction() {
        let grid = TestGrid::with_rows(&[&[text("id"), text("address.city")]]);
        let schema = address_schema();
        let strict = Features {
            fail_on_missing_column: true,
            ..Features::default()
        };
        match RecordReader::with_features(grid, &schema, strict) {
            Err(SheetMapError::MissingColumn { path, column }) => {
                assert_eq!(path.to_string(), "address.zip");
                assert_eq!(column, 2);
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("expected MissingColumn"),
        }
    }

    #[test]
    fn oversized_array_index_fails_instead_of_padding() {
        let err = GridSchema::builder(GridAddress::ORIGIN)
            .column("a[18446744073709551615]")
            .build()
            .unwrap_err();
        assert!(matches!(err, SheetMapError::InvalidSchema(_)));

        // Unchecked schemas reach the tree builder, which refuses the index.
        let schema = GridSchema::new(
            vec![ColumnSpec::new(FieldPath::parse("a[18446744073709551615]").unwrap())],
            GridAddress::ORIGIN,
        );
        let grid = TestGrid::with_rows(&[&[], &[text("x")]]);
        let mut reader = RecordReader::new(grid, &schema).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(SheetMapError::InvalidRecord(_))
        ));
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn arrays_and_deep_nesting() {
        let schema = GridSchema::builder(GridAddress::new(2, 1))
            .column("tags[0]")
            .column("tags[1]")
            .column("a.b.c")
            .column("a.d")
            .build()
            .unwrap();
        let mut grid = TestGrid::default();
        for (col, value) in [(1, "x"), (2, "y"), (3, "deep"), (4, "shallow")] {
            grid.cells.insert(GridAddress::new(3, col), CellValue::from(value));
        }
        grid.rows = 4;
        let mut reader = RecordReader::new(&mut grid, &schema).unwrap();
        assert_eq!(reader.current_row(), 3);
        assert_eq!(
            reader.next_record().unwrap(),
            Some(json!({"tags": ["x", "y"], "a": {"b": {"c": "deep"}, "d": "shallow"}}))
        );
        assert_eq!(reader.next_record().unwrap(), None);
    }
}
