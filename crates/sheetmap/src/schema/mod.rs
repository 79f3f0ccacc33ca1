//! Path-addressed column layouts.
//!
//! A [`GridSchema`] is an ordered list of [`ColumnSpec`]s anchored at an origin
//! cell. The origin row holds headers, data starts on the row below, and the
//! i-th column sits at grid column `origin.col + i`. Prefix matching on
//! [`FieldPath`] is what lets a nested object such as `address` spread over
//! adjacent columns (`address.city`, `address.zip`) without the schema knowing
//! anything about trees beyond paths.

mod definition;
mod validate;

pub use definition::{ColumnDefinition, SchemaDefinition};
pub use validate::SchemaIssue;

use crate::error::{Result, SheetMapError};
use crate::path::FieldPath;
use sheetmap_common::{GridAddress, ROW_MAX, ValueType};
use std::ops::RangeInclusive;

/// Format tag identifying grid schemas, kept apart from the column collection.
pub const SCHEMA_TYPE: &str = "spreadsheet";

/// One schema entry: where a value lives in the record, plus type hints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    path: FieldPath,
    value_type: Option<ValueType>,
    format: Option<String>,
}

impl ColumnSpec {
    pub fn new(path: FieldPath) -> Self {
        Self {
            path,
            value_type: None,
            format: None,
        }
    }

    /// Build from the textual path form (`address.city`, `items[0]`).
    pub fn parse(path: &str) -> Result<Self> {
        Ok(Self::new(FieldPath::parse(path)?))
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Chrono format string used for date/time text on read and write.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn matches(&self, path: &FieldPath) -> bool {
        self.path.matches(path)
    }
}

impl From<FieldPath> for ColumnSpec {
    fn from(path: FieldPath) -> Self {
        Self::new(path)
    }
}

/// Ordered columns anchored at an origin cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridSchema {
    columns: Vec<ColumnSpec>,
    origin: GridAddress,
}

impl GridSchema {
    /// Unchecked constructor. Lookups still behave deterministically on
    /// malformed column sets; use [`GridSchema::builder`] to reject them.
    pub fn new(columns: Vec<ColumnSpec>, origin: GridAddress) -> Self {
        Self { columns, origin }
    }

    pub fn builder(origin: GridAddress) -> GridSchemaBuilder {
        GridSchemaBuilder {
            origin,
            columns: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn schema_type(&self) -> &'static str {
        SCHEMA_TYPE
    }

    /// Columns in grid order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn origin(&self) -> GridAddress {
        self.origin
    }

    /// Header row.
    pub fn origin_row(&self) -> u32 {
        self.origin.row()
    }

    pub fn origin_col(&self) -> u32 {
        self.origin.col()
    }

    /// First row holding record data.
    pub fn data_row_start(&self) -> u32 {
        self.origin.row() + 1
    }

    pub fn is_in_row_bounds(&self, row: u32) -> bool {
        self.data_row_start() <= row
    }

    pub fn is_in_column_bounds(&self, col: u32) -> bool {
        let start = self.origin.col() as u64;
        let col = col as u64;
        start <= col && col < start + self.columns.len() as u64
    }

    /// Column occupying `address.col()`.
    pub fn column_at(&self, address: GridAddress) -> Result<&ColumnSpec> {
        if !self.is_in_column_bounds(address.col()) {
            return Err(SheetMapError::Bounds {
                address,
                reason: "column outside schema",
            });
        }
        Ok(&self.columns[(address.col() - self.origin.col()) as usize])
    }

    /// Like [`column_at`](Self::column_at) but total: `None` for an empty
    /// schema or an address outside the columns.
    pub fn find_column(&self, address: GridAddress) -> Option<&ColumnSpec> {
        if self.columns.is_empty() {
            return None;
        }
        self.column_at(address).ok()
    }

    /// Absolute grid column of the first column whose path equals `path`.
    pub fn column_index_of(&self, path: &FieldPath) -> Option<u32> {
        self.columns
            .iter()
            .position(|column| column.matches(path))
            .map(|idx| self.origin.col() + idx as u32)
    }

    /// Columns whose path starts with `filter`, in schema order. The empty
    /// filter selects every column.
    pub fn columns_matching(&self, filter: &FieldPath) -> Vec<&ColumnSpec> {
        if filter.is_empty() {
            return self.columns.iter().collect();
        }
        self.columns
            .iter()
            .filter(|column| column.path().starts_with(filter))
            .collect()
    }

    /// Absolute column range covered by the columns under `filter`.
    pub fn column_span(&self, filter: &FieldPath) -> Option<RangeInclusive<u32>> {
        let mut hits = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.path().starts_with(filter))
            .map(|(idx, _)| self.origin.col() + idx as u32);
        let first = hits.next()?;
        let last = hits.last().unwrap_or(first);
        Some(first..=last)
    }

    /// Grid address of the `index`-th column on `row`.
    pub fn address_of(&self, row: u32, index: usize) -> Result<GridAddress> {
        let anchor = GridAddress::new(row.min(ROW_MAX), self.origin.col());
        if index >= self.columns.len() {
            return Err(SheetMapError::Bounds {
                address: anchor,
                reason: "column index past the last column",
            });
        }
        GridAddress::try_new(row, self.origin.col() + index as u32).map_err(|_| {
            SheetMapError::Bounds {
                address: anchor,
                reason: "address exceeds grid limits",
            }
        })
    }

    /// Check the column set for duplicates and structural conflicts.
    pub fn validate(&self) -> Result<()> {
        let issues = validate::validate_columns(&self.columns, self.origin);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SheetMapError::InvalidSchema(issues))
        }
    }

    /// Serializable description of this schema.
    pub fn to_definition(&self) -> SchemaDefinition {
        SchemaDefinition {
            origin: self.origin.to_string(),
            columns: self
                .columns
                .iter()
                .map(|column| ColumnDefinition {
                    path: column.path().to_string(),
                    value_type: column.value_type(),
                    format: column.format().map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Validating builder for [`GridSchema`].
#[derive(Debug)]
pub struct GridSchemaBuilder {
    origin: GridAddress,
    columns: Vec<ColumnSpec>,
    issues: Vec<SchemaIssue>,
}

impl GridSchemaBuilder {
    /// Append a column from its textual path.
    pub fn column(self, path: &str) -> Self {
        self.parsed(path, |spec| spec)
    }

    /// Append a column with a declared value type.
    pub fn typed_column(self, path: &str, value_type: ValueType) -> Self {
        self.parsed(path, |spec| spec.with_value_type(value_type))
    }

    pub fn spec(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    fn parsed(mut self, path: &str, decorate: impl FnOnce(ColumnSpec) -> ColumnSpec) -> Self {
        match FieldPath::parse(path) {
            Ok(parsed) => self.columns.push(decorate(ColumnSpec::new(parsed))),
            Err(err) => self.issues.push(SchemaIssue::new(
                format!("columns[{}].path", self.columns.len() + self.issues.len()),
                err.to_string(),
            )),
        }
        self
    }

    pub fn build(self) -> Result<GridSchema> {
        let mut issues = self.issues;
        issues.extend(validate::validate_columns(&self.columns, self.origin));
        if !issues.is_empty() {
            return Err(SheetMapError::InvalidSchema(issues));
        }
        Ok(GridSchema::new(self.columns, self.origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> FieldPath {
        FieldPath::parse(text).unwrap()
    }

    fn address_schema(origin: GridAddress) -> GridSchema {
        GridSchema::new(
            vec![
                ColumnSpec::parse("id").unwrap(),
                ColumnSpec::parse("address.city").unwrap(),
                ColumnSpec::parse("address.zip").unwrap(),
            ],
            origin,
        )
    }

    #[test]
    fn column_bounds_edges() {
        let schema = address_schema(GridAddress::new(2, 3));
        assert!(!schema.is_in_column_bounds(2));
        assert!(schema.is_in_column_bounds(3));
        assert!(schema.is_in_column_bounds(5));
        assert!(!schema.is_in_column_bounds(6));
    }

    #[test]
    fn row_bounds_edges() {
        let schema = address_schema(GridAddress::new(2, 3));
        assert_eq!(schema.data_row_start(), 3);
        assert!(!schema.is_in_row_bounds(2));
        assert!(schema.is_in_row_bounds(3));
        assert!(schema.is_in_row_bounds(4));
    }

    #[test]
    fn column_at_translates_relative_to_origin() {
        let schema = address_schema(GridAddress::new(0, 1));
        let spec = schema.column_at(GridAddress::new(7, 2)).unwrap();
        assert_eq!(spec.path(), &path("address.city"));
        match schema.column_at(GridAddress::new(7, 0)) {
            Err(SheetMapError::Bounds { address, .. }) => {
                assert_eq!(address, GridAddress::new(7, 0))
            }
            other => panic!("expected bounds error, got {other:?}"),
        }
        assert!(schema.find_column(GridAddress::new(7, 9)).is_none());
    }

    #[test]
    fn column_index_of_is_exact_and_first_wins() {
        let schema = GridSchema::new(
            vec![
                ColumnSpec::parse("a").unwrap(),
                ColumnSpec::parse("b.c").unwrap(),
                ColumnSpec::parse("a").unwrap(),
            ],
            GridAddress::new(0, 4),
        );
        assert_eq!(schema.column_index_of(&path("a")), Some(4));
        assert_eq!(schema.column_index_of(&path("b.c")), Some(5));
        assert_eq!(schema.column_index_of(&path("b")), None);
        assert_eq!(schema.column_index_of(&path("zzz")), None);
    }

    #[test]
    fn columns_matching_uses_prefixes_in_order() {
        let schema = GridSchema::new(
            vec![
                ColumnSpec::parse("x.y").unwrap(),
                ColumnSpec::parse("w").unwrap(),
                ColumnSpec::parse("x.z").unwrap(),
            ],
            GridAddress::ORIGIN,
        );
        let hits: Vec<String> = schema
            .columns_matching(&path("x"))
            .iter()
            .map(|c| c.path().to_string())
            .collect();
        assert_eq!(hits, vec!["x.y", "x.z"]);
        assert!(schema.columns_matching(&path("z")).is_empty());
        assert_eq!(schema.columns_matching(&FieldPath::root()).len(), 3);
        assert_eq!(schema.column_span(&path("x")), Some(0..=2));
        assert_eq!(schema.column_span(&path("w")), Some(1..=1));
        assert_eq!(schema.column_span(&path("q")), None);
    }

    #[test]
    fn empty_schema_finds_nothing() {
        let schema = GridSchema::new(Vec::new(), GridAddress::ORIGIN);
        for col in 0..4 {
            assert!(schema.find_column(GridAddress::new(1, col)).is_none());
        }
        assert!(schema.columns_matching(&path("a")).is_empty());
        assert!(schema.columns_matching(&FieldPath::root()).is_empty());
        assert!(!schema.is_in_column_bounds(0));
        assert_eq!(schema.schema_type(), SCHEMA_TYPE);
    }

    #[test]
    fn address_of_checks_index() {
        let schema = address_schema(GridAddress::new(0, 2));
        assert_eq!(schema.address_of(5, 1).unwrap(), GridAddress::new(5, 3));
        assert!(schema.address_of(5, 3).is_err());
    }

    #[test]
    fn builder_rejects_duplicates_and_conflicts() {
        let err = GridSchema::builder(GridAddress::ORIGIN)
            .column("id")
            .column("id")
            .column("a")
            .column("a.b")
            .column("bad..path")
            .build()
            .unwrap_err();
        let SheetMapError::InvalidSchema(issues) = err else {
            panic!("expected InvalidSchema");
        };
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        assert!(messages.iter().any(|m| m.contains("duplicate path `id`")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("`a`")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("bad..path")), "{messages:?}");
    }

    #[test]
    fn builder_accepts_well_formed_layout() {
        let schema = GridSchema::builder(GridAddress::ORIGIN)
            .typed_column("id", ValueType::Integer)
            .column("address.city")
            .column("address.zip")
            .column("tags[0]")
            .column("tags[1]")
            .build()
            .unwrap();
        assert_eq!(schema.len(), 5);
        assert_eq!(schema.columns()[0].value_type(), Some(ValueType::Integer));
        assert!(schema.validate().is_ok());
    }
}
