use crate::path::{MAX_ARRAY_INDEX, PathSegment};
use crate::schema::ColumnSpec;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use sheetmap_common::{COL_MAX, GridAddress};
use std::fmt;

/// One problem found while validating a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Location of the offending entry, e.g. `columns[2].path`.
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Collect every structural problem in a column list.
pub(crate) fn validate_columns(columns: &[ColumnSpec], origin: GridAddress) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    if !columns.is_empty() && origin.col() as u64 + columns.len() as u64 - 1 > COL_MAX as u64 {
        issues.push(SchemaIssue::new(
            "columns",
            format!(
                "{} columns starting at {} overflow the grid width",
                columns.len(),
                origin
            ),
        ));
    }

    let mut first_seen: FxHashMap<&[PathSegment], usize> = FxHashMap::default();
    let mut containers: FxHashSet<&[PathSegment]> = FxHashSet::default();
    for (idx, column) in columns.iter().enumerate() {
        let segments = column.path().segments();
        if segments.is_empty() {
            issues.push(SchemaIssue::new(
                format!("columns[{idx}].path"),
                "column path must not be empty",
            ));
            continue;
        }
        if let Some(first) = first_seen.get(segments) {
            issues.push(SchemaIssue::new(
                format!("columns[{idx}].path"),
                format!(
                    "duplicate path `{}` (first declared at columns[{first}])",
                    column.path()
                ),
            ));
        } else {
            first_seen.insert(segments, idx);
        }
        for len in 1..segments.len() {
            containers.insert(&segments[..len]);
        }
        if let Some(index) = segments.iter().find_map(|segment| match segment {
            PathSegment::Index(index) if *index > MAX_ARRAY_INDEX => Some(*index),
            _ => None,
        }) {
            issues.push(SchemaIssue::new(
                format!("columns[{idx}].path"),
                format!("array index {index} exceeds {MAX_ARRAY_INDEX}"),
            ));
        }
    }

    // A leaf cannot also hold nested values.
    for (idx, column) in columns.iter().enumerate() {
        let segments = column.path().segments();
        if !segments.is_empty() && containers.contains(segments) {
            let nested = columns
                .iter()
                .find(|other| {
                    other.path().len() > segments.len() && other.path().segments().starts_with(segments)
                })
                .map(|other| other.path().to_string())
                .unwrap_or_default();
            issues.push(SchemaIssue::new(
                format!("columns[{idx}].path"),
                format!(
                    "column `{}` is both a value and the container of `{nested}`",
                    column.path()
                ),
            ));
        }
    }

    // Columns sharing a container must be adjacent, and a container holds
    // either named fields or array indices, never both.
    let mut last_seen: FxHashMap<&[PathSegment], usize> = FxHashMap::default();
    let mut child_kind: FxHashMap<&[PathSegment], bool> = FxHashMap::default();
    let mut reported: FxHashSet<&[PathSegment]> = FxHashSet::default();
    for (idx, column) in columns.iter().enumerate() {
        let segments = column.path().segments();
        for len in 0..segments.len() {
            let prefix = &segments[..len];
            let is_index = segments[len].is_index();
            let kind = *child_kind.entry(prefix).or_insert(is_index);
            if kind != is_index && reported.insert(prefix) {
                issues.push(SchemaIssue::new(
                    format!("columns[{idx}].path"),
                    format!(
                        "container `{}` mixes named fields and array indices",
                        display_prefix(prefix)
                    ),
                ));
            }
            if len == 0 {
                continue;
            }
            if let Some(prev) = last_seen.insert(prefix, idx) {
                if prev + 1 != idx && reported.insert(prefix) {
                    issues.push(SchemaIssue::new(
                        format!("columns[{idx}].path"),
                        format!(
                            "columns under `{}` must be contiguous (columns[{prev}] and columns[{idx}] are separated)",
                            display_prefix(prefix)
                        ),
                    ));
                }
            }
        }
    }

    issues
}

fn display_prefix(prefix: &[PathSegment]) -> String {
    crate::path::FieldPath::from(prefix).to_string()
}
