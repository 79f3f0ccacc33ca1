//! Field paths: the addresses of values inside a hierarchical record.
//!
//! A path is an ordered list of segments, each either an object field name or
//! an array index. The textual form joins fields with `.` and writes indices
//! in brackets: `address.city`, `items[0].sku`, `matrix[1][2]`. Field names
//! containing `.`, `[` or `]` cannot be expressed textually; build those paths
//! from segments instead.

use sheetmap_common::COL_MAX;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest array index a schema column may address. Every element of an
/// array needs its own grid column, so no index can exceed the grid width.
pub const MAX_ARRAY_INDEX: usize = COL_MAX as usize;

/// One step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl PathSegment {
    pub fn is_index(&self) -> bool {
        matches!(self, PathSegment::Index(_))
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathSegment::Field(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Field(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Field(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

/// Error produced by [`FieldPath::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid field path `{text}` at offset {offset}: {reason}")]
pub struct PathParseError {
    pub text: String,
    pub offset: usize,
    pub reason: &'static str,
}

/// Ordered sequence of segments naming a position in a record.
///
/// The empty path denotes the whole record and acts as a wildcard filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(SmallVec<[PathSegment; 4]>);

impl FieldPath {
    /// The empty (root) path.
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse the dotted/bracketed textual form. The empty string is the root.
    pub fn parse(text: &str) -> Result<Self, PathParseError> {
        let fail = |offset: usize, reason: &'static str| PathParseError {
            text: text.to_string(),
            offset,
            reason,
        };

        let mut segments = SmallVec::new();
        let mut name = String::new();
        // True right after a `.` (or at the start): a field name must follow.
        let mut need_name = false;
        // True right after a `]`: only `.` or `[` may follow.
        let mut after_index = false;
        let mut chars = text.char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '.' => {
                    if name.is_empty() && !after_index {
                        return Err(fail(offset, "empty field name"));
                    }
                    if !name.is_empty() {
                        segments.push(PathSegment::Field(std::mem::take(&mut name)));
                    }
                    need_name = true;
                    after_index = false;
                }
                '[' => {
                    if need_name && name.is_empty() {
                        return Err(fail(offset, "empty field name"));
                    }
                    if !name.is_empty() {
                        segments.push(PathSegment::Field(std::mem::take(&mut name)));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(c);
                    }
                    if !closed {
                        return Err(fail(offset, "unclosed `[`"));
                    }
                    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(fail(offset, "array index must be a non-negative integer"));
                    }
                    let idx = digits
                        .parse::<usize>()
                        .map_err(|_| fail(offset, "array index out of range"))?;
                    segments.push(PathSegment::Index(idx));
                    need_name = false;
                    after_index = true;
                }
                ']' => return Err(fail(offset, "unexpected `]`")),
                _ if after_index => return Err(fail(offset, "expected `.` or `[` after index")),
                c => {
                    name.push(c);
                    need_name = false;
                }
            }
        }

        if need_name {
            return Err(fail(text.len(), "trailing `.`"));
        }
        if !name.is_empty() {
            segments.push(PathSegment::Field(name));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact equality; the predicate `column_index_of` resolves with.
    pub fn matches(&self, other: &FieldPath) -> bool {
        self == other
    }

    /// True when `prefix` is a non-strict prefix of `self`.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Number of leading segments shared with `other`.
    pub fn common_prefix_len(&self, other: &FieldPath) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn leaf(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Path of the container holding the leaf (all but the last segment).
    pub fn container(&self) -> &[PathSegment] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// A new path extended by one segment.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut out = self.clone();
        out.push(segment);
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            if idx > 0 && !segment.is_index() {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for FieldPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_segments(iter)
    }
}

impl From<&[PathSegment]> for FieldPath {
    fn from(value: &[PathSegment]) -> Self {
        Self(value.iter().cloned().collect())
    }
}
