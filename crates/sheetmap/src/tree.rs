//! Bridge between record events and `serde_json::Value` trees.
//!
//! Reconstruction omits absent values and never materializes an empty
//! container: a record whose cells are all blank comes back as `{}`. Array
//! gaps before a present element are filled with `null`.

use crate::error::{Result, SheetMapError};
use crate::event::RecordEvent;
use crate::path::{FieldPath, MAX_ARRAY_INDEX, PathSegment};
use serde_json::{Map, Number, Value};
use sheetmap_common::CellValue;

/// Scalar cell rendered as JSON. Temporal values use their ISO text form,
/// error cells their error code.
pub fn cell_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Int(i) => Value::Number((*i).into()),
        CellValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::Error(e) => Value::String(e.kind.to_string()),
        temporal => Value::String(temporal.to_string()),
    }
}

/// Scalar JSON as a cell; `None` for `null`. Containers are not scalars.
///
/// Integers that fit `i64` become [`CellValue::Int`]; any other number,
/// including an unsigned integer above `i64::MAX`, becomes a lossy
/// [`CellValue::Number`]. [`record_events`] rejects such integers instead.
pub fn json_to_cell(value: &Value) -> Option<CellValue> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(CellValue::Boolean(*b)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => CellValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(s) => Some(CellValue::Text(s.clone())),
    }
}

/// Flatten one record into events. The record must be a JSON object, and
/// its integers must fit in `i64`.
pub fn record_events(record: &Value) -> Result<Vec<RecordEvent>> {
    let Value::Object(fields) = record else {
        return Err(SheetMapError::InvalidRecord(format!(
            "expected an object, found {}",
            kind_name(record)
        )));
    };
    let mut events = Vec::with_capacity(fields.len() * 3 + 2);
    events.push(RecordEvent::StartRecord);
    push_object(fields, &mut events)?;
    events.push(RecordEvent::EndRecord);
    Ok(events)
}

fn push_object(fields: &Map<String, Value>, events: &mut Vec<RecordEvent>) -> Result<()> {
    for (name, value) in fields {
        events.push(RecordEvent::Open(PathSegment::Field(name.clone())));
        push_value(value, events)?;
        events.push(RecordEvent::Close);
    }
    Ok(())
}

fn push_value(value: &Value, events: &mut Vec<RecordEvent>) -> Result<()> {
    match value {
        Value::Object(fields) => push_object(fields, events)?,
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                events.push(RecordEvent::Open(PathSegment::Index(idx)));
                push_value(item, events)?;
                events.push(RecordEvent::Close);
            }
        }
        Value::Number(n) if n.is_u64() && n.as_i64().is_none() => {
            return Err(SheetMapError::InvalidRecord(format!(
                "integer {n} does not fit a 64-bit signed cell"
            )));
        }
        scalar => events.push(RecordEvent::Value(json_to_cell(scalar))),
    }
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Incremental event consumer that assembles one record at a time.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    root: Option<Value>,
    path: FieldPath,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record has been started but not ended.
    pub fn in_record(&self) -> bool {
        self.root.is_some()
    }

    /// Feed one event; returns the finished record on `EndRecord`.
    pub fn push(&mut self, event: RecordEvent) -> Result<Option<Value>> {
        match event {
            RecordEvent::StartRecord => {
                if self.root.is_some() {
                    return Err(SheetMapError::InvalidEvent(
                        "record started inside another record".into(),
                    ));
                }
                self.root = Some(Value::Object(Map::new()));
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
                let Some(root) = self.root.as_mut() else {
                    return Err(SheetMapError::InvalidEvent("value outside a record".into()));
                };
                if let Some(value) = value {
                    *slot(root, &self.path)? = cell_to_json(&value);
                }
            }
            RecordEvent::EndRecord => {
                if !self.path.is_empty() {
                    return Err(SheetMapError::InvalidEvent(format!(
                        "record ended with `{}` still open",
                        self.path
                    )));
                }
                return match self.root.take() {
                    Some(root) => Ok(Some(root)),
                    None => Err(SheetMapError::InvalidEvent("end of record without start".into())),
                };
            }
        }
        Ok(None)
    }

    fn require_record(&self, what: &str) -> Result<()> {
        if self.root.is_none() {
            return Err(SheetMapError::InvalidEvent(format!("{what} outside a record")));
        }
        Ok(())
    }
}

/// Walk `path` from `node`, creating objects and arrays on the way.
fn slot<'a>(mut node: &'a mut Value, path: &FieldPath) -> Result<&'a mut Value> {
    let conflict = || {
        SheetMapError::InvalidRecord(format!("`{path}` conflicts with a value already in the record"))
    };
    for segment in path.segments() {
        node = match segment {
            PathSegment::Field(name) => {
                if node.is_null() {
                    *node = Value::Object(Map::new());
                }
                match node {
                    Value::Object(fields) => fields.entry(name.clone()).or_insert(Value::Null),
                    _ => return Err(conflict()),
                }
            }
            PathSegment::Index(idx) => {
                let len = idx
                    .checked_add(1)
                    .filter(|_| *idx <= MAX_ARRAY_INDEX)
                    .ok_or_else(|| {
                        SheetMapError::InvalidRecord(format!(
                            "`{path}`: array index {idx} exceeds {MAX_ARRAY_INDEX}"
                        ))
                    })?;
                if node.is_null() {
                    *node = Value::Array(Vec::new());
                }
                match node {
                    Value::Array(items) => {
                        if items.len() < len {
                            items.resize(len, Value::Null);
                        }
                        &mut items[*idx]
                    }
                    _ => return Err(conflict()),
                }
            }
        };
    }
    Ok(node)
}
