use super::validate::{SchemaIssue, validate_columns};
use super::{ColumnSpec, GridSchema};
use crate::error::{Result, SheetMapError};
use crate::path::FieldPath;
use serde::{Deserialize, Serialize};
use sheetmap_common::{GridAddress, ValueType};

fn default_origin() -> String {
    "A1".to_string()
}

/// Serializable schema description, as read from YAML or JSON.
///
/// ```yaml
/// origin: B2
/// columns:
///   - path: id
///     type: integer
///   - path: address.city
///   - path: shipped_on
///     type: date
///     format: "%d/%m/%Y"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    /// Header cell of the first column, in A1 notation.
    #[serde(default = "default_origin")]
    pub origin: String,
    pub columns: Vec<ColumnDefinition>,
}

/// One column of a [`SchemaDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDefinition {
    pub path: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SchemaDefinition {
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate every entry, reporting all issues at once.
    pub fn validate(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    /// Validate and produce the schema.
    pub fn build(&self) -> Result<GridSchema> {
        let (columns, origin) = self.resolve()?;
        Ok(GridSchema::new(columns, origin))
    }

    fn resolve(&self) -> Result<(Vec<ColumnSpec>, GridAddress)> {
        let mut issues = Vec::new();

        let origin = match GridAddress::try_from_a1(&self.origin) {
            Ok(origin) => origin,
            Err(err) => {
                issues.push(SchemaIssue::new("origin", err.to_string()));
                GridAddress::ORIGIN
            }
        };

        let mut columns = Vec::with_capacity(self.columns.len());
        let mut parse_failed = false;
        for (idx, column) in self.columns.iter().enumerate() {
            match FieldPath::parse(&column.path) {
                Ok(path) => {
                    let mut spec = ColumnSpec::new(path);
                    if let Some(value_type) = column.value_type {
                        spec = spec.with_value_type(value_type);
                    }
                    if let Some(format) = &column.format {
                        if format.trim().is_empty() {
                            issues.push(SchemaIssue::new(
                                format!("columns[{idx}].format"),
                                "format must not be blank",
                            ));
                        }
                        spec = spec.with_format(format.clone());
                    }
                    columns.push(spec);
                }
                Err(err) => {
                    parse_failed = true;
                    issues.push(SchemaIssue::new(
                        format!("columns[{idx}].path"),
                        err.to_string(),
                    ));
                }
            }
        }

        // Structural checks index into the parsed list; only meaningful when
        // every path parsed.
        if !parse_failed {
            issues.extend(validate_columns(&columns, origin));
        }

        if issues.is_empty() {
            Ok((columns, origin))
        } else {
            Err(SheetMapError::InvalidSchema(issues))
        }
    }
}
