//! In-memory sheets and workbooks.
//!
//! A [`MemorySheet`] is a sparse cell map that acts as both a grid source and
//! an unbounded grid sink. A [`MemoryWorkbook`] is an ordered list of named
//! sheets and, with the `json` feature, persists to a small JSON document.

use crate::error::GridError;
use crate::window::RowWriter;
use sheetmap::{GridSink, GridSource, SheetRef};
use sheetmap_common::{CellValue, GridAddress};
use std::collections::BTreeMap;

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySheet {
    name: String,
    /// Only non-empty cells are stored.
    cells: BTreeMap<GridAddress, CellValue>,
    /// One past the last row touched, including committed empty rows.
    row_count: u32,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            row_count: 0,
        }
    }

    /// Build a sheet from row-major values starting at `A1`.
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = Option<CellValue>>,
    {
        let mut sheet = Self::new(name);
        for (r, row) in rows.into_iter().enumerate() {
            let r = r as u32;
            for (c, value) in row.into_iter().enumerate() {
                if let Some(value) = value {
                    sheet.set(GridAddress::new(r, c as u32), value);
                }
            }
            sheet.touch_row(r);
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn get(&self, address: GridAddress) -> Option<&CellValue> {
        self.cells.get(&address)
    }

    pub fn set(&mut self, address: GridAddress, value: CellValue) {
        self.touch_row(address.row());
        self.cells.insert(address, value);
    }

    pub fn clear(&mut self, address: GridAddress) -> Option<CellValue> {
        self.cells.remove(&address)
    }

    /// Rows spanned by the sheet, from row 0.
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = (GridAddress, &CellValue)> {
        self.cells.iter().map(|(addr, value)| (*addr, value))
    }

    /// Cells of one row in column order.
    pub fn row(&self, row: u32) -> impl Iterator<Item = (u32, &CellValue)> {
        self.cells
            .range(GridAddress::new(row, 0)..=GridAddress::new(row, sheetmap_common::COL_MAX))
            .map(|(addr, value)| (addr.col(), value))
    }

    /// Count `row` as part of the sheet even if it holds no cells.
    pub(crate) fn touch_row(&mut self, row: u32) {
        self.row_count = self.row_count.max(row + 1);
    }

    fn last_col(&self) -> Option<u32> {
        self.cells.keys().map(|addr| addr.col()).max()
    }
}

impl GridSource for MemorySheet {
    type Error = GridError;

    fn has_row(&self, row: u32) -> bool {
        row < self.row_count
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        let last_col = self.last_col()?;
        Some((self.row_count.saturating_sub(1), last_col))
    }

    fn cell_at(&mut self, address: GridAddress) -> Result<Option<CellValue>, GridError> {
        Ok(self.cells.get(&address).cloned())
    }
}

impl GridSink for MemorySheet {
    type Error = GridError;

    fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), GridError> {
        self.set(address, value);
        Ok(())
    }

    fn commit_row(&mut self, row: u32) -> Result<(), GridError> {
        self.touch_row(row);
        Ok(())
    }
}

/// Collects flushed rows, so a sheet can sit behind a window sink.
impl RowWriter for MemorySheet {
    fn write_row(&mut self, row: u32, cells: Vec<(u32, CellValue)>) -> Result<(), GridError> {
        for (col, value) in cells {
            self.set(GridAddress::new(row, col), value);
        }
        self.touch_row(row);
        Ok(())
    }
}

/// Ordered collection of uniquely named sheets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(MemorySheet::name).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn add_sheet(&mut self, sheet: MemorySheet) -> Result<usize, GridError> {
        if self.sheets.iter().any(|s| s.name() == sheet.name()) {
            return Err(GridError::DuplicateSheet(sheet.name().to_string()));
        }
        self.sheets.push(sheet);
        Ok(self.sheets.len() - 1)
    }

    /// Add a sheet, replacing any existing sheet with the same name in place.
    pub fn put_sheet(&mut self, sheet: MemorySheet) {
        match self.sheets.iter_mut().find(|s| s.name() == sheet.name()) {
            Some(slot) => *slot = sheet,
            None => self.sheets.push(sheet),
        }
    }

    pub fn sheet(&self, sheet: &SheetRef) -> sheetmap::Result<&MemorySheet> {
        let idx = self.position(sheet)?;
        Ok(&self.sheets[idx])
    }

    pub fn sheet_mut(&mut self, sheet: &SheetRef) -> sheetmap::Result<&mut MemorySheet> {
        let idx = self.position(sheet)?;
        Ok(&mut self.sheets[idx])
    }

    /// Remove and return a sheet.
    pub fn take_sheet(&mut self, sheet: &SheetRef) -> sheetmap::Result<MemorySheet> {
        let idx = self.position(sheet)?;
        Ok(self.sheets.remove(idx))
    }

    fn position(&self, sheet: &SheetRef) -> sheetmap::Result<usize> {
        sheet.resolve(self.sheet_names().as_slice())
    }
}

#[cfg(feature = "json")]
mod json {
    use super::{MemorySheet, MemoryWorkbook};
    use crate::error::GridError;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{Deserialize, Serialize};
    use sheetmap_common::{
        CellError, CellErrorKind, CellValue, DEFAULT_DATE_FORMAT, DEFAULT_DATETIME_FORMAT,
        DEFAULT_TIME_FORMAT, GridAddress,
    };
    use std::fs::File;
    use std::io::{BufReader, BufWriter, Read, Write};
    use std::path::Path;

    #[derive(Serialize, Deserialize, Debug, Default)]
    struct JsonWorkbook {
        #[serde(default = "default_version")]
        version: u32,
        #[serde(default)]
        sheets: Vec<JsonSheet>,
    }

    fn default_version() -> u32 {
        1
    }

    #[derive(Serialize, Deserialize, Debug)]
    struct JsonSheet {
        name: String,
        #[serde(default)]
        rows: u32,
        #[serde(default)]
        cells: Vec<JsonCell>,
    }

    #[derive(Serialize, Deserialize, Debug)]
    struct JsonCell {
        row: u32,
        col: u32,
        value: JsonValue,
    }

    #[derive(Serialize, Deserialize, Debug)]
    #[serde(tag = "type", content = "value")]
    enum JsonValue {
        Int(i64),
        Number(f64),
        Text(String),
        Boolean(bool),
        Date(String),
        DateTime(String),
        Time(String),
        Error(String),
    }

    impl From<&CellValue> for JsonValue {
        fn from(value: &CellValue) -> Self {
            match value {
                CellValue::Int(i) => JsonValue::Int(*i),
                CellValue::Number(n) => JsonValue::Number(*n),
                CellValue::Text(s) => JsonValue::Text(s.clone()),
                CellValue::Boolean(b) => JsonValue::Boolean(*b),
                CellValue::Date(d) => JsonValue::Date(d.format(DEFAULT_DATE_FORMAT).to_string()),
                CellValue::DateTime(dt) => {
                    JsonValue::DateTime(dt.format(DEFAULT_DATETIME_FORMAT).to_string())
                }
                CellValue::Time(t) => JsonValue::Time(t.format(DEFAULT_TIME_FORMAT).to_string()),
                CellValue::Error(e) => JsonValue::Error(e.kind.to_string()),
            }
        }
    }

    impl JsonValue {
        fn into_cell(self) -> Result<CellValue, GridError> {
            let bad = |what: &str, text: &str| {
                GridError::backend("json", format!("invalid {what} `{text}`"))
            };
            Ok(match self {
                JsonValue::Int(i) => CellValue::Int(i),
                JsonValue::Number(n) => CellValue::Number(n),
                JsonValue::Text(s) => CellValue::Text(s),
                JsonValue::Boolean(b) => CellValue::Boolean(b),
                JsonValue::Date(s) => NaiveDate::parse_from_str(&s, DEFAULT_DATE_FORMAT)
                    .map(CellValue::Date)
                    .map_err(|_| bad("date", &s))?,
                JsonValue::DateTime(s) => {
                    NaiveDateTime::parse_from_str(&s, DEFAULT_DATETIME_FORMAT)
                        .map(CellValue::DateTime)
                        .map_err(|_| bad("date-time", &s))?
                }
                JsonValue::Time(s) => NaiveTime::parse_from_str(&s, DEFAULT_TIME_FORMAT)
                    .map(CellValue::Time)
                    .map_err(|_| bad("time", &s))?,
                JsonValue::Error(code) => {
                    let kind = CellErrorKind::parse(&code).ok_or_else(|| bad("error code", &code))?;
                    CellValue::Error(CellError::new(kind))
                }
            })
        }
    }

    impl MemoryWorkbook {
        pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, GridError> {
            let data: JsonWorkbook = serde_json::from_reader(reader)?;
            if data.version != 1 {
                return Err(GridError::backend(
                    "json",
                    format!("unsupported workbook version {}", data.version),
                ));
            }
            let mut workbook = MemoryWorkbook::new();
            for js in data.sheets {
                let mut sheet = MemorySheet::new(js.name);
                for cell in js.cells {
                    let address = GridAddress::try_new(cell.row, cell.col)
                        .map_err(|e| GridError::backend("json", e.to_string()))?;
                    sheet.set(address, cell.value.into_cell()?);
                }
                sheet.row_count = sheet.row_count.max(js.rows);
                workbook.add_sheet(sheet)?;
            }
            Ok(workbook)
        }

        pub fn from_json_str(json: &str) -> Result<Self, GridError> {
            Self::from_json_reader(json.as_bytes())
        }

        pub fn load(path: impl AsRef<Path>) -> Result<Self, GridError> {
            let file = File::open(path.as_ref())?;
            Self::from_json_reader(BufReader::new(file))
        }

        pub fn to_json_writer<W: Write>(&self, writer: W) -> Result<(), GridError> {
            let data = JsonWorkbook {
                version: 1,
                sheets: self
                    .sheets
                    .iter()
                    .map(|sheet| JsonSheet {
                        name: sheet.name.clone(),
                        rows: sheet.row_count,
                        cells: sheet
                            .cells()
                            .map(|(addr, value)| JsonCell {
                                row: addr.row(),
                                col: addr.col(),
                                value: value.into(),
                            })
                            .collect(),
                    })
                    .collect(),
            };
            serde_json::to_writer_pretty(writer, &data)?;
            Ok(())
        }

        pub fn to_json_string(&self) -> Result<String, GridError> {
            let mut buf = Vec::new();
            self.to_json_writer(&mut buf)?;
            String::from_utf8(buf).map_err(|e| GridError::backend("json", e.to_string()))
        }

        pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GridError> {
            let mut writer = BufWriter::new(File::create(path.as_ref())?);
            self.to_json_writer(&mut writer)?;
            writer.flush()?;
            Ok(())
        }
    }
}
