//! CSV as a single-sheet grid.
//!
//! Reading loads the whole file into a [`MemorySheet`] (CSV has no random
//! access). Writing streams rows through [`CsvRowWriter`], normally behind a
//! [`WindowedSink`](crate::WindowedSink); row gaps become empty records so
//! row positions survive a round trip.
//!
//! CSV carries no cell types. Under [`CsvTypeInference::Basic`] text such as
//! `"42"` or `"true"` written to a CSV reads back as a number or boolean, and
//! an empty string reads back as absent. Columns that must keep text need a
//! `string` type hint in the schema, or inference turned off.

use crate::error::GridError;
use crate::memory::{DEFAULT_SHEET_NAME, MemorySheet};
use crate::window::RowWriter;
use sheetmap_common::{CellValue, GridAddress};
use std::io::{Read, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvTypeInference {
    /// Every non-empty field is text.
    Off,
    /// Booleans and unambiguous numbers. Numeric-looking text does not
    /// survive a write/read cycle unchanged.
    #[default]
    Basic,
}

#[derive(Clone, Debug)]
pub struct CsvOptions {
    /// Field delimiter; `b'\t'` for TSV.
    pub delimiter: u8,
    pub trim: bool,
    pub type_inference: CsvTypeInference,
    /// Name reported for the single sheet.
    pub sheet_name: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: false,
            type_inference: CsvTypeInference::Basic,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

/// Load a CSV document. Every record is a row, including the first.
pub fn read_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<MemorySheet, GridError> {
    let mut rb = csv::ReaderBuilder::new();
    rb.delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(if options.trim {
            csv::Trim::All
        } else {
            csv::Trim::None
        });
    let mut rdr = rb.from_reader(reader);

    let mut sheet = MemorySheet::new(options.sheet_name.clone());
    for (r, record) in rdr.records().enumerate() {
        let record = record?;
        let row = u32::try_from(r).map_err(|_| GridError::backend("csv", "too many rows"))?;
        for (c, field) in record.iter().enumerate() {
            if let Some(value) = infer_field(field, options.type_inference) {
                let address = GridAddress::try_new(row, c as u32)
                    .map_err(|e| GridError::backend("csv", e.to_string()))?;
                sheet.set(address, value);
            }
        }
        sheet.touch_row(row);
    }
    Ok(sheet)
}

fn infer_field(field: &str, mode: CsvTypeInference) -> Option<CellValue> {
    if field.is_empty() {
        return None;
    }
    if mode == CsvTypeInference::Off {
        return Some(CellValue::Text(field.to_string()));
    }
    if let Some(b) = parse_bool(field) {
        return Some(CellValue::Boolean(b));
    }
    if let Some(i) = parse_unambiguous_i64(field) {
        return Some(CellValue::Int(i));
    }
    if let Some(n) = parse_unambiguous_f64(field) {
        return Some(CellValue::Number(n));
    }
    Some(CellValue::Text(field.to_string()))
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// Leading zeros stay text: "007" is an identifier, not seven.
fn parse_unambiguous_i64(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

fn parse_unambiguous_f64(s: &str) -> Option<f64> {
    if !(s.contains('.') || s.contains('e') || s.contains('E')) {
        return None;
    }
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    if unsigned.len() > 1 && unsigned.starts_with('0') && !unsigned.starts_with("0.") {
        return None;
    }
    let n: f64 = s.parse().ok()?;
    n.is_finite().then_some(n)
}

fn cell_to_field(value: &CellValue) -> String {
    match value {
        CellValue::Boolean(true) => "TRUE".to_string(),
        CellValue::Boolean(false) => "FALSE".to_string(),
        CellValue::Error(e) => e.kind.to_string(),
        other => other.to_string(),
    }
}

/// Streams rows into a CSV writer.
pub struct CsvRowWriter<W: Write> {
    writer: csv::Writer<W>,
    next_row: u32,
}

impl<W: Write> CsvRowWriter<W> {
    pub fn new(writer: W, options: &CsvOptions) -> Self {
        let mut wb = csv::WriterBuilder::new();
        wb.delimiter(options.delimiter)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'));
        Self {
            writer: wb.from_writer(writer),
            next_row: 0,
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, GridError> {
        self.writer
            .into_inner()
            .map_err(|e| GridError::Io(e.into_error()))
    }

    fn pad_to(&mut self, row: u32) -> Result<(), GridError> {
        while self.next_row < row {
            self.writer.write_record([""])?;
            self.next_row += 1;
        }
        Ok(())
    }
}

impl<W: Write> RowWriter for CsvRowWriter<W> {
    fn write_row(&mut self, row: u32, cells: Vec<(u32, CellValue)>) -> Result<(), GridError> {
        if row < self.next_row {
            return Err(GridError::backend(
                "csv",
                format!("row {row} arrived after row {}", self.next_row - 1),
            ));
        }
        self.pad_to(row)?;
        let width = cells.last().map_or(0, |(col, _)| *col as usize + 1);
        let mut record = vec![String::new(); width];
        for (col, value) in cells {
            record[col as usize] = cell_to_field(&value);
        }
        self.writer.write_record(&record)?;
        self.next_row = row + 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), GridError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a whole sheet as CSV.
pub fn write_csv<W: Write>(
    sheet: &MemorySheet,
    writer: W,
    options: &CsvOptions,
) -> Result<(), GridError> {
    let mut out = CsvRowWriter::new(writer, options);
    for row in 0..sheet.row_count() {
        let cells: Vec<(u32, CellValue)> = sheet
            .row(row)
            .map(|(col, value)| (col, value.clone()))
            .collect();
        if !cells.is_empty() {
            out.write_row(row, cells)?;
        }
    }
    out.pad_to(sheet.row_count())?;
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetmap::GridSource;

    #[test]
    fn reads_with_basic_inference() {
        let input = "id,name,score,ok\n1,Ada,2.5,TRUE\n007,\"Lovelace, A\",,false\n";
        let mut sheet = read_csv(input.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.dimensions(), Some((2, 3)));
        assert_eq!(sheet.cell_at(GridAddress::new(1, 0)).unwrap(), Some(CellValue::Int(1)));
        assert_eq!(
            sheet.cell_at(GridAddress::new(1, 2)).unwrap(),
            Some(CellValue::Number(2.5))
        );
        assert_eq!(
            sheet.cell_at(GridAddress::new(2, 0)).unwrap(),
            Some(CellValue::from("007"))
        );
        assert_eq!(
            sheet.cell_at(GridAddress::new(2, 1)).unwrap(),
            Some(CellValue::from("Lovelace, A"))
        );
        assert_eq!(sheet.cell_at(GridAddress::new(2, 2)).unwrap(), None);
        assert_eq!(
            sheet.cell_at(GridAddress::new(2, 3)).unwrap(),
            Some(CellValue::Boolean(false))
        );
    }

    #[test]
    fn inference_off_keeps_text() {
        let options = CsvOptions {
            type_inference: CsvTypeInference::Off,
            ..CsvOptions::default()
        };
        let sheet = read_csv("1,true\n".as_bytes(), &options).unwrap();
        assert_eq!(sheet.get(GridAddress::new(0, 0)), Some(&CellValue::from("1")));
    }

    #[test]
    fn write_preserves_row_gaps() {
        let mut sheet = MemorySheet::new("S");
        sheet.set(GridAddress::new(0, 0), CellValue::from("a,b"));
        sheet.set(GridAddress::new(2, 1), CellValue::Boolean(true));
        let mut buf = Vec::new();
        write_csv(&sheet, &mut buf, &CsvOptions::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "\"a,b\"\n\"\"\n,TRUE\n");

        let back = read_csv(text.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(back.get(GridAddress::new(2, 1)), Some(&CellValue::Boolean(true)));
        assert_eq!(back.row_count(), 3);
    }

    #[test]
    fn rows_must_arrive_in_order() {
        let mut out = CsvRowWriter::new(Vec::new(), &CsvOptions::default());
        out.write_row(3, vec![(0, CellValue::Int(1))]).unwrap();
        assert!(out.write_row(2, vec![(0, CellValue::Int(2))]).is_err());
        let bytes = out.into_inner().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "\"\"\n\"\"\n\"\"\n1\n");
    }
}
