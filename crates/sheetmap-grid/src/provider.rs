//! [`GridProvider`] implementations over the reference engines.

use crate::error::GridError;
use crate::memory::{DEFAULT_SHEET_NAME, MemorySheet};
use sheetmap::{GridProvider, GridSink, InputSource, OutputTarget, SheetInput, SheetOutput};
use sheetmap_common::{CellValue, GridAddress};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

fn open_input(source: InputSource) -> sheetmap::Result<Box<dyn Read + Send>> {
    Ok(match source {
        InputSource::File(path) => Box::new(BufReader::new(File::open(path)?)),
        InputSource::Stream(reader) => reader,
    })
}

fn open_output(target: OutputTarget) -> sheetmap::Result<Box<dyn Write + Send>> {
    Ok(match target {
        OutputTarget::File(path) => Box::new(BufWriter::new(File::create(path)?)),
        OutputTarget::Stream(writer) => writer,
    })
}

#[cfg(feature = "csv")]
pub use self::csv_provider::CsvProvider;

#[cfg(feature = "csv")]
mod csv_provider {
    use super::*;
    use crate::csv::{CsvOptions, CsvRowWriter, read_csv};
    use crate::window::{DEFAULT_ROW_WINDOW, WindowedSink};

    /// CSV files as single-sheet workbooks. Output streams through a bounded
    /// row window.
    #[derive(Clone, Debug)]
    pub struct CsvProvider {
        options: CsvOptions,
        window: usize,
    }

    impl Default for CsvProvider {
        fn default() -> Self {
            Self::new(CsvOptions::default())
        }
    }

    impl CsvProvider {
        pub fn new(options: CsvOptions) -> Self {
            Self {
                options,
                window: DEFAULT_ROW_WINDOW,
            }
        }

        pub fn with_window(mut self, window: usize) -> Self {
            self.window = window;
            self
        }

        pub fn options(&self) -> &CsvOptions {
            &self.options
        }
    }

    impl GridProvider for CsvProvider {
        type Source = MemorySheet;
        type Sink = WindowedSink<CsvRowWriter<Box<dyn Write + Send>>>;

        fn name(&self) -> &'static str {
            "csv"
        }

        fn open_source(&self, input: SheetInput) -> sheetmap::Result<MemorySheet> {
            input
                .sheet
                .resolve(std::slice::from_ref(&self.options.sheet_name))?;
            let reader = open_input(input.source)?;
            Ok(read_csv(reader, &self.options)?)
        }

        fn create_sink(&self, output: SheetOutput) -> sheetmap::Result<Self::Sink> {
            #[cfg(feature = "tracing")]
            if let Some(name) = &output.sheet {
                tracing::debug!(sheet = %name, "csv output has a single unnamed sheet");
            }
            let writer = open_output(output.target)?;
            Ok(WindowedSink::with_window(
                CsvRowWriter::new(writer, &self.options),
                self.window,
            ))
        }
    }
}

#[cfg(feature = "json")]
pub use self::json_provider::{JsonWorkbookProvider, WorkbookSink};

#[cfg(feature = "json")]
mod json_provider {
    use super::*;
    use crate::memory::MemoryWorkbook;

    /// JSON workbooks produced by [`MemoryWorkbook::save`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct JsonWorkbookProvider;

    impl GridProvider for JsonWorkbookProvider {
        type Source = MemorySheet;
        type Sink = WorkbookSink;

        fn name(&self) -> &'static str {
            "json"
        }

        fn open_source(&self, input: SheetInput) -> sheetmap::Result<MemorySheet> {
            let reader = open_input(input.source)?;
            let mut workbook = MemoryWorkbook::from_json_reader(reader)?;
            workbook.take_sheet(&input.sheet)
        }

        fn create_sink(&self, output: SheetOutput) -> sheetmap::Result<WorkbookSink> {
            let name = output.sheet.unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
            Ok(WorkbookSink {
                sheet: MemorySheet::new(name),
                target: Some(open_output(output.target)?),
            })
        }
    }

    /// Collects one sheet in memory and writes it out as a one-sheet JSON
    /// workbook on the first flush.
    pub struct WorkbookSink {
        sheet: MemorySheet,
        target: Option<Box<dyn Write + Send>>,
    }

    impl WorkbookSink {
        pub fn sheet(&self) -> &MemorySheet {
            &self.sheet
        }

        pub fn is_written(&self) -> bool {
            self.target.is_none()
        }
    }

    impl GridSink for WorkbookSink {
        type Error = GridError;

        fn write_cell(&mut self, address: GridAddress, value: CellValue) -> Result<(), GridError> {
            if self.is_written() {
                return Err(GridError::backend("json", "workbook already written"));
            }
            self.sheet.write_cell(address, value)
        }

        fn commit_row(&mut self, row: u32) -> Result<(), GridError> {
            self.sheet.commit_row(row)
        }

        fn flush(&mut self) -> Result<(), GridError> {
            let Some(mut target) = self.target.take() else {
                return Ok(());
            };
            let mut workbook = MemoryWorkbook::new();
            workbook.add_sheet(self.sheet.clone())?;
            workbook.to_json_writer(&mut target)?;
            target.flush()?;
            Ok(())
        }
    }
}
