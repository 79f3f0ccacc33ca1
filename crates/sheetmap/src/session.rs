//! Session descriptors and the provider-backed mapper that turns them into
//! readers and writers.
//!
//! A session names a sheet (by name or position) inside a file or stream.
//! Resolution happens once, when the reader or writer is created, and an
//! unknown sheet fails right there rather than on the first row.

use crate::error::{Result, SheetMapError};
use crate::feature::{Feature, Features};
use crate::grid::{GridSink, GridSource};
use crate::reader::RecordReader;
use crate::schema::GridSchema;
use crate::writer::RecordWriter;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Which sheet of a workbook a session targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SheetRef {
    Named(String),
    /// Zero-based sheet position.
    Indexed(usize),
}

impl Default for SheetRef {
    fn default() -> Self {
        SheetRef::Indexed(0)
    }
}

impl SheetRef {
    /// Position of this sheet among `names`.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<usize> {
        let found = match self {
            SheetRef::Named(name) => names.iter().position(|n| n.as_ref() == name),
            SheetRef::Indexed(idx) => (*idx < names.len()).then_some(*idx),
        };
        found.ok_or_else(|| SheetMapError::schema_resolution(format!("no sheet for {self}")))
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::Named(name) => write!(f, "name `{name}`"),
            SheetRef::Indexed(idx) => write!(f, "index {idx}"),
        }
    }
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        SheetRef::Named(name.to_string())
    }
}

impl From<String> for SheetRef {
    fn from(name: String) -> Self {
        SheetRef::Named(name)
    }
}

impl From<usize> for SheetRef {
    fn from(idx: usize) -> Self {
        SheetRef::Indexed(idx)
    }
}

/// Where input bytes come from.
pub enum InputSource {
    File(PathBuf),
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::File(path) => f.debug_tuple("File").field(path).finish(),
            InputSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Where output bytes go.
pub enum OutputTarget {
    File(PathBuf),
    Stream(Box<dyn Write + Send>),
}

impl fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => f.debug_tuple("File").field(path).finish(),
            OutputTarget::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Read session descriptor: a source plus the sheet to read.
#[derive(Debug)]
pub struct SheetInput {
    pub source: InputSource,
    pub sheet: SheetRef,
}

impl SheetInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: InputSource::File(path.into()),
            sheet: SheetRef::default(),
        }
    }

    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        Self {
            source: InputSource::Stream(Box::new(reader)),
            sheet: SheetRef::default(),
        }
    }

    pub fn sheet(mut self, sheet: impl Into<SheetRef>) -> Self {
        self.sheet = sheet.into();
        self
    }
}

/// Write session descriptor: a target plus the name of the sheet to create.
#[derive(Debug)]
pub struct SheetOutput {
    pub target: OutputTarget,
    pub sheet: Option<String>,
}

impl SheetOutput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: OutputTarget::File(path.into()),
            sheet: None,
        }
    }

    pub fn stream(writer: impl Write + Send + 'static) -> Self {
        Self {
            target: OutputTarget::Stream(Box::new(writer)),
            sheet: None,
        }
    }

    pub fn sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet = Some(name.into());
        self
    }
}

/// Factory for grid engines, injected into a [`SheetMapper`].
///
/// Implementations report an unknown sheet as
/// [`SheetMapError::SchemaResolution`] (see [`SheetRef::resolve`]) and wrap
/// engine failures with [`SheetMapError::from_grid`].
pub trait GridProvider {
    type Source: GridSource;
    type Sink: GridSink;

    /// Short engine name used in logs.
    fn name(&self) -> &'static str;

    fn open_source(&self, input: SheetInput) -> Result<Self::Source>;

    fn create_sink(&self, output: SheetOutput) -> Result<Self::Sink>;
}

impl<P: GridProvider + ?Sized> GridProvider for &P {
    type Source = P::Source;
    type Sink = P::Sink;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open_source(&self, input: SheetInput) -> Result<Self::Source> {
        (**self).open_source(input)
    }

    fn create_sink(&self, output: SheetOutput) -> Result<Self::Sink> {
        (**self).create_sink(output)
    }
}

/// Entry point tying a provider and a feature set together.
#[derive(Debug, Clone)]
pub struct SheetMapper<P: GridProvider> {
    provider: P,
    features: Features,
}

impl<P: GridProvider> SheetMapper<P> {
    pub fn new(provider: P) -> Self {
        Self::with_features(provider, Features::default())
    }

    pub fn with_features(provider: P, features: Features) -> Self {
        Self { provider, features }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.features.is_enabled(feature)
    }

    pub fn enable(&mut self, feature: Feature) -> &mut Self {
        self.features.enable(feature);
        self
    }

    pub fn disable(&mut self, feature: Feature) -> &mut Self {
        self.features.disable(feature);
        self
    }

    pub fn configure(&mut self, feature: Feature, state: bool) -> &mut Self {
        self.features.configure(feature, state);
        self
    }

    /// Open `input` and build a reader over it.
    pub fn create_reader<'s>(
        &self,
        input: SheetInput,
        schema: &'s GridSchema,
    ) -> Result<RecordReader<'s, P::Source>> {
        #[cfg(feature = "tracing")]
        tracing::debug!(engine = self.provider.name(), sheet = %input.sheet, "opening grid source");
        let source = self.provider.open_source(input)?;
        RecordReader::with_features(source, schema, self.features)
    }

    /// Create the output grid and build a writer over it.
    pub fn create_writer<'s>(
        &self,
        output: SheetOutput,
        schema: &'s GridSchema,
    ) -> Result<RecordWriter<'s, P::Sink>> {
        #[cfg(feature = "tracing")]
        tracing::debug!(engine = self.provider.name(), sheet = ?output.sheet, "creating grid sink");
        let sink = self.provider.create_sink(output)?;
        Ok(RecordWriter::with_features(sink, schema, self.features))
    }

    /// Reader over a sheet of a file.
    pub fn reader_for<'s>(
        &self,
        path: impl AsRef<Path>,
        sheet: impl Into<SheetRef>,
        schema: &'s GridSchema,
    ) -> Result<RecordReader<'s, P::Source>> {
        self.create_reader(SheetInput::file(path.as_ref()).sheet(sheet), schema)
    }

    /// Writer creating a file.
    pub fn writer_for<'s>(
        &self,
        path: impl AsRef<Path>,
        sheet: Option<&str>,
        schema: &'s GridSchema,
    ) -> Result<RecordWriter<'s, P::Sink>> {
        let mut output = SheetOutput::file(path.as_ref());
        output.sheet = sheet.map(str::to_string);
        self.create_writer(output, schema)
    }
}
