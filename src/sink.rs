//! Sinks for measurement and statistics rows
//!
//! Both reports are flat tables. `CsvSink` writes them as delimited files with a
//! header row, `JsonLinesSink` as one JSON object per line.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;

/// A row type with a fixed column layout and a report it belongs to
pub trait Tabular: Serialize {
    /// Base file name of the report, without extension
    const REPORT_NAME: &'static str;
    /// Column names in serialization order
    const COLUMNS: &'static [&'static str];
}

/// Destination for report rows
pub trait RowSink<R> {
    fn write_row(&mut self, row: &R) -> Result<()>;

    fn write_rows(&mut self, rows: &[R]) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()>;
}

/// On-disk format of the reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    JsonLines,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::JsonLines => "jsonl",
        }
    }
}

/// Create `<dir>/<report name>.<ext>` and return a sink writing into it
pub fn open_report<R>(output_dir: &Path, format: ReportFormat) -> Result<Box<dyn RowSink<R>>>
where
    R: Tabular + 'static,
{
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let path = output_dir.join(format!("{}.{}", R::REPORT_NAME, format.extension()));
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);

    let sink: Box<dyn RowSink<R>> = match format {
        ReportFormat::Csv => Box::new(CsvSink::<_, R>::new(writer)?),
        ReportFormat::JsonLines => Box::new(JsonLinesSink::new(writer)),
    };
    Ok(sink)
}

/// Writes rows as CSV, header first
pub struct CsvSink<W: Write, R> {
    writer: csv::Writer<W>,
    _row: PhantomData<fn(&R)>,
}

impl<W: Write, R: Tabular> CsvSink<W, R> {
    /// Wrap a writer; the header row is written immediately so that an empty
    /// report still names its columns
    pub fn new(writer: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer
            .write_record(R::COLUMNS)
            .context("Failed to write CSV header")?;

        Ok(CsvSink {
            writer,
            _row: PhantomData,
        })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))
    }
}

impl<W: Write, R: Tabular> RowSink<R> for CsvSink<W, R> {
    fn write_row(&mut self, row: &R) -> Result<()> {
        self.writer.serialize(row).context("Failed to write CSV row")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV writer")
    }
}

/// Writes rows as newline-delimited JSON
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write, R: Serialize> RowSink<R> for JsonLinesSink<W> {
    fn write_row(&mut self, row: &R) -> Result<()> {
        let json = serde_json::to_string(row).context("Failed to serialize row")?;
        writeln!(self.writer, "{}", json).context("Failed to write row")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
