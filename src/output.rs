// ==============================================================================
// output.rs - Delimited Table Output
// ==============================================================================
// Description: Writers for the mapping file, sample list, GWAS table and
//              genome build side file
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Text written for a missing value
pub const MISSING: &str = "NA";

/// Field delimiter of an output table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Space,
    Tab,
}

impl Delimiter {
    fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Space => b' ',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Row-by-row writer for a delimited output table
pub struct TableWriter {
    path: PathBuf,
    writer: Writer<File>,
    rows: usize,
}

impl TableWriter {
    /// Create (or truncate) `path`
    pub fn create(path: impl AsRef<Path>, delimiter: Delimiter) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = WriterBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create output file {:?}", path))?;

        Ok(Self { path, writer, rows: 0 })
    }

    /// Write the header row (not counted as a data row)
    pub fn write_header<I, T>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(columns)
            .with_context(|| format!("Failed to write header to {:?}", self.path))
    }

    pub fn write_row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(fields)
            .with_context(|| format!("Failed to write row to {:?}", self.path))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush to disk and return the number of data rows written
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path))?;
        debug!("Wrote {} rows to {:?}", self.rows, self.path);
        Ok(self.rows)
    }
}

/// Write `contents` verbatim (no trailing newline added)
pub fn write_text_file(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

/// Render a float the way the results table expects
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        value.to_string()
    }
}
