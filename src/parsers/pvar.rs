// ==============================================================================
// parsers/pvar.rs - Variant Table Parser
// ==============================================================================
// Description: Parser for headerless .pvar/.bim-style variant tables
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Format: Tab-delimited, positional columns CHROM POS ID REF ALT
// Example:
//   1    10177    1:10177:A:AC    A    AC
//   1    10352    1:10352:T:TA    T    TA
// Lines starting with '#' (plink2 header/comment lines) are skipped.
// ==============================================================================

use csv::ReaderBuilder;
use std::path::Path;
use thiserror::Error;

use crate::models::VariantRecord;

const EXPECTED_COLUMNS: usize = 5;

/// Errors that can occur while reading a variant table
#[derive(Error, Debug)]
pub enum PvarParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid line format at line {line}: expected at least 5 tab-delimited fields, found {found}")]
    TooFewColumns { line: u64, found: usize },
}

/// Reader for variant tables
pub struct PvarParser;

impl PvarParser {
    /// Parse all variant rows in file order
    ///
    /// Only the first five columns are read; anything after them is ignored.
    pub fn parse(path: impl AsRef<Path>) -> Result<Vec<VariantRecord>, PvarParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_path(path.as_ref())?;

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;

            if row.len() < EXPECTED_COLUMNS {
                let line = row.position().map(|p| p.line()).unwrap_or_default();
                return Err(PvarParseError::TooFewColumns {
                    line,
                    found: row.len(),
                });
            }

            records.push(VariantRecord {
                chrom: row[0].to_string(),
                pos: row[1].to_string(),
                id: row[2].to_string(),
                ref_allele: row[3].to_string(),
                alt_allele: row[4].to_string(),
            });
        }

        Ok(records)
    }
}
