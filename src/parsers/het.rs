// ==============================================================================
// parsers/het.rs - PLINK Heterozygosity Report Parser
// ==============================================================================
// Description: Parser for `plink --het` output (.het files)
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Format: Whitespace-delimited (runs of spaces, leading padding) with header
// Example:
//    FID       IID       O(HOM)    E(HOM)    N(NM)            F
//   fam1      samp1      71842     7.1e+04    96000      0.03217
//   fam2      samp2      70011     7.1e+04    96000     -0.02415
// ==============================================================================

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::models::HetRecord;

/// Tokens plink and downstream tools use for a missing F value
const MISSING_VALUES: [&str; 5] = ["nan", "NaN", "NA", ".", "-nan"];

/// Errors that can occur during .het file parsing
#[derive(Error, Debug)]
pub enum HetParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Heterozygosity file is empty (no header line)")]
    EmptyFile,

    #[error("Heterozygosity file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Invalid line format at line {line}: expected {expected} fields, found {found}")]
    InvalidFormat {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid F value at line {line}: {value}")]
    InvalidValue { line: usize, value: String },
}

/// Parser for `plink --het` reports
pub struct HetParser;

impl HetParser {
    /// Parse a .het file into per-sample records
    ///
    /// Columns are located by header name, so any column layout that includes
    /// `FID`, `IID` and `F` is accepted.
    pub fn parse(path: impl AsRef<Path>) -> Result<Vec<HetRecord>, HetParseError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);

        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(HetParseError::EmptyFile),
            }
        };

        let columns: Vec<&str> = header.split_whitespace().collect();
        let fid_idx = Self::column_index(&columns, "FID")?;
        let iid_idx = Self::column_index(&columns, "IID")?;
        let f_idx = Self::column_index(&columns, "F")?;

        let mut records = Vec::new();
        for (idx, line) in lines {
            let line = line?;
            let line_number = idx + 1;

            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != columns.len() {
                return Err(HetParseError::InvalidFormat {
                    line: line_number,
                    expected: columns.len(),
                    found: fields.len(),
                });
            }

            records.push(HetRecord {
                fid: fields[fid_idx].to_string(),
                iid: fields[iid_idx].to_string(),
                f: Self::parse_f(fields[f_idx], line_number)?,
            });
        }

        Ok(records)
    }

    fn column_index(columns: &[&str], name: &str) -> Result<usize, HetParseError> {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| HetParseError::MissingColumn(name.to_string()))
    }

    fn parse_f(value: &str, line_number: usize) -> Result<Option<f64>, HetParseError> {
        if MISSING_VALUES.contains(&value) {
            return Ok(None);
        }

        let f = value.parse::<f64>().map_err(|_| HetParseError::InvalidValue {
            line: line_number,
            value: value.to_string(),
        })?;

        Ok(if f.is_nan() { None } else { Some(f) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_plink_layout() {
        let contents = "\
    FID       IID       O(HOM)       E(HOM)        N(NM)            F
   fam1     samp1        71842    7.113e+04        96000      0.03217
   fam2     samp2        70011    7.113e+04        96000     -0.02415
";
        let file = create_test_file(contents);

        let records = HetParser::parse(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fid, "fam1");
        assert_eq!(records[0].iid, "samp1");
        assert_eq!(records[0].f, Some(0.03217));
        assert_eq!(records[1].f, Some(-0.02415));
    }

    #[test]
    fn test_tab_delimited_and_missing_f() {
        let file = create_test_file("FID\tIID\tF\nf1\ts1\tnan\nf2\ts2\tNA\nf3\ts3\t0.1\n");

        let records = HetParser::parse(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].f, None);
        assert_eq!(records[1].f, None);
        assert_eq!(records[2].f, Some(0.1));
    }

    #[test]
    fn test_missing_f_column() {
        let file = create_test_file("FID IID O(HOM)\nf1 s1 10\n");

        match HetParser::parse(file.path()).unwrap_err() {
            HetParseError::MissingColumn(name) => assert_eq!(name, "F"),
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_f_value() {
        let file = create_test_file("FID IID F\nf1 s1 0.2\nf2 s2 high\n");

        match HetParser::parse(file.path()).unwrap_err() {
            HetParseError::InvalidValue { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "high");
            }
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row() {
        let file = create_test_file("FID IID F\nf1 s1\n");

        match HetParser::parse(file.path()).unwrap_err() {
            HetParseError::InvalidFormat { line, expected, found } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file() {
        let file = create_test_file("\n\n");
        assert!(matches!(
            HetParser::parse(file.path()).unwrap_err(),
            HetParseError::EmptyFile
        ));
    }
}
