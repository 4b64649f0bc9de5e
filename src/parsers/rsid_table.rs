// ==============================================================================
// parsers/rsid_table.rs - rsID Lookup Table Parser
// ==============================================================================
// Description: Parser for the tab-delimited chr/pos/c1/c2/rsid lookup table
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Format: TSV with header, extra columns ignored
// Example:
//   chr    pos      c1    c2    rsid
//   1      10177    A     AC    rs367896724
//   1      10352    T     TA    rs555500075
// ==============================================================================

use csv::ReaderBuilder;
use std::path::Path;
use thiserror::Error;

use crate::models::RsidLookupRecord;

/// Columns that must appear in the lookup header
pub const REQUIRED_COLUMNS: [&str; 5] = ["chr", "pos", "c1", "c2", "rsid"];

/// Errors that can occur while reading the lookup table
#[derive(Error, Debug)]
pub enum RsidTableError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Lookup table is missing required column '{0}'")]
    MissingColumn(String),
}

/// Reader for the rsID lookup table
pub struct RsidTableParser;

impl RsidTableParser {
    /// Parse every lookup row, preserving file order
    ///
    /// File order matters: when several rows share a CPRA key the joiner keeps
    /// the first one.
    pub fn parse(path: impl AsRef<Path>) -> Result<Vec<RsidLookupRecord>, RsidTableError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(RsidTableError::MissingColumn(column.to_string()));
            }
        }

        let mut records = Vec::new();
        for result in reader.deserialize() {
            let record: RsidLookupRecord = result?;
            records.push(record);
        }

        Ok(records)
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
    fn test_parse_lookup_table() {
        let file = create_test_file("chr\tpos\tc1\tc2\trsid\n1\t100\tA\tG\trs1\n2\t200\tC\tT\trs2\n");

        let records = RsidTableParser::parse(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chrom, "1");
        assert_eq!(records[0].pos, "100");
        assert_eq!(records[0].allele1, "A");
        assert_eq!(records[0].allele2, "G");
        assert_eq!(records[0].rsid, "rs1");
        assert_eq!(records[1].rsid, "rs2");
    }

    #[test]
    fn test_extra_columns_and_order_ignored() {
        let file = create_test_file("rsid\tqual\tc2\tc1\tpos\tchr\nrs9\t0.9\tT\tC\t55\tX\n");

        let records = RsidTableParser::parse(file.path()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cpra().as_str(), "X-55-C-T");
    }

    #[test]
    fn test_missing_column() {
        let file = create_test_file("chr\tpos\tc1\trsid\n1\t100\tA\trs1\n");

        match RsidTableParser::parse(file.path()).unwrap_err() {
            RsidTableError::MissingColumn(name) => assert_eq!(name, "c2"),
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let file = create_test_file("chr\tpos\tc1\tc2\trsid\n");
        assert!(RsidTableParser::parse(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = RsidTableParser::parse("/nonexistent/rsid_cpra_table.tsv");
        assert!(result.is_err());
    }
}
