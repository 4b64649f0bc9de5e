// ==============================================================================
// parsers/phenotype.rs - Phenotype Table Parser
// ==============================================================================
// Description: Parser for tab-delimited phenotype files keyed by a sample ID
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Format: TSV with header; one row per sample; "NA" or empty marks missing
// Example:
//   FID    IID      age    sex    height
//   f1     samp1    54     1      172.5
//   f2     samp2    NA     0      160.1
// ==============================================================================

use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during phenotype parsing or column lookup
#[derive(Error, Debug)]
pub enum PhenotypeParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Phenotype file is missing column '{0}'")]
    MissingColumn(String),

    #[error("Non-numeric value '{value}' in column '{column}' for sample '{sample}'")]
    InvalidValue {
        column: String,
        sample: String,
        value: String,
    },

    #[error("Sample '{0}' not present in phenotype file")]
    UnknownSample(String),
}

/// Phenotype table held as text, parsed to numbers per column on demand
///
/// Columns that are never used in the model may contain arbitrary text.
#[derive(Debug, Clone)]
pub struct PhenotypeTable {
    id_column: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Sample ID -> row index (first occurrence wins)
    index: HashMap<String, usize>,
}

impl PhenotypeTable {
    /// Parse a phenotype file keyed by `id_column`
    pub fn parse(path: impl AsRef<Path>, id_column: &str) -> Result<Self, PhenotypeParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path.as_ref())?;

        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let id_idx = columns
            .iter()
            .position(|c| c == id_column)
            .ok_or_else(|| PhenotypeParseError::MissingColumn(id_column.to_string()))?;

        let mut rows = Vec::new();
        let mut index = HashMap::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            let sample_id = row[id_idx].clone();

            if index.contains_key(&sample_id) {
                warn!("Duplicate sample '{}' in phenotype file, keeping first row", sample_id);
            } else {
                index.insert(sample_id, rows.len());
            }
            rows.push(row);
        }

        Ok(Self {
            id_column: id_column.to_string(),
            columns,
            rows,
            index,
        })
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn contains_sample(&self, sample_id: &str) -> bool {
        self.index.contains_key(sample_id)
    }

    /// Number of distinct sample IDs
    pub fn sample_count(&self) -> usize {
        self.index.len()
    }

    /// Numeric values of `column` for `samples`, in the order given
    ///
    /// `NA` and empty cells are None; `true`/`false` map to 1.0/0.0.
    pub fn numeric_values(
        &self,
        column: &str,
        samples: &[String],
    ) -> Result<Vec<Option<f64>>, PhenotypeParseError> {
        let col_idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PhenotypeParseError::MissingColumn(column.to_string()))?;

        samples
            .iter()
            .map(|sample| {
                let row_idx = *self
                    .index
                    .get(sample)
                    .ok_or_else(|| PhenotypeParseError::UnknownSample(sample.clone()))?;
                let raw = self.rows[row_idx][col_idx].as_str();
                parse_numeric(raw).ok_or_else(|| PhenotypeParseError::InvalidValue {
                    column: column.to_string(),
                    sample: sample.clone(),
                    value: raw.to_string(),
                })
            })
            .collect()
    }
}

/// Parse one cell; outer None means the cell is not numeric at all
fn parse_numeric(raw: &str) -> Option<Option<f64>> {
    let value = raw.trim();
    match value {
        "" | "NA" => Some(None),
        "true" | "True" | "TRUE" => Some(Some(1.0)),
        "false" | "False" | "FALSE" => Some(Some(0.0)),
        _ => value.parse::<f64>().ok().map(|v| if v.is_nan() { None } else { Some(v) }),
    }
}
