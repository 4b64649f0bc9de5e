// ==============================================================================
// gwas/results.rs - Association Results Table
// ==============================================================================
// Description: Column selection and tab-delimited output of GWAS results
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use anyhow::Result;
use std::path::Path;

use crate::models::AssociationResult;
use crate::output::{format_float, Delimiter, TableWriter, MISSING};

pub const RSID_COLUMN: &str = "rsid";

/// Columns always present, in output order
pub const RESULT_COLUMNS: [&str; 10] = [
    "chrom",
    "pos",
    "ref",
    "alt",
    "alt_allele_freq",
    "n",
    "beta",
    "standard_error",
    "t_stat",
    "p_value",
];

/// Output header; `rsid` leads only when the genotypes carried IDs
pub fn header(include_rsid: bool) -> Vec<&'static str> {
    let mut columns = Vec::with_capacity(RESULT_COLUMNS.len() + 1);
    if include_rsid {
        columns.push(RSID_COLUMN);
    }
    columns.extend(RESULT_COLUMNS);
    columns
}

fn row(result: &AssociationResult, include_rsid: bool) -> Vec<String> {
    let mut fields = Vec::with_capacity(RESULT_COLUMNS.len() + 1);
    if include_rsid {
        fields.push(result.rsid.clone().unwrap_or_else(|| MISSING.to_string()));
    }
    fields.extend([
        result.chrom.clone(),
        result.pos.to_string(),
        result.ref_allele.clone(),
        result.alt_allele.clone(),
        format_float(result.alt_allele_freq),
        result.n.to_string(),
        format_float(result.beta),
        format_float(result.standard_error),
        format_float(result.t_stat),
        format_float(result.p_value),
    ]);
    fields
}

/// Write the results table, returning the number of data rows
pub fn write_results(
    path: impl AsRef<Path>,
    results: &[AssociationResult],
    include_rsid: bool,
) -> Result<usize> {
    let mut writer = TableWriter::create(path, Delimiter::Tab)?;
    writer.write_header(header(include_rsid))?;
    for result in results {
        writer.write_row(row(result, include_rsid))?;
    }
    writer.finish()
}
