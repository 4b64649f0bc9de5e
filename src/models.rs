// ==============================================================================
// models.rs - Tabular Record Models
// ==============================================================================
// Description: Row types shared by the rsID joiner, het filter and GWAS runner
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use serde::Deserialize;

/// Separator between the four CPRA components
pub const CPRA_SEPARATOR: char = '-';

/// Composite chromosome-position-ref-alt key
///
/// Keys compare by exact string equality. No normalization is applied, so
/// `1-100-A-G` and `chr1-100-A-G` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cpra(String);

impl Cpra {
    pub fn new(chrom: &str, pos: &str, allele1: &str, allele2: &str) -> Self {
        let mut key = String::with_capacity(
            chrom.len() + pos.len() + allele1.len() + allele2.len() + 3,
        );
        for (idx, part) in [chrom, pos, allele1, allele2].iter().enumerate() {
            if idx > 0 {
                key.push(CPRA_SEPARATOR);
            }
            key.push_str(part);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Row of a `.pvar`/`.bim`-style variant table (first five columns)
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    pub chrom: String,
    pub pos: String,
    /// Native variant ID assigned by the genotype-calling tool
    pub id: String,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl VariantRecord {
    pub fn cpra(&self) -> Cpra {
        Cpra::new(&self.chrom, &self.pos, &self.ref_allele, &self.alt_allele)
    }
}

/// Row of the rsID lookup table
///
/// Fields are kept as text: the join key is built from the literal strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RsidLookupRecord {
    #[serde(rename = "chr")]
    pub chrom: String,

    pub pos: String,

    #[serde(rename = "c1")]
    pub allele1: String,

    #[serde(rename = "c2")]
    pub allele2: String,

    pub rsid: String,
}

impl RsidLookupRecord {
    pub fn cpra(&self) -> Cpra {
        Cpra::new(&self.chrom, &self.pos, &self.allele1, &self.allele2)
    }
}

/// Output row of the joiner: written as `rsid id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    pub rsid: String,
    pub variant_id: String,
}

/// Per-sample row of a `plink --het` report
#[derive(Debug, Clone, PartialEq)]
pub struct HetRecord {
    pub fid: String,
    pub iid: String,
    /// Inbreeding coefficient; None when plink reported nan/NA
    pub f: Option<f64>,
}

/// Sample identifier pair written by the het filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleKey {
    pub fid: String,
    pub iid: String,
}

impl From<&HetRecord> for SampleKey {
    fn from(record: &HetRecord) -> Self {
        Self {
            fid: record.fid.clone(),
            iid: record.iid.clone(),
        }
    }
}

/// Per-variant association statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationResult {
    pub rsid: Option<String>,
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub alt_allele_freq: f64,
    pub n: usize,
    pub beta: f64,
    pub standard_error: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpra_is_literal_concatenation() {
        let key = Cpra::new("1", "100", "A", "G");
        assert_eq!(key.as_str(), "1-100-A-G");
        assert_ne!(key, Cpra::new("chr1", "100", "A", "G"));
    }

    #[test]
    fn test_variant_and_lookup_keys_match() {
        let variant = VariantRecord {
            chrom: "1".to_string(),
            pos: "100".to_string(),
            id: "varX".to_string(),
            ref_allele: "A".to_string(),
            alt_allele: "G".to_string(),
        };
        let lookup = RsidLookupRecord {
            chrom: "1".to_string(),
            pos: "100".to_string(),
            allele1: "A".to_string(),
            allele2: "G".to_string(),
            rsid: "rs1".to_string(),
        };
        assert_eq!(variant.cpra(), lookup.cpra());
    }

    #[test]
    fn test_swapped_alleles_do_not_match() {
        assert_ne!(Cpra::new("1", "100", "A", "G"), Cpra::new("1", "100", "G", "A"));
    }
}
