// ==============================================================================
// joiner.rs - Variant ID to rsID Annotation
// ==============================================================================
// Description: Inner-joins a .pvar/.bim variant table with an rsID lookup table
//              on the CPRA key and writes a plink2 ID-remap file
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Join semantics:
//   - key = chrom-pos-allele1-allele2 (literal text, no normalization)
//   - output order follows the variant table
//   - several lookup rows for one key: first lookup row wins
//   - several output rows for one variant ID: first one wins
//   - unmatched variants are dropped silently
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::models::{Cpra, IdMapping, RsidLookupRecord, VariantRecord};
use crate::output::{Delimiter, TableWriter};
use crate::parsers::{PvarParser, RsidTableParser};

/// File name the original pipeline step expects
pub const DEFAULT_OUTPUT: &str = "output_var_conv.tsv";

/// Inputs and output of one annotation run
#[derive(Debug, Clone)]
pub struct JoinerConfig {
    pub rsid_table: PathBuf,
    pub pvar_file: PathBuf,
    pub output: PathBuf,
}

/// Counts reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSummary {
    pub lookup_rows: usize,
    pub variant_rows: usize,
    pub written: usize,
}

/// Join variants to rsIDs
///
/// Pure function over already-loaded tables; see the module header for the
/// tie-breaking rules.
pub fn join_rsids(lookup: &[RsidLookupRecord], variants: &[VariantRecord]) -> Vec<IdMapping> {
    let mut by_key: HashMap<Cpra, &str> = HashMap::with_capacity(lookup.len());
    for record in lookup {
        by_key.entry(record.cpra()).or_insert(record.rsid.as_str());
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut mappings = Vec::new();
    let mut unmatched = 0usize;

    for variant in variants {
        let Some(rsid) = by_key.get(&variant.cpra()) else {
            unmatched += 1;
            continue;
        };

        if seen_ids.insert(variant.id.as_str()) {
            mappings.push(IdMapping {
                rsid: rsid.to_string(),
                variant_id: variant.id.clone(),
            });
        }
    }

    debug!("{} variants had no matching CPRA key", unmatched);
    mappings
}

/// rsID annotation tool
pub struct VariantIdJoiner {
    config: JoinerConfig,
}

impl VariantIdJoiner {
    pub fn new(config: JoinerConfig) -> Self {
        Self { config }
    }

    /// Load both tables, join them and write the mapping file
    pub fn run(&self) -> Result<JoinSummary> {
        info!("Reading rsID lookup table: {:?}", self.config.rsid_table);
        let lookup = RsidTableParser::parse(&self.config.rsid_table)
            .with_context(|| format!("Failed to read rsID lookup table {:?}", self.config.rsid_table))?;

        info!("Reading variant table: {:?}", self.config.pvar_file);
        let variants = PvarParser::parse(&self.config.pvar_file)
            .with_context(|| format!("Failed to read variant table {:?}", self.config.pvar_file))?;

        let mappings = join_rsids(&lookup, &variants);

        let mut writer = TableWriter::create(&self.config.output, Delimiter::Space)?;
        for mapping in &mappings {
            writer.write_row([mapping.rsid.as_str(), mapping.variant_id.as_str()])?;
        }
        let written = writer.finish()?;

        info!(
            "Annotated {} of {} variants using {} lookup rows -> {:?}",
            written,
            variants.len(),
            lookup.len(),
            self.config.output
        );

        Ok(JoinSummary {
            lookup_rows: lookup.len(),
            variant_rows: variants.len(),
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn lookup(chrom: &str, pos: &str, a1: &str, a2: &str, rsid: &str) -> RsidLookupRecord {
        RsidLookupRecord {
            chrom: chrom.to_string(),
            pos: pos.to_string(),
            allele1: a1.to_string(),
            allele2: a2.to_string(),
            rsid: rsid.to_string(),
        }
    }

    fn variant(chrom: &str, pos: &str, id: &str, ref_allele: &str, alt_allele: &str) -> VariantRecord {
        VariantRecord {
            chrom: chrom.to_string(),
            pos: pos.to_string(),
            id: id.to_string(),
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
        }
    }

    #[test]
    fn test_join_single_match() {
        let mappings = join_rsids(
            &[lookup("1", "100", "A", "G", "rs1")],
            &[variant("1", "100", "varX", "A", "G")],
        );

        assert_eq!(
            mappings,
            vec![IdMapping {
                rsid: "rs1".to_string(),
                variant_id: "varX".to_string()
            }]
        );
    }

    #[test]
    fn test_row_present_iff_exact_key_match() {
        let table = [
            lookup("1", "100", "A", "G", "rs1"),
            lookup("chr2", "200", "C", "T", "rs2"),
            lookup("3", "300", "G", "A", "rs3"),
        ];
        let variants = [
            variant("1", "100", "v1", "A", "G"),
            variant("2", "200", "v2", "C", "T"),    // chr prefix differs
            variant("3", "300", "v3", "A", "G"),    // alleles swapped
            variant("3", "0300", "v4", "G", "A"),   // textual position differs
            variant("4", "400", "v5", "T", "C"),    // absent
        ];

        let mappings = join_rsids(&table, &variants);

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].variant_id, "v1");
    }

    #[test]
    fn test_first_lookup_row_wins() {
        let table = [
            lookup("1", "100", "A", "G", "rs_first"),
            lookup("1", "100", "A", "G", "rs_second"),
        ];
        let mappings = join_rsids(&table, &[variant("1", "100", "varX", "A", "G")]);

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].rsid, "rs_first");
    }

    #[test]
    fn test_duplicate_variant_id_keeps_first() {
        let table = [
            lookup("1", "100", "A", "G", "rs1"),
            lookup("1", "200", "C", "T", "rs2"),
        ];
        let variants = [
            variant("1", "100", "dup", "A", "G"),
            variant("1", "200", "dup", "C", "T"),
        ];

        let mappings = join_rsids(&table, &variants);

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].rsid, "rs1");
    }

    #[test]
    fn test_output_follows_variant_order() {
        let table = [
            lookup("1", "300", "G", "A", "rs3"),
            lookup("1", "100", "A", "G", "rs1"),
        ];
        let variants = [
            variant("1", "100", "a", "A", "G"),
            variant("1", "300", "b", "G", "A"),
        ];

        let ids: Vec<_> = join_rsids(&table, &variants).into_iter().map(|m| m.rsid).collect();
        assert_eq!(ids, vec!["rs1", "rs3"]);
    }

    fn write_inputs(dir: &std::path::Path, table: &str, pvar: &str) -> JoinerConfig {
        let rsid_table = dir.join("rsid_cpra_table.tsv");
        let pvar_file = dir.join("plink.pvar");
        fs::write(&rsid_table, table).unwrap();
        fs::write(&pvar_file, pvar).unwrap();
        JoinerConfig {
            rsid_table,
            pvar_file,
            output: dir.join(DEFAULT_OUTPUT),
        }
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempdir().unwrap();
        let config = write_inputs(
            dir.path(),
            "chr\tpos\tc1\tc2\trsid\n1\t100\tA\tG\trs1\n",
            "1\t100\tvarX\tA\tG\n",
        );

        let summary = VariantIdJoiner::new(config.clone()).run().unwrap();

        assert_eq!(
            summary,
            JoinSummary {
                lookup_rows: 1,
                variant_rows: 1,
                written: 1
            }
        );
        assert_eq!(fs::read_to_string(&config.output).unwrap(), "rs1 varX\n");
    }

    #[test]
    fn test_run_no_matches_writes_empty_file() {
        let dir = tempdir().unwrap();
        let config = write_inputs(
            dir.path(),
            "chr\tpos\tc1\tc2\trsid\n1\t100\tA\tG\trs1\n",
            "2\t100\tvarX\tA\tG\n",
        );

        let summary = VariantIdJoiner::new(config.clone()).run().unwrap();

        assert_eq!(summary.written, 0);
        assert_eq!(fs::read_to_string(&config.output).unwrap(), "");
    }

    #[test]
    fn test_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = write_inputs(
            dir.path(),
            "chr\tpos\tc1\tc2\trsid\n1\t100\tA\tG\trs1\n1\t100\tA\tG\trs1b\n2\t5\tC\tT\trs2\n",
            "1\t100\tv1\tA\tG\n2\t5\tv2\tC\tT\n3\t9\tv3\tG\tC\n",
        );

        VariantIdJoiner::new(config.clone()).run().unwrap();
        let first = fs::read(&config.output).unwrap();
        VariantIdJoiner::new(config.clone()).run().unwrap();
        let second = fs::read(&config.output).unwrap();

        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap(), "rs1 v1\nrs2 v2\n");
    }

    #[test]
    fn test_run_missing_lookup_column_fails() {
        let dir = tempdir().unwrap();
        let config = write_inputs(dir.path(), "chr\tpos\tc1\trsid\n1\t100\tA\trs1\n", "1\t100\tvarX\tA\tG\n");

        let err = VariantIdJoiner::new(config.clone()).run().unwrap_err();
        assert!(format!("{:#}", err).contains("c2"));
        assert!(!config.output.exists());
    }
}
