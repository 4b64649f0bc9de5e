// ==============================================================================
// gwas/mod.rs - GWAS Runner
// ==============================================================================
// Description: Sample/variant QC, ancestry PCs and per-variant linear
//              regression of a phenotype on alternate-allele dosage
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Pipeline:
//   1. keep samples present in the phenotype table
//   2. drop samples with call rate < threshold (over all input variants)
//   3. split multi-allelic sites
//   4. drop variants with alt allele frequency <= threshold
//   5. optional HWE-normalized PCA
//   6. OLS per variant with covariates [intercept, covariates..., PCs...]
//   7. write the results table and the genome build side file
// ==============================================================================

pub mod backend;
pub mod results;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::genotype_matrix::GenotypeMatrix;
use crate::models::AssociationResult;
use crate::output::write_text_file;
use crate::parsers::{PhenotypeTable, VcfParser};

pub use backend::{CovariateColumn, NalgebraBackend, PcaResult, RegressionStats, StatsBackend, StatsError};

pub const DEFAULT_ID_COLUMN: &str = "IID";
pub const DEFAULT_PCA_COMPONENTS: usize = 3;
pub const DEFAULT_CALL_RATE_THRESHOLD: f64 = 0.97;
pub const DEFAULT_MAF_THRESHOLD: f64 = 0.01;
pub const DEFAULT_OUTPUT: &str = "output.tsv";
pub const DEFAULT_GENOME_BUILD_OUTPUT: &str = "genome_build";

/// Name given to the constant term in the covariate list
pub const INTERCEPT: &str = "intercept";

/// Parameters of one GWAS run
#[derive(Debug, Clone)]
pub struct GwasConfig {
    /// Genotype VCF (plain or gzip/BGZF)
    pub genotypes: PathBuf,
    /// Tab-delimited phenotype table
    pub phenotypes: PathBuf,
    pub id_column: String,
    pub response: String,
    pub covariates: Vec<String>,
    pub pca_components: usize,
    pub call_rate_threshold: f64,
    pub maf_threshold: f64,
    pub output: PathBuf,
    pub genome_build_output: PathBuf,
    /// Overrides the build detected from the VCF header
    pub reference_genome: Option<String>,
}

impl GwasConfig {
    /// Config with every optional parameter at its default
    pub fn new(genotypes: impl Into<PathBuf>, phenotypes: impl Into<PathBuf>, response: &str) -> Self {
        Self {
            genotypes: genotypes.into(),
            phenotypes: phenotypes.into(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            response: response.to_string(),
            covariates: Vec::new(),
            pca_components: DEFAULT_PCA_COMPONENTS,
            call_rate_threshold: DEFAULT_CALL_RATE_THRESHOLD,
            maf_threshold: DEFAULT_MAF_THRESHOLD,
            output: PathBuf::from(DEFAULT_OUTPUT),
            genome_build_output: PathBuf::from(DEFAULT_GENOME_BUILD_OUTPUT),
            reference_genome: None,
        }
    }

    /// Parameter checks that need no file access
    pub fn validate(&self) -> Result<()> {
        if self.response.is_empty() {
            anyhow::bail!("--response must name a phenotype column");
        }
        if self.covariates.iter().any(|c| c.trim().is_empty()) {
            anyhow::bail!("--cov contains an empty covariate name");
        }
        if !(0.0..=1.0).contains(&self.call_rate_threshold) {
            anyhow::bail!(
                "--call-rate-thr must be between 0 and 1, got {}",
                self.call_rate_threshold
            );
        }
        if !self.maf_threshold.is_finite() {
            anyhow::bail!("--maf-thr must be a finite number, got {}", self.maf_threshold);
        }
        Ok(())
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct GwasSummary {
    pub samples: usize,
    pub variants: usize,
    pub reference_genome: String,
    pub include_rsid: bool,
}

/// Samples whose call rate reaches the threshold (NaN never does)
pub fn call_rate_mask(call_rates: &[f64], threshold: f64) -> Vec<bool> {
    call_rates.iter().map(|&rate| rate >= threshold).collect()
}

/// Variants whose alt allele frequency is strictly above the threshold
pub fn allele_freq_mask(freqs: &[Option<f64>], threshold: f64) -> Vec<bool> {
    freqs.iter().map(|f| f.is_some_and(|af| af > threshold)).collect()
}

/// Build the regression covariates: intercept, then user covariates, then PCs
pub fn assemble_covariates(
    n_samples: usize,
    covariates: Vec<CovariateColumn>,
    pca: Option<&PcaResult>,
) -> Vec<CovariateColumn> {
    let n_pcs = pca.map(|p| p.n_components()).unwrap_or(0);
    let mut assembled = Vec::with_capacity(1 + covariates.len() + n_pcs);

    assembled.push(CovariateColumn {
        name: INTERCEPT.to_string(),
        values: vec![Some(1.0); n_samples],
    });
    assembled.extend(covariates);

    if let Some(pca) = pca {
        for idx in 0..pca.n_components() {
            assembled.push(CovariateColumn {
                name: format!("PC{}", idx),
                values: pca.component(idx).into_iter().map(Some).collect(),
            });
        }
    }

    assembled
}

/// GWAS pipeline driver
pub struct GwasRunner<B: StatsBackend = NalgebraBackend> {
    config: GwasConfig,
    backend: B,
}

impl GwasRunner<NalgebraBackend> {
    pub fn new(config: GwasConfig) -> Result<Self> {
        Self::with_backend(config, NalgebraBackend)
    }
}

impl<B: StatsBackend> GwasRunner<B> {
    pub fn with_backend(config: GwasConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    /// Run the whole pipeline; nothing is written unless every step succeeds
    pub fn run(&self) -> Result<GwasSummary> {
        let config = &self.config;

        info!("Reading phenotypes: {:?}", config.phenotypes);
        let phenotypes = PhenotypeTable::parse(&config.phenotypes, &config.id_column)
            .with_context(|| format!("Failed to read phenotype file {:?}", config.phenotypes))?;
        for column in std::iter::once(&config.response).chain(&config.covariates) {
            if !phenotypes.has_column(column) {
                anyhow::bail!("Phenotype file {:?} has no column '{}'", config.phenotypes, column);
            }
        }
        debug!("Phenotype table has {} distinct samples", phenotypes.sample_count());

        info!("Reading genotypes: {:?}", config.genotypes);
        let mut matrix = VcfParser::new()
            .with_reference_genome(config.reference_genome.clone())
            .parse(&config.genotypes)
            .with_context(|| format!("Failed to read genotype file {:?}", config.genotypes))?;
        info!(
            "Loaded {} samples x {} variants (reference {})",
            matrix.n_samples(),
            matrix.n_variants(),
            matrix.reference_genome
        );

        self.sample_qc(&mut matrix, &phenotypes);
        let mut matrix = matrix.split_multi();
        let freqs = self.variant_qc(&mut matrix);

        let response = phenotypes
            .numeric_values(&config.response, &matrix.sample_ids)
            .with_context(|| format!("Invalid response column '{}'", config.response))?;

        let mut user_covariates = Vec::with_capacity(config.covariates.len());
        for name in &config.covariates {
            let values = phenotypes
                .numeric_values(name, &matrix.sample_ids)
                .with_context(|| format!("Invalid covariate column '{}'", name))?;
            user_covariates.push(CovariateColumn {
                name: name.clone(),
                values,
            });
        }

        let pca = if config.pca_components > 0 {
            info!("Computing {} principal components", config.pca_components);
            let pca = self
                .backend
                .principal_components(&matrix, config.pca_components)
                .context("Principal component analysis failed")?;
            debug!("PCA eigenvalues: {:?}", pca.eigenvalues);
            Some(pca)
        } else {
            None
        };

        let covariates = assemble_covariates(matrix.n_samples(), user_covariates, pca.as_ref());
        debug!(
            "Covariates: {:?}",
            covariates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );

        let stats = self
            .backend
            .linear_regression_rows(&matrix, &response, &covariates)
            .context("Linear regression failed")?;

        let association = collect_results(&matrix, &freqs, &stats);
        let include_rsid = matrix.has_rsid_field;

        write_text_file(&config.genome_build_output, &matrix.reference_genome)?;
        let written = match results::write_results(&config.output, &association, include_rsid) {
            Ok(written) => written,
            Err(e) => {
                // No partial output
                let _ = std::fs::remove_file(&config.output);
                let _ = std::fs::remove_file(&config.genome_build_output);
                return Err(e);
            }
        };

        info!("Wrote {} association results -> {:?}", written, config.output);
        info!(
            "Genome build {} -> {:?}",
            matrix.reference_genome, config.genome_build_output
        );

        Ok(GwasSummary {
            samples: matrix.n_samples(),
            variants: written,
            reference_genome: matrix.reference_genome.clone(),
            include_rsid,
        })
    }

    /// Phenotype semi-join followed by the call-rate filter
    fn sample_qc(&self, matrix: &mut GenotypeMatrix, phenotypes: &PhenotypeTable) {
        let in_table: Vec<bool> = matrix
            .sample_ids
            .iter()
            .map(|id| phenotypes.contains_sample(id))
            .collect();
        let before = matrix.n_samples();
        matrix.retain_samples(&in_table);
        info!(
            "{} of {} genotyped samples have phenotypes",
            matrix.n_samples(),
            before
        );

        let keep = call_rate_mask(&matrix.sample_call_rates(), self.config.call_rate_threshold);
        let before = matrix.n_samples();
        matrix.retain_samples(&keep);
        info!(
            "Sample QC: {} of {} samples pass call rate >= {}",
            matrix.n_samples(),
            before,
            self.config.call_rate_threshold
        );
        if matrix.n_samples() == 0 {
            warn!("No samples left after sample QC");
        }
    }

    /// Allele-frequency filter; returns the frequencies of the kept variants
    fn variant_qc(&self, matrix: &mut GenotypeMatrix) -> Vec<f64> {
        let freqs = matrix.alt_allele_freqs();
        let keep = allele_freq_mask(&freqs, self.config.maf_threshold);
        let before = matrix.n_variants();
        matrix.retain_variants(&keep);
        info!(
            "Variant QC: {} of {} biallelic variants pass alt allele frequency > {}",
            matrix.n_variants(),
            before,
            self.config.maf_threshold
        );

        freqs
            .into_iter()
            .zip(keep)
            .filter_map(|(f, k)| if k { f } else { None })
            .collect()
    }
}

fn collect_results(matrix: &GenotypeMatrix, freqs: &[f64], stats: &[RegressionStats]) -> Vec<AssociationResult> {
    matrix
        .variants
        .iter()
        .zip(freqs)
        .zip(stats)
        .map(|((site, &alt_allele_freq), s)| AssociationResult {
            rsid: site.rsid.clone(),
            chrom: site.contig.clone(),
            pos: site.position,
            ref_allele: site.ref_allele().to_string(),
            alt_allele: site.alt_allele().unwrap_or_default().to_string(),
            alt_allele_freq,
            n: s.n,
            beta: s.beta,
            standard_error: s.standard_error,
            t_stat: s.t_stat,
            p_value: s.p_value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const PHENOTYPES: &str = "\
IID\tpheno\tage\tsite
s1\t1.2\t30\tnorth
s2\t2.3\t41\tsouth
s3\t3.1\t35\tnorth
s4\t2.0\t50\tsouth
s5\t0.9\t28\tnorth
s6\t3.5\t33\tsouth
";

    const SAMPLES: [&str; 7] = ["s1", "s2", "s3", "s4", "s5", "s6", "s7"];

    fn vcf(records: &[(&str, &str, &str, &str, &str, [&str; 7])]) -> String {
        let mut text = String::from("##fileformat=VCFv4.2\n##contig=<ID=1,assembly=GRCh38>\n");
        text.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t");
        text.push_str(&SAMPLES.join("\t"));
        text.push('\n');
        for (chrom, pos, id, ref_allele, alt, gts) in records {
            let fixed = [*chrom, *pos, *id, *ref_allele, *alt, ".", "PASS", ".", "GT"];
            text.push_str(&fixed.join("\t"));
            text.push('\t');
            text.push_str(&gts.join("\t"));
            text.push('\n');
        }
        text
    }

    fn default_vcf() -> String {
        vcf(&[
            ("1", "100", "rs1", "A", "G", ["0/0", "0/1", "1/1", "0/1", "0/0", "1/1", "0/1"]),
            ("1", "200", ".", "C", "T", ["0/1", "0/0", "0/1", "1/1", "0/1", "0/0", "./."]),
            ("1", "300", "rs3", "G", "A,C", ["1/2", "0/0", "0/1", "0/2", "0/0", "1/1", "0/0"]),
            ("1", "400", "rs4", "T", "C", ["0/0", "0/0", "0/0", "0/0", "0/0", "0/0", "0/0"]),
        ])
    }

    fn setup(dir: &Path, vcf_text: &str) -> GwasConfig {
        let genotypes = dir.join("genotypes.vcf");
        let phenotypes = dir.join("phenotypes.tsv");
        fs::write(&genotypes, vcf_text).unwrap();
        fs::write(&phenotypes, PHENOTYPES).unwrap();

        let mut config = GwasConfig::new(genotypes, phenotypes, "pheno");
        config.pca_components = 0;
        config.output = dir.join(DEFAULT_OUTPUT);
        config.genome_build_output = dir.join(DEFAULT_GENOME_BUILD_OUTPUT);
        config
    }

    fn read_table(path: &Path) -> Vec<Vec<String>> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.split('\t').map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_covariate_order() {
        let pca = PcaResult {
            eigenvalues: vec![2.0, 1.0],
            scores: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        };
        let user = vec![
            CovariateColumn {
                name: "age".to_string(),
                values: vec![Some(30.0), Some(40.0)],
            },
            CovariateColumn {
                name: "sex".to_string(),
                values: vec![Some(0.0), Some(1.0)],
            },
        ];

        let assembled = assemble_covariates(2, user, Some(&pca));

        let names: Vec<&str> = assembled.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["intercept", "age", "sex", "PC0", "PC1"]);

        // Sample 1: [1.0, 40, 1, 0.3, 0.4]
        let sample1: Vec<Option<f64>> = assembled.iter().map(|c| c.values[1]).collect();
        assert_eq!(
            sample1,
            vec![Some(1.0), Some(40.0), Some(1.0), Some(0.3), Some(0.4)]
        );
    }

    #[test]
    fn test_covariates_without_user_columns_or_pcs() {
        let assembled = assemble_covariates(3, Vec::new(), None);
        assert_eq!(assembled.len(), 1);
        assert_eq!(assembled[0].values, vec![Some(1.0); 3]);
    }

    #[test]
    fn test_threshold_masks_are_exact() {
        assert_eq!(
            call_rate_mask(&[0.97, 0.969, 1.0, f64::NAN], 0.97),
            vec![true, false, true, false]
        );
        assert_eq!(
            allele_freq_mask(&[Some(0.01), Some(0.0101), None, Some(0.5)], 0.01),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let mut config = GwasConfig::new("g.vcf", "p.tsv", "pheno");
        assert!(config.validate().is_ok());

        config.call_rate_threshold = 1.5;
        assert!(config.validate().is_err());

        config.call_rate_threshold = 0.97;
        config.covariates = vec!["age".to_string(), "".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_end_to_end_with_rsid() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &default_vcf());
        config.covariates = vec!["age".to_string()];

        let summary = GwasRunner::new(config.clone()).unwrap().run().unwrap();

        // s7 has no phenotype; rs4 is monomorphic; rs3 splits in two
        assert_eq!(summary.samples, 6);
        assert_eq!(summary.variants, 4);
        assert!(summary.include_rsid);
        assert_eq!(summary.reference_genome, "GRCh38");

        let table = read_table(&config.output);
        assert_eq!(table.len(), 5);
        assert_eq!(table[0][0], "rsid");
        assert_eq!(table[0].len(), 11);

        let ids: Vec<&str> = table[1..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["rs1", "NA", "rs3", "rs3"]);

        let alts: Vec<&str> = table[1..].iter().map(|r| r[4].as_str()).collect();
        assert_eq!(alts, vec!["G", "T", "A", "C"]);

        // alt allele frequency of the G>C split: 2 of 12 alleles
        let af: f64 = table[4][5].parse().unwrap();
        assert_relative_eq!(af, 2.0 / 12.0);
        assert!(table[1..].iter().all(|r| r[6] == "6"));

        assert_eq!(fs::read_to_string(&config.genome_build_output).unwrap(), "GRCh38");
    }

    #[test]
    fn test_run_without_rsid_field() {
        let dir = tempdir().unwrap();
        let config = setup(
            dir.path(),
            &vcf(&[
                ("1", "100", ".", "A", "G", ["0/0", "0/1", "1/1", "0/1", "0/0", "1/1", "0/1"]),
                ("1", "200", ".", "C", "T", ["0/1", "0/0", "0/1", "1/1", "0/1", "0/0", "0/0"]),
            ]),
        );

        let summary = GwasRunner::new(config.clone()).unwrap().run().unwrap();
        assert!(!summary.include_rsid);

        let table = read_table(&config.output);
        assert_eq!(table[0][0], "chrom");
        assert_eq!(table[0].len(), 10);
        assert_eq!(table[1][0], "1");
    }

    #[test]
    fn test_reference_genome_override() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &default_vcf());
        config.reference_genome = Some("GRCh37".to_string());

        GwasRunner::new(config.clone()).unwrap().run().unwrap();
        assert_eq!(fs::read_to_string(&config.genome_build_output).unwrap(), "GRCh37");
    }

    #[test]
    fn test_call_rate_threshold_is_inclusive() {
        // s2 misses one of four input calls: call rate 0.75
        let text = vcf(&[
            ("1", "100", "rs1", "A", "G", ["0/0", "0/1", "1/1", "0/1", "0/0", "1/1", "0/1"]),
            ("1", "200", "rs2", "C", "T", ["0/1", "./.", "0/1", "1/1", "0/1", "0/0", "0/0"]),
            ("1", "300", "rs3", "G", "A", ["0/1", "0/0", "0/1", "0/0", "0/0", "1/1", "0/0"]),
            ("1", "400", "rs4", "T", "C", ["0/0", "0/1", "0/0", "0/1", "0/0", "0/0", "0/0"]),
        ]);

        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &text);

        config.call_rate_threshold = 0.75;
        assert_eq!(GwasRunner::new(config.clone()).unwrap().run().unwrap().samples, 6);

        config.call_rate_threshold = 0.8;
        assert_eq!(GwasRunner::new(config.clone()).unwrap().run().unwrap().samples, 5);
    }

    #[test]
    fn test_run_with_principal_components() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &default_vcf());
        config.pca_components = 1;

        let summary = GwasRunner::new(config.clone()).unwrap().run().unwrap();
        assert_eq!(summary.variants, 4);

        let table = read_table(&config.output);
        assert!(table[1..].iter().all(|r| r[6] == "6"));
    }

    #[test]
    fn test_missing_covariate_column_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &default_vcf());
        config.covariates = vec!["height".to_string()];

        let err = GwasRunner::new(config.clone()).unwrap().run().unwrap_err();

        assert!(err.to_string().contains("height"));
        assert!(!config.output.exists());
        assert!(!config.genome_build_output.exists());
    }

    #[test]
    fn test_failed_output_write_leaves_no_files() {
        let dir = tempdir().unwrap();

        // Results cannot be created: the build file already written is removed
        let mut config = setup(dir.path(), &default_vcf());
        config.output = dir.path().join("missing_dir").join(DEFAULT_OUTPUT);
        assert!(GwasRunner::new(config.clone()).unwrap().run().is_err());
        assert!(!config.output.exists());
        assert!(!config.genome_build_output.exists());

        // Build file cannot be created: results are never written
        let mut config = setup(dir.path(), &default_vcf());
        config.genome_build_output = dir.path().join("missing_dir").join(DEFAULT_GENOME_BUILD_OUTPUT);
        assert!(GwasRunner::new(config.clone()).unwrap().run().is_err());
        assert!(!config.output.exists());
        assert!(!config.genome_build_output.exists());
    }

    #[test]
    fn test_missing_response_column_fails() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &default_vcf());
        config.response = "bmi".to_string();

        assert!(GwasRunner::new(config.clone()).unwrap().run().is_err());
        assert!(!config.output.exists());
    }

    #[test]
    fn test_too_many_components_fails() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), &default_vcf());
        config.pca_components = 7;

        assert!(GwasRunner::new(config.clone()).unwrap().run().is_err());
        assert!(!config.output.exists());
    }
}
