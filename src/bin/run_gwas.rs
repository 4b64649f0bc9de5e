// ==============================================================================
// run_gwas.rs - GWAS Entry Point
// ==============================================================================
// Description: Linear-regression GWAS with sample/variant QC and ancestry PCs
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use gwas_qc::gwas::{
    GwasConfig, GwasRunner, DEFAULT_CALL_RATE_THRESHOLD, DEFAULT_GENOME_BUILD_OUTPUT, DEFAULT_ID_COLUMN,
    DEFAULT_MAF_THRESHOLD, DEFAULT_OUTPUT, DEFAULT_PCA_COMPONENTS,
};
use gwas_qc::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a linear-regression GWAS", long_about = None)]
struct Args {
    /// Genotype VCF (plain, gzip or BGZF)
    #[arg(long, visible_alias = "vcf")]
    hail: PathBuf,

    /// Tab-delimited phenotype file with a header row
    #[arg(long)]
    phe: PathBuf,

    /// Sample ID column in the phenotype file
    #[arg(long = "id-col", default_value = DEFAULT_ID_COLUMN)]
    id_col: String,

    /// Response variable column
    #[arg(long)]
    response: String,

    /// Comma-separated covariate columns
    #[arg(long, value_delimiter = ',')]
    cov: Vec<String>,

    /// Number of principal components to include as covariates
    #[arg(long, default_value_t = DEFAULT_PCA_COMPONENTS)]
    pca: usize,

    /// Minimum sample call rate
    #[arg(long = "call-rate-thr", default_value_t = DEFAULT_CALL_RATE_THRESHOLD)]
    call_rate_thr: f64,

    /// Variants need an alternate allele frequency above this value
    #[arg(long = "maf-thr", default_value_t = DEFAULT_MAF_THRESHOLD)]
    maf_thr: f64,

    /// Output path of the results table
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Output path of the genome build name
    #[arg(long = "genome-build-out", default_value = DEFAULT_GENOME_BUILD_OUTPUT)]
    genome_build_out: PathBuf,

    /// Reference genome name (defaults to the build named in the VCF header)
    #[arg(long = "reference-genome")]
    reference_genome: Option<String>,
}

impl Args {
    fn into_config(self) -> GwasConfig {
        // `--cov ""` means no covariates
        let covariates = if self.cov.len() == 1 && self.cov[0].is_empty() {
            Vec::new()
        } else {
            self.cov
        };

        GwasConfig {
            genotypes: self.hail,
            phenotypes: self.phe,
            id_column: self.id_col,
            response: self.response,
            covariates,
            pca_components: self.pca,
            call_rate_threshold: self.call_rate_thr,
            maf_threshold: self.maf_thr,
            output: self.output,
            genome_build_output: self.genome_build_out,
            reference_genome: self.reference_genome,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(env!("CARGO_CRATE_NAME"));

    info!("GWAS starting...");

    let config = args.into_config();
    let output = config.output.clone();
    let summary = GwasRunner::new(config)?.run()?;

    info!(
        "Done: {} variants tested over {} samples",
        summary.variants, summary.samples
    );
    println!("\nYour GWAS results have been written to {}", output.display());

    Ok(())
}
