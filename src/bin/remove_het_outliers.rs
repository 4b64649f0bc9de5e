// ==============================================================================
// remove_het_outliers.rs - Heterozygosity Filter Entry Point
// ==============================================================================
// Description: Writes the FID/IID pairs of samples within S standard
//              deviations of the mean inbreeding coefficient
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use gwas_qc::het_filter::{HetFilterConfig, HetOutlierFilter, DEFAULT_OUTPUT, DEFAULT_SD};
use gwas_qc::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Remove heterozygosity-rate outlier samples", long_about = None)]
struct Args {
    /// plink --het report
    #[arg(long = "plink_het")]
    plink_het: PathBuf,

    /// Number of standard deviations from the mean to keep
    #[arg(long, default_value_t = DEFAULT_SD, allow_negative_numbers = true)]
    sd: f64,

    /// Output path of the passing FID/IID list
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(env!("CARGO_CRATE_NAME"));

    info!("Heterozygosity outlier removal starting...");

    let passing = HetOutlierFilter::new(HetFilterConfig {
        het_file: args.plink_het,
        sd: args.sd,
        output: args.output,
    })?
    .run()?;

    info!("Done: {} samples retained", passing.len());

    Ok(())
}
