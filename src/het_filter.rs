// ==============================================================================
// het_filter.rs - Heterozygosity Outlier Removal
// ==============================================================================
// Description: Keeps samples whose inbreeding coefficient F lies within S
//              population standard deviations of the mean
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Algorithm:
//   1. mean  μ = Σ(F) / N           (over non-missing F)
//   2. sd    σ = sqrt(Σ(F - μ)² / N)  (population, divide by N)
//   3. keep  μ - S·σ <= F <= μ + S·σ  (inclusive, missing F never kept)
// ==============================================================================

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::models::{HetRecord, SampleKey};
use crate::output::{Delimiter, TableWriter};
use crate::parsers::HetParser;

/// Default tolerance in standard deviations
pub const DEFAULT_SD: f64 = 3.0;

/// File name the original pipeline step expects
pub const DEFAULT_OUTPUT: &str = "het_passing_samples.tsv";

#[derive(Debug, Clone)]
pub struct HetFilterConfig {
    pub het_file: PathBuf,
    pub sd: f64,
    pub output: PathBuf,
}

/// Population mean and standard deviation of F
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl FStats {
    /// Statistics over the non-missing F values; None if there are none
    ///
    /// Sums run over offsets from the first value, so identical F values give
    /// exactly that value as the mean and a standard deviation of 0.
    pub fn compute(records: &[HetRecord]) -> Option<Self> {
        let values: Vec<f64> = records.iter().filter_map(|r| r.f).collect();
        let shift = *values.first()?;

        let n = values.len() as f64;
        let offsets: Vec<f64> = values.iter().map(|v| v - shift).collect();
        let mean_offset = offsets.iter().sum::<f64>() / n;
        let variance = offsets.iter().map(|d| (d - mean_offset).powi(2)).sum::<f64>() / n;

        Some(Self {
            count: values.len(),
            mean: shift + mean_offset,
            std_dev: variance.sqrt(),
        })
    }

    /// Inclusive acceptance interval for tolerance `sd`
    pub fn bounds(&self, sd: f64) -> (f64, f64) {
        (self.mean - sd * self.std_dev, self.mean + sd * self.std_dev)
    }
}

/// Samples passing the filter, in input order
pub fn filter_outliers(records: &[HetRecord], sd: f64) -> Vec<SampleKey> {
    let Some(stats) = FStats::compute(records) else {
        return Vec::new();
    };
    let (lower, upper) = stats.bounds(sd);

    records
        .iter()
        .filter(|r| r.f.is_some_and(|f| f >= lower && f <= upper))
        .map(SampleKey::from)
        .collect()
}

/// Heterozygosity outlier removal tool
pub struct HetOutlierFilter {
    config: HetFilterConfig,
}

impl HetOutlierFilter {
    pub fn new(config: HetFilterConfig) -> Result<Self> {
        if !(config.sd >= 0.0) {
            anyhow::bail!("--sd must be a non-negative number, got {}", config.sd);
        }
        Ok(Self { config })
    }

    /// Read the .het report, filter it and write the passing samples
    pub fn run(&self) -> Result<Vec<SampleKey>> {
        info!("Reading heterozygosity report: {:?}", self.config.het_file);
        let records = HetParser::parse(&self.config.het_file)
            .with_context(|| format!("Failed to read heterozygosity file {:?}", self.config.het_file))?;

        let missing = records.iter().filter(|r| r.f.is_none()).count();
        if missing > 0 {
            warn!("{} samples have a missing F value and will be excluded", missing);
        }

        match FStats::compute(&records) {
            Some(stats) => {
                let (lower, upper) = stats.bounds(self.config.sd);
                info!(
                    "F mean={:.6}, sd={:.6}, keeping [{:.6}, {:.6}] ({} SD)",
                    stats.mean, stats.std_dev, lower, upper, self.config.sd
                );
            }
            None => warn!("No sample has a usable F value"),
        }

        let passing = filter_outliers(&records, self.config.sd);

        let mut writer = TableWriter::create(&self.config.output, Delimiter::Tab)?;
        for sample in &passing {
            writer.write_row([sample.fid.as_str(), sample.iid.as_str()])?;
        }
        writer.finish()?;

        info!(
            "Retained {} of {} samples ({} excluded) -> {:?}",
            passing.len(),
            records.len(),
            records.len() - passing.len(),
            self.config.output
        );

        Ok(passing)
    }
}
