// ==============================================================================
// gwas/backend.rs - Statistics Backend (PCA + Linear Regression)
// ==============================================================================
// Description: Narrow statistics interface used by the GWAS runner and its
//              nalgebra/statrs implementation
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// PCA (HWE-normalized):
//   For each variant with 0 < AC < 2 * n_called:
//     mean = AC / n_called
//     x_ij = (n_alt_ij - mean) / sqrt(mean * (2 - mean) * M / 2), missing -> 0
//   where M is the number of such variants. Sample scores are the top-k
//   eigenvectors of X X^T scaled by sqrt(eigenvalue).
//
// Regression (per variant):
//   Q = thin QR basis of the covariate matrix C (n x k)
//   b  = (x.y - Qx.Qy) / (x.x - Qx.Qx)
//   se = sqrt(((y.y - Qy.Qy) / (x.x - Qx.Qx) - b^2) / d),  d = n - k - 1
//   t  = b / se,  p = 2 * T_d(-|t|)
// ==============================================================================

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;
use tracing::debug;

use crate::genotype_matrix::GenotypeMatrix;

/// Relative tolerance under which a dosage is treated as collinear with the covariates
const COLLINEAR_TOLERANCE: f64 = 1e-10;

/// Errors raised by a statistics backend
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Cannot compute {k} principal components from {n_samples} samples")]
    TooManyComponents { k: usize, n_samples: usize },

    #[error("No polymorphic variants available for PCA")]
    NoPolymorphicVariants,

    #[error("Too few samples for regression: n={n}, covariates={k} leaves {n} - {k} - 1 < 1 degrees of freedom")]
    InsufficientSamples { n: usize, k: usize },

    #[error("Covariate '{name}' has {found} values, expected {expected}")]
    CovariateLength {
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("Distribution error: {0}")]
    Distribution(String),
}

/// Principal component output
#[derive(Debug, Clone, PartialEq)]
pub struct PcaResult {
    /// Top-k eigenvalues, descending
    pub eigenvalues: Vec<f64>,
    /// `scores[sample][component]`
    pub scores: Vec<Vec<f64>>,
}

impl PcaResult {
    /// Scores of one component across all samples
    pub fn component(&self, idx: usize) -> Vec<f64> {
        self.scores.iter().map(|row| row[idx]).collect()
    }

    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }
}

/// A named covariate column (one value per matrix sample)
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Regression statistics for one variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionStats {
    pub n: usize,
    pub beta: f64,
    pub standard_error: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

impl RegressionStats {
    fn undefined(n: usize) -> Self {
        Self {
            n,
            beta: f64::NAN,
            standard_error: f64::NAN,
            t_stat: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

/// Statistical operations the GWAS runner delegates
///
/// Any implementation producing the same quantities can replace the default.
pub trait StatsBackend {
    /// Top `k` HWE-normalized principal component scores per sample
    fn principal_components(&self, matrix: &GenotypeMatrix, k: usize) -> Result<PcaResult, StatsError>;

    /// Per-variant OLS of `y` on alt dosage with the given covariates
    ///
    /// Samples with a missing response or covariate are excluded everywhere;
    /// missing dosages are mean-imputed per variant.
    fn linear_regression_rows(
        &self,
        matrix: &GenotypeMatrix,
        y: &[Option<f64>],
        covariates: &[CovariateColumn],
    ) -> Result<Vec<RegressionStats>, StatsError>;
}

/// Dense in-memory backend built on nalgebra and statrs
#[derive(Debug, Default, Clone, Copy)]
pub struct NalgebraBackend;

impl StatsBackend for NalgebraBackend {
    fn principal_components(&self, matrix: &GenotypeMatrix, k: usize) -> Result<PcaResult, StatsError> {
        let n = matrix.n_samples();
        if k > n {
            return Err(StatsError::TooManyComponents { k, n_samples: n });
        }

        let mut columns: Vec<Vec<Option<f64>>> = Vec::new();
        let mut means: Vec<f64> = Vec::new();
        for v in 0..matrix.n_variants() {
            let dosages = matrix.dosages(v);
            let called: Vec<f64> = dosages.iter().flatten().copied().collect();
            if called.is_empty() {
                continue;
            }
            let ac: f64 = called.iter().sum();
            if ac <= 0.0 || ac >= 2.0 * called.len() as f64 {
                continue;
            }
            means.push(ac / called.len() as f64);
            columns.push(dosages);
        }

        let m = columns.len();
        if m == 0 {
            return Err(StatsError::NoPolymorphicVariants);
        }
        debug!("PCA over {} samples x {} polymorphic variants", n, m);

        let x = DMatrix::from_fn(n, m, |i, j| {
            let mean = means[j];
            let scale = (mean * (2.0 - mean) * m as f64 / 2.0).sqrt();
            columns[j][i].map(|d| (d - mean) / scale).unwrap_or(0.0)
        });
        let grm = &x * x.transpose();

        let eigen = SymmetricEigen::new(grm);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut eigenvalues = Vec::with_capacity(k);
        let mut scores = vec![Vec::with_capacity(k); n];
        for &idx in order.iter().take(k) {
            let lambda = eigen.eigenvalues[idx].max(0.0);
            let vector = eigen.eigenvectors.column(idx);

            // Fix the sign so repeated runs give identical scores
            let sign = vector
                .iter()
                .find(|v| v.abs() > 1e-12)
                .map(|v| v.signum())
                .unwrap_or(1.0);

            eigenvalues.push(lambda);
            for (row, value) in scores.iter_mut().zip(vector.iter()) {
                row.push(sign * value * lambda.sqrt());
            }
        }

        Ok(PcaResult { eigenvalues, scores })
    }

    fn linear_regression_rows(
        &self,
        matrix: &GenotypeMatrix,
        y: &[Option<f64>],
        covariates: &[CovariateColumn],
    ) -> Result<Vec<RegressionStats>, StatsError> {
        let n_samples = matrix.n_samples();
        for column in covariates.iter() {
            if column.values.len() != n_samples {
                return Err(StatsError::CovariateLength {
                    name: column.name.clone(),
                    found: column.values.len(),
                    expected: n_samples,
                });
            }
        }
        if y.len() != n_samples {
            return Err(StatsError::CovariateLength {
                name: "response".to_string(),
                found: y.len(),
                expected: n_samples,
            });
        }

        let used: Vec<usize> = (0..n_samples)
            .filter(|&s| y[s].is_some() && covariates.iter().all(|c| c.values[s].is_some()))
            .collect();

        let n = used.len();
        let k = covariates.len();
        if n < k + 2 {
            return Err(StatsError::InsufficientSamples { n, k });
        }
        let d = (n - k - 1) as f64;
        debug!("Regression over {} samples, {} covariates, {} dof", n, k, d);

        let yv = DVector::from_iterator(n, used.iter().map(|&s| y[s].unwrap_or_default()));
        let c = DMatrix::from_fn(n, k, |i, j| covariates[j].values[used[i]].unwrap_or_default());
        let q = c.qr().q();
        let qty = q.tr_mul(&yv);
        let yyp = yv.dot(&yv) - qty.dot(&qty);

        let t_dist = StudentsT::new(0.0, 1.0, d).map_err(|e| StatsError::Distribution(e.to_string()))?;

        let mut results = Vec::with_capacity(matrix.n_variants());
        for v in 0..matrix.n_variants() {
            let dosages = matrix.dosages(v);
            let called: Vec<f64> = used.iter().filter_map(|&s| dosages[s]).collect();
            if called.is_empty() {
                results.push(RegressionStats::undefined(n));
                continue;
            }
            let mean = called.iter().sum::<f64>() / called.len() as f64;
            let xv = DVector::from_iterator(n, used.iter().map(|&s| dosages[s].unwrap_or(mean)));

            let qtx = q.tr_mul(&xv);
            let xx = xv.dot(&xv);
            let xxp = xx - qtx.dot(&qtx);
            if !(xxp > COLLINEAR_TOLERANCE * xx.max(1.0)) {
                results.push(RegressionStats::undefined(n));
                continue;
            }
            let xyp = xv.dot(&yv) - qtx.dot(&qty);

            let beta = xyp / xxp;
            let standard_error = ((yyp / xxp - beta * beta) / d).max(0.0).sqrt();
            let t_stat = beta / standard_error;
            let p_value = if t_stat.is_nan() {
                f64::NAN
            } else if t_stat.is_infinite() {
                0.0
            } else {
                2.0 * t_dist.cdf(-t_stat.abs())
            };

            results.push(RegressionStats {
                n,
                beta,
                standard_error,
                t_stat,
                p_value,
            });
        }

        Ok(results)
    }
}
