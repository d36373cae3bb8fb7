use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::DependencyError;

/// Parameters of the random-feature HSIC estimator.
///
/// A `None` gamma asks the estimator to pick the bandwidth with the median
/// heuristic. The struct is never mutated by the estimators: resolved gammas
/// stay local to each call.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KernelConfig {
    /// Number of random features per kernel.
    pub ncom: usize,
    /// Bandwidths for the X and Y kernels.
    pub gamma: (Option<f64>, Option<f64>),
    /// Monte Carlo repetitions averaged into the statistic.
    pub ntrials: usize,
    /// Seed of the master generator.
    pub random_state: u64,
    /// Scaling applied to the median squared distance.
    pub sigma_prior: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            ncom: 100,
            gamma: (None, None),
            ntrials: 100,
            random_state: 1,
            sigma_prior: 1.0,
        }
    }
}

impl KernelConfig {
    pub fn validate(&self) -> Result<(), DependencyError> {
        if self.ncom == 0 {
            return Err(DependencyError::InvalidConfig(
                "ncom must be at least 1".to_string(),
            ));
        }
        if self.ntrials == 0 {
            return Err(DependencyError::InvalidConfig(
                "ntrials must be at least 1".to_string(),
            ));
        }
        if !(self.sigma_prior.is_finite() && self.sigma_prior > 0.0) {
            return Err(DependencyError::InvalidConfig(format!(
                "sigma_prior must be positive, got {}",
                self.sigma_prior
            )));
        }
        for gamma in [self.gamma.0, self.gamma.1].into_iter().flatten() {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(DependencyError::InvalidConfig(format!(
                    "gamma must be positive, got {}",
                    gamma
                )));
            }
        }
        Ok(())
    }

    /// Copy of this configuration with a different trial count.
    pub fn with_ntrials(&self, ntrials: usize) -> Self {
        Self {
            ntrials,
            ..self.clone()
        }
    }
}

/// Parameters of the histogram mutual-information estimator.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HistogramConfig {
    /// Bins per axis of the joint histogram.
    pub nbins: usize,
    /// Standard deviation of the Gaussian smoothing filter, in bins.
    pub sigma_smooth: f64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            nbins: 128,
            sigma_smooth: 2.0,
        }
    }
}

impl HistogramConfig {
    pub fn validate(&self) -> Result<(), DependencyError> {
        if self.nbins == 0 {
            return Err(DependencyError::InvalidConfig(
                "nbins must be at least 1".to_string(),
            ));
        }
        if !(self.sigma_smooth.is_finite() && self.sigma_smooth >= 0.0) {
            return Err(DependencyError::InvalidConfig(format!(
                "sigma_smooth must be non-negative, got {}",
                self.sigma_smooth
            )));
        }
        Ok(())
    }
}

/// Central configuration for a pairwise dependency run.
///
/// `kernel.ntrials` is the HSIC trial count used when both datasets share the
/// same columns; `cross_dataset_trials` replaces it when they do not, which
/// keeps cross-dataset runs (usually many more pairs) affordable.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MatrixConfig {
    pub histogram: HistogramConfig,
    pub kernel: KernelConfig,
    pub cross_dataset_trials: usize,
    /// Evaluate pairs on the rayon pool. Results do not depend on this flag.
    pub parallel: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            histogram: HistogramConfig::default(),
            kernel: KernelConfig::default(),
            cross_dataset_trials: 5,
            parallel: true,
        }
    }
}

impl MatrixConfig {
    pub fn validate(&self) -> Result<(), DependencyError> {
        self.histogram.validate()?;
        self.kernel.validate()?;
        if self.cross_dataset_trials == 0 {
            return Err(DependencyError::InvalidConfig(
                "cross_dataset_trials must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Kernel configuration for the symmetric (same columns) or cross-dataset branch.
    pub fn kernel_for(&self, symmetric: bool) -> KernelConfig {
        if symmetric {
            self.kernel.clone()
        } else {
            self.kernel.with_ntrials(self.cross_dataset_trials)
        }
    }
}

/// Load a matrix configuration from a JSON file. Missing fields take their defaults.
pub fn load_matrix_config<P: AsRef<Path>>(path: P) -> Result<MatrixConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: MatrixConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.as_ref().display()))?;
    Ok(config)
}
