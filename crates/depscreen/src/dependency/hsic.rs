//! Hilbert-Schmidt Independence Criterion with RBF kernels.
//!
//! [`approximate_hsic`] replaces the two kernel matrices with random Fourier
//! features and averages the statistic over Monte Carlo trials, so its cost is
//! linear in the number of rows. [`exact_hsic`] builds the full centred Gram
//! matrices and is meant for small samples and for checking the
//! approximation.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Normal;

use crate::config::KernelConfig;
use crate::dependency::bandwidth::{median_heuristic_gamma, sq_distance_matrix};
use crate::error::DependencyError;
use crate::random::{child_rng, child_rngs, seeded_rng};

/// Random Fourier feature map approximating `exp(-gamma * |x - y|^2)`.
///
/// `z(x) = sqrt(2 / ncom) * cos(x W + b)` with `W ~ N(0, 2 gamma)` and
/// `b ~ U(0, 2 pi)`, so that `z(x) . z(y)` is an unbiased estimate of the
/// kernel value.
#[derive(Debug, Clone)]
pub struct RbfFeatureMap {
    weights: Array2<f64>,
    offsets: Array1<f64>,
}

impl RbfFeatureMap {
    /// Draw a feature map for inputs with `n_features` columns.
    pub fn sample<R: Rng>(
        n_features: usize,
        ncom: usize,
        gamma: f64,
        rng: &mut R,
    ) -> Result<Self, DependencyError> {
        let normal = Normal::new(0.0, (2.0 * gamma).sqrt())
            .map_err(|e| DependencyError::InvalidConfig(format!("gamma {}: {}", gamma, e)))?;
        let weights = Array2::from_shape_fn((n_features, ncom), |_| normal.sample(&mut *rng));
        let offsets = Array1::from_shape_fn(ncom, |_| rng.gen_range(0.0..2.0 * PI));
        Ok(Self { weights, offsets })
    }

    pub fn ncom(&self) -> usize {
        self.offsets.len()
    }

    /// Project the rows of `x` into feature space.
    pub fn transform(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let norm = (2.0 / self.ncom() as f64).sqrt();
        let mut projection = x.dot(&self.weights);
        projection += &self.offsets;
        projection.mapv_inplace(|v| v.cos() * norm);
        projection
    }
}

fn center_columns(mut features: Array2<f64>) -> Array2<f64> {
    if let Some(mean) = features.mean_axis(Axis(0)) {
        features -= &mean;
    }
    features
}

fn check_rows(x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<usize, DependencyError> {
    if x.nrows() != y.nrows() {
        return Err(DependencyError::DimensionMismatch {
            left: x.nrows(),
            right: y.nrows(),
        });
    }
    Ok(x.nrows())
}

/// Fill in the `None` bandwidths of `config` with the median heuristic.
pub fn resolve_gammas<R: Rng>(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    config: &KernelConfig,
    rng: &mut R,
) -> Result<(f64, f64), DependencyError> {
    let gamma_x = match config.gamma.0 {
        Some(gamma) => gamma,
        None => median_heuristic_gamma(x, config.sigma_prior, rng)?,
    };
    let gamma_y = match config.gamma.1 {
        Some(gamma) => gamma,
        None => median_heuristic_gamma(y, config.sigma_prior, rng)?,
    };
    Ok((gamma_x, gamma_y))
}

/// Random-feature estimate of HSIC between the rows of `x` and `y`.
///
/// Each of the `config.ntrials` trials draws fresh feature maps for X and Y
/// from its own child generator, centres the projected features and
/// accumulates `trace(A B) / n^2` with `A = X_f^T Y_f`, `B = Y_f^T X_f`. The
/// returned score is the mean over trials. Bandwidth subsampling uses a
/// separate child generator, so the whole computation is a pure function of
/// the inputs, `config` and the state of `rng`.
///
/// # Errors
///
/// * `DimensionMismatch` when the row counts differ.
/// * `InsufficientData` when there are no rows (every trial would be skipped).
/// * `DegenerateDistance` when a bandwidth has to be selected for a constant sample.
/// * `InvalidConfig` for an invalid `config`.
pub fn approximate_hsic<R: Rng>(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    config: &KernelConfig,
    rng: &mut R,
) -> Result<f64, DependencyError> {
    config.validate()?;
    let n = check_rows(x, y)?;
    if n == 0 {
        return Err(DependencyError::InsufficientData {
            required: 1,
            found: 0,
        });
    }

    let mut bandwidth_rng = child_rng(rng);
    let (gamma_x, gamma_y) = resolve_gammas(x, y, config, &mut bandwidth_rng)?;
    log::trace!("hsic bandwidths: gamma_x={} gamma_y={}", gamma_x, gamma_y);

    let n_sq = (n * n) as f64;
    let mut total = 0.0;
    for trial_rng in child_rngs(rng, config.ntrials).iter_mut() {
        let map_x = RbfFeatureMap::sample(x.ncols(), config.ncom, gamma_x, trial_rng)?;
        let map_y = RbfFeatureMap::sample(y.ncols(), config.ncom, gamma_y, trial_rng)?;
        let x_f = center_columns(map_x.transform(x));
        let y_f = center_columns(map_y.transform(y));

        // B = A^T, so trace(A B) is the squared Frobenius norm of A
        let a = x_f.t().dot(&y_f);
        total += a.iter().map(|v| v * v).sum::<f64>() / n_sq;
    }

    Ok(total / config.ntrials as f64)
}

/// [`approximate_hsic`] with a generator seeded from `config.random_state`.
pub fn approximate_hsic_seeded(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    config: &KernelConfig,
) -> Result<f64, DependencyError> {
    let mut rng = seeded_rng(config.random_state);
    approximate_hsic(x, y, config, &mut rng)
}

/// Biased empirical HSIC, `trace(K H L H) / n^2`, from full RBF Gram matrices.
///
/// Only `config.gamma` and `config.sigma_prior` are used; `rng` only matters
/// when a bandwidth is selected on more than 1000 rows.
pub fn exact_hsic<R: Rng>(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    config: &KernelConfig,
    rng: &mut R,
) -> Result<f64, DependencyError> {
    let n = check_rows(x, y)?;
    if n == 0 {
        return Err(DependencyError::InsufficientData {
            required: 1,
            found: 0,
        });
    }

    let mut bandwidth_rng = child_rng(rng);
    let (gamma_x, gamma_y) = resolve_gammas(x, y, config, &mut bandwidth_rng)?;

    let k = centered_gram(x, gamma_x);
    let l = centered_gram(y, gamma_y);
    // both centred Gram matrices are symmetric: trace(K L) = sum of K * L
    let trace: f64 = k.iter().zip(l.iter()).map(|(a, b)| a * b).sum();
    Ok(trace / (n * n) as f64)
}

/// `H K H` for the RBF Gram matrix `K` of the rows of `x`.
fn centered_gram(x: ArrayView2<f64>, gamma: f64) -> Array2<f64> {
    let mut gram = sq_distance_matrix(x);
    gram.mapv_inplace(|d| (-gamma * d).exp());

    let n = gram.nrows() as f64;
    let row_means = gram.sum_axis(Axis(1)) / n;
    let col_means = gram.sum_axis(Axis(0)) / n;
    let grand_mean = gram.sum() / (n * n);
    Array2::from_shape_fn(gram.dim(), |(i, j)| {
        gram[[i, j]] - row_means[i] - col_means[j] + grand_mean
    })
}
