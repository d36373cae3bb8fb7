//! Median-heuristic bandwidth selection for RBF kernels.

use ndarray::{Array2, ArrayView2, Axis};
use rand::seq::index::sample;
use rand::Rng;
use statrs::statistics::{Data, Median};

use crate::error::DependencyError;

/// Samples larger than this are subsampled before computing distances.
pub const MAX_BANDWIDTH_SAMPLES: usize = 1000;

/// Pick an RBF scale `gamma` for the rows of `x`.
///
/// The squared Euclidean distance between every pair of rows is computed from
/// the Gram matrix, `d(i, j) = G(i, i) + G(j, j) - 2 G(i, j)`. With `mdist`
/// the median of the strictly positive distances (each unordered pair counted
/// once), the returned scale is `1 / (sigma_prior * mdist)`.
///
/// Inputs with more than [`MAX_BANDWIDTH_SAMPLES`] rows are reduced to a
/// uniform subsample drawn without replacement from `rng`.
///
/// # Arguments
///
/// * `x` - Samples as rows, one or more columns.
/// * `sigma_prior` - Multiplier on the median distance.
/// * `rng` - Generator used only for subsampling.
///
/// # Returns
///
/// A positive gamma, or `DegenerateDistance` if every row is identical.
pub fn median_heuristic_gamma<R: Rng>(
    x: ArrayView2<f64>,
    sigma_prior: f64,
    rng: &mut R,
) -> Result<f64, DependencyError> {
    if !(sigma_prior.is_finite() && sigma_prior > 0.0) {
        return Err(DependencyError::InvalidConfig(format!(
            "sigma_prior must be positive, got {}",
            sigma_prior
        )));
    }
    if x.nrows() == 0 {
        return Err(DependencyError::InsufficientData {
            required: 1,
            found: 0,
        });
    }

    let n_used = x.nrows().min(MAX_BANDWIDTH_SAMPLES);
    let distances = if x.nrows() > MAX_BANDWIDTH_SAMPLES {
        let rows = sample(rng, x.nrows(), MAX_BANDWIDTH_SAMPLES).into_vec();
        let subsample: Array2<f64> = x.select(Axis(0), &rows);
        positive_sq_distances(subsample.view())
    } else {
        positive_sq_distances(x)
    };
    if distances.is_empty() {
        return Err(DependencyError::DegenerateDistance);
    }
    let mdist = Data::new(distances).median();
    log::trace!("median squared distance {} over {} rows", mdist, n_used);

    Ok(1.0 / (sigma_prior * mdist))
}

/// Strictly positive squared distances between distinct rows (upper triangle).
///
/// Rounding in the Gram identity can leave tiny negative residues for
/// identical rows; those are not distances and are dropped with the zeros.
pub(crate) fn positive_sq_distances(x: ArrayView2<f64>) -> Vec<f64> {
    let gram = x.dot(&x.t());
    let diag = gram.diag();
    let n = x.nrows();

    let mut distances = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = diag[i] + diag[j] - 2.0 * gram[[i, j]];
            if d > 0.0 {
                distances.push(d);
            }
        }
    }
    distances
}

/// Full matrix of squared distances from the Gram identity, clamped at zero.
pub(crate) fn sq_distance_matrix(x: ArrayView2<f64>) -> Array2<f64> {
    let gram = x.dot(&x.t());
    let diag = gram.diag().to_owned();
    let n = x.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        (diag[i] + diag[j] - 2.0 * gram[[i, j]]).max(0.0)
    })
}
