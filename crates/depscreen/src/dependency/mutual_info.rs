//! Histogram estimate of mutual information.
//!
//! The joint density of two samples is estimated with a 2-D histogram,
//! smoothed with a separable Gaussian filter, floored with a small constant
//! and renormalised; mutual information then follows from the plug-in
//! entropies of the joint and the two marginals. Discretisation and
//! smoothing bias are part of the estimator.

use itertools_num::linspace;
use ndarray::{Array2, ArrayView1, Axis};

use crate::config::HistogramConfig;
use crate::error::DependencyError;

/// Added to every cell of the smoothed joint density before renormalising.
pub const DENSITY_FLOOR: f64 = 1e-12;

/// Gaussian kernels are truncated at this many standard deviations.
const TRUNCATE: f64 = 4.0;

/// Plug-in entropies (nats) of a smoothed joint histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointEntropies {
    pub h_x: f64,
    pub h_y: f64,
    pub h_xy: f64,
}

impl JointEntropies {
    /// `H(X) + H(Y) - H(X,Y)`.
    pub fn mutual_information(&self) -> f64 {
        self.h_x + self.h_y - self.h_xy
    }

    /// Normalised mutual information of Studholme, Hill & Hawkes (1998),
    /// `(H(X) + H(Y)) / H(X,Y) - 1`, which lies in [0, 1].
    pub fn normalized(&self) -> f64 {
        (self.h_x + self.h_y) / self.h_xy - 1.0
    }
}

/// Estimate the mutual information (nats) between two matched samples.
///
/// Rows where either value is `NaN` are dropped first.
///
/// # Arguments
///
/// * `v1` - First sample.
/// * `v2` - Second sample, row-matched with `v1`.
/// * `config` - Histogram resolution and smoothing width.
pub fn mutual_information(
    v1: ArrayView1<f64>,
    v2: ArrayView1<f64>,
    config: &HistogramConfig,
) -> Result<f64, DependencyError> {
    Ok(joint_entropies(v1, v2, config)?.mutual_information())
}

/// Normalised variant of [`mutual_information`].
pub fn normalized_mutual_information(
    v1: ArrayView1<f64>,
    v2: ArrayView1<f64>,
    config: &HistogramConfig,
) -> Result<f64, DependencyError> {
    Ok(joint_entropies(v1, v2, config)?.normalized())
}

/// Marginal and joint entropies of the smoothed joint histogram of `v1` and `v2`.
pub fn joint_entropies(
    v1: ArrayView1<f64>,
    v2: ArrayView1<f64>,
    config: &HistogramConfig,
) -> Result<JointEntropies, DependencyError> {
    config.validate()?;
    if v1.len() != v2.len() {
        return Err(DependencyError::DimensionMismatch {
            left: v1.len(),
            right: v2.len(),
        });
    }

    let (x, y): (Vec<f64>, Vec<f64>) = v1
        .iter()
        .zip(v2.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .unzip();
    if x.len() < 2 {
        return Err(DependencyError::InsufficientData {
            required: 2,
            found: x.len(),
        });
    }

    let mut pxy = density_histogram2d(&x, &y, config.nbins);
    gaussian_smooth(&mut pxy, config.sigma_smooth);

    pxy.mapv_inplace(|p| p + DENSITY_FLOOR);
    let total = pxy.sum();
    pxy.mapv_inplace(|p| p / total);

    let py = pxy.sum_axis(Axis(0));
    let px = pxy.sum_axis(Axis(1));

    Ok(JointEntropies {
        h_x: entropy(px.iter()),
        h_y: entropy(py.iter()),
        h_xy: entropy(pxy.iter()),
    })
}

fn entropy<'a, I: Iterator<Item = &'a f64>>(probabilities: I) -> f64 {
    -probabilities.map(|&p| p * p.ln()).sum::<f64>()
}

/// Evenly spaced bin edges over the sample range. A zero-width range is
/// widened by half a unit on each side.
fn bin_edges(values: &[f64], nbins: usize) -> Vec<f64> {
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    linspace(lo, hi, nbins + 1).collect()
}

/// Bins are half-open except the last one, which also holds the upper edge.
fn bin_index(edges: &[f64], value: f64) -> usize {
    let nbins = edges.len() - 1;
    let upper = edges.partition_point(|&edge| edge <= value);
    upper.saturating_sub(1).min(nbins - 1)
}

/// Joint histogram of `(x, y)` normalised as a density (integrates to one).
fn density_histogram2d(x: &[f64], y: &[f64], nbins: usize) -> Array2<f64> {
    let x_edges = bin_edges(x, nbins);
    let y_edges = bin_edges(y, nbins);

    let mut hist = Array2::<f64>::zeros((nbins, nbins));
    for (&a, &b) in x.iter().zip(y.iter()) {
        hist[[bin_index(&x_edges, a), bin_index(&y_edges, b)]] += 1.0;
    }

    let dx = (x_edges[nbins] - x_edges[0]) / nbins as f64;
    let dy = (y_edges[nbins] - y_edges[0]) / nbins as f64;
    let scale = x.len() as f64 * dx * dy;
    hist.mapv_inplace(|c| c / scale);
    hist
}

/// Normalised Gaussian weights, with the radius capped at `max_radius`.
fn gaussian_kernel(sigma: f64, max_radius: usize) -> Vec<f64> {
    let radius = ((TRUNCATE * sigma + 0.5) as i64).min(max_radius as i64);
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Separable Gaussian filter with zero padding, applied in place along both axes.
fn gaussian_smooth(grid: &mut Array2<f64>, sigma: f64) {
    if sigma <= 0.0 {
        return;
    }
    let max_len = grid.nrows().max(grid.ncols());
    let kernel = gaussian_kernel(sigma, max_len.saturating_sub(1));
    let radius = (kernel.len() / 2) as isize;

    for axis in 0..2 {
        for mut lane in grid.lanes_mut(Axis(axis)) {
            let input = lane.to_vec();
            let n = input.len() as isize;
            for (i, out) in lane.iter_mut().enumerate() {
                let i = i as isize;
                *out = kernel
                    .iter()
                    .enumerate()
                    .filter_map(|(k, w)| {
                        let j = i + k as isize - radius;
                        (0..n).contains(&j).then(|| w * input[j as usize])
                    })
                    .sum();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use rand::Rng;

    use crate::random::seeded_rng;

    fn unsmoothed(nbins: usize) -> HistogramConfig {
        HistogramConfig {
            nbins,
            sigma_smooth: 0.0,
        }
    }

    #[test]
    fn test_two_state_dependence_is_ln2() {
        let x = array![0.0, 0.0, 1.0, 1.0];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mi = mutual_information(x.view(), y.view(), &unsmoothed(2)).unwrap();
        assert_abs_diff_eq!(mi, std::f64::consts::LN_2, epsilon = 1e-9);
    }

    #[test]
    fn test_two_state_independence_is_zero() {
        let x = array![0.0, 0.0, 1.0, 1.0];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let mi = mutual_information(x.view(), y.view(), &unsmoothed(2)).unwrap();
        assert_abs_diff_eq!(mi, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalized_bounds() {
        let x = array![0.0, 0.0, 1.0, 1.0];
        let nmi = normalized_mutual_information(x.view(), x.view(), &unsmoothed(2)).unwrap();
        assert_abs_diff_eq!(nmi, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_pair_is_strongly_dependent() {
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];
        let mi = mutual_information(x.view(), y.view(), &HistogramConfig::default()).unwrap();
        assert!(mi > 1.0, "mi = {}", mi);
        assert!(mi <= (5.0f64).ln() + 1e-6);
    }

    #[test]
    fn test_independent_uniforms_near_zero() {
        let mut rng = seeded_rng(7);
        let x: Array1<f64> = (0..5000).map(|_| rng.gen::<f64>()).collect();
        let y: Array1<f64> = (0..5000).map(|_| rng.gen::<f64>()).collect();
        let mi = mutual_information(x.view(), y.view(), &HistogramConfig::default()).unwrap();
        assert!(mi > -1e-6);
        assert!(mi < 0.1, "mi = {}", mi);
    }

    #[test]
    fn test_missing_rows_dropped() {
        let x = array![1.0, f64::NAN, 3.0, 4.0];
        let y = array![1.0, 2.0, f64::NAN, 4.0];
        let with_nan = mutual_information(x.view(), y.view(), &HistogramConfig::default()).unwrap();

        let x_clean = array![1.0, 4.0];
        let y_clean = array![1.0, 4.0];
        let clean =
            mutual_information(x_clean.view(), y_clean.view(), &HistogramConfig::default()).unwrap();
        assert_eq!(with_nan, clean);
    }

    #[test]
    fn test_insufficient_rows() {
        let x = array![1.0, f64::NAN];
        let y = array![1.0, 2.0];
        assert_eq!(
            mutual_information(x.view(), y.view(), &HistogramConfig::default()),
            Err(DependencyError::InsufficientData {
                required: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_constant_column_still_estimates() {
        let x = array![3.0, 3.0, 3.0, 3.0];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let mi = mutual_information(x.view(), y.view(), &HistogramConfig::default()).unwrap();
        assert_abs_diff_eq!(mi, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_smoothing_preserves_interior_mass() {
        let mut grid = Array2::<f64>::zeros((41, 41));
        grid[[20, 20]] = 1.0;
        gaussian_smooth(&mut grid, 2.0);
        assert_abs_diff_eq!(grid.sum(), 1.0, epsilon = 1e-12);
        assert!(grid[[20, 20]] > grid[[20, 21]]);
        assert_abs_diff_eq!(grid[[19, 20]], grid[[21, 20]], epsilon = 1e-15);
    }

    #[test]
    fn test_huge_smoothing_width_is_bounded_by_grid() {
        assert_eq!(gaussian_kernel(2.0, 127).len(), 17);
        let kernel = gaussian_kernel(1e12, 7);
        assert_eq!(kernel.len(), 15);
        assert_abs_diff_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let config = HistogramConfig {
            nbins: 8,
            sigma_smooth: 1e12,
        };
        let x = array![0.0, 1.0, 2.0, 3.0];
        let mi = mutual_information(x.view(), x.view(), &config).unwrap();
        assert!(mi.is_finite());
    }

    #[test]
    fn test_bin_index_edges() {
        let edges = vec![0.0, 1.0, 2.0];
        assert_eq!(bin_index(&edges, 0.0), 0);
        assert_eq!(bin_index(&edges, 0.99), 0);
        assert_eq!(bin_index(&edges, 1.0), 1);
        assert_eq!(bin_index(&edges, 2.0), 1);
    }
}
