//! Pearson correlation of aligned samples.

use ndarray::{Array1, ArrayView1};

use crate::error::DependencyError;

/// Compute Pearson's r between two aligned samples.
///
/// Both samples are centred on their means; the coefficient is the centred
/// cross product divided by the product of the centred norms, clamped to
/// [-1, 1] against rounding.
///
/// # Arguments
///
/// * `x` - First sample, already cleaned of missing values.
/// * `y` - Second sample, same length as `x`.
///
/// # Returns
///
/// The correlation coefficient, or an error when the samples differ in
/// length, hold fewer than two rows, or one of them is constant.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<f64, DependencyError> {
    if x.len() != y.len() {
        return Err(DependencyError::DimensionMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(DependencyError::InsufficientData {
            required: 2,
            found: x.len(),
        });
    }

    let n = x.len() as f64;
    let x_mean = x.sum() / n;
    let y_mean = y.sum() / n;
    let x_centered = unit_scaled(x.mapv(|v| v - x_mean))?;
    let y_centered = unit_scaled(y.mapv(|v| v - y_mean))?;

    let x_norm_sq = x_centered.dot(&x_centered);
    let y_norm_sq = y_centered.dot(&y_centered);

    // sqrt of the product (not the product of sqrts) keeps r(x, x) == 1.0 exactly
    let r = x_centered.dot(&y_centered) / (x_norm_sq * y_norm_sq).sqrt();
    Ok(r.clamp(-1.0, 1.0))
}

/// Divide by the largest magnitude so the products below neither overflow
/// nor underflow.
fn unit_scaled(centered: Array1<f64>) -> Result<Array1<f64>, DependencyError> {
    let scale = centered.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Err(DependencyError::ZeroVariance);
    }
    Ok(centered / scale)
}
