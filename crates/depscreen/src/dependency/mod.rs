//! Dependency measures between pairs of numeric samples.
//!
//! This module contains the individual estimators (Pearson correlation,
//! histogram mutual information, kernel bandwidth selection, HSIC) and the
//! matrix builder that runs them over every column pair of two datasets.
pub mod bandwidth;
pub mod correlation;
pub mod hsic;
pub mod matrix;
pub mod mutual_info;
