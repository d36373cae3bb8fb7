//! Named numeric series over a shared ordered index.
//!
//! A `Dataset` is read-only input to the dependency estimators. Missing
//! values are stored as `NaN`; pairwise alignment joins two series on their
//! index keys and keeps only the rows where both values are present.
use std::collections::{HashMap, HashSet};

use ndarray::Array1;

use crate::error::DependencyError;

/// A named column of a dataset. `NaN` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl FeatureSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of non-missing values.
    pub fn count_valid(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Ordered collection of uniquely named series sharing one index.
#[derive(Debug, Clone)]
pub struct Dataset {
    index: Vec<i64>,
    columns: Vec<FeatureSeries>,
    positions: HashMap<String, usize>,
}

impl Dataset {
    /// Build a dataset, checking index uniqueness, column name uniqueness and lengths.
    pub fn new(index: Vec<i64>, columns: Vec<FeatureSeries>) -> Result<Self, DependencyError> {
        let mut seen = HashSet::with_capacity(index.len());
        for &key in &index {
            if !seen.insert(key) {
                return Err(DependencyError::DuplicateIndex(key));
            }
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (pos, column) in columns.iter().enumerate() {
            if column.len() != index.len() {
                return Err(DependencyError::LengthMismatch {
                    column: column.name.clone(),
                    expected: index.len(),
                    found: column.len(),
                });
            }
            if positions.insert(column.name.clone(), pos).is_some() {
                return Err(DependencyError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self {
            index,
            columns,
            positions,
        })
    }

    /// Dataset indexed by row position `0..n`.
    pub fn from_columns(columns: Vec<FeatureSeries>) -> Result<Self, DependencyError> {
        let n = columns.first().map_or(0, |c| c.len());
        Self::new((0..n as i64).collect(), columns)
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[FeatureSeries] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureSeries> {
        self.positions.get(name).map(|&pos| &self.columns[pos])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Whether both datasets hold exactly the same set of column names.
    pub fn same_columns(&self, other: &Dataset) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|c| other.positions.contains_key(&c.name))
    }

    /// Pairwise-valid rows of `self[left]` and `other[right]`, joined on the index.
    ///
    /// Rows follow the order of `self`'s index. Any row missing from either
    /// index, or with a missing value on either side, is dropped.
    pub fn align_with(
        &self,
        left: usize,
        other: &Dataset,
        right: usize,
    ) -> (Array1<f64>, Array1<f64>) {
        let a = &self.columns[left].values;
        let b = &other.columns[right].values;

        let joined: Vec<(f64, f64)> = if self.index == other.index {
            a.iter().copied().zip(b.iter().copied()).collect()
        } else {
            let lookup: HashMap<i64, usize> = other
                .index
                .iter()
                .enumerate()
                .map(|(row, &key)| (key, row))
                .collect();
            self.index
                .iter()
                .enumerate()
                .filter_map(|(row, key)| lookup.get(key).map(|&other_row| (a[row], b[other_row])))
                .collect()
        };

        let (xs, ys): (Vec<f64>, Vec<f64>) = joined
            .into_iter()
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .unzip();
        (Array1::from(xs), Array1::from(ys))
    }
}
