//! Pairwise dependency matrices over the columns of two datasets.
//!
//! Every column pair is an independent task: align the two series, drop rows
//! where either is missing, then compute Pearson correlation, histogram
//! mutual information and random-feature HSIC. When both datasets carry the
//! same set of column names the result is symmetric, so only one of `(a, b)`
//! and `(b, a)` is evaluated and both cells read that result.
//!
//! Tasks get their generators from a master generator before any work starts
//! and write only their own cells, so the matrices are bit-identical whether
//! the tasks run sequentially or on the rayon pool.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{KernelConfig, MatrixConfig};
use crate::dataset::Dataset;
use crate::dependency::correlation::pearson;
use crate::dependency::hsic::approximate_hsic;
use crate::dependency::mutual_info::mutual_information;
use crate::error::DependencyError;
use crate::random::{child_rngs, seeded_rng, DepRng};

/// The statistics produced for every column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Correlation,
    MutualInformation,
    Hsic,
}

impl Measure {
    pub const ALL: [Measure; 3] = [
        Measure::Correlation,
        Measure::MutualInformation,
        Measure::Hsic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Measure::Correlation => "correlation",
            Measure::MutualInformation => "mutual_information",
            Measure::Hsic => "hsic",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rectangular table indexed by (dataset 1 column, dataset 2 column).
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyMatrix<T> {
    rows: Vec<String>,
    columns: Vec<String>,
    values: Array2<T>,
}

impl<T: Clone> DependencyMatrix<T> {
    pub fn filled(rows: Vec<String>, columns: Vec<String>, value: T) -> Self {
        let values = Array2::from_elem((rows.len(), columns.len()), value);
        Self {
            rows,
            columns,
            values,
        }
    }
}

impl<T> DependencyMatrix<T> {
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<T> {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Cell for the named row (dataset 1) and column (dataset 2).
    pub fn get(&self, row: &str, column: &str) -> Option<&T> {
        let i = self.rows.iter().position(|r| r == row)?;
        let j = self.columns.iter().position(|c| c == column)?;
        self.values.get((i, j))
    }

    fn set(&mut self, cell: (usize, usize), value: T) {
        self.values[cell] = value;
    }
}

/// A measure that could not be computed for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPair {
    pub row: String,
    pub column: String,
    pub measure: Measure,
    pub reason: DependencyError,
}

impl fmt::Display for SkippedPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ~ {} [{}]: {}",
            self.row, self.column, self.measure, self.reason
        )
    }
}

/// Output of [`dependency_measures`].
///
/// Statistic cells are `None` when the measure is unavailable for that pair
/// (see `skipped`) or when the pair was never evaluated because the run was
/// cancelled (see `incomplete`).
#[derive(Debug, Clone)]
pub struct DependencyReport {
    pub correlation: DependencyMatrix<Option<f64>>,
    pub mutual_information: DependencyMatrix<Option<f64>>,
    pub hsic: DependencyMatrix<Option<f64>>,
    /// Number of pairwise-valid rows behind each cell.
    pub sample_count: DependencyMatrix<usize>,
    pub skipped: Vec<SkippedPair>,
    /// Pairs (row, column) not evaluated because of cancellation.
    pub incomplete: Vec<(String, String)>,
    /// Whether both datasets had the same column set.
    pub symmetric: bool,
}

impl DependencyReport {
    pub fn matrix(&self, measure: Measure) -> &DependencyMatrix<Option<f64>> {
        match measure {
            Measure::Correlation => &self.correlation,
            Measure::MutualInformation => &self.mutual_information,
            Measure::Hsic => &self.hsic,
        }
    }

    fn matrix_mut(&mut self, measure: Measure) -> &mut DependencyMatrix<Option<f64>> {
        match measure {
            Measure::Correlation => &mut self.correlation,
            Measure::MutualInformation => &mut self.mutual_information,
            Measure::Hsic => &mut self.hsic,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

/// Cooperative cancellation flag, checked before each pair starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One pair to evaluate and the output cells that receive its result.
struct PairTask {
    left: usize,
    right: usize,
    cells: Vec<(usize, usize)>,
    rng: DepRng,
}

struct PairOutcome {
    n_samples: usize,
    correlation: Result<f64, DependencyError>,
    mutual_information: Result<f64, DependencyError>,
    hsic: Result<f64, DependencyError>,
}

impl PairOutcome {
    fn measure(&self, measure: Measure) -> &Result<f64, DependencyError> {
        match measure {
            Measure::Correlation => &self.correlation,
            Measure::MutualInformation => &self.mutual_information,
            Measure::Hsic => &self.hsic,
        }
    }
}

/// Compute correlation, mutual information, HSIC and sample-count matrices
/// for every column pair of `d1` x `d2`.
///
/// # Errors
///
/// Only an invalid `config` is fatal. Per-pair estimation failures are
/// recorded in [`DependencyReport::skipped`] and leave the cell `None`.
pub fn dependency_measures(
    d1: &Dataset,
    d2: &Dataset,
    config: &MatrixConfig,
) -> Result<DependencyReport, DependencyError> {
    dependency_measures_with_cancel(d1, d2, config, &CancellationToken::new())
}

/// [`dependency_measures`] that stops starting new pairs once `cancel` is set.
/// Pairs not started are listed in [`DependencyReport::incomplete`].
pub fn dependency_measures_with_cancel(
    d1: &Dataset,
    d2: &Dataset,
    config: &MatrixConfig,
    cancel: &CancellationToken,
) -> Result<DependencyReport, DependencyError> {
    build_report(d1, d2, config, |_| cancel.is_cancelled())
}

/// Shared driver; `stop` is asked before the task with the given plan index
/// starts and skips it when true.
fn build_report<S>(
    d1: &Dataset,
    d2: &Dataset,
    config: &MatrixConfig,
    stop: S,
) -> Result<DependencyReport, DependencyError>
where
    S: Fn(usize) -> bool + Sync,
{
    config.validate()?;

    let symmetric = d1.same_columns(d2);
    let kernel = config.kernel_for(symmetric);
    let rows = d1.column_names();
    let columns = d2.column_names();

    let mut master = seeded_rng(kernel.random_state);
    let tasks = plan_tasks(d1, d2, symmetric, &mut master);
    log::info!(
        "Computing dependency measures: {} x {} columns, {} pairs (symmetric: {}, hsic trials: {})",
        rows.len(),
        columns.len(),
        tasks.len(),
        symmetric,
        kernel.ntrials
    );

    let run = |(i, task): (usize, PairTask)| -> (PairTask, Option<PairOutcome>) {
        if stop(i) {
            return (task, None);
        }
        let mut task = task;
        let outcome = evaluate_pair(d1, task.left, d2, task.right, config, &kernel, &mut task.rng);
        (task, Some(outcome))
    };
    let results: Vec<(PairTask, Option<PairOutcome>)> = if config.parallel {
        tasks.into_par_iter().enumerate().map(run).collect()
    } else {
        tasks.into_iter().enumerate().map(run).collect()
    };
    let total_pairs = results.len();

    let mut report = DependencyReport {
        correlation: DependencyMatrix::filled(rows.clone(), columns.clone(), None),
        mutual_information: DependencyMatrix::filled(rows.clone(), columns.clone(), None),
        hsic: DependencyMatrix::filled(rows.clone(), columns.clone(), None),
        sample_count: DependencyMatrix::filled(rows.clone(), columns.clone(), 0),
        skipped: Vec::new(),
        incomplete: Vec::new(),
        symmetric,
    };

    for (task, outcome) in results {
        let row = rows[task.left].clone();
        let column = d2.columns()[task.right].name.clone();
        let Some(outcome) = outcome else {
            report.incomplete.push((row, column));
            continue;
        };

        for &cell in &task.cells {
            report.sample_count.set(cell, outcome.n_samples);
        }
        for measure in Measure::ALL {
            match outcome.measure(measure) {
                Ok(value) => {
                    for &cell in &task.cells {
                        report.matrix_mut(measure).set(cell, Some(*value));
                    }
                }
                Err(reason) => {
                    log::debug!("{} unavailable for {} ~ {}: {}", measure, row, column, reason);
                    report.skipped.push(SkippedPair {
                        row: row.clone(),
                        column: column.clone(),
                        measure,
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    if !report.skipped.is_empty() {
        let listing: Vec<String> = report.skipped.iter().map(|s| s.to_string()).collect();
        log::warn!(
            "{} measures unavailable: {}",
            report.skipped.len(),
            listing.join("; ")
        );
    }
    if !report.incomplete.is_empty() {
        log::warn!(
            "Cancelled with {} of {} pairs not evaluated",
            report.incomplete.len(),
            total_pairs
        );
    }

    Ok(report)
}

/// Enumerate the pairs to evaluate, each with its own child generator.
///
/// In the symmetric case the canonical order is `d1`'s column order: the pair
/// `(p, q)` with `p <= q` uses column `p` of `d1` and the column of `d2` named
/// like `d1`'s column `q`, and fills the cells for both `(p, q)` and `(q, p)`.
fn plan_tasks(d1: &Dataset, d2: &Dataset, symmetric: bool, master: &mut DepRng) -> Vec<PairTask> {
    let mut pairs: Vec<(usize, usize, Vec<(usize, usize)>)> = Vec::new();

    if symmetric {
        let names = d1.column_names();
        // same_columns guarantees every name of d1 exists in d2
        let in_d2: Vec<usize> = names.iter().filter_map(|n| d2.position(n)).collect();
        for p in 0..names.len() {
            for q in p..names.len() {
                let mut cells = vec![(p, in_d2[q])];
                if p != q {
                    cells.push((q, in_d2[p]));
                }
                pairs.push((p, in_d2[q], cells));
            }
        }
    } else {
        for i1 in 0..d1.ncols() {
            for i2 in 0..d2.ncols() {
                pairs.push((i1, i2, vec![(i1, i2)]));
            }
        }
    }

    let rngs = child_rngs(master, pairs.len());
    pairs
        .into_iter()
        .zip(rngs)
        .map(|((left, right, cells), rng)| PairTask {
            left,
            right,
            cells,
            rng,
        })
        .collect()
}

fn evaluate_pair(
    d1: &Dataset,
    left: usize,
    d2: &Dataset,
    right: usize,
    config: &MatrixConfig,
    kernel: &KernelConfig,
    rng: &mut DepRng,
) -> PairOutcome {
    let (x, y) = d1.align_with(left, d2, right);
    let n_samples = x.len();
    log::trace!(
        "pair {} ~ {}: {} valid rows",
        d1.columns()[left].name,
        d2.columns()[right].name,
        n_samples
    );

    let hsic = if n_samples < 2 {
        Err(DependencyError::InsufficientData {
            required: 2,
            found: n_samples,
        })
    } else {
        approximate_hsic(
            x.view().insert_axis(Axis(1)),
            y.view().insert_axis(Axis(1)),
            kernel,
            rng,
        )
    };

    PairOutcome {
        n_samples,
        correlation: pearson(x.view(), y.view()),
        mutual_information: mutual_information(x.view(), y.view(), &config.histogram),
        hsic,
    }
}
