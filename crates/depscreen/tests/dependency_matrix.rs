use depscreen::config::{KernelConfig, MatrixConfig};
use depscreen::dataset::{Dataset, FeatureSeries};
use depscreen::dependency::matrix::{dependency_measures, DependencyReport, Measure};
use depscreen::error::DependencyError;
use depscreen::random::seeded_rng;
use rand::Rng;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fast_config() -> MatrixConfig {
    MatrixConfig {
        kernel: KernelConfig {
            ntrials: 10,
            ..KernelConfig::default()
        },
        cross_dataset_trials: 3,
        ..MatrixConfig::default()
    }
}

/// Four channels: two coupled nonlinearly, one linear copy, one independent.
fn sensor_dataset(n: usize, seed: u64) -> Dataset {
    let mut rng = seeded_rng(seed);
    let wind: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let wave: Vec<f64> = wind
        .iter()
        .map(|w| w * w + 0.05 * rng.gen::<f64>())
        .collect();
    let wind_scaled: Vec<f64> = wind.iter().map(|w| 3.0 * w + 1.0).collect();
    let noise: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    Dataset::from_columns(vec![
        FeatureSeries::new("wind", wind),
        FeatureSeries::new("wave", wave),
        FeatureSeries::new("wind_scaled", wind_scaled),
        FeatureSeries::new("noise", noise),
    ])
    .unwrap()
}

fn assert_symmetric(report: &DependencyReport) {
    let names = report.correlation.rows().to_vec();
    for a in &names {
        for b in &names {
            for measure in Measure::ALL {
                let m = report.matrix(measure);
                assert_eq!(m.get(a, b), m.get(b, a), "{} at {} / {}", measure, a, b);
            }
            assert_eq!(
                report.sample_count.get(a, b),
                report.sample_count.get(b, a)
            );
        }
    }
}

#[test]
fn test_same_dataset_matrices_are_symmetric_and_bounded() {
    init_logger();
    let ds = sensor_dataset(400, 1);
    let report = dependency_measures(&ds, &ds, &fast_config()).unwrap();

    assert!(report.symmetric);
    assert!(report.skipped.is_empty());
    assert_symmetric(&report);

    for name in ds.column_names() {
        assert_eq!(report.correlation.get(&name, &name), Some(&Some(1.0)));
        assert_eq!(report.sample_count.get(&name, &name), Some(&400));
    }
    for value in report.correlation.values().iter().flatten() {
        assert!((-1.0..=1.0).contains(value));
    }
    for value in report.mutual_information.values().iter().flatten() {
        assert!(*value >= -1e-6);
    }

    let hsic = |a: &str, b: &str| report.hsic.get(a, b).unwrap().unwrap();
    let corr = |a: &str, b: &str| report.correlation.get(a, b).unwrap().unwrap();
    let mi = |a: &str, b: &str| report.mutual_information.get(a, b).unwrap().unwrap();

    // the quadratic coupling is invisible to correlation but not to MI and HSIC
    assert!(corr("wind", "wave").abs() < 0.2);
    assert!(hsic("wind", "wave") > 3.0 * hsic("wind", "noise"));
    assert!(mi("wind", "wave") > mi("wind", "noise"));
    assert!((corr("wind", "wind_scaled") - 1.0).abs() < 1e-12);
}

#[test]
fn test_independent_series_are_near_zero() {
    init_logger();
    let mut rng = seeded_rng(99);
    let n = 5000;
    let ds = Dataset::from_columns(vec![
        FeatureSeries::new("u", (0..n).map(|_| rng.gen::<f64>()).collect()),
        FeatureSeries::new("v", (0..n).map(|_| rng.gen::<f64>()).collect()),
    ])
    .unwrap();

    let report = dependency_measures(&ds, &ds, &fast_config()).unwrap();
    let corr = report.correlation.get("u", "v").unwrap().unwrap();
    let mi = report.mutual_information.get("u", "v").unwrap().unwrap();
    let hsic = report.hsic.get("u", "v").unwrap().unwrap();
    assert!(corr.abs() < 0.05, "corr = {}", corr);
    assert!(mi < 0.1, "mi = {}", mi);
    assert!(hsic < 0.01, "hsic = {}", hsic);
}

#[test]
fn test_linear_dependence_sanity() {
    init_logger();
    let ds = Dataset::from_columns(vec![
        FeatureSeries::new("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        FeatureSeries::new("y", vec![2.0, 4.0, 6.0, 8.0, 10.0]),
    ])
    .unwrap();
    let report = dependency_measures(&ds, &ds, &fast_config()).unwrap();
    assert_eq!(report.correlation.get("x", "y"), Some(&Some(1.0)));
    assert!(report.hsic.get("x", "y").unwrap().unwrap() > 0.0);
    assert!(report.mutual_information.get("x", "y").unwrap().unwrap() > 1.0);
}

#[test]
fn test_missing_values_reduce_sample_count() {
    init_logger();
    let ds = Dataset::from_columns(vec![
        FeatureSeries::new("x", vec![1.0, f64::NAN, 3.0, 4.0]),
        FeatureSeries::new("y", vec![1.0, 2.0, f64::NAN, 4.0]),
    ])
    .unwrap();
    let report = dependency_measures(&ds, &ds, &fast_config()).unwrap();

    assert_eq!(report.sample_count.get("x", "y"), Some(&2));
    assert_eq!(report.sample_count.get("y", "x"), Some(&2));
    assert_eq!(report.sample_count.get("x", "x"), Some(&3));
    // rows 0 and 3 only: (1, 1) and (4, 4)
    assert_eq!(report.correlation.get("x", "y"), Some(&Some(1.0)));
    assert_symmetric(&report);
}

#[test]
fn test_constant_column_only_fails_its_own_pairs() {
    init_logger();
    let mut ds_columns = sensor_dataset(200, 5).columns().to_vec();
    ds_columns.push(FeatureSeries::new("stuck", vec![7.0; 200]));
    let ds = Dataset::from_columns(ds_columns).unwrap();

    let report = dependency_measures(&ds, &ds, &fast_config()).unwrap();

    let hsic_skips: Vec<_> = report
        .skipped
        .iter()
        .filter(|s| s.measure == Measure::Hsic)
        .collect();
    // one skip per unordered pair touching the constant column, diagonal included
    assert_eq!(hsic_skips.len(), ds.ncols());
    for skip in &hsic_skips {
        assert!(skip.row == "stuck" || skip.column == "stuck");
        assert_eq!(skip.reason, DependencyError::DegenerateDistance);
    }
    assert!(report
        .skipped
        .iter()
        .all(|s| s.row == "stuck" || s.column == "stuck"));

    for a in ds.column_names() {
        assert!(report.mutual_information.get(&a, "stuck").unwrap().is_some());
        for b in ds.column_names() {
            let touches = a == "stuck" || b == "stuck";
            assert_eq!(report.hsic.get(&a, &b).unwrap().is_none(), touches);
            assert_eq!(report.correlation.get(&a, &b).unwrap().is_none(), touches);
        }
    }
}

#[test]
fn test_results_are_reproducible_and_schedule_independent() {
    init_logger();
    let ds = sensor_dataset(150, 8);
    let parallel = fast_config();
    let sequential = MatrixConfig {
        parallel: false,
        ..fast_config()
    };

    let a = dependency_measures(&ds, &ds, &parallel).unwrap();
    let b = dependency_measures(&ds, &ds, &parallel).unwrap();
    let c = dependency_measures(&ds, &ds, &sequential).unwrap();
    assert_eq!(a.hsic, b.hsic);
    assert_eq!(a.hsic, c.hsic);
    assert_eq!(a.mutual_information, c.mutual_information);

    let reseeded = MatrixConfig {
        kernel: KernelConfig {
            random_state: 2024,
            ..fast_config().kernel
        },
        ..fast_config()
    };
    let d = dependency_measures(&ds, &ds, &reseeded).unwrap();
    assert_ne!(a.hsic, d.hsic);
    let first = a.hsic.get("wind", "wave").unwrap().unwrap();
    let second = d.hsic.get("wind", "wave").unwrap().unwrap();
    assert!((first - second).abs() < 0.35 * first.max(second));
}

#[test]
fn test_cross_dataset_run_fills_every_cell() {
    init_logger();
    let d1 = sensor_dataset(120, 11);
    let mut rng = seeded_rng(12);
    // shifted index: only rows 20..120 overlap
    let d2 = Dataset::new(
        (20..140).collect(),
        vec![
            FeatureSeries::new("pressure", (0..120).map(|_| rng.gen::<f64>()).collect()),
            FeatureSeries::new("humidity", (0..120).map(|_| rng.gen::<f64>()).collect()),
        ],
    )
    .unwrap();

    let report = dependency_measures(&d1, &d2, &fast_config()).unwrap();
    assert!(!report.symmetric);
    assert_eq!(report.hsic.shape(), (4, 2));
    assert!(report.sample_count.values().iter().all(|&n| n == 100));
    assert!(report.hsic.values().iter().all(|v| v.is_some()));
    assert!(report.skipped.is_empty());
}
