//! Property-based tests for housing-ml
//!
//! - Metric invariants (non-negativity, MAE <= RMSE, R² <= 1, determinism)
//! - Split reproducibility and coverage
//! - Best-model selection picks the first minimum
//! - Run with ProptestConfig::with_cases(100)

use housing_ml::dataset::{train_test_split, Dataset, Matrix};
use housing_ml::metrics::eval_regression;
use housing_ml::train::select_best;
use proptest::prelude::*;
use quickcheck::{QuickCheck, TestResult};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Paired finite target and prediction vectors of equal length
fn arb_targets_and_predictions(max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1..=max_len).prop_flat_map(|len| {
        (
            proptest::collection::vec(-1000.0f64..1000.0, len),
            proptest::collection::vec(-1000.0f64..1000.0, len),
        )
    })
}

/// A small single-feature dataset whose targets are the row indices
#[allow(clippy::cast_precision_loss)]
fn arb_dataset(max_rows: usize) -> impl Strategy<Value = Dataset> {
    (4..=max_rows).prop_map(|rows| {
        let values: Vec<f64> = (0..rows).map(|r| r as f64).collect();
        Dataset::new(
            vec!["MedInc".to_string()],
            Matrix::from_vec(rows, 1, values.clone()).unwrap(),
            values,
        )
        .unwrap()
    })
}

/// Candidate scores: names are unique, RMSEs drawn from a small set so ties happen
fn arb_scores() -> impl Strategy<Value = Vec<(String, f64, String)>> {
    proptest::collection::vec(prop::sample::select(vec![0.25, 0.5, 0.75, 1.0]), 1..8).prop_map(
        |rmses| {
            rmses
                .into_iter()
                .enumerate()
                .map(|(i, rmse)| (format!("model_{i}"), rmse, format!("run_{i}")))
                .collect()
        },
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Metric Properties
    // ========================================================================

    /// Property: RMSE and MAE are non-negative, R² never exceeds 1
    #[test]
    fn prop_metric_bounds((y_true, y_pred) in arb_targets_and_predictions(50)) {
        let m = eval_regression(&y_true, &y_pred).unwrap();
        prop_assert!(m.rmse >= 0.0);
        prop_assert!(m.mae >= 0.0);
        prop_assert!(m.r2 <= 1.0 + 1e-12);
    }

    /// Property: MAE <= RMSE (power-mean inequality)
    #[test]
    fn prop_mae_at_most_rmse((y_true, y_pred) in arb_targets_and_predictions(50)) {
        let m = eval_regression(&y_true, &y_pred).unwrap();
        prop_assert!(m.mae <= m.rmse * (1.0 + 1e-5) + 1e-6,
            "mae {} > rmse {}", m.mae, m.rmse);
    }

    /// Property: evaluating the same inputs twice gives identical metrics
    #[test]
    fn prop_metrics_deterministic((y_true, y_pred) in arb_targets_and_predictions(50)) {
        let a = eval_regression(&y_true, &y_pred).unwrap();
        let b = eval_regression(&y_true, &y_pred).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Property: perfect predictions give zero error
    #[test]
    fn prop_perfect_prediction((y_true, _) in arb_targets_and_predictions(50)) {
        let m = eval_regression(&y_true, &y_true).unwrap();
        prop_assert_eq!(m.rmse, 0.0);
        prop_assert_eq!(m.mae, 0.0);
        prop_assert_eq!(m.r2, 1.0);
    }

    // ========================================================================
    // Split Properties
    // ========================================================================

    /// Property: the same seed always yields the same partitions
    #[test]
    fn prop_split_reproducible(dataset in arb_dataset(60), seed in any::<u64>()) {
        let a = train_test_split(&dataset, 0.25, seed).unwrap();
        let b = train_test_split(&dataset, 0.25, seed).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Property: partitions are disjoint and cover every row
    #[test]
    fn prop_split_covers_rows(dataset in arb_dataset(60), seed in any::<u64>()) {
        let split = train_test_split(&dataset, 0.25, seed).unwrap();
        let mut all: Vec<f64> = split.y_train().iter().chain(split.y_test()).copied().collect();
        all.sort_by(f64::total_cmp);
        prop_assert_eq!(all.as_slice(), dataset.targets());
        prop_assert!(!split.y_train().is_empty());
        prop_assert!(!split.y_test().is_empty());
    }

    // ========================================================================
    // Selection Properties
    // ========================================================================

    /// Property: the winner has the minimum RMSE and is the first to reach it
    #[test]
    fn prop_select_best_first_minimum(scores in arb_scores()) {
        let best = select_best(
            scores.iter().map(|(n, r, id)| (n.as_str(), *r, id.as_str()))
        ).unwrap();

        let min = scores.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);
        let first = scores.iter().find(|s| s.1 == min).unwrap();
        prop_assert_eq!(best.best_rmse, min);
        prop_assert_eq!(&best.best_model_name, &first.0);
        prop_assert_eq!(&best.best_run_id, &first.2);
    }
}

// ============================================================================
// QuickCheck Properties
// ============================================================================

#[allow(clippy::needless_pass_by_value)]
fn symmetric_rmse(pairs: Vec<(i16, i16)>) -> TestResult {
    if pairs.is_empty() {
        return TestResult::discard();
    }
    let a: Vec<f64> = pairs.iter().map(|p| f64::from(p.0)).collect();
    let b: Vec<f64> = pairs.iter().map(|p| f64::from(p.1)).collect();
    let ab = eval_regression(&a, &b).unwrap();
    let ba = eval_regression(&b, &a).unwrap();
    TestResult::from_bool((ab.rmse - ba.rmse).abs() < 1e-9 && (ab.mae - ba.mae).abs() < 1e-9)
}

#[allow(clippy::needless_pass_by_value)]
fn length_mismatch_rejected(a: Vec<i16>, b: Vec<i16>) -> TestResult {
    if a.len() == b.len() {
        return TestResult::discard();
    }
    let a: Vec<f64> = a.into_iter().map(f64::from).collect();
    let b: Vec<f64> = b.into_iter().map(f64::from).collect();
    TestResult::from_bool(eval_regression(&a, &b).is_err())
}

#[test]
fn quickcheck_rmse_and_mae_are_symmetric() {
    QuickCheck::new()
        .tests(100)
        .quickcheck(symmetric_rmse as fn(Vec<(i16, i16)>) -> TestResult);
}

#[test]
fn quickcheck_length_mismatch_is_rejected() {
    QuickCheck::new()
        .tests(100)
        .quickcheck(length_mismatch_rejected as fn(Vec<i16>, Vec<i16>) -> TestResult);
}
