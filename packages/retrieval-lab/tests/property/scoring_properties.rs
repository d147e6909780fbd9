use proptest::prelude::*;
use retrieval_lab::eval::metrics::{precision, recall, reciprocal_rank};
use retrieval_lab::{score, Cutoffs, Metric, ThrottledExecutor, ExecutorConfig, RetryBudget};
use retrieval_lab::testing::ConcurrencyProbe;
use std::time::Duration;

fn ids(pattern: &'static str, len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(pattern, len)
}

proptest! {
    #[test]
    fn recall_is_monotonic_in_k(
        predictions in ids("[a-j]", 0..15),
        truth in ids("[a-j]", 1..5),
    ) {
        let mut previous = 0.0;
        for k in 1..=16 {
            let head = &predictions[..k.min(predictions.len())];
            let value = recall(head, &truth);
            prop_assert!(value >= previous, "recall@{} = {} < {}", k, value, previous);
            previous = value;
        }
    }

    #[test]
    fn disjoint_predictions_score_zero(
        predictions in ids("[a-e]", 0..12),
        truth in ids("[v-z]", 0..4),
    ) {
        let report = score(&predictions, &truth, &Cutoffs::default());
        for k in Cutoffs::default().as_slice() {
            prop_assert_eq!(report.get(Metric::Mrr, *k), Some(0.0));
            prop_assert_eq!(report.get(Metric::Precision, *k), Some(0.0));
            prop_assert_eq!(report.get(Metric::Recall, *k), Some(0.0));
        }
    }

    #[test]
    fn scores_stay_in_unit_interval(
        predictions in ids("[a-h]", 0..12),
        truth in ids("[a-h]", 0..6),
    ) {
        for value in [
            recall(&predictions, &truth),
            precision(&predictions, &truth),
            reciprocal_rank(&predictions, &truth),
        ] {
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn empty_truth_never_recalls(predictions in ids("[a-h]", 0..12)) {
        let report = score(&predictions, &[], &Cutoffs::default());
        for k in Cutoffs::default().as_slice() {
            prop_assert_eq!(report.get(Metric::Recall, *k), Some(0.0));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn executor_bound_and_order_hold(
        bound in 1usize..5,
        delays in prop::collection::vec(1u64..50, 0..12),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (results, peak) = runtime.block_on(async {
            let executor = ThrottledExecutor::new(
                &ExecutorConfig::new(bound).with_retry(RetryBudget::immediate(1)),
            )
            .unwrap();
            let probe = ConcurrencyProbe::new();
            let probe = &probe;

            let outcome = executor
                .run(delays.clone(), |delay| async move {
                    let _guard = probe.enter();
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(delay)
                })
                .await;
            (outcome.into_all().unwrap(), probe.peak())
        });

        prop_assert_eq!(results, delays.clone());
        prop_assert!(peak <= bound);
        if !delays.is_empty() {
            prop_assert_eq!(peak, bound.min(delays.len()));
        }
    }
}
