//! Property-based tests for rust-common crate.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use proptest::prelude::*;
use rust_common::{PlatformError, RetryConfig, RetryPolicy};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retryable_errors_are_consistent(msg in "[a-zA-Z0-9 ]{1,50}") {
        let retryable = vec![
            PlatformError::unavailable(msg.clone()),
            PlatformError::Timeout(msg.clone()),
        ];
        for err in retryable {
            prop_assert!(err.is_retryable(), "Error {:?} should be retryable", err);
        }

        let permanent = vec![
            PlatformError::not_found(msg.clone()),
            PlatformError::invalid_input(msg.clone()),
            PlatformError::internal(msg.clone()),
        ];
        for err in permanent {
            prop_assert!(!err.is_retryable(), "Error {:?} should not be retryable", err);
        }
    }

    #[test]
    fn prop_delay_never_exceeds_cap(
        initial_ms in 1u64..500,
        cap_ms in 1u64..2_000,
        attempt in 0u32..20,
    ) {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_initial_delay(Duration::from_millis(initial_ms))
                .with_max_delay(Duration::from_millis(cap_ms))
                .without_jitter(),
        );
        prop_assert!(policy.delay_for_attempt(attempt) <= Duration::from_millis(cap_ms));
    }

    #[test]
    fn prop_jitter_stays_within_quarter(attempt in 0u32..6) {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_initial_delay(Duration::from_millis(100))
                .with_max_delay(Duration::from_secs(60)),
        );
        let base = 100u64 * 2u64.pow(attempt);
        let delay = policy.delay_for_attempt(attempt).as_millis() as u64;
        prop_assert!(delay >= base);
        prop_assert!(delay <= base + base / 4 + 1);
    }

    #[test]
    fn prop_no_retry_past_limit(max in 0u32..10, extra in 0u32..10) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_retries(max));
        let err = PlatformError::unavailable("down");
        prop_assert!(!policy.should_retry(&err, max + extra));
    }

    #[test]
    fn prop_execute_attempts_bounded(max in 0u32..4, failures in 0u32..8) {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_max_retries(max)
                .with_initial_delay(Duration::from_millis(1))
                .without_jitter(),
        );
        let calls = AtomicU32::new(0);

        let result = tokio_test::block_on(policy.execute(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < failures {
                    Err(PlatformError::unavailable("down"))
                } else {
                    Ok(n)
                }
            }
        }));

        prop_assert_eq!(result.is_ok(), failures <= max);
        prop_assert_eq!(calls.load(Ordering::SeqCst), failures.min(max) + 1);
    }
}
