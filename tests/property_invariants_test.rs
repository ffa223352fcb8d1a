//! Property-based tests for the testable invariants in the design's
//! "Testable Properties" section: the parser round-trip property, the
//! remaining/retry-after bounds, and the never-exceeds-limit invariant under
//! concurrent callers on a single key.

use std::sync::Arc;

use futures::future::join_all;
use proptest::prelude::*;

use throttlecore::rule::{parse_limit_spec, Strategy};
use throttlecore::store::local::LocalStore;
use throttlecore::store::Store;

proptest! {
    /// Parser round-trip (§8 invariant 7): for any valid `<N>/<unit>` spec,
    /// parsing then regenerating as `"{requests}/{window}s"` and parsing
    /// again yields the same `(requests, window_seconds)` pair.
    #[test]
    fn parser_round_trips_for_any_valid_spec(
        requests in 1u32..100_000,
        unit in prop_oneof![
            Just("s"), Just("m"), Just("h"), Just("d"),
            Just("second"), Just("minute"), Just("hour"), Just("day"),
        ],
    ) {
        let spec = format!("{}/{}", requests, unit);
        let (parsed_requests, parsed_window) = parse_limit_spec(&spec).unwrap();

        let regenerated = format!("{}/{}s", parsed_requests, parsed_window);
        let (requests2, window2) = parse_limit_spec(&regenerated).unwrap();

        prop_assert_eq!(parsed_requests, requests2);
        prop_assert_eq!(parsed_window, window2);
        prop_assert_eq!(parsed_requests, requests);
    }

    /// Garbage input never panics the parser; it always returns `Err`.
    #[test]
    fn parser_never_panics_on_arbitrary_strings(s in "\\PC*") {
        let _ = parse_limit_spec(&s);
    }

    /// Remaining/retry-after bound (§8 invariant 2 and 3) for the local
    /// store: every allowed decision has `0 <= remaining <= limit - 1`, and
    /// every denied decision has `0 < retry_after <= window`.
    #[test]
    fn local_store_decisions_respect_bounds(
        limit in 1u32..50,
        window in 1u32..60,
        calls in 1usize..80,
    ) {
        futures::executor::block_on(async {
            let store = LocalStore::new();
            for _ in 0..calls {
                let decision = store
                    .check_and_increment("k", limit, window, Strategy::SlidingWindow, 0, 1)
                    .await
                    .unwrap();

                if decision.allowed {
                    prop_assert!(decision.remaining <= limit - 1);
                    prop_assert_eq!(decision.retry_after_seconds, 0);
                } else {
                    prop_assert_eq!(decision.remaining, 0);
                    prop_assert!(decision.retry_after_seconds > 0);
                    prop_assert!(decision.retry_after_seconds <= window);
                }
            }
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn never_exceeds_limit_under_concurrent_callers() {
    // Invariant 1: across N concurrent callers racing a single key, the
    // count of allowed=true responses never exceeds the configured limit.
    let store = Arc::new(LocalStore::new());
    let limit = 20u32;
    let window = 30u32;
    let concurrency = 100;

    let calls = (0..concurrency).map(|_| {
        let store = store.clone();
        async move {
            store
                .check_and_increment("shared-key", limit, window, Strategy::SlidingWindow, 0, 1)
                .await
                .unwrap()
        }
    });

    let results = join_all(calls).await;
    let allowed_count = results.iter().filter(|d| d.allowed).count();

    assert!(allowed_count as u32 <= limit);
}
