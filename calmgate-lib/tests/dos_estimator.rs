use calmgate_lib::dos::EstimatorFactory;
use std::time::Duration;

const MS: u64 = 1_000_000;
const SEC: u64 = 1_000_000_000;

fn factory(max_rps: u32, period_ms: u64, alpha: f64) -> EstimatorFactory {
    match EstimatorFactory::new(max_rps, Duration::from_millis(period_ms), alpha) {
        Ok(f) => f,
        Err(e) => panic!("factory construction should succeed: {e}"),
    }
}

#[test]
fn test_factory_rejects_invalid_parameters() {
    assert!(EstimatorFactory::new(0, Duration::from_millis(100), 0.2).is_err());
    assert!(EstimatorFactory::new(100, Duration::ZERO, 0.2).is_err());
    assert!(EstimatorFactory::new(100, Duration::from_millis(1001), 0.2).is_err());
    assert!(EstimatorFactory::new(100, Duration::from_millis(100), 0.0).is_err());
    assert!(EstimatorFactory::new(100, Duration::from_millis(100), -0.5).is_err());
    assert!(EstimatorFactory::new(100, Duration::from_millis(100), 1.5).is_err());

    // Boundary values are valid
    assert!(EstimatorFactory::new(1, Duration::from_millis(1), 1.0).is_ok());
    assert!(EstimatorFactory::new(100, Duration::from_secs(1), 0.2).is_ok());
}

#[test]
fn test_burst_below_limit_is_admitted() {
    // 5 requests within 50ms against a 10 rps limit: all admitted, and the
    // smoothed rate never crosses the limit.
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    for i in 0..5u64 {
        assert!(!est.observe_and_test(i * 10 * MS), "request {i} should be admitted");
    }
    assert!(!est.test_only(50 * MS));
    assert!(est.current_rate_per_second() <= 10.0);
}

#[test]
fn test_slow_rate_stays_admitted() {
    // Half the limit, spread over a full second: never exceeded.
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    for i in 0..5u64 {
        assert!(!est.observe_and_test(i * 200 * MS));
    }
    assert!(!est.test_only(SEC));
    assert!(est.current_rate_per_second() >= 0.0);
}

#[test]
fn test_sustained_overload_is_rejected_quickly() {
    // 100 req/s against a 10 rps limit: rejections must start within 500ms
    // and persist for the rest of the flood.
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    let mut first_rejected_at = None;
    for i in 0..200u64 {
        let now = i * 10 * MS;
        if est.observe_and_test(now) && first_rejected_at.is_none() {
            first_rejected_at = Some(now);
        }
        if let Some(at) = first_rejected_at {
            if now > at {
                assert!(est.test_only(now), "rejection should persist at t={now}");
            }
        }
    }
    let at = match first_rejected_at {
        Some(at) => at,
        None => panic!("sustained overload was never rejected"),
    };
    assert!(at <= 500 * MS, "first rejection too late: {at}ns");
}

#[test]
fn test_ema_never_negative() {
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    // Mixed observations, pure tests, and long gaps
    let mut now = 0u64;
    for step in [MS, 500 * MS, 3 * SEC, 1, 0, 100 * MS] {
        now += step;
        est.observe_and_test(now);
        est.test_only(now);
        assert!(est.current_rate_per_second() >= 0.0);
    }
}

#[test]
fn test_alpha_one_overwrites_previous_window() {
    // With alpha = 1 each flushed window fully replaces the EMA.
    let mut est = factory(10, 100, 1.0).new_estimator(0);
    // One sample, flushed by a pure test a full period later: rate = 10/s
    est.observe_and_test(0);
    est.test_only(100 * MS);
    assert!((est.current_rate_per_second() - 10.0).abs() < 1e-9);

    // A later quiet window of the same length overwrites it with zero
    est.test_only(200 * MS);
    assert!(est.current_rate_per_second().abs() < 1e-9);
}

#[test]
fn test_zero_elapsed_uses_guessed_rate() {
    // Burst gate trips with no time elapsed: the sample count is treated as
    // one period's worth, no division by zero.
    let mut est = factory(1, 100, 0.2).new_estimator(0);
    assert!(!est.observe_and_test(0));
    // Second sample at the same instant trips count > max_rps with delta 0:
    // guessed rate = 2 samples / 100ms = 20/s, ema = 0.2 * 20 = 4 > 1
    assert!(est.observe_and_test(0));
    assert!((est.current_rate_per_second() - 4.0).abs() < 1e-9);
}

#[test]
fn test_one_millisecond_period_handles_zero_delta() {
    let mut est = factory(10, 1, 0.2).new_estimator(0);
    for _ in 0..100 {
        est.observe_and_test(0);
    }
    assert!(est.current_rate_per_second() >= 0.0);
}

#[test]
fn test_non_monotonic_now_does_not_corrupt_state() {
    // Thread skew can deliver a `now` before the window anchor; the window
    // must not be reset into the past.
    let mut est = factory(10, 100, 0.2).new_estimator(SEC);
    est.observe_and_test(SEC);
    // A few microseconds earlier than the anchor
    est.observe_and_test(SEC - 5_000);
    est.test_only(SEC - 5_000);
    assert!(est.current_rate_per_second() >= 0.0);

    // Normal operation continues afterwards
    assert!(!est.observe_and_test(SEC + 100 * MS));
}

#[test]
fn test_idle_implies_not_exceeded() {
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    est.observe_and_test(0);
    // The first quiet flush folds the lone sample in; the next one decays
    // the estimate away entirely
    assert!(!est.test_only(10 * SEC));
    assert!(est.is_idle(20 * SEC));
    assert!(!est.test_only(20 * SEC));
}

#[test]
fn test_busy_estimator_is_not_idle() {
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    for i in 0..50u64 {
        est.observe_and_test(i * 10 * MS);
    }
    assert!(!est.is_idle(500 * MS));
}

#[test]
fn test_estimator_decays_to_idle_after_silence() {
    let mut est = factory(10, 100, 0.2).new_estimator(0);
    // Drive the rate well above the limit
    for i in 0..100u64 {
        est.observe_and_test(i * MS);
    }
    assert!(est.test_only(100 * MS));
    // Two seconds of silence: one flush covers 2s with zero samples and the
    // adjusted alpha clamps to 1, so the estimate collapses
    assert!(est.is_idle(100 * MS + 2 * SEC));
}
