//! Exponential-moving-average request rate estimation.
//!
//! Each tracked identity owns one [`RateEstimator`]. Samples accumulate in a
//! window anchored at `sample_start_nanos`; when the window flushes, the
//! observed rate is folded into a running EMA with a smoothing factor scaled
//! by how much time the window actually covered.

use std::time::Duration;

use crate::error::{GateError, Result};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Rate below which an estimator counts as idle (requests/second).
const IDLE_RATE: f64 = 1e-4;

/// Smoothed requests-per-second estimate for a single identity.
///
/// Not synchronised; the owning tracker serialises access under its lock.
#[derive(Debug)]
pub struct RateEstimator {
    ema: f64,
    sample_count: u32,
    sample_start_nanos: u64,
    alpha: f64,
    sample_period_nanos: u64,
    max_rps: u32,
}

impl RateEstimator {
    /// Adds one sample at `now` and reports whether the rate is exceeded.
    pub fn observe_and_test(&mut self, now: u64) -> bool {
        self.test(now, true)
    }

    /// Reports whether the rate is exceeded without adding a sample.
    ///
    /// A pure test always folds the elapsed window into the EMA, so a long
    /// quiet stretch decays the estimate.
    pub fn test_only(&mut self, now: u64) -> bool {
        self.test(now, false)
    }

    /// True when the rate is not exceeded and the EMA has decayed to noise.
    pub fn is_idle(&mut self, now: u64) -> bool {
        !self.test(now, false) && self.ema <= IDLE_RATE
    }

    /// The current smoothed requests/second.
    pub fn current_rate_per_second(&self) -> f64 {
        self.ema
    }

    fn test(&mut self, now: u64, add_sample: bool) -> bool {
        if add_sample {
            self.sample_count += 1;
        }

        // Clock skew between threads can hand us a `now` slightly before the
        // window anchor; treat it as zero elapsed rather than rewinding.
        let elapsed = now.saturating_sub(self.sample_start_nanos);

        // Fold the window into the EMA when we didn't sample, the sample
        // count trips the burst gate, or the sample period has elapsed.
        if !add_sample
            || self.sample_count > self.max_rps
            || elapsed > self.sample_period_nanos
        {
            let count = f64::from(self.sample_count);
            if elapsed > 0 {
                let current_rate = count * NANOS_PER_SEC / elapsed as f64;
                // Scale alpha by how much of a sample period the window
                // covered, clamped so the EMA cannot diverge.
                let adjusted_alpha =
                    (self.alpha * elapsed as f64 / self.sample_period_nanos as f64).min(1.0);
                self.ema = adjusted_alpha * current_rate + (1.0 - adjusted_alpha) * self.ema;
            } else {
                // Zero elapsed time: treat the samples as one period's worth.
                let guessed_rate = count * NANOS_PER_SEC / self.sample_period_nanos as f64;
                self.ema = self.alpha * guessed_rate + (1.0 - self.alpha) * self.ema;
            }

            // Restart the window, never moving the anchor into the past.
            self.sample_start_nanos = self.sample_start_nanos.max(now);
            self.sample_count = 0;
        }

        self.ema > f64::from(self.max_rps)
    }
}

/// Validated parameters shared by every estimator the gate creates.
#[derive(Debug, Clone)]
pub struct EstimatorFactory {
    alpha: f64,
    sample_period_nanos: u64,
    max_rps: u32,
}

impl EstimatorFactory {
    /// Builds a factory, rejecting out-of-range parameters.
    ///
    /// `alpha` must be in (0, 1], `sample_period` in (0, 1 s], and
    /// `max_requests_per_second` non-zero.
    pub fn new(
        max_requests_per_second: u32,
        sample_period: Duration,
        alpha: f64,
    ) -> Result<Self> {
        if max_requests_per_second == 0 {
            return Err(GateError::Config("max_requests_per_second must be > 0".into()));
        }
        if sample_period.is_zero() || sample_period > Duration::from_secs(1) {
            return Err(GateError::Config(format!(
                "sample period must be in (0, 1s], got {sample_period:?}"
            )));
        }
        if alpha <= 0.0 || alpha > 1.0 {
            return Err(GateError::Config(format!("alpha must be in (0, 1], got {alpha}")));
        }
        Ok(Self {
            alpha,
            sample_period_nanos: sample_period.as_nanos() as u64,
            max_rps: max_requests_per_second,
        })
    }

    /// A fresh zero-state estimator with its window anchored at `now`.
    pub fn new_estimator(&self, now: u64) -> RateEstimator {
        RateEstimator {
            ema: 0.0,
            sample_count: 0,
            sample_start_nanos: now,
            alpha: self.alpha,
            sample_period_nanos: self.sample_period_nanos,
            max_rps: self.max_rps,
        }
    }

    pub fn max_requests_per_second(&self) -> u32 {
        self.max_rps
    }
}
