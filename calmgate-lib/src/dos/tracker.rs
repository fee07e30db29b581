use parking_lot::Mutex;

use crate::dos::estimator::RateEstimator;

/// How long a tracker survives after its last admitted sample.
pub(crate) const IDLE_GRACE_NANOS: u64 = 2_000_000_000;

/// Per-identity state bundle: the identity string, its rate estimator, and
/// the eviction deadline, all guarded by one lock.
#[derive(Debug)]
pub struct Tracker {
    id: String,
    state: Mutex<TrackerState>,
}

#[derive(Debug)]
struct TrackerState {
    estimator: RateEstimator,
    expire_at_nanos: u64,
}

impl Tracker {
    pub fn new(id: String, estimator: RateEstimator, now: u64) -> Self {
        Self {
            id,
            state: Mutex::new(TrackerState {
                estimator,
                expire_at_nanos: now + IDLE_GRACE_NANOS,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds a sample at `now`, pushes the eviction deadline out by the idle
    /// grace, and reports whether the rate is exceeded. Lock-hold is O(1)
    /// arithmetic.
    pub fn observe_and_test(&self, now: u64) -> bool {
        let mut state = self.state.lock();
        state.expire_at_nanos = now + IDLE_GRACE_NANOS;
        state.estimator.observe_and_test(now)
    }

    /// Reports whether the rate is exceeded without sampling. Pure tests do
    /// not touch the deadline.
    pub fn test_only(&self, now: u64) -> bool {
        self.state.lock().estimator.test_only(now)
    }

    pub fn is_idle(&self, now: u64) -> bool {
        self.state.lock().estimator.is_idle(now)
    }

    /// True once the eviction deadline has passed.
    pub fn is_due(&self, now: u64) -> bool {
        self.state.lock().expire_at_nanos <= now
    }

    /// Pushes the deadline out again; used by the sweeper for trackers that
    /// are due but still busy.
    pub fn rearm(&self, now: u64) {
        self.state.lock().expire_at_nanos = now + IDLE_GRACE_NANOS;
    }

    /// Snapshot of the smoothed rate, for logging.
    pub fn current_rate_per_second(&self) -> f64 {
        self.state.lock().estimator.current_rate_per_second()
    }
}
