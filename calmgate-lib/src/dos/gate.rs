use std::sync::Arc;
use std::time::Duration;

use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::debug;

use crate::config::{validate_dos, DosConfig};
use crate::dos::clock::MonotonicClock;
use crate::dos::estimator::EstimatorFactory;
use crate::dos::identity::{id_fn_for, IdFn, RequestMeta};
use crate::dos::registry::TrackerRegistry;
use crate::dos::reject::Rejector;
use crate::dos::sweeper::{IdleSweeper, DEFAULT_SWEEP_INTERVAL};
use crate::dos::tracker::Tracker;

type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

/// The rate-limiting gate: derives an identity per request, consults that
/// identity's tracker, and either lets the request through or terminates it
/// via the rejection handler.
pub struct DosGate {
    registry: Arc<TrackerRegistry>,
    factory: EstimatorFactory,
    id_fn: IdFn,
    rejector: Rejector,
    sweeper: IdleSweeper,
    clock: MonotonicClock,
}

impl DosGate {
    /// Builds the gate and spawns its eviction sweeper. Must run inside a
    /// tokio runtime. Invalid configuration refuses to start.
    pub fn new(dos: &DosConfig, clock: MonotonicClock) -> crate::error::Result<Self> {
        Self::with_sweep_interval(dos, clock, DEFAULT_SWEEP_INTERVAL)
    }

    /// As [`DosGate::new`] with an explicit sweep cadence.
    pub fn with_sweep_interval(
        dos: &DosConfig,
        clock: MonotonicClock,
        sweep_interval: Duration,
    ) -> crate::error::Result<Self> {
        validate_dos(dos)?;
        let factory = EstimatorFactory::new(
            dos.max_requests_per_second,
            Duration::from_millis(dos.sample_period_ms),
            dos.alpha,
        )?;
        let registry = Arc::new(TrackerRegistry::new(dos.effective_max_trackers()));
        let sweeper = IdleSweeper::spawn(Arc::clone(&registry), clock, sweep_interval);
        Ok(Self {
            registry,
            factory,
            id_fn: id_fn_for(dos.id),
            rejector: Rejector::from_config(dos, clock),
            sweeper,
            clock,
        })
    }

    /// Replaces the configured identity policy with a custom function.
    pub fn set_id_fn(&mut self, id_fn: IdFn) {
        self.id_fn = id_fn;
    }

    /// The clock request begin times must be taken from.
    pub fn clock(&self) -> MonotonicClock {
        self.clock
    }

    /// Admission check for one request.
    ///
    /// Returns `None` when the request should be forwarded to the next
    /// handler, or `Some(response)` when it has been terminated here. With
    /// the delayed rejection handler the returned future resolves only after
    /// the exchange has been held for the configured delay.
    pub async fn check(&self, meta: &RequestMeta) -> Option<Response<RespBody>> {
        if self.registry.is_over_capacity() {
            debug!(trackers = self.registry.len(), "tracker table over capacity");
            return Some(self.rejector.reject().await);
        }

        let Some(id) = (self.id_fn)(meta) else {
            debug!("request has no identity");
            return Some(self.rejector.reject().await);
        };

        let Some(tracker) = self.registry.get_or_create(&id, || {
            Tracker::new(
                id.clone(),
                self.factory.new_estimator(meta.begin_nanos),
                meta.begin_nanos,
            )
        }) else {
            debug!(%id, "tracker table full, refusing new identity");
            return Some(self.rejector.reject().await);
        };

        if tracker.observe_and_test(meta.begin_nanos) {
            debug!(
                id = tracker.id(),
                rate = tracker.current_rate_per_second(),
                "rate exceeded"
            );
            return Some(self.rejector.reject().await);
        }

        None
    }

    /// Number of identities currently tracked.
    pub fn tracker_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether `id` currently has a tracker.
    pub fn is_tracked(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Stops the sweeper, releases everything parked in the delay queue, and
    /// clears the tracker table. No tracker outlives the gate.
    pub fn shutdown(&self) {
        self.sweeper.shutdown();
        self.rejector.drain();
        self.registry.clear();
    }
}
