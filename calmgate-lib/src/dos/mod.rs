//! Per-client request rate limiting.
//!
//! The gate sits in front of the forwarding handler and protects it from
//! abusive callers by limiting the request rate per remote identity.
//!
//! # Architecture
//!
//! 1. **RateEstimator** (`estimator.rs`): exponential moving average of
//!    requests/second per identity, with the smoothing factor scaled by how
//!    much time each sample window actually covered.
//!
//! 2. **Tracker** (`tracker.rs`): one per identity; pairs the estimator with
//!    an eviction deadline under a single lock.
//!
//! 3. **TrackerRegistry** (`registry.rs`): bounded concurrent map from
//!    identity to tracker. New identities are refused once the cap is hit;
//!    live entries are never evicted to make room.
//!
//! 4. **IdleSweeper** (`sweeper.rs`): background task that removes trackers
//!    whose estimator has decayed to idle.
//!
//! 5. **Rejector** (`reject.rs`): terminal handler for refused exchanges;
//!    immediate, or delayed through a bounded FIFO queue.
//!
//! 6. **DosGate** (`gate.rs`): ties the above together per request.
//!
//! # Example
//!
//! ```ignore
//! use calmgate_lib::config::DosConfig;
//! use calmgate_lib::dos::{DosGate, MonotonicClock, RequestMeta};
//!
//! let clock = MonotonicClock::new();
//! let gate = DosGate::new(&DosConfig::default(), clock)?;
//!
//! let meta = RequestMeta { begin_nanos: clock.now_nanos(), peer, connection_id };
//! match gate.check(&meta).await {
//!     None => { /* forward to the next handler */ }
//!     Some(response) => { /* exchange terminated with 420 */ }
//! }
//! ```

mod clock;
mod estimator;
mod gate;
mod identity;
mod registry;
mod reject;
mod sweeper;
mod tracker;

pub use clock::MonotonicClock;
pub use estimator::{EstimatorFactory, RateEstimator};
pub use gate::DosGate;
pub use identity::{id_fn_for, IdFn, RequestMeta};
pub use registry::TrackerRegistry;
pub use reject::{DelayedReject, ImmediateReject, Rejector};
pub use sweeper::IdleSweeper;
pub use tracker::Tracker;
