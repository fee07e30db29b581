//! Rejection handlers: how exchanges the gate refuses are answered.
//!
//! The immediate form writes the rejection status at once. The delayed form
//! parks rejected exchanges in a FIFO queue and flushes them on a periodic
//! tick, so each one waits between `delay` and `delay + delay/2` before the
//! client sees the status. Saturation drops from the head of the queue,
//! bounding memory under a flood.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::Response;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::{DosConfig, RejectMode};
use crate::dos::clock::MonotonicClock;

type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

fn empty_body() -> RespBody {
    Full::new(bytes::Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn reject_response(status: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status;
    resp
}

/// Terminal sub-handler for refused exchanges.
pub enum Rejector {
    Immediate(ImmediateReject),
    Delayed(Arc<DelayedReject>),
}

impl Rejector {
    pub fn from_config(dos: &DosConfig, clock: MonotonicClock) -> Self {
        let status =
            StatusCode::from_u16(dos.reject_status).unwrap_or(StatusCode::TOO_MANY_REQUESTS);
        match dos.reject {
            RejectMode::Immediate => Rejector::Immediate(ImmediateReject::new(status)),
            RejectMode::Delayed => Rejector::Delayed(Arc::new(DelayedReject::new(
                status,
                Duration::from_millis(dos.delay_ms),
                dos.max_delay_queue,
                clock,
            ))),
        }
    }

    /// Terminates the exchange with the rejection status. The delayed form
    /// resolves only once the exchange has been flushed from the queue.
    pub async fn reject(&self) -> Response<RespBody> {
        match self {
            Rejector::Immediate(immediate) => immediate.response(),
            Rejector::Delayed(delayed) => Arc::clone(delayed).reject().await,
        }
    }

    /// Flushes everything still queued. Used on shutdown.
    pub fn drain(&self) {
        if let Rejector::Delayed(delayed) = self {
            delayed.drain();
        }
    }
}

/// Writes the rejection status straight away. No state.
pub struct ImmediateReject {
    status: StatusCode,
}

impl ImmediateReject {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }

    pub fn response(&self) -> Response<RespBody> {
        reject_response(self.status)
    }
}

struct Pending {
    enqueued_at_nanos: u64,
    release: oneshot::Sender<()>,
}

struct DelayState {
    entries: VecDeque<Pending>,
    /// A flush tick is scheduled. Cleared when a tick finds the queue empty.
    armed: bool,
}

/// Holds rejected exchanges open for `delay` before answering them.
pub struct DelayedReject {
    status: StatusCode,
    delay: Duration,
    max_delay_queue: usize,
    clock: MonotonicClock,
    state: Mutex<DelayState>,
}

impl DelayedReject {
    pub fn new(
        status: StatusCode,
        delay: Duration,
        max_delay_queue: usize,
        clock: MonotonicClock,
    ) -> Self {
        Self {
            status,
            delay,
            max_delay_queue,
            clock,
            state: Mutex::new(DelayState { entries: VecDeque::new(), armed: false }),
        }
    }

    /// Parks the exchange until the flush tick releases it, then answers
    /// with the rejection status.
    pub async fn reject(self: Arc<Self>) -> Response<RespBody> {
        let released = Self::enqueue(&self);
        // A dropped sender just releases the exchange early; either way the
        // response below is the terminal answer.
        let _ = released.await;
        reject_response(self.status)
    }

    fn enqueue(this: &Arc<Self>) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut head_dropped = Vec::new();
        {
            let mut state = this.state.lock();
            while state.entries.len() >= this.max_delay_queue {
                if let Some(head) = state.entries.pop_front() {
                    head_dropped.push(head);
                }
            }
            if !state.armed {
                state.armed = true;
                Self::schedule_tick(this);
            }
            state.entries.push_back(Pending {
                enqueued_at_nanos: this.clock.now_nanos(),
                release: tx,
            });
        }
        // Flush outside the lock; the released tasks write their own
        // responses and must not contend with queue manipulation.
        if !head_dropped.is_empty() {
            debug!(dropped = head_dropped.len(), "delay queue saturated, dropping head");
            for pending in head_dropped {
                let _ = pending.release.send(());
            }
        }
        rx
    }

    fn schedule_tick(this: &Arc<Self>) {
        let this = Arc::clone(this);
        let interval = this.delay / 2;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            Self::on_tick(&this);
        });
    }

    fn on_tick(this: &Arc<Self>) {
        let threshold = this.clock.now_nanos().saturating_sub(this.delay.as_nanos() as u64);
        let mut due = Vec::new();
        {
            let mut state = this.state.lock();
            // FIFO: entries age from the head, so stop at the first one
            // younger than the threshold.
            loop {
                match state.entries.front() {
                    Some(pending) if pending.enqueued_at_nanos <= threshold => {
                        if let Some(pending) = state.entries.pop_front() {
                            due.push(pending);
                        }
                    }
                    _ => break,
                }
            }
            if state.entries.is_empty() {
                state.armed = false;
            } else {
                Self::schedule_tick(this);
            }
        }
        for pending in due {
            // A closed receiver means the client went away; keep walking.
            let _ = pending.release.send(());
        }
    }

    /// Releases every queued exchange at once.
    pub fn drain(&self) {
        let drained: Vec<Pending> = {
            let mut state = self.state.lock();
            state.entries.drain(..).collect()
        };
        for pending in drained {
            let _ = pending.release.send(());
        }
    }

    /// Current queue depth, for tests and logging.
    pub fn queued(&self) -> usize {
        self.state.lock().entries.len()
    }
}
