use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use tracing::debug;

use crate::dos::tracker::Tracker;

/// Concurrent identity -> tracker table with a hard cardinality cap.
///
/// Lookups and inserts go through sharded locks, so readers on other keys
/// are not blocked. `len()` is approximate under concurrent mutation, which
/// is adequate for the overflow test; the cap is soft by up to the number of
/// threads racing through the insert path.
#[derive(Debug)]
pub struct TrackerRegistry {
    trackers: DashMap<String, Arc<Tracker>, RandomState>,
    max_trackers: usize,
}

impl TrackerRegistry {
    pub fn new(max_trackers: usize) -> Self {
        Self {
            trackers: DashMap::with_hasher(RandomState::new()),
            max_trackers,
        }
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.trackers.contains_key(id)
    }

    /// True once the table has grown past its cap.
    pub fn is_over_capacity(&self) -> bool {
        self.trackers.len() > self.max_trackers
    }

    /// Returns the tracker for `id`, creating it with `make` if absent.
    ///
    /// Exactly one `make` wins per absent key; concurrent losers observe the
    /// winner. Returns `None` when `id` is not present and the table is at
    /// capacity: new identities are refused rather than evicting live ones.
    pub fn get_or_create<F>(&self, id: &str, make: F) -> Option<Arc<Tracker>>
    where
        F: FnOnce() -> Tracker,
    {
        if let Some(existing) = self.trackers.get(id) {
            return Some(Arc::clone(existing.value()));
        }
        if self.trackers.len() >= self.max_trackers {
            return None;
        }
        Some(Arc::clone(
            self.trackers
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(make()))
                .value(),
        ))
    }

    /// Removes every tracker that is past its deadline and idle; due-but-busy
    /// trackers get their deadline re-armed instead. Returns how many were
    /// evicted.
    ///
    /// Iteration is weakly consistent: trackers inserted mid-sweep may be
    /// missed until the next pass, which is acceptable.
    pub fn sweep(&self, now: u64) -> usize {
        let before = self.trackers.len();
        self.trackers.retain(|_, tracker| {
            if !tracker.is_due(now) {
                return true;
            }
            if tracker.is_idle(now) {
                debug!(id = tracker.id(), "evicting idle tracker");
                return false;
            }
            tracker.rearm(now);
            true
        });
        before.saturating_sub(self.trackers.len())
    }

    /// Drops every tracker. Used on shutdown.
    pub fn clear(&self) {
        self.trackers.clear();
    }
}
