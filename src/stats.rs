//! Coordinator statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-coordinator counters
pub struct ExchangeStats {
    pub initializations: AtomicU64,
    pub registrations: AtomicU64,
    pub unmatched_registrations: AtomicU64,
    pub draws_attempted: AtomicU64,
    pub draws_completed: AtomicU64,
    pub draws_rejected: AtomicU64,
    pub resyncs: AtomicU64,
    pub resets: AtomicU64,
}

impl ExchangeStats {
    pub fn new() -> Self {
        Self {
            initializations: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            unmatched_registrations: AtomicU64::new(0),
            draws_attempted: AtomicU64::new(0),
            draws_completed: AtomicU64::new(0),
            draws_rejected: AtomicU64::new(0),
            resyncs: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExchangeStatsSnapshot {
        ExchangeStatsSnapshot {
            initializations: self.initializations.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            unmatched_registrations: self.unmatched_registrations.load(Ordering::Relaxed),
            draws_attempted: self.draws_attempted.load(Ordering::Relaxed),
            draws_completed: self.draws_completed.load(Ordering::Relaxed),
            draws_rejected: self.draws_rejected.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

impl Default for ExchangeStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeStatsSnapshot {
    pub initializations: u64,
    pub registrations: u64,
    pub unmatched_registrations: u64,
    pub draws_attempted: u64,
    pub draws_completed: u64,
    pub draws_rejected: u64,
    pub resyncs: u64,
    pub resets: u64,
}
