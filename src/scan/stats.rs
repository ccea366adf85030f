//! Thread-safe scan statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{Outcome, ProbeResult};

/// Point-in-time copy of a `Stats` instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub checked: u64,
    pub public_acl: u64,
    pub public_policy: u64,
    pub private: u64,
    pub not_found: u64,
    pub errors: u64,
    pub retries: u64,
    pub redirects: u64,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl StatsSnapshot {
    pub fn found_public(&self) -> u64 {
        self.public_acl + self.public_policy
    }

    /// Probes per second over the elapsed time
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.checked as f64 / secs
        } else {
            0.0
        }
    }
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Counters updated by every probe worker.
///
/// Increments are relaxed atomics; a snapshot taken mid-scan may be a few
/// results behind but never tears a single counter.
#[derive(Debug)]
pub struct Stats {
    checked: AtomicU64,
    public_acl: AtomicU64,
    public_policy: AtomicU64,
    private: AtomicU64,
    not_found: AtomicU64,
    errors: AtomicU64,
    retries: AtomicU64,
    redirects: AtomicU64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            checked: AtomicU64::new(0),
            public_acl: AtomicU64::new(0),
            public_policy: AtomicU64::new(0),
            private: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Count one finished probe
    pub fn record(&self, result: &ProbeResult) {
        self.checked.fetch_add(1, Ordering::Relaxed);

        let counter = match result.outcome {
            Outcome::PublicAcl => &self.public_acl,
            Outcome::PublicPolicy => &self.public_policy,
            Outcome::Private => &self.private,
            Outcome::NotFound => &self.not_found,
            Outcome::TransientError => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if result.attempts > 1 {
            self.retries
                .fetch_add(u64::from(result.attempts - 1), Ordering::Relaxed);
        }
        if result.redirected {
            self.redirects.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn checked(&self) -> u64 {
        self.checked.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            checked: self.checked.load(Ordering::Relaxed),
            public_acl: self.public_acl.load(Ordering::Relaxed),
            public_policy: self.public_policy.load(Ordering::Relaxed),
            private: self.private.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Holder of the live `Stats` for a run.
///
/// A reset swaps in a fresh instance; workers of a finished scan keep
/// their own `Arc` and can never write into the next seed's counters.
#[derive(Debug, Default)]
pub struct StatsBoard {
    current: RwLock<Arc<Stats>>,
}

impl StatsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Stats> {
        self.current.read().clone()
    }

    /// Replace the live stats with a fresh instance, returning the old one
    pub fn reset(&self) -> Arc<Stats> {
        std::mem::replace(&mut *self.current.write(), Arc::new(Stats::new()))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.current.read().snapshot()
    }
}
