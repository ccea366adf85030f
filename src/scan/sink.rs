//! Result sinks - where classified probe results go

use parking_lot::Mutex;

use crate::types::{Outcome, ProbeResult};

/// Consumer of probe results, called from every worker
pub trait ResultSink: Send + Sync {
    fn record(&self, result: &ProbeResult);
}

/// One log line per public finding, debug lines for everything else
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn record(&self, result: &ProbeResult) {
        let detail = result.detail.as_deref().unwrap_or("");
        let region = result.region.as_deref().unwrap_or("");

        match result.outcome {
            Outcome::PublicAcl | Outcome::PublicPolicy => {
                tracing::info!(
                    bucket = %result.candidate,
                    outcome = %result.outcome,
                    region,
                    detail,
                    "Public bucket found"
                );
            }
            Outcome::Private => {
                tracing::debug!(bucket = %result.candidate, region, "Bucket exists but is private");
            }
            Outcome::NotFound => {
                tracing::trace!(bucket = %result.candidate, "No such bucket");
            }
            Outcome::TransientError => {
                tracing::debug!(
                    bucket = %result.candidate,
                    attempts = result.attempts,
                    detail,
                    "Probe failed"
                );
            }
        }
    }
}

/// Keeps results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<ProbeResult>>,
    public_only: bool,
}

impl MemorySink {
    /// Keep every result
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only `PublicAcl` and `PublicPolicy` results
    pub fn public_only() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            public_only: true,
        }
    }

    pub fn results(&self) -> Vec<ProbeResult> {
        self.results.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// Take everything recorded so far, leaving the sink empty
    pub fn drain(&self) -> Vec<ProbeResult> {
        std::mem::take(&mut *self.results.lock())
    }
}

impl ResultSink for MemorySink {
    fn record(&self, result: &ProbeResult) {
        if self.public_only && !result.outcome.is_public() {
            return;
        }
        self.results.lock().push(result.clone());
    }
}

/// Forwards each result to two sinks
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: ResultSink, B: ResultSink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: ResultSink, B: ResultSink> ResultSink for Tee<A, B> {
    fn record(&self, result: &ProbeResult) {
        self.first.record(result);
        self.second.record(result);
    }
}

impl<S: ResultSink + ?Sized> ResultSink for std::sync::Arc<S> {
    fn record(&self, result: &ProbeResult) {
        (**self).record(result)
    }
}
