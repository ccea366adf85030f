//! Producer/consumer pipeline: one generator task, N probe workers

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use super::sink::ResultSink;
use super::stats::Stats;
use crate::error::{BucketForgeError, Result};
use crate::permute::{EngineCounters, PermutationEngine};
use crate::probe::BucketProbe;
use crate::types::ScanConfig;

/// What one scan did
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Candidates handed to the queue
    pub generated: u64,
    /// Probe results routed to stats and sink
    pub results: u64,
    /// Highest number of candidates queued or being probed at once
    pub peak_in_flight: u64,
    /// Every seed normalized to an empty token set
    pub empty_seed_set: bool,
    pub counters: EngineCounters,
}

/// Candidates sent to the queue but not yet fully probed
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicI64,
    peak: AtomicI64,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> u64 {
        self.peak.load(Ordering::SeqCst).max(0) as u64
    }
}

/// Runs one seed's candidates through the probe pool.
///
/// The queue between generator and workers is bounded, so a slow probe
/// stalls generation and at most `queue_capacity + concurrency`
/// candidates exist outside the engine at any time.
pub struct ScanCoordinator {
    concurrency: usize,
    queue_capacity: usize,
    probe: Arc<dyn BucketProbe>,
    sink: Arc<dyn ResultSink>,
}

impl ScanCoordinator {
    pub fn new(
        config: &ScanConfig,
        probe: Arc<dyn BucketProbe>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        if config.concurrency == 0 {
            return Err(BucketForgeError::config("concurrency must be at least 1"));
        }
        if config.queue_capacity == 0 {
            return Err(BucketForgeError::config("queue capacity must be at least 1"));
        }

        Ok(Self {
            concurrency: config.concurrency,
            queue_capacity: config.queue_capacity,
            probe,
            sink,
        })
    }

    /// Generate and probe every candidate of `engine`, recording into `stats`.
    ///
    /// Returns only after the generator and all workers have finished.
    pub async fn scan(
        &self,
        mut engine: PermutationEngine,
        stats: Arc<Stats>,
    ) -> Result<ScanReport> {
        let empty_seed_set = engine.is_empty_seed_set();
        let (tx, rx) = mpsc::channel::<String>(self.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let in_flight = Arc::new(InFlight::default());

        tracing::debug!(
            provider = self.probe.provider(),
            concurrency = self.concurrency,
            queue_capacity = self.queue_capacity,
            "Starting scan"
        );

        let generator = {
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                let mut generated = 0u64;
                // A slot is reserved before the next candidate leaves the engine,
                // so the gauge is raised before any worker can receive it.
                while let Ok(permit) = tx.reserve().await {
                    let Some(candidate) = engine.next() else {
                        break;
                    };
                    in_flight.enter();
                    permit.send(candidate);
                    generated += 1;
                }
                (generated, engine.counters())
            })
        };

        let received = Arc::new(AtomicU64::new(0));
        let workers: Vec<_> = (0..self.concurrency)
            .map(|_| {
                let rx = Arc::clone(&rx);
                let probe = Arc::clone(&self.probe);
                let sink = Arc::clone(&self.sink);
                let stats = Arc::clone(&stats);
                let in_flight = Arc::clone(&in_flight);
                let received = Arc::clone(&received);

                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(candidate) = next else {
                            break;
                        };

                        let result = probe.probe(&candidate).await;
                        stats.record(&result);
                        sink.record(&result);
                        received.fetch_add(1, Ordering::Relaxed);
                        in_flight.leave();
                    }
                })
            })
            .collect();
        drop(rx);

        let (generated, counters) = generator.await?;

        let mut failure = None;
        for joined in join_all(workers).await {
            if let Err(e) = joined {
                failure.get_or_insert(BucketForgeError::from(e));
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let report = ScanReport {
            generated,
            results: received.load(Ordering::Relaxed),
            peak_in_flight: in_flight.peak(),
            empty_seed_set,
            counters,
        };

        tracing::debug!(
            generated = report.generated,
            results = report.results,
            peak_in_flight = report.peak_in_flight,
            "Scan finished"
        );
        Ok(report)
    }
}
