//! Run strategies - one per seed mode, sharing the scan pipeline

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::account::{AccountScanner, Credentials, PublicBuckets, SigV4Signer};
use crate::error::Result;
use crate::permute::{PermutationEngine, Seed};
use crate::probe::{BucketProbe, S3Probe};
use crate::scan::{
    LogSink, MemorySink, ResultSink, ScanCoordinator, ScanReport, StatsBoard, StatsSnapshot, Tee,
};
use crate::types::{ProbeResult, RunConfig, SeedMode};

/// Outcome of one seed's scan
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    /// Seed label (the domain, or the joined keyword list)
    pub seed: String,
    /// Stats at the end of the scan; cumulative when stats are not reset
    pub stats: StatsSnapshot,
    pub scan: ScanReport,
}

/// Everything one invocation produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: String,
    pub seeds: Vec<SeedReport>,
    /// Seeds skipped because they could not be parsed
    pub failed_seeds: u64,
    /// Public findings in the order workers reported them
    pub findings: Vec<ProbeResult>,
    /// Account mode findings
    pub account: Option<PublicBuckets>,
    /// Whether each seed started from fresh stats
    pub reset_stats_per_seed: bool,
}

impl RunSummary {
    fn new(mode: &SeedMode, reset_stats_per_seed: bool) -> Self {
        Self {
            mode: mode.to_string(),
            seeds: Vec::new(),
            failed_seeds: 0,
            findings: Vec::new(),
            account: None,
            reset_stats_per_seed,
        }
    }

    /// Candidates probed across the whole run
    pub fn total_checked(&self) -> u64 {
        self.total(|s| s.checked)
    }

    /// Public buckets found across the whole run
    pub fn total_public(&self) -> u64 {
        let account = self.account.as_ref().map_or(0, |a| a.total() as u64);
        self.total(|s| s.found_public()) + account
    }

    pub fn total_errors(&self) -> u64 {
        self.total(|s| s.errors)
    }

    fn total(&self, field: impl Fn(&StatsSnapshot) -> u64) -> u64 {
        if self.reset_stats_per_seed {
            self.seeds.iter().map(|r| field(&r.stats)).sum()
        } else {
            self.seeds.last().map_or(0, |r| field(&r.stats))
        }
    }
}

/// Drives one invocation: picks the strategy for the seed mode and feeds
/// each seed through a `ScanCoordinator`
pub struct Runner {
    probe: Arc<dyn BucketProbe>,
    sink: Arc<dyn ResultSink>,
    findings: Arc<MemorySink>,
    board: StatsBoard,
}

impl Runner {
    /// Runner with the anonymous S3 probe and log output
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        config.scan.validate()?;
        let probe = S3Probe::new(&config.scan)?;
        Ok(Self::new(Arc::new(probe), Arc::new(LogSink)))
    }

    /// Runner with a custom probe; public findings are also collected for
    /// the summary
    pub fn new(probe: Arc<dyn BucketProbe>, sink: Arc<dyn ResultSink>) -> Self {
        let findings = Arc::new(MemorySink::public_only());
        let sink: Arc<dyn ResultSink> = Arc::new(Tee::new(sink, Arc::clone(&findings)));

        Self {
            probe,
            sink,
            findings,
            board: StatsBoard::new(),
        }
    }

    /// Live stats of the scan in progress, for interrupt reporting
    pub fn current_stats(&self) -> StatsSnapshot {
        self.board.snapshot()
    }

    pub async fn run(&self, config: &RunConfig) -> Result<RunSummary> {
        self.board.reset();
        self.findings.drain();

        let mut summary = RunSummary::new(&config.mode, config.reset_stats_per_seed);
        tracing::info!(mode = %config.mode, "Starting run");

        match &config.mode {
            SeedMode::Domain { domains } => {
                self.run_domains(domains, config, &mut summary).await?;
            }
            SeedMode::Keyword { keywords } => {
                self.run_keywords(keywords, config, &mut summary).await?;
            }
            SeedMode::DomainList { path } => {
                let domains = read_domain_list(path).await?;
                tracing::info!(count = domains.len(), path = %path.display(), "Loaded domain list");
                self.run_domains(&domains, config, &mut summary).await?;
            }
            SeedMode::Account { region } => {
                summary.account = Some(self.run_account(region, config).await?);
            }
        }

        summary.findings = self.findings.drain();
        Ok(summary)
    }

    async fn run_domains(
        &self,
        domains: &[String],
        config: &RunConfig,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for (index, domain) in domains.iter().enumerate() {
            if config.reset_stats_per_seed && index > 0 {
                self.board.reset();
            }

            let seed = match Seed::domain(domain) {
                Ok(seed) => seed,
                Err(e) if e.is_seed_scoped() => {
                    tracing::warn!("Skipping seed: {}", e);
                    summary.failed_seeds += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let label = seed.host().to_string();
            summary.seeds.push(self.scan_seeds(vec![seed], label, config).await?);
        }
        Ok(())
    }

    async fn run_keywords(
        &self,
        keywords: &[String],
        config: &RunConfig,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut seeds = Vec::new();
        for keyword in keywords {
            match Seed::keyword(keyword) {
                Ok(seed) => seeds.push(seed),
                Err(e) if e.is_seed_scoped() => {
                    tracing::warn!("Skipping keyword: {}", e);
                    summary.failed_seeds += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let label = seeds
            .iter()
            .map(|s| s.raw().to_string())
            .collect::<Vec<_>>()
            .join(",");
        summary.seeds.push(self.scan_seeds(seeds, label, config).await?);
        Ok(())
    }

    async fn scan_seeds(&self, seeds: Vec<Seed>, label: String, config: &RunConfig) -> Result<SeedReport> {
        let engine = PermutationEngine::new(seeds, &config.scan.catalog)?;
        if engine.is_empty_seed_set() {
            tracing::warn!(seed = %label, "Seed has no usable tokens, nothing to scan");
        }

        tracing::info!(seed = %label, "Building permutations and probing");
        let coordinator = ScanCoordinator::new(&config.scan, Arc::clone(&self.probe), Arc::clone(&self.sink))?;
        let stats = self.board.current();
        let scan = coordinator.scan(engine, Arc::clone(&stats)).await?;
        let snapshot = stats.snapshot();

        tracing::info!(
            seed = %label,
            checked = snapshot.checked,
            found_public = snapshot.found_public(),
            private = snapshot.private,
            errors = snapshot.errors,
            elapsed_secs = snapshot.elapsed.as_secs_f64(),
            "Seed finished"
        );

        Ok(SeedReport {
            seed: label,
            stats: snapshot,
            scan,
        })
    }

    async fn run_account(&self, region: &str, config: &RunConfig) -> Result<PublicBuckets> {
        let credentials = Credentials::from_env()?;
        let scanner = AccountScanner::new(SigV4Signer::new(credentials, region), &config.scan)?;

        tracing::info!(region, "Determining public buckets");
        let found = scanner.scan().await?;
        for bucket in &found.acl {
            tracing::info!("S3 public bucket (ACL): {}", bucket);
        }
        for bucket in &found.policy {
            tracing::info!("S3 public bucket (Policy): {}", bucket);
        }
        Ok(found)
    }
}

/// Non-blank, non-comment lines of a domain list file
pub async fn read_domain_list(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        crate::config_error!("cannot read domain list {}: {}", path.display(), e)
    })?;

    Ok(parse_domain_list(&content))
}

fn parse_domain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
