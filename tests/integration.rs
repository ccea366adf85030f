//! Integration tests for bucket-forge

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bucket_forge::{
    permute::{BucketNameRules, RuleCatalog, Seed},
    scan::{MemorySink, ScanCoordinator, Stats},
    BucketForgeError, BucketProbe, Outcome, PermutationEngine, ProbeResult, RunConfig, Runner,
    ScanConfig, SeedMode,
};
use parking_lot::Mutex;

/// Fake provider: a fixed set of buckets exists, some of them public
struct FakeS3 {
    public: HashSet<&'static str>,
    private: HashSet<&'static str>,
    failing: HashSet<&'static str>,
    delay: Duration,
    probed: Mutex<Vec<String>>,
}

impl FakeS3 {
    fn new(public: &[&'static str], private: &[&'static str]) -> Self {
        Self {
            public: public.iter().copied().collect(),
            private: private.iter().copied().collect(),
            failing: HashSet::new(),
            delay: Duration::ZERO,
            probed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BucketProbe for FakeS3 {
    async fn probe(&self, name: &str) -> ProbeResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.probed.lock().push(name.to_string());

        let outcome = if self.failing.contains(name) {
            Outcome::TransientError
        } else if self.public.contains(name) {
            Outcome::PublicPolicy
        } else if self.private.contains(name) {
            Outcome::Private
        } else {
            Outcome::NotFound
        };
        ProbeResult::new(name, outcome)
    }

    fn provider(&self) -> &'static str {
        "fake-s3"
    }
}

fn run_config(mode: SeedMode) -> RunConfig {
    let mut config = RunConfig::new(mode);
    config.scan.concurrency = 4;
    config.scan.queue_capacity = 16;
    config
}

#[tokio::test]
async fn test_domain_scan_reports_public_bucket() {
    let probe = Arc::new(FakeS3::new(&["example-backup"], &["example"]));
    let runner = Runner::new(probe.clone(), Arc::new(MemorySink::new()));

    let mut config = run_config(SeedMode::Domain {
        domains: vec!["example.com".to_string()],
    });
    config.scan.catalog = RuleCatalog::with_templates(["{seed}", "{seed}-backup"]);

    let summary = runner.run(&config).await.unwrap();
    let stats = &summary.seeds[0].stats;
    assert_eq!(stats.checked, 2);
    assert_eq!(stats.found_public(), 1);
    assert_eq!(stats.private, 1);
    assert_eq!(summary.findings[0].candidate, "example-backup");
    assert_eq!(summary.findings[0].outcome, Outcome::PublicPolicy);
}

#[tokio::test]
async fn test_checked_matches_generated_without_duplicates() {
    let probe = Arc::new(FakeS3::new(&[], &[]));
    let runner = Runner::new(probe.clone(), Arc::new(MemorySink::new()));

    let summary = runner
        .run(&run_config(SeedMode::Domain {
            domains: vec!["shop.acme-corp.co.uk".to_string()],
        }))
        .await
        .unwrap();

    let report = &summary.seeds[0];
    assert!(report.scan.generated > 0);
    assert_eq!(report.stats.checked, report.scan.generated);

    let probed = probe.probed.lock().clone();
    let unique: HashSet<&String> = probed.iter().collect();
    assert_eq!(unique.len(), probed.len());

    let rules = BucketNameRules::new();
    assert!(probed.iter().all(|name| rules.is_valid(name)));
}

#[tokio::test]
async fn test_slow_probe_keeps_in_flight_bounded() {
    let probe = Arc::new(FakeS3 {
        delay: Duration::from_millis(1),
        ..FakeS3::new(&[], &[])
    });
    let config = ScanConfig {
        concurrency: 2,
        queue_capacity: 4,
        ..Default::default()
    };
    let coordinator = ScanCoordinator::new(&config, probe, Arc::new(MemorySink::new())).unwrap();
    let engine = PermutationEngine::for_seed(Seed::domain("example.com").unwrap(), &config.catalog).unwrap();

    let report = coordinator.scan(engine, Arc::new(Stats::new())).await.unwrap();
    assert!(report.generated > 6);
    assert!(report.peak_in_flight <= 6);
}

#[tokio::test]
async fn test_transient_failures_are_counted_not_fatal() {
    let probe = Arc::new(FakeS3 {
        failing: ["globex-logs", "globex-dev"].into_iter().collect(),
        ..FakeS3::new(&["globex-backup"], &[])
    });
    let runner = Runner::new(probe, Arc::new(MemorySink::new()));

    let mut config = run_config(SeedMode::Keyword {
        keywords: vec!["globex".to_string()],
    });
    config.scan.catalog =
        RuleCatalog::with_templates(["{seed}-logs", "{seed}-dev", "{seed}-backup", "{seed}"]);

    let summary = runner.run(&config).await.unwrap();
    let stats = &summary.seeds[0].stats;
    assert_eq!(stats.checked, 4);
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.not_found, 1);
    assert_eq!(summary.total_errors(), 2);
    assert_eq!(summary.total_public(), 1);
}

#[tokio::test]
async fn test_empty_keyword_checks_nothing() {
    let runner = Runner::new(Arc::new(FakeS3::new(&[], &[])), Arc::new(MemorySink::new()));
    let summary = runner
        .run(&run_config(SeedMode::Keyword {
            keywords: vec!["- _ .".to_string()],
        }))
        .await
        .unwrap();

    assert_eq!(summary.total_checked(), 0);
    assert_eq!(summary.total_public(), 0);
}

#[tokio::test]
async fn test_domain_list_resets_or_accumulates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.txt");
    std::fs::write(&path, "example.com\n# staging\nacme.org\n").unwrap();

    let mut config = run_config(SeedMode::DomainList { path });
    config.scan.catalog = RuleCatalog::with_templates(["{seed}", "{seed}-backup"]);
    let runner = Runner::new(
        Arc::new(FakeS3::new(&["acme-backup"], &[])),
        Arc::new(MemorySink::new()),
    );

    let reset = runner.run(&config).await.unwrap();
    assert_eq!(reset.seeds.len(), 2);
    assert_eq!(reset.seeds[1].stats.checked, 2);
    assert_eq!(reset.total_checked(), 4);

    config.reset_stats_per_seed = false;
    let accumulated = runner.run(&config).await.unwrap();
    assert_eq!(accumulated.seeds[1].stats.checked, 4);
    assert_eq!(accumulated.total_checked(), 4);
    assert_eq!(accumulated.total_public(), 1);
}

#[tokio::test]
async fn test_account_mode_without_credentials() {
    std::env::remove_var("AWS_ACCESS_KEY_ID");
    std::env::remove_var("AWS_SECRET_ACCESS_KEY");

    let runner = Runner::new(Arc::new(FakeS3::new(&[], &[])), Arc::new(MemorySink::new()));
    let err = runner
        .run(&run_config(SeedMode::Account {
            region: "us-east-1".to_string(),
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, BucketForgeError::Credentials { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_custom_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(
        &path,
        r#"{"templates": ["{seed}{sep}{word}"], "words": ["vault"], "separators": ["-"], "numeric_suffixes": 0}"#,
    )
    .unwrap();

    let catalog = RuleCatalog::load(&path).unwrap();
    let candidates: Vec<String> =
        PermutationEngine::for_seed(Seed::domain("https://www.acme.com/login").unwrap(), &catalog)
            .unwrap()
            .collect();
    assert_eq!(candidates, ["acme-vault"]);
}

#[test]
fn test_runner_blocking_entry() {
    let runner = Runner::new(Arc::new(FakeS3::new(&["globex-backup"], &[])), Arc::new(MemorySink::new()));
    let mut config = run_config(SeedMode::Keyword {
        keywords: vec!["globex".to_string()],
    });
    config.scan.catalog = RuleCatalog::with_templates(["{seed}-backup"]);

    let summary = tokio_test::block_on(runner.run(&config)).unwrap();
    assert_eq!(summary.total_public(), 1);
}

#[test]
fn test_library_initialization() {
    // Test that the library can be initialized without panicking
    let result = bucket_forge::init();
    assert!(result.is_ok());
}
