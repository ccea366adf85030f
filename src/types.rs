//! Core types and structures for bucket-forge

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BucketForgeError, Result};
use crate::permute::RuleCatalog;

/// Classification of a single bucket probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Bucket exists and its ACL grants read to everyone
    PublicAcl,
    /// Bucket exists and its policy grants public access
    PublicPolicy,
    /// Bucket exists but access is denied
    Private,
    /// No bucket with this name
    NotFound,
    /// Timeout, throttling or an unexpected response
    TransientError,
}

impl Outcome {
    pub fn is_public(&self) -> bool {
        matches!(self, Outcome::PublicAcl | Outcome::PublicPolicy)
    }

    pub fn exists(&self) -> bool {
        matches!(self, Outcome::PublicAcl | Outcome::PublicPolicy | Outcome::Private)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::PublicAcl => write!(f, "public (ACL)"),
            Outcome::PublicPolicy => write!(f, "public (policy)"),
            Outcome::Private => write!(f, "private"),
            Outcome::NotFound => write!(f, "not found"),
            Outcome::TransientError => write!(f, "error"),
        }
    }
}

/// Result of probing one candidate name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub candidate: String,
    pub outcome: Outcome,
    pub detail: Option<String>,
    pub region: Option<String>,
    pub attempts: u32,
    /// Whether the probe followed a regional redirect
    pub redirected: bool,
}

impl ProbeResult {
    pub fn new(candidate: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            candidate: candidate.into(),
            outcome,
            detail: None,
            region: None,
            attempts: 1,
            redirected: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_redirect(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }
}

/// Where seeds come from for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMode {
    /// One scan per domain
    Domain { domains: Vec<String> },
    /// One scan over the whole keyword list
    Keyword { keywords: Vec<String> },
    /// Newline-delimited file of domains, one scan per line
    DomainList { path: PathBuf },
    /// Enumerate the configured account's own buckets
    Account { region: String },
}

impl std::fmt::Display for SeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedMode::Domain { .. } => write!(f, "domain"),
            SeedMode::Keyword { .. } => write!(f, "keyword"),
            SeedMode::DomainList { .. } => write!(f, "domain-list"),
            SeedMode::Account { .. } => write!(f, "account"),
        }
    }
}

/// Configuration for the permutation/probe pipeline
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of concurrent probe workers
    pub concurrency: usize,
    /// Capacity of the candidate queue between generator and workers
    pub queue_capacity: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Extra attempts for throttled or failed requests
    pub retry_attempts: u32,
    /// Base delay for exponential backoff between attempts
    pub retry_backoff: Duration,
    /// S3 endpoint used for anonymous probing
    pub endpoint: String,
    /// Mutation rules
    pub catalog: RuleCatalog,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            queue_capacity: 256,
            timeout: Duration::from_secs(10),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(250),
            endpoint: "https://s3.amazonaws.com".to_string(),
            catalog: RuleCatalog::default(),
        }
    }
}

impl ScanConfig {
    /// Reject configurations the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(BucketForgeError::config("concurrency must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(BucketForgeError::config("queue capacity must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(BucketForgeError::config("timeout must be greater than zero"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(BucketForgeError::config(format!(
                "endpoint '{}' must start with http:// or https://",
                self.endpoint
            )));
        }
        self.catalog.validate()
    }
}

/// Everything one invocation needs, owned by the top-level driver
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: SeedMode,
    pub scan: ScanConfig,
    /// Replace the stats with a fresh instance at every seed boundary
    pub reset_stats_per_seed: bool,
}

impl RunConfig {
    pub fn new(mode: SeedMode) -> Self {
        Self {
            mode,
            scan: ScanConfig::default(),
            reset_stats_per_seed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_flags() {
        assert!(Outcome::PublicAcl.is_public());
        assert!(Outcome::PublicPolicy.is_public());
        assert!(!Outcome::Private.is_public());
        assert!(Outcome::Private.exists());
        assert!(!Outcome::NotFound.exists());
        assert!(!Outcome::TransientError.exists());
    }

    #[test]
    fn test_outcome_serde() {
        let json = serde_json::to_string(&Outcome::PublicPolicy).unwrap();
        assert_eq!(json, "\"public_policy\"");
    }

    #[test]
    fn test_scan_config_validation() {
        assert!(ScanConfig::default().validate().is_ok());

        let config = ScanConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScanConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScanConfig {
            endpoint: "s3.amazonaws.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_config_defaults_reset() {
        let config = RunConfig::new(SeedMode::Keyword { keywords: vec!["acme".into()] });
        assert!(config.reset_stats_per_seed);
        assert_eq!(config.mode.to_string(), "keyword");
    }
}
