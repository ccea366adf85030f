//! Bucket probing - one read-only existence/permission check per candidate

pub mod classify;
mod endpoint;
pub mod s3;

pub use endpoint::Endpoint;
pub use s3::S3Probe;

use crate::types::ProbeResult;
use async_trait::async_trait;

/// Trait for storage-provider probes.
///
/// Implementations never fail: every error is folded into a
/// `TransientError` outcome so a single candidate cannot abort a scan.
#[async_trait]
pub trait BucketProbe: Send + Sync {
    /// Classify the bucket named `name`
    async fn probe(&self, name: &str) -> ProbeResult;

    /// Provider name used in logs
    fn provider(&self) -> &'static str;
}
