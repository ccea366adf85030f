//! Bucket Forge - public S3 bucket discovery
//!
//! Generates plausible bucket names from a domain or keyword seed and probes
//! each one anonymously, reporting buckets whose ACL or policy makes them
//! public.

pub mod account;
pub mod error;
pub mod permute;
pub mod probe;
pub mod runner;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use error::{BucketForgeError, Result};
pub use types::{Outcome, ProbeResult, RunConfig, ScanConfig, SeedMode};

// Re-export main functionality
pub use permute::{PermutationEngine, RuleCatalog, Seed};
pub use probe::{BucketProbe, S3Probe};
pub use runner::{RunSummary, Runner, SeedReport};
pub use scan::{ScanCoordinator, ScanReport, Stats, StatsSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
