//! Candidate generation - seeds in, deduplicated valid bucket names out
//!
//! A seed (domain or keyword) is normalized into tokens, expanded through the
//! data-driven rule catalog, filtered by S3 naming rules and deduplicated.

mod catalog;
mod dedup;
mod engine;
mod naming;
mod seed;

pub use catalog::{RuleCatalog, Slot, Template};
pub use dedup::DedupSet;
pub use engine::{EngineCounters, PermutationEngine};
pub use naming::BucketNameRules;
pub use seed::{Seed, SeedKind};

/// Multi-label public suffixes stripped from domain seeds.
///
/// Single-label TLDs are stripped without a lookup.
pub const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "ltd.uk", "plc.uk", "me.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "co.nz", "org.nz", "co.jp", "ne.jp", "or.jp", "co.kr", "co.in", "co.za",
    "com.br", "com.cn", "com.mx", "com.ar", "com.tr", "com.sg", "com.hk", "com.tw",
    "gov.cn", "edu.cn", "co.il", "com.my", "com.ph", "com.pl", "com.ua",
];

/// Generic words combined with seeds by the built-in catalog
pub const DEFAULT_WORDS: &[&str] = &[
    "backup", "backups", "dev", "development", "prod", "production", "staging",
    "stage", "test", "qa", "uat", "assets", "static", "media", "images", "img",
    "www", "web", "cdn", "files", "data", "logs", "archive", "uploads",
    "downloads", "public", "private", "internal", "s3", "bucket", "storage",
    "content", "docs", "db", "app", "api", "admin", "beta", "old", "tmp",
];

/// Separators the built-in catalog joins tokens and words with
pub const DEFAULT_SEPARATORS: &[&str] = &["-", ".", "_", ""];

/// Built-in mutation templates, expanded in this order
pub const DEFAULT_TEMPLATES: &[&str] = &[
    "{host}",
    "{seed}",
    "{token}",
    "{seed}{sep}{word}",
    "{word}{sep}{seed}",
    "{host}{sep}{word}",
    "{word}{sep}{host}",
    "{token}{sep}{word}",
    "{seed}{num}",
    "{seed}{sep}{num}",
    "{seed}{sep}{word}{num}",
];

/// Highest numeric suffix appended by the built-in catalog
pub const DEFAULT_NUMERIC_SUFFIXES: u32 = 3;
