//! S3 bucket naming rules

use crate::error::{BucketForgeError, Result};
use regex::Regex;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 63;

const RESERVED_PREFIXES: &[&str] = &["xn--", "sthree-", "amzn-s3-demo-"];
const RESERVED_SUFFIXES: &[&str] = &["-s3alias", "--ol-s3", ".mrap", "--x-s3"];

/// Validator for general-purpose S3 bucket names
#[derive(Debug, Clone)]
pub struct BucketNameRules {
    shape: Regex,
    ipv4: Regex,
}

impl BucketNameRules {
    pub fn new() -> Self {
        Self {
            shape: Regex::new(r"^[a-z0-9][a-z0-9.-]*[a-z0-9]$")
                .expect("static bucket name pattern"),
            ipv4: Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("static ipv4 pattern"),
        }
    }

    /// Validate a candidate, explaining the first violated rule
    pub fn validate(&self, name: &str) -> Result<()> {
        if name.len() < MIN_LEN {
            return Err(invalid(name, "shorter than 3 characters"));
        }
        if name.len() > MAX_LEN {
            return Err(invalid(name, "longer than 63 characters"));
        }
        if !self.shape.is_match(name) {
            return Err(invalid(
                name,
                "must use a-z, 0-9, '.', '-' and start and end with a letter or digit",
            ));
        }
        if name.contains("..") {
            return Err(invalid(name, "contains consecutive dots"));
        }
        if name.contains(".-") || name.contains("-.") {
            return Err(invalid(name, "dot adjacent to hyphen"));
        }
        if self.ipv4.is_match(name) {
            return Err(invalid(name, "formatted as an IP address"));
        }
        if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| name.starts_with(*p)) {
            return Err(invalid(name, format!("reserved prefix '{}'", prefix)));
        }
        if let Some(suffix) = RESERVED_SUFFIXES.iter().find(|s| name.ends_with(*s)) {
            return Err(invalid(name, format!("reserved suffix '{}'", suffix)));
        }
        Ok(())
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.validate(name).is_ok()
    }
}

impl Default for BucketNameRules {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> BucketForgeError {
    BucketForgeError::validation(format!("invalid bucket name '{}': {}", name, reason.into()))
}
