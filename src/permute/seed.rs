//! Seed normalization

use crate::error::{BucketForgeError, Result};

use super::MULTI_LABEL_SUFFIXES;

/// How a seed was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    Domain,
    Keyword,
}

impl std::fmt::Display for SeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedKind::Domain => write!(f, "domain"),
            SeedKind::Keyword => write!(f, "keyword"),
        }
    }
}

/// A normalized seed, immutable once parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    kind: SeedKind,
    raw: String,
    host: String,
    tokens: Vec<String>,
}

impl Seed {
    /// Parse a domain seed.
    ///
    /// Accepts bare hosts as well as URLs; scheme, credentials, port, path,
    /// a leading `www.` and the public suffix are stripped before the
    /// remaining labels are split into tokens.
    pub fn domain(input: &str) -> Result<Self> {
        let lowered = input.trim().to_lowercase();
        let mut rest = lowered.as_str();

        if let Some(idx) = rest.find("://") {
            rest = &rest[idx + 3..];
        }
        if let Some(idx) = rest.find(['/', '?', '#']) {
            rest = &rest[..idx];
        }
        if let Some((_, host)) = rest.rsplit_once('@') {
            rest = host;
        }
        if let Some((host, port)) = rest.rsplit_once(':') {
            if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
                return Err(BucketForgeError::seed(input, "unsupported port or IPv6 literal"));
            }
            rest = host;
        }

        let host = rest.trim_end_matches('.');
        let host = host.strip_prefix("www.").unwrap_or(host);

        if let Some(bad) = host.chars().find(|c| !is_seed_char(*c)) {
            return Err(BucketForgeError::seed(
                input,
                format!("character '{}' cannot appear in a domain", bad),
            ));
        }

        let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
        let suffix_len = public_suffix_len(&labels);
        let name_labels = &labels[..labels.len() - suffix_len];

        let tokens = name_labels
            .iter()
            .flat_map(|label| split_tokens(label))
            .collect();

        Ok(Self {
            kind: SeedKind::Domain,
            raw: input.trim().to_string(),
            host: labels.join("."),
            tokens,
        })
    }

    /// Parse a keyword seed
    pub fn keyword(input: &str) -> Result<Self> {
        let lowered = input.trim().to_lowercase();

        if let Some(bad) = lowered
            .chars()
            .find(|c| !is_seed_char(*c) && !c.is_whitespace())
        {
            return Err(BucketForgeError::seed(
                input,
                format!("character '{}' cannot appear in a bucket name", bad),
            ));
        }

        let host = lowered.split_whitespace().collect::<Vec<_>>().join("-");
        let tokens = lowered
            .split(|c: char| c.is_whitespace() || c == '.')
            .flat_map(split_tokens)
            .collect();

        Ok(Self {
            kind: SeedKind::Keyword,
            raw: input.trim().to_string(),
            host,
            tokens,
        })
    }

    pub fn kind(&self) -> SeedKind {
        self.kind
    }

    /// Input as the user supplied it (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized host, public suffix kept (`example.com`)
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// True when normalization left nothing to permute
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn is_seed_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_')
}

fn split_tokens(label: &str) -> impl Iterator<Item = String> + '_ {
    label
        .split(['-', '_'])
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Number of trailing labels that form the public suffix
fn public_suffix_len(labels: &[&str]) -> usize {
    if labels.len() >= 2 {
        let last_two = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
        if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
            return 2;
        }
    }
    if labels.len() >= 2 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_domain() {
        let seed = Seed::domain("example.com").unwrap();
        assert_eq!(seed.tokens(), ["example"]);
        assert_eq!(seed.host(), "example.com");
        assert_eq!(seed.kind(), SeedKind::Domain);
    }

    #[test]
    fn test_url_parts_stripped() {
        let seed = Seed::domain("HTTPS://user@www.My-Shop.Example.com:8443/path?q=1").unwrap();
        assert_eq!(seed.host(), "my-shop.example.com");
        assert_eq!(seed.tokens(), ["my", "shop", "example"]);
    }

    #[test]
    fn test_multi_label_suffix() {
        let seed = Seed::domain("acme.co.uk").unwrap();
        assert_eq!(seed.tokens(), ["acme"]);
        assert_eq!(seed.host(), "acme.co.uk");

        let seed = Seed::domain("co.uk").unwrap();
        assert!(seed.is_empty());
    }

    #[test]
    fn test_single_label_kept() {
        let seed = Seed::domain("intranet").unwrap();
        assert_eq!(seed.tokens(), ["intranet"]);
    }

    #[test]
    fn test_all_separators_is_empty_not_error() {
        let seed = Seed::domain("...---").unwrap();
        assert!(seed.is_empty());

        let seed = Seed::keyword(" -_- ").unwrap();
        assert!(seed.is_empty());

        assert!(Seed::domain("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert!(Seed::domain("exa mple.com").is_err());
        assert!(Seed::domain("bücher.de").is_err());
        assert!(Seed::domain("[::1]:80").is_err());
        assert!(Seed::keyword("acme!").is_err());
    }

    #[test]
    fn test_keyword_tokens() {
        let seed = Seed::keyword("Acme Corp_backend").unwrap();
        assert_eq!(seed.tokens(), ["acme", "corp", "backend"]);
        assert_eq!(seed.host(), "acme-corp_backend");
        assert_eq!(seed.kind(), SeedKind::Keyword);
    }
}
