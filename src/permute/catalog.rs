//! Data-driven mutation rules
//!
//! A catalog is a list of templates plus the word, separator and number
//! pools their placeholders draw from. Templates reference the seed through
//! `{host}`, `{seed}` or `{token}` and may combine it with `{word}`, `{sep}`
//! and `{num}`. Adding a rule means adding a template string.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BucketForgeError, Result};

use super::{DEFAULT_NUMERIC_SUFFIXES, DEFAULT_SEPARATORS, DEFAULT_TEMPLATES, DEFAULT_WORDS};

/// Mutation rule catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCatalog {
    /// Templates, expanded in order
    pub templates: Vec<String>,
    /// Words substituted for `{word}`
    #[serde(default)]
    pub words: Vec<String>,
    /// Separators substituted for `{sep}` and used to join `{seed}` tokens
    #[serde(default)]
    pub separators: Vec<String>,
    /// `{num}` takes the values `1..=numeric_suffixes`
    #[serde(default)]
    pub numeric_suffixes: u32,
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.iter().map(|s| s.to_string()).collect(),
            words: DEFAULT_WORDS.iter().map(|s| s.to_string()).collect(),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            numeric_suffixes: DEFAULT_NUMERIC_SUFFIXES,
        }
    }
}

impl RuleCatalog {
    /// Catalog with only the given templates and no word/number pools
    pub fn with_templates<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
            words: Vec::new(),
            separators: vec!["-".to_string()],
            numeric_suffixes: 0,
        }
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let shown = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BucketForgeError::catalog(format!("cannot read catalog: {}", e), Some(shown.clone()))
        })?;

        let catalog: Self = serde_json::from_str(&content)
            .map_err(|e| BucketForgeError::catalog(e.to_string(), Some(shown.clone())))?;

        catalog.validate().map_err(|e| match e {
            BucketForgeError::Catalog { message, .. } => {
                BucketForgeError::catalog(message, Some(shown.clone()))
            }
            other => other,
        })?;

        tracing::debug!(
            path = %shown,
            templates = catalog.templates.len(),
            words = catalog.words.len(),
            "Loaded rule catalog"
        );

        Ok(catalog)
    }

    /// Serialize the catalog as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::internal_error!("Failed to serialize catalog: {}", e))
    }

    /// Check every template parses and references the seed
    pub fn validate(&self) -> Result<()> {
        if self.templates.is_empty() {
            return Err(BucketForgeError::catalog("catalog has no templates", None));
        }
        self.compile().map(|_| ())
    }

    /// Parse all templates
    pub fn compile(&self) -> Result<Vec<Template>> {
        self.templates.iter().map(|t| Template::parse(t)).collect()
    }
}

/// Placeholder kinds a template can use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Host,
    Seed,
    Token,
    Word,
    Sep,
    Num,
}

impl Slot {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "host" => Some(Slot::Host),
            "seed" => Some(Slot::Seed),
            "token" => Some(Slot::Token),
            "word" => Some(Slot::Word),
            "sep" => Some(Slot::Sep),
            "num" => Some(Slot::Num),
            _ => None,
        }
    }

    fn is_seed_derived(&self) -> bool {
        matches!(self, Slot::Host | Slot::Seed | Slot::Token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Literal(String),
    Slot(Slot),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
    slots: Vec<Slot>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut slots = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                BucketForgeError::catalog(format!("unclosed '{{' in template '{}'", source), None)
            })?;
            let name = &after[..close];
            let slot = Slot::from_name(name).ok_or_else(|| {
                BucketForgeError::catalog(
                    format!("unknown placeholder '{{{}}}' in template '{}'", name, source),
                    None,
                )
            })?;

            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            parts.push(Part::Slot(slot));
            if !slots.contains(&slot) {
                slots.push(slot);
            }
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(BucketForgeError::catalog(
                format!("stray '}}' in template '{}'", source),
                None,
            ));
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        if !slots.iter().any(Slot::is_seed_derived) {
            return Err(BucketForgeError::catalog(
                format!("template '{}' must use {{host}}, {{seed}} or {{token}}", source),
                None,
            ));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
            slots,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct slots in order of first appearance
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn parts(&self) -> &[Part] {
        &self.parts
    }
}
