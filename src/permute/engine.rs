//! Lazy candidate generator

use serde::Serialize;

use crate::error::Result;

use super::catalog::{Part, RuleCatalog, Slot, Template};
use super::{BucketNameRules, DedupSet, Seed};

/// Generation counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineCounters {
    /// Raw strings produced by template expansion
    pub expanded: u64,
    /// Candidates yielded to the caller
    pub emitted: u64,
    /// Dropped for violating naming rules
    pub invalid: u64,
    /// Dropped because they were already emitted
    pub duplicates: u64,
}

/// Deterministic, deduplicated stream of candidate bucket names.
///
/// Expansion order is seeds in input order, then templates in catalog
/// order, then placeholder values in catalog order (first placeholder
/// varies slowest). Nothing is materialized ahead of `next()`.
pub struct PermutationEngine {
    seeds: Vec<Seed>,
    templates: Vec<Template>,
    catalog: RuleCatalog,
    rules: BucketNameRules,
    dedup: DedupSet,
    seed_index: usize,
    template_index: usize,
    current: Option<Expansion>,
    counters: EngineCounters,
}

impl PermutationEngine {
    /// Create an engine over `seeds`; the dedup set spans all of them
    pub fn new(seeds: Vec<Seed>, catalog: &RuleCatalog) -> Result<Self> {
        let templates = catalog.compile()?;
        Ok(Self {
            seeds,
            templates,
            catalog: catalog.clone(),
            rules: BucketNameRules::new(),
            dedup: DedupSet::new(),
            seed_index: 0,
            template_index: 0,
            current: None,
            counters: EngineCounters::default(),
        })
    }

    /// Create an engine for a single seed
    pub fn for_seed(seed: Seed, catalog: &RuleCatalog) -> Result<Self> {
        Self::new(vec![seed], catalog)
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }

    /// True when every seed normalized to an empty token set
    pub fn is_empty_seed_set(&self) -> bool {
        self.seeds.iter().all(Seed::is_empty)
    }

    pub fn counters(&self) -> EngineCounters {
        self.counters
    }

    /// Number of distinct candidates emitted so far
    pub fn seen(&self) -> usize {
        self.dedup.len()
    }

    /// Pull up to `count` candidates
    pub fn next_batch(&mut self, count: usize) -> Vec<String> {
        self.by_ref().take(count).collect()
    }

    fn next_expansion(&mut self) -> Option<Expansion> {
        loop {
            let seed = self.seeds.get(self.seed_index)?;
            if seed.is_empty() || self.template_index >= self.templates.len() {
                self.seed_index += 1;
                self.template_index = 0;
                continue;
            }

            let template = &self.templates[self.template_index];
            self.template_index += 1;
            return Some(Expansion::new(template, seed, &self.catalog));
        }
    }
}

impl Iterator for PermutationEngine {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.next_expansion()?);
            }

            let Some(candidate) = self.current.as_mut().and_then(Expansion::next) else {
                self.current = None;
                continue;
            };
            self.counters.expanded += 1;

            if !self.rules.is_valid(&candidate) {
                self.counters.invalid += 1;
                continue;
            }
            if !self.dedup.insert(&candidate) {
                self.counters.duplicates += 1;
                continue;
            }

            self.counters.emitted += 1;
            return Some(candidate);
        }
    }
}

/// Odometer over one template's placeholder values for one seed
struct Expansion {
    parts: Vec<Part>,
    slots: Vec<Slot>,
    values: Vec<Vec<String>>,
    indices: Vec<usize>,
    exhausted: bool,
}

impl Expansion {
    fn new(template: &Template, seed: &Seed, catalog: &RuleCatalog) -> Self {
        let slots = template.slots().to_vec();
        let values: Vec<Vec<String>> = slots
            .iter()
            .map(|slot| slot_values(*slot, seed, catalog))
            .collect();
        let exhausted = values.iter().any(Vec::is_empty);

        Self {
            parts: template.parts().to_vec(),
            indices: vec![0; slots.len()],
            slots,
            values,
            exhausted,
        }
    }

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }

        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Slot(slot) => {
                    let pos = self.slots.iter().position(|s| s == slot).unwrap_or(0);
                    out.push_str(&self.values[pos][self.indices[pos]]);
                }
            }
        }

        self.advance();
        Some(out)
    }

    fn advance(&mut self) {
        for i in (0..self.indices.len()).rev() {
            self.indices[i] += 1;
            if self.indices[i] < self.values[i].len() {
                return;
            }
            self.indices[i] = 0;
        }
        self.exhausted = true;
    }
}

fn slot_values(slot: Slot, seed: &Seed, catalog: &RuleCatalog) -> Vec<String> {
    match slot {
        Slot::Host => vec![seed.host().to_string()],
        Slot::Seed => {
            if catalog.separators.is_empty() {
                return vec![seed.tokens().concat()];
            }
            unique(catalog.separators.iter().map(|sep| seed.tokens().join(sep.as_str())))
        }
        Slot::Token => unique(seed.tokens().iter().cloned()),
        Slot::Word => catalog.words.clone(),
        Slot::Sep => {
            if catalog.separators.is_empty() {
                vec![String::new()]
            } else {
                catalog.separators.clone()
            }
        }
        Slot::Num => (1..=catalog.numeric_suffixes).map(|n| n.to_string()).collect(),
    }
}

/// Order-preserving dedup of small value lists
fn unique(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
