//! Per-run membership tracking for generated candidates

use std::collections::HashSet;

/// Set of candidates already emitted in the current run.
///
/// Owned by the generator alone, so no locking.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `candidate`; returns false if it was already seen
    pub fn insert(&mut self, candidate: &str) -> bool {
        if self.seen.contains(candidate) {
            return false;
        }
        self.seen.insert(candidate.to_string())
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.seen.contains(candidate)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_once() {
        let mut set = DedupSet::new();
        assert!(set.insert("example"));
        assert!(!set.insert("example"));
        assert!(set.insert("example-backup"));
        assert_eq!(set.len(), 2);
        assert!(set.contains("example"));
    }

    #[test]
    fn test_clear() {
        let mut set = DedupSet::new();
        set.insert("example");
        set.clear();
        assert!(set.is_empty());
        assert!(set.insert("example"));
    }
}
