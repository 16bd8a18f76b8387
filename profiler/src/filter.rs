//! Concurrent method name filter set
//!
//! Filters restrict which methods are aggregated. The set is mutated from
//! arbitrary control threads while the poll loop reads it on the drain path,
//! so the patterns live behind an `RwLock`. An empty set matches everything.

use crate::error::ProfilerError;
use regex::Regex;
use std::sync::RwLock;

/// A set of compiled method name patterns.
#[derive(Debug, Default)]
pub struct FilterSet {
    patterns: RwLock<Vec<Regex>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile an initial pattern list. Fails on the first malformed pattern.
    pub fn with_patterns(patterns: &[String]) -> Result<Self, ProfilerError> {
        let set = Self::new();
        for pattern in patterns {
            set.add(pattern)?;
        }
        Ok(set)
    }

    /// Add a filter pattern. Returns `false` if an identical pattern is
    /// already present (a duplicate changes nothing).
    pub fn add(&self, pattern: &str) -> Result<bool, ProfilerError> {
        let compiled = Regex::new(pattern).map_err(|source| ProfilerError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let mut patterns = self.patterns.write().unwrap();
        if patterns.iter().any(|p| p.as_str() == pattern) {
            return Ok(false);
        }
        patterns.push(compiled);
        Ok(true)
    }

    /// Remove a pattern by its source string. Removing a pattern that was
    /// never added is a no-op; returns whether anything was removed.
    pub fn remove(&self, pattern: &str) -> bool {
        let mut patterns = self.patterns.write().unwrap();
        let before = patterns.len();
        patterns.retain(|p| p.as_str() != pattern);
        patterns.len() < before
    }

    /// Remove all patterns.
    pub fn clear(&self) {
        self.patterns.write().unwrap().clear();
    }

    /// Whether `method` passes the filter set. An empty set matches all
    /// methods; otherwise at least one pattern must match.
    pub fn matches(&self, method: &str) -> bool {
        let patterns = self.patterns.read().unwrap();
        patterns.is_empty() || patterns.iter().any(|p| p.is_match(method))
    }

    /// The pattern source strings currently in effect.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns
            .read()
            .unwrap()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_matches_everything() {
        let filters = FilterSet::new();
        assert!(filters.matches("pkg.Foo.bar"));
        assert!(filters.matches(""));
    }

    #[test]
    fn test_pattern_filtering() {
        let filters = FilterSet::new();
        filters.add(r"^pkg\.Foo\.").unwrap();
        assert!(filters.matches("pkg.Foo.bar"));
        assert!(!filters.matches("pkg.Baz.qux"));
    }

    #[test]
    fn test_any_pattern_matches() {
        let filters =
            FilterSet::with_patterns(&[r"^pkg\.Foo\.".to_string(), r"^pkg\.Baz\.".to_string()])
                .unwrap();
        assert!(filters.matches("pkg.Foo.bar"));
        assert!(filters.matches("pkg.Baz.qux"));
        assert!(!filters.matches("other.Thing.run"));
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let filters = FilterSet::new();
        assert!(filters.add(r"^pkg\.").unwrap());
        assert!(!filters.add(r"^pkg\.").unwrap());
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let filters = FilterSet::new();
        assert!(!filters.remove(r"^never\.added"));
        filters.add(r"^pkg\.").unwrap();
        assert!(filters.remove(r"^pkg\."));
        assert!(filters.is_empty());
    }

    #[test]
    fn test_clear() {
        let filters = FilterSet::with_patterns(&[r"a".to_string(), r"b".to_string()]).unwrap();
        filters.clear();
        assert!(filters.is_empty());
        assert!(filters.matches("anything"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let filters = FilterSet::new();
        assert!(filters.add(r"pkg\.(").is_err());
        assert!(filters.is_empty());
    }

    #[test]
    fn test_patterns_listing() {
        let filters = FilterSet::new();
        filters.add(r"^a\.").unwrap();
        filters.add(r"^b\.").unwrap();
        assert_eq!(filters.patterns(), vec![r"^a\.", r"^b\."]);
    }
}
