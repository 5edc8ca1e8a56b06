//! Exact-match facet index.
//!
//! Maps `(key, value)` pairs to the set of topics carrying them. Keys and
//! values are trimmed and lower-cased on the way in; empty values are
//! never stored. Filters combine as AND across keys and OR within a key:
//!
//! ```text
//! language=go, language=rust, category=networking
//!   => (language=go ∪ language=rust) ∩ category=networking
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::TopicId;
use crate::validate::normalize_facet;

/// Facet filters: key to accepted values.
pub type FacetFilters = BTreeMap<String, Vec<String>>;

/// Number of candidate topics carrying one facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FacetIndex {
    values: BTreeMap<String, BTreeMap<String, BTreeSet<TopicId>>>,
    by_topic: HashMap<TopicId, BTreeSet<(String, String)>>,
}

impl FacetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `topic` with `key=value`. Returns `false` if the value was
    /// empty after normalization and nothing was stored.
    pub fn add_facet(&mut self, topic: &TopicId, key: &str, value: &str) -> bool {
        let (Some(key), Some(value)) = (normalize_facet(key), normalize_facet(value)) else {
            return false;
        };
        self.values
            .entry(key.clone())
            .or_default()
            .entry(value.clone())
            .or_default()
            .insert(topic.clone());
        self.by_topic
            .entry(topic.clone())
            .or_default()
            .insert((key, value));
        true
    }

    /// Drop every facet of `topic`. Returns whether it had any.
    pub fn remove_all(&mut self, topic: &TopicId) -> bool {
        let Some(pairs) = self.by_topic.remove(topic) else {
            return false;
        };
        for (key, value) in pairs {
            let Some(by_value) = self.values.get_mut(&key) else {
                continue;
            };
            if let Some(topics) = by_value.get_mut(&value) {
                topics.remove(topic);
                if topics.is_empty() {
                    by_value.remove(&value);
                }
            }
            if by_value.is_empty() {
                self.values.remove(&key);
            }
        }
        true
    }

    /// Topics tagged `key=value`. Unknown keys and values match nothing.
    pub fn filter(&self, key: &str, value: &str) -> BTreeSet<TopicId> {
        let (Some(key), Some(value)) = (normalize_facet(key), normalize_facet(value)) else {
            return BTreeSet::new();
        };
        self.values
            .get(&key)
            .and_then(|by_value| by_value.get(&value))
            .cloned()
            .unwrap_or_default()
    }

    /// Apply several filters. Keys that normalize alike (`Language` and
    /// `language`) are one key, so their values are ORed. Returns `None`
    /// when no filter constrains the result (no keys, or only keys with an
    /// empty value list).
    pub fn filter_all(&self, filters: &FacetFilters) -> Option<BTreeSet<TopicId>> {
        // A blank key normalizes to `None` and, like an unknown key,
        // matches nothing.
        let mut unions: BTreeMap<Option<String>, BTreeSet<TopicId>> = BTreeMap::new();
        for (key, values) in filters {
            if values.is_empty() {
                continue;
            }
            let union = unions.entry(normalize_facet(key)).or_default();
            for value in values {
                union.extend(self.filter(key, value));
            }
        }
        unions
            .into_values()
            .reduce(|acc, union| acc.intersection(&union).cloned().collect())
    }

    /// Per-value topic counts for `key`, restricted to `within` when
    /// given. Sorted by count (desc), then value.
    pub fn counts(&self, key: &str, within: Option<&BTreeSet<TopicId>>) -> Vec<FacetCount> {
        let Some(by_value) = normalize_facet(key).and_then(|k| self.values.get(&k)) else {
            return Vec::new();
        };
        let mut out: Vec<FacetCount> = by_value
            .iter()
            .map(|(value, topics)| FacetCount {
                value: value.clone(),
                count: match within {
                    Some(c) => topics.intersection(c).count(),
                    None => topics.len(),
                },
            })
            .filter(|fc| fc.count > 0)
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then(a.value.cmp(&b.value)));
        out
    }

    /// Facet keys currently in use.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of distinct `(key, value)` pairs.
    pub fn value_count(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn hash_into(&self, hasher: &mut Sha256) {
        for (key, by_value) in &self.values {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            for (value, topics) in by_value {
                hasher.update(value.as_bytes());
                hasher.update([0u8]);
                for topic in topics {
                    hasher.update(topic.as_str().as_bytes());
                    hasher.update([0u8]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TopicId {
        TopicId::new(s)
    }

    fn set(ids: &[&str]) -> BTreeSet<TopicId> {
        ids.iter().map(|s| id(s)).collect()
    }

    fn filters(pairs: &[(&str, &str)]) -> FacetFilters {
        let mut out = FacetFilters::new();
        for (k, v) in pairs {
            out.entry(k.to_string()).or_default().push(v.to_string());
        }
        out
    }

    fn sample() -> FacetIndex {
        let mut idx = FacetIndex::new();
        idx.add_facet(&id("goroutines"), "language", "go");
        idx.add_facet(&id("goroutines"), "category", "concurrency");
        idx.add_facet(&id("ownership"), "language", "rust");
        idx.add_facet(&id("ownership"), "category", "memory");
        idx.add_facet(&id("tcp-handshake"), "language", "go");
        idx.add_facet(&id("tcp-handshake"), "category", "networking");
        idx
    }

    #[test]
    fn test_values_normalized() {
        let mut idx = FacetIndex::new();
        assert!(idx.add_facet(&id("a"), " Language ", "  Go "));
        assert_eq!(idx.filter("language", "go"), set(&["a"]));
        assert_eq!(idx.filter("LANGUAGE", "GO"), set(&["a"]));
    }

    #[test]
    fn test_empty_value_dropped() {
        let mut idx = FacetIndex::new();
        assert!(!idx.add_facet(&id("a"), "tags", "   "));
        assert_eq!(idx.value_count(), 0);
        assert!(idx.filter("tags", "").is_empty());
    }

    #[test]
    fn test_or_within_key_and_across_keys() {
        let idx = sample();
        let any_lang = idx.filter_all(&filters(&[("language", "go"), ("language", "rust")]));
        assert_eq!(any_lang, Some(set(&["goroutines", "ownership", "tcp-handshake"])));

        let go_networking =
            idx.filter_all(&filters(&[("language", "go"), ("category", "networking")]));
        assert_eq!(go_networking, Some(set(&["tcp-handshake"])));
    }

    #[test]
    fn test_keys_differing_in_case_are_one_key() {
        let idx = sample();
        let mut f = filters(&[("language", "go")]);
        f.insert("Language".to_string(), vec!["rust".to_string()]);
        assert_eq!(
            idx.filter_all(&f),
            Some(set(&["goroutines", "ownership", "tcp-handshake"]))
        );

        f.insert(" CATEGORY ".to_string(), vec!["networking".to_string()]);
        assert_eq!(idx.filter_all(&f), Some(set(&["tcp-handshake"])));
    }

    #[test]
    fn test_unknown_key_matches_nothing() {
        let idx = sample();
        let r = idx.filter_all(&filters(&[("difficulty", "easy")]));
        assert_eq!(r, Some(BTreeSet::new()));
    }

    #[test]
    fn test_no_constraints_is_none() {
        let idx = sample();
        assert_eq!(idx.filter_all(&FacetFilters::new()), None);
        let mut empty_values = FacetFilters::new();
        empty_values.insert("language".to_string(), Vec::new());
        assert_eq!(idx.filter_all(&empty_values), None);
    }

    #[test]
    fn test_remove_all_cleans_empty_entries() {
        let mut idx = sample();
        assert!(idx.remove_all(&id("ownership")));
        assert!(idx.filter("language", "rust").is_empty());
        assert_eq!(idx.counts("category", None).len(), 2);
        assert!(!idx.remove_all(&id("ownership")));
        assert_eq!(idx.keys().collect::<Vec<_>>(), vec!["category", "language"]);
    }

    #[test]
    fn test_counts_within_candidates() {
        let idx = sample();
        let all = idx.counts("language", None);
        assert_eq!(
            all,
            vec![
                FacetCount { value: "go".into(), count: 2 },
                FacetCount { value: "rust".into(), count: 1 },
            ]
        );
        let within = set(&["ownership", "goroutines"]);
        let some = idx.counts("language", Some(&within));
        assert_eq!(some.len(), 2);
        assert!(some.iter().all(|c| c.count == 1));
        assert!(idx.counts("nope", None).is_empty());
    }
}
