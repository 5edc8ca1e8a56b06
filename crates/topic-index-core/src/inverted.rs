//! Positional inverted index with weighted TF-IDF ranking.
//!
//! Maps each normalized term to the topics containing it and, per topic,
//! the `(field, position)` of every occurrence. A forward map from topic
//! to its terms lets [`remove`](InvertedIndex::remove) touch only the
//! postings lists that topic appears in.
//!
//! # Scoring
//!
//! For each distinct query term `t` and topic `d`:
//!
//! ```text
//! wtf(t, d) = Σ_field weight(field) × tf(t, d, field)
//! idf(t)    = ln(1 + N / df(t))
//! score(d)  = Σ_t idf(t) × ln(1 + wtf(t, d))
//! ```
//!
//! The score grows with term frequency and shrinks with document
//! frequency. Results are ordered by the number of distinct query terms
//! matched first, so topics matching every term always rank above topics
//! matching a subset; ties break on score, then id.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use sha2::{Digest, Sha256};

use crate::config::FieldWeights;
use crate::models::{Field, TopicId};
use crate::tokenize::Token;

/// One occurrence of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub field: Field,
    pub position: u32,
}

/// A ranked text match.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    pub id: TopicId,
    pub score: f64,
    /// Number of distinct query terms found in the topic.
    pub matched_terms: usize,
    /// Fields in which any query term occurred.
    pub fields: BTreeSet<Field>,
}

#[derive(Debug, Clone)]
pub struct InvertedIndex {
    postings: BTreeMap<String, BTreeMap<TopicId, Vec<Posting>>>,
    terms_by_topic: HashMap<TopicId, BTreeSet<String>>,
    posting_count: usize,
    weights: FieldWeights,
}

impl InvertedIndex {
    pub fn new(weights: FieldWeights) -> Self {
        Self {
            postings: BTreeMap::new(),
            terms_by_topic: HashMap::new(),
            posting_count: 0,
            weights,
        }
    }

    /// Append postings for `tokens` found in `field` of `topic`.
    ///
    /// Re-indexing a topic must be preceded by [`remove`](Self::remove),
    /// otherwise occurrences are counted twice.
    pub fn index(&mut self, topic: &TopicId, field: Field, tokens: &[Token]) {
        if tokens.is_empty() {
            return;
        }
        let topic_terms = self.terms_by_topic.entry(topic.clone()).or_default();
        for token in tokens {
            self.postings
                .entry(token.text.clone())
                .or_default()
                .entry(topic.clone())
                .or_default()
                .push(Posting {
                    field,
                    position: token.position,
                });
            topic_terms.insert(token.text.clone());
            self.posting_count += 1;
        }
    }

    /// Delete every posting of `topic`. Returns whether it had any.
    pub fn remove(&mut self, topic: &TopicId) -> bool {
        let Some(terms) = self.terms_by_topic.remove(topic) else {
            return false;
        };
        for term in terms {
            if let Some(list) = self.postings.get_mut(&term) {
                if let Some(removed) = list.remove(topic) {
                    self.posting_count -= removed.len();
                }
                if list.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }

    pub fn contains(&self, topic: &TopicId) -> bool {
        self.terms_by_topic.contains_key(topic)
    }

    /// Number of topics with at least one posting.
    pub fn doc_count(&self) -> usize {
        self.terms_by_topic.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn posting_count(&self) -> usize {
        self.posting_count
    }

    /// Number of topics containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, BTreeMap::len)
    }

    /// Occurrences of `term` in `topic`, in indexing order.
    pub fn postings(&self, term: &str, topic: &TopicId) -> &[Posting] {
        self.postings
            .get(term)
            .and_then(|list| list.get(topic))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rank topics against distinct query `terms`, optionally restricted
    /// to the `within` candidate set. Empty `terms` yields no hits.
    pub fn search(&self, terms: &[String], within: Option<&BTreeSet<TopicId>>) -> Vec<TextHit> {
        if terms.is_empty() {
            return Vec::new();
        }

        let n = self.doc_count() as f64;
        let mut acc: HashMap<TopicId, TextHit> = HashMap::new();

        for term in terms {
            let Some(list) = self.postings.get(term.as_str()) else {
                continue;
            };
            let df = list.len() as f64;
            let idf = (1.0 + n.max(df) / df).ln();

            let mut score_topic = |topic: &TopicId, occurrences: &[Posting]| {
                let wtf: f64 = occurrences
                    .iter()
                    .map(|p| self.weights.weight(p.field))
                    .sum();
                let hit = acc.entry(topic.clone()).or_insert_with(|| TextHit {
                    id: topic.clone(),
                    score: 0.0,
                    matched_terms: 0,
                    fields: BTreeSet::new(),
                });
                hit.score += idf * (1.0 + wtf).ln();
                hit.matched_terms += 1;
                hit.fields.extend(occurrences.iter().map(|p| p.field));
            };

            match within {
                // Walk whichever side is smaller.
                Some(candidates) if candidates.len() < list.len() => {
                    for topic in candidates {
                        if let Some((key, occ)) = list.get_key_value(topic) {
                            score_topic(key, occ);
                        }
                    }
                }
                Some(candidates) => {
                    for (topic, occ) in list {
                        if candidates.contains(topic) {
                            score_topic(topic, occ);
                        }
                    }
                }
                None => {
                    for (topic, occ) in list {
                        score_topic(topic, occ);
                    }
                }
            }
        }

        let mut hits: Vec<TextHit> = acc.into_values().collect();
        hits.sort_by(rank_order);
        hits
    }

    /// Whether `phrase` occurs at consecutive positions of one field.
    pub fn phrase_match(&self, topic: &TopicId, phrase: &[String]) -> bool {
        let Some((first, rest)) = phrase.split_first() else {
            return true;
        };
        self.postings(first, topic).iter().any(|start| {
            rest.iter().enumerate().all(|(i, word)| {
                let want = Posting {
                    field: start.field,
                    position: start.position + i as u32 + 1,
                };
                self.postings(word, topic).contains(&want)
            })
        })
    }

    /// Feed every posting, in a canonical order, into `hasher`.
    pub(crate) fn hash_into(&self, hasher: &mut Sha256) {
        for (term, list) in &self.postings {
            hasher.update(term.as_bytes());
            hasher.update([0u8]);
            for (topic, occurrences) in list {
                hasher.update(topic.as_str().as_bytes());
                hasher.update([0u8]);
                for p in occurrences {
                    hasher.update(p.field.as_str().as_bytes());
                    hasher.update(p.position.to_le_bytes());
                }
            }
        }
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new(FieldWeights::default())
    }
}

fn rank_order(a: &TextHit, b: &TextHit) -> Ordering {
    b.matched_terms
        .cmp(&a.matched_terms)
        .then(b.score.total_cmp(&a.score))
        .then(a.id.cmp(&b.id))
}
