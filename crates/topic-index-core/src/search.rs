//! Query planner and executor.
//!
//! A query runs entirely against one published [`IndexSnapshot`], so it
//! sees a single consistent index state no matter what writers do
//! meanwhile.
//!
//! # Algorithm
//!
//! 1. Reject `page < 0`, `page_size <= 0`, or `page_size > max_page_size`.
//! 2. Candidate set = facet filter result, or every topic when no facet
//!    constrains the query.
//! 3. Blank text: candidates in id order (stable pagination).
//!    Text with no indexable token: candidates whose title equals the
//!    text, in id order.
//!    Otherwise: rank candidates through the inverted index, then drop
//!    hits missing any quoted phrase.
//! 4. Count requested facets over the full matched set.
//! 5. Slice `[page × page_size, (page + 1) × page_size)`; a slice past the
//!    end is empty, not an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::QueryLimits;
use crate::error::{IndexError, Result};
use crate::facet::{FacetCount, FacetFilters};
use crate::index::IndexSnapshot;
use crate::models::{Field, TopicId};
use crate::tokenize::Tokenizer;

/// All inputs for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free text; may contain `"quoted phrases"`. Blank means facets only.
    pub text: String,
    pub facets: FacetFilters,
    /// Zero-based page number.
    pub page: i64,
    pub page_size: i64,
    /// Populate [`ScoreExplanation`] on each hit.
    pub explain: bool,
    /// Facet keys to count over the matched set.
    pub count_facets: Vec<String>,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            facets: FacetFilters::new(),
            page: 0,
            page_size: QueryLimits::default().default_page_size,
            explain: false,
            count_facets: Vec::new(),
        }
    }

    pub fn with_facet(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn with_page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_facet_counts(mut self, key: impl Into<String>) -> Self {
        self.count_facets.push(key.into());
        self
    }
}

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: TopicId,
    pub title: String,
    /// Text relevance; `0.0` for facet-only queries.
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreExplanation>,
}

/// Scoring breakdown for a hit.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreExplanation {
    /// Distinct query terms found in the topic.
    pub matched_terms: usize,
    /// Distinct query terms in the request.
    pub query_terms: usize,
    /// Fields where any query term occurred.
    pub fields: Vec<Field>,
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total: usize,
    pub page: i64,
    pub page_size: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub facet_counts: BTreeMap<String, Vec<FacetCount>>,
}

impl SearchPage {
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }
}

struct Ranked {
    id: TopicId,
    score: f64,
    explain: Option<ScoreExplanation>,
}

/// Run `req` against `snapshot`.
pub fn execute(
    snapshot: &IndexSnapshot,
    tokenizer: &Tokenizer,
    limits: &QueryLimits,
    req: &SearchRequest,
) -> Result<SearchPage> {
    check_pagination(limits, req)?;

    let candidates = snapshot.facets().filter_all(&req.facets);

    let ranked: Vec<Ranked> = if req.text.trim().is_empty() {
        let ids: Vec<TopicId> = match candidates {
            Some(set) => set.into_iter().collect(),
            None => snapshot.ids().cloned().collect(),
        };
        ids.into_iter()
            .map(|id| Ranked {
                id,
                score: 0.0,
                explain: None,
            })
            .collect()
    } else {
        let parsed = tokenizer.parse_query(&req.text);
        if parsed.is_empty() {
            let matches = title_matches(snapshot, candidates.as_ref(), &req.text, req.explain);
            return finish(snapshot, req, matches);
        }
        let query_terms = parsed.terms.len();
        snapshot
            .text()
            .search(&parsed.terms, candidates.as_ref())
            .into_iter()
            .filter(|hit| {
                parsed
                    .phrases
                    .iter()
                    .all(|phrase| snapshot.text().phrase_match(&hit.id, phrase))
            })
            .map(|hit| Ranked {
                explain: req.explain.then(|| ScoreExplanation {
                    matched_terms: hit.matched_terms,
                    query_terms,
                    fields: hit.fields.iter().copied().collect(),
                }),
                id: hit.id,
                score: hit.score,
            })
            .collect()
    };

    finish(snapshot, req, ranked)
}

/// Topics whose title equals `text` ignoring case and runs of whitespace,
/// in id order. Used when the text has no indexable token, so a title
/// like `"?"` stays findable by its exact text.
fn title_matches(
    snapshot: &IndexSnapshot,
    candidates: Option<&BTreeSet<TopicId>>,
    text: &str,
    explain: bool,
) -> Vec<Ranked> {
    let wanted = fold_title(text);
    let ids: Vec<&TopicId> = match candidates {
        Some(set) => set.iter().collect(),
        None => snapshot.ids().collect(),
    };
    ids.into_iter()
        .filter(|id| {
            snapshot
                .get(id.as_str())
                .is_some_and(|t| fold_title(&t.title) == wanted)
        })
        .map(|id| Ranked {
            id: id.clone(),
            score: 0.0,
            explain: explain.then(|| ScoreExplanation {
                matched_terms: 0,
                query_terms: 0,
                fields: vec![Field::Title],
            }),
        })
        .collect()
}

fn fold_title(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Count facets over `ranked` and cut the requested page.
fn finish(snapshot: &IndexSnapshot, req: &SearchRequest, ranked: Vec<Ranked>) -> Result<SearchPage> {
    let total = ranked.len();

    let mut facet_counts = BTreeMap::new();
    if !req.count_facets.is_empty() {
        let matched: BTreeSet<TopicId> = ranked.iter().map(|r| r.id.clone()).collect();
        for key in &req.count_facets {
            facet_counts.insert(key.clone(), snapshot.facets().counts(key, Some(&matched)));
        }
    }

    // Offsets that overflow are necessarily past the end.
    let start = usize::try_from(req.page)
        .ok()
        .zip(usize::try_from(req.page_size).ok())
        .and_then(|(p, s)| p.checked_mul(s))
        .unwrap_or(usize::MAX);
    let page_size = req.page_size as usize;

    let hits = ranked
        .into_iter()
        .skip(start)
        .take(page_size)
        .map(|r| SearchHit {
            title: snapshot
                .get(r.id.as_str())
                .map(|t| t.title.clone())
                .unwrap_or_default(),
            id: r.id,
            score: r.score,
            explain: r.explain,
        })
        .collect();

    Ok(SearchPage {
        hits,
        total,
        page: req.page,
        page_size: req.page_size,
        facet_counts,
    })
}

fn check_pagination(limits: &QueryLimits, req: &SearchRequest) -> Result<()> {
    if req.page < 0 {
        return Err(IndexError::InvalidQuery(format!(
            "page must be >= 0, got {}",
            req.page
        )));
    }
    if req.page_size <= 0 {
        return Err(IndexError::InvalidQuery(format!(
            "page_size must be > 0, got {}",
            req.page_size
        )));
    }
    if req.page_size > limits.max_page_size {
        return Err(IndexError::InvalidQuery(format!(
            "page_size must be <= {}, got {}",
            limits.max_page_size, req.page_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::index::TopicIndex;
    use crate::models::{RawCodeExample, RawTopic};

    fn topic(id: &str, title: &str, lang: Option<&str>) -> RawTopic {
        RawTopic {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            code_examples: lang
                .map(|l| {
                    vec![RawCodeExample {
                        title: Some("Example".to_string()),
                        language: Some(l.to_string()),
                        code: Some("...".to_string()),
                        ..Default::default()
                    }]
                })
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    fn index() -> TopicIndex {
        let index = TopicIndex::new(IndexConfig::default());
        index
            .rebuild_all(&[
                topic("goroutines", "Goroutines and Channels", Some("go")),
                topic("ownership", "Ownership and Borrowing", Some("rust")),
                topic("tcp-handshake", "TCP Handshake", Some("go")),
                topic("event-loop", "The Event Loop", Some("javascript")),
                topic("b-trees", "B-Trees", None),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_rejects_bad_pagination() {
        let index = index();
        for (page, size) in [(-1, 10), (0, 0), (0, -5), (0, 101)] {
            let err = index
                .search(&SearchRequest::new("go").with_page(page, size))
                .unwrap_err();
            assert!(matches!(err, IndexError::InvalidQuery(_)), "{page}/{size}");
        }
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let index = index();
        let page = index
            .search(&SearchRequest::new("").with_page(10, 10))
            .unwrap();
        assert!(page.hits.is_empty());
        assert_eq!(page.total, 5);

        let huge = index
            .search(&SearchRequest::new("").with_page(i64::MAX, 100))
            .unwrap();
        assert!(huge.hits.is_empty());
    }

    #[test]
    fn test_blank_text_lists_candidates_in_id_order() {
        let index = index();
        let page = index.search(&SearchRequest::new("  ")).unwrap();
        assert_eq!(
            page.ids(),
            vec!["b-trees", "event-loop", "goroutines", "ownership", "tcp-handshake"]
        );
        assert!(page.hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_text_restricted_to_facets() {
        let index = index();
        let page = index
            .search(&SearchRequest::new("handshake goroutines ownership").with_facet("language", "go"))
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(!page.ids().contains(&"ownership"));
    }

    #[test]
    fn test_unknown_facet_key_matches_nothing() {
        let index = index();
        let page = index
            .search(&SearchRequest::new("").with_facet("difficulty", "easy"))
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_phrase_filters_hits() {
        let index = index();
        let loose = index.search(&SearchRequest::new("event loop")).unwrap();
        assert_eq!(loose.ids(), vec!["event-loop"]);
        let phrase = index.search(&SearchRequest::new(r#""loop event""#)).unwrap();
        assert_eq!(phrase.total, 0);
        let exact = index.search(&SearchRequest::new(r#""event loop""#)).unwrap();
        assert_eq!(exact.ids(), vec!["event-loop"]);
    }

    #[test]
    fn test_text_without_usable_tokens_and_no_title_match_is_empty() {
        let index = index();
        let page = index.search(&SearchRequest::new("?! x")).unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_untokenizable_text_falls_back_to_exact_title() {
        let index = index();
        index.ingest(&topic("question-mark", "?", Some("go"))).unwrap();
        index.ingest(&topic("question-mark-rs", "?", Some("rust"))).unwrap();

        let page = index
            .search(&SearchRequest::new(" ? ").with_explain(true))
            .unwrap();
        assert_eq!(page.ids(), vec!["question-mark", "question-mark-rs"]);
        let explain = page.hits[0].explain.as_ref().unwrap();
        assert_eq!(explain.fields, vec![Field::Title]);
        assert_eq!(page.hits[0].score, 0.0);

        let page = index
            .search(&SearchRequest::new("?").with_facet("language", "rust"))
            .unwrap();
        assert_eq!(page.ids(), vec!["question-mark-rs"]);
    }

    #[test]
    fn test_explain_and_facet_counts() {
        let index = index();
        let page = index
            .search(
                &SearchRequest::new("and")
                    .with_explain(true)
                    .with_facet_counts("language"),
            )
            .unwrap();
        assert_eq!(page.total, 2);
        let explain = page.hits[0].explain.as_ref().unwrap();
        assert_eq!(explain.matched_terms, 1);
        assert_eq!(explain.query_terms, 1);
        assert_eq!(explain.fields, vec![Field::Title]);

        let counts = &page.facet_counts["language"];
        let values: Vec<&str> = counts.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["go", "rust"]);
    }

    #[test]
    fn test_hits_carry_titles() {
        let index = index();
        let page = index.search(&SearchRequest::new("b trees")).unwrap();
        assert_eq!(page.hits[0].title, "B-Trees");
    }
}
