//! Index builder/updater and the published snapshot.
//!
//! [`TopicIndex`] owns one published [`IndexSnapshot`] behind an
//! `RwLock<Arc<_>>`. Readers clone the `Arc` under a momentary read lock
//! and then query without holding any lock. Writers are serialized by a
//! separate mutex, build their changes on a private copy, and publish by
//! swapping the `Arc`, so a query observes either the old or the new
//! state in full.
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`ingest`](TopicIndex::ingest) | Validate, replace any prior version, publish |
//! | [`update`](TopicIndex::update) | Like `ingest`, but the id must already exist |
//! | [`delete`](TopicIndex::delete) | Remove a topic with all its postings and facets |
//! | [`rebuild_all`](TopicIndex::rebuild_all) | Build a shadow index from scratch, then swap |
//! | [`search`](TopicIndex::search) | Query the current snapshot |
//!
//! A panic inside a build step is caught and reported as
//! [`IndexError::Internal`]; the snapshot being built is dropped and the
//! published one is untouched.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::config::{FieldWeights, IndexConfig};
use crate::error::{IndexError, Result, ValidationError};
use crate::facet::{FacetCount, FacetIndex};
use crate::inverted::InvertedIndex;
use crate::models::{Field, RawTopic, Topic, TopicId, ValidatedTopic};
use crate::search::{self, SearchPage, SearchRequest};
use crate::tokenize::{Token, Tokenizer};
use crate::validate::validate;

/// Cooperative cancellation flag for [`TopicIndex::rebuild_all_with_cancel`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A validated topic with its field token streams, ready to index.
struct AnalyzedTopic {
    validated: ValidatedTopic,
    fields: Vec<(Field, Vec<Token>)>,
}

fn analyze(tokenizer: &Tokenizer, raw: &RawTopic) -> std::result::Result<AnalyzedTopic, ValidationError> {
    let validated = validate(raw)?;
    let fields = validated
        .topic
        .field_texts()
        .into_iter()
        .map(|(field, texts)| (field, tokenizer.tokenize_all(texts)))
        .collect();
    Ok(AnalyzedTopic { validated, fields })
}

/// One consistent, immutable-once-published state of the index.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    topics: BTreeMap<TopicId, Arc<ValidatedTopic>>,
    text: InvertedIndex,
    facets: FacetIndex,
    generation: u64,
    published_at: DateTime<Utc>,
}

impl IndexSnapshot {
    fn empty(weights: FieldWeights) -> Self {
        Self {
            topics: BTreeMap::new(),
            text: InvertedIndex::new(weights),
            facets: FacetIndex::new(),
            generation: 0,
            published_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.topics.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.get(id).map(|v| &v.topic)
    }

    /// Every topic id, in lexicographic order.
    pub fn ids(&self) -> impl Iterator<Item = &TopicId> {
        self.topics.keys()
    }

    pub fn text(&self) -> &InvertedIndex {
        &self.text
    }

    pub fn facets(&self) -> &FacetIndex {
        &self.facets
    }

    /// Incremented on every published change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    /// Replace any prior version of the topic with `analyzed`.
    fn insert(&mut self, analyzed: AnalyzedTopic) {
        let id = analyzed.validated.topic.id.clone();
        self.remove(&id);
        for (field, tokens) in &analyzed.fields {
            self.text.index(&id, *field, tokens);
        }
        for (key, value) in analyzed.validated.topic.facets() {
            self.facets.add_facet(&id, key, value);
        }
        self.topics.insert(id, Arc::new(analyzed.validated));
    }

    /// Cascade-delete a topic. Returns whether it existed.
    fn remove(&mut self, id: &TopicId) -> bool {
        self.text.remove(id);
        self.facets.remove_all(id);
        self.topics.remove(id).is_some()
    }

    /// SHA-256 over every stored topic, posting, and facet. Two snapshots
    /// with the same fingerprint hold the same index state.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (id, v) in &self.topics {
            hasher.update(id.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(v.content_hash.as_bytes());
        }
        self.text.hash_into(&mut hasher);
        self.facets.hash_into(&mut hasher);
        format!("{:x}", hasher.finalize())
    }

    pub fn stats(&self) -> IndexStats {
        let facets = self
            .facets
            .keys()
            .map(|k| (k.to_string(), self.facets.counts(k, None)))
            .collect();
        IndexStats {
            topics: self.topics.len(),
            terms: self.text.term_count(),
            postings: self.text.posting_count(),
            facet_values: self.facets.value_count(),
            facets,
            generation: self.generation,
            published_at: self.published_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            fingerprint: self.fingerprint(),
        }
    }
}

/// Summary of a published snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub topics: usize,
    pub terms: usize,
    pub postings: usize,
    pub facet_values: usize,
    pub facets: BTreeMap<String, Vec<FacetCount>>,
    pub generation: u64,
    /// ISO 8601 publish time.
    pub published_at: String,
    pub fingerprint: String,
}

/// Outcome of a successful rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub records: usize,
    pub topics: usize,
    /// Records whose id appeared again later in the batch (last one wins).
    pub duplicates: usize,
    pub generation: u64,
    pub elapsed_ms: u128,
}

/// Thread-safe topic index with single-writer, many-reader semantics.
#[derive(Debug)]
pub struct TopicIndex {
    published: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
    tokenizer: Tokenizer,
    config: IndexConfig,
}

impl TopicIndex {
    /// Build an index from a config that has already passed
    /// [`IndexConfig::check`]. Use [`try_new`](Self::try_new) for
    /// untrusted configs; a non-positive field weight makes scores NaN.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            published: RwLock::new(Arc::new(IndexSnapshot::empty(config.ranking.clone()))),
            writer: Mutex::new(()),
            tokenizer: Tokenizer::new(config.tokenizer.clone()),
            config,
        }
    }

    /// Check `config` and build an index; [`IndexError::InvalidConfig`]
    /// if any value is out of range.
    pub fn try_new(config: IndexConfig) -> Result<Self> {
        config.check().map_err(IndexError::InvalidConfig)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.published.read().clone()
    }

    /// Insert or replace a topic. Re-ingesting identical content is a no-op.
    pub fn ingest(&self, raw: &RawTopic) -> Result<TopicId> {
        self.apply(raw, false)
    }

    /// Replace an existing topic; [`IndexError::NotFound`] if the id is new.
    pub fn update(&self, raw: &RawTopic) -> Result<TopicId> {
        self.apply(raw, true)
    }

    #[instrument(skip_all, fields(id = raw.id.as_deref().unwrap_or("")))]
    fn apply(&self, raw: &RawTopic, update_only: bool) -> Result<TopicId> {
        // Analysis is pure, so it runs before taking the writer lock.
        let analyzed = guarded("analyze", || analyze(&self.tokenizer, raw))??;
        let id = analyzed.validated.topic.id.clone();

        let _writer = self.writer.lock();
        let current = self.snapshot();

        match current.topics.get(&id) {
            None if update_only => return Err(IndexError::NotFound(id.to_string())),
            Some(existing) if existing.content_hash == analyzed.validated.content_hash => {
                debug!("content unchanged, skipping");
                return Ok(id);
            }
            _ => {}
        }

        let next = guarded("upsert", || {
            let mut next = (*current).clone();
            next.insert(analyzed);
            next
        })?;
        self.publish(next, current.generation);
        debug!("topic indexed");
        Ok(id)
    }

    /// Remove a topic; [`IndexError::NotFound`] if it does not exist.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        let _writer = self.writer.lock();
        let current = self.snapshot();
        if !current.contains(id) {
            return Err(IndexError::NotFound(id.to_string()));
        }
        let id = TopicId::new(id);
        let next = guarded("delete", || {
            let mut next = (*current).clone();
            next.remove(&id);
            next
        })?;
        self.publish(next, current.generation);
        debug!("topic deleted");
        Ok(())
    }

    /// Replace the entire index with `records`. See
    /// [`rebuild_all_with_cancel`](Self::rebuild_all_with_cancel).
    pub fn rebuild_all(&self, records: &[RawTopic]) -> Result<RebuildReport> {
        self.rebuild_all_with_cancel(records, &CancelToken::new())
    }

    /// Build a shadow index from `records` and publish it in one swap.
    ///
    /// Every record is validated first (in parallel); if any fail, all
    /// their errors are returned as [`IndexError::InvalidRecords`] and
    /// nothing is published. Cancelling `cancel` at any point before the
    /// swap discards the shadow index and returns [`IndexError::Cancelled`].
    /// Queries keep running against the previous snapshot throughout.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn rebuild_all_with_cancel(
        &self,
        records: &[RawTopic],
        cancel: &CancelToken,
    ) -> Result<RebuildReport> {
        self.rebuild_observed(records, cancel, |_| {})
    }

    /// `rebuild_all_with_cancel` with a callback run after each record is
    /// inserted into the shadow index.
    fn rebuild_observed(
        &self,
        records: &[RawTopic],
        cancel: &CancelToken,
        on_insert: impl Fn(usize),
    ) -> Result<RebuildReport> {
        let started = Instant::now();
        let _writer = self.writer.lock();
        let current_generation = self.snapshot().generation;

        let analyzed: Vec<std::result::Result<AnalyzedTopic, ValidationError>> =
            guarded("analyze", || {
                records
                    .par_iter()
                    .map(|raw| analyze(&self.tokenizer, raw))
                    .collect()
            })?;
        if cancel.is_cancelled() {
            info!("rebuild cancelled after analysis");
            return Err(IndexError::Cancelled);
        }

        let mut topics = Vec::with_capacity(analyzed.len());
        let mut failures = Vec::new();
        for result in analyzed {
            match result {
                Ok(a) => topics.push(a),
                Err(e) => failures.push(e),
            }
        }
        if !failures.is_empty() {
            warn!(rejected = failures.len(), "rebuild rejected");
            return Err(IndexError::InvalidRecords(failures));
        }

        let shadow = guarded("rebuild", || {
            let mut shadow = IndexSnapshot::empty(self.config.ranking.clone());
            let mut duplicates: usize = 0;
            for (i, topic) in topics.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    return None;
                }
                if shadow.contains(topic.validated.topic.id.as_str()) {
                    duplicates += 1;
                }
                shadow.insert(topic);
                on_insert(i);
            }
            Some((shadow, duplicates))
        })?;
        let Some((shadow, duplicates)) = shadow else {
            info!("rebuild cancelled during build");
            return Err(IndexError::Cancelled);
        };
        if cancel.is_cancelled() {
            info!("rebuild cancelled before publish");
            return Err(IndexError::Cancelled);
        }

        if duplicates > 0 {
            warn!(duplicates, "duplicate ids in rebuild batch, last record wins");
        }
        let topic_count = shadow.len();
        let generation = self.publish(shadow, current_generation);
        let elapsed_ms = started.elapsed().as_millis();
        info!(topics = topic_count, generation, elapsed_ms, "index rebuilt");

        Ok(RebuildReport {
            records: records.len(),
            topics: topic_count,
            duplicates,
            generation,
            elapsed_ms,
        })
    }

    /// Run a query against the current snapshot.
    pub fn search(&self, req: &SearchRequest) -> Result<SearchPage> {
        let snapshot = self.snapshot();
        search::execute(&snapshot, &self.tokenizer, &self.config.query, req)
    }

    /// A stored topic by id.
    pub fn get(&self, id: &str) -> Option<Topic> {
        self.snapshot().get(id).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }

    /// Swap in `next` as the published snapshot. Caller holds the writer lock.
    fn publish(&self, mut next: IndexSnapshot, previous_generation: u64) -> u64 {
        next.generation = previous_generation + 1;
        next.published_at = Utc::now();
        let generation = next.generation;
        *self.published.write() = Arc::new(next);
        generation
    }
}

impl Default for TopicIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

/// Run `f`, turning a panic into [`IndexError::Internal`].
fn guarded<T>(stage: &str, f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let msg = panic_message(payload.as_ref());
        warn!(stage, error = %msg, "build step panicked, discarding");
        IndexError::Internal(format!("{} failed: {}", stage, msg))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
