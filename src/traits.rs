//! Extension trait for topic record sources.
//!
//! The CLI loads records through [`TopicSource`], so a library user can
//! feed the index from anywhere (a database, an HTTP API, fixtures) by
//! implementing one async method.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  TopicSource                 │
//! │  ┌───────────┐ ┌──────────┐  │
//! │  │ Directory │ │  Custom  │  │
//! │  │  (*.json) │ │  (Rust)  │  │
//! │  └───────────┘ └──────────┘  │
//! └──────────────┬───────────────┘
//!                ▼
//!      load_index() → TopicIndex::rebuild_all
//! ```

use anyhow::Result;
use async_trait::async_trait;
use topic_index_core::RawTopic;

/// A raw record plus where it came from, for error reporting.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Human-readable location, e.g. `networking/tcp.json#2`.
    pub origin: String,
    pub record: RawTopic,
}

/// A provider of raw topic records.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use topic_index::traits::{SourceRecord, TopicSource};
///
/// struct Fixed(Vec<SourceRecord>);
///
/// #[async_trait]
/// impl TopicSource for Fixed {
///     fn name(&self) -> &str { "fixed" }
///
///     async fn scan(&self) -> Result<Vec<SourceRecord>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait TopicSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Return every record the source currently holds, in a stable order.
    /// Records are not validated here.
    async fn scan(&self) -> Result<Vec<SourceRecord>>;
}

/// A fixed list of records, handy for embedding and tests.
pub struct StaticSource {
    records: Vec<SourceRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<RawTopic>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| SourceRecord {
                origin: format!("static#{}", i),
                record,
            })
            .collect();
        Self { records }
    }
}

#[async_trait]
impl TopicSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn scan(&self) -> Result<Vec<SourceRecord>> {
        Ok(self.records.clone())
    }
}
