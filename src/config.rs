//! TOML configuration for the `tix` binary.
//!
//! ```toml
//! [source]
//! root = "./topics"
//! include_globs = ["**/*.json"]
//!
//! [tokenizer]
//! min_token_len = 2
//!
//! [ranking]
//! title = 3.0
//!
//! [query]
//! max_page_size = 100
//!
//! [logging]
//! filter = "topic_index=debug"
//! ```
//!
//! Only `[source].root` is required. The `[tokenizer]`, `[ranking]`, and
//! `[query]` tables map straight onto the core crate's [`IndexConfig`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use topic_index_core::config::{FieldWeights, IndexConfig, QueryLimits, TokenizerConfig};

/// Filter used when neither `RUST_LOG` nor `[logging].filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "topic_index=info,tix=info";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub ranking: FieldWeights,
    #[serde(default)]
    pub query: QueryLimits,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `"topic_index=debug"`.
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

impl Config {
    /// The subset handed to [`topic_index_core::TopicIndex::try_new`].
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            tokenizer: self.tokenizer.clone(),
            ranking: self.ranking.clone(),
            query: self.query.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.source.root.as_os_str().is_empty() {
        bail!("source.root must not be empty");
    }
    if config.source.include_globs.is_empty() {
        bail!("source.include_globs must list at least one pattern");
    }

    if let Err(msg) = config.index_config().check() {
        bail!("{}", msg);
    }

    Ok(config)
}
