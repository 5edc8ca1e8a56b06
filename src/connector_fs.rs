//! Directory source: topic records stored as JSON files.
//!
//! Each matching file holds either a single record object or an array of
//! records. Files are visited in sorted relative-path order so rebuilds
//! see the same record order every time.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::path::Path;
use topic_index_core::RawTopic;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::traits::{SourceRecord, TopicSource};

pub struct DirectorySource {
    config: SourceConfig,
}

impl DirectorySource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TopicSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn scan(&self) -> Result<Vec<SourceRecord>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || scan_directory(&config)).await?
    }
}

pub fn scan_directory(config: &SourceConfig) -> Result<Vec<SourceRecord>> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Topic source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel_str = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((rel_str, path.to_path_buf()));
    }
    files.sort();

    let mut records = Vec::new();
    for (rel, path) in &files {
        let parsed = read_records(path).with_context(|| format!("Failed to load {}", rel))?;
        debug!(file = %rel, records = parsed.len(), "loaded topic file");
        let single = parsed.len() == 1;
        for (i, record) in parsed.into_iter().enumerate() {
            let origin = if single {
                rel.clone()
            } else {
                format!("{}#{}", rel, i)
            };
            records.push(SourceRecord { origin, record });
        }
    }

    Ok(records)
}

fn read_records(path: &Path) -> Result<Vec<RawTopic>> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item).with_context(|| format!("record {} is not a topic object", i))
            })
            .collect(),
        Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
        _ => bail!("expected a topic object or an array of topic objects"),
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
