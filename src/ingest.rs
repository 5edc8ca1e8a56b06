//! Loading records into an index, and the `tix check` command.
//!
//! `load_index` scans a [`TopicSource`] and hands the batch to
//! [`TopicIndex::rebuild_all`] on a blocking thread. Validation failures
//! come back with the source location of every offending record.

use anyhow::{bail, Result};
use std::collections::HashMap;
use topic_index_core::error::ValidationError;
use topic_index_core::index::RebuildReport;
use topic_index_core::validate::validate;
use topic_index_core::{IndexError, TopicIndex};
use tracing::{info, warn};

use crate::config::Config;
use crate::connector_fs::DirectorySource;
use crate::traits::{SourceRecord, TopicSource};

/// Build a fresh index from the configured directory.
pub async fn load_from_config(config: &Config) -> Result<(TopicIndex, RebuildReport)> {
    let source = DirectorySource::new(config.source.clone());
    load_index(config, &source).await
}

/// Scan `source` and rebuild a new index from its records.
pub async fn load_index(
    config: &Config,
    source: &dyn TopicSource,
) -> Result<(TopicIndex, RebuildReport)> {
    let index = TopicIndex::try_new(config.index_config())?;
    let records = source.scan().await?;
    info!(source = source.name(), records = records.len(), "scanned topic source");

    let (index, outcome) = tokio::task::spawn_blocking(move || {
        let raw: Vec<_> = records.iter().map(|r| r.record.clone()).collect();
        let outcome = index.rebuild_all(&raw);
        (index, outcome.map_err(|e| (e, records)))
    })
    .await?;

    match outcome {
        Ok(report) => Ok((index, report)),
        Err((IndexError::InvalidRecords(errors), records)) => {
            for line in describe_failures(&records, &errors) {
                eprintln!("{}", line);
            }
            bail!(
                "{} of {} records failed validation; run `tix check` for details",
                errors.len(),
                records.len()
            );
        }
        Err((e, _)) => Err(e.into()),
    }
}

/// Outcome of validating every record in a source.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub records: usize,
    pub valid: usize,
    /// `(origin, error)` for each invalid record.
    pub invalid: Vec<(String, ValidationError)>,
    /// Ids defined by more than one record, with every origin.
    pub duplicates: Vec<(String, Vec<String>)>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Validate every record without building an index.
pub fn check_records(records: &[SourceRecord]) -> CheckReport {
    let mut report = CheckReport {
        records: records.len(),
        ..Default::default()
    };
    let mut origins_by_id: HashMap<String, Vec<String>> = HashMap::new();

    for r in records {
        match validate(&r.record) {
            Ok(v) => {
                report.valid += 1;
                origins_by_id
                    .entry(v.topic.id.to_string())
                    .or_default()
                    .push(r.origin.clone());
            }
            Err(e) => report.invalid.push((r.origin.clone(), e)),
        }
    }

    report.duplicates = origins_by_id
        .into_iter()
        .filter(|(_, origins)| origins.len() > 1)
        .collect();
    report.duplicates.sort();
    report
}

/// CLI entry point for `tix check`. Returns whether every record is valid.
pub async fn run_check(config: &Config) -> Result<bool> {
    let source = DirectorySource::new(config.source.clone());
    let records = source.scan().await?;
    let report = check_records(&records);

    for (origin, err) in &report.invalid {
        println!("INVALID {}", origin);
        for v in &err.violations {
            println!("    [{}] {}: {}", v.rule, v.path, v.message);
        }
    }
    for (id, origins) in &report.duplicates {
        warn!(id = %id, files = origins.len(), "duplicate topic id");
        println!("DUPLICATE {} (last wins): {}", id, origins.join(", "));
    }

    println!();
    println!(
        "{} records: {} valid, {} invalid",
        report.records,
        report.valid,
        report.invalid.len()
    );

    Ok(report.is_ok())
}

/// Pair each validation error with the origin of its record. Errors are
/// matched by topic id in batch order.
fn describe_failures(records: &[SourceRecord], errors: &[ValidationError]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut remaining = errors.iter().peekable();
    for r in records {
        let Some(err) = remaining.peek() else {
            break;
        };
        if r.record.id == err.topic_id && validate(&r.record).is_err() {
            lines.push(format!("{}: {}", r.origin, err));
            remaining.next();
        }
    }
    lines
}
