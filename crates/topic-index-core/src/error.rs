//! Error types for the topic index.
//!
//! Every fallible operation returns [`IndexError`]. Validation failures
//! carry the full list of rule violations so callers can fix a record in
//! one pass instead of discovering problems one at a time.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors returned by [`TopicIndex`](crate::index::TopicIndex) and the
/// components it drives.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// A single record failed validation. Nothing was applied.
    #[error("{0}")]
    Validation(ValidationError),

    /// One or more records in a rebuild batch failed validation. The
    /// published index was left untouched.
    #[error("{} record(s) failed validation", .0.len())]
    InvalidRecords(Vec<ValidationError>),

    /// The topic id does not exist and the operation requires it to.
    #[error("topic not found: {0}")]
    NotFound(String),

    /// Malformed query parameters (pagination).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Index configuration values are out of range.
    #[error("invalid index config: {0}")]
    InvalidConfig(String),

    /// Unexpected engine fault. The mutation that triggered it was discarded.
    #[error("internal index error: {0}")]
    Internal(String),

    /// A rebuild was cancelled before publishing.
    #[error("rebuild cancelled")]
    Cancelled,
}

impl From<ValidationError> for IndexError {
    fn from(err: ValidationError) -> Self {
        IndexError::Validation(err)
    }
}

/// Which validation rule a [`Violation`] breaks.
///
/// Rules are checked in declaration order; validation stops after the
/// first rule category that produced violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// A required field is missing or empty.
    Required,
    /// The topic id is not lowercase hyphen-separated.
    IdPattern,
    /// A code example lacks a language or code body.
    CodeExample,
    /// A resource URL does not parse as a URI.
    ResourceUrl,
    /// Two children of the same kind share a sub-id.
    DuplicateSubId,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rule::Required => "required",
            Rule::IdPattern => "id_pattern",
            Rule::CodeExample => "code_example",
            Rule::ResourceUrl => "resource_url",
            Rule::DuplicateSubId => "duplicate_sub_id",
        };
        f.write_str(s)
    }
}

/// One violated rule, located by a field path such as
/// `codeExamples[2].language`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: Rule,
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(rule: Rule, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A rejected record with every violation found in the failing rule
/// category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The record's id as received, if it had one.
    pub topic_id: Option<String>,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// The rule category that rejected the record.
    pub fn rule(&self) -> Option<Rule> {
        self.violations.first().map(|v| v.rule)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.topic_id {
            Some(id) => write!(f, "invalid topic '{}':", id)?,
            None => write!(f, "invalid topic (no id):")?,
        }
        for v in &self.violations {
            write!(f, " [{}] {}: {};", v.rule, v.path, v.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
