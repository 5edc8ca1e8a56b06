//! Core data models for the topic index.
//!
//! [`RawTopic`] is a record as received from a source: every field is
//! optional so that malformed input reaches the validator instead of
//! failing at parse time. [`Topic`] is the normalized record produced by
//! [`validate`](crate::validate::validate) and stored in the index.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a topic (lowercase, hyphen-separated).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TopicId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─── Raw records ────────────────────────────────────────────────────

/// A topic record as received from a source (camelCase JSON keys).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTopic {
    pub id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub analogy: Option<String>,
    pub explanation: Option<String>,
    pub key_points: Vec<String>,
    pub code_examples: Vec<RawCodeExample>,
    pub resources: Vec<RawResource>,
    pub questions: Vec<RawQa>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCodeExample {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawResource {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawQa {
    pub id: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

// ─── Validated records ──────────────────────────────────────────────

/// A validated, normalized topic. Optional text is an empty string,
/// never absent; facet values are trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub subtitle: String,
    pub summary: String,
    pub analogy: String,
    pub explanation: String,
    pub key_points: Vec<String>,
    pub code_examples: Vec<CodeExample>,
    pub resources: Vec<Resource>,
    pub questions: Vec<Qa>,
    pub category: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExample {
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Qa {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Output of the validator: the normalized topic plus its content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTopic {
    pub topic: Topic,
    /// SHA-256 of the topic's canonical JSON form, hex encoded.
    pub content_hash: String,
}

// ─── Fields and facets ──────────────────────────────────────────────

/// A searchable text field of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Subtitle,
    Summary,
    KeyPoints,
    Analogy,
    Explanation,
    Questions,
    /// Code example titles and descriptions (never the code itself).
    Examples,
    /// Resource titles and descriptions.
    Resources,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Subtitle,
        Field::Summary,
        Field::KeyPoints,
        Field::Analogy,
        Field::Explanation,
        Field::Questions,
        Field::Examples,
        Field::Resources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Subtitle => "subtitle",
            Field::Summary => "summary",
            Field::KeyPoints => "key_points",
            Field::Analogy => "analogy",
            Field::Explanation => "explanation",
            Field::Questions => "questions",
            Field::Examples => "examples",
            Field::Resources => "resources",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facet key for the topic's category.
pub const FACET_CATEGORY: &str = "category";
/// Facet key for topic tags.
pub const FACET_TAGS: &str = "tags";
/// Facet key for code example languages.
pub const FACET_LANGUAGE: &str = "language";
/// Facet key for resource types.
pub const FACET_RESOURCE_TYPE: &str = "resource_type";

impl Topic {
    /// The text of each searchable field, in indexing order. Multi-valued
    /// fields yield one entry per item.
    pub fn field_texts(&self) -> Vec<(Field, Vec<&str>)> {
        let questions = self
            .questions
            .iter()
            .flat_map(|q| [q.question.as_str(), q.answer.as_str()])
            .collect();
        let examples = self
            .code_examples
            .iter()
            .flat_map(|c| [c.title.as_str(), c.description.as_str()])
            .collect();
        let resources = self
            .resources
            .iter()
            .flat_map(|r| [r.title.as_str(), r.description.as_str()])
            .collect();

        vec![
            (Field::Title, vec![self.title.as_str()]),
            (Field::Subtitle, vec![self.subtitle.as_str()]),
            (Field::Summary, vec![self.summary.as_str()]),
            (
                Field::KeyPoints,
                self.key_points.iter().map(String::as_str).collect(),
            ),
            (Field::Analogy, vec![self.analogy.as_str()]),
            (Field::Explanation, vec![self.explanation.as_str()]),
            (Field::Questions, questions),
            (Field::Examples, examples),
            (Field::Resources, resources),
        ]
    }

    /// All `(key, value)` facet pairs of this topic. Values are already
    /// normalized; empty values are skipped.
    pub fn facets(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if !self.category.is_empty() {
            out.push((FACET_CATEGORY, self.category.as_str()));
        }
        for tag in &self.tags {
            out.push((FACET_TAGS, tag.as_str()));
        }
        for ex in &self.code_examples {
            if !ex.language.is_empty() {
                out.push((FACET_LANGUAGE, ex.language.as_str()));
            }
        }
        for res in &self.resources {
            if !res.kind.is_empty() {
                out.push((FACET_RESOURCE_TYPE, res.kind.as_str()));
            }
        }
        out
    }
}
