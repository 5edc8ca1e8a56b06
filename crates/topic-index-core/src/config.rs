//! Index tuning parameters, decoupled from application config.
//!
//! Every field has a default so an application can deserialize a partial
//! TOML table straight into [`IndexConfig`].

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::models::Field;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub tokenizer: TokenizerConfig,
    pub ranking: FieldWeights,
    pub query: QueryLimits,
}

/// Tokenizer options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Tokens shorter than this (in chars) are dropped unless allow-listed.
    pub min_token_len: usize,
    /// Short tokens that are always kept (`"c"`, `"os"`, ...).
    pub allow_list: BTreeSet<String>,
    /// Drop tokens found in [`stopwords`](Self::stopwords).
    pub remove_stopwords: bool,
    pub stopwords: BTreeSet<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_len: 2,
            allow_list: ["c", "r", "os", "io"].iter().map(|s| s.to_string()).collect(),
            remove_stopwords: false,
            stopwords: default_stopwords(),
        }
    }
}

fn default_stopwords() -> BTreeSet<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
        "on", "or", "that", "the", "this", "to", "was", "with",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Per-field ranking weights. Title outranks summary and key points,
/// which outrank long-form prose.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f64,
    pub subtitle: f64,
    pub summary: f64,
    pub key_points: f64,
    pub analogy: f64,
    pub explanation: f64,
    pub questions: f64,
    pub examples: f64,
    pub resources: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 3.0,
            subtitle: 2.0,
            summary: 2.0,
            key_points: 2.0,
            analogy: 1.0,
            explanation: 1.0,
            questions: 1.0,
            examples: 0.5,
            resources: 0.5,
        }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: Field) -> f64 {
        match field {
            Field::Title => self.title,
            Field::Subtitle => self.subtitle,
            Field::Summary => self.summary,
            Field::KeyPoints => self.key_points,
            Field::Analogy => self.analogy,
            Field::Explanation => self.explanation,
            Field::Questions => self.questions,
            Field::Examples => self.examples,
            Field::Resources => self.resources,
        }
    }
}

/// Pagination limits enforced by the query executor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl IndexConfig {
    /// Check value ranges. Returns a description of the first problem.
    pub fn check(&self) -> Result<(), String> {
        if self.tokenizer.min_token_len == 0 {
            return Err("tokenizer.min_token_len must be >= 1".to_string());
        }
        for field in Field::ALL {
            let w = self.ranking.weight(field);
            if !w.is_finite() || w <= 0.0 {
                return Err(format!("ranking.{} must be a positive number", field));
            }
        }
        if self.query.max_page_size < 1 {
            return Err("query.max_page_size must be >= 1".to_string());
        }
        if self.query.default_page_size < 1 || self.query.default_page_size > self.query.max_page_size {
            return Err("query.default_page_size must be in [1, max_page_size]".to_string());
        }
        Ok(())
    }
}
