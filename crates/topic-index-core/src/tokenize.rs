//! Text tokenizer and normalizer.
//!
//! Lower-cases input, splits on every non-alphanumeric character, and
//! drops short tokens (unless allow-listed) and, optionally, stopwords.
//! Positions are ordinals of the emitted tokens, not byte offsets, so the
//! same text always produces the same `(token, position)` stream.
//!
//! # Example
//!
//! ```rust
//! use topic_index_core::config::TokenizerConfig;
//! use topic_index_core::tokenize::Tokenizer;
//!
//! let tok = Tokenizer::new(TokenizerConfig::default());
//! let tokens = tok.tokenize("Mutex vs. Semaphore!");
//! let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(words, vec!["mutex", "vs", "semaphore"]);
//! assert_eq!(tokens[2].position, 2);
//! ```

use crate::config::TokenizerConfig;

/// A normalized token and its ordinal position within the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

/// A parsed query: loose terms plus quoted phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Distinct query terms in first-occurrence order (phrase words included).
    pub terms: Vec<String>,
    /// Quoted phrases of two or more tokens.
    pub phrases: Vec<Vec<String>>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Allow-list and stopword entries are lower-cased to match the
    /// tokens they are compared against.
    pub fn new(mut config: TokenizerConfig) -> Self {
        config.allow_list = config.allow_list.iter().map(|w| w.to_lowercase()).collect();
        config.stopwords = config.stopwords.iter().map(|w| w.to_lowercase()).collect();
        Self { config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize a single text value.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenize_from(text, 0)
    }

    /// Tokenize several values of one field as a single stream; positions
    /// continue from one value to the next.
    pub fn tokenize_all<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<Token> {
        let mut out = Vec::new();
        for text in texts {
            let next = out.last().map_or(0, |t: &Token| t.position + 1);
            out.extend(self.tokenize_from(text, next));
        }
        out
    }

    fn tokenize_from(&self, text: &str, start: u32) -> Vec<Token> {
        let mut position = start;
        let mut out = Vec::new();
        for word in self.words(text) {
            out.push(Token {
                text: word,
                position,
            });
            position += 1;
        }
        out
    }

    /// Normalized words of `text` after length and stopword filtering.
    fn words<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .filter(move |w| self.keep(w))
    }

    fn keep(&self, word: &str) -> bool {
        if word.chars().count() < self.config.min_token_len
            && !self.config.allow_list.contains(word)
        {
            return false;
        }
        !(self.config.remove_stopwords && self.config.stopwords.contains(word))
    }

    /// Parse free query text. Text between double quotes becomes a phrase;
    /// an unterminated quote runs to the end of the input.
    pub fn parse_query(&self, query: &str) -> ParsedQuery {
        let mut parsed = ParsedQuery::default();
        for (i, segment) in query.split('"').enumerate() {
            let words: Vec<String> = self.words(segment).collect();
            let quoted = i % 2 == 1;
            if quoted && words.len() > 1 && !parsed.phrases.contains(&words) {
                parsed.phrases.push(words.clone());
            }
            for w in words {
                if !parsed.terms.contains(&w) {
                    parsed.terms.push(w);
                }
            }
        }
        parsed
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}
