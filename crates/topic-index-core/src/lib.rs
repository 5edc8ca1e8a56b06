//! # Topic Index Core
//!
//! In-memory search index for structured learning topics: record
//! validation, tokenizing, a weighted inverted index, an exact-match facet
//! index, and a query executor with pagination.
//!
//! This crate does no filesystem or network I/O. Loading records and
//! wiring configuration live in the `topic-index` application crate.
//!
//! ```text
//! RawTopic ──▶ validate ──▶ tokenize ──▶ ┌──────────────┐
//!                                        │ IndexSnapshot │◀── search
//!                                        │ text + facets │
//!                                        └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Raw and validated topic records |
//! | [`validate`] | Record validation rules |
//! | [`tokenize`] | Text normalization and query parsing |
//! | [`inverted`] | Term postings and TF-IDF ranking |
//! | [`facet`] | Facet values and filtering |
//! | [`search`] | Query execution and pagination |
//! | [`index`] | Snapshot publishing, ingest, delete, rebuild |
//! | [`config`] | Tunables for all of the above |
//! | [`error`] | Error taxonomy |

pub mod config;
pub mod error;
pub mod facet;
pub mod index;
pub mod inverted;
pub mod models;
pub mod search;
pub mod tokenize;
pub mod validate;

pub use error::{IndexError, Result};
pub use index::{CancelToken, TopicIndex};
pub use models::{RawTopic, Topic, TopicId};
pub use search::{SearchPage, SearchRequest};
