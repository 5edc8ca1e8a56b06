//! # Topic Index
//!
//! Command-line front end and loaders for the Topic Knowledge Index.
//!
//! The index itself (validation, tokenizing, text and facet indexes,
//! queries, snapshot publishing) lives in the `topic-index-core` crate,
//! re-exported here as [`topic_index_core`]. This crate adds
//! configuration, record sources, and the `tix` binary.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ TopicSource │──▶│ rebuild_all  │──▶│ IndexSnapshot  │
//! │ dir / custom│   │ (shadow+swap)│   │ text + facets  │
//! └─────────────┘   └──────────────┘   └───────┬────────┘
//!                                              ▼
//!                                        ┌──────────┐
//!                                        │   CLI    │
//!                                        │  (tix)   │
//!                                        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`traits`] | `TopicSource` extension trait |
//! | [`connector_fs`] | Directory-of-JSON source |
//! | [`ingest`] | Loading an index, `tix check` |
//! | [`search`] | `tix search` output |
//! | [`get`] | `tix get` output |
//! | [`stats`] | `tix stats` output |

pub mod config;
pub mod connector_fs;
pub mod get;
pub mod ingest;
pub mod search;
pub mod stats;
pub mod traits;

pub use topic_index_core;
