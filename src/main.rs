//! # Topic Index CLI (`tix`)
//!
//! Loads topic records from a directory of JSON files into an in-memory
//! index and queries it.
//!
//! ## Usage
//!
//! ```bash
//! tix --config ./config/tix.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tix check` | Validate every record; exit 1 if any is invalid |
//! | `tix search "<text>"` | Full-text and faceted search |
//! | `tix get <id>` | Print one topic |
//! | `tix stats` | Index size, facet breakdown, fingerprint |
//!
//! ## Examples
//!
//! ```bash
//! # Everything tagged storage
//! tix search "" --facet tags=storage
//!
//! # Go or Rust examples about channels, second page of 5
//! tix search channels --facet language=go --facet language=rust --page 1 --page-size 5
//!
//! # Show why each hit matched and how results split by category
//! tix search "event loop" --explain --counts category
//! ```
//!
//! Logs go to stderr. Set `RUST_LOG` or `[logging].filter` to change the
//! level.

mod config;
mod connector_fs;
mod get;
mod ingest;
mod search;
mod stats;
#[allow(dead_code)]
mod traits;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::search::SearchArgs;

/// Topic Index CLI: search and validate a library of topic records.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file whose `[source].root` names the topic directory.
#[derive(Parser)]
#[command(
    name = "tix",
    about = "Topic Index: faceted full-text search over topic records",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tix.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every record in the source directory.
    ///
    /// Prints each invalid record with its violations and lists ids that
    /// are defined more than once. Exits with status 1 if any record is
    /// invalid.
    Check,

    /// Search topics.
    ///
    /// Blank text lists every topic matching the facet filters in id order.
    Search {
        /// Free text; wrap words in double quotes to require a phrase.
        query: String,

        /// Facet filter `key=value`. Repeat a key to OR its values;
        /// different keys are ANDed.
        #[arg(long = "facet", value_parser = parse_key_val)]
        facets: Vec<(String, String)>,

        /// Zero-based page number.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        page: i64,

        /// Results per page. Defaults to `[query].default_page_size`.
        #[arg(long, allow_negative_numbers = true)]
        page_size: Option<i64>,

        /// Show matched terms and fields for each hit.
        #[arg(long)]
        explain: bool,

        /// Count matches per value of this facet key. Repeatable.
        #[arg(long = "counts")]
        counts: Vec<String>,

        /// Print the result page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a topic by id.
    Get {
        /// Topic id.
        id: String,

        /// Print only the JSON record.
        #[arg(long)]
        json: bool,
    },

    /// Print index statistics.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Parse a `key=value` pair for `--facet` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn init_tracing(config_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(cfg.logging.filter());

    if let Commands::Check = cli.command {
        if !ingest::run_check(&cfg).await? {
            std::process::exit(1);
        }
        return Ok(());
    }

    let (index, report) = ingest::load_from_config(&cfg).await?;

    match cli.command {
        Commands::Check => {}
        Commands::Search {
            query,
            facets,
            page,
            page_size,
            explain,
            counts,
            json,
        } => {
            let args = SearchArgs {
                query,
                facets,
                page,
                page_size,
                explain,
                counts,
                json,
            };
            search::run_search(&index, &args)?;
        }
        Commands::Get { id, json } => {
            get::run_get(&index, &id, json)?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, &index, &report, json)?;
        }
    }

    Ok(())
}
