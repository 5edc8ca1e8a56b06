//! `tix stats`: summary of the loaded index.

use anyhow::Result;
use topic_index_core::index::{IndexStats, RebuildReport};
use topic_index_core::TopicIndex;

use crate::config::Config;

/// Print the stats of `index`, built from `report`.
pub fn run_stats(config: &Config, index: &TopicIndex, report: &RebuildReport, json: bool) -> Result<()> {
    let stats = index.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    print_stats(config, report, &stats);
    Ok(())
}

fn print_stats(config: &Config, report: &RebuildReport, stats: &IndexStats) {
    println!("Topic Index: Stats");
    println!("==================");
    println!();
    println!("  Source:       {}", config.source.root.display());
    println!(
        "  Records:      {} ({} duplicate ids)",
        report.records, report.duplicates
    );
    println!("  Built in:     {} ms", report.elapsed_ms);
    println!();
    println!("  Topics:       {}", stats.topics);
    println!("  Terms:        {}", stats.terms);
    println!("  Postings:     {}", stats.postings);
    println!("  Facet values: {}", stats.facet_values);
    println!("  Generation:   {}", stats.generation);
    println!("  Published:    {}", stats.published_at);
    println!("  Fingerprint:  {}", short_hash(&stats.fingerprint));

    if !stats.facets.is_empty() {
        println!();
        println!("  By facet:");
        println!("  {:<16} {:<24} {:>6}", "KEY", "VALUE", "TOPICS");
        println!("  {}", "-".repeat(48));
        for (key, counts) in &stats.facets {
            for c in counts {
                println!("  {:<16} {:<24} {:>6}", key, c.value, c.count);
            }
        }
    }
    println!();
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
