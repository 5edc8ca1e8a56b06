//! `tix search`: query a freshly loaded index and print the page.

use anyhow::Result;
use topic_index_core::{SearchPage, SearchRequest, TopicIndex};

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub query: String,
    /// `(key, value)` pairs from repeated `--facet key=value`.
    pub facets: Vec<(String, String)>,
    pub page: i64,
    /// Falls back to `[query].default_page_size`.
    pub page_size: Option<i64>,
    pub explain: bool,
    pub counts: Vec<String>,
    pub json: bool,
}

impl SearchArgs {
    pub fn to_request(&self, default_page_size: i64) -> SearchRequest {
        let mut req = SearchRequest::new(self.query.clone())
            .with_page(self.page, self.page_size.unwrap_or(default_page_size))
            .with_explain(self.explain);
        for (key, value) in &self.facets {
            req = req.with_facet(key.clone(), value.clone());
        }
        for key in &self.counts {
            req = req.with_facet_counts(key.clone());
        }
        req
    }
}

/// Run the query and print results to stdout.
pub fn run_search(index: &TopicIndex, args: &SearchArgs) -> Result<()> {
    let req = args.to_request(index.config().query.default_page_size);
    let page = index.search(&req)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }
    print_page(&page);
    Ok(())
}

fn print_page(page: &SearchPage) {
    if page.hits.is_empty() {
        println!("No results. ({} total)", page.total);
    }

    let offset = page.page.saturating_mul(page.page_size) as usize;
    for (i, hit) in page.hits.iter().enumerate() {
        println!("{}. [{:.2}] {}", offset + i + 1, hit.score, hit.title);
        println!("    id: {}", hit.id);
        if let Some(ref explain) = hit.explain {
            let fields: Vec<&str> = explain.fields.iter().map(|f| f.as_str()).collect();
            println!(
                "    matched: {}/{} terms in {}",
                explain.matched_terms,
                explain.query_terms,
                fields.join(", ")
            );
        }
        println!();
    }

    if !page.hits.is_empty() {
        println!(
            "Showing {}-{} of {} (page {})",
            offset + 1,
            offset + page.hits.len(),
            page.total,
            page.page
        );
    }

    for (key, counts) in &page.facet_counts {
        println!();
        println!("  {}:", key);
        for c in counts {
            println!("    {:<24} {:>5}", c.value, c.count);
        }
    }
}
