use anyhow::Result;
use std::sync::Arc;

use super::{print_json, run_query, OutputFormat};
use uegraph::indexer::Analyzer;
use uegraph::query::{SearchRequest, SearchResults};

pub async fn search_code(analyzer: &Arc<Analyzer>, request: SearchRequest, format: OutputFormat) -> Result<()> {
    let message = format!("Searching for {}", request.query);
    let results = run_query(analyzer, &message, move |a| a.search_code(&request)).await?;

    match format {
        OutputFormat::Json => print_json(&results),
        OutputFormat::Text => {
            print_results(&results);
            Ok(())
        }
    }
}

pub fn print_results(results: &SearchResults) {
    if results.matches.is_empty() {
        println!("No matches for '{}' in scope {}", results.query, results.scope);
        return;
    }

    println!(
        "Found {} matches ({} mode, scope {}){}:",
        results.count,
        results.mode_resolved,
        results.scope,
        if results.truncated { ", truncated" } else { "" }
    );
    for m in &results.matches {
        if m.matched_tokens.is_empty() {
            println!("\n{}:{}:{}", m.file.display(), m.line, m.column);
        } else {
            println!("\n{}:{}:{}  [{}]", m.file.display(), m.line, m.column, m.matched_tokens.join(" "));
        }
        for line in m.context.lines() {
            println!("    {}", line);
        }
    }
}
