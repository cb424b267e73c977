use anyhow::Result;
use std::sync::Arc;

use super::{print_json, run_query, search::print_results, OutputFormat};
use uegraph::index::roots::SearchScope;
use uegraph::indexer::Analyzer;
use uegraph::query::ClassUsage;

pub async fn find_references(
    analyzer: &Arc<Analyzer>,
    identifier: String,
    scope: Option<SearchScope>,
    aggregate: bool,
    max_results: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let message = format!("Finding references to {}", identifier);

    if aggregate {
        let usage = run_query(analyzer, &message, move |a| a.find_class_usage(&identifier, scope, max_results)).await?;
        return match format {
            OutputFormat::Json => print_json(&usage),
            OutputFormat::Text => {
                print_usage(&usage);
                Ok(())
            }
        };
    }

    let results = run_query(analyzer, &message, move |a| a.find_references(&identifier, scope, max_results)).await?;
    match format {
        OutputFormat::Json => print_json(&results),
        OutputFormat::Text => {
            print_results(&results);
            Ok(())
        }
    }
}

fn print_usage(usage: &ClassUsage) {
    println!(
        "{}: {} references in {} files{}",
        usage.class_name,
        usage.total_references,
        usage.file_count,
        if usage.truncated { " (truncated)" } else { "" }
    );

    for file in &usage.files {
        let ranges: Vec<String> = file.line_ranges.iter().map(|r| r.to_string()).collect();
        let tag = if file.is_definition { "  [definition]" } else { "" };
        println!("\n{} ({}){}", file.file.display(), file.count, tag);
        println!("  lines {}", ranges.join(", "));
        for sample in &file.samples {
            println!("  {:>6}: {}", sample.line, sample.code);
        }
        if file.truncated {
            println!("  ...");
        }
    }
}
