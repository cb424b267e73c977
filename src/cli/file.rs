use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{print_json, run_query, OutputFormat};
use uegraph::indexer::{Analyzer, FileOptions};

pub async fn show_file(
    analyzer: &Arc<Analyzer>,
    file: PathBuf,
    options: FileOptions,
    format: OutputFormat,
) -> Result<()> {
    let message = format!("Analyzing {}", file.display());
    let overview = run_query(analyzer, &message, move |a| a.analyze_file(&file, &options)).await?;

    if format == OutputFormat::Json {
        return print_json(&overview);
    }

    println!(
        "{} ({} bytes, {} chars{})",
        overview.file.display(),
        overview.size_bytes,
        overview.total_chars,
        if overview.is_truncated { ", preview truncated" } else { "" }
    );

    if !overview.includes.is_empty() {
        println!("\nIncludes:");
        for include in &overview.includes {
            println!("  {}", include);
        }
    }
    if !overview.classes.is_empty() {
        println!("\nClasses:");
        for class in &overview.classes {
            println!("  {:>5}  {}", class.line, class.name);
        }
    }
    if !overview.functions.is_empty() {
        println!("\nFunctions:");
        for function in &overview.functions {
            println!("  {:>5}  {}", function.line, function.name);
        }
    }
    if !overview.annotations.is_empty() {
        println!("\nReflection macros:");
        for m in &overview.annotations {
            println!("  {:>5}  {} {}", m.line, m.kind, m.name);
        }
    }

    println!("\n{}", overview.preview);
    Ok(())
}
