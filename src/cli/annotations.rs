use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{print_json, run_query, OutputFormat};
use uegraph::index::ExposedApi;
use uegraph::indexer::Analyzer;

pub async fn show_annotations(
    analyzer: &Arc<Analyzer>,
    file: PathBuf,
    summary: bool,
    format: OutputFormat,
) -> Result<()> {
    let message = format!("Scanning {}", file.display());

    if summary {
        let api = run_query(analyzer, &message, move |a| a.get_exposed_api(&file)).await?;
        return match format {
            OutputFormat::Json => print_json(&api),
            OutputFormat::Text => {
                print_exposed_api(&api);
                Ok(())
            }
        };
    }

    let matches = run_query(analyzer, &message, move |a| a.detect_annotations(&file)).await?;
    match format {
        OutputFormat::Json => print_json(&matches),
        OutputFormat::Text => {
            if matches.is_empty() {
                println!("No reflection macros found");
            }
            for m in &matches {
                let mut flags = Vec::new();
                if m.is_exposed {
                    flags.push("blueprint");
                }
                if m.is_replicated {
                    flags.push("replicated");
                }
                println!("{:>5}  {}({})  {}", m.line, m.kind, m.specifiers.join(", "), m.name);
                if !flags.is_empty() {
                    println!("       {}", flags.join(" "));
                }
                for hint in &m.suggestions {
                    println!("       hint: {}", hint);
                }
            }
            Ok(())
        }
    }
}

fn print_exposed_api(api: &ExposedApi) {
    if api.is_empty() {
        println!("{} exposes nothing to Blueprint", api.file.display());
        return;
    }
    println!("Blueprint API of {}", api.file.display());
    let sections = [
        ("Blueprintable classes", &api.blueprintable_classes),
        ("Callable functions", &api.callable_functions),
        ("Pure functions", &api.pure_functions),
        ("Events", &api.events),
        ("Readable properties", &api.readable_properties),
        ("Writable properties", &api.writable_properties),
    ];
    for (title, names) in sections {
        if names.is_empty() {
            continue;
        }
        println!("\n  {}:", title);
        for name in names {
            println!("    {}", name);
        }
    }
}
