use anyhow::Result;

use super::{print_json, OutputFormat};
use uegraph::index::roots::{SearchScope, SourceRoot};
use uegraph::indexer::Analyzer;

pub fn show_roots(analyzer: &Analyzer, scope: Option<SearchScope>, format: OutputFormat) -> Result<()> {
    let roots: Vec<&SourceRoot> = match scope {
        Some(scope) => analyzer.roots_for(scope),
        None => analyzer.source_roots().iter().collect(),
    };

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "scope": scope.map(|s| s.as_str()),
            "default_scope": analyzer.config().search.default_scope,
            "roots": roots,
            "cache": analyzer.cache_stats(),
        }));
    }

    println!("Default scope: {}", analyzer.config().search.default_scope);
    if roots.is_empty() {
        println!("No source roots resolved. Set CPP_SOURCE_PATH or UNREAL_ENGINE_PATH, or add a [sources] table to .uegraph.toml");
        return Ok(());
    }
    println!("{} source roots:", roots.len());
    for root in roots {
        println!("  {:<15} {:<20} {}", root.kind.as_str(), root.label, root.path.display());
    }

    let stats = analyzer.cache_stats();
    println!(
        "\nCache: {} (max {} per map)",
        if stats.enabled { "enabled" } else { "disabled" },
        stats.max_size
    );
    Ok(())
}
