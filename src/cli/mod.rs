// CLI command implementations

pub mod annotations;
pub mod class;
pub mod file;
pub mod hierarchy;
pub mod references;
pub mod roots;
pub mod search;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use uegraph::config::Config;
use uegraph::index::roots::SearchScope;
use uegraph::indexer::Analyzer;

/// How command results are printed to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow!("Unknown format: {} (expected text or json)", other)),
        }
    }
}

pub fn parse_scope(value: Option<&str>) -> Result<Option<SearchScope>> {
    value.map(|s| s.parse::<SearchScope>().map_err(|e| anyhow!(e))).transpose()
}

pub fn build_analyzer(project: &Path, config: Config) -> Result<Arc<Analyzer>> {
    let analyzer = Analyzer::new(config, project)?;
    if analyzer.source_roots().is_empty() {
        warn!("No source roots resolved from {}", project.display());
    }
    Ok(Arc::new(analyzer))
}

/// Run a query on a blocking thread with a spinner on stderr.
///
/// Ctrl-C cancels the query between files.
pub async fn run_query<T, F>(analyzer: &Arc<Analyzer>, message: &str, query: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Analyzer) -> uegraph::error::Result<T> + Send + 'static,
{
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let token = analyzer.cancel_token();
    token.reset();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling query");
            token.cancel();
        }
    });

    let worker = Arc::clone(analyzer);
    let outcome = tokio::task::spawn_blocking(move || query(&worker)).await;

    interrupt.abort();
    spinner.finish_and_clear();

    Ok(outcome??)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text").unwrap(), OutputFormat::Text);
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope(None).unwrap(), None);
        assert_eq!(parse_scope(Some("engine")).unwrap(), Some(SearchScope::Engine));
        assert!(parse_scope(Some("galaxy")).is_err());
    }
}
