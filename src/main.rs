use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use uegraph::config::{load_config, LoggingConfig};
use uegraph::indexer::FileOptions;
use uegraph::query::SearchRequest;

mod cli;

use cli::OutputFormat;

#[derive(Parser)]
#[command(name = "uegraph")]
#[command(version)]
#[command(about = "Query Unreal Engine C++ sources: classes, hierarchies, references and reflection macros", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory to start project detection from (and to read .uegraph.toml in)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a class or struct: bases, methods, properties
    Class {
        /// Class name, e.g. ALyraCharacter
        name: String,

        /// Parse only this file
        #[arg(long)]
        path: Option<PathBuf>,

        /// Search scope: project, engine, plugin, all
        #[arg(short, long)]
        scope: Option<String>,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the inheritance tree of a class
    Hierarchy {
        name: String,

        /// Omit interface lists
        #[arg(long)]
        no_interfaces: bool,

        /// Search scope: project, engine, plugin, all
        #[arg(short, long)]
        scope: Option<String>,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Search source lines
    Search {
        query: String,

        /// File name glob, e.g. "*.{h,cpp}"
        #[arg(short, long)]
        glob: Option<String>,

        /// Skip lines starting with a comment
        #[arg(long)]
        no_comments: bool,

        /// Search scope: project, engine, plugin, all
        #[arg(short, long)]
        scope: Option<String>,

        /// Stop after this many matches
        #[arg(short, long)]
        max_results: Option<usize>,

        /// Matching mode: regex, tokens, smart
        #[arg(long, default_value = "smart")]
        mode: String,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Find whole-word references to an identifier
    Refs {
        identifier: String,

        /// Search scope: project, engine, plugin, all
        #[arg(short, long)]
        scope: Option<String>,

        /// Summarize per file instead of listing every line
        #[arg(short, long)]
        aggregate: bool,

        /// Stop after this many matches
        #[arg(short, long)]
        max_results: Option<usize>,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List reflection macros (UPROPERTY, UFUNCTION, ...) in a file
    Annotations {
        file: PathBuf,

        /// Group into the Blueprint-facing API instead
        #[arg(long)]
        summary: bool,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Overview of one file: includes, classes, functions, preview
    File {
        file: PathBuf,

        /// First line of the preview window (1-based)
        #[arg(long)]
        start_line: Option<usize>,

        /// Last line of the preview window (inclusive)
        #[arg(long)]
        end_line: Option<usize>,

        /// Preview size limit in characters
        #[arg(long, default_value_t = uegraph::indexer::DEFAULT_MAX_PREVIEW_CHARS)]
        max_preview_chars: usize,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show resolved source roots
    Roots {
        /// Only roots searched for this scope
        #[arg(short, long)]
        scope: Option<String>,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries results; logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if logging.format == "compact" {
        builder.compact().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.project);
    init_logging(cli.debug, cli.verbose, &config.logging);

    info!("uegraph v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Project directory: {}", cli.project.display());

    let analyzer = cli::build_analyzer(&cli.project, config)?;

    match cli.command {
        Commands::Class { name, path, scope, format } => {
            let scope = cli::parse_scope(scope.as_deref())?;
            cli::class::show_class(&analyzer, name, path, scope, OutputFormat::parse(&format)?).await?;
        }

        Commands::Hierarchy {
            name,
            no_interfaces,
            scope,
            format,
        } => {
            let scope = cli::parse_scope(scope.as_deref())?;
            cli::hierarchy::show_hierarchy(&analyzer, name, !no_interfaces, scope, OutputFormat::parse(&format)?)
                .await?;
        }

        Commands::Search {
            query,
            glob,
            no_comments,
            scope,
            max_results,
            mode,
            format,
        } => {
            let mut request = SearchRequest::new(query)
                .include_comments(!no_comments)
                .mode(mode.parse().map_err(anyhow::Error::msg)?);
            request.file_glob = glob;
            request.scope = cli::parse_scope(scope.as_deref())?;
            request.max_results = max_results;
            cli::search::search_code(&analyzer, request, OutputFormat::parse(&format)?).await?;
        }

        Commands::Refs {
            identifier,
            scope,
            aggregate,
            max_results,
            format,
        } => {
            let scope = cli::parse_scope(scope.as_deref())?;
            cli::references::find_references(
                &analyzer,
                identifier,
                scope,
                aggregate,
                max_results,
                OutputFormat::parse(&format)?,
            )
            .await?;
        }

        Commands::Annotations { file, summary, format } => {
            cli::annotations::show_annotations(&analyzer, file, summary, OutputFormat::parse(&format)?).await?;
        }

        Commands::File {
            file,
            start_line,
            end_line,
            max_preview_chars,
            format,
        } => {
            let options = FileOptions {
                start_line,
                end_line,
                max_preview_chars,
            };
            cli::file::show_file(&analyzer, file, options, OutputFormat::parse(&format)?).await?;
        }

        Commands::Roots { scope, format } => {
            let scope = cli::parse_scope(scope.as_deref())?;
            cli::roots::show_roots(&analyzer, scope, OutputFormat::parse(&format)?)?;
        }
    }

    Ok(())
}
