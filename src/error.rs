// Error taxonomy for the analyzer

use std::path::PathBuf;

use crate::index::roots::SearchScope;

/// Errors surfaced by analyzer operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(
        "No C++ source roots configured for scope '{scope}'. Set CPP_SOURCE_PATH (project), \
         UNREAL_ENGINE_PATH (engine) or the [sources] table in .uegraph.toml, or run from \
         inside a directory tree containing a .uproject file"
    )]
    NoRootsConfigured { scope: SearchScope },

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Extraction failed at line {line}: {reason}")]
    Extraction { line: usize, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Parser error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyzerError {
    /// True for the recoverable "absent" family (missing class or file).
    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalyzerError::ClassNotFound(_) | AnalyzerError::FileNotFound(_))
    }
}

impl From<regex::Error> for AnalyzerError {
    fn from(err: regex::Error) -> Self {
        AnalyzerError::MalformedQuery(err.to_string())
    }
}

impl From<globset::Error> for AnalyzerError {
    fn from(err: globset::Error) -> Self {
        AnalyzerError::MalformedQuery(format!("invalid file glob: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
