//! Source indexing and cross-reference engine for Unreal Engine C++ code.
//!
//! [`indexer::Analyzer`] is the entry point: it resolves source roots from
//! [`config::Config`], parses headers on demand with tree-sitter, and answers
//! class, hierarchy, search, reference and reflection-macro queries.

pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod query;

pub use config::Config;
pub use error::{AnalyzerError, Result};
pub use indexer::{Analyzer, CancelToken, FileOptions};
