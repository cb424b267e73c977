// Query layer: search, inheritance trees and reference summaries

pub mod engine;
pub mod hierarchy;
pub mod references;

pub use engine::{QueryEngine, QueryMode, SearchRequest, SearchResults};
pub use hierarchy::{build_hierarchy, ClassResolver};
pub use references::{aggregate_references, ClassUsage, FileReferences, LineRange};
