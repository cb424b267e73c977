// Analyzer context: source roots, parse cache and parser behind every query

pub mod files;
pub mod parser;
pub mod patterns;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AnalyzerError, Result};
use crate::index::cache::{CacheStats, ParseCache};
use crate::index::roots::{SearchScope, SourceRoot, SourceRoots};
use crate::index::{AnnotationMatch, ClassRecord, ExposedApi, FileOverview, HierarchyNode};
use crate::query::engine::reference_pattern;
use crate::query::references::DEFAULT_SAMPLES_PER_FILE;
use crate::query::{
    build_hierarchy, ClassResolver, ClassUsage, FileReferences, QueryEngine, QueryMode, SearchRequest, SearchResults,
};
use files::{read_source, walk_files, FileFilter};
use parser::{CppParser, ParsedFile};

pub const DEFAULT_MAX_PREVIEW_CHARS: usize = 50_000;
pub const DEFAULT_CLASS_USAGE_RESULTS: usize = 200;

/// Cooperative cancellation flag, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AnalyzerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Options for [`Analyzer::analyze_file`]
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// 1-based, inclusive
    pub start_line: Option<usize>,
    /// 1-based, inclusive
    pub end_line: Option<usize>,
    pub max_preview_chars: usize,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            start_line: None,
            end_line: None,
            max_preview_chars: DEFAULT_MAX_PREVIEW_CHARS,
        }
    }
}

/// One index over a fixed set of source roots.
///
/// Built once per process (or per test) and shared by reference. The only
/// mutable state is the parse cache and the cancellation flag.
pub struct Analyzer {
    config: Config,
    roots: SourceRoots,
    cache: ParseCache<ParsedFile>,
    parser: CppParser,
    cancel: CancelToken,
}

impl Analyzer {
    /// Resolve roots from `config`, auto-detecting the project from `start_dir`.
    pub fn new(config: Config, start_dir: &Path) -> Result<Self> {
        config.validate().map_err(|e| AnalyzerError::Config(e.to_string()))?;
        let roots = SourceRoots::from_config(&config.sources, start_dir);
        Self::with_roots(config, roots)
    }

    pub fn with_roots(config: Config, roots: SourceRoots) -> Result<Self> {
        let cache = ParseCache::new(config.cache.enabled, config.cache.max_size);
        info!("Analyzer ready with {} source roots", roots.len());
        for root in roots.all() {
            debug!("  {} [{}] {}", root.label, root.kind.as_str(), root.path.display());
        }

        Ok(Self {
            config,
            roots,
            cache,
            parser: CppParser::new()?,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for cancelling long scans from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn source_roots(&self) -> &[SourceRoot] {
        self.roots.all()
    }

    pub fn roots_for(&self, scope: SearchScope) -> Vec<&SourceRoot> {
        self.roots.for_scope(scope)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Parse `path`, or return the cached parse.
    ///
    /// Concurrent calls for the same path parse it once and share the result.
    pub fn parse(&self, path: &Path) -> Result<Arc<ParsedFile>> {
        self.cache
            .get_or_parse(path, || self.parse_uncached(path, read_source(path)?))
    }

    fn parse_source(&self, path: &Path, source: String) -> Result<Arc<ParsedFile>> {
        self.cache.get_or_parse(path, || self.parse_uncached(path, source))
    }

    fn parse_uncached(&self, path: &Path, source: String) -> Result<ParsedFile> {
        let parsed = self.parser.parse_file(path, source)?;
        debug!("Parsed {} ({} classes)", path.display(), parsed.classes.len());
        Ok(parsed)
    }

    fn scope_or_default(&self, scope: Option<SearchScope>) -> SearchScope {
        scope.unwrap_or(self.config.search.default_scope)
    }

    fn required_roots(&self, scope: SearchScope) -> Result<Vec<PathBuf>> {
        let roots = self.roots.paths_for(scope);
        if roots.is_empty() {
            return Err(AnalyzerError::NoRootsConfigured { scope });
        }
        Ok(roots)
    }

    /// Find and extract a class definition.
    ///
    /// With an explicit path only that file is parsed. Otherwise the class
    /// cache is consulted, then headers and finally `.cpp` files under the
    /// scope's roots.
    pub fn analyze_class(&self, name: &str, path: Option<&Path>, scope: Option<SearchScope>) -> Result<Arc<ClassRecord>> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(AnalyzerError::FileNotFound(path.to_path_buf()));
            }
            let parsed = self.parse(path)?;
            return parsed
                .class(name)
                .cloned()
                .ok_or_else(|| AnalyzerError::ClassNotFound(name.to_string()));
        }

        let scope = self.scope_or_default(scope);
        if let Some(record) = self.cache.get_class(name) {
            if self.roots.admits(&record.file, scope) {
                return Ok(record);
            }
        }

        let roots = self.required_roots(scope)?;
        let declaration = Regex::new(&format!(r"\b(?:class|struct)\s+(?:\w+_API\s+)?{}\b", regex::escape(name)))?;

        for filter in [FileFilter::headers()?, FileFilter::sources()?] {
            for root in &roots {
                for file in walk_files(root, &filter) {
                    self.cancel.check()?;
                    if !self.roots.admits(&file, scope) {
                        continue;
                    }
                    if let Some(record) = self.find_class_in(&file, name, &declaration) {
                        return Ok(record);
                    }
                }
            }
        }

        Err(AnalyzerError::ClassNotFound(name.to_string()))
    }

    fn find_class_in(&self, file: &Path, name: &str, declaration: &Regex) -> Option<Arc<ClassRecord>> {
        if let Some(parsed) = self.cache.get_tree(file) {
            return parsed.class(name).cloned();
        }
        let source = match read_source(file) {
            Ok(source) => source,
            Err(e) => {
                debug!("Skipping {}: {}", file.display(), e);
                return None;
            }
        };
        // Most files never mention the class; skip parsing them
        if !declaration.is_match(&source) {
            return None;
        }
        match self.parse_source(file, source) {
            Ok(parsed) => parsed.class(name).cloned(),
            Err(e) => {
                debug!("Skipping {}: {}", file.display(), e);
                None
            }
        }
    }

    pub fn find_class_hierarchy(
        &self,
        name: &str,
        include_interfaces: bool,
        scope: Option<SearchScope>,
    ) -> Result<HierarchyNode> {
        let resolver = ScopedResolver {
            analyzer: self,
            scope: self.scope_or_default(scope),
        };
        build_hierarchy(&resolver, name, include_interfaces)
    }

    pub fn search_code(&self, request: &SearchRequest) -> Result<SearchResults> {
        QueryEngine::new(&self.roots, &self.config.search, &self.cancel).search(request)
    }

    /// Whole-word occurrences of `identifier`
    pub fn find_references(
        &self,
        identifier: &str,
        scope: Option<SearchScope>,
        max_results: Option<usize>,
    ) -> Result<SearchResults> {
        let mut request = SearchRequest::new(reference_pattern(identifier)).mode(QueryMode::Regex);
        request.scope = scope;
        request.max_results = max_results;
        self.search_code(&request)
    }

    pub fn detect_annotations(&self, path: &Path) -> Result<Vec<AnnotationMatch>> {
        if !path.is_file() {
            return Err(AnalyzerError::FileNotFound(path.to_path_buf()));
        }
        let content = read_source(path)?;
        Ok(self.parser.scanner().detect(&content))
    }

    pub fn get_exposed_api(&self, path: &Path) -> Result<ExposedApi> {
        let annotations = self.detect_annotations(path)?;
        Ok(patterns::exposed_api(path, &annotations))
    }

    pub fn aggregate_references(&self, identifier: &str, matches: &[crate::index::SearchMatch]) -> Vec<FileReferences> {
        crate::query::aggregate_references(identifier, matches, DEFAULT_SAMPLES_PER_FILE)
    }

    /// References to a class grouped by file, definition file last
    pub fn find_class_usage(
        &self,
        class_name: &str,
        scope: Option<SearchScope>,
        max_results: Option<usize>,
    ) -> Result<ClassUsage> {
        let max = max_results.unwrap_or(DEFAULT_CLASS_USAGE_RESULTS);
        let references = self.find_references(class_name, scope, Some(max))?;
        let files = self.aggregate_references(class_name, &references.matches);

        Ok(ClassUsage {
            class_name: class_name.to_string(),
            total_references: references.count,
            file_count: files.len(),
            truncated: references.truncated,
            files,
        })
    }

    /// Overview of one file: preview, includes, classes, functions and annotations.
    ///
    /// A line range narrows the preview and the annotations. Annotation lines
    /// stay relative to the whole file.
    pub fn analyze_file(&self, path: &Path, options: &FileOptions) -> Result<FileOverview> {
        if !path.is_file() {
            return Err(AnalyzerError::FileNotFound(path.to_path_buf()));
        }
        let size_bytes = std::fs::metadata(path)?.len();
        let parsed = self.parse(path)?;

        let (content, first_line) = select_lines(&parsed.source, options.start_line, options.end_line);
        let mut annotations = self.parser.scanner().detect(content);
        for annotation in &mut annotations {
            annotation.line += first_line - 1;
        }

        let total_chars = content.chars().count();
        let is_truncated = total_chars > options.max_preview_chars;
        let mut preview: String = content.chars().take(options.max_preview_chars).collect();
        let preview_chars = total_chars.min(options.max_preview_chars);
        if is_truncated {
            preview.push_str(&format!("\n... (truncated, {} more chars)", total_chars - preview_chars));
        }

        Ok(FileOverview {
            file: path.to_path_buf(),
            size_bytes,
            total_chars,
            preview,
            preview_chars,
            is_truncated,
            includes: self.parser.includes(&parsed.tree, &parsed.source),
            classes: self.parser.class_locations(&parsed.tree, &parsed.source),
            functions: self.parser.function_definitions(&parsed.tree, &parsed.source),
            annotations,
        })
    }
}

struct ScopedResolver<'a> {
    analyzer: &'a Analyzer,
    scope: SearchScope,
}

impl ClassResolver for ScopedResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Option<Arc<ClassRecord>>> {
        match self.analyzer.analyze_class(name, None, Some(self.scope)) {
            Ok(record) => Ok(Some(record)),
            Err(AnalyzerError::ClassNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Slice of `source` covering 1-based inclusive lines, with its first line number
fn select_lines(source: &str, start_line: Option<usize>, end_line: Option<usize>) -> (&str, usize) {
    if start_line.is_none() && end_line.is_none() {
        return (source, 1);
    }
    let first = start_line.unwrap_or(1).max(1);
    let last = end_line.unwrap_or(usize::MAX);
    if last < first {
        return ("", first);
    }

    let mut start_byte = None;
    let mut end_byte = source.len();
    let mut offset = 0;
    for (idx, line) in source.split_inclusive('\n').enumerate() {
        let number = idx + 1;
        if number == first {
            start_byte = Some(offset);
        }
        offset += line.len();
        if number == last {
            end_byte = offset;
            break;
        }
    }
    match start_byte {
        Some(start) => (&source[start..end_byte], first),
        None => ("", first),
    }
}
