// Line-oriented code search over scoped source roots

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{AnalyzerError, Result};
use crate::index::roots::{SearchScope, SourceRoots};
use crate::index::SearchMatch;
use crate::indexer::files::{read_source, walk_files, FileFilter};
use crate::indexer::CancelToken;

/// Lines of context captured on each side of a match
pub const CONTEXT_LINES: usize = 2;

const REGEX_METACHARACTERS: &[char] = &['\\', '.', '^', '$', '*', '+', '?', '{', '}', '[', ']', '|', '(', ')'];

/// How a query string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Case-insensitive regular expression per line
    Regex,
    /// Whitespace-separated words, any of which may match
    Tokens,
    /// Regex if the query looks like one, tokens otherwise
    #[default]
    Smart,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Regex => "regex",
            QueryMode::Tokens => "tokens",
            QueryMode::Smart => "smart",
        }
    }

    /// Pick a concrete mode for `query`. Never returns `Smart`.
    pub fn resolve(self, query: &str) -> QueryMode {
        match self {
            QueryMode::Smart if query.trim().is_empty() => QueryMode::Tokens,
            QueryMode::Smart if query.contains(REGEX_METACHARACTERS) => QueryMode::Regex,
            QueryMode::Smart => QueryMode::Tokens,
            other => other,
        }
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regex" => Ok(QueryMode::Regex),
            "tokens" => Ok(QueryMode::Tokens),
            "smart" => Ok(QueryMode::Smart),
            other => Err(format!("Unknown search mode '{}' (expected regex, tokens or smart)", other)),
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one search. Unset options take the configured defaults.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub file_glob: Option<String>,
    pub include_comments: bool,
    pub scope: Option<SearchScope>,
    pub max_results: Option<usize>,
    pub mode: QueryMode,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            file_glob: None,
            include_comments: true,
            scope: None,
            max_results: None,
            mode: QueryMode::Smart,
        }
    }

    pub fn glob(mut self, glob: impl Into<String>) -> Self {
        self.file_glob = Some(glob.into());
        self
    }

    pub fn include_comments(mut self, include: bool) -> Self {
        self.include_comments = include;
        self
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Matches of one search, best first in token mode
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub matches: Vec<SearchMatch>,
    pub count: usize,
    pub truncated: bool,
    pub mode_resolved: QueryMode,
    pub scope: SearchScope,
    pub searched_roots: Vec<PathBuf>,
}

enum Matcher {
    Regex(Regex),
    Tokens(Vec<String>),
}

impl Matcher {
    /// (column, matched tokens, score) for a matching line
    fn match_line(&self, line: &str) -> Option<(usize, Vec<String>, usize)> {
        match self {
            Matcher::Regex(re) => re.find(line).map(|m| (m.start() + 1, Vec::new(), 1)),
            Matcher::Tokens(tokens) => {
                let lower = line.to_lowercase();
                let mut first: Option<usize> = None;
                let mut matched = Vec::new();
                for token in tokens {
                    if let Some(pos) = lower.find(token.as_str()) {
                        // Column follows the first matched token in query order
                        first.get_or_insert(pos);
                        matched.push(token.clone());
                    }
                }
                let column = first? + 1;
                let score = matched.len();
                Some((column, matched, score))
            }
        }
    }
}

/// Executes searches against a set of resolved roots
pub struct QueryEngine<'a> {
    roots: &'a SourceRoots,
    defaults: &'a SearchConfig,
    cancel: &'a CancelToken,
}

impl<'a> QueryEngine<'a> {
    pub fn new(roots: &'a SourceRoots, defaults: &'a SearchConfig, cancel: &'a CancelToken) -> Self {
        Self { roots, defaults, cancel }
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let scope = request.scope.unwrap_or(self.defaults.default_scope);
        let max_results = request.max_results.unwrap_or(self.defaults.max_results).max(1);
        let glob = request.file_glob.as_deref().unwrap_or(&self.defaults.file_glob);
        let mode = request.mode.resolve(&request.query);

        let matcher = match mode {
            QueryMode::Regex => Matcher::Regex(RegexBuilder::new(&request.query).case_insensitive(true).build()?),
            _ => {
                let mut tokens: Vec<String> = Vec::new();
                for token in request.query.split_whitespace().map(str::to_lowercase) {
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
                Matcher::Tokens(tokens)
            }
        };
        let filter = FileFilter::new(glob)?;

        let searched_roots = self.roots.paths_for(scope);
        if searched_roots.is_empty() {
            return Err(AnalyzerError::NoRootsConfigured { scope });
        }
        debug!("Searching {} roots for {:?} ({})", searched_roots.len(), request.query, mode);

        let mut matches = Vec::new();
        let mut truncated = false;
        let mut seen = HashSet::new();

        'roots: for root in &searched_roots {
            for file in walk_files(root, &filter) {
                self.cancel.check()?;
                if !seen.insert(file.clone()) {
                    continue;
                }
                // Stale or overlapping roots must not leak files from another scope
                if !self.roots.admits(&file, scope) {
                    debug!("Filtered out-of-scope file {}", file.display());
                    continue;
                }
                let content = match read_source(&file) {
                    Ok(content) => content,
                    Err(e) => {
                        debug!("Skipping {}: {}", file.display(), e);
                        continue;
                    }
                };

                let lines: Vec<&str> = content.lines().collect();
                for (idx, line) in lines.iter().enumerate() {
                    if !request.include_comments && is_comment_line(line) {
                        continue;
                    }
                    let Some((column, matched_tokens, score)) = matcher.match_line(line) else {
                        continue;
                    };
                    matches.push(SearchMatch {
                        file: file.clone(),
                        line: idx + 1,
                        column,
                        context: context_window(&lines, idx),
                        matched_tokens,
                        score,
                    });
                    if matches.len() >= max_results {
                        truncated = true;
                        break 'roots;
                    }
                }
            }
        }

        if mode == QueryMode::Tokens {
            matches.sort_by(|a, b| b.score.cmp(&a.score));
        }

        Ok(SearchResults {
            query: request.query.clone(),
            count: matches.len(),
            matches,
            truncated,
            mode_resolved: mode,
            scope,
            searched_roots,
        })
    }
}

/// Whole-word, case-insensitive pattern for an identifier
pub fn reference_pattern(identifier: &str) -> String {
    format!(r"\b{}\b", regex::escape(identifier))
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*")
}

fn context_window(lines: &[&str], idx: usize) -> String {
    let start = idx.saturating_sub(CONTEXT_LINES);
    let end = (idx + CONTEXT_LINES + 1).min(lines.len());
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourcesConfig;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        roots: SourceRoots,
        defaults: SearchConfig,
        cancel: CancelToken,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let sources = SourcesConfig {
            project_source: Some(dir.path().join("Game/Source")),
            engine: Some(dir.path().join("UE")),
            auto_detect: false,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, dir.path());
        Fixture {
            _dir: dir,
            roots,
            defaults: SearchConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    impl Fixture {
        fn search(&self, request: SearchRequest) -> Result<SearchResults> {
            QueryEngine::new(&self.roots, &self.defaults, &self.cancel).search(&request)
        }
    }

    #[test]
    fn test_smart_mode_selection() {
        assert_eq!(QueryMode::Smart.resolve("Health Component"), QueryMode::Tokens);
        assert_eq!(QueryMode::Smart.resolve("Get.*Health"), QueryMode::Regex);
        assert_eq!(QueryMode::Smart.resolve("GetHealth()"), QueryMode::Regex);
        assert_eq!(QueryMode::Smart.resolve(""), QueryMode::Tokens);
        assert_eq!(QueryMode::Regex.resolve("plain"), QueryMode::Regex);
        assert_eq!("TOKENS".parse::<QueryMode>().unwrap(), QueryMode::Tokens);
        assert!("fuzzy".parse::<QueryMode>().is_err());
    }

    #[test]
    fn test_token_scoring_orders_results() {
        let fx = fixture(&[(
            "Game/Source/Game/Health.h",
            "// Health only\nint X;\nclass UHealthComponent;\nComponent only\n",
        )]);
        let results = fx.search(SearchRequest::new("Health Component").mode(QueryMode::Tokens)).unwrap();
        assert_eq!(results.mode_resolved, QueryMode::Tokens);
        assert_eq!(results.count, 3);
        assert_eq!(results.matches[0].line, 3);
        assert_eq!(results.matches[0].score, 2);
        assert_eq!(results.matches[0].matched_tokens, vec!["health", "component"]);
        assert!(results.matches[1..].iter().all(|m| m.score == 1));
        assert_eq!(results.matches[0].column, 8);
    }

    #[test]
    fn test_token_column_follows_query_order() {
        let fx = fixture(&[("Game/Source/Game/Health.h", "class UHealthComponent;\n")]);
        let results = fx.search(SearchRequest::new("Component Health").mode(QueryMode::Tokens)).unwrap();
        let m = &results.matches[0];
        assert_eq!(m.matched_tokens, vec!["component", "health"]);
        assert_eq!(m.column, 14);
    }

    #[test]
    fn test_regex_mode_and_context() {
        let fx = fixture(&[("Game/Source/A.cpp", "a\nb\nfloat GetHealth() const;\nc\nd\ne\n")]);
        let results = fx.search(SearchRequest::new(r"gethealth\(\)")).unwrap();
        assert_eq!(results.mode_resolved, QueryMode::Regex);
        assert_eq!(results.count, 1);
        let m = &results.matches[0];
        assert_eq!((m.line, m.column), (3, 7));
        assert_eq!(m.context, "a\nb\nfloat GetHealth() const;\nc\nd");
    }

    #[test]
    fn test_malformed_regex_is_reported() {
        let fx = fixture(&[("Game/Source/A.h", "x\n")]);
        let err = fx.search(SearchRequest::new("Get(").mode(QueryMode::Regex)).unwrap_err();
        assert!(matches!(err, AnalyzerError::MalformedQuery(_)));
    }

    #[test]
    fn test_cap_sets_truncated() {
        let fx = fixture(&[("Game/Source/A.h", "hit\nhit\nhit\nhit\n")]);
        let results = fx.search(SearchRequest::new("hit").max_results(2)).unwrap();
        assert_eq!(results.count, 2);
        assert!(results.truncated);

        let all = fx.search(SearchRequest::new("hit")).unwrap();
        assert_eq!(all.count, 4);
        assert!(!all.truncated);
    }

    #[test]
    fn test_comments_can_be_excluded() {
        let fx = fixture(&[("Game/Source/A.h", "// Health note\n/* Health */\nint Health;\n")]);
        let results = fx.search(SearchRequest::new("Health").include_comments(false)).unwrap();
        assert_eq!(results.count, 1);
        assert_eq!(results.matches[0].line, 3);
    }

    #[test]
    fn test_scopes_and_glob() {
        let fx = fixture(&[
            ("Game/Source/A.h", "FVector Location;\n"),
            ("UE/Engine/Source/Runtime/Core/Vector.h", "struct FVector {};\n"),
            ("UE/Engine/Source/Runtime/Core/Vector.inl", "FVector inline;\n"),
        ]);
        let project = fx.search(SearchRequest::new("FVector")).unwrap();
        assert_eq!(project.count, 1);
        assert_eq!(project.scope, SearchScope::Project);

        let engine = fx.search(SearchRequest::new("FVector").scope(SearchScope::Engine)).unwrap();
        assert_eq!(engine.count, 1);

        let all = fx
            .search(SearchRequest::new("FVector").scope(SearchScope::All).glob("*.{h,inl}"))
            .unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(all.searched_roots.len(), 2);
    }

    #[test]
    fn test_empty_scope_is_an_error() {
        let fx = fixture(&[("Game/Source/A.h", "x\n")]);
        let err = fx.search(SearchRequest::new("x").scope(SearchScope::Plugin)).unwrap_err();
        assert!(matches!(err, AnalyzerError::NoRootsConfigured { scope: SearchScope::Plugin }));
    }

    #[test]
    fn test_cancelled_search_stops() {
        let fx = fixture(&[("Game/Source/A.h", "x\n")]);
        fx.cancel.cancel();
        assert!(matches!(fx.search(SearchRequest::new("x")), Err(AnalyzerError::Cancelled)));
    }

    #[test]
    fn test_reference_pattern_is_whole_word() {
        let re = Regex::new(&reference_pattern("AHealth")).unwrap();
        assert!(re.is_match("class AHealth;"));
        assert!(!re.is_match("AHealthComponent"));
        let re = Regex::new(&reference_pattern("operator+")).unwrap();
        assert!(!re.is_match("operatorX"));
    }
}
