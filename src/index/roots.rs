// Source roots and the logical scopes that select them

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::SourcesConfig;

/// How many directories (start included) are checked for a `.uproject` file
const PROJECT_MARKER_SEARCH_DEPTH: usize = 8;

/// Which tier of the codebase a root belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ProjectSource,
    ProjectPlugin,
    EngineSource,
    EnginePlugin,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::ProjectSource => "project_source",
            SourceKind::ProjectPlugin => "project_plugin",
            SourceKind::EngineSource => "engine_source",
            SourceKind::EnginePlugin => "engine_plugin",
        }
    }

    pub fn is_engine(&self) -> bool {
        matches!(self, SourceKind::EngineSource | SourceKind::EnginePlugin)
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self, SourceKind::ProjectPlugin | SourceKind::EnginePlugin)
    }
}

/// Logical search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Project source and project plugins
    #[default]
    Project,
    /// Engine source and engine plugins
    Engine,
    /// Project and engine plugins
    Plugin,
    All,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Project => "project",
            SearchScope::Engine => "engine",
            SearchScope::Plugin => "plugin",
            SearchScope::All => "all",
        }
    }

    pub fn includes(&self, kind: SourceKind) -> bool {
        match self {
            SearchScope::Project => !kind.is_engine(),
            SearchScope::Engine => kind.is_engine(),
            SearchScope::Plugin => kind.is_plugin(),
            SearchScope::All => true,
        }
    }

    /// Kinds whose files must never appear in results for this scope, even
    /// when an in-scope root happens to contain them.
    pub fn excludes(&self, kind: SourceKind) -> bool {
        match self {
            SearchScope::Project => kind.is_engine(),
            SearchScope::Engine | SearchScope::Plugin | SearchScope::All => false,
        }
    }
}

impl std::fmt::Display for SearchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(SearchScope::Project),
            "engine" => Ok(SearchScope::Engine),
            "plugin" => Ok(SearchScope::Plugin),
            "all" => Ok(SearchScope::All),
            other => Err(format!(
                "unknown scope '{}', expected one of: project, engine, plugin, all",
                other
            )),
        }
    }
}

/// A resolved source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRoot {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub label: String,
}

/// Ordered, de-duplicated list of source roots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRoots {
    roots: Vec<SourceRoot>,
}

impl SourceRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve roots from configuration, auto-detecting project directories
    /// by walking up from `start_dir`.
    pub fn from_config(sources: &SourcesConfig, start_dir: &Path) -> Self {
        let mut roots = Self::new();
        let project_root = if sources.auto_detect {
            find_project_root(start_dir)
        } else {
            None
        };
        if let Some(root) = &project_root {
            info!("Detected project root {}", root.display());
        }

        // Project source
        if let Some(path) = &sources.project_source {
            roots.push_explicit(path, SourceKind::ProjectSource, SourceKind::ProjectSource.as_str());
        } else if let Some(root) = &project_root {
            let source = root.join("Source");
            if source.is_dir() {
                roots.push(&source, SourceKind::ProjectSource, "auto_project");
            }
        }

        // Project plugins
        let plugins_dir = match &sources.project_plugins {
            Some(path) if !path.is_dir() => {
                warn!("Project plugins path {} does not exist, skipping", path.display());
                None
            }
            Some(path) => Some(path.clone()),
            None => project_root.as_ref().map(|root| root.join("Plugins")),
        };
        if let Some(dir) = plugins_dir {
            for source in plugin_source_dirs(&dir) {
                let label = plugin_label(&source);
                roots.push(&source, SourceKind::ProjectPlugin, &label);
            }
        }

        // Engine source
        if let Some(engine) = &sources.engine {
            let engine_source = engine.join("Engine").join("Source");
            if engine_source.is_dir() {
                roots.push(&engine_source, SourceKind::EngineSource, SourceKind::EngineSource.as_str());
            } else {
                roots.push_explicit(engine, SourceKind::EngineSource, SourceKind::EngineSource.as_str());
            }
        }

        // Engine plugins
        let engine_plugins = match (&sources.engine_plugins, &sources.engine) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(engine)) => Some(engine.join("Engine").join("Plugins")),
            (None, None) => None,
        };
        if let Some(dir) = engine_plugins {
            if dir.is_dir() {
                for source in nested_source_dirs(&dir) {
                    let label = plugin_label(&source);
                    roots.push(&source, SourceKind::EnginePlugin, &label);
                }
            } else if sources.engine_plugins.is_some() {
                warn!("Engine plugins path {} does not exist, skipping", dir.display());
            }
        }

        debug!("Resolved {} source roots", roots.len());
        roots
    }

    /// Add a root; returns false if the path does not resolve or is already present.
    pub fn push(&mut self, path: &Path, kind: SourceKind, label: &str) -> bool {
        let resolved = match path.canonicalize() {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Cannot resolve {}: {}", path.display(), e);
                return false;
            }
        };
        if self.roots.iter().any(|r| r.path == resolved) {
            debug!("Skipping duplicate root {}", resolved.display());
            return false;
        }
        self.roots.push(SourceRoot {
            path: resolved,
            kind,
            label: label.to_string(),
        });
        true
    }

    fn push_explicit(&mut self, path: &Path, kind: SourceKind, label: &str) {
        if !path.is_dir() {
            warn!("Configured {} path {} does not exist, skipping", kind.as_str(), path.display());
            return;
        }
        self.push(path, kind, label);
    }

    pub fn all(&self) -> &[SourceRoot] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Roots selected by `scope`, in configuration order
    pub fn for_scope(&self, scope: SearchScope) -> Vec<&SourceRoot> {
        self.roots.iter().filter(|r| scope.includes(r.kind)).collect()
    }

    pub fn paths_for(&self, scope: SearchScope) -> Vec<PathBuf> {
        self.for_scope(scope).into_iter().map(|r| r.path.clone()).collect()
    }

    /// Whether a file may be reported for `scope`.
    ///
    /// The file must sit under a root the scope selects and under no root
    /// of a kind the scope excludes.
    pub fn admits(&self, file: &Path, scope: SearchScope) -> bool {
        if scope == SearchScope::All {
            return true;
        }
        let mut inside = false;
        for root in &self.roots {
            if !file.starts_with(&root.path) {
                continue;
            }
            if scope.excludes(root.kind) {
                return false;
            }
            if scope.includes(root.kind) {
                inside = true;
            }
        }
        inside
    }
}

/// Walk up from `start` looking for a directory containing a `*.uproject` file.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .take(PROJECT_MARKER_SEARCH_DEPTH)
        .find(|dir| contains_project_file(dir))
        .map(Path::to_path_buf)
}

fn contains_project_file(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| entry.path().extension().is_some_and(|ext| ext == "uproject"))
}

/// `<dir>/*/Source` directories, sorted by plugin name
fn plugin_source_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path().join("Source"))
        .filter(|source| source.is_dir())
        .collect();
    found.sort();
    found
}

/// Every `Source` directory below `dir`, without descending into one once found
fn nested_source_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(dir).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable plugin entry: {}", e);
                continue;
            }
        };
        if entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == "Source" {
            found.push(entry.into_path());
            walker.skip_current_dir();
        }
    }
    found
}

fn plugin_label(source_dir: &Path) -> String {
    source_dir
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plugin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mkdirs(base: &Path, rel: &[&str]) {
        for r in rel {
            fs::create_dir_all(base.join(r)).unwrap();
        }
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("Engine".parse::<SearchScope>().unwrap(), SearchScope::Engine);
        assert_eq!(" all ".parse::<SearchScope>().unwrap(), SearchScope::All);
        assert!("everything".parse::<SearchScope>().is_err());
        assert_eq!(SearchScope::default(), SearchScope::Project);
    }

    #[test]
    fn test_scope_membership() {
        assert!(SearchScope::Project.includes(SourceKind::ProjectPlugin));
        assert!(!SearchScope::Project.includes(SourceKind::EngineSource));
        assert!(SearchScope::Plugin.includes(SourceKind::EnginePlugin));
        assert!(!SearchScope::Plugin.includes(SourceKind::ProjectSource));
        assert!(SearchScope::All.includes(SourceKind::EngineSource));
    }

    #[test]
    fn test_auto_detect_project_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        mkdirs(root, &["Source/Game", "Plugins/Alpha/Source", "Plugins/Beta/Content"]);
        fs::write(root.join("Game.uproject"), "{}").unwrap();
        mkdirs(root, &["Source/Game/Private"]);

        let sources = SourcesConfig {
            auto_detect: true,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, &root.join("Source/Game/Private"));

        let project = roots.for_scope(SearchScope::Project);
        assert_eq!(project.len(), 2);
        assert_eq!(project[0].label, "auto_project");
        assert_eq!(project[0].kind, SourceKind::ProjectSource);
        assert_eq!(project[1].label, "Alpha");
        assert_eq!(project[1].kind, SourceKind::ProjectPlugin);
        assert!(roots.for_scope(SearchScope::Engine).is_empty());
    }

    #[test]
    fn test_engine_layout_and_nested_plugins() {
        let dir = TempDir::new().unwrap();
        let engine = dir.path().join("UE_5.4");
        mkdirs(
            &engine,
            &[
                "Engine/Source/Runtime",
                "Engine/Plugins/Runtime/GameplayAbilities/Source/GameplayAbilities",
                "Engine/Plugins/Editor/Foo/Source",
            ],
        );
        let sources = SourcesConfig {
            engine: Some(engine.clone()),
            auto_detect: false,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, dir.path());

        let engine_roots = roots.for_scope(SearchScope::Engine);
        assert_eq!(engine_roots[0].kind, SourceKind::EngineSource);
        assert!(engine_roots[0].path.ends_with("Engine/Source"));
        let labels: Vec<&str> = roots
            .for_scope(SearchScope::Plugin)
            .iter()
            .map(|r| r.label.as_str())
            .collect();
        // Source dirs are not descended into, so the inner GameplayAbilities module is not a root
        assert_eq!(labels, vec!["Foo", "GameplayAbilities"]);
    }

    #[test]
    fn test_engine_path_fallback_and_dedup() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("EngineSrc");
        mkdirs(&src, &["Runtime"]);
        let sources = SourcesConfig {
            engine: Some(src.clone()),
            project_source: Some(src.clone()),
            auto_detect: false,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, dir.path());
        // Same resolved path is only registered once, first kind wins
        assert_eq!(roots.len(), 1);
        assert_eq!(roots.all()[0].kind, SourceKind::ProjectSource);
    }

    #[test]
    fn test_missing_explicit_paths_are_skipped() {
        let dir = TempDir::new().unwrap();
        let sources = SourcesConfig {
            project_source: Some(dir.path().join("nope")),
            project_plugins: Some(dir.path().join("nope2")),
            auto_detect: false,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, dir.path());
        assert!(roots.is_empty());
    }

    #[test]
    fn test_auto_detect_without_marker_finds_nothing() {
        let dir = TempDir::new().unwrap();
        mkdirs(dir.path(), &["Source"]);
        let sources = SourcesConfig {
            auto_detect: true,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, dir.path());
        assert!(roots.for_scope(SearchScope::Project).is_empty());
        assert!(find_project_root(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn test_admits_rejects_engine_files_for_project_scope() {
        let dir = TempDir::new().unwrap();
        let engine = dir.path().join("UE");
        mkdirs(&engine, &["Engine/Source/Runtime/Core"]);
        let sources = SourcesConfig {
            engine: Some(engine.clone()),
            // Misconfigured: project source points inside the engine tree
            project_source: Some(engine.join("Engine/Source/Runtime")),
            auto_detect: false,
            ..Default::default()
        };
        let roots = SourceRoots::from_config(&sources, dir.path());
        let file = roots.all()[0].path.join("Core/Object.h");

        assert!(!roots.admits(&file, SearchScope::Project));
        assert!(roots.admits(&file, SearchScope::Engine));
        assert!(roots.admits(&file, SearchScope::All));
        assert!(!roots.admits(Path::new("/elsewhere/x.h"), SearchScope::Engine));
    }
}
