// Configuration management for uegraph

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::index::cache::DEFAULT_MAX_SIZE;
use crate::index::roots::SearchScope;

pub const CONFIG_FILE_NAME: &str = ".uegraph.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// `<Project>/Source`
    pub project_source: Option<PathBuf>,
    /// `<Project>/Plugins`, scanned for `*/Source`
    pub project_plugins: Option<PathBuf>,
    /// Engine install root (or its `Engine/Source` directly)
    pub engine: Option<PathBuf>,
    /// Engine `Plugins` directory, scanned recursively for `Source`
    pub engine_plugins: Option<PathBuf>,
    /// Walk up from the working directory looking for a `.uproject`
    pub auto_detect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_scope: SearchScope,
    pub max_results: usize,
    pub file_glob: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            project_source: None,
            project_plugins: None,
            engine: None,
            engine_plugins: None,
            auto_detect: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_scope: SearchScope::Project,
            max_results: 500,
            file_glob: "*.{h,cpp}".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from project directory
    /// Looks for .uegraph.toml in the project root
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            tracing::debug!("No {} in {}", CONFIG_FILE_NAME, project_dir.as_ref().display());
            return Self::default();
        }

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Could not load config from {}: {}", config_path.display(), e);
                tracing::info!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        if let Some(p) = path("CPP_SOURCE_PATH") {
            self.sources.project_source = Some(p);
        }
        if let Some(p) = path("PROJECT_PLUGINS_PATH") {
            self.sources.project_plugins = Some(p);
        }
        if let Some(p) = path("UNREAL_ENGINE_PATH") {
            self.sources.engine = Some(p);
        }
        if let Some(p) = path("ENGINE_PLUGINS_PATH") {
            self.sources.engine_plugins = Some(p);
        }
        if let Some(v) = lookup("ANALYZER_AUTO_DETECT_PROJECT_SOURCE") {
            self.sources.auto_detect = parse_bool(&v);
        }
        if let Some(v) = lookup("ANALYZER_CACHE_ENABLED") {
            self.cache.enabled = parse_bool(&v);
        }
        if let Some(v) = lookup("ANALYZER_CACHE_MAX_SIZE") {
            match v.trim().parse::<usize>() {
                Ok(size) => self.cache.max_size = size,
                Err(_) => tracing::warn!("Ignoring invalid ANALYZER_CACHE_MAX_SIZE: {}", v),
            }
        }
        if let Some(v) = lookup("DEFAULT_SEARCH_SCOPE") {
            self.search.default_scope = v.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; falling back to project", e);
                SearchScope::Project
            });
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache.enabled && self.cache.max_size == 0 {
            return Err(anyhow::anyhow!("Cache max size must be greater than 0 when the cache is enabled"));
        }

        if self.search.max_results == 0 {
            return Err(anyhow::anyhow!("Search max results must be greater than 0"));
        }
        if self.search.file_glob.trim().is_empty() {
            return Err(anyhow::anyhow!("Search file glob cannot be empty"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!("Invalid log level: {}", self.logging.level));
        }
        let valid_formats = ["compact", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!("Invalid log format: {}", self.logging.format));
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Load configuration for a project, with environment overrides applied
pub fn load_config(project_dir: &Path) -> Config {
    let mut config = Config::from_project_dir(project_dir);
    config.apply_env();
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.search.default_scope, SearchScope::Project);
        assert_eq!(config.search.max_results, 500);
        assert_eq!(config.search.file_glob, "*.{h,cpp}");
        assert!(config.sources.auto_detect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[search]\ndefault_scope = \"all\"\n\n[sources]\nengine = \"/opt/UE_5.4\"\n",
        )
        .unwrap();

        let config = Config::from_project_dir(dir.path());
        assert_eq!(config.search.default_scope, SearchScope::All);
        assert_eq!(config.search.max_results, 500);
        assert_eq!(config.sources.engine, Some(PathBuf::from("/opt/UE_5.4")));
        assert!(config.sources.auto_detect);
    }

    #[test]
    fn test_invalid_file_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[logging]\nlevel = \"loud\"\n").unwrap();

        let config = Config::from_project_dir(dir.path());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CPP_SOURCE_PATH", "/work/Game/Source"),
            ("UNREAL_ENGINE_PATH", "/opt/UE"),
            ("ANALYZER_CACHE_ENABLED", "no"),
            ("ANALYZER_CACHE_MAX_SIZE", "42"),
            ("DEFAULT_SEARCH_SCOPE", "Engine"),
            ("ANALYZER_AUTO_DETECT_PROJECT_SOURCE", "0"),
            ("PROJECT_PLUGINS_PATH", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.sources.project_source, Some(PathBuf::from("/work/Game/Source")));
        assert_eq!(config.sources.engine, Some(PathBuf::from("/opt/UE")));
        assert_eq!(config.sources.project_plugins, None);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_size, 42);
        assert_eq!(config.search.default_scope, SearchScope::Engine);
        assert!(!config.sources.auto_detect);
    }

    #[test]
    fn test_env_bad_values() {
        let mut config = Config::default();
        config.search.default_scope = SearchScope::All;
        config.apply_env_from(|k| match k {
            "DEFAULT_SEARCH_SCOPE" => Some("galaxy".to_string()),
            "ANALYZER_CACHE_MAX_SIZE" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(config.search.default_scope, SearchScope::Project);
        assert_eq!(config.cache.max_size, 1000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.cache.max_size = 0;
        assert!(config.validate().is_err());
        config.cache.enabled = false;
        assert!(config.validate().is_ok());
        config.cache.enabled = true;
        config.cache.max_size = 10;

        config.search.max_results = 0;
        assert!(config.validate().is_err());
        config.search.max_results = 10;

        config.search.file_glob = "  ".to_string();
        assert!(config.validate().is_err());
        config.search.file_glob = "*.h".to_string();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "info".to_string();

        config.logging.format = "json".to_string();
        assert!(config.validate().is_err());
    }
}
