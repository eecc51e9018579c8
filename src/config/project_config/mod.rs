//! Project-level configuration support
//!
//! Loads per-project configuration from `repoviz.toml` or `.repovizrc.json`
//! in the repository root.
//!
//! # Configuration Format
//!
//! ```toml
//! # repoviz.toml
//!
//! [exclude]
//! paths = ["generated/", "docs/_build/"]
//!
//! [analysis]
//! max_file_size = 1048576
//!
//! [timeline]
//! enabled = true
//! max_points = 30
//! max_commits = 0        # 0 = whole history
//!
//! [relationships]
//! proximity = true
//!
//! [similarity]
//! enabled = false
//! threshold = 0.7
//! model = "text-embedding-3-small"
//! ```

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Entries that are never analyzed. Matched against every path component,
/// gitignore-style.
pub const ALWAYS_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    "build",
    "dist",
    ".next",
    ".nuxt",
    "coverage",
    ".coverage",
    "*.egg-info",
    ".tox",
    ".nox",
    "vendor",
    ".DS_Store",
    "Thumbs.db",
];

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_TIMELINE_POINTS: usize = 30;
pub const DEFAULT_MAX_HISTORY_SECONDS: u64 = 120;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Project-level configuration loaded from repoviz.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub exclude: ExcludeConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub relationships: RelationshipsConfig,

    #[serde(default)]
    pub similarity: SimilarityConfig,
}

/// Path exclusion configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExcludeConfig {
    /// Gitignore-style patterns to exclude from analysis
    #[serde(default)]
    pub paths: Vec<String>,

    /// If true, disable the built-in always-ignore set
    #[serde(default)]
    pub skip_defaults: bool,
}

impl ExcludeConfig {
    /// Returns effective exclusion patterns (always-ignore set + user patterns).
    /// If `skip_defaults` is true, only user patterns are returned.
    pub fn effective_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();

        if !self.skip_defaults {
            patterns.extend(ALWAYS_IGNORE_PATTERNS.iter().map(|s| s.to_string()));
        }

        for p in &self.paths {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }

        patterns
    }
}

/// Content analysis limits
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Files above this many bytes keep their inventory entry but are not read
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// History extraction and timeline sampling
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Keep only the newest N commits (0 = unbounded)
    #[serde(default)]
    pub max_commits: usize,

    /// Stop reading the commit log after this many seconds
    #[serde(default = "default_max_history_seconds")]
    pub max_history_seconds: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_points: DEFAULT_MAX_TIMELINE_POINTS,
            max_commits: 0,
            max_history_seconds: DEFAULT_MAX_HISTORY_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipsConfig {
    /// Emit filesystem_proximity edges
    #[serde(default = "default_true")]
    pub proximity: bool,
}

impl Default for RelationshipsConfig {
    fn default() -> Self {
        Self { proximity: true }
    }
}

/// Embedding-based semantic similarity (opt-in, needs OPENAI_API_KEY)
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_history_seconds() -> u64 {
    DEFAULT_MAX_HISTORY_SECONDS
}

fn default_max_points() -> usize {
    DEFAULT_MAX_TIMELINE_POINTS
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

/// Load project configuration from the repository root.
///
/// Tries `repoviz.toml` first, then `.repovizrc.json`. A file that fails to
/// parse is reported and skipped; with nothing usable the defaults apply.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    let toml_path = repo_path.join("repoviz.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = repo_path.join(".repovizrc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = serde_json::from_str(&content)?;
    Ok(config)
}
