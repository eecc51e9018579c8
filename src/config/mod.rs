//! Configuration module for repoviz
//!
//! Project-level configuration (repoviz.toml) covering exclusions, content
//! limits, timeline sampling and relationship producers. CLI flags override
//! whatever is loaded here.

mod project_config;

pub use project_config::{
    load_project_config, AnalysisConfig, ExcludeConfig, ProjectConfig, RelationshipsConfig,
    SimilarityConfig, TimelineConfig, ALWAYS_IGNORE_PATTERNS, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TIMELINE_POINTS, DEFAULT_SIMILARITY_THRESHOLD,
};
