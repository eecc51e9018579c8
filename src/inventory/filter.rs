//! Path/ignore filtering
//!
//! Combines the repository's root `.gitignore`, the project's `[exclude]`
//! patterns and the always-ignore set. A path is ignored when it or any of
//! its parents matches.

use crate::config::ExcludeConfig;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use tracing::{debug, warn};

/// Decides which repo-relative paths are excluded from analysis
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    gitignore: Gitignore,
    excludes: Gitignore,
}

impl IgnoreFilter {
    /// Build the filter for a repository root.
    ///
    /// Malformed patterns are logged and skipped; the filter itself never
    /// fails to build.
    pub fn new(root: &Path, exclude: &ExcludeConfig) -> Self {
        let mut gitignore = GitignoreBuilder::new(root);
        let gitignore_path = root.join(".gitignore");
        if gitignore_path.is_file() {
            if let Some(err) = gitignore.add(&gitignore_path) {
                warn!("Partial .gitignore at {}: {}", gitignore_path.display(), err);
            }
        }

        let mut excludes = GitignoreBuilder::new(root);
        for pattern in exclude.effective_patterns() {
            if let Err(e) = excludes.add_line(None, &pattern) {
                warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e);
            }
        }

        Self {
            gitignore: build_or_empty(gitignore),
            excludes: build_or_empty(excludes),
        }
    }

    /// Whether a repo-relative path (or one of its parents) is excluded.
    pub fn is_ignored(&self, rel_path: &Path, is_directory: bool) -> bool {
        if rel_path.as_os_str().is_empty() || rel_path.has_root() {
            return false;
        }
        self.excludes
            .matched_path_or_any_parents(rel_path, is_directory)
            .is_ignore()
            || self
                .gitignore
                .matched_path_or_any_parents(rel_path, is_directory)
                .is_ignore()
    }
}

fn build_or_empty(builder: GitignoreBuilder) -> Gitignore {
    match builder.build() {
        Ok(matcher) => matcher,
        Err(e) => {
            debug!("Ignore matcher unavailable: {}", e);
            Gitignore::empty()
        }
    }
}
