//! Git history analysis module
//!
//! Extracts the commit log with per-commit file changes, derives per-file
//! git metrics and reconstructs a sampled timeline of repository snapshots.
//!
//! # Example
//!
//! ```no_run
//! use repoviz::git::{GitHistory, VersionControl};
//! use std::path::Path;
//!
//! let history = GitHistory::open(Path::new("/path/to/repo")).unwrap();
//! let commits = history.commits().unwrap();
//! let touching = history.path_history("src/main.py").unwrap();
//! ```

pub mod history;
pub mod timeline;

pub use history::{sanitize_remote_url, GitHistory};
pub use timeline::{select_timeline_indices, TimelineBuilder};

use crate::models::{Commit, FileChange, FileMetrics};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Read access to a repository's history
pub trait VersionControl {
    /// Every commit reachable from HEAD, oldest first.
    fn commits(&self) -> Result<Vec<Commit>>;

    /// Files touched by one commit.
    fn file_changes(&self, commit_id: &str) -> Result<Vec<FileChange>>;

    /// Commits touching a path, newest first.
    fn path_history(&self, path: &str) -> Result<Vec<Commit>>;
}

/// `commitCount`, `lastCommitDate` and `lastCommitDaysAgo` for a path.
pub fn git_file_metrics<V: VersionControl + ?Sized>(
    vcs: &V,
    path: &str,
    now: DateTime<Utc>,
) -> Result<FileMetrics> {
    let history = vcs.path_history(path)?;
    let mut metrics = FileMetrics {
        commit_count: Some(history.len()),
        ..Default::default()
    };
    if let Some(latest) = history.first() {
        metrics.last_commit_date = Some(latest.date.clone());
        metrics.last_commit_days_ago = days_since(&latest.date, now);
    }
    Ok(metrics)
}

/// Whole days elapsed between an RFC 3339 date and `now`.
pub fn days_since(date: &str, now: DateTime<Utc>) -> Option<i64> {
    let then = DateTime::parse_from_rfc3339(date).ok()?;
    Some((now - then.with_timezone(&Utc)).num_days())
}
