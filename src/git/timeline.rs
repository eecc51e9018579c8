//! Timeline reconstruction
//!
//! Picks a bounded set of commits worth showing and rebuilds, for each, the
//! files that existed at that point by replaying the change log from the
//! first commit. Relationships are projected from the current graph onto
//! the snapshot's files.

use crate::inventory::{IgnoreFilter, Inventory, NodeLookup};
use crate::models::{
    parent_of, ChangeType, Commit, FileNode, Relationship, Snapshot, TimelinePoint, TimelineState,
};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default cap on sampled timeline points
pub const DEFAULT_MAX_POINTS: usize = 30;

/// Indices of the commits to snapshot, strictly increasing.
///
/// Always the first and the last commit, then every non-merge commit that
/// adds files, then other non-merge commits touching files spread evenly
/// over whatever is left of `max_points`.
pub fn select_timeline_indices(commits: &[Commit], max_points: usize) -> Vec<usize> {
    if commits.is_empty() {
        return Vec::new();
    }

    let mut adding = Vec::new();
    let mut touching = Vec::new();
    for (idx, commit) in commits.iter().enumerate().skip(1) {
        if commit.is_merge() {
            continue;
        }
        if commit.adds_files() {
            adding.push(idx);
        } else if !commit.file_changes.is_empty() {
            touching.push(idx);
        }
    }

    let mut indices = vec![0];
    indices.extend(adding);

    let remaining = max_points.saturating_sub(indices.len());
    if touching.len() <= remaining {
        indices.extend(touching);
    } else {
        // Spread across the whole range, not just its head
        indices.extend((0..remaining).map(|i| touching[i * touching.len() / remaining]));
    }

    indices.sort_unstable();
    indices.dedup();

    let last = commits.len() - 1;
    if indices.last() != Some(&last) {
        indices.push(last);
    }
    indices
}

/// Builds timeline points against the current inventory and graph
pub struct TimelineBuilder<'a> {
    inventory: &'a Inventory,
    relationships: &'a [Relationship],
    filter: Option<&'a IgnoreFilter>,
    baseline: &'a [String],
    max_points: usize,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(inventory: &'a Inventory, relationships: &'a [Relationship]) -> Self {
        Self {
            inventory,
            relationships,
            filter: None,
            baseline: &[],
            max_points: DEFAULT_MAX_POINTS,
        }
    }

    /// Drop historical paths the ignore rules exclude today.
    pub fn with_filter(mut self, filter: &'a IgnoreFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Paths that already existed before the first commit in the log.
    pub fn with_baseline(mut self, baseline: &'a [String]) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    /// One point per sampled commit, in commit order.
    pub fn build(&self, commits: &[Commit]) -> Vec<TimelinePoint> {
        let indices = select_timeline_indices(commits, self.max_points);
        debug!(
            "Timeline: {} points sampled from {} commits",
            indices.len(),
            commits.len()
        );

        let mut points = Vec::with_capacity(indices.len());
        let mut exists: BTreeMap<&str, bool> =
            self.baseline.iter().map(|path| (path.as_str(), true)).collect();
        let mut pending = indices.iter().peekable();

        // Single replay; a snapshot is cut whenever a sampled index is reached
        for (idx, commit) in commits.iter().enumerate() {
            for change in &commit.file_changes {
                exists.insert(
                    change.file_id.as_str(),
                    change.change_type != ChangeType::Delete,
                );
            }
            if pending.peek() == Some(&&idx) {
                pending.next();
                points.push(TimelinePoint {
                    commit_id: commit.id.clone(),
                    state: TimelineState {
                        commit_index: idx,
                        timestamp: commit.date.clone(),
                        message: commit.message.clone(),
                        author: commit.author.clone(),
                        total_commits: commits.len(),
                    },
                    snapshot: self.snapshot(&exists),
                });
            }
        }
        points
    }

    fn snapshot(&self, exists: &BTreeMap<&str, bool>) -> Snapshot {
        let mut files = Inventory::new();
        for (&path, _) in exists.iter().filter(|(_, &present)| present) {
            if self.is_filtered(path) {
                continue;
            }
            let node = match self.inventory.get(path) {
                Some(live) if live.is_file() => live.clone(),
                _ => FileNode::file(path),
            };
            files.insert(node);
        }

        let mut directories: Vec<String> = files
            .files()
            .flat_map(|f| ancestors(&f.path))
            .map(str::to_string)
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        directories.sort();
        for dir in directories {
            let node = match self.inventory.get(&dir) {
                Some(live) if live.is_directory() => live.clone(),
                _ => FileNode::directory(&dir),
            };
            files.insert(node);
        }
        files.recompute_directory_sizes();

        let mut known: FxHashSet<&str> = files.ids().collect();
        let component_ids: Vec<String> = files.component_ids();
        known.extend(component_ids.iter().map(String::as_str));

        let relationships = self
            .relationships
            .iter()
            .filter(|r| known.contains(r.source.as_str()) && known.contains(r.target.as_str()))
            .cloned()
            .collect();

        let mut nodes = files.into_nodes();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        Snapshot {
            files: nodes,
            relationships,
        }
    }

    fn is_filtered(&self, path: &str) -> bool {
        self.filter
            .is_some_and(|filter| filter.is_ignored(Path::new(path), false))
    }
}

fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_of(path), |dir| parent_of(dir))
}
