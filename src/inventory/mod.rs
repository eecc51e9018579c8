//! File inventory
//!
//! Walks the working tree once and records every non-ignored file and
//! directory as a [`FileNode`] keyed by its repo-relative path. Directory
//! sizes are aggregated from their descendant files.

pub mod filter;

pub use filter::IgnoreFilter;

use crate::models::{parent_of, ComponentNode, FileNode, NodeRecord};
use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Size given to top-level component nodes in the `files` array
const COMPONENT_NODE_SIZE: u64 = 100;
/// Size given to nested (method) component nodes
const NESTED_COMPONENT_NODE_SIZE: u64 = 50;

/// Read-only id lookup used by import resolution and snapshot filtering.
pub trait NodeLookup {
    fn contains(&self, id: &str) -> bool;

    /// Every known id, in a stable order.
    fn ids(&self) -> Box<dyn Iterator<Item = &str> + '_>;
}

/// All files and directories of the working tree, in walk order
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    nodes: Vec<FileNode>,
    index: FxHashMap<String, usize>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; an existing id is left untouched.
    pub fn insert(&mut self, node: FileNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn get(&self, id: &str) -> Option<&FileNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FileNode> {
        match self.index.get(id) {
            Some(&i) => self.nodes.get_mut(i),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[FileNode] {
        &self.nodes
    }

    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.iter().filter(|n| n.is_file())
    }

    pub fn directories(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.iter().filter(|n| n.is_directory())
    }

    pub fn into_nodes(self) -> Vec<FileNode> {
        self.nodes
    }

    /// Add a synthetic directory node for every missing ancestor.
    pub fn backfill_parents(&mut self) {
        let mut missing: Vec<String> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for node in &self.nodes {
            let mut current = node.parent_path();
            while let Some(dir) = current {
                if self.index.contains_key(dir) || !seen.insert(dir.to_string()) {
                    break;
                }
                missing.push(dir.to_string());
                current = parent_of(dir);
            }
        }
        // Parents before children
        missing.sort_by_key(|dir| dir.matches('/').count());
        for dir in missing {
            debug!("Back-filling directory node {}", dir);
            self.insert(FileNode::directory(&dir));
        }
    }

    /// Set every directory's size to the sum of its descendant files.
    ///
    /// Safe to call repeatedly; sizes are recomputed from scratch.
    pub fn recompute_directory_sizes(&mut self) {
        let mut totals: FxHashMap<String, u64> = FxHashMap::default();
        for node in self.nodes.iter().filter(|n| n.is_file()) {
            let mut current = node.parent_path();
            while let Some(dir) = current {
                *totals.entry(dir.to_string()).or_insert(0) += node.size;
                current = parent_of(dir);
            }
        }
        for node in self.nodes.iter_mut().filter(|n| n.is_directory()) {
            node.size = totals.get(&node.id).copied().unwrap_or(0);
        }
    }

    /// `(parent, child)` containment pairs: directory → child, file →
    /// component, component → method.
    pub fn containment_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for node in &self.nodes {
            if let Some(parent) = node.parent_path() {
                pairs.push((parent.to_string(), node.id.clone()));
            }
            for component in &node.components {
                pairs.push((node.id.clone(), component.id.clone()));
                for nested in &component.components {
                    pairs.push((component.id.clone(), nested.id.clone()));
                }
            }
        }
        pairs
    }

    /// Ids of every component, nested ones included.
    pub fn component_ids(&self) -> Vec<String> {
        self.files()
            .flat_map(|f| f.components.iter().flat_map(|c| c.flatten()))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Output records: file nodes followed by one lightweight node per
    /// component.
    pub fn node_records(&self) -> Vec<NodeRecord> {
        let mut records: Vec<NodeRecord> =
            self.nodes.iter().cloned().map(NodeRecord::File).collect();

        for file in self.files() {
            for component in &file.components {
                records.push(NodeRecord::Component(ComponentNode {
                    id: component.id.clone(),
                    path: component.id.clone(),
                    name: component.name.clone(),
                    kind: component.kind,
                    size: COMPONENT_NODE_SIZE,
                    depth: file.depth + 1,
                    components: Vec::new(),
                }));
                for nested in &component.components {
                    records.push(NodeRecord::Component(ComponentNode {
                        id: nested.id.clone(),
                        path: nested.id.clone(),
                        name: nested.name.clone(),
                        kind: nested.kind,
                        size: NESTED_COMPONENT_NODE_SIZE,
                        depth: file.depth + 2,
                        components: Vec::new(),
                    }));
                }
            }
        }
        records
    }
}

impl NodeLookup for Inventory {
    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn ids(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.nodes.iter().map(|n| n.id.as_str()))
    }
}

/// Walks a repository root and produces an [`Inventory`]
pub struct InventoryBuilder {
    root: PathBuf,
    filter: Arc<IgnoreFilter>,
}

impl InventoryBuilder {
    pub fn new(root: impl Into<PathBuf>, filter: IgnoreFilter) -> Self {
        Self {
            root: root.into(),
            filter: Arc::new(filter),
        }
    }

    /// Walk the tree. Only a missing root fails; unreadable entries are
    /// skipped.
    pub fn build(&self) -> Result<Inventory> {
        ensure!(self.root.is_dir(), "Not a directory: {}", self.root.display());
        let mut inventory = Inventory::new();

        let filter = Arc::clone(&self.filter);
        let root = self.root.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .parents(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                match entry.path().strip_prefix(&root) {
                    Ok(rel) => !filter.is_ignored(rel, is_dir),
                    Err(_) => true,
                }
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_symlink() {
                debug!("Skipping symlink {}", entry.path().display());
                continue;
            }

            let rel = match relative_id(&self.root, entry.path()) {
                Some(rel) => rel,
                None => continue,
            };

            if file_type.is_dir() {
                inventory.insert(FileNode::directory(&rel));
            } else if file_type.is_file() {
                if let Some(node) = file_node(&rel, entry.metadata()) {
                    inventory.insert(node);
                }
            }
        }

        inventory.backfill_parents();
        inventory.recompute_directory_sizes();

        debug!(
            "Inventory: {} files, {} directories",
            inventory.files().count(),
            inventory.directories().count()
        );
        Ok(inventory)
    }
}

/// Repo-relative, forward-slash id for a path under `root`.
pub fn relative_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// File node sized and timestamped from its metadata; `None` when the file
/// could not be stat-ed (e.g. removed mid-walk).
fn file_node<E: std::fmt::Display>(rel: &str, metadata: Result<Metadata, E>) -> Option<FileNode> {
    let metadata = match metadata {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Skipping {}: failed to stat: {}", rel, e);
            return None;
        }
    };
    let mut node = FileNode::file(rel).with_size(metadata.len());
    node.created_at = metadata.created().ok().map(format_system_time);
    node.updated_at = metadata.modified().ok().map(format_system_time);
    Some(node)
}

fn format_system_time(time: std::time::SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
