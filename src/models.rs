//! Core data models for repoviz
//!
//! These records make up the JSON document consumed by the visualization
//! front-end. Field names are serialized in camelCase; optional fields are
//! omitted when absent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the output document layout.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Whether a [`FileNode`] is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// Kind of an extracted code component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Class,
    Function,
    Method,
    Variable,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Class => write!(f, "class"),
            ComponentKind::Function => write!(f, "function"),
            ComponentKind::Method => write!(f, "method"),
            ComponentKind::Variable => write!(f, "variable"),
        }
    }
}

/// Metrics attached to a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_of_code: Option<u32>,
}

/// A class, function or method extracted from a file.
///
/// Components are owned by exactly one [`FileNode`]; methods nest one level
/// under their class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// `{file_path}:{qualified_name}`
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    /// 1-based, inclusive
    pub line_start: u32,
    /// 1-based, inclusive, never before `line_start`
    pub line_end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ComponentMetrics>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Component {
    /// Build a component, qualifying its id with the owning file path.
    pub fn new(
        file_path: &str,
        qualified_name: &str,
        name: &str,
        kind: ComponentKind,
        line_start: u32,
        line_end: u32,
    ) -> Self {
        let line_end = line_end.max(line_start);
        Self {
            id: format!("{}:{}", file_path, qualified_name),
            name: name.to_string(),
            kind,
            line_start,
            line_end,
            metrics: Some(ComponentMetrics {
                lines_of_code: Some(line_end - line_start + 1),
            }),
            components: Vec::new(),
        }
    }

    /// This component followed by its nested children, depth-first.
    pub fn flatten(&self) -> impl Iterator<Item = &Component> {
        std::iter::once(self).chain(self.components.iter())
    }
}

/// Activity of a file across open pull requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubActivity {
    pub pr_count: u32,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub total_changes: u64,
    pub pr_numbers: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_pr_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_pr_date: Option<String>,
    /// PR count relative to the busiest file (0..=1)
    pub change_frequency: f64,
    /// 0.7 × change intensity + 0.3 × recency (0..=1)
    pub activity_score: f64,
}

/// Metrics attached to a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_of_code: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_level_identifiers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_days_ago: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_activity: Option<GithubActivity>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, serde_json::Value>,
}

/// A file or directory in the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Repo-root-relative, forward-slash path
    pub id: String,
    pub path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Bytes for files; sum of descendant files for directories
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Number of ancestor directories below the repo root. Directories
    /// follow the same rule as files, so top-level `src` is 0 and
    /// `src/utils` is 1.
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FileMetrics>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl FileNode {
    fn new(path: &str, kind: FileKind) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let extension = match kind {
            FileKind::File => extension_of(&name),
            FileKind::Directory => None,
        };
        Self {
            id: path.to_string(),
            path: path.to_string(),
            name,
            extension,
            size: 0,
            kind,
            depth: depth_of(path),
            created_at: None,
            updated_at: None,
            metrics: None,
            components: Vec::new(),
        }
    }

    pub fn file(path: &str) -> Self {
        Self::new(path, FileKind::File)
    }

    pub fn directory(path: &str) -> Self {
        Self::new(path, FileKind::Directory)
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Parent directory path, `None` for entries at the repo root.
    pub fn parent_path(&self) -> Option<&str> {
        parent_of(&self.path)
    }

    /// Mutable metrics, created on first access.
    pub fn metrics_mut(&mut self) -> &mut FileMetrics {
        self.metrics.get_or_insert_with(FileMetrics::default)
    }
}

/// Lightweight graph node emitted for each component, so the front-end can
/// render components alongside files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub id: String,
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub size: u64,
    pub depth: usize,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// An entry of the document's `files` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRecord {
    File(FileNode),
    Component(ComponentNode),
}

impl NodeRecord {
    pub fn id(&self) -> &str {
        match self {
            NodeRecord::File(f) => &f.id,
            NodeRecord::Component(c) => &c.id,
        }
    }
}

/// Relationship types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Import,
    Call,
    FilesystemProximity,
    SemanticSimilarity,
}

impl EdgeKind {
    /// Symmetric kinds are keyed on the sorted endpoint pair.
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            EdgeKind::FilesystemProximity | EdgeKind::SemanticSimilarity
        )
    }

    /// Counted kinds report their occurrence count as strength.
    pub fn is_counted(self) -> bool {
        matches!(self, EdgeKind::Import | EdgeKind::Call)
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Contains => write!(f, "contains"),
            EdgeKind::Import => write!(f, "import"),
            EdgeKind::Call => write!(f, "call"),
            EdgeKind::FilesystemProximity => write!(f, "filesystem_proximity"),
            EdgeKind::SemanticSimilarity => write!(f, "semantic_similarity"),
        }
    }
}

/// A finalized relationship between two files or components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

/// How a commit touched a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Modify,
    Delete,
}

/// One file touched by a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub file_id: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub additions: usize,
    pub deletions: usize,
}

/// A commit, as extracted from version control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Full hash
    pub id: String,
    /// `Name <email>`
    pub author: String,
    /// ISO 8601
    pub date: String,
    /// Summary line
    pub message: String,
    pub file_changes: Vec<FileChange>,
}

impl Commit {
    /// Heuristic: merge commits carry git's default merge message.
    pub fn is_merge(&self) -> bool {
        self.message.starts_with("Merge ")
    }

    pub fn adds_files(&self) -> bool {
        self.file_changes
            .iter()
            .any(|c| c.change_type == ChangeType::Add)
    }
}

/// Summary of the repository state at a timeline point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineState {
    pub commit_index: usize,
    pub timestamp: String,
    pub message: String,
    pub author: String,
    pub total_commits: usize,
}

/// Files and relationships that existed as of a commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub files: Vec<FileNode>,
    pub relationships: Vec<Relationship>,
}

/// A sampled point of the commit timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub commit_id: String,
    pub state: TimelineState,
    pub snapshot: Snapshot,
}

/// Commit history plus sampled timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub commits: Vec<Commit>,
    pub timeline_points: Vec<TimelinePoint>,
}

/// Repository-level descriptive metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub repo_name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub schema_version: String,
    pub analysis_date: String,
    pub default_branch: String,
    /// Language name to fraction of analyzed bytes
    pub language: BTreeMap<String, f64>,
}

/// The complete output document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryData {
    pub metadata: Metadata,
    pub files: Vec<NodeRecord>,
    pub relationships: Vec<Relationship>,
    pub history: Option<History>,
    #[serde(default)]
    pub custom_data: BTreeMap<String, serde_json::Value>,
}

/// Parent directory of a repo-relative path (`None` at the root).
pub fn parent_of(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

/// Number of ancestor directories of a repo-relative path.
pub fn depth_of(path: &str) -> usize {
    path.matches('/').count()
}

/// Extension of a file name without the dot; dotfiles have none.
pub fn extension_of(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx + 1..].to_string()),
        _ => None,
    }
}
