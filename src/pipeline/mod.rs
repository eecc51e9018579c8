//! Repository analysis pipeline
//!
//! Orchestrates the full analysis:
//! 1. Walk the working tree into an inventory
//! 2. Analyze file contents in parallel (components, imports, metrics)
//! 3. Build the relationship graph (contains, import, call, proximity,
//!    semantic similarity)
//! 4. Read git history, attach per-file git metrics and GitHub activity
//! 5. Reconstruct the sampled timeline
//! 6. Assemble metadata and the output document

mod content;

use crate::config::{load_project_config, ProjectConfig};
use crate::git::{git_file_metrics, GitHistory, TimelineBuilder, VersionControl};
use crate::github::GitHubClient;
use crate::graph::{
    proximity_edges, similarity_edges, EmbeddingProvider, ImportResolver, OpenAiEmbeddings,
    RelationshipGraph,
};
use crate::inventory::{IgnoreFilter, Inventory, InventoryBuilder};
use crate::models::{Commit, EdgeKind, History, RepositoryData};
use crate::parsers::Language;
use crate::stats::collect_metadata;
use anyhow::Result;
use chrono::{DateTime, Utc};
use content::{analyze_contents, ContentJob, ContentOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Startup failures; everything after these degrades instead of failing.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Repository path does not exist or is not a directory: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),
}

/// Reject an output path whose directory does not exist.
pub fn check_output_path(output: &Path) -> Result<(), AnalyzeError> {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            Err(AnalyzeError::OutputDirMissing(dir.to_path_buf()))
        }
        _ => Ok(()),
    }
}

/// Per-file extraction results awaiting graph construction
#[derive(Default)]
struct Extracted {
    /// `(file_id, import specifiers)` in inventory order
    imports: Vec<(String, Vec<String>)>,
    /// `(caller_id, callee_id)`, one per call site
    calls: Vec<(String, String)>,
    /// `(file_id, semantic_text)` embedding inputs
    documents: Vec<(String, String)>,
}

/// Analyzes one repository into a [`RepositoryData`] document
pub struct RepositoryAnalyzer {
    repo_path: PathBuf,
    config: ProjectConfig,
    history: bool,
    similarity: bool,
    github: bool,
    github_token: Option<String>,
    show_progress: bool,
}

impl RepositoryAnalyzer {
    /// Validate the repository root and load its project config.
    pub fn new(repo_path: &Path) -> Result<Self, AnalyzeError> {
        if !repo_path.is_dir() {
            return Err(AnalyzeError::PathNotFound(repo_path.to_path_buf()));
        }
        let repo_path = repo_path
            .canonicalize()
            .map_err(|_| AnalyzeError::PathNotFound(repo_path.to_path_buf()))?;
        if !GitHistory::is_git_repo(&repo_path) {
            return Err(AnalyzeError::NotARepository(repo_path));
        }

        let config = load_project_config(&repo_path);
        Ok(Self {
            history: config.timeline.enabled,
            similarity: config.similarity.enabled,
            repo_path,
            config,
            github: false,
            github_token: None,
            show_progress: true,
        })
    }

    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history = self.history && enabled;
        self
    }

    pub fn with_max_timeline_points(mut self, max_points: usize) -> Self {
        self.config.timeline.max_points = max_points;
        self
    }

    pub fn with_similarity(mut self, enabled: bool) -> Self {
        self.similarity = self.similarity || enabled;
        self
    }

    pub fn with_github(mut self, enabled: bool, token: Option<String>) -> Self {
        self.github = enabled;
        self.github_token = token;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run every phase and assemble the document.
    pub fn analyze(&self) -> Result<RepositoryData> {
        let now = Utc::now();
        let root = self.repo_path.as_path();
        info!("Analyzing repository at {}", root.display());

        let filter = IgnoreFilter::new(root, &self.config.exclude);
        let mut inventory = InventoryBuilder::new(root, filter.clone()).build()?;
        info!(
            "Inventory: {} files, {} directories",
            inventory.files().count(),
            inventory.directories().count()
        );

        let extracted = self.analyze_contents(&mut inventory);

        let git = match GitHistory::open(root) {
            Ok(git) => Some(
                git.with_max_commits(self.config.timeline.max_commits)
                    .with_time_budget(Duration::from_secs(self.config.timeline.max_history_seconds)),
            ),
            Err(e) => {
                warn!("Git history unavailable: {:#}", e);
                None
            }
        };

        let commits = match (&git, self.history) {
            (Some(git), true) => self.attach_history(git, &mut inventory, now),
            _ => Vec::new(),
        };

        if self.github {
            self.attach_github_activity(git.as_ref(), &mut inventory, now);
        }

        let relationships = self.build_graph(&inventory, &extracted).finalize();

        let metadata = collect_metadata(root, git.as_ref(), &commits, &inventory, now);

        let history = if commits.is_empty() {
            None
        } else {
            let baseline = match git.as_ref().map(|g| g.baseline_paths()) {
                Some(Ok(paths)) => paths,
                Some(Err(e)) => {
                    warn!("Could not read files preceding the commit window: {:#}", e);
                    Vec::new()
                }
                None => Vec::new(),
            };
            let timeline_points = TimelineBuilder::new(&inventory, &relationships)
                .with_filter(&filter)
                .with_baseline(&baseline)
                .with_max_points(self.config.timeline.max_points)
                .build(&commits);
            info!("Timeline: {} points", timeline_points.len());
            Some(History {
                commits,
                timeline_points,
            })
        };

        let mut custom_data = BTreeMap::new();
        custom_data.insert(
            "generator".to_string(),
            serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }),
        );

        Ok(RepositoryData {
            metadata,
            files: inventory.node_records(),
            relationships,
            history,
            custom_data,
        })
    }

    /// Phase 2: read files, attach components and metrics.
    fn analyze_contents(&self, inventory: &mut Inventory) -> Extracted {
        let jobs: Vec<ContentJob> = inventory
            .files()
            .map(|f| ContentJob {
                id: f.id.clone(),
                size: f.size,
                extension: f.extension.clone(),
            })
            .collect();
        let options = ContentOptions {
            max_file_size: self.config.analysis.max_file_size,
            collect_semantic: self.similarity,
            show_progress: self.show_progress,
        };

        let mut extracted = Extracted::default();
        for outcome in analyze_contents(&self.repo_path, &jobs, &options) {
            let Some(node) = inventory.get_mut(&outcome.id) else {
                continue;
            };
            if let Some(analysis) = outcome.analysis {
                node.components = analysis.components;
                node.metrics = Some(analysis.metrics);
                extracted.imports.push((outcome.id.clone(), analysis.imports));
                extracted.calls.extend(analysis.calls);
            }
            if let Some(text) = outcome.semantic {
                extracted.documents.push((outcome.id, text));
            }
        }
        extracted
    }

    /// Phase 3: the relationship graph over the finished inventory.
    fn build_graph(&self, inventory: &Inventory, extracted: &Extracted) -> RelationshipGraph {
        let mut graph = RelationshipGraph::new();
        graph.register_nodes(inventory.nodes().iter().map(|n| n.id.clone()));
        graph.register_nodes(inventory.component_ids());

        for (parent, child) in inventory.containment_pairs() {
            graph.add_edge(&parent, &child, EdgeKind::Contains);
        }

        let resolver = ImportResolver::new(inventory);
        let mut unresolved = 0usize;
        for (file_id, imports) in &extracted.imports {
            let language = Language::from_path(file_id);
            for specifier in imports {
                let targets = resolver.resolve_import(specifier, file_id, language);
                if targets.is_empty() {
                    unresolved += 1;
                }
                for target in targets {
                    if &target != file_id {
                        graph.add_edge(file_id, &target, EdgeKind::Import);
                    }
                }
            }
        }
        debug!("{} imports did not resolve to repository files", unresolved);

        for (caller, callee) in &extracted.calls {
            graph.add_edge(caller, callee, EdgeKind::Call);
        }

        if self.config.relationships.proximity {
            let accepted = graph.merge(proximity_edges(inventory.files().map(|f| f.id.as_str())));
            debug!("Proximity: {} edges", accepted);
        }

        if self.similarity {
            match OpenAiEmbeddings::from_env(&self.config.similarity.model) {
                Ok(provider) => {
                    self.add_similarity_edges(&mut graph, &provider, &extracted.documents);
                }
                Err(e) => info!("Semantic similarity disabled: {}", e),
            }
        }

        info!("Relationships: {:?}", graph.kind_counts());
        graph
    }

    fn add_similarity_edges<P: EmbeddingProvider + ?Sized>(
        &self,
        graph: &mut RelationshipGraph,
        provider: &P,
        documents: &[(String, String)],
    ) {
        let edges = similarity_edges(provider, documents, self.config.similarity.threshold);
        graph.merge(edges);
    }

    /// Phase 4: commit log plus per-file git metrics. Failures degrade to an
    /// empty history.
    fn attach_history(
        &self,
        git: &GitHistory,
        inventory: &mut Inventory,
        now: DateTime<Utc>,
    ) -> Vec<Commit> {
        let commits = match git.commits() {
            Ok(commits) => commits,
            Err(e) => {
                warn!("Could not read commit history: {:#}", e);
                return Vec::new();
            }
        };
        info!("History: {} commits", commits.len());

        let file_ids: Vec<String> = inventory.files().map(|f| f.id.clone()).collect();
        for id in file_ids {
            let metrics = match git_file_metrics(git, &id, now) {
                Ok(metrics) => metrics,
                Err(e) => {
                    warn!("Git metrics unavailable for {}: {:#}", id, e);
                    continue;
                }
            };
            if let Some(node) = inventory.get_mut(&id) {
                let target = node.metrics_mut();
                target.commit_count = metrics.commit_count;
                target.last_commit_date = metrics.last_commit_date;
                target.last_commit_days_ago = metrics.last_commit_days_ago;
            }
        }
        commits
    }

    fn attach_github_activity(
        &self,
        git: Option<&GitHistory>,
        inventory: &mut Inventory,
        now: DateTime<Utc>,
    ) {
        let Some(remote) = git.and_then(|g| g.remote_url()) else {
            warn!("Could not determine GitHub repository from git remote");
            return;
        };
        let client = GitHubClient::new(self.github_token.clone());
        let activity = match client.repository_activity(&remote, now) {
            Ok(activity) => activity,
            Err(e) => {
                warn!("GitHub activity unavailable: {}", e);
                return;
            }
        };
        let mut attached = 0usize;
        for (path, file_activity) in activity {
            if let Some(node) = inventory.get_mut(&path).filter(|n| n.is_file()) {
                node.metrics_mut().github_activity = Some(file_activity);
                attached += 1;
            }
        }
        info!("GitHub activity attached to {} files", attached);
    }
}
