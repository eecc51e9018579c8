//! Per-file content analysis
//!
//! Reads each inventoried file on the rayon pool and extracts components,
//! import specifiers, call sites and line metrics. Results come back in
//! inventory order so the single-threaded merge stays deterministic.

use crate::graph::similarity::is_code_extension;
use crate::parsers::{analyze_source, is_binary, semantic_text, FileAnalysis};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// One file to analyze
pub(super) struct ContentJob {
    pub id: String,
    pub size: u64,
    pub extension: Option<String>,
}

/// What content analysis learned about one file
pub(super) struct ContentOutcome {
    pub id: String,
    /// `None` for oversized, binary or unreadable files
    pub analysis: Option<FileAnalysis>,
    /// Embedding input, only collected when similarity is on
    pub semantic: Option<String>,
}

pub(super) struct ContentOptions {
    pub max_file_size: u64,
    pub collect_semantic: bool,
    pub show_progress: bool,
}

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("█▓▒░  ")
}

/// Analyze every job in parallel.
pub(super) fn analyze_contents(
    root: &Path,
    jobs: &[ContentJob],
    options: &ContentOptions,
) -> Vec<ContentOutcome> {
    let bar = if options.show_progress {
        ProgressBar::new(jobs.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(create_bar_style());
    bar.set_message("Analyzing files...");

    let counter = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    let outcomes: Vec<ContentOutcome> = jobs
        .par_iter()
        .map(|job| {
            let count = counter.fetch_add(1, Ordering::Relaxed);
            if count % 50 == 0 {
                bar.set_position(count as u64);
            }

            let outcome = analyze_one(root, job, options);
            if outcome.analysis.is_none() {
                skipped.fetch_add(1, Ordering::Relaxed);
            }
            outcome
        })
        .collect();

    let components: usize = outcomes
        .iter()
        .filter_map(|o| o.analysis.as_ref())
        .map(|a| a.components.iter().map(|c| 1 + c.components.len()).sum::<usize>())
        .sum();

    bar.finish_with_message(format!(
        "{}Analyzed {} files ({} components, {} skipped)",
        style("✓ ").green(),
        style(jobs.len()).cyan(),
        style(components).cyan(),
        style(skipped.load(Ordering::Relaxed)).dim(),
    ));
    outcomes
}

fn analyze_one(root: &Path, job: &ContentJob, options: &ContentOptions) -> ContentOutcome {
    let mut outcome = ContentOutcome {
        id: job.id.clone(),
        analysis: None,
        semantic: None,
    };

    if job.size > options.max_file_size {
        debug!("Skipping content of {} ({} bytes)", job.id, job.size);
        return outcome;
    }

    let bytes = match std::fs::read(root.join(&job.id)) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Failed to read {}: {}", job.id, e);
            return outcome;
        }
    };
    if is_binary(&bytes) {
        debug!("Skipping binary file {}", job.id);
        return outcome;
    }

    let content = String::from_utf8_lossy(&bytes);
    if options.collect_semantic && is_code_extension(job.extension.as_deref()) {
        outcome.semantic = Some(semantic_text(&job.id, &content));
    }
    outcome.analysis = Some(analyze_source(&job.id, &content));
    outcome
}
