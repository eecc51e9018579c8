//! CLI definition and handler

use crate::models::{EdgeKind, NodeRecord, RepositoryData};
use crate::pipeline::{check_output_path, RepositoryAnalyzer};
use crate::reporters;
use anyhow::Result;
use clap::Parser;
use console::style;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

/// Parse and validate the timeline point cap (at least 1)
fn parse_max_points(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("max timeline points must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// repoviz - repository visualization data generator
#[derive(Parser, Debug)]
#[command(name = "repoviz")]
#[command(
    version,
    about = "Analyze a local git repository and emit visualization data as JSON",
    long_about = "repoviz walks a git working tree, extracts files, code components and \
the relationships between them (containment, imports, calls, filesystem proximity), \
reconstructs a sampled commit timeline, and writes everything as one JSON document \
for a visualization front-end.",
    after_help = "\
Examples:
  repoviz .                                  Analyze current directory
  repoviz ../project -o project.json         Custom output file
  repoviz . --no-history                     Skip commit history and timeline
  repoviz . --github                         Add open pull request activity"
)]
pub struct Cli {
    /// Path to the local git repository
    #[arg(default_value = ".")]
    pub repo_path: PathBuf,

    /// Output JSON file
    #[arg(long, short = 'o', default_value = "repo_data.json")]
    pub output: PathBuf,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Skip commit history, per-file git metrics and the timeline
    #[arg(long)]
    pub no_history: bool,

    /// Maximum number of sampled timeline points
    #[arg(long, value_parser = parse_max_points)]
    pub max_timeline_points: Option<usize>,

    /// Add semantic similarity edges (needs OPENAI_API_KEY)
    #[arg(long)]
    pub similarity: bool,

    /// Fetch open pull request activity from GitHub
    #[arg(long)]
    pub github: bool,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Run the analysis described by the parsed arguments.
pub fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();

    check_output_path(&cli.output)?;
    let mut analyzer = RepositoryAnalyzer::new(&cli.repo_path)?
        .with_history(!cli.no_history)
        .with_similarity(cli.similarity)
        .with_github(cli.github, cli.github_token.clone());
    if let Some(max_points) = cli.max_timeline_points {
        analyzer = analyzer.with_max_timeline_points(max_points);
    }

    println!(
        "{}Analyzing: {}",
        style("🔍 ").bold(),
        style(analyzer.repo_path().display()).cyan()
    );

    let data = analyzer.analyze()?;
    reporters::write_report(&data, &cli.output)?;

    print_summary(&data);
    println!(
        "\n{}Wrote {} in {:.2}s",
        style("✓ ").green(),
        style(cli.output.display()).cyan(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn print_summary(data: &RepositoryData) {
    let mut files = 0usize;
    let mut directories = 0usize;
    let mut components = 0usize;
    for record in &data.files {
        match record {
            NodeRecord::File(node) if node.is_file() => files += 1,
            NodeRecord::File(_) => directories += 1,
            NodeRecord::Component(_) => components += 1,
        }
    }

    let mut by_kind: BTreeMap<EdgeKind, usize> = BTreeMap::new();
    for rel in &data.relationships {
        *by_kind.entry(rel.kind).or_insert(0) += 1;
    }
    let breakdown: Vec<String> = by_kind
        .iter()
        .map(|(kind, count)| format!("{} {}", count, kind))
        .collect();

    println!(
        "  {} files, {} directories, {} components",
        style(files).cyan(),
        style(directories).cyan(),
        style(components).cyan()
    );
    println!(
        "  {} relationships {}",
        style(data.relationships.len()).cyan(),
        style(format!("({})", breakdown.join(", "))).dim()
    );
    match &data.history {
        Some(history) => println!(
            "  {} commits, {} timeline points",
            style(history.commits.len()).cyan(),
            style(history.timeline_points.len()).cyan()
        ),
        None => println!("  {}", style("no history").dim()),
    }
}
