//! Repository metadata and language statistics

use crate::git::GitHistory;
use crate::inventory::Inventory;
use crate::models::{Commit, Metadata, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// Language name for a lower-case file extension.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let language = match ext {
        "py" => "Python",
        "js" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "java" => "Java",
        "c" => "C",
        "cpp" => "C++",
        "h" => "C/C++ Header",
        "hpp" => "C++ Header",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "rs" => "Rust",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "md" => "Markdown",
        "json" => "JSON",
        "yml" | "yaml" => "YAML",
        "xml" => "XML",
        "sh" => "Shell",
        "bat" => "Batch",
        "ps1" => "PowerShell",
        _ => return None,
    };
    Some(language)
}

/// Fraction of file bytes per language, rounded to 4 decimals.
///
/// Extensionless files are not counted; unknown extensions are reported
/// under their upper-cased extension.
pub fn language_breakdown(inventory: &Inventory) -> BTreeMap<String, f64> {
    let mut bytes: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0u64;

    for file in inventory.files() {
        let Some(ext) = file.extension.as_deref() else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        let language = language_for_extension(&ext)
            .map(str::to_string)
            .unwrap_or_else(|| ext.to_ascii_uppercase());
        *bytes.entry(language).or_insert(0) += file.size;
        total += file.size;
    }

    if total == 0 {
        return BTreeMap::new();
    }

    bytes
        .into_iter()
        .map(|(language, size)| {
            let share = size as f64 / total as f64;
            (language, (share * 10_000.0).round() / 10_000.0)
        })
        .collect()
}

/// Repository name: the final component of the analyzed path.
pub fn repo_name(repo_path: &Path) -> String {
    repo_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| repo_path.display().to_string())
}

/// Assemble `metadata`. Commit dates fall back to `now` without history.
pub fn collect_metadata(
    repo_path: &Path,
    git: Option<&GitHistory>,
    commits: &[Commit],
    inventory: &Inventory,
    now: DateTime<Utc>,
) -> Metadata {
    let now_str = now.to_rfc3339();
    let description = git
        .and_then(|g| g.remote_url())
        .map(|url| format!("Git repository at {}", url))
        .unwrap_or_default();
    let default_branch = git
        .map(|g| g.default_branch())
        .unwrap_or_else(|| "main".to_string());

    Metadata {
        repo_name: repo_name(repo_path),
        description,
        created_at: commits
            .first()
            .map(|c| c.date.clone())
            .unwrap_or_else(|| now_str.clone()),
        updated_at: commits
            .last()
            .map(|c| c.date.clone())
            .unwrap_or_else(|| now_str.clone()),
        schema_version: SCHEMA_VERSION.to_string(),
        analysis_date: now_str,
        default_branch,
        language: language_breakdown(inventory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileNode;
    use chrono::TimeZone;

    #[test]
    fn test_language_breakdown() {
        let mut inventory = Inventory::new();
        inventory.insert(FileNode::file("a.py").with_size(300));
        inventory.insert(FileNode::file("b.JS").with_size(100));
        inventory.insert(FileNode::file("c.jsx").with_size(100));
        inventory.insert(FileNode::file("d.toml").with_size(500));
        inventory.insert(FileNode::file("Makefile").with_size(1_000));
        inventory.insert(FileNode::directory("src").with_size(9_999));

        let languages = language_breakdown(&inventory);
        assert_eq!(languages.get("Python"), Some(&0.3));
        assert_eq!(languages.get("JavaScript"), Some(&0.2));
        assert_eq!(languages.get("TOML"), Some(&0.5));
        assert_eq!(languages.len(), 3);
    }

    #[test]
    fn test_language_breakdown_rounds() {
        let mut inventory = Inventory::new();
        inventory.insert(FileNode::file("a.py").with_size(1));
        inventory.insert(FileNode::file("b.rs").with_size(2));

        let languages = language_breakdown(&inventory);
        assert_eq!(languages.get("Python"), Some(&0.3333));
        assert_eq!(languages.get("Rust"), Some(&0.6667));
    }

    #[test]
    fn test_empty_inventory_has_no_languages() {
        assert!(language_breakdown(&Inventory::new()).is_empty());
    }

    #[test]
    fn test_metadata_without_history() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let metadata = collect_metadata(
            Path::new("/work/my-project"),
            None,
            &[],
            &Inventory::new(),
            now,
        );
        assert_eq!(metadata.repo_name, "my-project");
        assert_eq!(metadata.description, "");
        assert_eq!(metadata.default_branch, "main");
        assert_eq!(metadata.created_at, "2024-05-01T08:30:00+00:00");
        assert_eq!(metadata.updated_at, metadata.created_at);
        assert_eq!(metadata.schema_version, "1.0.0");
    }
}
