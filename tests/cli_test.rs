//! End-to-end tests for the repoviz binary
//!
//! Each test builds a throwaway git repository with git2, runs the compiled
//! binary against it and inspects the JSON document it writes.

use git2::{Repository, Signature, Time};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_repoviz"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_TOKEN")
        .output()
        .expect("Failed to execute repoviz binary")
}

fn commit_files(repo: &Repository, dir: &Path, files: &[(&str, &str)], message: &str, seconds: i64) {
    for (path, content) in files {
        std::fs::write(dir.join(path), content).expect("write file");
    }
    let sig = Signature::new("Test User", "test@example.com", &Time::new(seconds, 0))
        .expect("signature");
    let mut index = repo.index().expect("index");
    for (path, _) in files {
        index.add_path(Path::new(path)).expect("stage file");
    }
    index.write().expect("write index");
    let tree = repo
        .find_tree(index.write_tree().expect("write tree"))
        .expect("find tree");
    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().expect("head commit")],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .expect("commit");
}

/// `a.py` and `b.py` in the first commit, `c.py` in the second; `a.py`
/// imports `b` absolutely and `c.py` relatively.
fn two_commit_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let repo = Repository::init(dir.path()).expect("init repo");
    commit_files(
        &repo,
        dir.path(),
        &[("a.py", "import b\n"), ("b.py", "X = 1\n")],
        "Initial commit",
        1_700_000_000,
    );
    commit_files(
        &repo,
        dir.path(),
        &[("c.py", "from . import b\n")],
        "Add c",
        1_700_086_400,
    );
    dir
}

fn read_output(path: &Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("read output");
    serde_json::from_str(&raw).expect("output is valid JSON")
}

fn find_edge<'a>(relationships: &'a Value, source: &str, target: &str, kind: &str) -> Option<&'a Value> {
    relationships
        .as_array()
        .expect("relationships array")
        .iter()
        .find(|r| r["source"] == source && r["target"] == target && r["type"] == kind)
}

fn has_edge(relationships: &Value, source: &str, target: &str, kind: &str) -> bool {
    find_edge(relationships, source, target, kind).is_some()
}

#[test]
fn test_two_commit_repository() {
    let repo = two_commit_repo();
    let out_dir = tempfile::tempdir().expect("out dir");
    let out = out_dir.path().join("repo_data.json");

    let output = run(&[
        repo.path().to_str().expect("utf-8 path"),
        "-o",
        out.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let data = read_output(&out);
    assert_eq!(data["metadata"]["schemaVersion"], "1.0.0");
    assert_eq!(data["metadata"]["language"]["Python"], 1.0);

    let ids: Vec<&str> = data["files"]
        .as_array()
        .expect("files array")
        .iter()
        .filter_map(|f| f["id"].as_str())
        .collect();
    assert!(ids.contains(&"a.py") && ids.contains(&"b.py") && ids.contains(&"c.py"));

    let relationships = &data["relationships"];
    let a_to_b = find_edge(relationships, "a.py", "b.py", "import").expect("a.py -> b.py");
    assert!(a_to_b["strength"].as_f64().expect("import strength") >= 1.0);
    assert!(has_edge(relationships, "c.py", "b.py", "import"));
    for rel in relationships.as_array().expect("relationships array") {
        assert!(ids.contains(&rel["source"].as_str().expect("source")));
        assert!(ids.contains(&rel["target"].as_str().expect("target")));
    }

    let history = &data["history"];
    assert_eq!(history["commits"].as_array().expect("commits").len(), 2);
    let points = history["timelinePoints"].as_array().expect("timeline points");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["state"]["commitIndex"], 0);
    assert_eq!(points[1]["state"]["commitIndex"], 1);

    let first = &points[0]["snapshot"];
    let snapshot_ids: Vec<&str> = first["files"]
        .as_array()
        .expect("snapshot files")
        .iter()
        .filter_map(|f| f["id"].as_str())
        .collect();
    assert_eq!(snapshot_ids, vec!["a.py", "b.py"]);
    assert!(has_edge(&first["relationships"], "a.py", "b.py", "import"));
    for rel in first["relationships"].as_array().expect("snapshot relationships") {
        assert_ne!(rel["source"], "c.py");
        assert_ne!(rel["target"], "c.py");
    }

    let b = data["files"]
        .as_array()
        .expect("files array")
        .iter()
        .find(|f| f["id"] == "b.py")
        .expect("b.py node");
    assert_eq!(b["metrics"]["commitCount"], 1);
}

#[test]
fn test_no_history_flag() {
    let repo = two_commit_repo();
    let out_dir = tempfile::tempdir().expect("out dir");
    let out = out_dir.path().join("data.json");

    let output = run(&[
        repo.path().to_str().expect("utf-8 path"),
        "--output",
        out.to_str().expect("utf-8 path"),
        "--no-history",
    ]);
    assert!(output.status.success());

    let data = read_output(&out);
    assert!(data["history"].is_null());
    assert!(has_edge(&data["relationships"], "a.py", "b.py", "import"));
}

#[test]
fn test_missing_path_fails() {
    let out_dir = tempfile::tempdir().expect("out dir");
    let missing = out_dir.path().join("does-not-exist");
    let out = out_dir.path().join("data.json");

    let output = run(&[
        missing.to_str().expect("utf-8 path"),
        "-o",
        out.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_non_repository_fails() {
    let plain = tempfile::tempdir().expect("plain dir");
    std::fs::write(plain.path().join("a.py"), "x = 1\n").expect("write file");
    let out_dir = tempfile::tempdir().expect("out dir");
    let out = out_dir.path().join("data.json");

    let output = run(&[
        plain.path().to_str().expect("utf-8 path"),
        "-o",
        out.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_missing_output_directory_fails() {
    let repo = two_commit_repo();
    let out_dir = tempfile::tempdir().expect("out dir");
    let out = out_dir.path().join("missing").join("data.json");

    let output = run(&[
        repo.path().to_str().expect("utf-8 path"),
        "-o",
        out.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(1));
}
