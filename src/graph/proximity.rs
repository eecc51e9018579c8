//! Filesystem proximity edges
//!
//! Files sharing a directory are fully related (1.0). Files in different
//! directories are related with strength `1/(d+1)` when the directories are
//! at most two steps apart in the tree, where `d` counts the steps from each
//! directory up to their common ancestor.

use crate::graph::builder::PendingEdge;
use crate::models::{parent_of, EdgeKind};
use std::collections::BTreeMap;

/// Directories further apart than this are unrelated
const MAX_DISTANCE: usize = 2;

/// Proximity edges between the given file ids.
pub fn proximity_edges<'a, I>(file_ids: I) -> Vec<PendingEdge>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_directory: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for id in file_ids {
        by_directory
            .entry(parent_of(id).unwrap_or(""))
            .or_default()
            .push(id);
    }

    let mut edges = Vec::new();

    for files in by_directory.values() {
        for (i, a) in files.iter().enumerate() {
            for b in &files[i + 1..] {
                edges.push(PendingEdge::new(*a, *b, EdgeKind::FilesystemProximity).with_weight(1.0));
            }
        }
    }

    let directories: Vec<(&&str, &Vec<&str>)> = by_directory.iter().collect();
    for (i, (dir_a, files_a)) in directories.iter().enumerate() {
        for (dir_b, files_b) in &directories[i + 1..] {
            let distance = directory_distance(dir_a, dir_b);
            if distance > MAX_DISTANCE {
                continue;
            }
            let weight = 1.0 / (distance as f64 + 1.0);
            for a in files_a.iter() {
                for b in files_b.iter() {
                    edges.push(
                        PendingEdge::new(*a, *b, EdgeKind::FilesystemProximity).with_weight(weight),
                    );
                }
            }
        }
    }

    edges
}

/// Steps from each directory up to their deepest common ancestor, summed.
/// The repository root is the empty string.
pub fn directory_distance(a: &str, b: &str) -> usize {
    let parts_a: Vec<&str> = a.split('/').filter(|p| !p.is_empty()).collect();
    let parts_b: Vec<&str> = b.split('/').filter(|p| !p.is_empty()).collect();
    let common = parts_a
        .iter()
        .zip(parts_b.iter())
        .take_while(|(x, y)| x == y)
        .count();
    (parts_a.len() - common) + (parts_b.len() - common)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_of(edges: &[PendingEdge], a: &str, b: &str) -> Option<f64> {
        edges
            .iter()
            .find(|e| (e.source == a && e.target == b) || (e.source == b && e.target == a))
            .and_then(|e| e.weight)
    }

    #[test]
    fn test_directory_distance() {
        assert_eq!(directory_distance("src", "src"), 0);
        assert_eq!(directory_distance("src/a", "src/b"), 2);
        assert_eq!(directory_distance("", "src"), 1);
        assert_eq!(directory_distance("src", "src/a/b"), 2);
        assert_eq!(directory_distance("src/a/b", "lib"), 4);
    }

    #[test]
    fn test_proximity_weights() {
        let files = [
            "a.py",
            "b.py",
            "src/main.py",
            "src/api/routes.py",
            "src/db/models.py",
            "tests/deep/nested/t.py",
        ];
        let edges = proximity_edges(files.iter().copied());

        assert_eq!(weight_of(&edges, "a.py", "b.py"), Some(1.0));
        assert_eq!(weight_of(&edges, "a.py", "src/main.py"), Some(0.5));
        assert_eq!(weight_of(&edges, "src/main.py", "src/api/routes.py"), Some(0.5));
        let sibling = weight_of(&edges, "src/api/routes.py", "src/db/models.py").expect("siblings");
        assert!((sibling - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(weight_of(&edges, "a.py", "src/api/routes.py").map(|w| (w * 3.0).round()), Some(1.0));
        assert_eq!(weight_of(&edges, "src/main.py", "tests/deep/nested/t.py"), None);
    }

    #[test]
    fn test_single_file_has_no_edges() {
        assert!(proximity_edges(["only.py"]).is_empty());
    }
}
