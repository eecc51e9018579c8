//! Relationship graph
//!
//! A deduplicating, counting edge multiset over a fixed set of known node
//! ids. Every phase of the analysis feeds edges into one
//! [`RelationshipGraph`]; [`RelationshipGraph::finalize`] turns the
//! accumulated state into the output relationship list.

use crate::models::{EdgeKind, Relationship};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Canonical identity of an edge.
///
/// Symmetric kinds are keyed on the lexicographically sorted endpoint pair,
/// so `(a, b)` and `(b, a)` collapse into one edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl EdgeKey {
    pub fn new(source: &str, target: &str, kind: EdgeKind) -> Self {
        let (source, target) = if kind.is_symmetric() && target < source {
            (target, source)
        } else {
            (source, target)
        };
        Self {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        }
    }
}

/// An edge produced off the aggregating thread, applied later via
/// [`RelationshipGraph::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: Option<f64>,
}

impl PendingEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

#[derive(Debug, Clone, Default)]
struct EdgeStats {
    count: u32,
    weight: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    known: FxHashSet<String>,
    /// Keys in first-occurrence order
    order: Vec<EdgeKey>,
    edges: FxHashMap<EdgeKey, EdgeStats>,
    rejected: usize,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node(&mut self, id: impl Into<String>) {
        self.known.insert(id.into());
    }

    pub fn register_nodes<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(ids.into_iter().map(Into::into));
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Record one occurrence of an edge. Returns `false` (and records
    /// nothing) when either endpoint is unknown.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        self.record(source, target, kind, None)
    }

    /// Record one occurrence of a weighted edge. Repeated occurrences keep
    /// the largest weight.
    pub fn add_weighted_edge(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
        weight: f64,
    ) -> bool {
        self.record(source, target, kind, Some(weight))
    }

    /// Apply edges produced elsewhere, in order. Returns how many were
    /// accepted.
    pub fn merge<I>(&mut self, pending: I) -> usize
    where
        I: IntoIterator<Item = PendingEdge>,
    {
        pending
            .into_iter()
            .filter(|edge| self.record(&edge.source, &edge.target, edge.kind, edge.weight))
            .count()
    }

    fn record(&mut self, source: &str, target: &str, kind: EdgeKind, weight: Option<f64>) -> bool {
        if !self.known.contains(source) || !self.known.contains(target) {
            self.rejected += 1;
            return false;
        }

        let key = EdgeKey::new(source, target, kind);
        if !self.edges.contains_key(&key) {
            self.order.push(key.clone());
        }
        let stats = self.edges.entry(key).or_default();
        stats.count += 1;
        if let Some(w) = weight {
            stats.weight = Some(stats.weight.map_or(w, |current| current.max(w)));
        }
        true
    }

    /// Number of distinct edges
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Occurrences dropped because an endpoint was unknown
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Occurrence count of an edge, 0 if absent.
    pub fn count(&self, source: &str, target: &str, kind: EdgeKind) -> u32 {
        self.edges
            .get(&EdgeKey::new(source, target, kind))
            .map_or(0, |stats| stats.count)
    }

    /// Distinct edges per kind
    pub fn kind_counts(&self) -> BTreeMap<EdgeKind, usize> {
        let mut counts = BTreeMap::new();
        for key in &self.order {
            *counts.entry(key.kind).or_insert(0) += 1;
        }
        counts
    }

    /// One relationship per distinct edge, in first-occurrence order.
    pub fn finalize(&self) -> Vec<Relationship> {
        self.order
            .iter()
            .filter_map(|key| {
                let stats = self.edges.get(key)?;
                let strength = if key.kind.is_counted() {
                    Some(f64::from(stats.count))
                } else if key.kind.is_symmetric() {
                    stats.weight
                } else {
                    None
                };
                Some(Relationship {
                    source: key.source.clone(),
                    target: key.target.clone(),
                    kind: key.kind,
                    strength,
                    metadata: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[&str]) -> RelationshipGraph {
        let mut graph = RelationshipGraph::new();
        graph.register_nodes(ids.iter().copied());
        graph
    }

    #[test]
    fn test_repeated_imports_collapse_with_count() {
        let mut graph = graph_with(&["a.py", "b.py"]);
        for _ in 0..3 {
            assert!(graph.add_edge("a.py", "b.py", EdgeKind::Import));
        }

        let rels = graph.finalize();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].strength, Some(3.0));
        assert_eq!(graph.count("a.py", "b.py", EdgeKind::Import), 3);
    }

    #[test]
    fn test_unknown_endpoints_are_rejected() {
        let mut graph = graph_with(&["a.py"]);
        assert!(!graph.add_edge("a.py", "missing.py", EdgeKind::Import));
        assert!(!graph.add_edge("ghost.py", "a.py", EdgeKind::Import));
        assert!(graph.finalize().is_empty());
        assert_eq!(graph.rejected(), 2);
    }

    #[test]
    fn test_symmetric_edges_are_canonicalized() {
        let mut graph = graph_with(&["x/a.py", "x/b.py"]);
        graph.add_weighted_edge("x/b.py", "x/a.py", EdgeKind::FilesystemProximity, 0.5);
        graph.add_weighted_edge("x/a.py", "x/b.py", EdgeKind::FilesystemProximity, 1.0);

        let rels = graph.finalize();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source, "x/a.py");
        assert_eq!(rels[0].target, "x/b.py");
        assert_eq!(rels[0].strength, Some(1.0));
    }

    #[test]
    fn test_directed_edges_keep_direction() {
        let mut graph = graph_with(&["a.py", "b.py"]);
        graph.add_edge("a.py", "b.py", EdgeKind::Import);
        graph.add_edge("b.py", "a.py", EdgeKind::Import);
        assert_eq!(graph.finalize().len(), 2);
    }

    #[test]
    fn test_contains_has_no_strength_and_order_is_first_occurrence() {
        let mut graph = graph_with(&["src", "src/a.py", "src/b.py"]);
        graph.add_edge("src", "src/b.py", EdgeKind::Contains);
        graph.add_edge("src/a.py", "src/b.py", EdgeKind::Import);
        graph.add_edge("src", "src/a.py", EdgeKind::Contains);
        graph.add_edge("src", "src/b.py", EdgeKind::Contains);

        let rels = graph.finalize();
        let shape: Vec<(&str, &str, EdgeKind)> = rels
            .iter()
            .map(|r| (r.source.as_str(), r.target.as_str(), r.kind))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("src", "src/b.py", EdgeKind::Contains),
                ("src/a.py", "src/b.py", EdgeKind::Import),
                ("src", "src/a.py", EdgeKind::Contains),
            ]
        );
        assert!(rels[0].strength.is_none());
    }

    #[test]
    fn test_merge_applies_pending_edges() {
        let mut graph = graph_with(&["a.py", "b.py"]);
        let accepted = graph.merge(vec![
            PendingEdge::new("a.py", "b.py", EdgeKind::Import),
            PendingEdge::new("a.py", "b.py", EdgeKind::Import),
            PendingEdge::new("a.py", "nope.py", EdgeKind::Import),
            PendingEdge::new("a.py", "b.py", EdgeKind::SemanticSimilarity).with_weight(0.9),
        ]);
        assert_eq!(accepted, 3);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.kind_counts().get(&EdgeKind::Import), Some(&1));
    }
}
