use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A tracked file with its derived signals.
///
/// Nodes are always replaced whole on rebuild or incremental update; no code
/// path mutates a subset of signal fields in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Project-relative path (unique key)
    pub path: String,

    /// Shannon entropy of file content in bits/char (>= 0)
    pub entropy: f64,

    /// Recency signal in [0,1], exponential decay over age
    pub activation_level: f64,

    /// Externally supplied change frequency in [0,1]
    pub change_frequency: f64,

    /// Last modification time (unix ms)
    pub last_modified_ms: u64,

    /// Static import-like reference count
    pub import_count: usize,

    /// Static export-like reference count
    pub export_count: usize,

    /// Externally supplied distance-to-goal in [0,1]
    pub goal_distance: f64,

    /// Derived importance in [0,1], written by the priority scorer
    pub priority_score: f64,
}

impl FileNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entropy: 0.0,
            activation_level: 0.0,
            change_frequency: 0.0,
            last_modified_ms: 0,
            import_count: 0,
            export_count: 0,
            goal_distance: 0.0,
            priority_score: 0.0,
        }
    }
}

/// Decomposed edge-weight signals, kept for explainability.
///
/// Only `import_strength` is populated by the built-in discovery passes; the
/// other slots default to 0 until a [`crate::SignalProvider`] fills them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSignals {
    pub import_strength: f64,
    pub co_change_rate: f64,
    pub mutual_information: f64,
    pub semantic_similarity: f64,
}

/// A directed, weighted reference between two files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Weight in [0.1, 1.0] once clamped by learning
    pub weight: f64,

    #[serde(flatten)]
    pub signals: EdgeSignals,
}

/// Aggregate graph statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_edge_weight: f64,
}

/// Weighted dependency graph over a project's files.
///
/// Backed by a stable directed graph so incremental node removal never
/// invalidates the indices held in `path_index`. Incoming-edge adjacency is
/// native to the backing store, which gives backward propagation a genuine
/// importer lookup instead of a full edge scan.
pub struct DependencyGraph {
    graph: StableDiGraph<FileNode, DependencyEdge>,
    path_index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
            path_index: HashMap::new(),
        }
    }

    /// Insert a node, replacing any existing node with the same path whole.
    pub fn insert_node(&mut self, node: FileNode) {
        match self.path_index.get(&node.path) {
            Some(&idx) => {
                if let Some(slot) = self.graph.node_weight_mut(idx) {
                    *slot = node;
                }
            }
            None => {
                let path = node.path.clone();
                let idx = self.graph.add_node(node);
                self.path_index.insert(path, idx);
            }
        }
    }

    /// Remove a node and all edges touching it.
    pub fn remove_node(&mut self, path: &str) -> bool {
        match self.path_index.remove(path) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    /// Add an edge if no (from, to) edge exists yet.
    ///
    /// Returns false when either endpoint is unknown or the pair is already
    /// connected; at most one edge per (from, to) per build pass.
    pub fn add_edge(&mut self, from: &str, to: &str, edge: DependencyEdge) -> bool {
        let (Some(&a), Some(&b)) = (self.path_index.get(from), self.path_index.get(to)) else {
            return false;
        };
        if self.graph.find_edge(a, b).is_some() {
            return false;
        }
        self.graph.add_edge(a, b, edge);
        true
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.path_index.get(from), self.path_index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Drop every outgoing edge of `path` (used before re-discovery).
    pub fn clear_outgoing(&mut self, path: &str) {
        let Some(&idx) = self.path_index.get(path) else {
            return;
        };
        let edge_ids: Vec<_> = self.graph.edges(idx).map(|e| e.id()).collect();
        for id in edge_ids {
            self.graph.remove_edge(id);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.path_index.contains_key(path)
    }

    pub fn node(&self, path: &str) -> Option<&FileNode> {
        self.path_index
            .get(path)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn node_mut(&mut self, path: &str) -> Option<&mut FileNode> {
        let idx = *self.path_index.get(path)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.graph.node_weights()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut FileNode> {
        self.graph.node_weights_mut()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.path_index.keys().map(String::as_str)
    }

    /// Iterate all edges as (from, to, edge).
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &DependencyEdge)> {
        self.graph.edge_references().filter_map(move |e| {
            let from = self.graph.node_weight(e.source())?;
            let to = self.graph.node_weight(e.target())?;
            Some((from.path.as_str(), to.path.as_str(), e.weight()))
        })
    }

    /// Outgoing references of `path` as (target, edge).
    pub fn outgoing(&self, path: &str) -> Vec<(String, DependencyEdge)> {
        let Some(&idx) = self.path_index.get(path) else {
            return Vec::new();
        };
        self.graph
            .edges(idx)
            .filter_map(|e| {
                let target = self.graph.node_weight(e.target())?;
                Some((target.path.clone(), *e.weight()))
            })
            .collect()
    }

    /// Files that reference `path` (reverse-edge lookup).
    pub fn importers(&self, path: &str) -> Vec<String> {
        let Some(&idx) = self.path_index.get(path) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|e| {
                let source = self.graph.node_weight(e.source())?;
                Some(source.path.clone())
            })
            .collect()
    }

    pub fn out_degree(&self, path: &str) -> usize {
        self.path_index
            .get(path)
            .map(|&idx| self.graph.edges(idx).count())
            .unwrap_or(0)
    }

    /// Apply `f` to every outgoing edge weight of `path`.
    ///
    /// Returns (sum of absolute weight changes, updated edge count).
    pub fn update_outgoing_weights(
        &mut self,
        path: &str,
        mut f: impl FnMut(f64) -> f64,
    ) -> (f64, usize) {
        let Some(&idx) = self.path_index.get(path) else {
            return (0.0, 0);
        };
        let edge_ids: Vec<_> = self.graph.edges(idx).map(|e| e.id()).collect();
        let mut total_change = 0.0;
        let mut updated = 0;
        for id in edge_ids {
            if let Some(edge) = self.graph.edge_weight_mut(id) {
                let old = edge.weight;
                edge.weight = f(old);
                total_change += (edge.weight - old).abs();
                updated += 1;
            }
        }
        (total_change, updated)
    }

    /// Sum of outgoing edge weights of `path`.
    pub fn edge_weight_sum(&self, path: &str) -> f64 {
        let Some(&idx) = self.path_index.get(path) else {
            return 0.0;
        };
        self.graph.edges(idx).map(|e| e.weight().weight).sum()
    }

    /// First path components of all known nodes, for loose-mention discovery.
    pub fn top_level_dirs(&self) -> BTreeSet<String> {
        self.path_index
            .keys()
            .filter_map(|p| p.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn stats(&self) -> GraphStats {
        let edge_count = self.graph.edge_count();
        let weight_sum: f64 = self
            .graph
            .edge_references()
            .map(|e| e.weight().weight)
            .sum();
        GraphStats {
            node_count: self.graph.node_count(),
            edge_count,
            avg_edge_weight: if edge_count == 0 {
                0.0
            } else {
                weight_sum / edge_count as f64
            },
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
