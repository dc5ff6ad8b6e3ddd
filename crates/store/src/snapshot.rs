use crate::error::Result;
use crate::paths::{graph_snapshot_path, learning_history_path, pattern_snapshot_path};
use impact_graph::{DependencyEdge, DependencyGraph, EdgeSignals, FileNode, GraphStats};
use impact_patterns::{PatternStore, WorkflowPattern};
use impact_propagation::EpochSummary;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// The learning history keeps only the most recent entries.
pub const MAX_LEARNING_HISTORY: usize = 100;

/// One persisted node: the node fields plus an explicit id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    #[serde(flatten)]
    pub node: FileNode,
}

/// One persisted edge with endpoints and decomposed signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub weight: f64,
    #[serde(flatten)]
    pub signals: EdgeSignals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub schema_version: u32,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub stats: GraphStats,
    pub last_updated: u64,
}

impl GraphSnapshot {
    /// Capture the current graph. Records are sorted so identical graphs
    /// produce identical documents.
    pub fn capture(graph: &DependencyGraph, now_ms: u64) -> Self {
        let mut nodes: Vec<NodeRecord> = graph
            .nodes()
            .map(|n| NodeRecord {
                id: n.path.clone(),
                node: n.clone(),
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges: Vec<EdgeRecord> = graph
            .edges()
            .map(|(from, to, edge)| EdgeRecord {
                from: from.to_string(),
                to: to.to_string(),
                weight: edge.weight,
                signals: edge.signals,
            })
            .collect();
        edges.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));

        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            nodes,
            edges,
            stats: graph.stats(),
            last_updated: now_ms,
        }
    }

    /// Rebuild an in-memory graph from the snapshot. Edges whose endpoints
    /// went missing are dropped silently.
    pub fn restore(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for record in &self.nodes {
            graph.insert_node(record.node.clone());
        }
        for record in &self.edges {
            graph.add_edge(
                &record.from,
                &record.to,
                DependencyEdge {
                    weight: record.weight,
                    signals: record.signals,
                },
            );
        }
        graph
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSnapshot {
    pub schema_version: u32,
    pub patterns: Vec<WorkflowPattern>,
    pub last_updated: u64,
}

impl PatternSnapshot {
    pub fn capture(store: &PatternStore, now_ms: u64) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            patterns: store.to_sorted_vec(),
            last_updated: now_ms,
        }
    }

    pub fn restore(&self) -> PatternStore {
        PatternStore::from_patterns(self.patterns.clone())
    }
}

/// Append-only learning history, capped at [`MAX_LEARNING_HISTORY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningHistory {
    pub schema_version: u32,
    pub entries: Vec<EpochSummary>,
    pub last_updated: u64,
}

impl LearningHistory {
    pub fn append(&mut self, entry: EpochSummary, now_ms: u64) {
        self.entries.push(entry);
        if self.entries.len() > MAX_LEARNING_HISTORY {
            let excess = self.entries.len() - MAX_LEARNING_HISTORY;
            self.entries.drain(..excess);
        }
        self.last_updated = now_ms;
    }
}

impl Default for LearningHistory {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            entries: Vec::new(),
            last_updated: 0,
        }
    }
}

pub async fn save_graph_snapshot(dir: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    write_json_atomic(&graph_snapshot_path(dir), snapshot).await
}

pub async fn load_graph_snapshot(dir: &Path) -> Option<GraphSnapshot> {
    read_json_lenient(&graph_snapshot_path(dir)).await
}

pub async fn save_pattern_snapshot(dir: &Path, snapshot: &PatternSnapshot) -> Result<()> {
    write_json_atomic(&pattern_snapshot_path(dir), snapshot).await
}

pub async fn load_pattern_snapshot(dir: &Path) -> Option<PatternSnapshot> {
    read_json_lenient(&pattern_snapshot_path(dir)).await
}

/// Load, append, cap, and rewrite the learning history document.
pub async fn append_learning_entry(dir: &Path, entry: EpochSummary, now_ms: u64) -> Result<()> {
    let mut history = load_learning_history(dir).await;
    history.append(entry, now_ms);
    write_json_atomic(&learning_history_path(dir), &history).await
}

pub async fn load_learning_history(dir: &Path) -> LearningHistory {
    read_json_lenient(&learning_history_path(dir))
        .await
        .unwrap_or_default()
}

/// Serialize → `*.tmp` → rename, so readers never observe a torn document.
async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

/// Read a snapshot, degrading to None on absence, unreadability, or corrupt
/// content. Degraded reads are logged, never surfaced.
async fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Failed to read snapshot {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!(
                "Corrupt snapshot {}, falling back to defaults: {e}",
                path.display()
            );
            None
        }
    }
}
