//! # Impact Store
//!
//! Persisted snapshots for the impact engine: the graph, the workflow
//! pattern store, and the capped learning history. One logical JSON document
//! each, written atomically (serialize → `*.tmp` → rename) and read with
//! fallback to defaults; a missing or corrupt snapshot is never fatal.

mod error;
mod paths;
mod snapshot;

pub use error::{Result, StoreError};
pub use paths::{
    graph_snapshot_path, impact_dir_for_project_root, learning_history_path,
    pattern_snapshot_path, IMPACT_DIR_NAME,
};
pub use snapshot::{
    append_learning_entry, load_graph_snapshot, load_learning_history, load_pattern_snapshot,
    save_graph_snapshot, save_pattern_snapshot, EdgeRecord, GraphSnapshot, LearningHistory,
    NodeRecord, PatternSnapshot, MAX_LEARNING_HISTORY, SNAPSHOT_SCHEMA_VERSION,
};
