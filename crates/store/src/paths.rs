use std::path::{Path, PathBuf};

/// Project-scoped state directory.
pub const IMPACT_DIR_NAME: &str = ".impact";

const GRAPH_SNAPSHOT_FILE: &str = "graph.json";
const PATTERN_SNAPSHOT_FILE: &str = "patterns.json";
const LEARNING_HISTORY_FILE: &str = "learning.json";

#[must_use]
pub fn impact_dir_for_project_root(root: &Path) -> PathBuf {
    root.join(IMPACT_DIR_NAME)
}

#[must_use]
pub fn graph_snapshot_path(dir: &Path) -> PathBuf {
    dir.join(GRAPH_SNAPSHOT_FILE)
}

#[must_use]
pub fn pattern_snapshot_path(dir: &Path) -> PathBuf {
    dir.join(PATTERN_SNAPSHOT_FILE)
}

#[must_use]
pub fn learning_history_path(dir: &Path) -> PathBuf {
    dir.join(LEARNING_HISTORY_FILE)
}
