use crate::config::EngineConfig;
use crate::error::Result;
use crate::providers::{FileProvider, GoalDistanceProvider, VcsAdapter};
use impact_graph::{
    unix_now_ms, DependencyGraph, GraphBuilder, GraphStats, PriorityScorer, ScannedFile,
};
use impact_patterns::{
    Classification, CompletedTask, OptimizationSuggestion, PatternLearner, PatternStats,
    PatternStore, TaskClassifier, TaskState, WorkflowOptimizer,
};
use impact_propagation::{
    BackwardPropagation, FailureSignal, ForwardPropagation, LearningState, PropagationResult,
};
use impact_store::{
    append_learning_entry, load_graph_snapshot, load_pattern_snapshot, save_graph_snapshot,
    save_pattern_snapshot, GraphSnapshot, PatternSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Read-only view of the online learner's bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub feedback_count: u32,
    pub epoch: u64,
    pub learning_rate: f64,
    pub last_convergence: f64,
}

/// The advisory impact engine.
///
/// Holds the shared graph and pattern store and exposes the collaborator
/// interface: build/update, forward/backward propagation, optimization, and
/// learning. Reads run concurrently; mutation and snapshot saves are
/// serialized through a single writer lock (last write wins on disk).
pub struct ImpactEngine {
    config: EngineConfig,
    files: Arc<dyn FileProvider>,
    goal: Arc<dyn GoalDistanceProvider>,
    vcs: Option<Arc<dyn VcsAdapter>>,

    builder: GraphBuilder,
    forward: ForwardPropagation,
    backward: BackwardPropagation,
    optimizer: WorkflowOptimizer,
    learner: PatternLearner,
    classifier: TaskClassifier,

    graph: RwLock<DependencyGraph>,
    patterns: RwLock<PatternStore>,
    learning: Mutex<LearningState>,
    writer: Mutex<()>,
}

impl ImpactEngine {
    pub fn new(
        config: EngineConfig,
        files: Arc<dyn FileProvider>,
        goal: Arc<dyn GoalDistanceProvider>,
    ) -> Self {
        let forward = ForwardPropagation::with_max_depth(config.max_depth);
        let backward = BackwardPropagation::new()
            .with_max_depth(config.max_depth)
            .with_learning_rate(config.learning_rate);
        Self {
            config,
            files,
            goal,
            vcs: None,
            builder: GraphBuilder::new(),
            forward,
            backward,
            optimizer: WorkflowOptimizer::new(),
            learner: PatternLearner::new(),
            classifier: TaskClassifier::new(),
            graph: RwLock::new(DependencyGraph::new()),
            patterns: RwLock::new(PatternStore::new()),
            learning: Mutex::new(LearningState::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn VcsAdapter>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Full rebuild: scan every tracked file, derive signals and edges,
    /// score priorities. Externally assigned change frequencies survive.
    pub async fn build_graph(&self) -> Result<GraphStats> {
        let _writer = self.writer.lock().await;

        let listed = self.files.list_files().await?;
        let mut scanned = Vec::with_capacity(listed.len());
        for path in listed {
            scanned.push(self.scan_one(path).await);
        }

        let mut built = self.builder.build(&scanned);

        {
            let previous = self.graph.read().await;
            for node in built.nodes_mut() {
                if let Some(old) = previous.node(&node.path) {
                    node.change_frequency = old.change_frequency;
                }
            }
        }

        let goal = Arc::clone(&self.goal);
        PriorityScorer::apply(&mut built, |path| goal.distance(path));

        let stats = built.stats();
        *self.graph.write().await = built;
        Ok(stats)
    }

    /// Incremental update for a known set of changed paths. Deleted files
    /// drop out of the graph; everything else is replaced whole.
    pub async fn update_graph(&self, changed: &[String]) -> Result<GraphStats> {
        let _writer = self.writer.lock().await;

        let mut updates = Vec::with_capacity(changed.len());
        for path in changed {
            match self.files.read_file(path).await {
                Ok(Some(content)) => updates.push(Some(ScannedFile {
                    path: path.clone(),
                    content: Some(content.content),
                    modified_ms: content.modified_ms,
                })),
                Ok(None) => updates.push(None),
                Err(e) => {
                    log::warn!("Failed to read {path}: {e}");
                    updates.push(Some(ScannedFile {
                        path: path.clone(),
                        content: None,
                        modified_ms: 0,
                    }));
                }
            }
        }

        let mut graph = self.graph.write().await;
        for (path, update) in changed.iter().zip(updates) {
            match update {
                Some(file) => self.builder.update_file(&mut graph, &file),
                None => {
                    graph.remove_node(path);
                }
            }
        }

        let goal = Arc::clone(&self.goal);
        PriorityScorer::apply(&mut graph, |path| goal.distance(path));
        Ok(graph.stats())
    }

    /// Predict the blast radius of changing `file`.
    pub async fn propagate_forward(&self, file: &str) -> PropagationResult {
        let graph = self.graph.read().await;
        self.forward.propagate(&graph, file)
    }

    /// Attribute a failure backward through the graph and learn from it.
    /// Closing an epoch appends to the persisted learning history.
    pub async fn propagate_backward(&self, failure: &FailureSignal) -> Result<()> {
        let _writer = self.writer.lock().await;

        let summary = {
            let mut graph = self.graph.write().await;
            let mut learning = self.learning.lock().await;
            self.backward.propagate(&mut graph, failure, &mut learning)
        };

        if let Some(summary) = summary {
            log::info!(
                "Learning epoch {} closed (convergence {:.1})",
                summary.epoch,
                summary.convergence_score
            );
            if let Err(e) =
                append_learning_entry(&self.config.snapshot_dir, summary, unix_now_ms()).await
            {
                log::warn!("Failed to append learning history: {e}");
            }
        }
        Ok(())
    }

    /// Recommend a file-change workflow for the task at hand.
    pub async fn optimize(&self, task: &TaskState) -> OptimizationSuggestion {
        let graph = self.graph.read().await;

        let activations: HashMap<String, f64> = match &task.current_file {
            Some(file) => self.forward.propagate(&graph, file).activations,
            None => HashMap::new(),
        };

        let mut patterns = self.patterns.write().await;
        self.optimizer
            .optimize(&mut patterns, &graph, &activations, task, unix_now_ms())
    }

    /// Report how a previous suggestion went.
    pub async fn record_suggestion_outcome(
        &self,
        pattern_ids: &[String],
        accepted: bool,
        successful: bool,
    ) {
        let mut patterns = self.patterns.write().await;
        self.optimizer
            .record_outcome(&mut patterns, pattern_ids, accepted, successful);
    }

    /// Learn workflow patterns from recent version-control history and
    /// refresh per-file change frequencies from the same commits.
    pub async fn learn_from_history(&self, limit: usize) -> Result<usize> {
        let Some(vcs) = &self.vcs else {
            log::debug!("No VCS adapter registered; skipping history learning");
            return Ok(0);
        };

        let limit = if limit == 0 {
            self.config.history_limit
        } else {
            limit
        };
        let commits = vcs.recent_commits(limit).await?;
        let now_ms = unix_now_ms();

        let learned = {
            let mut patterns = self.patterns.write().await;
            self.learner
                .learn_from_history(&mut patterns, &self.classifier, &commits, limit, now_ms)
        };

        if !commits.is_empty() {
            let total = commits.len() as f64;
            let mut touches: HashMap<&str, usize> = HashMap::new();
            for commit in &commits {
                for file in &commit.changed_files {
                    *touches.entry(file.as_str()).or_insert(0) += 1;
                }
            }

            let mut graph = self.graph.write().await;
            for (path, count) in touches {
                if let Some(node) = graph.node_mut(path) {
                    node.change_frequency = (count as f64 / total).clamp(0.0, 1.0);
                }
            }
        }

        Ok(learned)
    }

    /// Fold completed-task telemetry into the pattern store.
    pub async fn learn_from_telemetry(&self, tasks: &[CompletedTask]) -> usize {
        let mut patterns = self.patterns.write().await;
        self.learner.learn_from_telemetry(
            &mut patterns,
            tasks,
            self.config.telemetry_limit,
            unix_now_ms(),
        )
    }

    /// Classify a task description plus its touched files.
    pub fn classify(&self, text: &str, files: &[String]) -> Classification {
        self.classifier.classify(text, files)
    }

    pub async fn graph_stats(&self) -> GraphStats {
        self.graph.read().await.stats()
    }

    pub async fn pattern_stats(&self) -> PatternStats {
        self.patterns.read().await.stats()
    }

    pub async fn learning_stats(&self) -> LearningStats {
        let learning = self.learning.lock().await;
        LearningStats {
            feedback_count: learning.feedback_count(),
            epoch: learning.epoch(),
            learning_rate: self.backward.learning_rate(),
            last_convergence: learning.last_convergence(),
        }
    }

    /// Persist the graph and pattern snapshots.
    pub async fn save(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let now_ms = unix_now_ms();

        let graph_snapshot = {
            let graph = self.graph.read().await;
            GraphSnapshot::capture(&graph, now_ms)
        };
        save_graph_snapshot(&self.config.snapshot_dir, &graph_snapshot).await?;

        let pattern_snapshot = {
            let patterns = self.patterns.read().await;
            PatternSnapshot::capture(&patterns, now_ms)
        };
        save_pattern_snapshot(&self.config.snapshot_dir, &pattern_snapshot).await?;
        Ok(())
    }

    /// Restore state from snapshots. Missing or corrupt documents leave the
    /// corresponding store empty. Returns whether a graph was restored.
    pub async fn load(&self) -> Result<bool> {
        let _writer = self.writer.lock().await;

        let restored_graph = match load_graph_snapshot(&self.config.snapshot_dir).await {
            Some(snapshot) => {
                *self.graph.write().await = snapshot.restore();
                true
            }
            None => false,
        };

        if let Some(snapshot) = load_pattern_snapshot(&self.config.snapshot_dir).await {
            *self.patterns.write().await = snapshot.restore();
        }

        Ok(restored_graph)
    }

    async fn scan_one(&self, path: String) -> ScannedFile {
        match self.files.read_file(&path).await {
            Ok(Some(content)) => ScannedFile {
                path,
                content: Some(content.content),
                modified_ms: content.modified_ms,
            },
            Ok(None) => ScannedFile {
                path,
                content: None,
                modified_ms: 0,
            },
            Err(e) => {
                log::warn!("Failed to read {path}: {e}");
                ScannedFile {
                    path,
                    content: None,
                    modified_ms: 0,
                }
            }
        }
    }
}
