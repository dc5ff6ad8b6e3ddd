use impact_graph::{unix_now_ms, DependencyGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::forward::DEFAULT_MAX_DEPTH;

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const MIN_LEARNING_RATE: f64 = 0.001;
pub const MAX_LEARNING_RATE: f64 = 0.1;

/// Edge weights never leave this band, no matter how much blame accumulates.
pub const WEIGHT_FLOOR: f64 = 0.1;
pub const WEIGHT_CEIL: f64 = 1.0;

/// Each hop away from the failing file inherits half the blame.
const BLAME_DECAY: f64 = 0.5;

const FEEDBACKS_PER_EPOCH: u32 = 10;
const CONVERGENCE_WINDOW: usize = 5;

/// A failure observed at one file.
#[derive(Debug, Clone)]
pub struct FailureSignal {
    pub file: String,
    pub violations: u32,
    pub compile_errors: u32,
}

/// Epoch bookkeeping for the online weight learner.
#[derive(Debug, Clone, Default)]
pub struct LearningState {
    feedback_count: u32,
    epoch: u64,
    epoch_weight_change: f64,
    epoch_update_count: u64,
    recent_avg_changes: VecDeque<f64>,
    last_convergence: f64,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feedback_count(&self) -> u32 {
        self.feedback_count
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn last_convergence(&self) -> f64 {
        self.last_convergence
    }

    /// Record one feedback; closes the epoch every tenth call.
    fn record_feedback(&mut self, weight_change: f64, updates: usize) -> Option<EpochSummary> {
        self.epoch_weight_change += weight_change;
        self.epoch_update_count += updates as u64;
        self.feedback_count += 1;

        if self.feedback_count < FEEDBACKS_PER_EPOCH {
            return None;
        }

        let feedback_count = self.feedback_count;
        let avg_weight_change = if self.epoch_update_count == 0 {
            0.0
        } else {
            self.epoch_weight_change / self.epoch_update_count as f64
        };

        self.recent_avg_changes.push_back(avg_weight_change);
        while self.recent_avg_changes.len() > CONVERGENCE_WINDOW {
            self.recent_avg_changes.pop_front();
        }
        let convergence_score = (100.0 - variance(&self.recent_avg_changes) * 1000.0).max(0.0);

        self.epoch += 1;
        self.feedback_count = 0;
        self.epoch_weight_change = 0.0;
        self.epoch_update_count = 0;
        self.last_convergence = convergence_score;

        Some(EpochSummary {
            timestamp: unix_now_ms(),
            epoch: self.epoch,
            feedback_count,
            avg_weight_change,
            convergence_score,
        })
    }
}

/// One closed learning epoch, appended to the persisted learning history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSummary {
    pub timestamp: u64,
    pub epoch: u64,
    pub feedback_count: u32,
    pub avg_weight_change: f64,
    pub convergence_score: f64,
}

/// Blame attribution and online edge-weight learning.
pub struct BackwardPropagation {
    max_depth: usize,
    learning_rate: f64,
}

impl BackwardPropagation {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate.clamp(MIN_LEARNING_RATE, MAX_LEARNING_RATE);
        self
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Failure severity in [0,1]. Compile errors weigh more than rule
    /// violations.
    pub fn severity(violations: u32, compile_errors: u32) -> f64 {
        ((0.3 * violations as f64 + 0.7 * compile_errors as f64) / 10.0).clamp(0.0, 1.0)
    }

    /// Attribute blame for a failure and decay the blamed files' outgoing
    /// edge weights. Returns the epoch summary when this feedback closed one.
    pub fn propagate(
        &self,
        graph: &mut DependencyGraph,
        failure: &FailureSignal,
        state: &mut LearningState,
    ) -> Option<EpochSummary> {
        let severity = Self::severity(failure.violations, failure.compile_errors);
        let blame = self.attribute_blame(graph, &failure.file, severity);

        let mut total_change = 0.0;
        let mut updates = 0;
        for (path, blame_value) in &blame {
            let delta = self.learning_rate * blame_value * severity;
            let (change, count) = graph
                .update_outgoing_weights(path, |w| (w - delta).clamp(WEIGHT_FLOOR, WEIGHT_CEIL));
            total_change += change;
            updates += count;
        }

        log::debug!(
            "Backward propagation from {}: severity {:.2}, {} blamed files, {} edges updated",
            failure.file,
            severity,
            blame.len(),
            updates
        );

        state.record_feedback(total_change, updates)
    }

    /// BFS over reverse edges: who references the failing file, directly or
    /// transitively. Hop 0 carries the full severity; every further hop
    /// halves it. The maximum blame per node across paths wins.
    fn attribute_blame(
        &self,
        graph: &DependencyGraph,
        file: &str,
        severity: f64,
    ) -> HashMap<String, f64> {
        let mut blame: HashMap<String, f64> = HashMap::new();
        if !graph.contains(file) {
            log::debug!("Failure file {file} is not a tracked node");
            return blame;
        }

        blame.insert(file.to_string(), severity);
        let mut expanded: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, f64, usize)> = VecDeque::new();
        queue.push_back((file.to_string(), severity, 0));

        while let Some((node, node_blame, depth)) = queue.pop_front() {
            if depth >= self.max_depth || !expanded.insert(node.clone()) {
                continue;
            }
            let inherited = node_blame * BLAME_DECAY;
            for importer in graph.importers(&node) {
                let current = blame.get(&importer).copied().unwrap_or(0.0);
                if inherited > current {
                    blame.insert(importer.clone(), inherited);
                    queue.push_back((importer, inherited, depth + 1));
                }
            }
        }

        blame
    }
}

impl Default for BackwardPropagation {
    fn default() -> Self {
        Self::new()
    }
}

fn variance(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
