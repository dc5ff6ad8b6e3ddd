use crate::classifier::TaskClassifier;
use crate::store::PatternStore;
use crate::types::{CommitRecord, CompletedTask, TaskType, WorkflowPattern};
use sha2::{Digest, Sha256};

const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Commit-delta time estimates are clamped to a sane task duration.
const MIN_DELTA_SECS: f64 = 60.0;
const MAX_DELTA_SECS: f64 = 7_200.0;
const DEFAULT_DELTA_SECS: f64 = 600.0;

/// Telemetry durations are explicit but still bounded against clock skew.
const MIN_TASK_SECS: f64 = 1.0;
const MAX_TASK_SECS: f64 = 86_400.0;

/// Message keywords that mark a historical task as failed when no explicit
/// outcome exists.
const FAILURE_KEYWORDS: &[&str] = &["revert", "wip", "broken", "fail"];

/// Online pattern learning: running-average updates from history and
/// telemetry.
pub struct PatternLearner;

impl PatternLearner {
    pub fn new() -> Self {
        Self
    }

    /// Fold one observed task outcome into the store.
    ///
    /// Updates the most similar same-type pattern in place, or creates a new
    /// one. Returns the touched pattern id, or None for an empty sequence.
    pub fn learn_pattern(
        &self,
        store: &mut PatternStore,
        task_type: TaskType,
        sequence: &[String],
        success: bool,
        time_secs: f64,
        violations: u32,
        now_ms: u64,
    ) -> Option<String> {
        if sequence.is_empty() {
            log::debug!("Ignoring outcome with no changed files");
            return None;
        }

        let observation = if success { 1.0 } else { 0.0 };

        if let Some(id) = store.best_match(task_type, sequence, SIMILARITY_THRESHOLD) {
            let pattern = store.get_mut(&id)?;
            let n = pattern.usage_count + 1;
            pattern.success_rate = running_average(pattern.success_rate, observation, n);
            pattern.avg_time_secs = running_average(pattern.avg_time_secs, time_secs, n);
            pattern.violation_rate =
                running_average(pattern.violation_rate, violations as f64, n);
            pattern.usage_count = n;
            pattern.last_used_ms = now_ms;
            return Some(id);
        }

        let id = pattern_id(task_type, sequence, now_ms);
        store.insert(WorkflowPattern {
            id: id.clone(),
            task_type,
            sequence: sequence.to_vec(),
            success_rate: observation,
            avg_time_secs: time_secs,
            violation_rate: violations as f64,
            usage_count: 1,
            last_used_ms: now_ms,
            suggestion_effectiveness: None,
            suggestion_count: 0,
            suggestion_accepted: 0,
        });
        Some(id)
    }

    /// Learn from version-control history, newest commit first.
    ///
    /// The inter-commit delta stands in for task duration; the message
    /// stands in for the outcome.
    pub fn learn_from_history(
        &self,
        store: &mut PatternStore,
        classifier: &TaskClassifier,
        commits: &[CommitRecord],
        limit: usize,
        now_ms: u64,
    ) -> usize {
        let mut learned = 0;
        for (i, commit) in commits.iter().take(limit).enumerate() {
            let classification = classifier.classify(&commit.message, &commit.changed_files);
            let success = !message_marks_failure(&commit.message);
            let time_secs = commits
                .get(i + 1)
                .map(|older| {
                    let delta = commit.timestamp_ms.saturating_sub(older.timestamp_ms) as f64
                        / 1_000.0;
                    delta.clamp(MIN_DELTA_SECS, MAX_DELTA_SECS)
                })
                .unwrap_or(DEFAULT_DELTA_SECS);

            if self
                .learn_pattern(
                    store,
                    classification.task_type,
                    &commit.changed_files,
                    success,
                    time_secs,
                    0,
                    now_ms,
                )
                .is_some()
            {
                learned += 1;
            }
        }
        log::info!("Learned {learned} patterns from {limit} commit(s)");
        learned
    }

    /// Learn from completed-task telemetry, which carries explicit outcomes
    /// and durations.
    pub fn learn_from_telemetry(
        &self,
        store: &mut PatternStore,
        tasks: &[CompletedTask],
        limit: usize,
        now_ms: u64,
    ) -> usize {
        let mut learned = 0;
        for task in tasks.iter().take(limit) {
            let duration_secs = (task.end_ms.saturating_sub(task.start_ms) as f64 / 1_000.0)
                .clamp(MIN_TASK_SECS, MAX_TASK_SECS);
            if self
                .learn_pattern(
                    store,
                    task.task_type,
                    &task.changed_files,
                    task.success,
                    duration_secs,
                    task.violations,
                    now_ms,
                )
                .is_some()
            {
                learned += 1;
            }
        }
        learned
    }
}

impl Default for PatternLearner {
    fn default() -> Self {
        Self::new()
    }
}

fn running_average(current: f64, observation: f64, n: u64) -> f64 {
    (current * (n - 1) as f64 + observation) / n as f64
}

fn message_marks_failure(message: &str) -> bool {
    let lowered = message.to_lowercase();
    FAILURE_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn pattern_id(task_type: TaskType, sequence: &[String], now_ms: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task_type.to_string().as_bytes());
    for file in sequence {
        hasher.update(file.as_bytes());
    }
    hasher.update(now_ms.to_be_bytes());
    let digest = hasher.finalize();
    let short: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("pat-{short}")
}
