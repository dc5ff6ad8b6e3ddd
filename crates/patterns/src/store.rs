use crate::similarity::jaccard;
use crate::types::{TaskType, WorkflowPattern};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-memory workflow pattern store, keyed by pattern id.
#[derive(Debug, Default)]
pub struct PatternStore {
    patterns: HashMap<String, WorkflowPattern>,
}

/// Aggregate pattern statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub pattern_count: usize,
    pub total_usage: u64,
    pub avg_success_rate: f64,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: WorkflowPattern) {
        self.patterns.insert(pattern.id.clone(), pattern);
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowPattern> {
        self.patterns.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut WorkflowPattern> {
        self.patterns.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkflowPattern> {
        self.patterns.values()
    }

    /// Patterns eligible for a task type. Unknown matches everything.
    pub fn candidates(&self, task_type: TaskType) -> impl Iterator<Item = &WorkflowPattern> {
        self.patterns
            .values()
            .filter(move |p| task_type == TaskType::Unknown || p.task_type == task_type)
    }

    /// Id of the most similar same-type pattern above `threshold`, if any.
    pub fn best_match(
        &self,
        task_type: TaskType,
        sequence: &[String],
        threshold: f64,
    ) -> Option<String> {
        self.patterns
            .values()
            .filter(|p| p.task_type == task_type)
            .map(|p| (jaccard(sequence, &p.sequence), p))
            .filter(|(sim, _)| *sim > threshold)
            .max_by(|(a, pa), (b, pb)| {
                a.partial_cmp(b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| pb.id.cmp(&pa.id))
            })
            .map(|(_, p)| p.id.clone())
    }

    pub fn stats(&self) -> PatternStats {
        let pattern_count = self.patterns.len();
        let total_usage = self.patterns.values().map(|p| p.usage_count).sum();
        let avg_success_rate = if pattern_count == 0 {
            0.0
        } else {
            self.patterns.values().map(|p| p.success_rate).sum::<f64>() / pattern_count as f64
        };
        PatternStats {
            pattern_count,
            total_usage,
            avg_success_rate,
        }
    }

    /// All patterns sorted by id, for deterministic snapshots.
    pub fn to_sorted_vec(&self) -> Vec<WorkflowPattern> {
        let mut all: Vec<_> = self.patterns.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn from_patterns(patterns: Vec<WorkflowPattern>) -> Self {
        let mut store = Self::new();
        for p in patterns {
            store.insert(p);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn pattern(id: &str, task_type: TaskType, sequence: &[&str]) -> WorkflowPattern {
        WorkflowPattern {
            id: id.to_string(),
            task_type,
            sequence: sequence.iter().map(|s| s.to_string()).collect(),
            success_rate: 0.5,
            avg_time_secs: 600.0,
            violation_rate: 0.0,
            usage_count: 1,
            last_used_ms: 0,
            suggestion_effectiveness: None,
            suggestion_count: 0,
            suggestion_accepted: 0,
        }
    }

    #[test]
    fn candidates_filter_by_task_type() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::BugFix, &["a"]));
        store.insert(pattern("p2", TaskType::Feature, &["b"]));

        assert_eq!(store.candidates(TaskType::BugFix).count(), 1);
        assert_eq!(store.candidates(TaskType::Unknown).count(), 2);
    }

    #[test]
    fn best_match_requires_threshold() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Feature, &["a", "b", "c", "d"]));

        let sequence = vec!["a".to_string()];
        // similarity 1/4 = 0.25 <= 0.3
        assert_eq!(store.best_match(TaskType::Feature, &sequence, 0.3), None);

        let closer = vec!["a".to_string(), "b".to_string()];
        // similarity 2/4 = 0.5 > 0.3
        assert_eq!(
            store.best_match(TaskType::Feature, &closer, 0.3),
            Some("p1".to_string())
        );
    }

    #[test]
    fn best_match_ignores_other_task_types() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Docs, &["a", "b"]));
        let sequence = vec!["a".to_string(), "b".to_string()];
        assert_eq!(store.best_match(TaskType::Feature, &sequence, 0.3), None);
    }

    #[test]
    fn sorted_snapshot_round_trip() {
        let mut store = PatternStore::new();
        store.insert(pattern("p2", TaskType::Feature, &["b"]));
        store.insert(pattern("p1", TaskType::BugFix, &["a"]));

        let sorted = store.to_sorted_vec();
        assert_eq!(sorted[0].id, "p1");
        assert_eq!(sorted[1].id, "p2");

        let restored = PatternStore::from_patterns(sorted);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn stats_aggregate_usage_and_success() {
        let mut store = PatternStore::new();
        let mut a = pattern("p1", TaskType::Feature, &["a"]);
        a.success_rate = 1.0;
        a.usage_count = 3;
        let mut b = pattern("p2", TaskType::Feature, &["b"]);
        b.success_rate = 0.0;
        b.usage_count = 1;
        store.insert(a);
        store.insert(b);

        let stats = store.stats();
        assert_eq!(stats.pattern_count, 2);
        assert_eq!(stats.total_usage, 4);
        assert!((stats.avg_success_rate - 0.5).abs() < 1e-9);
    }
}
