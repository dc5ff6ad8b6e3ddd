use crate::similarity::{decay_factor, jaccard};
use crate::store::PatternStore;
use crate::types::{OptimizationSuggestion, RiskEntry, RiskLevel, TaskState};
use impact_graph::DependencyGraph;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Outcome prediction when no candidate pattern exists.
pub const DEFAULT_PREDICTED_SUCCESS_RATE: f64 = 0.7;
pub const DEFAULT_PREDICTED_TIME_SECS: f64 = 600.0;

const SIMILARITY_THRESHOLD: f64 = 0.3;
const MAX_CANDIDATES: usize = 5;
const PREDICTION_CANDIDATES: usize = 3;
const ACTIVATION_SUPPLEMENT: usize = 10;

/// Candidate ranking coefficients.
const W_SIMILARITY: f64 = 0.3;
const W_SUCCESS: f64 = 0.3;
const W_DECAY: f64 = 0.2;
const W_EFFECTIVENESS: f64 = 0.2;

/// Fallback while no suggestion outcome has been recorded yet.
const NEUTRAL_EFFECTIVENESS: f64 = 0.5;

/// Risk thresholds.
const RISK_ENTROPY_BITS: f64 = 5.0;
const RISK_OUT_DEGREE: usize = 10;
const STALE_ACTIVATION: f64 = 0.3;

struct RankedCandidate {
    id: String,
    rank_score: f64,
    success_rate: f64,
    avg_time_secs: f64,
    sequence: Vec<String>,
}

/// Produces an [`OptimizationSuggestion`] from stored patterns, the graph,
/// and a forward-propagation run seeded at the task's current file.
pub struct WorkflowOptimizer;

impl WorkflowOptimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn optimize(
        &self,
        store: &mut PatternStore,
        graph: &DependencyGraph,
        activations: &HashMap<String, f64>,
        task: &TaskState,
        now_ms: u64,
    ) -> OptimizationSuggestion {
        let ranked = self.rank_candidates(store, task, now_ms);
        let pattern_ids: Vec<String> = ranked.iter().map(|c| c.id.clone()).collect();

        let recommended_order = self.recommend_order(&ranked, activations, task);
        let risks = self.predict_risks(graph, &recommended_order);
        let (predicted_success_rate, predicted_time_secs) = predict_outcome(&ranked);
        let next_actions = next_actions(&ranked, &recommended_order, &risks);

        for id in &pattern_ids {
            if let Some(pattern) = store.get_mut(id) {
                pattern.suggestion_count += 1;
            }
        }

        let suggestion_id = suggestion_id(now_ms, &pattern_ids, &task.modified_files);
        log::debug!(
            "Suggestion {suggestion_id}: {} candidates, {} recommended files",
            pattern_ids.len(),
            recommended_order.len()
        );

        OptimizationSuggestion {
            suggestion_id,
            pattern_ids,
            recommended_order,
            risks,
            next_actions,
            predicted_success_rate,
            predicted_time_secs,
        }
    }

    /// Update suggestion bookkeeping once the caller knows how it went.
    ///
    /// Only accepted suggestions move the effectiveness running average;
    /// a rejected suggestion records nothing beyond the attempt already
    /// counted at optimize time.
    pub fn record_outcome(
        &self,
        store: &mut PatternStore,
        pattern_ids: &[String],
        accepted: bool,
        successful: bool,
    ) {
        for id in pattern_ids {
            let Some(pattern) = store.get_mut(id) else {
                log::warn!("Suggestion outcome for unknown pattern {id}");
                continue;
            };
            if !accepted {
                continue;
            }
            pattern.suggestion_accepted += 1;
            let n = pattern.suggestion_accepted as f64;
            let observation = if successful { 1.0 } else { 0.0 };
            let updated = match pattern.suggestion_effectiveness {
                Some(current) => (current * (n - 1.0) + observation) / n,
                None => observation,
            };
            pattern.suggestion_effectiveness = Some(updated.clamp(0.0, 1.0));
        }
    }

    fn rank_candidates(
        &self,
        store: &PatternStore,
        task: &TaskState,
        now_ms: u64,
    ) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = store
            .candidates(task.task_type)
            .filter_map(|p| {
                let similarity = jaccard(&task.modified_files, &p.sequence);
                if similarity <= SIMILARITY_THRESHOLD {
                    return None;
                }
                let effectiveness = p
                    .suggestion_effectiveness
                    .unwrap_or(NEUTRAL_EFFECTIVENESS);
                let rank_score = W_SIMILARITY * similarity
                    + W_SUCCESS * p.success_rate
                    + W_DECAY * decay_factor(p.last_used_ms, now_ms)
                    + W_EFFECTIVENESS * effectiveness;
                Some(RankedCandidate {
                    id: p.id.clone(),
                    rank_score,
                    success_rate: p.success_rate,
                    avg_time_secs: p.avg_time_secs,
                    sequence: p.sequence.clone(),
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.rank_score
                .partial_cmp(&a.rank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(MAX_CANDIDATES);
        ranked
    }

    /// Best candidate's remaining sequence, then the strongest propagation
    /// targets. The final list never repeats a path.
    fn recommend_order(
        &self,
        ranked: &[RankedCandidate],
        activations: &HashMap<String, f64>,
        task: &TaskState,
    ) -> Vec<String> {
        let modified: HashSet<&str> = task.modified_files.iter().map(String::as_str).collect();
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Some(best) = ranked.first() {
            for file in &best.sequence {
                if !modified.contains(file.as_str()) && seen.insert(file.clone()) {
                    order.push(file.clone());
                }
            }
        }

        let mut by_activation: Vec<(&String, f64)> =
            activations.iter().map(|(path, a)| (path, *a)).collect();
        by_activation.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        for (path, _) in by_activation.into_iter().take(ACTIVATION_SUPPLEMENT) {
            if seen.insert(path.clone()) {
                order.push(path.clone());
            }
        }

        order
    }

    fn predict_risks(
        &self,
        graph: &DependencyGraph,
        recommended_order: &[String],
    ) -> BTreeMap<String, RiskEntry> {
        let mut risks = BTreeMap::new();
        for file in recommended_order {
            let Some(node) = graph.node(file) else {
                continue;
            };
            let mut level = RiskLevel::Low;
            let mut reasons = Vec::new();

            if node.entropy > RISK_ENTROPY_BITS {
                level = level.max(RiskLevel::Medium);
                reasons.push(format!(
                    "high content entropy ({:.2} bits/char)",
                    node.entropy
                ));
            }
            let degree = graph.out_degree(file);
            if degree > RISK_OUT_DEGREE {
                level = RiskLevel::High;
                reasons.push(format!("highly connected ({degree} outgoing references)"));
            }
            if node.activation_level < STALE_ACTIVATION {
                reasons.push("not modified recently".to_string());
                if level == RiskLevel::Low {
                    level = RiskLevel::Medium;
                }
            }

            if !reasons.is_empty() {
                risks.insert(file.clone(), RiskEntry { level, reasons });
            }
        }
        risks
    }
}

impl Default for WorkflowOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn predict_outcome(ranked: &[RankedCandidate]) -> (f64, f64) {
    if ranked.is_empty() {
        return (DEFAULT_PREDICTED_SUCCESS_RATE, DEFAULT_PREDICTED_TIME_SECS);
    }
    let top = &ranked[..ranked.len().min(PREDICTION_CANDIDATES)];
    let n = top.len() as f64;
    let success = top.iter().map(|c| c.success_rate).sum::<f64>() / n;
    let time = top.iter().map(|c| c.avg_time_secs).sum::<f64>() / n;
    (success, time)
}

fn next_actions(
    ranked: &[RankedCandidate],
    recommended_order: &[String],
    risks: &BTreeMap<String, RiskEntry>,
) -> Vec<String> {
    let mut actions = Vec::new();
    if let Some(first) = recommended_order.first() {
        actions.push(format!("Start with {first}"));
    }
    let high_risk = risks
        .values()
        .filter(|r| r.level == RiskLevel::High)
        .count();
    if high_risk > 0 {
        actions.push(format!(
            "Review the {high_risk} high-risk file(s) before editing them"
        ));
    }
    if ranked.is_empty() {
        actions.push("No similar historical workflow found; defaults applied".to_string());
    } else {
        actions.push(format!(
            "Recommendation based on {} similar workflow(s)",
            ranked.len()
        ));
    }
    actions
}

fn suggestion_id(now_ms: u64, pattern_ids: &[String], modified_files: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(now_ms.to_be_bytes());
    for id in pattern_ids {
        hasher.update(id.as_bytes());
    }
    for file in modified_files {
        hasher.update(file.as_bytes());
    }
    let digest = hasher.finalize();
    let short: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("sug-{short}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskType, WorkflowPattern};
    use impact_graph::{DependencyEdge, EdgeSignals, FileNode};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const NOW_MS: u64 = 1_700_000_000_000;

    fn pattern(id: &str, task_type: TaskType, sequence: &[&str]) -> WorkflowPattern {
        WorkflowPattern {
            id: id.to_string(),
            task_type,
            sequence: sequence.iter().map(|s| s.to_string()).collect(),
            success_rate: 0.5,
            avg_time_secs: 600.0,
            violation_rate: 0.0,
            usage_count: 1,
            last_used_ms: NOW_MS,
            suggestion_effectiveness: None,
            suggestion_count: 0,
            suggestion_accepted: 0,
        }
    }

    fn task(task_type: TaskType, modified: &[&str]) -> TaskState {
        TaskState {
            task_type,
            current_file: modified.first().map(|s| s.to_string()),
            modified_files: modified.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_store_and_unknown_task_yield_documented_defaults() {
        let mut store = PatternStore::new();
        let graph = DependencyGraph::new();
        let suggestion = WorkflowOptimizer::new().optimize(
            &mut store,
            &graph,
            &HashMap::new(),
            &task(TaskType::Unknown, &[]),
            NOW_MS,
        );

        assert_eq!(suggestion.predicted_success_rate, 0.7);
        assert_eq!(suggestion.predicted_time_secs, 600.0);
        assert!(suggestion.pattern_ids.is_empty());
        assert!(suggestion.recommended_order.is_empty());
        assert!(suggestion.suggestion_id.starts_with("sug-"));
    }

    #[test]
    fn low_similarity_candidates_are_discarded() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Feature, &["a", "b", "c", "d"]));
        let graph = DependencyGraph::new();

        // similarity 1/4 = 0.25 <= 0.3
        let suggestion = WorkflowOptimizer::new().optimize(
            &mut store,
            &graph,
            &HashMap::new(),
            &task(TaskType::Feature, &["a"]),
            NOW_MS,
        );

        assert!(suggestion.pattern_ids.is_empty());
        assert_eq!(suggestion.predicted_success_rate, 0.7);
    }

    #[test]
    fn higher_success_rate_ranks_first() {
        let mut store = PatternStore::new();
        let mut strong = pattern("strong", TaskType::Feature, &["a", "b"]);
        strong.success_rate = 0.9;
        let mut weak = pattern("weak", TaskType::Feature, &["a", "b"]);
        weak.success_rate = 0.1;
        store.insert(strong);
        store.insert(weak);

        let suggestion = WorkflowOptimizer::new().optimize(
            &mut store,
            &DependencyGraph::new(),
            &HashMap::new(),
            &task(TaskType::Feature, &["a", "b"]),
            NOW_MS,
        );

        assert_eq!(suggestion.pattern_ids[0], "strong");
        // Prediction averages the top candidates.
        assert!((suggestion.predicted_success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn recommended_order_merges_pattern_and_propagation_without_duplicates() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Feature, &["a", "b", "c"]));

        let mut activations = HashMap::new();
        activations.insert("b".to_string(), 0.9);
        activations.insert("d".to_string(), 0.8);

        let suggestion = WorkflowOptimizer::new().optimize(
            &mut store,
            &DependencyGraph::new(),
            &activations,
            &task(TaskType::Feature, &["a", "b"]),
            NOW_MS,
        );

        // Pattern part: c (a and b already modified); supplement: b is a
        // duplicate, d is appended.
        assert_eq!(suggestion.recommended_order, vec!["c", "b", "d"]);
    }

    #[test]
    fn high_entropy_file_is_at_least_medium_risk() {
        let mut graph = DependencyGraph::new();
        let mut node = FileNode::new("src/dense.ts");
        node.entropy = 5.5;
        node.activation_level = 1.0;
        graph.insert_node(node);

        let mut activations = HashMap::new();
        activations.insert("src/dense.ts".to_string(), 0.9);

        let suggestion = WorkflowOptimizer::new().optimize(
            &mut PatternStore::new(),
            &graph,
            &activations,
            &task(TaskType::Unknown, &[]),
            NOW_MS,
        );

        let risk = &suggestion.risks["src/dense.ts"];
        assert_eq!(risk.level, RiskLevel::Medium);
        assert_eq!(risk.reasons.len(), 1);
    }

    #[test]
    fn hub_file_is_high_risk() {
        let mut graph = DependencyGraph::new();
        let mut hub = FileNode::new("src/hub.ts");
        hub.activation_level = 1.0;
        graph.insert_node(hub);
        for i in 0..11 {
            let path = format!("src/dep{i}.ts");
            graph.insert_node(FileNode::new(path.clone()));
            graph.add_edge(
                "src/hub.ts",
                &path,
                DependencyEdge {
                    weight: 0.32,
                    signals: EdgeSignals::default(),
                },
            );
        }

        let mut activations = HashMap::new();
        activations.insert("src/hub.ts".to_string(), 0.9);

        let suggestion = WorkflowOptimizer::new().optimize(
            &mut PatternStore::new(),
            &graph,
            &activations,
            &task(TaskType::Unknown, &[]),
            NOW_MS,
        );

        assert_eq!(suggestion.risks["src/hub.ts"].level, RiskLevel::High);
    }

    #[test]
    fn stale_file_bumps_to_medium() {
        let mut graph = DependencyGraph::new();
        let mut stale = FileNode::new("src/old.ts");
        stale.activation_level = 0.1;
        graph.insert_node(stale);

        let mut activations = HashMap::new();
        activations.insert("src/old.ts".to_string(), 0.9);

        let suggestion = WorkflowOptimizer::new().optimize(
            &mut PatternStore::new(),
            &graph,
            &activations,
            &task(TaskType::Unknown, &[]),
            NOW_MS,
        );

        assert_eq!(suggestion.risks["src/old.ts"].level, RiskLevel::Medium);
    }

    #[test]
    fn untriggered_files_have_no_risk_entry() {
        let mut graph = DependencyGraph::new();
        let mut calm = FileNode::new("src/calm.ts");
        calm.entropy = 3.0;
        calm.activation_level = 0.9;
        graph.insert_node(calm);

        let mut activations = HashMap::new();
        activations.insert("src/calm.ts".to_string(), 0.9);

        let suggestion = WorkflowOptimizer::new().optimize(
            &mut PatternStore::new(),
            &graph,
            &activations,
            &task(TaskType::Unknown, &[]),
            NOW_MS,
        );

        assert!(suggestion.risks.is_empty());
    }

    #[test]
    fn optimize_counts_suggestions_on_used_patterns() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Feature, &["a", "b"]));

        WorkflowOptimizer::new().optimize(
            &mut store,
            &DependencyGraph::new(),
            &HashMap::new(),
            &task(TaskType::Feature, &["a", "b"]),
            NOW_MS,
        );

        assert_eq!(store.get("p1").unwrap().suggestion_count, 1);
    }

    #[test]
    fn accepted_outcomes_move_the_effectiveness_average() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Feature, &["a"]));
        let ids = vec!["p1".to_string()];
        let optimizer = WorkflowOptimizer::new();

        optimizer.record_outcome(&mut store, &ids, true, true);
        assert_eq!(store.get("p1").unwrap().suggestion_effectiveness, Some(1.0));

        optimizer.record_outcome(&mut store, &ids, true, false);
        let p = store.get("p1").unwrap();
        assert_eq!(p.suggestion_accepted, 2);
        assert!((p.suggestion_effectiveness.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejected_outcomes_change_nothing() {
        let mut store = PatternStore::new();
        store.insert(pattern("p1", TaskType::Feature, &["a"]));

        WorkflowOptimizer::new().record_outcome(
            &mut store,
            &["p1".to_string()],
            false,
            true,
        );

        let p = store.get("p1").unwrap();
        assert_eq!(p.suggestion_accepted, 0);
        assert_eq!(p.suggestion_effectiveness, None);
    }

    proptest! {
        #[test]
        fn recommended_order_never_repeats_a_path(
            sequence in proptest::collection::vec("[a-e]", 0..10),
            modified in proptest::collection::vec("[a-e]", 0..5),
            activations in proptest::collection::hash_map("[a-h]", 0.0f64..1.0, 0..12),
        ) {
            let mut store = PatternStore::new();
            let mut p = pattern("p1", TaskType::Feature, &[]);
            p.sequence = sequence;
            store.insert(p);

            let suggestion = WorkflowOptimizer::new().optimize(
                &mut store,
                &DependencyGraph::new(),
                &activations,
                &TaskState {
                    task_type: TaskType::Feature,
                    current_file: None,
                    modified_files: modified,
                },
                NOW_MS,
            );

            let unique: HashSet<&String> = suggestion.recommended_order.iter().collect();
            prop_assert_eq!(unique.len(), suggestion.recommended_order.len());
        }
    }
}
