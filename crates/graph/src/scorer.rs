use crate::types::DependencyGraph;

/// Scoring coefficients. Goal proximity dominates; connectivity is a
/// tie-breaker.
const W_GOAL: f64 = 0.4;
const W_ACTIVATION: f64 = 0.2;
const W_IMPORTS: f64 = 0.15;
const W_ENTROPY: f64 = 0.1;
const W_CHANGE_FREQUENCY: f64 = 0.1;
const W_CONNECTIVITY: f64 = 0.05;

/// Computes `priority_score` for every node from its signals and an external
/// goal-distance function.
///
/// The score depends on graph-wide maxima, so it is recomputed on demand
/// over the whole graph rather than maintained incrementally.
pub struct PriorityScorer;

impl PriorityScorer {
    /// Score every node. `goal_distance` is the external collaborator; its
    /// output is clamped to [0,1] and written back onto the node.
    pub fn apply(graph: &mut DependencyGraph, goal_distance: impl Fn(&str) -> f64) {
        let max_import_count = graph
            .nodes()
            .map(|n| n.import_count)
            .max()
            .unwrap_or(0)
            .max(1) as f64;

        let paths: Vec<String> = graph.paths().map(str::to_string).collect();
        let max_edge_weight_sum = paths
            .iter()
            .map(|p| graph.edge_weight_sum(p))
            .fold(0.0f64, f64::max)
            .max(1.0);

        for path in paths {
            let distance = goal_distance(&path).clamp(0.0, 1.0);
            let weight_sum = graph.edge_weight_sum(&path);
            let Some(node) = graph.node_mut(&path) else {
                continue;
            };

            node.goal_distance = distance;
            let score = W_GOAL * (1.0 - distance)
                + W_ACTIVATION * node.activation_level
                + W_IMPORTS * (node.import_count as f64 / max_import_count)
                + W_ENTROPY * node.entropy
                + W_CHANGE_FREQUENCY * node.change_frequency
                + W_CONNECTIVITY * (weight_sum / max_edge_weight_sum);
            node.priority_score = score.clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyEdge, EdgeSignals, FileNode};
    use proptest::prelude::*;

    fn node(path: &str, entropy: f64, activation: f64, imports: usize) -> FileNode {
        let mut n = FileNode::new(path);
        n.entropy = entropy;
        n.activation_level = activation;
        n.import_count = imports;
        n
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let mut graph = DependencyGraph::new();
        // Entropy far above 1 bit/char must still produce a bounded score.
        graph.insert_node(node("src/hot.ts", 7.9, 1.0, 40));
        graph.insert_node(node("src/cold.ts", 0.0, 0.0, 0));

        PriorityScorer::apply(&mut graph, |_| 0.0);

        for n in graph.nodes() {
            assert!((0.0..=1.0).contains(&n.priority_score));
        }
    }

    #[test]
    fn goal_proximity_dominates() {
        let mut graph = DependencyGraph::new();
        graph.insert_node(node("src/near.ts", 1.0, 0.5, 1));
        graph.insert_node(node("src/far.ts", 1.0, 0.5, 1));

        PriorityScorer::apply(&mut graph, |path| if path.contains("near") { 0.0 } else { 1.0 });

        let near = graph.node("src/near.ts").unwrap().priority_score;
        let far = graph.node("src/far.ts").unwrap().priority_score;
        assert!(near > far);
        assert!((near - far - W_GOAL).abs() < 1e-9);
    }

    #[test]
    fn empty_graph_maxima_fall_back_to_one() {
        let mut graph = DependencyGraph::new();
        graph.insert_node(node("src/a.ts", 0.0, 0.0, 0));
        // max import count and max edge weight sum are both 0 here; the
        // division guard must keep the score finite.
        PriorityScorer::apply(&mut graph, |_| 0.5);
        let score = graph.node("src/a.ts").unwrap().priority_score;
        assert!(score.is_finite());
        assert!((score - W_GOAL * 0.5).abs() < 1e-9);
    }

    #[test]
    fn connectivity_contributes_through_edge_weights() {
        let mut graph = DependencyGraph::new();
        graph.insert_node(node("src/hub.ts", 0.0, 0.0, 0));
        graph.insert_node(node("src/leaf.ts", 0.0, 0.0, 0));
        graph.add_edge(
            "src/hub.ts",
            "src/leaf.ts",
            DependencyEdge {
                weight: 0.32,
                signals: EdgeSignals::default(),
            },
        );

        PriorityScorer::apply(&mut graph, |_| 1.0);

        let hub = graph.node("src/hub.ts").unwrap().priority_score;
        let leaf = graph.node("src/leaf.ts").unwrap().priority_score;
        assert!(hub > leaf);
    }

    #[test]
    fn external_goal_distance_is_clamped() {
        let mut graph = DependencyGraph::new();
        graph.insert_node(node("src/a.ts", 0.0, 0.0, 0));
        PriorityScorer::apply(&mut graph, |_| 42.0);
        assert_eq!(graph.node("src/a.ts").unwrap().goal_distance, 1.0);
    }

    proptest! {
        #[test]
        fn priority_score_bounded_for_arbitrary_signals(
            entropy in 0.0f64..16.0,
            activation in 0.0f64..1.0,
            change_frequency in 0.0f64..1.0,
            imports in 0usize..500,
            distance in -2.0f64..3.0,
        ) {
            let mut graph = DependencyGraph::new();
            let mut n = node("src/fuzz.ts", entropy, activation, imports);
            n.change_frequency = change_frequency;
            graph.insert_node(n);

            PriorityScorer::apply(&mut graph, |_| distance);

            let scored = graph.node("src/fuzz.ts").unwrap();
            prop_assert!((0.0..=1.0).contains(&scored.priority_score));
            prop_assert!((0.0..=1.0).contains(&scored.goal_distance));
        }
    }
}
