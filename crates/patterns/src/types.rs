use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of work a file-change sequence represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    BugFix,
    Feature,
    Refactor,
    Test,
    Docs,
    Unknown,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BugFix => "bug-fix",
            Self::Feature => "feature",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::Docs => "docs",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A learned record of a historical task's file-change sequence and outcome.
///
/// Created on first observation, updated in place via running averages on
/// every later matching observation, never deleted automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPattern {
    pub id: String,
    pub task_type: TaskType,

    /// Ordered file paths the task touched.
    pub sequence: Vec<String>,

    /// Success fraction in [0,1], reproducible from the running-average rule.
    pub success_rate: f64,

    /// Mean task duration in seconds.
    #[serde(rename = "avgTime")]
    pub avg_time_secs: f64,

    /// Mean rule-violation count per observation (>= 0).
    pub violation_rate: f64,

    pub usage_count: u64,

    #[serde(rename = "lastUsedTimestamp")]
    pub last_used_ms: u64,

    /// Running-average outcome of accepted suggestions, unset until the
    /// first recorded outcome (readers fall back to 0.5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_effectiveness: Option<f64>,

    #[serde(default)]
    pub suggestion_count: u64,

    #[serde(default)]
    pub suggestion_accepted: u64,
}

/// The task a caller wants a recommendation for.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub task_type: TaskType,
    pub current_file: Option<String>,
    pub modified_files: Vec<String>,
}

/// Risk ranking for one recommended file. Order matters: Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEntry {
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

/// One optimizer recommendation. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSuggestion {
    pub suggestion_id: String,

    /// Patterns consulted for this suggestion, best first.
    pub pattern_ids: Vec<String>,

    /// Deduplicated recommended file order.
    pub recommended_order: Vec<String>,

    pub risks: BTreeMap<String, RiskEntry>,

    pub next_actions: Vec<String>,

    pub predicted_success_rate: f64,
    pub predicted_time_secs: f64,
}

/// One commit from the version-control adapter.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
    pub changed_files: Vec<String>,
    pub timestamp_ms: u64,
}

/// One completed task from the execution-telemetry feed.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    pub task_type: TaskType,
    pub changed_files: Vec<String>,
    pub success: bool,
    pub start_ms: u64,
    pub end_ms: u64,
    pub violations: u32,
    pub compile_errors: u32,
}
