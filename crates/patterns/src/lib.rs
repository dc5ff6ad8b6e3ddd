//! # Impact Patterns
//!
//! Learned file-change workflows and the optimizer that recommends them.
//!
//! ## Pipeline
//!
//! ```text
//! VCS history / telemetry
//!     │
//!     ├──> Task Classifier (ordered rule chain)
//!     │      └─ task type + confidence + reason
//!     │
//!     ├──> Pattern Learner (running averages)
//!     │      └─ WorkflowPattern store
//!     │
//!     └──> Workflow Optimizer
//!            ├─ Similarity retrieval (Jaccard, decay-bucketed ranking)
//!            ├─ Recommended file order (pattern + propagation merge)
//!            ├─ Per-file risk prediction
//!            └─ Outcome prediction
//! ```

mod classifier;
mod learner;
mod optimizer;
mod similarity;
mod store;
mod types;

pub use classifier::{Classification, TaskClassifier};
pub use learner::PatternLearner;
pub use optimizer::{
    WorkflowOptimizer, DEFAULT_PREDICTED_SUCCESS_RATE, DEFAULT_PREDICTED_TIME_SECS,
};
pub use similarity::{decay_factor, jaccard};
pub use store::{PatternStats, PatternStore};
pub use types::{
    CommitRecord, CompletedTask, OptimizationSuggestion, RiskEntry, RiskLevel, TaskState, TaskType,
    WorkflowPattern,
};
