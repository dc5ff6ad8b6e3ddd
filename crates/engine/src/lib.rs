//! # Impact Engine
//!
//! The facade over the impact-analysis core: graph construction, priority
//! scoring, forward/backward propagation, workflow optimization, and pattern
//! learning, wired to collaborator-supplied file content, goal distances,
//! version-control history, and execution telemetry.
//!
//! ## Example
//!
//! ```no_run
//! use impact_engine::{EngineConfig, FsFileProvider, GoalDistanceProvider, ImpactEngine};
//! use std::sync::Arc;
//!
//! struct NoGoal;
//! impl GoalDistanceProvider for NoGoal {
//!     fn distance(&self, _path: &str) -> f64 {
//!         0.5
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = ImpactEngine::new(
//!         EngineConfig::default(),
//!         Arc::new(FsFileProvider::new("/path/to/project")),
//!         Arc::new(NoGoal),
//!     );
//!     let stats = engine.build_graph().await?;
//!     println!("{} files, {} references", stats.node_count, stats.edge_count);
//!     Ok(())
//! }
//! ```

mod config;
mod engine;
mod error;
mod fs_provider;
mod providers;

pub use config::EngineConfig;
pub use engine::{ImpactEngine, LearningStats};
pub use error::{EngineError, Result};
pub use fs_provider::FsFileProvider;
pub use providers::{FileContent, FileProvider, GoalDistanceProvider, VcsAdapter};

// The collaborator-facing vocabulary of the underlying crates.
pub use impact_graph::{DependencyGraph, FileNode, GraphStats};
pub use impact_patterns::{
    Classification, CommitRecord, CompletedTask, OptimizationSuggestion, PatternStats, TaskState,
    TaskType,
};
pub use impact_propagation::{FailureSignal, PropagationResult};
