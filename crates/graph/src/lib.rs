//! # Impact Graph
//!
//! Weighted file dependency graph for change-impact analysis.
//!
//! ## Pipeline
//!
//! ```text
//! ScannedFile[]
//!     │
//!     ├──> Graph Builder (static content inspection)
//!     │      ├─ Node signals (entropy, activation, import/export counts)
//!     │      ├─ Code reference edges
//!     │      ├─ Document link edges
//!     │      └─ Loose path-mention edges
//!     │
//!     ├──> Dependency Graph (petgraph)
//!     │      ├─ Nodes: tracked files with derived signals
//!     │      └─ Edges: directed weighted references
//!     │
//!     └──> Priority Scorer
//!            └─ Per-node importance in [0,1] from signals + goal distance
//! ```

mod builder;
mod error;
mod scorer;
mod signals;
mod types;

pub use builder::{GraphBuilder, ScannedFile, RESOLVE_EXTENSIONS};
pub use error::{GraphError, Result};
pub use scorer::PriorityScorer;
pub use signals::{
    activation_for_age_days, count_exports, count_imports, reference_weight, round2,
    shannon_entropy, unix_now_ms, SignalProvider, SignalSet, SignalSlot, DIRECT_IMPORT_STRENGTH,
    DOC_LINK_WEIGHT, PATH_MENTION_WEIGHT,
};
pub use types::{DependencyEdge, DependencyGraph, EdgeSignals, FileNode, GraphStats};
