//! # Impact Propagation
//!
//! Breadth-first spreading of activation (forward) and blame (backward)
//! across the dependency graph.
//!
//! - **Forward**: predicts the blast radius of a change by spreading
//!   sigmoid-squashed activation along outgoing references.
//! - **Backward**: attributes a failure to the files that reference the
//!   failing one and nudges their edge weights down (online learning with
//!   epoch bookkeeping).

mod backward;
mod forward;

pub use backward::{
    BackwardPropagation, EpochSummary, FailureSignal, LearningState, DEFAULT_LEARNING_RATE,
    MAX_LEARNING_RATE, MIN_LEARNING_RATE, WEIGHT_CEIL, WEIGHT_FLOOR,
};
pub use forward::{sigmoid, ForwardPropagation, PropagationResult, DEFAULT_MAX_DEPTH};
