//! # feedback_summarizer
//!
//! Interactive, feedback-driven extractive summarization.
//!
//! A run alternates between asking an oracle to label concepts, folding the
//! labels into a weight table, re-ranking sentences by concept density and
//! solving a budgeted concept-coverage ILP over a ranked candidate pool.
//!
//! ## Features
//!
//! - **Incremental ranking**: only sentences touching reweighted concepts move
//! - **Pool strategies**: fixed, entropy, adaptive window, redundancy sweep,
//!   positive link, time budget and seeded sampling
//! - **Pluggable collaborators**: solver, scorer, oracle and feedback store
//!   are traits
//! - **Checkpointing**: runs can be snapshotted to JSON and resumed

pub mod config;
pub mod controller;
pub mod errors;
pub mod feedback;
pub mod ilp;
pub mod oracle;
pub mod ranking;
pub mod sampling;
pub mod scoring;
pub mod strategy;
pub mod types;

// Re-export commonly used types
pub use config::{FeedbackMode, RunConfig, SamplingConfig, StrategyKind, TimeBudget};
pub use errors::{Result, SummarizerError};
pub use types::{ConceptWeights, Corpus, RougeScores, Sentence, SentenceId, UpperBound};

// Re-export main functionality
pub use controller::{
    BreakReason, ControllerBuilder, ControllerState, IterationController, IterationRecord,
    RunResult, Snapshot, StepOutcome, UncertaintyModel,
};
pub use feedback::{
    BaselineFeedbackStore, FeedbackStore, FeedbackWeightUpdater, FlightRecorder,
    NgramFeedbackGraph, Record,
};
pub use ilp::{BranchAndBoundSolver, CoverageProblem, IlpSolution, IlpSolver, SolveFailure};
pub use oracle::{HumanOracle, Labels, Oracle, SimulatedOracle};
pub use ranking::{ConceptIndex, RankedSentenceIndex};
pub use sampling::{ClusterSampler, RandomSampler, StratifiedSampler};
pub use scoring::{NgramRecallScorer, RougeScorer};
pub use strategy::{CandidatePool, PoolPolicy, SelectionContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
