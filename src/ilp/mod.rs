//! Integer linear programs for summary and recommendation selection
//!
//! Problems are built from the active pool and the scoped weight table,
//! then handed to an [`IlpSolver`]. Any exact solver can sit behind the
//! trait; [`BranchAndBoundSolver`] is the built-in one.

pub mod problem;
pub mod solver;

pub use problem::{ConceptTerm, CoverageProblem, ProblemKind};
pub use solver::{BranchAndBoundSolver, IlpSolution, IlpSolver, SolveFailure};
