//! The iterative feedback loop
//!
//! [`IterationController`] owns one simulation run: the authoritative
//! weights, the ranking, the flight recorder and the collaborators. Build it
//! with [`ControllerBuilder`], then drive it with
//! [`step`](IterationController::step) or [`run`](IterationController::run).

pub mod builder;
pub mod history;
pub mod iteration;
pub mod snapshot;

pub use builder::ControllerBuilder;
pub use history::{IterationRecord, RunResult};
pub use iteration::IterationController;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};

use crate::feedback::FlightRecorder;
use serde::{Deserialize, Serialize};

/// Why a run stopped, in evaluation priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakReason {
    /// The latest round labelled nothing
    NoMoreFeedback,
    /// Scores equal the upper bound exactly
    UpperBoundScore,
    /// ROUGE-2 reached the upper bound
    Rouge2,
    /// The summary is the upper-bound summary
    UpperBoundSummary,
    /// The iteration limit was reached
    MaxIterations,
}

impl std::fmt::Display for BreakReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BreakReason::NoMoreFeedback => "last record holds no feedback",
            BreakReason::UpperBoundScore => "score equals the upper bound",
            BreakReason::Rouge2 => "ROUGE-2 reached the upper bound",
            BreakReason::UpperBoundSummary => "summary equals the upper-bound summary",
            BreakReason::MaxIterations => "maximum number of iterations reached",
        };
        f.write_str(text)
    }
}

/// Lifecycle of a controller. Initialization happens in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Iterating,
    Terminated(BreakReason),
    /// The summary problem of an iteration could not be solved
    Failed,
}

impl ControllerState {
    /// Whether further steps are refused
    pub fn is_terminated(&self) -> bool {
        matches!(self, ControllerState::Terminated(_) | ControllerState::Failed)
    }
}

/// Result of one [`step`](IterationController::step)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Terminated(BreakReason),
}

/// Per-concept label uncertainty for active learning
pub trait UncertaintyModel {
    /// Uncertainty of the concept's predicted label, in `[0, 1]`
    fn uncertainty(&self, concept: &str) -> f64;

    /// Retrain on the labels recorded so far
    fn fit(&mut self, _recorder: &FlightRecorder) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_reason_serde() {
        let json = serde_json::to_string(&BreakReason::UpperBoundSummary).unwrap();
        assert_eq!(json, r#""upper_bound_summary""#);
        let state = ControllerState::Terminated(BreakReason::Rouge2);
        let back: ControllerState =
            serde_json::from_str(&serde_json::to_string(&state).unwrap()).unwrap();
        assert_eq!(back, state);
        assert!(back.is_terminated());
        assert!(!ControllerState::Iterating.is_terminated());
        assert!(ControllerState::Failed.is_terminated());
        assert_eq!(serde_json::to_string(&ControllerState::Failed).unwrap(), r#""failed""#);
    }
}
