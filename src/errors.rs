//! Error types for feedback_summarizer
//!
//! This module defines the error type shared by every stage of the feedback
//! loop. Configuration problems are reported at construction time; solver
//! failures are reported per iteration.

use thiserror::Error;

use crate::ilp::SolveFailure;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SummarizerError>;

/// Main error type for feedback_summarizer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummarizerError {
    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Strategy name is not one of the recognised selection strategies
    #[error("Unknown strategy: {name}")]
    UnknownStrategy { name: String },

    /// A required collaborator (solver, scorer, oracle, feedback store) was not supplied
    #[error("Missing collaborator: {name}")]
    MissingCollaborator { name: String },

    /// Corpus is empty or contains a sentence that cannot be ranked
    #[error("Empty corpus: {message}")]
    EmptyCorpus { message: String },

    /// The summary ILP admits no feasible selection
    #[error("Infeasible {problem} problem: {message}")]
    Infeasible { problem: String, message: String },

    /// The controller already reached its terminal state
    #[error("Controller has terminated")]
    Terminated,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal error (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SummarizerError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unknown strategy error
    pub fn unknown_strategy(name: impl Into<String>) -> Self {
        Self::UnknownStrategy { name: name.into() }
    }

    /// Create a missing collaborator error
    pub fn missing_collaborator(name: impl Into<String>) -> Self {
        Self::MissingCollaborator { name: name.into() }
    }

    /// Create an empty corpus error
    pub fn empty_corpus(message: impl Into<String>) -> Self {
        Self::EmptyCorpus {
            message: message.into(),
        }
    }

    /// Create an infeasibility error for the named problem
    pub fn infeasible(problem: impl Into<String>, failure: SolveFailure) -> Self {
        Self::Infeasible {
            problem: problem.into(),
            message: failure.to_string(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error stems from configuration rather than execution.
    /// Configuration errors abort the run before the first iteration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::UnknownStrategy { .. }
                | Self::MissingCollaborator { .. }
                | Self::EmptyCorpus { .. }
        )
    }
}

impl From<serde_json::Error> for SummarizerError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
