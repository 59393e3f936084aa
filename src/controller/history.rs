//! Per-iteration history and the final result bundle

use super::BreakReason;
use crate::types::{RougeScores, SentenceId};
use serde::{Deserialize, Serialize};

/// One row of the run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub scores: RougeScores,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub accept_count: usize,
    pub reject_count: usize,
    /// Summary sentences, in summary order
    pub summary: Vec<String>,
    pub summary_ids: Vec<SentenceId>,
    /// Concepts recommended for the next round
    pub recommendations: Vec<String>,
    pub pool_size: usize,
    pub k: usize,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub summary: Vec<String>,
    pub summary_ids: Vec<SentenceId>,
    pub scores: RougeScores,
    /// Recommended concepts nobody has labelled yet
    pub recommendations: Vec<String>,
    pub recommended_sentences: Vec<SentenceId>,
    pub break_reason: Option<BreakReason>,
    pub iterations: usize,
    pub k_history: Vec<usize>,
    /// Number of distinct sentences ever exposed to the optimizer
    pub seen_sentences: usize,
    pub history: Vec<IterationRecord>,
}

impl RunResult {
    /// Summary sentences joined by newlines
    pub fn summary_text(&self) -> String {
        self.summary.join("\n")
    }
}
