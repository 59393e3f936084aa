//! Applies feedback-store weights to the authoritative table

use super::recorder::FlightRecorder;
use super::store::FeedbackStore;
use crate::ranking::RankedSentenceIndex;
use crate::types::{ConceptWeights, Corpus};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use tracing::debug;

/// Outcome of one weight update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightUpdate {
    /// Concepts whose weight value changed, sorted
    pub changed: Vec<String>,
    /// Concepts re-ranked: the changed ones plus the latest labels, sorted
    pub affected: Vec<String>,
    /// Store concepts missing from the weight table
    pub skipped_unknown: usize,
    /// Sentences whose rank was recomputed
    pub reranked: usize,
}

/// Relative change below which a rescaled weight counts as unchanged
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Scales normalized store weights into the authoritative table and keeps
/// the ranking and the important-concept set in step.
///
/// The important concepts are the accepted concepts whose most recent label
/// is still an accept. A concept accepted once and rejected later drops out,
/// unlike the running union of every accept the recorder keeps.
#[derive(Debug, Clone)]
pub struct FeedbackWeightUpdater {
    max_weight: f64,
    important_concepts: FxHashSet<String>,
}

impl FeedbackWeightUpdater {
    pub fn new(max_weight: f64) -> Self {
        Self {
            max_weight,
            important_concepts: FxHashSet::default(),
        }
    }

    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Accepted concepts that were not rejected afterwards
    pub fn important_concepts(&self) -> &FxHashSet<String> {
        &self.important_concepts
    }

    /// Rebuild the important-concept set from the recorder
    pub fn refresh_important(&mut self, recorder: &FlightRecorder) {
        self.important_concepts = recorder.effective_labels().accepted.into_iter().collect();
    }

    /// Scale a normalized weight. Values above 1 saturate at the ceiling.
    pub fn scale(&self, normalized: f64) -> f64 {
        if normalized > 1.0 {
            self.max_weight
        } else {
            normalized * self.max_weight
        }
    }

    /// Write the store's weights into `weights` and re-rank what moved.
    ///
    /// The store must already have incorporated the recorder.
    pub fn apply(
        &mut self,
        store: &dyn FeedbackStore,
        recorder: &FlightRecorder,
        corpus: &Corpus,
        weights: &mut ConceptWeights,
        index: &mut RankedSentenceIndex,
    ) -> WeightUpdate {
        let mut changed = Vec::new();
        let mut skipped_unknown = 0;

        for (concept, normalized) in store.weights() {
            let Some(previous) = weights.try_get(&concept) else {
                debug!(concept = %concept, weight = normalized, "ignoring unknown concept");
                skipped_unknown += 1;
                continue;
            };
            let scaled = self.scale(normalized);
            if (scaled - previous).abs() > WEIGHT_TOLERANCE * self.max_weight.max(1.0) {
                weights.set(concept.clone(), scaled);
                changed.push(concept);
            }
        }
        changed.sort_unstable();

        let latest = recorder.latest();
        let affected: BTreeSet<&str> = changed
            .iter()
            .map(String::as_str)
            .chain(latest.accept.iter().map(String::as_str))
            .chain(latest.reject.iter().map(String::as_str))
            .collect();
        let reranked = index.update_affected(corpus, weights, affected.iter().copied());
        let affected: Vec<String> = affected.into_iter().map(str::to_string).collect();

        self.refresh_important(recorder);
        debug!(
            changed = changed.len(),
            reranked,
            skipped_unknown,
            important = self.important_concepts.len(),
            "weights updated"
        );

        WeightUpdate {
            changed,
            affected,
            skipped_unknown,
            reranked,
        }
    }
}
