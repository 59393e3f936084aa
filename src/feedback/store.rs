//! Feedback stores
//!
//! A [`FeedbackStore`] turns the flight recorder into normalized concept
//! weights in `[0, 1]` (values above 1 mean "saturated"). The
//! [`FeedbackWeightUpdater`](super::FeedbackWeightUpdater) scales them back
//! into the authoritative table.

use super::recorder::{FlightRecorder, Record};
use crate::config::FeedbackMode;
use crate::types::{ConceptWeights, Corpus};
use rustc_hash::FxHashMap;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

/// Number of concepts kept by the `top_n` interpretation
pub const TOP_N_CONCEPTS: usize = 400;

/// Weight model driven by oracle feedback
pub trait FeedbackStore {
    /// Seed the model from the corpus and its current weights
    fn add_sentences(&mut self, corpus: &Corpus, weights: &ConceptWeights, max_weight: f64);

    /// Fold the recorded labels into the model
    fn incorporate_feedback(&mut self, recorder: &FlightRecorder);

    /// Normalized `(concept, weight)` pairs, sorted by concept
    fn weights(&self) -> Vec<(String, f64)>;

    /// Description of the store for result dumps
    fn config(&self) -> serde_json::Value;
}

/// Static label interpretation: accepted concepts go to 1, rejected to 0.
///
/// Which records are read (latest or union) depends on the
/// [`FeedbackMode`].
#[derive(Debug, Clone)]
pub struct BaselineFeedbackStore {
    mode: FeedbackMode,
    max_weight: f64,
    weights: FxHashMap<String, f64>,
    initial: FxHashMap<String, f64>,
}

impl BaselineFeedbackStore {
    pub fn new(mode: FeedbackMode) -> Self {
        Self {
            mode,
            max_weight: 0.0,
            weights: FxHashMap::default(),
            initial: FxHashMap::default(),
        }
    }

    pub fn mode(&self) -> FeedbackMode {
        self.mode
    }

    fn set_all<'a>(&mut self, concepts: impl IntoIterator<Item = &'a String>, value: f64) {
        for concept in concepts {
            self.weights.insert(concept.clone(), value);
        }
    }

    fn reject(&mut self, concepts: &BTreeSet<String>) {
        self.set_all(concepts, 0.0);
    }

    fn accept(&mut self, concepts: &BTreeSet<String>) {
        self.set_all(concepts, 1.0);
    }

    fn keep_top_n(&mut self) {
        let mut ranked: Vec<(&String, f64)> = self.weights.iter().map(|(c, w)| (c, *w)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let cutoff: Vec<String> = ranked
            .into_iter()
            .skip(TOP_N_CONCEPTS)
            .map(|(c, _)| c.clone())
            .collect();
        for concept in cutoff {
            self.weights.insert(concept, 0.0);
        }
    }
}

impl FeedbackStore for BaselineFeedbackStore {
    fn add_sentences(&mut self, _corpus: &Corpus, weights: &ConceptWeights, max_weight: f64) {
        self.max_weight = max_weight;
        self.weights = weights
            .iter()
            .map(|(c, w)| (c.to_string(), w / max_weight))
            .collect();
        self.initial = self.weights.clone();
    }

    fn incorporate_feedback(&mut self, recorder: &FlightRecorder) {
        let latest: &Record = recorder.latest();
        let union: &Record = recorder.union();
        debug!(mode = ?self.mode, "interpreting feedback");

        match self.mode {
            FeedbackMode::RejectAll => self.reject(&union.reject),
            FeedbackMode::AcceptAll => self.accept(&union.accept),
            FeedbackMode::AcceptReject | FeedbackMode::IlpFeedback | FeedbackMode::ActiveLearning => {
                self.reject(&latest.reject);
                self.accept(&latest.accept);
            }
            FeedbackMode::KeepTrack => {
                self.reject(&latest.reject);
                if latest.accept.is_empty() {
                    self.accept(&union.accept);
                } else {
                    self.reject(&union.accept);
                }
            }
            FeedbackMode::TopN => {
                self.weights = self.initial.clone();
                self.reject(&union.reject);
                self.accept(&union.accept);
                if !union.accept.is_empty() {
                    self.keep_top_n();
                }
            }
        }
    }

    fn weights(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> =
            self.weights.iter().map(|(c, w)| (c.clone(), *w)).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "type": "BaselineFeedbackStore",
            "mode": self.mode,
            "max_weight": self.max_weight,
            "had_initial_weights": !self.initial.is_empty(),
        })
    }
}
