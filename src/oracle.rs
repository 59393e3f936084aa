//! Oracles label candidate concepts
//!
//! The controller asks an [`Oracle`] to label the concepts it recommends.
//! [`SimulatedOracle`] peeks at the reference summaries; [`HumanOracle`]
//! replays a fixed list of user labels.

use crate::feedback::FlightRecorder;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Labels for one round of candidate concepts.
///
/// Every candidate lands in at most one set; unlabelled candidates are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub accepts: BTreeSet<String>,
    pub rejects: BTreeSet<String>,
    pub implicits: BTreeSet<String>,
}

impl Labels {
    pub fn is_empty(&self) -> bool {
        self.accepts.is_empty() && self.rejects.is_empty() && self.implicits.is_empty()
    }
}

/// Source of concept labels
pub trait Oracle {
    /// Label the candidate concepts given what has been recorded so far
    fn get_labels(&mut self, candidates: &BTreeSet<String>, recorder: &FlightRecorder) -> Labels;

    /// Short name stored in snapshots
    fn name(&self) -> &'static str;
}

/// Labels candidates against the reference summaries' concepts.
///
/// Candidates found in the references are accepted, the rest rejected.
/// Labels the recorder already holds are not repeated.
#[derive(Debug, Clone)]
pub struct SimulatedOracle {
    reference: FxHashSet<String>,
    stoplist: FxHashSet<String>,
}

impl SimulatedOracle {
    pub fn new(reference_concepts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            reference: reference_concepts.into_iter().map(Into::into).collect(),
            stoplist: FxHashSet::default(),
        }
    }

    /// Never label concepts made of stopwords only
    pub fn with_stoplist(mut self, stopwords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stoplist = stopwords.into_iter().map(Into::into).collect();
        self
    }

    fn is_stop_ngram(&self, concept: &str) -> bool {
        !self.stoplist.is_empty()
            && concept
                .split_whitespace()
                .all(|token| self.stoplist.contains(token))
    }
}

impl Oracle for SimulatedOracle {
    fn get_labels(&mut self, candidates: &BTreeSet<String>, recorder: &FlightRecorder) -> Labels {
        let union = recorder.union();
        let mut labels = Labels::default();
        for concept in candidates {
            if self.is_stop_ngram(concept) {
                continue;
            }
            if self.reference.contains(concept) {
                if !union.accept.contains(concept) {
                    labels.accepts.insert(concept.clone());
                }
            } else if !union.reject.contains(concept) {
                labels.rejects.insert(concept.clone());
            }
        }
        labels
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Replays labels given by a user
#[derive(Debug, Clone, Default)]
pub struct HumanOracle {
    accepts: FxHashSet<String>,
    rejects: FxHashSet<String>,
}

impl HumanOracle {
    pub fn new(
        accepts: impl IntoIterator<Item = impl Into<String>>,
        rejects: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            accepts: accepts.into_iter().map(Into::into).collect(),
            rejects: rejects.into_iter().map(Into::into).collect(),
        }
    }
}

impl Oracle for HumanOracle {
    fn get_labels(&mut self, candidates: &BTreeSet<String>, _recorder: &FlightRecorder) -> Labels {
        let mut labels = Labels::default();
        for concept in candidates {
            if self.accepts.contains(concept) {
                labels.accepts.insert(concept.clone());
            } else if self.rejects.contains(concept) {
                labels.rejects.insert(concept.clone());
            }
        }
        labels
    }

    fn name(&self) -> &'static str {
        "human"
    }
}
