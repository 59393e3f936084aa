//! Bigram propagation graph
//!
//! Tokens are nodes and bigram concepts are directed edges weighted by
//! their corpus count. A label on one bigram spills over onto the bigrams
//! leaving either of its tokens.

use super::recorder::FlightRecorder;
use super::store::FeedbackStore;
use crate::types::{ConceptWeights, Corpus};
use rustc_hash::FxHashMap;
use serde_json::json;
use std::collections::BTreeMap;

type Edge = (String, String);

/// Feedback store propagating labels along a token graph
#[derive(Debug, Clone)]
pub struct NgramFeedbackGraph {
    counts: FxHashMap<Edge, usize>,
    edges: BTreeMap<Edge, f64>,
    factor_accept: f64,
    factor_reject: f64,
}

impl Default for NgramFeedbackGraph {
    fn default() -> Self {
        Self::new(2.0, 0.5)
    }
}

impl NgramFeedbackGraph {
    pub fn new(factor_accept: f64, factor_reject: f64) -> Self {
        Self {
            counts: FxHashMap::default(),
            edges: BTreeMap::new(),
            factor_accept,
            factor_reject,
        }
    }

    fn split(concept: &str) -> Option<Edge> {
        let mut tokens = concept.split_whitespace();
        let (u, v) = (tokens.next()?, tokens.next()?);
        if tokens.next().is_some() {
            return None;
        }
        Some((u.to_string(), v.to_string()))
    }

    fn max_count(&self) -> f64 {
        self.counts.values().copied().max().unwrap_or(0) as f64
    }

    /// Current raw weight of a bigram edge
    pub fn edge_weight(&self, concept: &str) -> Option<f64> {
        Self::split(concept).and_then(|edge| self.edges.get(&edge).copied())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Scale every edge leaving `node`, except the one towards `skip`
    fn scale_successors(&mut self, node: &str, skip: &str, factor: f64, max: f64) {
        let successors: Vec<Edge> = self
            .edges
            .range((node.to_string(), String::new())..)
            .take_while(|((u, _), _)| u == node)
            .filter(|((_, v), _)| v != skip)
            .map(|(edge, _)| edge.clone())
            .collect();
        for edge in successors {
            if let Some(weight) = self.edges.get_mut(&edge) {
                *weight = (*weight * factor).clamp(0.0, max);
            }
        }
    }

    fn label(&mut self, concept: &str, value: f64, factor: f64, max: f64) {
        let Some(edge) = Self::split(concept) else {
            return;
        };
        let Some(weight) = self.edges.get_mut(&edge) else {
            return;
        };
        *weight = value;
        let (u, v) = edge;
        self.scale_successors(&u, &v, factor, max);
        self.scale_successors(&v, &u, factor, max);
    }
}

impl FeedbackStore for NgramFeedbackGraph {
    fn add_sentences(&mut self, corpus: &Corpus, _weights: &ConceptWeights, _max_weight: f64) {
        for sentence in corpus.iter() {
            for concept in &sentence.concepts {
                if let Some(edge) = Self::split(concept) {
                    *self.counts.entry(edge).or_insert(0) += 1;
                }
            }
        }
        self.edges = self
            .counts
            .iter()
            .map(|(edge, count)| (edge.clone(), *count as f64))
            .collect();
    }

    fn incorporate_feedback(&mut self, recorder: &FlightRecorder) {
        let max = self.max_count();
        let latest = recorder.latest();
        for concept in &latest.accept {
            self.label(concept, max, self.factor_accept, max);
        }
        for concept in &latest.reject {
            self.label(concept, 0.0, self.factor_reject, max);
        }
    }

    fn weights(&self) -> Vec<(String, f64)> {
        let max = self.max_count();
        if max <= 0.0 {
            return Vec::new();
        }
        self.edges
            .iter()
            .map(|((u, v), w)| (format!("{u} {v}"), w / max))
            .collect()
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "type": "NgramFeedbackGraph",
            "N": 2,
            "multiplier_accept": self.factor_accept,
            "multiplier_reject": self.factor_reject,
        })
    }
}
