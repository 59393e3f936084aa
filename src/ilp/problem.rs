//! Concept-coverage ILP formulations
//!
//! Both problems share one shape: choose sentences within a word budget;
//! a concept counts towards the objective iff some chosen sentence holds it.
//! They differ only in the concept coefficients.

use super::IlpSolution;
use crate::types::{ConceptWeights, Sentence, SentenceId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which formulation a problem encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// Maximize covered concept weight
    Summary,
    /// Favor unlabelled concepts, penalize labelled ones
    Recommendation,
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemKind::Summary => f.write_str("summary"),
            ProblemKind::Recommendation => f.write_str("recommendation"),
        }
    }
}

/// One concept indicator of the objective
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptTerm {
    pub concept: String,
    pub coefficient: f64,
    /// Whether the concept already carries an accept or reject label
    pub feedback: bool,
}

/// A budgeted concept-coverage problem over a fixed sentence list
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageProblem {
    pub kind: ProblemKind,
    /// Word budget
    pub budget: usize,
    /// Sentence ids, in problem order
    pub sentence_ids: Vec<SentenceId>,
    /// Sentence lengths in words
    pub lengths: Vec<usize>,
    /// Per sentence: indices into `terms`, distinct and sorted
    pub sentence_terms: Vec<Vec<usize>>,
    pub terms: Vec<ConceptTerm>,
}

impl CoverageProblem {
    fn build(
        kind: ProblemKind,
        sentences: &[&Sentence],
        budget: usize,
        coefficient: impl Fn(&str) -> (f64, bool),
    ) -> Self {
        let concepts: BTreeSet<&str> = sentences
            .iter()
            .flat_map(|s| s.concepts.iter().map(String::as_str))
            .collect();

        let mut position: FxHashMap<&str, usize> = FxHashMap::default();
        let mut terms = Vec::with_capacity(concepts.len());
        for (i, concept) in concepts.into_iter().enumerate() {
            let (coefficient, feedback) = coefficient(concept);
            position.insert(concept, i);
            terms.push(ConceptTerm {
                concept: concept.to_string(),
                coefficient,
                feedback,
            });
        }

        let sentence_terms = sentences
            .iter()
            .map(|s| {
                let mut idx: Vec<usize> = s
                    .concepts
                    .iter()
                    .filter_map(|c| position.get(c.as_str()).copied())
                    .collect();
                idx.sort_unstable();
                idx.dedup();
                idx
            })
            .collect();

        Self {
            kind,
            budget,
            sentence_ids: sentences.iter().map(|s| s.id()).collect(),
            lengths: sentences.iter().map(|s| s.length).collect(),
            sentence_terms,
            terms,
        }
    }

    /// The primary summary problem: coefficient = concept weight
    pub fn summary(sentences: &[&Sentence], weights: &ConceptWeights, budget: usize) -> Self {
        Self::build(ProblemKind::Summary, sentences, budget, |c| (weights.get(c), false))
    }

    /// The recommendation problem.
    ///
    /// Unlabelled concepts contribute `+w * u`, labelled ones `-w * u`,
    /// where `u` is the concept's uncertainty factor (1 without a model).
    pub fn recommendation(
        sentences: &[&Sentence],
        weights: &ConceptWeights,
        feedback: &FxHashSet<&str>,
        uncertainty: &dyn Fn(&str) -> f64,
        budget: usize,
    ) -> Self {
        Self::build(ProblemKind::Recommendation, sentences, budget, |c| {
            let value = weights.get(c) * uncertainty(c);
            if feedback.contains(c) {
                (-value, true)
            } else {
                (value, false)
            }
        })
    }

    pub fn sentence_count(&self) -> usize {
        self.lengths.len()
    }

    pub fn concept_count(&self) -> usize {
        self.terms.len()
    }

    /// Objective value of a selection (indices into the sentence list)
    pub fn evaluate(&self, selected: &[usize]) -> f64 {
        let covered: FxHashSet<usize> = selected
            .iter()
            .flat_map(|&s| self.sentence_terms[s].iter().copied())
            .collect();
        covered.iter().map(|&t| self.terms[t].coefficient).sum()
    }

    /// Total length of a selection
    pub fn length_of(&self, selected: &[usize]) -> usize {
        selected.iter().map(|&s| self.lengths[s]).sum()
    }

    /// Sentence ids of a solution, in problem order
    pub fn selected_ids(&self, solution: &IlpSolution) -> Vec<SentenceId> {
        solution
            .selected
            .iter()
            .map(|&s| self.sentence_ids[s])
            .collect()
    }

    /// Distinct concepts covered by a selection, sorted
    pub fn concepts_of(&self, selected: &[usize]) -> BTreeSet<String> {
        selected
            .iter()
            .flat_map(|&s| self.sentence_terms[s].iter())
            .map(|&t| self.terms[t].concept.clone())
            .collect()
    }
}
