//! Core types for feedback_summarizer
//!
//! This module defines the data model shared by ranking, selection, feedback
//! and the iteration controller: sentence identifiers, the read-only corpus,
//! the concept weight table, and ROUGE score triples.

use crate::errors::{Result, SummarizerError};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Sentence Identity
// ============================================================================

/// Identifies a sentence by its document and its position inside that document.
///
/// The derived ordering (document first, then position) is the tie-breaker
/// used wherever sentences share an identical ranking metric.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SentenceId {
    /// Document index within the topic
    pub doc_id: usize,
    /// Sentence position within the document
    pub position: usize,
}

impl SentenceId {
    /// Create a new SentenceId
    pub fn new(doc_id: usize, position: usize) -> Self {
        Self { doc_id, position }
    }
}

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.doc_id, self.position)
    }
}

// ============================================================================
// Sentence
// ============================================================================

/// A sentence from the input documents, annotated with its concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Document index within the topic
    pub doc_id: usize,
    /// Sentence position within the document
    pub position: usize,
    /// Length in words
    pub length: usize,
    /// Concepts in order of occurrence (duplicates allowed)
    pub concepts: Vec<String>,
    /// Display text
    pub untokenized_form: String,
}

impl Sentence {
    /// Create a new sentence
    pub fn new(
        doc_id: usize,
        position: usize,
        length: usize,
        concepts: impl IntoIterator<Item = impl Into<String>>,
        untokenized_form: impl Into<String>,
    ) -> Self {
        Self {
            doc_id,
            position,
            length,
            concepts: concepts.into_iter().map(Into::into).collect(),
            untokenized_form: untokenized_form.into(),
        }
    }

    /// The sentence identifier `(doc_id, position)`
    pub fn id(&self) -> SentenceId {
        SentenceId::new(self.doc_id, self.position)
    }

    /// Distinct concepts of this sentence
    pub fn distinct_concepts(&self) -> FxHashSet<&str> {
        self.concepts.iter().map(String::as_str).collect()
    }

    /// Check whether the sentence mentions the concept at least once
    pub fn contains_concept(&self, concept: &str) -> bool {
        self.concepts.iter().any(|c| c == concept)
    }
}

// ============================================================================
// Corpus
// ============================================================================

/// The read-only sentence collection for one topic.
///
/// Sentences are never added or removed during a run; the candidate pool is a
/// view over this collection.
#[derive(Debug, Clone)]
pub struct Corpus {
    sentences: Vec<Sentence>,
    by_id: FxHashMap<SentenceId, usize>,
}

impl Corpus {
    /// Build a corpus, rejecting empty input, zero-length sentences and
    /// duplicate sentence identifiers.
    pub fn new(sentences: Vec<Sentence>) -> Result<Self> {
        if sentences.is_empty() {
            return Err(SummarizerError::empty_corpus("corpus contains no sentences"));
        }

        let mut by_id = FxHashMap::with_capacity_and_hasher(sentences.len(), Default::default());
        for (idx, sentence) in sentences.iter().enumerate() {
            if sentence.length == 0 {
                return Err(SummarizerError::empty_corpus(format!(
                    "sentence {} has length 0",
                    sentence.id()
                )));
            }
            if by_id.insert(sentence.id(), idx).is_some() {
                return Err(SummarizerError::invalid_config(format!(
                    "duplicate sentence id {}",
                    sentence.id()
                )));
            }
        }

        Ok(Self { sentences, by_id })
    }

    /// Number of sentences
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Always false for a constructed corpus; kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Look up a sentence by id
    pub fn get(&self, id: SentenceId) -> Option<&Sentence> {
        self.by_id.get(&id).map(|&idx| &self.sentences[idx])
    }

    /// All sentences in load order
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Iterate sentences in load order
    pub fn iter(&self) -> impl Iterator<Item = &Sentence> {
        self.sentences.iter()
    }

    /// Number of distinct documents (the largest possible document frequency)
    pub fn document_count(&self) -> usize {
        self.sentences
            .iter()
            .map(|s| s.doc_id)
            .collect::<FxHashSet<_>>()
            .len()
    }

    /// Resolve ids to sentences, silently dropping unknown ids
    pub fn resolve<'a>(&'a self, ids: &'a [SentenceId]) -> impl Iterator<Item = &'a Sentence> + 'a {
        ids.iter().filter_map(move |id| self.get(*id))
    }
}

// ============================================================================
// Concept Weights
// ============================================================================

/// Mapping from concept to its non-negative weight.
///
/// A concept absent from the table reads as weight `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptWeights {
    weights: FxHashMap<String, f64>,
}

impl ConceptWeights {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Document frequency weights: number of distinct documents mentioning each concept
    pub fn document_frequency(corpus: &Corpus) -> Self {
        let mut docs: FxHashMap<&str, FxHashSet<usize>> = FxHashMap::default();
        for sentence in corpus.iter() {
            for concept in &sentence.concepts {
                docs.entry(concept.as_str()).or_default().insert(sentence.doc_id);
            }
        }
        docs.into_iter()
            .map(|(concept, ids)| (concept.to_string(), ids.len() as f64))
            .collect()
    }

    /// Weight of a concept, `0.0` when unknown
    #[inline]
    pub fn get(&self, concept: &str) -> f64 {
        self.weights.get(concept).copied().unwrap_or(0.0)
    }

    /// Weight of a concept, `None` when unknown
    pub fn try_get(&self, concept: &str) -> Option<f64> {
        self.weights.get(concept).copied()
    }

    /// Set the weight of a concept, returning the previous value
    pub fn set(&mut self, concept: impl Into<String>, weight: f64) -> Option<f64> {
        self.weights.insert(concept.into(), weight)
    }

    /// Check whether the concept is known
    pub fn contains(&self, concept: &str) -> bool {
        self.weights.contains_key(concept)
    }

    /// Number of known concepts
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterate `(concept, weight)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate concept names in arbitrary order
    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Concept density of a sentence: summed concept weight over its length.
    ///
    /// Duplicated concepts count once per occurrence.
    pub fn density(&self, sentence: &Sentence) -> f64 {
        let total: f64 = sentence.concepts.iter().map(|c| self.get(c)).sum();
        total / sentence.length as f64
    }

    /// Build the optimizer-scoped table: every concept of the given sentences,
    /// plus the explicitly listed concepts so labeled concepts stay visible.
    pub fn restrict_to<'a>(
        &self,
        sentences: impl IntoIterator<Item = &'a Sentence>,
        keep: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut scoped = ConceptWeights::new();
        for sentence in sentences {
            for concept in &sentence.concepts {
                if !scoped.contains(concept) {
                    scoped.set(concept.clone(), self.get(concept));
                }
            }
        }
        for concept in keep {
            if !scoped.contains(concept) {
                scoped.set(concept, self.get(concept));
            }
        }
        scoped
    }

    /// Sorted copy for deterministic serialization
    pub fn to_sorted(&self) -> BTreeMap<String, f64> {
        self.weights.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

impl FromIterator<(String, f64)> for ConceptWeights {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, f64>> for ConceptWeights {
    fn from(map: BTreeMap<String, f64>) -> Self {
        map.into_iter().collect()
    }
}

// ============================================================================
// Scores
// ============================================================================

/// ROUGE recall triple for one candidate summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RougeScores {
    pub rouge_1: f64,
    pub rouge_2: f64,
    pub rouge_su4: f64,
}

impl RougeScores {
    /// Create a new score triple
    pub fn new(rouge_1: f64, rouge_2: f64, rouge_su4: f64) -> Self {
        Self {
            rouge_1,
            rouge_2,
            rouge_su4,
        }
    }
}

/// The precomputed best-achievable summary for a topic, used as a
/// convergence ceiling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpperBound {
    /// Scores of the upper-bound summary
    pub scores: RougeScores,
    /// Sentences of the upper-bound summary, in summary order
    pub summary: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(doc: usize, pos: usize, len: usize, concepts: &[&str]) -> Sentence {
        Sentence::new(doc, pos, len, concepts.iter().copied(), format!("s{doc}-{pos}"))
    }

    #[test]
    fn test_sentence_id_ordering() {
        let a = SentenceId::new(0, 5);
        let b = SentenceId::new(1, 0);
        let c = SentenceId::new(1, 2);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "(0, 5)");
    }

    #[test]
    fn test_corpus_rejects_zero_length() {
        let err = Corpus::new(vec![sentence(0, 0, 0, &["a"])]).unwrap_err();
        assert!(matches!(err, SummarizerError::EmptyCorpus { .. }));
    }

    #[test]
    fn test_corpus_rejects_empty_and_duplicates() {
        assert!(Corpus::new(Vec::new()).is_err());
        let err = Corpus::new(vec![sentence(0, 0, 3, &["a"]), sentence(0, 0, 4, &["b"])])
            .unwrap_err();
        assert!(matches!(err, SummarizerError::InvalidConfig { .. }));
    }

    #[test]
    fn test_corpus_lookup_and_documents() {
        let corpus = Corpus::new(vec![
            sentence(0, 0, 3, &["a"]),
            sentence(0, 1, 3, &["b"]),
            sentence(2, 0, 3, &["c"]),
        ])
        .unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.document_count(), 2);
        assert_eq!(corpus.get(SentenceId::new(2, 0)).unwrap().concepts, vec!["c"]);
        assert!(corpus.get(SentenceId::new(5, 5)).is_none());
    }

    #[test]
    fn test_document_frequency() {
        let corpus = Corpus::new(vec![
            sentence(0, 0, 3, &["a", "b"]),
            sentence(0, 1, 3, &["a"]),
            sentence(1, 0, 3, &["a", "c"]),
        ])
        .unwrap();
        let weights = ConceptWeights::document_frequency(&corpus);
        assert_eq!(weights.get("a"), 2.0);
        assert_eq!(weights.get("b"), 1.0);
        assert_eq!(weights.get("c"), 1.0);
        assert_eq!(weights.get("missing"), 0.0);
    }

    #[test]
    fn test_density_counts_duplicates() {
        let mut weights = ConceptWeights::new();
        weights.set("a", 3.0);
        weights.set("b", 1.0);
        let s = sentence(0, 0, 4, &["a", "a", "b", "zzz"]);
        assert!((weights.density(&s) - 7.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_restrict_to_keeps_labeled_concepts() {
        let mut weights = ConceptWeights::new();
        weights.set("a", 1.0);
        weights.set("b", 2.0);
        weights.set("c", 3.0);
        let s = sentence(0, 0, 2, &["a"]);
        let scoped = weights.restrict_to([&s], ["c"]);
        assert_eq!(scoped.len(), 2);
        assert_eq!(scoped.get("a"), 1.0);
        assert_eq!(scoped.get("c"), 3.0);
        assert!(!scoped.contains("b"));
    }

    #[test]
    fn test_weights_serde_roundtrip_sorted() {
        let mut weights = ConceptWeights::new();
        weights.set("b", 2.0);
        weights.set("a", 1.0);
        let json = serde_json::to_string(&weights.to_sorted()).unwrap();
        assert_eq!(json, r#"{"a":1.0,"b":2.0}"#);
        let back: BTreeMap<String, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(ConceptWeights::from(back), weights);
    }
}
