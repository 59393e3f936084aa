//! Concept to sentence lookup
//!
//! Built once from the corpus and read-only afterwards.

use crate::types::{Corpus, SentenceId};
use rustc_hash::FxHashMap;

/// Maps each concept to the sentences that mention it.
#[derive(Debug, Clone, Default)]
pub struct ConceptIndex {
    concept_to_sentences: FxHashMap<String, Vec<SentenceId>>,
}

impl ConceptIndex {
    /// Build the index from a corpus
    pub fn build(corpus: &Corpus) -> Self {
        let mut concept_to_sentences: FxHashMap<String, Vec<SentenceId>> = FxHashMap::default();
        for sentence in corpus.iter() {
            let id = sentence.id();
            for concept in &sentence.concepts {
                let ids = concept_to_sentences.entry(concept.clone()).or_default();
                // Sentences are visited once each, so a repeat can only be the
                // same sentence mentioning the concept again.
                if ids.last() != Some(&id) {
                    ids.push(id);
                }
            }
        }
        for ids in concept_to_sentences.values_mut() {
            ids.sort_unstable();
        }
        Self {
            concept_to_sentences,
        }
    }

    /// Sentences mentioning the concept, in id order; empty when unknown
    pub fn sentences_with(&self, concept: &str) -> &[SentenceId] {
        self.concept_to_sentences
            .get(concept)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct concepts in the corpus
    pub fn concept_count(&self) -> usize {
        self.concept_to_sentences.len()
    }

    /// Check whether any sentence mentions the concept
    pub fn contains(&self, concept: &str) -> bool {
        self.concept_to_sentences.contains_key(concept)
    }
}
