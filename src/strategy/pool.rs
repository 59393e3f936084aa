//! The candidate pool handed to the optimizer

use super::SelectionContext;
use crate::types::{Corpus, Sentence, SentenceId};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Sentences exposed to the optimizer in one iteration.
///
/// Holds ids in selection order, without duplicates. A pool built through
/// [`CandidatePool::assemble`] covers at least `2 * summary_length` distinct
/// concepts unless the corpus itself falls short.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    ids: Vec<SentenceId>,
    distinct_concepts: usize,
    floor_met: bool,
    topped_up: usize,
}

impl CandidatePool {
    /// Deduplicate a policy's selection and top it up from the ranking until
    /// the coverage floor holds or the corpus is exhausted.
    pub fn assemble(selected: Vec<SentenceId>, ctx: &SelectionContext<'_>) -> Self {
        let target = ctx.coverage_target();
        let mut members: FxHashSet<SentenceId> = FxHashSet::default();
        let mut concepts: FxHashSet<&str> = FxHashSet::default();
        let mut ids = Vec::with_capacity(selected.len());

        for id in selected {
            let Some(sentence) = ctx.corpus.get(id) else {
                continue;
            };
            if members.insert(id) {
                concepts.extend(sentence.concepts.iter().map(String::as_str));
                ids.push(id);
            }
        }

        let mut topped_up = 0;
        if concepts.len() < target {
            for (id, _) in ctx.index.iter() {
                if concepts.len() >= target {
                    break;
                }
                if members.contains(&id) {
                    continue;
                }
                if let Some(sentence) = ctx.corpus.get(id) {
                    concepts.extend(sentence.concepts.iter().map(String::as_str));
                    members.insert(id);
                    ids.push(id);
                    topped_up += 1;
                }
            }
        }

        let floor_met = concepts.len() >= target;
        if topped_up > 0 || !floor_met {
            debug!(
                topped_up,
                distinct = concepts.len(),
                target,
                floor_met,
                "coverage floor applied"
            );
        }

        Self {
            distinct_concepts: concepts.len(),
            ids,
            floor_met,
            topped_up,
        }
    }

    /// The whole corpus, in load order
    pub fn full(corpus: &Corpus) -> Self {
        let distinct: FxHashSet<&str> = corpus
            .iter()
            .flat_map(|s| s.concepts.iter().map(String::as_str))
            .collect();
        Self {
            ids: corpus.iter().map(Sentence::id).collect(),
            distinct_concepts: distinct.len(),
            floor_met: true,
            topped_up: 0,
        }
    }

    pub fn ids(&self) -> &[SentenceId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: SentenceId) -> bool {
        self.ids.contains(&id)
    }

    /// Distinct concepts across the pool
    pub fn distinct_concepts(&self) -> usize {
        self.distinct_concepts
    }

    /// Whether the coverage floor holds
    pub fn floor_met(&self) -> bool {
        self.floor_met
    }

    /// Sentences added by the coverage floor
    pub fn topped_up(&self) -> usize {
        self.topped_up
    }

    /// Resolve the pool against the corpus
    pub fn sentences<'a>(&'a self, corpus: &'a Corpus) -> Vec<&'a Sentence> {
        corpus.resolve(&self.ids).collect()
    }
}
