//! Ranked sentence index
//!
//! An ordered view over all sentences keyed by concept density
//! (`sum(weight[c] for c in concepts) / length`), highest first. Point
//! updates and top-k retrieval are logarithmic in the corpus size.
//!
//! Ties are broken by ascending [`SentenceId`], so the ranking is total and
//! identical across runs.

use crate::ranking::concept_index::ConceptIndex;
use crate::types::{ConceptWeights, Corpus, SentenceId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Sort key: descending metric, then ascending sentence id.
#[derive(Debug, Clone, Copy)]
struct RankKey {
    metric: f64,
    id: SentenceId,
}

impl RankKey {
    fn new(metric: f64, id: SentenceId) -> Self {
        // Fold -0.0 into 0.0 so an empty sum never sorts below a zero sum.
        let metric = if metric == 0.0 { 0.0 } else { metric };
        Self { metric, id }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .metric
            .total_cmp(&self.metric)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// Sentences ordered by concept density.
///
/// The index never writes weights; it reads the table it is handed. Callers
/// mutate weights elsewhere and then call [`update_affected`] with the
/// changed concepts.
///
/// [`update_affected`]: RankedSentenceIndex::update_affected
#[derive(Debug, Clone)]
pub struct RankedSentenceIndex {
    order: BTreeSet<RankKey>,
    metrics: FxHashMap<SentenceId, f64>,
    concept_index: ConceptIndex,
}

impl RankedSentenceIndex {
    /// Rank every sentence of the corpus under the given weights.
    pub fn initialize(corpus: &Corpus, weights: &ConceptWeights) -> Self {
        let mut index = Self {
            order: BTreeSet::new(),
            metrics: FxHashMap::with_capacity_and_hasher(corpus.len(), Default::default()),
            concept_index: ConceptIndex::build(corpus),
        };
        for sentence in corpus.iter() {
            index.upsert(sentence.id(), weights.density(sentence));
        }
        index
    }

    fn upsert(&mut self, id: SentenceId, metric: f64) {
        let key = RankKey::new(metric, id);
        if let Some(previous) = self.metrics.insert(id, key.metric) {
            self.order.remove(&RankKey::new(previous, id));
        }
        self.order.insert(key);
    }

    /// Recompute the density of every sentence mentioning a changed concept.
    ///
    /// Densities are recomputed in full from `weights`, never incremented, so
    /// several changed concepts in one sentence are handled correctly.
    /// Returns the number of re-ranked sentences.
    pub fn update_affected<'a>(
        &mut self,
        corpus: &Corpus,
        weights: &ConceptWeights,
        changed_concepts: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let mut affected: FxHashSet<SentenceId> = FxHashSet::default();
        for concept in changed_concepts {
            affected.extend(self.concept_index.sentences_with(concept).iter().copied());
        }

        for &id in &affected {
            if let Some(sentence) = corpus.get(id) {
                self.upsert(id, weights.density(sentence));
            }
        }
        affected.len()
    }

    /// The `k` highest-ranked sentence ids, best first.
    ///
    /// Returns the whole corpus when `k` exceeds its size.
    pub fn top_k(&self, k: usize) -> Vec<SentenceId> {
        self.order.iter().take(k).map(|key| key.id).collect()
    }

    /// Iterate `(id, metric)` pairs in rank order
    pub fn iter(&self) -> impl Iterator<Item = (SentenceId, f64)> + '_ {
        self.order.iter().map(|key| (key.id, key.metric))
    }

    /// Iterate ids in rank order, starting at the given zero-based rank
    pub fn ids_from(&self, rank: usize) -> impl Iterator<Item = SentenceId> + '_ {
        self.order.iter().skip(rank).map(|key| key.id)
    }

    /// Zero-based rank of a sentence
    pub fn rank_of(&self, id: SentenceId) -> Option<usize> {
        let metric = *self.metrics.get(&id)?;
        Some(self.order.range(..RankKey::new(metric, id)).count())
    }

    /// Metric of the sentence at the given zero-based rank
    pub fn value_at_rank(&self, rank: usize) -> Option<f64> {
        self.order.iter().nth(rank).map(|key| key.metric)
    }

    /// Current metric of a sentence
    pub fn metric(&self, id: SentenceId) -> Option<f64> {
        self.metrics.get(&id).copied()
    }

    /// The concept lookup built at initialization
    pub fn concept_index(&self) -> &ConceptIndex {
        &self.concept_index
    }

    /// Number of ranked sentences
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
