//! Sampling strategies
//!
//! Instead of walking the ranking, the sampling strategies draw the pool at
//! random: uniformly ([`RandomSampler`]) or proportionally per topic cluster
//! ([`StratifiedSampler`]). Both reseed from `(seed, round)` for every pool
//! they draw, so a run is reproducible from its seed alone.

pub mod stratified;

pub use stratified::StratifiedSampler;

use crate::config::StrategyKind;
use crate::strategy::{PoolPolicy, SelectionContext};
use crate::types::{ConceptWeights, Corpus, Sentence, SentenceId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A sampler that picks pool sentences and follows weight and label changes.
pub trait ClusterSampler {
    /// Draw up to `k` sentences for the given pool round, sorted by id
    fn sentences(&mut self, k: usize, round: usize) -> Vec<SentenceId>;

    /// Refresh internal weights after the authoritative table changed
    fn update_weights(&mut self, corpus: &Corpus, weights: &ConceptWeights);

    /// Fold the latest labels into the cluster structure
    fn update_clusters(&mut self, accepts: &[String], rejects: &[String]);
}

/// Deterministic RNG for one pool round
pub(crate) fn round_rng(seed: u64, round: usize) -> StdRng {
    let mixed = seed ^ (round as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed)
}

/// Uniform random sample of the corpus
#[derive(Debug, Clone)]
pub struct RandomSampler {
    ids: Vec<SentenceId>,
    seed: u64,
}

impl RandomSampler {
    pub fn new(corpus: &Corpus, seed: u64) -> Self {
        let mut ids: Vec<SentenceId> = corpus.iter().map(Sentence::id).collect();
        ids.sort_unstable();
        Self { ids, seed }
    }
}

impl ClusterSampler for RandomSampler {
    fn sentences(&mut self, k: usize, round: usize) -> Vec<SentenceId> {
        let mut rng = round_rng(self.seed, round);
        let mut picked: Vec<SentenceId> = self.ids.choose_multiple(&mut rng, k).copied().collect();
        picked.sort_unstable();
        picked
    }

    fn update_weights(&mut self, _corpus: &Corpus, _weights: &ConceptWeights) {}

    fn update_clusters(&mut self, _accepts: &[String], _rejects: &[String]) {}
}

/// Adapts a [`ClusterSampler`] to the pool policy interface
#[derive(Debug, Clone)]
pub struct SamplingPolicy<S> {
    kind: StrategyKind,
    sampler: S,
}

impl<S: ClusterSampler> SamplingPolicy<S> {
    pub fn new(kind: StrategyKind, sampler: S) -> Self {
        Self { kind, sampler }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }
}

impl<S: ClusterSampler> PoolPolicy for SamplingPolicy<S> {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn select(&mut self, ctx: &SelectionContext<'_>) -> Vec<SentenceId> {
        self.sampler.sentences(ctx.k, ctx.round)
    }

    fn weights_changed(&mut self, corpus: &Corpus, weights: &ConceptWeights) {
        self.sampler.update_weights(corpus, weights);
    }

    fn feedback_received(&mut self, accepts: &[String], rejects: &[String]) {
        self.sampler.update_clusters(accepts, rejects);
    }
}
