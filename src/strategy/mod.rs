//! Candidate pool selection
//!
//! A [`PoolPolicy`] decides, each iteration, how many sentences the optimizer
//! sees and which ones. Size policies ([`FixedSize`], [`EntropyPolicy`],
//! [`AdaptiveWindow`], [`TimeBudgetPolicy`]) only resolve `k` and take the
//! top of the ranking. Selection policies ([`RedundancySweep`],
//! [`PositiveLink`]) build the candidate list themselves. Sampling policies
//! live in [`crate::sampling`].
//!
//! Whatever the policy returns, [`CandidatePool::assemble`] enforces the
//! coverage floor before the pool reaches the optimizer.

pub mod pool;
pub mod selection;
pub mod size;

pub use pool::CandidatePool;
pub use selection::{PositiveLink, RedundancySweep};
pub use size::{
    constraint_size_for, coverage_floor_k, entropy_k, AdaptiveWindow, EntropyPolicy, FixedSize,
    TimeBudgetPolicy,
};

use crate::config::{RunConfig, StrategyKind};
use crate::ranking::RankedSentenceIndex;
use crate::sampling::{RandomSampler, SamplingPolicy, StratifiedSampler};
use crate::types::{ConceptWeights, Corpus, SentenceId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Read-only view of the run state handed to a policy.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub corpus: &'a Corpus,
    pub index: &'a RankedSentenceIndex,
    /// Authoritative weight table
    pub weights: &'a ConceptWeights,
    /// Every concept accepted so far and not later rejected
    pub important_concepts: &'a FxHashSet<String>,
    /// Target summary length in words
    pub summary_length: usize,
    /// Current pool size
    pub k: usize,
    /// Pools drawn so far, this one included. The initial pool is round 1,
    /// the pool of iteration `i` is round `i + 2`.
    pub round: usize,
}

impl<'a> SelectionContext<'a> {
    /// Smallest number of distinct concepts an exposed pool should carry
    pub fn coverage_target(&self) -> usize {
        self.summary_length.saturating_mul(2)
    }

    /// Check whether a sentence mentions at least one important concept
    pub fn is_important(&self, id: SentenceId) -> bool {
        self.corpus.get(id).is_some_and(|sentence| {
            sentence
                .concepts
                .iter()
                .any(|c| self.important_concepts.contains(c))
        })
    }
}

/// One candidate selection strategy.
///
/// The controller calls `determine_k` only when the pool size is dynamic,
/// and `select` every iteration. The notification hooks let stateful
/// policies (the samplers) follow weight and feedback changes.
pub trait PoolPolicy {
    /// Strategy implemented by this policy
    fn kind(&self) -> StrategyKind;

    /// Pool size to fix at initialization, if the policy derives one
    fn initial_k(&mut self, _ctx: &SelectionContext<'_>) -> Option<usize> {
        None
    }

    /// Re-derive the pool size for the current state
    fn determine_k(&mut self, ctx: &SelectionContext<'_>) -> usize {
        ctx.k
    }

    /// Candidate sentences for the current iteration
    fn select(&mut self, ctx: &SelectionContext<'_>) -> Vec<SentenceId> {
        ctx.index.top_k(ctx.k)
    }

    /// Called after the authoritative weights changed
    fn weights_changed(&mut self, _corpus: &Corpus, _weights: &ConceptWeights) {}

    /// Called with the labels of the latest iteration
    fn feedback_received(&mut self, _accepts: &[String], _rejects: &[String]) {}
}

/// Build the policy configured in `config`.
///
/// `clusters` assigns sentences to clusters for the stratified sampler;
/// sentences without an assignment are clustered by document.
pub fn build_policy(
    config: &RunConfig,
    corpus: &Corpus,
    weights: &ConceptWeights,
    clusters: Option<&FxHashMap<SentenceId, usize>>,
) -> Box<dyn PoolPolicy> {
    match config.strategy {
        StrategyKind::Fixed => Box::new(FixedSize),
        StrategyKind::EntropyInit => Box::new(EntropyPolicy::at_init()),
        StrategyKind::EntropyAdapt => Box::new(EntropyPolicy::adaptive()),
        StrategyKind::AdaptiveWindow => Box::new(AdaptiveWindow::new(config.adaptive_window_size)),
        StrategyKind::RedundancySweep => Box::new(RedundancySweep::new(config.sweep_threshold)),
        StrategyKind::PositiveLink => Box::new(PositiveLink),
        StrategyKind::TimeBased => Box::new(TimeBudgetPolicy::new(config.time_budget)),
        StrategyKind::Random => Box::new(SamplingPolicy::new(
            StrategyKind::Random,
            RandomSampler::new(corpus, config.sampling.seed),
        )),
        StrategyKind::Stratified => Box::new(SamplingPolicy::new(
            StrategyKind::Stratified,
            StratifiedSampler::new(corpus, weights, clusters, config.sampling),
        )),
    }
}
