//! Pool size policies
//!
//! These policies only decide `k`; the pool is the top `k` of the ranking.

use super::{PoolPolicy, SelectionContext};
use crate::config::{StrategyKind, TimeBudget};
use crate::ranking::RankedSentenceIndex;
use crate::types::{ConceptWeights, Corpus};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

// ============================================================================
// Shared scans
// ============================================================================

/// Smallest prefix of the ranking whose sentences cover at least
/// `min_distinct` distinct concepts.
///
/// Returns the corpus size when even the whole corpus falls short. The scan
/// is a single pass over the ranking.
pub fn coverage_floor_k(index: &RankedSentenceIndex, corpus: &Corpus, min_distinct: usize) -> usize {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for (k, (id, _)) in index.iter().enumerate() {
        if let Some(sentence) = corpus.get(id) {
            seen.extend(sentence.concepts.iter().map(String::as_str));
        }
        if seen.len() >= min_distinct {
            return k + 1;
        }
    }
    index.len()
}

/// Prefix length of the ranking that maximizes the weighted concept entropy.
///
/// For a prefix with `S` concept occurrences and per-concept counts `n_c`,
/// the entropy is `-sum(w_c * (n_c/S) * log_b(n_c/S))` where `b` is the
/// number of distinct concepts in the corpus. The first maximum wins.
///
/// The sums are maintained incrementally:
/// `H = -(sum(w n ln n) - ln S * sum(w n)) / (S ln b)`.
pub fn entropy_k(index: &RankedSentenceIndex, corpus: &Corpus, weights: &ConceptWeights) -> usize {
    let base = index.concept_index().concept_count();
    if base < 2 || index.is_empty() {
        return index.len().min(1);
    }
    let ln_base = (base as f64).ln();

    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut occurrences = 0usize;
    let mut weighted_n_ln_n = 0.0f64;
    let mut weighted_n = 0.0f64;

    let mut best_k = 1;
    let mut best_entropy = f64::NEG_INFINITY;

    for (k, (id, _)) in index.iter().enumerate() {
        if let Some(sentence) = corpus.get(id) {
            for concept in &sentence.concepts {
                let w = weights.get(concept);
                let n = counts.entry(concept.as_str()).or_insert(0);
                let before = *n as f64;
                *n += 1;
                let after = *n as f64;
                weighted_n_ln_n += w * (after * after.ln() - n_ln_n(before));
                weighted_n += w;
                occurrences += 1;
            }
        }

        let entropy = if occurrences == 0 {
            0.0
        } else {
            let s = occurrences as f64;
            -(weighted_n_ln_n - s.ln() * weighted_n) / (s * ln_base)
        };
        if entropy > best_entropy {
            best_entropy = entropy;
            best_k = k + 1;
        }
    }
    best_k
}

#[inline]
fn n_ln_n(n: f64) -> f64 {
    if n > 0.0 {
        n * n.ln()
    } else {
        0.0
    }
}

/// ILP constraint count of the top-`k` pool: one constraint per
/// distinct-concept occurrence, one per distinct concept, plus the length
/// budget.
pub fn constraint_size_for(index: &RankedSentenceIndex, corpus: &Corpus, k: usize) -> usize {
    let mut occurrences = 0;
    let mut concepts: FxHashSet<&str> = FxHashSet::default();
    for id in index.top_k(k) {
        if let Some(sentence) = corpus.get(id) {
            let distinct = sentence.distinct_concepts();
            occurrences += distinct.len();
            concepts.extend(distinct);
        }
    }
    occurrences + concepts.len() + 1
}

// ============================================================================
// Policies
// ============================================================================

/// Constant pool size
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSize;

impl PoolPolicy for FixedSize {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fixed
    }
}

/// Entropy-maximizing pool size.
///
/// The static variant fixes `k` once at initialization; the adaptive variant
/// re-derives it whenever the pool size is dynamic.
#[derive(Debug, Clone, Copy)]
pub struct EntropyPolicy {
    adaptive: bool,
}

impl EntropyPolicy {
    pub fn at_init() -> Self {
        Self { adaptive: false }
    }

    pub fn adaptive() -> Self {
        Self { adaptive: true }
    }
}

impl PoolPolicy for EntropyPolicy {
    fn kind(&self) -> StrategyKind {
        if self.adaptive {
            StrategyKind::EntropyAdapt
        } else {
            StrategyKind::EntropyInit
        }
    }

    fn initial_k(&mut self, ctx: &SelectionContext<'_>) -> Option<usize> {
        if self.adaptive {
            return None;
        }
        let k = entropy_k(ctx.index, ctx.corpus, ctx.weights);
        debug!(k, "entropy-maximizing pool size fixed");
        Some(k)
    }

    fn determine_k(&mut self, ctx: &SelectionContext<'_>) -> usize {
        if self.adaptive {
            entropy_k(ctx.index, ctx.corpus, ctx.weights)
        } else {
            ctx.k
        }
    }
}

/// Contiguous prefix of sentences holding an important concept, inflated by
/// `1 + window`.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveWindow {
    window: f64,
}

impl AdaptiveWindow {
    pub fn new(window: f64) -> Self {
        Self {
            window: window.max(0.0),
        }
    }

    /// Length of the leading run of ranked sentences that mention an important concept
    pub fn important_prefix(ctx: &SelectionContext<'_>) -> usize {
        ctx.index
            .iter()
            .take_while(|(id, _)| ctx.is_important(*id))
            .count()
    }
}

impl PoolPolicy for AdaptiveWindow {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdaptiveWindow
    }

    fn determine_k(&mut self, ctx: &SelectionContext<'_>) -> usize {
        let prefix = Self::important_prefix(ctx);
        (prefix as f64 * (1.0 + self.window)) as usize
    }
}

/// Pool size derived from a solve-time budget.
///
/// Walks the ranking until the pool's constraint count reaches the budget's
/// target and the pool covers at least half a summary of distinct concepts.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudgetPolicy {
    budget: TimeBudget,
}

impl TimeBudgetPolicy {
    pub fn new(budget: TimeBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> TimeBudget {
        self.budget
    }
}

impl PoolPolicy for TimeBudgetPolicy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TimeBased
    }

    fn determine_k(&mut self, ctx: &SelectionContext<'_>) -> usize {
        let target = self.budget.target_constraints();
        let half_summary = ctx.summary_length as f64 / 2.0;

        let mut occurrences = 0;
        let mut concepts: FxHashSet<&str> = FxHashSet::default();
        let mut k = 0;
        for (id, _) in ctx.index.iter() {
            let below_target = occurrences + concepts.len() + 1 < target;
            let thin = (concepts.len() as f64) < half_summary;
            if !below_target && !thin {
                break;
            }
            if let Some(sentence) = ctx.corpus.get(id) {
                let distinct = sentence.distinct_concepts();
                occurrences += distinct.len();
                concepts.extend(distinct);
            }
            k += 1;
        }
        debug!(k, target, "time budget pool size");
        k
    }
}
