//! Selection policies that build the candidate list themselves

use super::{PoolPolicy, SelectionContext};
use crate::config::StrategyKind;
use crate::types::SentenceId;
use rustc_hash::FxHashSet;

/// Diversity-filtered walk over the ranking.
///
/// Sentences are taken in rank order unless they repeat too many concepts
/// already covered by earlier picks. A sentence is skipped once more than
/// `threshold + 1` of its distinct concepts are already covered. The walk
/// stops after `k` picks or at the end of the ranking.
#[derive(Debug, Clone, Copy)]
pub struct RedundancySweep {
    threshold: usize,
}

impl RedundancySweep {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl PoolPolicy for RedundancySweep {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RedundancySweep
    }

    fn select(&mut self, ctx: &SelectionContext<'_>) -> Vec<SentenceId> {
        let allowed = self.threshold.saturating_add(1);
        let mut picked = Vec::with_capacity(ctx.k);
        let mut covered: FxHashSet<&str> = FxHashSet::default();

        for (id, _) in ctx.index.iter() {
            if picked.len() >= ctx.k {
                break;
            }
            let Some(sentence) = ctx.corpus.get(id) else {
                continue;
            };
            let overlap = sentence
                .distinct_concepts()
                .into_iter()
                .filter(|c| covered.contains(c))
                .count();
            if overlap > allowed {
                continue;
            }
            covered.extend(sentence.concepts.iter().map(String::as_str));
            picked.push(id);
        }
        picked
    }
}

/// Top-k plus every lower-ranked sentence holding an important concept
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveLink;

impl PoolPolicy for PositiveLink {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PositiveLink
    }

    fn select(&mut self, ctx: &SelectionContext<'_>) -> Vec<SentenceId> {
        let mut picked = ctx.index.top_k(ctx.k);
        if ctx.important_concepts.is_empty() {
            return picked;
        }
        picked.extend(ctx.index.ids_from(ctx.k).filter(|id| ctx.is_important(*id)));
        picked
    }
}
