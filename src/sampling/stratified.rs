//! Cluster-stratified sampling
//!
//! Sentences are partitioned into topic clusters. Each iteration every
//! cluster receives a share of the pool proportional to its weight (the sum
//! of its members' concept densities, boosted for clusters that hold
//! accepted concepts), and its share is drawn uniformly from its members.

use super::{round_rng, ClusterSampler};
use crate::config::SamplingConfig;
use crate::types::{ConceptWeights, Corpus, SentenceId};
use rand::seq::SliceRandom;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Cluster {
    members: Vec<SentenceId>,
    concepts: FxHashSet<String>,
    density: f64,
    boost: f64,
}

impl Cluster {
    fn weight(&self) -> f64 {
        self.density * self.boost
    }
}

/// Proportional per-cluster sampler
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    clusters: Vec<Cluster>,
    seed: u64,
    adaptive: bool,
}

impl StratifiedSampler {
    /// Partition the corpus by the given cluster labels.
    ///
    /// Without labels, each document forms a cluster. With labels, sentences
    /// missing from the map share one extra cluster.
    pub fn new(
        corpus: &Corpus,
        weights: &ConceptWeights,
        labels: Option<&FxHashMap<SentenceId, usize>>,
        config: SamplingConfig,
    ) -> Self {
        let mut grouped: BTreeMap<usize, Vec<SentenceId>> = BTreeMap::new();
        let mut unassigned = Vec::new();
        for sentence in corpus.iter() {
            let id = sentence.id();
            match labels {
                Some(map) => match map.get(&id) {
                    Some(&label) => grouped.entry(label).or_default().push(id),
                    None => unassigned.push(id),
                },
                None => grouped.entry(sentence.doc_id).or_default().push(id),
            }
        }

        let mut clusters: Vec<Cluster> = grouped
            .into_values()
            .chain((!unassigned.is_empty()).then_some(unassigned))
            .map(|mut members| {
                members.sort_unstable();
                let concepts = corpus
                    .resolve(&members)
                    .flat_map(|s| s.concepts.iter().cloned())
                    .collect();
                Cluster {
                    members,
                    concepts,
                    density: 0.0,
                    boost: 1.0,
                }
            })
            .collect();

        for cluster in &mut clusters {
            cluster.density = member_density(corpus, weights, &cluster.members);
        }

        Self {
            clusters,
            seed: config.seed,
            adaptive: config.adaptive,
        }
    }

    /// Number of clusters
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Current cluster weights, in cluster order
    pub fn cluster_weights(&self) -> Vec<f64> {
        self.clusters.iter().map(Cluster::weight).collect()
    }

    /// Per-cluster sample sizes for a pool of `k` sentences.
    ///
    /// Largest-remainder apportionment over the cluster weights, capped at
    /// each cluster's size; capacity left over by a full cluster moves to
    /// the heaviest clusters with room.
    pub fn quotas(&self, k: usize) -> Vec<usize> {
        let capacity: usize = self.clusters.iter().map(|c| c.members.len()).sum();
        let k = k.min(capacity);
        if k == 0 || self.clusters.is_empty() {
            return vec![0; self.clusters.len()];
        }

        let mut shares: Vec<f64> = self.cluster_weights();
        let total: f64 = shares.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            shares = self.clusters.iter().map(|c| c.members.len() as f64).collect();
        }
        let total: f64 = shares.iter().sum();

        let exact: Vec<f64> = shares.iter().map(|s| k as f64 * s / total).collect();
        let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
        let mut remaining = k.saturating_sub(quotas.iter().sum());

        let mut by_remainder: Vec<usize> = (0..quotas.len()).collect();
        by_remainder.sort_by(|&a, &b| {
            let ra = exact[a] - exact[a].floor();
            let rb = exact[b] - exact[b].floor();
            rb.total_cmp(&ra).then(a.cmp(&b))
        });
        for &i in by_remainder.iter().cycle().take(remaining) {
            quotas[i] += 1;
        }
        remaining = 0;

        for (quota, cluster) in quotas.iter_mut().zip(&self.clusters) {
            if *quota > cluster.members.len() {
                remaining += *quota - cluster.members.len();
                *quota = cluster.members.len();
            }
        }

        let mut by_share: Vec<usize> = (0..quotas.len()).collect();
        by_share.sort_by(|&a, &b| shares[b].total_cmp(&shares[a]).then(a.cmp(&b)));
        while remaining > 0 {
            let mut moved = false;
            for &i in &by_share {
                if remaining == 0 {
                    break;
                }
                if quotas[i] < self.clusters[i].members.len() {
                    quotas[i] += 1;
                    remaining -= 1;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
        quotas
    }
}

fn member_density(corpus: &Corpus, weights: &ConceptWeights, members: &[SentenceId]) -> f64 {
    corpus.resolve(members).map(|s| weights.density(s)).sum()
}

impl ClusterSampler for StratifiedSampler {
    fn sentences(&mut self, k: usize, round: usize) -> Vec<SentenceId> {
        let mut rng = round_rng(self.seed, round);
        let quotas = self.quotas(k);
        let mut picked: Vec<SentenceId> = self
            .clusters
            .iter()
            .zip(quotas)
            .flat_map(|(cluster, quota)| {
                cluster
                    .members
                    .choose_multiple(&mut rng, quota)
                    .copied()
                    .collect::<Vec<_>>()
            })
            .collect();
        picked.sort_unstable();
        picked
    }

    fn update_weights(&mut self, corpus: &Corpus, weights: &ConceptWeights) {
        for cluster in &mut self.clusters {
            cluster.density = member_density(corpus, weights, &cluster.members);
        }
    }

    fn update_clusters(&mut self, accepts: &[String], _rejects: &[String]) {
        // Rejections already lower cluster density through the weight table.
        if !self.adaptive {
            return;
        }
        for cluster in &mut self.clusters {
            let hits = accepts.iter().filter(|c| cluster.concepts.contains(*c)).count();
            cluster.boost += hits as f64;
        }
    }
}
