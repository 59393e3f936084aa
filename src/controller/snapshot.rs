//! Checkpoint format
//!
//! A [`Snapshot`] carries everything needed to continue a run in another
//! process: labels, weights and pool state. Sampling RNGs are reseeded from
//! `(seed, iteration)`, so the seed inside the config suffices.

use super::{ControllerState, IterationRecord};
use crate::config::RunConfig;
use crate::errors::{Result, SummarizerError};
use crate::feedback::Record;
use crate::types::SentenceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub config: RunConfig,
    /// Name of the oracle that produced the records
    pub oracle: String,
    /// Index of the next iteration to run
    pub iteration: usize,
    pub records: Vec<Record>,
    /// Authoritative weights
    pub weights: BTreeMap<String, f64>,
    pub important_concepts: BTreeSet<String>,
    pub k: usize,
    pub k_history: Vec<usize>,
    pub recommendations: BTreeSet<String>,
    pub recommended_sentences: Vec<SentenceId>,
    pub seen_sentences: BTreeSet<SentenceId>,
    pub history: Vec<IterationRecord>,
    pub state: ControllerState,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check the format version
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SummarizerError::serialization(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }
}
