//! Run configuration
//!
//! [`RunConfig`] enumerates every recognised option of a simulation run.
//! It is plain serde data: load it from JSON, adjust it with the `with_*`
//! builder methods, and call [`RunConfig::validate`] before use (the
//! controller builder does this for you).

use crate::errors::{Result, SummarizerError};
use serde::{Deserialize, Serialize};

// ============================================================================
// Strategy
// ============================================================================

/// Candidate pool selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Constant pool size
    #[default]
    Fixed,
    /// Entropy-maximizing pool size, fixed at initialization
    #[serde(rename = "hw_init")]
    EntropyInit,
    /// Entropy-maximizing pool size, re-derived every iteration
    #[serde(rename = "hw_adapt")]
    EntropyAdapt,
    /// Contiguous prefix of sentences holding accepted concepts, inflated by a window
    AdaptiveWindow,
    /// Diversity-filtered walk over the ranking
    RedundancySweep,
    /// Top-k plus every lower-ranked sentence holding an accepted concept
    PositiveLink,
    /// Pool size derived from a solve-time budget
    TimeBased,
    /// Uniform random sample
    Random,
    /// Cluster-stratified sample
    Stratified,
}

impl StrategyKind {
    /// Canonical configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::EntropyInit => "hw_init",
            StrategyKind::EntropyAdapt => "hw_adapt",
            StrategyKind::AdaptiveWindow => "adaptive_window",
            StrategyKind::RedundancySweep => "redundancy_sweep",
            StrategyKind::PositiveLink => "positive_link",
            StrategyKind::TimeBased => "time_based",
            StrategyKind::Random => "random",
            StrategyKind::Stratified => "stratified",
        }
    }

    /// Whether this strategy samples instead of walking the ranking
    pub fn is_sampling(&self) -> bool {
        matches!(self, StrategyKind::Random | StrategyKind::Stratified)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = SummarizerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "fixed" | "top_k" | "none" => Ok(StrategyKind::Fixed),
            "hw_init" | "entropy_init" => Ok(StrategyKind::EntropyInit),
            "hw_adapt" | "entropy_adapt" => Ok(StrategyKind::EntropyAdapt),
            "adaptive_window" | "window" => Ok(StrategyKind::AdaptiveWindow),
            "redundancy_sweep" | "sweep" => Ok(StrategyKind::RedundancySweep),
            "positive_link" | "pos_link" => Ok(StrategyKind::PositiveLink),
            "time_based" | "time" => Ok(StrategyKind::TimeBased),
            "random" => Ok(StrategyKind::Random),
            "stratified" => Ok(StrategyKind::Stratified),
            _ => Err(SummarizerError::unknown_strategy(value)),
        }
    }
}

// ============================================================================
// Feedback interpretation
// ============================================================================

/// How oracle labels are interpreted into weight changes, and whether the
/// next round's recommendations come from the feedback-aware ILP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    AcceptAll,
    RejectAll,
    AcceptReject,
    #[default]
    IlpFeedback,
    ActiveLearning,
    KeepTrack,
    TopN,
}

impl FeedbackMode {
    /// Whether recommendations are drawn from the feedback-aware ILP
    pub fn uses_feedback_ilp(&self) -> bool {
        matches!(self, FeedbackMode::IlpFeedback | FeedbackMode::ActiveLearning)
    }
}

impl std::str::FromStr for FeedbackMode {
    type Err = SummarizerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "accept_all" => Ok(FeedbackMode::AcceptAll),
            "reject_all" => Ok(FeedbackMode::RejectAll),
            "accept_reject" => Ok(FeedbackMode::AcceptReject),
            "ilp_feedback" => Ok(FeedbackMode::IlpFeedback),
            "active_learning" => Ok(FeedbackMode::ActiveLearning),
            "keep_track" | "keeptrack" => Ok(FeedbackMode::KeepTrack),
            "top_n" => Ok(FeedbackMode::TopN),
            other => Err(SummarizerError::invalid_config(format!(
                "unknown feedback mode '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Strategy parameters
// ============================================================================

/// Solve-time cost model for the time-based strategy.
///
/// The number of ILP constraints solvable within `t` seconds is modelled as
/// `coefficient_a * sqrt(t) + coefficient_b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBudget {
    /// Target solve time per iteration, in seconds
    pub max_seconds: f64,
    pub coefficient_a: f64,
    pub coefficient_b: f64,
}

impl Default for TimeBudget {
    fn default() -> Self {
        Self {
            max_seconds: 1.0,
            coefficient_a: 4000.0,
            coefficient_b: 0.0,
        }
    }
}

impl TimeBudget {
    /// Target constraint count for the configured budget
    pub fn target_constraints(&self) -> usize {
        let target = self.coefficient_a * self.max_seconds.max(0.0).sqrt() + self.coefficient_b;
        if target.is_finite() && target > 0.0 {
            target as usize
        } else {
            0
        }
    }
}

/// Parameters of the sampling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Base seed; each iteration reseeds from `(seed, iteration)`
    pub seed: u64,
    /// Fold accepted concepts back into cluster weights every iteration
    pub adaptive: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            adaptive: true,
        }
    }
}

// ============================================================================
// RunConfig
// ============================================================================

/// Configuration of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target summary length in words
    pub summary_length: usize,
    /// Maximum number of feedback iterations
    pub max_iterations: usize,
    /// Restrict the optimizer to a ranked candidate pool
    pub rank_subset: bool,
    /// Pool size, absolute or relative (see `relative_k`)
    pub k: f64,
    /// Interpret `k` as a fraction of the corpus size
    pub relative_k: bool,
    /// Re-derive the pool size every iteration
    pub dynamic_k: bool,
    /// Pool selection strategy
    pub strategy: StrategyKind,
    /// Inflation factor of the adaptive window strategy
    #[serde(default)]
    pub adaptive_window_size: f64,
    /// Allowed concept overlap of the redundancy sweep
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
    /// Cost model of the time-based strategy
    #[serde(default)]
    pub time_budget: TimeBudget,
    /// Sampling parameters
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Feedback interpretation mode
    #[serde(default)]
    pub feedback_mode: FeedbackMode,
    /// Weight ceiling; defaults to the number of documents in the corpus
    #[serde(default)]
    pub max_weight: Option<f64>,
    /// Branch-and-bound node limit of the built-in solver
    #[serde(default = "default_solver_node_limit")]
    pub solver_node_limit: usize,
}

fn default_sweep_threshold() -> usize {
    1
}

fn default_solver_node_limit() -> usize {
    5_000_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            summary_length: 100,
            max_iterations: 25,
            rank_subset: true,
            k: 0.1,
            relative_k: true,
            dynamic_k: false,
            strategy: StrategyKind::Fixed,
            adaptive_window_size: 0.0,
            sweep_threshold: default_sweep_threshold(),
            time_budget: TimeBudget::default(),
            sampling: SamplingConfig::default(),
            feedback_mode: FeedbackMode::IlpFeedback,
            max_weight: None,
            solver_node_limit: default_solver_node_limit(),
        }
    }
}

impl RunConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.summary_length == 0 {
            return Err(SummarizerError::invalid_config("summary_length must be > 0"));
        }

        if self.max_iterations == 0 {
            return Err(SummarizerError::invalid_config("max_iterations must be > 0"));
        }

        if !self.k.is_finite() || self.k < 0.0 {
            return Err(SummarizerError::invalid_config(format!(
                "k must be a non-negative number, got {}",
                self.k
            )));
        }

        if self.relative_k && self.k > 1.0 {
            return Err(SummarizerError::invalid_config(format!(
                "relative k must be within [0, 1], got {}",
                self.k
            )));
        }

        if self.adaptive_window_size < 0.0 || !self.adaptive_window_size.is_finite() {
            return Err(SummarizerError::invalid_config(
                "adaptive_window_size must be >= 0",
            ));
        }

        if self.time_budget.max_seconds <= 0.0 {
            return Err(SummarizerError::invalid_config(
                "time_budget.max_seconds must be > 0",
            ));
        }

        if let Some(max_weight) = self.max_weight {
            if max_weight.is_nan() || max_weight <= 0.0 {
                return Err(SummarizerError::invalid_config("max_weight must be > 0"));
            }
        }

        if self.solver_node_limit == 0 {
            return Err(SummarizerError::invalid_config("solver_node_limit must be > 0"));
        }

        Ok(())
    }

    /// Resolve the configured pool size against the corpus size
    pub fn resolve_k(&self, corpus_size: usize) -> usize {
        if self.relative_k {
            (self.k * corpus_size as f64) as usize
        } else {
            self.k as usize
        }
    }

    /// Builder method: set summary length in words
    pub fn with_summary_length(mut self, summary_length: usize) -> Self {
        self.summary_length = summary_length;
        self
    }

    /// Builder method: set max iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder method: set an absolute pool size
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k as f64;
        self.relative_k = false;
        self
    }

    /// Builder method: set a pool size relative to the corpus size
    pub fn with_relative_k(mut self, fraction: f64) -> Self {
        self.k = fraction;
        self.relative_k = true;
        self
    }

    /// Builder method: toggle the ranked candidate pool
    pub fn with_rank_subset(mut self, rank_subset: bool) -> Self {
        self.rank_subset = rank_subset;
        self
    }

    /// Builder method: toggle per-iteration pool resizing
    pub fn with_dynamic_k(mut self, dynamic_k: bool) -> Self {
        self.dynamic_k = dynamic_k;
        self
    }

    /// Builder method: set the selection strategy
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder method: set the adaptive window inflation factor
    pub fn with_adaptive_window_size(mut self, size: f64) -> Self {
        self.adaptive_window_size = size;
        self
    }

    /// Builder method: set the redundancy sweep overlap threshold
    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }

    /// Builder method: set the time budget cost model
    pub fn with_time_budget(mut self, budget: TimeBudget) -> Self {
        self.time_budget = budget;
        self
    }

    /// Builder method: set sampling parameters
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Builder method: set the feedback interpretation mode
    pub fn with_feedback_mode(mut self, mode: FeedbackMode) -> Self {
        self.feedback_mode = mode;
        self
    }

    /// Builder method: set the weight ceiling
    pub fn with_max_weight(mut self, max_weight: f64) -> Self {
        self.max_weight = Some(max_weight);
        self
    }

    /// Builder method: set the built-in solver node limit
    pub fn with_solver_node_limit(mut self, limit: usize) -> Self {
        self.solver_node_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(RunConfig::default().validate().is_ok());
        assert!(RunConfig::default().with_summary_length(0).validate().is_err());
        assert!(RunConfig::default().with_max_iterations(0).validate().is_err());
        assert!(RunConfig::default().with_relative_k(1.5).validate().is_err());
        assert!(RunConfig::default().with_k(500).validate().is_ok());
        assert!(RunConfig::default()
            .with_adaptive_window_size(-0.5)
            .validate()
            .is_err());
        assert!(RunConfig::default().with_max_weight(0.0).validate().is_err());
    }

    #[test]
    fn test_resolve_k() {
        assert_eq!(RunConfig::default().with_relative_k(0.25).resolve_k(40), 10);
        assert_eq!(RunConfig::default().with_k(7).resolve_k(40), 7);
        assert_eq!(RunConfig::default().with_relative_k(0.01).resolve_k(40), 0);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("hw_init".parse::<StrategyKind>().unwrap(), StrategyKind::EntropyInit);
        assert_eq!("SWEEP".parse::<StrategyKind>().unwrap(), StrategyKind::RedundancySweep);
        assert_eq!(
            "adaptive_window".parse::<StrategyKind>().unwrap(),
            StrategyKind::AdaptiveWindow
        );
        let err = "magic".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err, SummarizerError::unknown_strategy("magic"));
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&StrategyKind::EntropyAdapt).unwrap();
        assert_eq!(json, r#""hw_adapt""#);
        let json = serde_json::to_string(&StrategyKind::PositiveLink).unwrap();
        assert_eq!(json, r#""positive_link""#);
        let back: StrategyKind = serde_json::from_str(r#""stratified""#).unwrap();
        assert_eq!(back, StrategyKind::Stratified);
    }

    #[test]
    fn test_config_from_json_with_defaults() {
        let json = r#"{
            "summary_length": 100,
            "max_iterations": 10,
            "rank_subset": true,
            "k": 0.2,
            "relative_k": true,
            "dynamic_k": true,
            "strategy": "adaptive_window"
        }"#;
        let config = RunConfig::from_json(json).unwrap();
        assert_eq!(config.strategy, StrategyKind::AdaptiveWindow);
        assert_eq!(config.sweep_threshold, 1);
        assert_eq!(config.feedback_mode, FeedbackMode::IlpFeedback);
        assert_eq!(config.max_weight, None);
    }

    #[test]
    fn test_config_from_json_rejects_unknown_strategy() {
        let json = r#"{
            "summary_length": 100,
            "max_iterations": 10,
            "rank_subset": true,
            "k": 0.2,
            "relative_k": true,
            "dynamic_k": false,
            "strategy": "best_guess"
        }"#;
        assert!(matches!(
            RunConfig::from_json(json),
            Err(SummarizerError::Serialization { .. })
        ));
    }

    #[test]
    fn test_time_budget_target() {
        let budget = TimeBudget {
            max_seconds: 4.0,
            coefficient_a: 100.0,
            coefficient_b: 10.0,
        };
        assert_eq!(budget.target_constraints(), 210);
    }

    #[test]
    fn test_feedback_mode_uses_ilp() {
        assert!(FeedbackMode::IlpFeedback.uses_feedback_ilp());
        assert!(FeedbackMode::ActiveLearning.uses_feedback_ilp());
        assert!(!FeedbackMode::AcceptReject.uses_feedback_ilp());
        assert_eq!("keep_track".parse::<FeedbackMode>().unwrap(), FeedbackMode::KeepTrack);
    }
}
