//! Controller construction
//!
//! Collaborators are plugged in through `with_*` methods; `build` validates
//! the configuration, ranks the corpus and performs the initial solve.

use super::iteration::IterationController;
use super::snapshot::Snapshot;
use super::{ControllerState, UncertaintyModel};
use crate::config::RunConfig;
use crate::errors::{Result, SummarizerError};
use crate::feedback::{BaselineFeedbackStore, FeedbackStore, FeedbackWeightUpdater, FlightRecorder};
use crate::ilp::{BranchAndBoundSolver, IlpSolver};
use crate::oracle::Oracle;
use crate::ranking::RankedSentenceIndex;
use crate::scoring::{NgramRecallScorer, RougeScorer};
use crate::strategy::{build_policy, CandidatePool};
use crate::types::{ConceptWeights, Corpus, RougeScores, SentenceId, UpperBound};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Builder for [`IterationController`]
///
/// # Example
///
/// ```
/// use feedback_summarizer::{
///     ControllerBuilder, Corpus, RunConfig, Sentence, SimulatedOracle,
/// };
///
/// let corpus = Corpus::new(vec![
///     Sentence::new(0, 0, 3, ["a", "b"], "a b x"),
///     Sentence::new(0, 1, 2, ["c"], "c y"),
/// ])
/// .unwrap();
///
/// let mut controller = ControllerBuilder::new(RunConfig::new().with_summary_length(3))
///     .with_corpus(corpus)
///     .default_solver()
///     .default_scorer()
///     .baseline_feedback_store()
///     .with_oracle(SimulatedOracle::new(["a"]))
///     .build()
///     .unwrap();
///
/// let result = controller.run().unwrap();
/// assert!(result.break_reason.is_some());
/// ```
pub struct ControllerBuilder {
    config: RunConfig,
    corpus: Option<Corpus>,
    weights: Option<ConceptWeights>,
    references: Vec<String>,
    solver: Option<Box<dyn IlpSolver>>,
    scorer: Option<Box<dyn RougeScorer>>,
    oracle: Option<Box<dyn Oracle>>,
    store: Option<Box<dyn FeedbackStore>>,
    uncertainty: Option<Box<dyn UncertaintyModel>>,
    upper_bound: Option<UpperBound>,
    clusters: Option<FxHashMap<SentenceId, usize>>,
    snapshot: Option<Snapshot>,
}

impl ControllerBuilder {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            corpus: None,
            weights: None,
            references: Vec::new(),
            solver: None,
            scorer: None,
            oracle: None,
            store: None,
            uncertainty: None,
            upper_bound: None,
            clusters: None,
            snapshot: None,
        }
    }

    pub fn with_corpus(mut self, corpus: Corpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Initial concept weights. Defaults to document frequency.
    pub fn with_weights(mut self, weights: ConceptWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Reference summaries used for scoring
    pub fn with_references(mut self, references: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_solver(mut self, solver: impl IlpSolver + 'static) -> Self {
        self.solver = Some(Box::new(solver));
        self
    }

    /// Branch and bound, limited by `solver_node_limit`
    pub fn default_solver(mut self) -> Self {
        self.solver = Some(Box::new(BranchAndBoundSolver::new(self.config.solver_node_limit)));
        self
    }

    pub fn with_scorer(mut self, scorer: impl RougeScorer + 'static) -> Self {
        self.scorer = Some(Box::new(scorer));
        self
    }

    pub fn default_scorer(self) -> Self {
        self.with_scorer(NgramRecallScorer)
    }

    pub fn with_oracle(mut self, oracle: impl Oracle + 'static) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    pub fn with_feedback_store(mut self, store: impl FeedbackStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// [`BaselineFeedbackStore`] in the configured feedback mode
    pub fn baseline_feedback_store(self) -> Self {
        let mode = self.config.feedback_mode;
        self.with_feedback_store(BaselineFeedbackStore::new(mode))
    }

    /// Uncertainty source for active learning; ignored in other modes
    pub fn with_uncertainty_model(mut self, model: impl UncertaintyModel + 'static) -> Self {
        self.uncertainty = Some(Box::new(model));
        self
    }

    /// Enables the upper-bound break conditions
    pub fn with_upper_bound(mut self, upper_bound: UpperBound) -> Self {
        self.upper_bound = Some(upper_bound);
        self
    }

    /// Cluster assignment for stratified sampling
    pub fn with_clusters(mut self, clusters: FxHashMap<SentenceId, usize>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Continue a checkpointed run. The snapshot's config replaces the
    /// builder's; collaborators must still be supplied.
    pub fn resume_from(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn build(self) -> Result<IterationController> {
        let ControllerBuilder {
            config,
            corpus,
            weights,
            references,
            solver,
            scorer,
            oracle,
            store,
            uncertainty,
            upper_bound,
            clusters,
            snapshot,
        } = self;

        let config = match &snapshot {
            Some(snapshot) => snapshot.config.clone(),
            None => config,
        };
        config.validate()?;

        let corpus = corpus.ok_or_else(|| SummarizerError::missing_collaborator("corpus"))?;
        let solver = solver.ok_or_else(|| SummarizerError::missing_collaborator("solver"))?;
        let scorer = scorer.ok_or_else(|| SummarizerError::missing_collaborator("scorer"))?;
        let oracle = oracle.ok_or_else(|| SummarizerError::missing_collaborator("oracle"))?;
        let mut store =
            store.ok_or_else(|| SummarizerError::missing_collaborator("feedback_store"))?;

        let weights = match &snapshot {
            Some(snapshot) => ConceptWeights::from(snapshot.weights.clone()),
            None => weights.unwrap_or_else(|| ConceptWeights::document_frequency(&corpus)),
        };
        let max_weight = config
            .max_weight
            .unwrap_or_else(|| corpus.document_count() as f64);

        store.add_sentences(&corpus, &weights, max_weight);
        if let Some(snapshot) = &snapshot {
            // stores fold one record per call
            let mut replayed = FlightRecorder::new();
            for record in &snapshot.records {
                replayed.add_record(record.clone());
                store.incorporate_feedback(&replayed);
            }
        }
        let index = RankedSentenceIndex::initialize(&corpus, &weights);
        let policy = build_policy(&config, &corpus, &weights, clusters.as_ref());

        let mut controller = IterationController {
            config,
            corpus,
            references,
            weights,
            index,
            policy,
            pool: CandidatePool::default(),
            k: 0,
            k_history: Vec::new(),
            seen_sentences: BTreeSet::new(),
            recorder: FlightRecorder::new(),
            updater: FeedbackWeightUpdater::new(max_weight),
            store,
            solver,
            scorer,
            oracle,
            uncertainty,
            upper_bound,
            iteration: 0,
            state: ControllerState::Iterating,
            summary_ids: Vec::new(),
            scores: RougeScores::default(),
            recommendations: BTreeSet::new(),
            recommended_sentences: Vec::new(),
            history: Vec::new(),
        };

        match snapshot {
            Some(snapshot) => controller.restore(snapshot),
            None => controller.initialize()?,
        }
        Ok(controller)
    }
}

impl std::fmt::Debug for ControllerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("config", &self.config)
            .field("corpus", &self.corpus.as_ref().map(Corpus::len))
            .field("solver", &self.solver.as_ref().map(|s| s.name()))
            .field("oracle", &self.oracle.as_ref().map(|o| o.name()))
            .field("resume", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}
