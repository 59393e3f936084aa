//! The iteration controller

use super::history::{IterationRecord, RunResult};
use super::snapshot::{Snapshot, SNAPSHOT_VERSION};
use super::{BreakReason, ControllerState, StepOutcome, UncertaintyModel};
use crate::config::{FeedbackMode, RunConfig};
use crate::errors::{Result, SummarizerError};
use crate::feedback::{FeedbackStore, FeedbackWeightUpdater, FlightRecorder, Record};
use crate::ilp::{CoverageProblem, IlpSolution, IlpSolver};
use crate::oracle::Oracle;
use crate::ranking::RankedSentenceIndex;
use crate::scoring::RougeScorer;
use crate::strategy::{coverage_floor_k, CandidatePool, PoolPolicy, SelectionContext};
use crate::types::{ConceptWeights, Corpus, RougeScores, SentenceId, UpperBound};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use tracing::{debug, info, info_span, warn};

/// Borrow the fields a policy reads, leaving `policy` free for `&mut` use.
macro_rules! selection_context {
    ($ctl:expr) => {
        SelectionContext {
            corpus: &$ctl.corpus,
            index: &$ctl.index,
            weights: &$ctl.weights,
            important_concepts: $ctl.updater.important_concepts(),
            summary_length: $ctl.config.summary_length,
            k: $ctl.k,
            round: $ctl.k_history.len(),
        }
    };
}

/// Drives the label, reweight, re-rank, solve, score loop of one run.
///
/// All state is owned by the controller; nothing is shared between runs.
pub struct IterationController {
    pub(super) config: RunConfig,
    pub(super) corpus: Corpus,
    pub(super) references: Vec<String>,
    pub(super) weights: ConceptWeights,
    pub(super) index: RankedSentenceIndex,
    pub(super) policy: Box<dyn PoolPolicy>,
    pub(super) pool: CandidatePool,
    pub(super) k: usize,
    pub(super) k_history: Vec<usize>,
    pub(super) seen_sentences: BTreeSet<SentenceId>,
    pub(super) recorder: FlightRecorder,
    pub(super) updater: FeedbackWeightUpdater,
    pub(super) store: Box<dyn FeedbackStore>,
    pub(super) solver: Box<dyn IlpSolver>,
    pub(super) scorer: Box<dyn RougeScorer>,
    pub(super) oracle: Box<dyn Oracle>,
    pub(super) uncertainty: Option<Box<dyn UncertaintyModel>>,
    pub(super) upper_bound: Option<UpperBound>,
    pub(super) iteration: usize,
    pub(super) state: ControllerState,
    pub(super) summary_ids: Vec<SentenceId>,
    pub(super) scores: RougeScores,
    pub(super) recommendations: BTreeSet<String>,
    pub(super) recommended_sentences: Vec<SentenceId>,
    pub(super) history: Vec<IterationRecord>,
}

impl IterationController {
    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    /// Resolve the initial pool, solve once and seed the recommendations.
    pub(super) fn initialize(&mut self) -> Result<()> {
        let uses_pool = self.config.rank_subset || self.config.strategy.is_sampling();
        self.k = if uses_pool {
            self.config.resolve_k(self.corpus.len())
        } else {
            self.corpus.len()
        };

        let initial = {
            let ctx = selection_context!(self);
            self.policy.initial_k(&ctx)
        };
        if let Some(k) = initial {
            self.k = k;
        }
        if self.config.dynamic_k {
            self.resize_k();
        }
        self.k_history.push(self.k);
        self.rebuild_pool();

        let (problem, solution) = self.solve_summary()?;
        self.summary_ids = problem.selected_ids(&solution);
        let text = self.texts(&self.summary_ids).join("\n");
        self.scores = self
            .scorer
            .score(&text, &self.references, self.config.summary_length);
        self.recommend(&problem, &solution);

        info!(
            sentences = self.corpus.len(),
            strategy = %self.config.strategy,
            k = self.k,
            pool = self.pool.len(),
            recommendations = self.recommendations.len(),
            "controller initialized"
        );
        Ok(())
    }

    /// Continue from a snapshot. Weights and ranking were already seeded
    /// from the snapshot weights, and the feedback store has replayed the
    /// snapshot records.
    pub(super) fn restore(&mut self, snapshot: Snapshot) {
        if snapshot.oracle != self.oracle.name() {
            warn!(
                recorded = %snapshot.oracle,
                current = self.oracle.name(),
                "resuming with a different oracle"
            );
        }

        self.recorder = FlightRecorder::from_records(snapshot.records);
        self.updater.refresh_important(&self.recorder);
        for record in self.recorder.records() {
            let accepts: Vec<String> = record.accept.iter().cloned().collect();
            let rejects: Vec<String> = record.reject.iter().cloned().collect();
            self.policy.feedback_received(&accepts, &rejects);
        }
        self.policy.weights_changed(&self.corpus, &self.weights);

        self.iteration = snapshot.iteration;
        self.k = snapshot.k;
        self.k_history = snapshot.k_history;
        self.recommendations = snapshot.recommendations;
        self.recommended_sentences = snapshot.recommended_sentences;
        self.seen_sentences = snapshot.seen_sentences;
        self.history = snapshot.history;
        self.state = snapshot.state;
        if let Some(last) = self.history.last() {
            self.summary_ids = last.summary_ids.clone();
            self.scores = last.scores;
        }
        self.pool = self.select_pool();

        info!(
            iteration = self.iteration,
            k = self.k,
            records = self.recorder.len(),
            "controller resumed"
        );
    }

    // ------------------------------------------------------------------
    // Pool management
    // ------------------------------------------------------------------

    /// Re-derive `k` from the policy, raised to the coverage floor
    fn resize_k(&mut self) {
        let chosen = {
            let ctx = selection_context!(self);
            self.policy.determine_k(&ctx)
        };
        let floor = coverage_floor_k(
            &self.index,
            &self.corpus,
            self.config.summary_length.saturating_mul(2),
        );
        let previous = self.k;
        self.k = chosen.max(floor);
        debug!(previous, chosen, floor, k = self.k, "pool size re-derived");
    }

    fn select_pool(&mut self) -> CandidatePool {
        if self.config.rank_subset || self.config.strategy.is_sampling() {
            let ctx = selection_context!(self);
            let selected = self.policy.select(&ctx);
            CandidatePool::assemble(selected, &ctx)
        } else {
            CandidatePool::full(&self.corpus)
        }
    }

    fn rebuild_pool(&mut self) {
        let pool = self.select_pool();
        self.seen_sentences.extend(pool.ids().iter().copied());
        debug!(
            k = self.k,
            pool = pool.len(),
            distinct = pool.distinct_concepts(),
            "candidate pool rebuilt"
        );
        self.pool = pool;
    }

    /// Optimizer-scoped weights: the authoritative values of every concept
    /// in the pool, plus the latest labels.
    pub fn scoped_weights(&self) -> ConceptWeights {
        let latest = self.recorder.latest();
        let sentences = self.pool.sentences(&self.corpus);
        self.weights.restrict_to(
            sentences.iter().copied(),
            latest
                .accept
                .iter()
                .chain(&latest.reject)
                .map(String::as_str),
        )
    }

    // ------------------------------------------------------------------
    // Optimization
    // ------------------------------------------------------------------

    /// The primary summary problem over the current pool
    pub fn summary_problem(&self) -> CoverageProblem {
        let scoped = self.scoped_weights();
        let sentences = self.pool.sentences(&self.corpus);
        CoverageProblem::summary(&sentences, &scoped, self.config.summary_length)
    }

    /// The recommendation problem over the current pool
    pub fn recommendation_problem(&self) -> CoverageProblem {
        let scoped = self.scoped_weights();
        let sentences = self.pool.sentences(&self.corpus);
        let feedback = self.recorder.feedback_concepts();
        let model = match self.config.feedback_mode {
            FeedbackMode::ActiveLearning => self.uncertainty.as_deref(),
            _ => None,
        };
        let factor = |concept: &str| model.map_or(1.0, |m| m.uncertainty(concept).clamp(0.0, 1.0));
        CoverageProblem::recommendation(
            &sentences,
            &scoped,
            &feedback,
            &factor,
            self.config.summary_length,
        )
    }

    fn solve_summary(&self) -> Result<(CoverageProblem, IlpSolution)> {
        let problem = self.summary_problem();
        let solution = self
            .solver
            .solve(&problem)
            .map_err(|failure| SummarizerError::infeasible(problem.kind.to_string(), failure))?;
        Ok((problem, solution))
    }

    /// Choose next round's concepts. Falls back to the summary selection
    /// when the recommendation problem fails or selects nothing.
    fn recommend(&mut self, primary: &CoverageProblem, primary_solution: &IlpSolution) {
        let mode = self.config.feedback_mode;
        let joint = if mode.uses_feedback_ilp() && !self.recorder.feedback_concepts().is_empty() {
            if mode == FeedbackMode::ActiveLearning {
                if let Some(model) = self.uncertainty.as_mut() {
                    model.fit(&self.recorder);
                }
            }
            let problem = self.recommendation_problem();
            match self.solver.solve(&problem) {
                Ok(solution) if !solution.is_empty() => Some((problem, solution)),
                Ok(_) => {
                    warn!("recommendation problem selected nothing, using the summary selection");
                    None
                }
                Err(failure) => {
                    warn!(error = %failure, "recommendation problem failed, using the summary selection");
                    None
                }
            }
        } else {
            None
        };

        let (problem, solution) = match &joint {
            Some((problem, solution)) => (problem, solution),
            None => (primary, primary_solution),
        };

        let labeled = self.recorder.labeled_concepts();
        self.recommendations = problem
            .concepts_of(&solution.selected)
            .into_iter()
            .filter(|concept| !labeled.contains(concept.as_str()))
            .collect();
        self.recommended_sentences = problem.selected_ids(solution);
        debug!(
            recommendations = self.recommendations.len(),
            joint = joint.is_some(),
            "recommendations updated"
        );
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Run one iteration.
    ///
    /// A failed summary solve moves the controller to
    /// [`ControllerState::Failed`]; later calls return
    /// [`SummarizerError::Terminated`].
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.state.is_terminated() {
            return Err(SummarizerError::Terminated);
        }
        let span = info_span!("iteration", index = self.iteration);
        let _enter = span.enter();

        let labels = self.oracle.get_labels(&self.recommendations, &self.recorder);
        debug!(
            accepts = labels.accepts.len(),
            rejects = labels.rejects.len(),
            implicits = labels.implicits.len(),
            "oracle labels"
        );
        self.recorder.add_record(Record {
            accept: labels.accepts,
            reject: labels.rejects,
            implicit_reject: labels.implicits,
        });

        self.store.incorporate_feedback(&self.recorder);
        self.updater.apply(
            self.store.as_ref(),
            &self.recorder,
            &self.corpus,
            &mut self.weights,
            &mut self.index,
        );
        let latest = self.recorder.latest();
        let accepted: Vec<String> = latest.accept.iter().cloned().collect();
        let rejected: Vec<String> = latest.reject.iter().cloned().collect();
        self.policy.weights_changed(&self.corpus, &self.weights);
        self.policy.feedback_received(&accepted, &rejected);

        if self.config.dynamic_k {
            self.resize_k();
        }
        self.k_history.push(self.k);
        self.rebuild_pool();

        let (problem, solution) = match self.solve_summary() {
            Ok(solved) => solved,
            Err(err) => {
                warn!(error = %err, "summary problem failed, controller stopped");
                self.state = ControllerState::Failed;
                return Err(err);
            }
        };
        let summary_ids = problem.selected_ids(&solution);
        let summary = self.texts(&summary_ids);
        let scores = self
            .scorer
            .score(&summary.join("\n"), &self.references, self.config.summary_length);
        self.recommend(&problem, &solution);

        self.history.push(IterationRecord {
            iteration: self.iteration,
            scores,
            accept_count: accepted.len(),
            reject_count: rejected.len(),
            accepted,
            rejected,
            summary: summary.clone(),
            summary_ids: summary_ids.clone(),
            recommendations: self.recommendations.iter().cloned().collect(),
            pool_size: self.pool.len(),
            k: self.k,
        });
        self.summary_ids = summary_ids;
        self.scores = scores;

        let outcome = match self.check_break(&summary, scores) {
            Some(reason) => {
                info!(%reason, "stopping");
                self.state = ControllerState::Terminated(reason);
                StepOutcome::Terminated(reason)
            }
            None => StepOutcome::Continue,
        };
        self.iteration += 1;
        Ok(outcome)
    }

    /// Step until a break condition fires
    pub fn run(&mut self) -> Result<RunResult> {
        while !self.state.is_terminated() {
            self.step()?;
        }
        Ok(self.result())
    }

    /// First break condition that holds, in priority order
    fn check_break(&self, summary: &[String], scores: RougeScores) -> Option<BreakReason> {
        if self.recorder.latest().has_no_feedback() && self.recorder.len() > 1 {
            return Some(BreakReason::NoMoreFeedback);
        }
        if let Some(upper) = &self.upper_bound {
            if scores == upper.scores {
                return Some(BreakReason::UpperBoundScore);
            }
            if scores.rouge_2 >= upper.scores.rouge_2 {
                return Some(BreakReason::Rouge2);
            }
            if summary == upper.summary.as_slice() {
                return Some(BreakReason::UpperBoundSummary);
            }
        }
        if self.iteration + 1 >= self.config.max_iterations {
            return Some(BreakReason::MaxIterations);
        }
        None
    }

    fn texts(&self, ids: &[SentenceId]) -> Vec<String> {
        self.corpus
            .resolve(ids)
            .map(|s| s.untokenized_form.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    pub fn result(&self) -> RunResult {
        RunResult {
            summary: self.summary(),
            summary_ids: self.summary_ids.clone(),
            scores: self.scores,
            recommendations: self.recommendations.iter().cloned().collect(),
            recommended_sentences: self.recommended_sentences.clone(),
            break_reason: self.break_reason(),
            iterations: self.history.len(),
            k_history: self.k_history.clone(),
            seen_sentences: self.seen_sentences.len(),
            history: self.history.clone(),
        }
    }

    /// Capture the run state for a later [`resume`](super::ControllerBuilder::resume_from)
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            oracle: self.oracle.name().to_string(),
            iteration: self.iteration,
            records: self.recorder.records().to_vec(),
            weights: self.weights.to_sorted(),
            important_concepts: self.updater.important_concepts().iter().cloned().collect(),
            k: self.k,
            k_history: self.k_history.clone(),
            recommendations: self.recommendations.clone(),
            recommended_sentences: self.recommended_sentences.clone(),
            seen_sentences: self.seen_sentences.clone(),
            history: self.history.clone(),
            state: self.state,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn break_reason(&self) -> Option<BreakReason> {
        match self.state {
            ControllerState::Terminated(reason) => Some(reason),
            ControllerState::Iterating | ControllerState::Failed => None,
        }
    }

    /// Index of the next iteration
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// The authoritative weight table
    pub fn weights(&self) -> &ConceptWeights {
        &self.weights
    }

    pub fn index(&self) -> &RankedSentenceIndex {
        &self.index
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn k_history(&self) -> &[usize] {
        &self.k_history
    }

    pub fn seen_sentences(&self) -> &BTreeSet<SentenceId> {
        &self.seen_sentences
    }

    pub fn recorder(&self) -> &FlightRecorder {
        &self.recorder
    }

    pub fn important_concepts(&self) -> &FxHashSet<String> {
        self.updater.important_concepts()
    }

    /// Concepts the oracle will be asked about next
    pub fn recommendations(&self) -> &BTreeSet<String> {
        &self.recommendations
    }

    pub fn recommended_sentences(&self) -> &[SentenceId] {
        &self.recommended_sentences
    }

    pub fn summary_ids(&self) -> &[SentenceId] {
        &self.summary_ids
    }

    /// Text of the current summary, one entry per sentence
    pub fn summary(&self) -> Vec<String> {
        self.texts(&self.summary_ids)
    }

    pub fn scores(&self) -> RougeScores {
        self.scores
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn feedback_store_config(&self) -> serde_json::Value {
        self.store.config()
    }
}

impl std::fmt::Debug for IterationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationController")
            .field("strategy", &self.config.strategy)
            .field("solver", &self.solver.name())
            .field("oracle", &self.oracle.name())
            .field("iteration", &self.iteration)
            .field("k", &self.k)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
