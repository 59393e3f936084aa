//! Integration tests for feedback_summarizer

use feedback_summarizer::*;
use std::collections::BTreeSet;

/// Three documents, five sentences. Document frequency: a=2 b=2 c=3 d=1 e=1.
fn corpus() -> Corpus {
    Corpus::new(vec![
        Sentence::new(0, 0, 4, ["a", "b"], "alpha beta in context"),
        Sentence::new(0, 1, 3, ["c", "d"], "gamma delta here"),
        Sentence::new(1, 0, 5, ["a", "c"], "alpha and gamma once more"),
        Sentence::new(1, 1, 2, ["b"], "beta only"),
        Sentence::new(2, 0, 3, ["c", "e"], "gamma epsilon there"),
    ])
    .unwrap()
}

fn id(doc: usize, pos: usize) -> SentenceId {
    SentenceId::new(doc, pos)
}

/// Replays a fixed label script, one entry per round
struct ScriptedOracle {
    rounds: Vec<(Vec<&'static str>, Vec<&'static str>)>,
    asked: usize,
}

impl ScriptedOracle {
    fn new(rounds: Vec<(Vec<&'static str>, Vec<&'static str>)>) -> Self {
        Self { rounds, asked: 0 }
    }
}

impl Oracle for ScriptedOracle {
    fn get_labels(&mut self, _candidates: &BTreeSet<String>, _recorder: &FlightRecorder) -> Labels {
        let mut labels = Labels::default();
        if let Some((accepts, rejects)) = self.rounds.get(self.asked) {
            labels.accepts = accepts.iter().map(|c| c.to_string()).collect();
            labels.rejects = rejects.iter().map(|c| c.to_string()).collect();
        }
        self.asked += 1;
        labels
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Always returns the same scores
struct FixedScorer(RougeScores);

impl RougeScorer for FixedScorer {
    fn score(&self, _candidate: &str, _references: &[String], _target_length: usize) -> RougeScores {
        self.0
    }
}

fn fixed_config() -> RunConfig {
    RunConfig::new()
        .with_summary_length(10)
        .with_k(3)
        .with_strategy(StrategyKind::Fixed)
}

#[test]
fn test_accept_and_reject_reshape_ranking() {
    let mut controller = ControllerBuilder::new(fixed_config())
        .with_corpus(corpus())
        .with_references(["alpha beta epsilon"])
        .default_solver()
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(ScriptedOracle::new(vec![(vec!["a"], vec!["c"])]))
        .build()
        .unwrap();

    // densities: (0,1)=(2,0)=4/3, the rest 1.0
    assert_eq!(controller.index().rank_of(id(0, 1)), Some(0));
    assert_eq!(controller.index().rank_of(id(0, 0)), Some(2));

    let outcome = controller.step().unwrap();
    assert_eq!(outcome, StepOutcome::Continue);

    // max_weight defaults to the document count
    assert_eq!(controller.weights().get("a"), 3.0);
    assert_eq!(controller.weights().get("c"), 0.0);
    assert_eq!(controller.important_concepts().len(), 1);

    let index = controller.index();
    assert_eq!(index.rank_of(id(0, 0)), Some(0));
    assert!(index.rank_of(id(0, 1)) > index.rank_of(id(0, 0)));
    assert!(index.rank_of(id(2, 0)) > index.rank_of(id(1, 0)));

    let problem = controller.recommendation_problem();
    let unlabelled: Vec<&str> = problem
        .terms
        .iter()
        .filter(|t| !t.feedback)
        .map(|t| t.concept.as_str())
        .collect();
    assert!(!unlabelled.contains(&"a"));
    assert!(!unlabelled.contains(&"c"));
    for term in problem.terms.iter().filter(|t| t.feedback) {
        assert!(term.coefficient <= 0.0, "{} rewarded", term.concept);
    }

    let labeled = controller.recorder().labeled_concepts();
    assert!(controller
        .recommendations()
        .iter()
        .all(|c| !labeled.contains(c.as_str())));
}

#[test]
fn test_pool_always_meets_coverage_floor() {
    let sentences = (0..6)
        .map(|i| Sentence::new(i % 2, i / 2, 2, [format!("p{i}")], format!("word{i} filler")))
        .collect();
    let config = RunConfig::new()
        .with_summary_length(2)
        .with_k(1)
        .with_max_iterations(3);
    let mut controller = ControllerBuilder::new(config)
        .with_corpus(Corpus::new(sentences).unwrap())
        .default_solver()
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(SimulatedOracle::new(["p0", "p3"]))
        .build()
        .unwrap();

    loop {
        assert!(controller.pool().distinct_concepts() >= 4);
        assert!(controller.pool().floor_met());
        assert!(controller.pool().len() >= 4);
        if controller.step().unwrap() != StepOutcome::Continue {
            break;
        }
    }
}

#[test]
fn test_upper_bound_score_beats_max_iterations() {
    let scores = RougeScores::new(0.5, 0.5, 0.5);
    let mut controller = ControllerBuilder::new(fixed_config().with_max_iterations(1))
        .with_corpus(corpus())
        .default_solver()
        .with_scorer(FixedScorer(scores))
        .baseline_feedback_store()
        .with_oracle(ScriptedOracle::new(vec![(vec!["a"], vec![])]))
        .with_upper_bound(UpperBound {
            scores,
            summary: vec!["never produced".to_string()],
        })
        .build()
        .unwrap();

    let outcome = controller.step().unwrap();
    assert_eq!(outcome, StepOutcome::Terminated(BreakReason::UpperBoundScore));
    assert_eq!(
        controller.state(),
        ControllerState::Terminated(BreakReason::UpperBoundScore)
    );
}

#[test]
fn test_rouge2_reaching_upper_bound_stops() {
    let mut controller = ControllerBuilder::new(fixed_config().with_max_iterations(10))
        .with_corpus(corpus())
        .default_solver()
        .with_scorer(FixedScorer(RougeScores::new(0.2, 0.5, 0.2)))
        .baseline_feedback_store()
        .with_oracle(ScriptedOracle::new(vec![(vec!["a"], vec![])]))
        .with_upper_bound(UpperBound {
            scores: RougeScores::new(0.9, 0.4, 0.9),
            summary: Vec::new(),
        })
        .build()
        .unwrap();

    let result = controller.run().unwrap();
    assert_eq!(result.break_reason, Some(BreakReason::Rouge2));
    assert_eq!(result.iterations, 1);
}

#[test]
fn test_upper_bound_summary_stops() {
    let build = |upper_bound: Option<UpperBound>| {
        let mut builder = ControllerBuilder::new(fixed_config().with_max_iterations(10))
            .with_corpus(corpus())
            .default_solver()
            .with_scorer(FixedScorer(RougeScores::new(0.1, 0.1, 0.1)))
            .baseline_feedback_store()
            .with_oracle(ScriptedOracle::new(Vec::new()));
        if let Some(upper_bound) = upper_bound {
            builder = builder.with_upper_bound(upper_bound);
        }
        builder.build().unwrap()
    };

    // without labels the summary never changes
    let reference = build(None).summary();
    let mut controller = build(Some(UpperBound {
        scores: RougeScores::new(0.9, 0.9, 0.9),
        summary: reference,
    }));
    let outcome = controller.step().unwrap();
    assert_eq!(outcome, StepOutcome::Terminated(BreakReason::UpperBoundSummary));
}

#[test]
fn test_no_feedback_beats_upper_bound() {
    let scores = RougeScores::new(0.5, 0.5, 0.5);
    let mut controller = ControllerBuilder::new(fixed_config())
        .with_corpus(corpus())
        .default_solver()
        .with_scorer(FixedScorer(RougeScores::default()))
        .baseline_feedback_store()
        .with_oracle(ScriptedOracle::new(Vec::new()))
        .with_upper_bound(UpperBound {
            scores,
            summary: Vec::new(),
        })
        .build()
        .unwrap();

    assert_eq!(controller.step().unwrap(), StepOutcome::Continue);
    assert_eq!(
        controller.step().unwrap(),
        StepOutcome::Terminated(BreakReason::NoMoreFeedback)
    );
}

#[test]
fn test_simulated_run_converges() {
    let config = RunConfig::new()
        .with_summary_length(7)
        .with_relative_k(0.4)
        .with_dynamic_k(true)
        .with_strategy(StrategyKind::EntropyAdapt);
    let mut controller = ControllerBuilder::new(config)
        .with_corpus(corpus())
        .with_references(["alpha beta in context", "beta only"])
        .default_solver()
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(SimulatedOracle::new(["a", "b"]))
        .build()
        .unwrap();

    let result = controller.run().unwrap();
    assert!(result.break_reason.is_some());
    assert_eq!(result.history.len(), result.iterations);
    assert_eq!(result.k_history.len(), result.iterations + 1);
    assert!(result.seen_sentences <= 5);
    assert!(result.scores.rouge_1 > 0.0);

    let length: usize = result
        .summary_ids
        .iter()
        .filter_map(|&sid| controller.corpus().get(sid))
        .map(|s| s.length)
        .sum();
    assert!(length <= 7);
}

#[test]
fn test_every_strategy_runs() {
    let strategies = [
        StrategyKind::Fixed,
        StrategyKind::EntropyInit,
        StrategyKind::EntropyAdapt,
        StrategyKind::AdaptiveWindow,
        StrategyKind::RedundancySweep,
        StrategyKind::PositiveLink,
        StrategyKind::TimeBased,
        StrategyKind::Random,
        StrategyKind::Stratified,
    ];
    for strategy in strategies {
        let config = RunConfig::new()
            .with_summary_length(6)
            .with_k(2)
            .with_max_iterations(3)
            .with_adaptive_window_size(0.5)
            .with_strategy(strategy);
        let mut controller = ControllerBuilder::new(config)
            .with_corpus(corpus())
            .default_solver()
            .default_scorer()
            .baseline_feedback_store()
            .with_oracle(SimulatedOracle::new(["a", "e"]))
            .build()
            .unwrap_or_else(|e| panic!("{strategy}: {e}"));
        let result = controller
            .run()
            .unwrap_or_else(|e| panic!("{strategy}: {e}"));
        assert!(result.break_reason.is_some(), "{strategy}");
    }
}

#[test]
fn test_sampling_is_reproducible() {
    let run = || {
        let config = RunConfig::new()
            .with_summary_length(4)
            .with_k(2)
            .with_max_iterations(3)
            .with_strategy(StrategyKind::Random);
        let mut controller = ControllerBuilder::new(config)
            .with_corpus(corpus())
            .default_solver()
            .default_scorer()
            .baseline_feedback_store()
            .with_oracle(SimulatedOracle::new(["a", "c"]))
            .build()
            .unwrap();
        controller.run().unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_snapshot_resume_matches_uninterrupted_run() {
    let config = fixed_config().with_max_iterations(3);
    let make = || {
        ControllerBuilder::new(config.clone())
            .with_corpus(corpus())
            .with_references(["alpha beta epsilon"])
            .default_solver()
            .default_scorer()
            .baseline_feedback_store()
            .with_oracle(SimulatedOracle::new(["a", "b", "e"]))
    };

    let mut straight = make().build().unwrap();
    straight.step().unwrap();
    straight.step().unwrap();

    let mut first = make().build().unwrap();
    first.step().unwrap();
    let json = first.snapshot().to_json().unwrap();

    let mut resumed = make()
        .resume_from(Snapshot::from_json(&json).unwrap())
        .build()
        .unwrap();
    assert_eq!(resumed.iteration(), 1);
    resumed.step().unwrap();

    assert_eq!(resumed.summary_ids(), straight.summary_ids());
    assert_eq!(resumed.recommendations(), straight.recommendations());
    assert_eq!(resumed.recorder(), straight.recorder());
    assert_eq!(resumed.history(), straight.history());
}

#[test]
fn test_snapshot_version_checked() {
    let controller = ControllerBuilder::new(fixed_config())
        .with_corpus(corpus())
        .default_solver()
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(SimulatedOracle::new(["a"]))
        .build()
        .unwrap();

    let mut snapshot = controller.snapshot();
    snapshot.version += 1;
    let err = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap_err();
    assert!(matches!(err, SummarizerError::Serialization { .. }));
}

#[test]
fn test_missing_feedback_store() {
    let err = ControllerBuilder::new(fixed_config())
        .with_corpus(corpus())
        .default_solver()
        .default_scorer()
        .with_oracle(SimulatedOracle::new(["a"]))
        .build()
        .unwrap_err();
    assert_eq!(err, SummarizerError::missing_collaborator("feedback_store"));
    assert!(err.is_configuration_error());
}

#[test]
fn test_solver_failure_is_reported() {
    let builder = ControllerBuilder::new(fixed_config().with_rank_subset(false))
        .with_corpus(corpus())
        .with_solver(BranchAndBoundSolver::new(1))
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(SimulatedOracle::new(["a"]));

    // a one-node limit cannot finish the initial solve
    let err = builder.build().unwrap_err();
    assert!(matches!(err, SummarizerError::Infeasible { .. }));
    assert!(!err.is_configuration_error());
}

#[test]
fn test_run_result_serializes() {
    let mut controller = ControllerBuilder::new(fixed_config().with_max_iterations(2))
        .with_corpus(corpus())
        .default_solver()
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(SimulatedOracle::new(["a"]))
        .build()
        .unwrap();
    let result = controller.run().unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: RunResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.break_reason, result.break_reason);
    assert_eq!(back.summary_text(), result.summary_text());
}

/// Bigram concepts for the n-gram graph store. Edge counts: car parks=3,
/// red fox=2, every other bigram 1.
fn bigram_corpus() -> Corpus {
    Corpus::new(vec![
        Sentence::new(0, 0, 3, ["red fox", "fox runs"], "red fox runs"),
        Sentence::new(0, 1, 3, ["red car", "car parks"], "red car parks"),
        Sentence::new(1, 0, 3, ["red fox", "fox sleeps"], "red fox sleeps"),
        Sentence::new(1, 1, 3, ["blue car", "car parks"], "blue car parks"),
        Sentence::new(2, 0, 3, ["car parks", "blue sky"], "car parks skyward"),
    ])
    .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_graph_store_boosts_reach_weights_and_ranking() {
    let mut controller = ControllerBuilder::new(fixed_config())
        .with_corpus(bigram_corpus())
        .default_solver()
        .default_scorer()
        .with_feedback_store(NgramFeedbackGraph::default())
        .with_oracle(ScriptedOracle::new(vec![(vec!["red fox"], vec![])]))
        .build()
        .unwrap();

    // document frequency: (1,1) = 4/3 ahead of (0,0) = 3/3
    assert!(controller.index().rank_of(id(1, 1)) < controller.index().rank_of(id(0, 0)));

    controller.step().unwrap();

    let weights = controller.weights();
    assert!(close(weights.get("red fox"), 3.0));
    // neighbours of both tokens doubled
    assert!(close(weights.get("red car"), 2.0));
    assert!(close(weights.get("fox runs"), 2.0));
    assert!(close(weights.get("fox sleeps"), 2.0));
    // untouched edges keep their count
    assert!(close(weights.get("blue car"), 1.0));
    assert!(close(weights.get("car parks"), 3.0));

    let index = controller.index();
    assert!(close(index.metric(id(0, 0)).unwrap(), 5.0 / 3.0));
    assert!(index.rank_of(id(0, 0)) < index.rank_of(id(1, 1)));
    assert!(controller.important_concepts().contains("red fox"));
}

#[test]
fn test_graph_store_resume_matches_uninterrupted_run() {
    let config = fixed_config().with_max_iterations(3);
    let make = || {
        ControllerBuilder::new(config.clone())
            .with_corpus(bigram_corpus())
            .with_references(["red fox runs"])
            .default_solver()
            .default_scorer()
            .with_feedback_store(NgramFeedbackGraph::default())
            .with_oracle(SimulatedOracle::new(["red fox", "fox runs"]))
    };

    let mut straight = make().build().unwrap();
    straight.step().unwrap();
    straight.step().unwrap();

    let mut first = make().build().unwrap();
    first.step().unwrap();
    let json = first.snapshot().to_json().unwrap();

    let mut resumed = make()
        .resume_from(Snapshot::from_json(&json).unwrap())
        .build()
        .unwrap();
    resumed.step().unwrap();

    assert_eq!(resumed.recorder(), straight.recorder());
    assert_eq!(resumed.weights(), straight.weights());
    assert_eq!(resumed.summary_ids(), straight.summary_ids());
    assert_eq!(resumed.recommendations(), straight.recommendations());
    assert_eq!(resumed.history(), straight.history());
}

/// Delegates to branch and bound for the first `healthy` calls, then fails
struct FlakySolver {
    inner: BranchAndBoundSolver,
    healthy: usize,
    calls: std::cell::Cell<usize>,
}

impl IlpSolver for FlakySolver {
    fn solve(&self, problem: &CoverageProblem) -> std::result::Result<IlpSolution, SolveFailure> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call < self.healthy {
            self.inner.solve(problem)
        } else {
            Err(SolveFailure::NodeLimit { limit: 0 })
        }
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[test]
fn test_failed_summary_solve_stops_controller() {
    let mut controller = ControllerBuilder::new(fixed_config())
        .with_corpus(corpus())
        .with_solver(FlakySolver {
            inner: BranchAndBoundSolver::new(1_000_000),
            healthy: 1,
            calls: std::cell::Cell::new(0),
        })
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(SimulatedOracle::new(["a", "b"]))
        .build()
        .unwrap();

    let err = controller.step().unwrap_err();
    assert!(matches!(err, SummarizerError::Infeasible { .. }));
    assert_eq!(controller.state(), ControllerState::Failed);
    assert_eq!(controller.break_reason(), None);

    // no second oracle round for the same iteration
    assert_eq!(controller.step().unwrap_err(), SummarizerError::Terminated);
    assert_eq!(controller.recorder().len(), 1);
    assert!(controller.history().is_empty());
    assert_eq!(controller.iteration(), 0);
}

#[test]
fn test_empty_recommendation_falls_back_to_summary() {
    let config = fixed_config().with_feedback_mode(FeedbackMode::IlpFeedback);
    let mut controller = ControllerBuilder::new(config)
        .with_corpus(corpus())
        .default_solver()
        .default_scorer()
        .baseline_feedback_store()
        .with_oracle(ScriptedOracle::new(vec![(vec!["a", "b", "c", "d", "e"], vec![])]))
        .build()
        .unwrap();

    controller.step().unwrap();

    // every concept is labelled, so the recommendation problem only penalizes
    let problem = controller.recommendation_problem();
    assert!(problem.terms.iter().all(|t| t.feedback && t.coefficient < 0.0));
    assert!(!controller.summary_ids().is_empty());
    assert_eq!(controller.recommended_sentences(), controller.summary_ids());
    assert!(controller.recommendations().is_empty());
}

/// Reports one concept the corpus does not contain
struct LeakyStore(BaselineFeedbackStore);

impl FeedbackStore for LeakyStore {
    fn add_sentences(&mut self, corpus: &Corpus, weights: &ConceptWeights, max_weight: f64) {
        self.0.add_sentences(corpus, weights, max_weight);
    }

    fn incorporate_feedback(&mut self, recorder: &FlightRecorder) {
        self.0.incorporate_feedback(recorder);
    }

    fn weights(&self) -> Vec<(String, f64)> {
        let mut weights = self.0.weights();
        weights.push(("zeta".to_string(), 0.5));
        weights
    }

    fn config(&self) -> serde_json::Value {
        self.0.config()
    }
}

#[derive(Clone, Default)]
struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_unknown_store_concept_is_logged_and_skipped() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("feedback_summarizer=debug"))
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut controller = ControllerBuilder::new(fixed_config())
            .with_corpus(corpus())
            .default_solver()
            .default_scorer()
            .with_feedback_store(LeakyStore(BaselineFeedbackStore::new(FeedbackMode::AcceptReject)))
            .with_oracle(ScriptedOracle::new(vec![(vec!["a"], vec![])]))
            .build()
            .unwrap();
        controller.step().unwrap();
        assert_eq!(controller.weights().try_get("zeta"), None);
        assert_eq!(controller.weights().get("a"), 3.0);
    });

    let output = logs.contents();
    assert!(output.contains("ignoring unknown concept"), "{output}");
    assert!(output.contains("concept=zeta"), "{output}");
    assert!(output.contains("controller initialized"), "{output}");
}
