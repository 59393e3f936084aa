//! Solver interface and the built-in branch-and-bound solver

use super::problem::CoverageProblem;
use thiserror::Error;
use tracing::trace;

/// Why a solve produced no selection
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveFailure {
    /// The budget admits no sentence
    #[error("no feasible selection within the budget")]
    Infeasible,

    /// The search gave up before proving optimality
    #[error("node limit of {limit} exceeded")]
    NodeLimit { limit: usize },
}

/// An optimal selection
#[derive(Debug, Clone, PartialEq)]
pub struct IlpSolution {
    pub objective: f64,
    /// Selected sentence indices, ascending
    pub selected: Vec<usize>,
}

impl IlpSolution {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Exact solver for [`CoverageProblem`]s.
///
/// Implementations either return an optimal selection or fail; they never
/// return a best-effort answer.
pub trait IlpSolver {
    fn solve(&self, problem: &CoverageProblem) -> Result<IlpSolution, SolveFailure>;

    fn name(&self) -> &'static str;
}

/// Depth-first branch and bound.
///
/// Sentences are explored best ratio first, "take" before "skip". A branch
/// is cut when its value plus every positive coefficient still reachable
/// within the remaining budget cannot beat the incumbent. Among equal
/// objectives the first selection found is kept.
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBoundSolver {
    node_limit: usize,
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new(5_000_000)
    }
}

impl BranchAndBoundSolver {
    pub fn new(node_limit: usize) -> Self {
        Self { node_limit }
    }

    pub fn node_limit(&self) -> usize {
        self.node_limit
    }
}

const EPSILON: f64 = 1e-9;

struct Search<'p> {
    problem: &'p CoverageProblem,
    order: Vec<usize>,
    covered: Vec<u32>,
    stamp: Vec<usize>,
    generation: usize,
    chosen: Vec<usize>,
    best: Option<(f64, Vec<usize>)>,
    nodes: usize,
    node_limit: usize,
}

impl<'p> Search<'p> {
    fn gain(&self, sentence: usize) -> f64 {
        self.problem.sentence_terms[sentence]
            .iter()
            .filter(|&&t| self.covered[t] == 0)
            .map(|&t| self.problem.terms[t].coefficient)
            .sum()
    }

    fn bound(&mut self, depth: usize, remaining: usize) -> f64 {
        self.generation += 1;
        let mut optimistic = 0.0;
        for &s in &self.order[depth..] {
            if self.problem.lengths[s] > remaining {
                continue;
            }
            for &t in &self.problem.sentence_terms[s] {
                let coefficient = self.problem.terms[t].coefficient;
                if coefficient > 0.0 && self.covered[t] == 0 && self.stamp[t] != self.generation {
                    self.stamp[t] = self.generation;
                    optimistic += coefficient;
                }
            }
        }
        optimistic
    }

    fn toggle(&mut self, sentence: usize, take: bool) {
        for &t in &self.problem.sentence_terms[sentence] {
            if take {
                self.covered[t] += 1;
            } else {
                self.covered[t] -= 1;
            }
        }
    }

    fn explore(&mut self, depth: usize, value: f64, remaining: usize) -> Result<(), SolveFailure> {
        self.nodes += 1;
        if self.nodes > self.node_limit {
            return Err(SolveFailure::NodeLimit {
                limit: self.node_limit,
            });
        }

        if depth == self.order.len() {
            let improves = match &self.best {
                None => true,
                Some((best, _)) => value > best + EPSILON,
            };
            if improves {
                self.best = Some((value, self.chosen.clone()));
            }
            return Ok(());
        }

        let incumbent = self.best.as_ref().map(|(best, _)| *best);
        if let Some(best) = incumbent {
            if value + self.bound(depth, remaining) <= best + EPSILON {
                return Ok(());
            }
        }

        let sentence = self.order[depth];
        let length = self.problem.lengths[sentence];
        if length <= remaining {
            let gain = self.gain(sentence);
            self.toggle(sentence, true);
            self.chosen.push(sentence);
            let result = self.explore(depth + 1, value + gain, remaining - length);
            self.chosen.pop();
            self.toggle(sentence, false);
            result?;
        }
        self.explore(depth + 1, value, remaining)
    }
}

impl IlpSolver for BranchAndBoundSolver {
    fn solve(&self, problem: &CoverageProblem) -> Result<IlpSolution, SolveFailure> {
        let ratio = |s: usize| -> f64 {
            let positive: f64 = problem.sentence_terms[s]
                .iter()
                .map(|&t| problem.terms[t].coefficient.max(0.0))
                .sum();
            positive / problem.lengths[s].max(1) as f64
        };

        let mut order: Vec<usize> = (0..problem.sentence_count())
            .filter(|&s| problem.lengths[s] <= problem.budget)
            .collect();
        if order.is_empty() {
            return Err(SolveFailure::Infeasible);
        }
        order.sort_by(|&a, &b| ratio(b).total_cmp(&ratio(a)).then(a.cmp(&b)));

        let mut search = Search {
            problem,
            order,
            covered: vec![0; problem.concept_count()],
            stamp: vec![0; problem.concept_count()],
            generation: 0,
            chosen: Vec::new(),
            best: None,
            nodes: 0,
            node_limit: self.node_limit,
        };
        search.explore(0, 0.0, problem.budget)?;
        trace!(nodes = search.nodes, kind = %problem.kind, "branch and bound finished");

        let (_, mut selected) = search.best.ok_or(SolveFailure::Infeasible)?;
        selected.sort_unstable();
        Ok(IlpSolution {
            objective: problem.evaluate(&selected),
            selected,
        })
    }

    fn name(&self) -> &'static str {
        "branch_and_bound"
    }
}
