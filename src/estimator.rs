use rand::Rng;

use crate::formula::ClauseMatrix;
use crate::lp::{self, LpSolver, MinilpSolver};
use crate::prelude::*;

use self::aggregate::{aggregate, BoundResult, UpperBoundPolicy};
use self::relaxation::RelaxationModel;
use self::rounding::RoundingEngine;

pub mod aggregate;
pub mod relaxation;
pub mod rounding;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "Cannot relax a formula with {} variables and {} clauses",
        num_variables,
        num_clauses
    ))]
    EmptyFormula {
        num_variables: usize,
        num_clauses: usize,
    },
    #[snafu(display("Number of rounding trials must be positive, got {}", trials))]
    InvalidTrialCount { trials: usize },
    #[snafu(display("Expected {} variable values, got {}", expected, found))]
    ProbabilityCountMismatch { expected: usize, found: usize },
    #[snafu(display("Failed to solve the linear relaxation"))]
    Solver { source: lp::Error },
    #[snafu(display(
        "Upper bound {} (objective {}) is below the constructive lower bound {}",
        upper_bound,
        objective,
        lower_bound
    ))]
    InconsistentBounds {
        lower_bound: usize,
        upper_bound: usize,
        objective: f64,
    },
}

/// Relax, solve, round and aggregate, for one formula at a time.
#[derive(Debug, Clone)]
pub struct BoundEstimator<S = MinilpSolver> {
    solver: S,
    rounding: RoundingEngine,
    policy: UpperBoundPolicy,
}

impl BoundEstimator<MinilpSolver> {
    pub fn new(trials: usize) -> Result<Self, Error> {
        Ok(BoundEstimator::with_solver(
            MinilpSolver,
            RoundingEngine::new(trials)?,
        ))
    }
}

impl Default for BoundEstimator<MinilpSolver> {
    fn default() -> Self {
        BoundEstimator::with_solver(MinilpSolver, RoundingEngine::default())
    }
}

impl<S: LpSolver> BoundEstimator<S> {
    pub fn with_solver(solver: S, rounding: RoundingEngine) -> Self {
        BoundEstimator {
            solver,
            rounding,
            policy: UpperBoundPolicy::default(),
        }
    }

    pub fn policy(mut self, policy: UpperBoundPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rounding(&self) -> &RoundingEngine {
        &self.rounding
    }

    /// Computes both bounds for `matrix`, drawing every random variate from `rng`.
    pub fn estimate<R: Rng>(
        &self,
        matrix: &ClauseMatrix,
        rng: &mut R,
    ) -> Result<BoundResult, Error> {
        debug!("Estimating bounds for\n{}", matrix);

        let model = RelaxationModel::formulate(matrix)?;
        let solution = self.solver.solve(&model).context(Solver)?;
        debug!("Relaxation objective is {}", solution.objective());

        let probabilities = model.variable_values(solution.columns());
        let outcome = self.rounding.round(matrix, probabilities, rng)?;

        aggregate(
            self.policy,
            solution.objective(),
            matrix.num_clauses(),
            outcome,
        )
    }
}
