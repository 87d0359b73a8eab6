use rand::Rng;

use super::{Error, InvalidTrialCount, ProbabilityCountMismatch};
use crate::formula::{Assignment, ClauseMatrix};
use crate::prelude::*;

/// Best candidate found by [`RoundingEngine::round`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundingOutcome {
    assignment: Assignment,
    satisfied: usize,
    trial: usize,
}

impl RoundingOutcome {
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn into_assignment(self) -> Assignment {
        self.assignment
    }

    /// Number of clauses satisfied by the assignment.
    pub fn satisfied(&self) -> usize {
        self.satisfied
    }

    /// Zero-based index of the trial that produced the assignment.
    pub fn trial(&self) -> usize {
        self.trial
    }
}

/// Randomized rounding of fractional variable values into candidate assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundingEngine {
    trials: usize,
}

impl RoundingEngine {
    pub const DEFAULT_TRIALS: usize = 10;

    pub fn new(trials: usize) -> Result<Self, Error> {
        ensure!(trials > 0, InvalidTrialCount { trials });
        Ok(RoundingEngine { trials })
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Runs the trials and keeps the first candidate with the highest score.
    ///
    /// Every trial draws exactly one variate per variable, so the random
    /// stream consumed only depends on the formula size and the trial count.
    pub fn round<R: Rng>(
        &self,
        matrix: &ClauseMatrix,
        probabilities: &[f64],
        rng: &mut R,
    ) -> Result<RoundingOutcome, Error> {
        ensure!(
            probabilities.len() == matrix.num_variables(),
            ProbabilityCountMismatch {
                expected: matrix.num_variables(),
                found: probabilities.len(),
            }
        );

        let mut best = Self::trial(0, matrix, probabilities, rng);
        for trial in 1..self.trials {
            let candidate = Self::trial(trial, matrix, probabilities, rng);
            if candidate.satisfied > best.satisfied {
                best = candidate;
            }
        }

        debug!(
            "Best of {} trials is trial {} with {} satisfied clauses",
            self.trials, best.trial, best.satisfied
        );
        Ok(best)
    }

    fn trial<R: Rng>(
        trial: usize,
        matrix: &ClauseMatrix,
        probabilities: &[f64],
        rng: &mut R,
    ) -> RoundingOutcome {
        let assignment = Assignment::new(
            probabilities
                .iter()
                .map(|&probability| flip_coin(rng, probability))
                .collect(),
        );
        let satisfied = matrix.count_satisfied(&assignment);
        trace!("Trial {}: {} satisfies {} clauses", trial, assignment, satisfied);

        RoundingOutcome {
            assignment,
            satisfied,
            trial,
        }
    }
}

impl Default for RoundingEngine {
    fn default() -> Self {
        RoundingEngine {
            trials: Self::DEFAULT_TRIALS,
        }
    }
}

/// Solver values can drift slightly outside `[0, 1]`; NaN counts as 0.
pub fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.max(0.0).min(1.0)
    }
}

/// Returns `true` with the given probability, drawing one variate in `[0, 1)`.
pub fn flip_coin<R: Rng>(rng: &mut R, probability: f64) -> bool {
    let variate: f64 = rng.gen();
    variate < clamp_probability(probability)
}
