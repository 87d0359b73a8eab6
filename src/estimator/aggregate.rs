use std::fmt::{self, Display};

use super::{rounding::RoundingOutcome, Error, InconsistentBounds};
use crate::formula::Assignment;
use crate::prelude::*;

/// Bounds on the maximum number of simultaneously satisfiable clauses.
/// Invariant: `lower_bound <= upper_bound <= num_clauses`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundResult {
    lower_bound: usize,
    upper_bound: usize,
    best_assignment: Assignment,
}

impl BoundResult {
    pub fn lower_bound(&self) -> usize {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> usize {
        self.upper_bound
    }

    /// The assignment satisfying exactly `lower_bound` clauses.
    pub fn best_assignment(&self) -> &Assignment {
        &self.best_assignment
    }
}

impl Display for BoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Between {} and {} clauses can be satisfied simultaneously.",
            self.lower_bound, self.upper_bound
        )?;
        write!(f, "Best found assignment: {}", self.best_assignment)
    }
}

/// Turns the real LP optimum into an integral upper bound.
///
/// The integer optimum never exceeds the LP optimum, so rounding down is
/// sound. Rounding to nearest is not and is deliberately not offered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperBoundPolicy {
    /// Slack added before flooring so that `1.9999999997` still yields `2`.
    pub tolerance: f64,
}

impl UpperBoundPolicy {
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;

    pub fn apply(&self, objective: f64, num_clauses: usize) -> usize {
        let floored = (objective + self.tolerance).floor();
        if floored <= 0.0 {
            0
        } else if floored >= num_clauses as f64 {
            num_clauses
        } else {
            floored as usize
        }
    }
}

impl Default for UpperBoundPolicy {
    fn default() -> Self {
        UpperBoundPolicy {
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// Combines the LP objective and the best rounding trial.
pub fn aggregate(
    policy: UpperBoundPolicy,
    objective: f64,
    num_clauses: usize,
    outcome: RoundingOutcome,
) -> Result<BoundResult, Error> {
    let upper_bound = policy.apply(objective, num_clauses);
    let lower_bound = outcome.satisfied();

    ensure!(
        lower_bound <= upper_bound,
        InconsistentBounds {
            lower_bound,
            upper_bound,
            objective,
        }
    );

    Ok(BoundResult {
        lower_bound,
        upper_bound,
        best_assignment: outcome.into_assignment(),
    })
}
