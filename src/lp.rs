/*!
Seam between the relaxation model and a linear programming backend.
*/

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

use crate::estimator::relaxation::RelaxationModel;
use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Linear programming backend failed: {}", message))]
    Backend { message: String },
    #[snafu(display("Solver returned a non-finite objective value ({})", value))]
    NonFiniteObjective { value: f64 },
    #[snafu(display("Solver returned {} column values, model has {}", found, expected))]
    ColumnCountMismatch { expected: usize, found: usize },
}

/// Optimal objective and primal column values, in model column order.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    objective: f64,
    columns: Vec<f64>,
}

impl LpSolution {
    /// Validates a raw backend answer against the model it was computed for.
    pub fn new(model: &RelaxationModel, objective: f64, columns: Vec<f64>) -> Result<Self, Error> {
        ensure!(objective.is_finite(), NonFiniteObjective { value: objective });
        ensure!(
            columns.len() == model.num_columns(),
            ColumnCountMismatch {
                expected: model.num_columns(),
                found: columns.len(),
            }
        );

        Ok(LpSolution { objective, columns })
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn columns(&self) -> &[f64] {
        &self.columns
    }
}

pub trait LpSolver {
    /// Solves the continuous relaxation to optimality.
    /// Anything short of an optimal answer is an error.
    fn solve(&self, model: &RelaxationModel) -> Result<LpSolution, Error>;
}

/// Simplex backend provided by `minilp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinilpSolver;

impl LpSolver for MinilpSolver {
    fn solve(&self, model: &RelaxationModel) -> Result<LpSolution, Error> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);

        let vars = model
            .columns()
            .iter()
            .map(|column| problem.add_var(column.objective, (column.lower, column.upper)))
            .collect::<Vec<_>>();

        for row in model.rows() {
            let mut expr = LinearExpr::empty();
            for &(column, coefficient) in row.coefficients() {
                expr.add(vars[column], coefficient);
            }
            problem.add_constraint(expr, ComparisonOp::Le, row.upper());
        }

        let solution = problem.solve().map_err(|e| {
            Backend {
                message: e.to_string(),
            }
            .build()
        })?;
        trace!("minilp finished with objective {}", solution.objective());

        let columns = vars.iter().map(|&var| solution[var]).collect();
        LpSolution::new(model, solution.objective(), columns)
    }
}
