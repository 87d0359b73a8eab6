//! Linear relaxation of MAX-SAT over a clause matrix.
//!
//! Columns `0..n` are the variables `x_1..x_n`, columns `n..n+m` the clause
//! indicators `z_1..z_m`. Every column is bounded to `[0, 1]` and only the
//! indicators carry an objective coefficient. The objective is maximized.
//! Row `c` encodes
//!
//! ```text
//! z_c - sum_{v in P(c)} x_v + sum_{v in N(c)} x_v <= |N(c)|
//! ```

use typed_index_collections::TiVec;

use super::{EmptyFormula, Error};
use crate::formula::{ClauseIdx, ClauseMatrix, LiteralState};
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub lower: f64,
    pub upper: f64,
    pub objective: f64,
}

impl Column {
    fn unit(objective: f64) -> Self {
        Column {
            lower: 0.0,
            upper: 1.0,
            objective,
        }
    }
}

/// A `<=` row. Coefficients that are zero are not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    coefficients: Vec<(usize, f64)>,
    upper: f64,
}

impl Row {
    /// `(column, coefficient)` pairs in increasing column order.
    pub fn coefficients(&self) -> &[(usize, f64)] {
        &self.coefficients
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn coefficient(&self, column: usize) -> f64 {
        self.coefficients
            .iter()
            .find(|&&(c, _)| c == column)
            .map_or(0.0, |&(_, coefficient)| coefficient)
    }
}

/// Maximization model handed to an [`LpSolver`](crate::lp::LpSolver).
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationModel {
    num_variables: usize,
    columns: Vec<Column>,
    rows: TiVec<ClauseIdx, Row>,
}

impl RelaxationModel {
    /// Builds the relaxation of `matrix`. A formula without variables or
    /// without clauses is rejected instead of producing a degenerate model.
    pub fn formulate(matrix: &ClauseMatrix) -> Result<Self, Error> {
        let num_variables = matrix.num_variables();
        let num_clauses = matrix.num_clauses();
        ensure!(
            num_variables > 0 && num_clauses > 0,
            EmptyFormula {
                num_variables,
                num_clauses,
            }
        );

        let columns = std::iter::repeat(Column::unit(0.0))
            .take(num_variables)
            .chain(std::iter::repeat(Column::unit(1.0)).take(num_clauses))
            .collect();

        let rows = matrix
            .clauses()
            .map(|clause| {
                let mut negated = 0usize;
                let mut coefficients = Vec::new();

                for (column, &state) in matrix.row(clause).unwrap_or(&[]).iter().enumerate() {
                    match state {
                        LiteralState::Positive => coefficients.push((column, -1.0)),
                        LiteralState::Negated => {
                            negated += 1;
                            coefficients.push((column, 1.0));
                        }
                        LiteralState::Absent => (),
                    }
                }
                coefficients.push((num_variables + usize::from(clause), 1.0));

                Row {
                    coefficients,
                    upper: negated as f64,
                }
            })
            .collect();

        Ok(RelaxationModel {
            num_variables,
            columns,
            rows,
        })
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_clauses(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn row(&self, clause: ClauseIdx) -> Option<&Row> {
        self.rows.get(clause)
    }

    /// Column of the indicator `z_c`.
    pub fn indicator_column(&self, clause: ClauseIdx) -> usize {
        self.num_variables + usize::from(clause)
    }

    /// The `x` part of a column vector in this model's layout.
    pub fn variable_values<'a>(&self, columns: &'a [f64]) -> &'a [f64] {
        &columns[..self.num_variables.min(columns.len())]
    }
}
