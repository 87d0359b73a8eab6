/*!
A module to represent a CNF formula as a dense clause/variable matrix.
*/

use std::{
    convert::TryInto,
    fmt::{self, Display},
    num::NonZeroU32,
    ops::Index,
};

use typed_index_collections::TiVec;

use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum MatrixError {
    #[snafu(display("{} does not exist (formula has {} clauses)", clause, num_clauses))]
    ClauseOutOfRange { clause: ClauseIdx, num_clauses: usize },
    #[snafu(display(
        "{} is out of range (formula has {} variables)",
        variable,
        num_variables
    ))]
    VariableOutOfRange {
        variable: Variable,
        num_variables: usize,
    },
    #[snafu(display(
        "A formula with {} variables and {} clauses exceeds {} matrix cells",
        num_variables,
        num_clauses,
        ClauseMatrix::MAX_CELLS
    ))]
    TooLarge {
        num_variables: usize,
        num_clauses: usize,
    },
    #[snafu(display("{} is not a valid literal", value))]
    InvalidLiteral { value: i64 },
    #[snafu(display("{} appears more than once in {}", variable, clause))]
    DuplicateVariable { variable: Variable, clause: ClauseIdx },
}

/// Newtype wrapper for variable ID.
/// Invariant: 0 < ID <= MAX_VARIABLE_ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Variable(NonZeroU32);

impl Variable {
    pub const MAX_VARIABLE_ID: usize = std::u32::MAX as usize;

    pub fn as_index(&self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Creates a variable from a raw index.
    /// Returns `None` if the index is invalid.
    pub fn from_index(index: usize) -> Option<Self> {
        let id = index.checked_add(1)?;
        if id > Variable::MAX_VARIABLE_ID {
            return None;
        }
        Some(Variable(NonZeroU32::new(id.try_into().ok()?)?))
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    variable: Variable,
    positive: bool,
}

impl Literal {
    pub fn new(variable: Variable, positive: bool) -> Self {
        Literal { variable, positive }
    }

    /// Converts a signed DIMACS literal. Zero is the clause terminator, not a literal.
    pub fn from_dimacs(value: i64) -> Option<Self> {
        let magnitude: usize = value.checked_abs()?.try_into().ok()?;
        let variable = Variable::from_index(magnitude.checked_sub(1)?)?;
        Some(Literal::new(variable, value > 0))
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    pub fn positive(&self) -> bool {
        self.positive
    }

    pub fn state(&self) -> LiteralState {
        if self.positive {
            LiteralState::Positive
        } else {
            LiteralState::Negated
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.variable)
        } else {
            write!(f, "NOT({})", self.variable)
        }
    }
}

/// How a variable occurs in one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralState {
    Negated,
    Absent,
    Positive,
}

impl LiteralState {
    /// Whether this occurrence is true under `value`. `Absent` is never true.
    pub fn is_true_under(self, value: bool) -> bool {
        match self {
            LiteralState::Negated => !value,
            LiteralState::Positive => value,
            LiteralState::Absent => false,
        }
    }
}

impl Default for LiteralState {
    fn default() -> Self {
        LiteralState::Absent
    }
}

/// Zero-based clause index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClauseIdx(usize);

impl From<usize> for ClauseIdx {
    fn from(index: usize) -> Self {
        ClauseIdx(index)
    }
}

impl From<ClauseIdx> for usize {
    fn from(index: ClauseIdx) -> Self {
        index.0
    }
}

impl Display for ClauseIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clause {}", self.0 + 1)
    }
}

/// Dense clause by variable matrix. Row = clause, column = variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseMatrix {
    num_variables: usize,
    rows: TiVec<ClauseIdx, Vec<LiteralState>>,
}

impl ClauseMatrix {
    /// Upper limit on `num_variables * num_clauses`, one byte per cell.
    pub const MAX_CELLS: usize = 1 << 28;

    /// Fails unless a matrix of this size fits in [`MAX_CELLS`](Self::MAX_CELLS).
    pub fn check_size(num_variables: usize, num_clauses: usize) -> Result<(), MatrixError> {
        ensure!(
            num_variables <= Variable::MAX_VARIABLE_ID
                && num_variables
                    .checked_mul(num_clauses)
                    .map_or(false, |cells| cells <= Self::MAX_CELLS),
            TooLarge {
                num_variables,
                num_clauses,
            }
        );
        Ok(())
    }

    /// Creates a matrix where every cell is `Absent`.
    pub fn new(num_variables: usize, num_clauses: usize) -> Result<Self, MatrixError> {
        Self::check_size(num_variables, num_clauses)?;

        Ok(ClauseMatrix {
            num_variables,
            rows: (0..num_clauses)
                .map(|_| vec![LiteralState::Absent; num_variables])
                .collect(),
        })
    }

    /// Appends an empty clause and returns its index.
    pub fn add_clause(&mut self) -> Result<ClauseIdx, MatrixError> {
        Self::check_size(self.num_variables, self.num_clauses() + 1)?;
        let clause = ClauseIdx::from(self.rows.len());
        self.rows.push(vec![LiteralState::Absent; self.num_variables]);
        Ok(clause)
    }

    /// Builds a matrix from DIMACS-style signed literals, one inner sequence per clause.
    pub fn from_clauses<C, L>(num_variables: usize, clauses: C) -> Result<Self, MatrixError>
    where
        C: IntoIterator<Item = L>,
        L: IntoIterator<Item = i64>,
    {
        let clauses: Vec<Vec<i64>> = clauses
            .into_iter()
            .map(|clause| clause.into_iter().collect())
            .collect();

        let mut matrix = ClauseMatrix::new(num_variables, clauses.len())?;
        for (index, clause) in clauses.into_iter().enumerate() {
            for value in clause {
                let literal = Literal::from_dimacs(value).context(InvalidLiteral { value })?;
                matrix.set(ClauseIdx::from(index), literal)?;
            }
        }

        Ok(matrix)
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_clauses(&self) -> usize {
        self.rows.len()
    }

    pub fn clauses(&self) -> impl Iterator<Item = ClauseIdx> {
        (0..self.rows.len()).map(ClauseIdx::from)
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> {
        (0..self.num_variables).filter_map(Variable::from_index)
    }

    /// Returns the whole row of a clause, `None` if the clause does not exist.
    pub fn row(&self, clause: ClauseIdx) -> Option<&[LiteralState]> {
        self.rows.get(clause).map(|row| row.as_slice())
    }

    pub fn get(&self, clause: ClauseIdx, variable: Variable) -> Option<LiteralState> {
        self.row(clause)?.get(variable.as_index()).copied()
    }

    /// Records `literal` in `clause`. A variable may occur at most once per clause.
    pub fn set(&mut self, clause: ClauseIdx, literal: Literal) -> Result<(), MatrixError> {
        let num_clauses = self.num_clauses();
        let num_variables = self.num_variables;
        let variable = literal.variable();

        let row = self
            .rows
            .get_mut(clause)
            .context(ClauseOutOfRange {
                clause,
                num_clauses,
            })?;
        let cell = row.get_mut(variable.as_index()).context(VariableOutOfRange {
            variable,
            num_variables,
        })?;

        ensure!(
            *cell == LiteralState::Absent,
            DuplicateVariable { variable, clause }
        );
        *cell = literal.state();

        Ok(())
    }

    /// Non-absent entries of a clause, in variable order.
    pub fn literals(&self, clause: ClauseIdx) -> impl Iterator<Item = Literal> + '_ {
        self.row(clause)
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .filter_map(|(index, &state)| {
                let variable = Variable::from_index(index)?;
                match state {
                    LiteralState::Positive => Some(Literal::new(variable, true)),
                    LiteralState::Negated => Some(Literal::new(variable, false)),
                    LiteralState::Absent => None,
                }
            })
    }

    /// Whether `assignment` satisfies `clause`.
    /// A clause without literals, or one that does not exist, is never satisfied.
    pub fn is_satisfied(&self, clause: ClauseIdx, assignment: &Assignment) -> bool {
        debug_assert_eq!(assignment.len(), self.num_variables);

        match self.row(clause) {
            Some(row) => row
                .iter()
                .zip(assignment.values())
                .any(|(state, &value)| state.is_true_under(value)),
            None => false,
        }
    }

    pub fn count_satisfied(&self, assignment: &Assignment) -> usize {
        self.clauses()
            .filter(|&clause| self.is_satisfied(clause, assignment))
            .count()
    }
}

impl Index<(ClauseIdx, Variable)> for ClauseMatrix {
    type Output = LiteralState;

    fn index(&self, (clause, variable): (ClauseIdx, Variable)) -> &Self::Output {
        &self.rows[clause][variable.as_index()]
    }
}

impl Display for ClauseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for clause in self.clauses() {
            write!(f, "Clause {}:", usize::from(clause) + 1)?;

            let mut iter = self.literals(clause);
            if let Some(first) = iter.next() {
                write!(f, " {}", first)?;
            }
            for literal in iter {
                write!(f, " OR {}", literal)?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}

/// One binary value per formula variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn new(values: Vec<bool>) -> Self {
        Assignment { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    pub fn value(&self, variable: Variable) -> Option<bool> {
        self.values.get(variable.as_index()).copied()
    }
}

/// Renders one `0`/`1` character per variable.
impl Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &value in &self.values {
            write!(f, "{}", if value { '1' } else { '0' })?;
        }

        Ok(())
    }
}
