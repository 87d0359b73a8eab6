use std::{
    convert::TryFrom,
    fs,
    path::{Path, PathBuf},
};

use crate::formula::{ClauseIdx, ClauseMatrix, Literal, MatrixError, Variable};
use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("I/O error occurred while reading CNF file '{}'", path.display()))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Problem line 'p cnf <num_variables> <num_clauses>' is not found"))]
    MissingProblemLine,
    #[snafu(display("Only one problem line is allowed, found another on line {}", line))]
    DuplicateProblemLine { line: usize },
    #[snafu(display("Failed to parse problem line '{}'", text))]
    MalformedProblemLine { text: String },
    #[snafu(display(
        "Number of variables ({}) and clauses ({}) need to be positive",
        num_variables,
        num_clauses
    ))]
    NonPositiveSize { num_variables: i64, num_clauses: i64 },
    #[snafu(display("Problem line declares an instance that is too large"))]
    InstanceTooLarge { source: MatrixError },
    #[snafu(display("Clause on line {} appears before the problem line", line))]
    ClauseBeforeProblemLine { line: usize },
    #[snafu(display("Failed to parse '{}' on line {} as a literal", token, line))]
    MalformedLiteral {
        token: String,
        line: usize,
        source: std::num::ParseIntError,
    },
    #[snafu(display(
        "Illegal variable {} on line {} (must be within 1 to {})",
        value,
        line,
        num_variables
    ))]
    LiteralOutOfRange {
        value: i64,
        line: usize,
        num_variables: usize,
    },
    #[snafu(display("Clause on line {} is not terminated by 0", line))]
    UnterminatedClause { line: usize },
    #[snafu(display("Could not store the clause on line {}", line))]
    InvalidClause { line: usize, source: MatrixError },
    #[snafu(display("More than {} clauses in the file (line {})", expected, line))]
    TooManyClauses { expected: usize, line: usize },
    #[snafu(display(
        "The number of clauses ({}) does not match the clauses number in the problem definition ({})",
        found,
        expected,
    ))]
    ClauseCountMismatch { expected: usize, found: usize },
}

/// Parses the `p cnf <num_variables> <num_clauses>` line.
fn parse_problem_line(line: &str) -> Result<(usize, usize), Error> {
    let splitted = line.split_whitespace().collect::<Vec<_>>();

    // We only support CNF DIMACS format
    ensure!(
        splitted.len() == 4 && splitted[0] == "p" && splitted[1] == "cnf",
        MalformedProblemLine { text: line }
    );

    let (num_variables, num_clauses) =
        match (splitted[2].parse::<i64>(), splitted[3].parse::<i64>()) {
            (Ok(num_variables), Ok(num_clauses)) => (num_variables, num_clauses),
            _ => return MalformedProblemLine { text: line }.fail(),
        };

    ensure!(
        num_variables > 0 && num_clauses > 0,
        NonPositiveSize {
            num_variables,
            num_clauses,
        }
    );

    match (usize::try_from(num_variables), usize::try_from(num_clauses)) {
        (Ok(num_variables), Ok(num_clauses)) if num_variables <= Variable::MAX_VARIABLE_ID => {
            Ok((num_variables, num_clauses))
        }
        _ => MalformedProblemLine { text: line }.fail(),
    }
}

/// Parses one clause line into row `clause` of `matrix`.
/// Tokens after the terminating `0` are ignored.
fn parse_clause(
    text: &str,
    line: usize,
    clause: ClauseIdx,
    matrix: &mut ClauseMatrix,
) -> Result<(), Error> {
    let num_variables = matrix.num_variables();

    for token in text.split_whitespace() {
        let value = token.parse::<i64>().context(MalformedLiteral { token, line })?;
        if value == 0 {
            return Ok(());
        }

        let literal = Literal::from_dimacs(value)
            .filter(|literal| literal.variable().as_index() < num_variables)
            .context(LiteralOutOfRange {
                value,
                line,
                num_variables,
            })?;
        trace!("Have variable {} in {}", literal, clause);

        matrix.set(clause, literal).context(InvalidClause { line })?;
    }

    UnterminatedClause { line }.fail()
}

/// Parses a CNF formula in DIMACS format.
///
/// Rows are allocated as clauses are read, so a problem line that overstates
/// the clause count ends in `ClauseCountMismatch` rather than a huge allocation.
pub fn parse_str(input: &str) -> Result<ClauseMatrix, Error> {
    // matrix read so far, with the clause count declared by the problem line
    let mut problem: Option<(ClauseMatrix, usize)> = None;

    for (index, text) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = text.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('c') {
            trace!("Ignoring comment line {}", line);
            continue;
        }
        if trimmed.starts_with('p') {
            ensure!(problem.is_none(), DuplicateProblemLine { line });

            let (num_variables, num_clauses) = parse_problem_line(trimmed)?;
            debug!(
                "Reading instance with {} variables and {} clauses",
                num_variables, num_clauses
            );
            ClauseMatrix::check_size(num_variables, num_clauses).context(InstanceTooLarge)?;
            let matrix = ClauseMatrix::new(num_variables, 0).context(InstanceTooLarge)?;
            problem = Some((matrix, num_clauses));
            continue;
        }

        let (matrix, expected) = problem
            .as_mut()
            .context(ClauseBeforeProblemLine { line })?;
        let expected = *expected;
        ensure!(
            matrix.num_clauses() < expected,
            TooManyClauses { expected, line }
        );

        let clause = matrix.add_clause().context(InstanceTooLarge)?;
        parse_clause(trimmed, line, clause, matrix)?;
    }

    let (matrix, expected) = problem.context(MissingProblemLine)?;
    ensure!(
        matrix.num_clauses() == expected,
        ClauseCountMismatch {
            expected,
            found: matrix.num_clauses(),
        }
    );

    Ok(matrix)
}

/// Parses a CNF formula from a file
pub fn parse_file(path: impl AsRef<Path>) -> Result<ClauseMatrix, Error> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).context(IoError {
        path: path.to_owned(),
    })?;

    parse_str(&input)
}
