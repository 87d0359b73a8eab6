use paste::paste;
use rand::{rngs::mock::StepRng, rngs::StdRng, SeedableRng};

use crate::{
    config::{self, Config},
    estimator::{
        aggregate::{BoundResult, UpperBoundPolicy},
        relaxation::RelaxationModel,
        rounding::{clamp_probability, RoundingEngine},
        BoundEstimator, Error,
    },
    formula::{Assignment, ClauseIdx, ClauseMatrix, Literal, LiteralState, MatrixError, Variable},
    lp::{self, LpSolution, LpSolver},
    parser::{self, parse_file, parse_str},
    report::Report,
    run::{self, estimate_paths},
};

const SEED: u64 = 0x5a7b_0d5;

/// Counts satisfied clauses literal by literal, without going through the matrix rows.
fn independent_count(matrix: &ClauseMatrix, assignment: &Assignment) -> usize {
    matrix
        .clauses()
        .filter(|&clause| {
            matrix.literals(clause).any(|literal| {
                assignment.value(literal.variable()) == Some(literal.positive())
            })
        })
        .count()
}

fn check_invariants(matrix: &ClauseMatrix, result: &BoundResult) {
    assert!(result.lower_bound() <= result.upper_bound());
    assert!(result.upper_bound() <= matrix.num_clauses());
    assert_eq!(result.best_assignment().len(), matrix.num_variables());
    assert_eq!(
        independent_count(matrix, result.best_assignment()),
        result.lower_bound()
    );
}

fn estimate_file(path: &str) -> (ClauseMatrix, BoundResult) {
    let matrix = parse_file(path).unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);
    let result = BoundEstimator::default()
        .estimate(&matrix, &mut rng)
        .unwrap();
    check_invariants(&matrix, &result);
    (matrix, result)
}

fn var(id: usize) -> Variable {
    Variable::from_index(id - 1).unwrap()
}

macro_rules! bounds_testcase {
    ($name:ident) => {
        paste! {
            #[test]
            fn [< bounds_ $name >]() {
                estimate_file(concat!("testcases/bounds/", stringify!($name), ".cnf"));
            }
        }
    };
    ($name:ident, $lower:expr, $upper:expr) => {
        paste! {
            #[test]
            fn [< bounds_ $name >]() {
                let (_, result) =
                    estimate_file(concat!("testcases/bounds/", stringify!($name), ".cnf"));
                assert_eq!(result.lower_bound(), $lower);
                assert_eq!(result.upper_bound(), $upper);
            }
        }
    };
}

macro_rules! malformed_testcase {
    ($name:ident, $pattern:pat) => {
        paste! {
            #[test]
            fn [< malformed_ $name >]() {
                let result = parse_file(
                    concat!("testcases/malformed/", stringify!($name), ".cnf")
                );
                assert!(matches!(result, Err($pattern)), "{:?}", result);
            }
        }
    };
}

bounds_testcase!(repeated_units, 4, 4);
bounds_testcase!(contradictory_units, 1, 1);
bounds_testcase!(two_clauses, 2, 2);
bounds_testcase!(empty_clause, 1, 1);
bounds_testcase!(all_pairs, 3, 4);
bounds_testcase!(trailing_tokens, 2, 2);
bounds_testcase!(random3);
bounds_testcase!(tight_triangle);

malformed_testcase!(missing_header, parser::Error::ClauseBeforeProblemLine { .. });
malformed_testcase!(duplicate_header, parser::Error::DuplicateProblemLine { line: 2 });
malformed_testcase!(bad_header, parser::Error::MalformedProblemLine { .. });
malformed_testcase!(zero_variables, parser::Error::NonPositiveSize { .. });
malformed_testcase!(clause_before_header, parser::Error::ClauseBeforeProblemLine { line: 1 });
malformed_testcase!(
    duplicate_variable,
    parser::Error::InvalidClause {
        source: MatrixError::DuplicateVariable { .. },
        ..
    }
);
malformed_testcase!(literal_out_of_range, parser::Error::LiteralOutOfRange { value: 3, .. });
malformed_testcase!(unterminated, parser::Error::UnterminatedClause { line: 2 });
malformed_testcase!(bad_token, parser::Error::MalformedLiteral { .. });
malformed_testcase!(too_many_clauses, parser::Error::TooManyClauses { expected: 1, .. });
malformed_testcase!(
    too_few_clauses,
    parser::Error::ClauseCountMismatch {
        expected: 3,
        found: 2
    }
);

#[test]
fn missing_file_is_io_error() {
    let result = parse_file("testcases/does_not_exist.cnf");
    assert!(matches!(result, Err(parser::Error::IoError { .. })));
}

#[test]
fn empty_input_has_no_problem_line() {
    assert!(matches!(
        parse_str("c nothing here\n"),
        Err(parser::Error::MissingProblemLine)
    ));
}

#[test]
fn oversized_problem_line_is_rejected() {
    let result = parse_str("p cnf 4000000 4000000\n1 0\n");
    assert!(matches!(
        result,
        Err(parser::Error::InstanceTooLarge {
            source: MatrixError::TooLarge { .. }
        })
    ));
}

#[test]
fn overstated_clause_count_does_not_allocate_up_front() {
    let result = parse_str("p cnf 2 100000000\n1 -2 0\n");
    assert!(matches!(
        result,
        Err(parser::Error::ClauseCountMismatch {
            expected: 100000000,
            found: 1
        })
    ));
}

#[test]
fn matrix_size_is_limited() {
    assert!(matches!(
        ClauseMatrix::new(1 << 20, 1 << 20),
        Err(MatrixError::TooLarge { .. })
    ));
    assert!(matches!(
        ClauseMatrix::new(Variable::MAX_VARIABLE_ID + 1, 0),
        Err(MatrixError::TooLarge { .. })
    ));
    assert!(matches!(
        ClauseMatrix::check_size(usize::MAX, 2),
        Err(MatrixError::TooLarge { .. })
    ));

    let mut matrix = ClauseMatrix::new(3, 0).unwrap();
    assert_eq!(matrix.add_clause().unwrap(), ClauseIdx::from(0));
    assert_eq!(matrix.add_clause().unwrap(), ClauseIdx::from(1));
    assert_eq!(matrix.num_clauses(), 2);
    assert_eq!(matrix.literals(ClauseIdx::from(1)).count(), 0);
}

#[test]
fn parsed_matrix_renders_clauses() {
    let matrix = parse_str("p cnf 3 2\n1 2 0\n-2 3 0\n").unwrap();

    assert_eq!(matrix.num_variables(), 3);
    assert_eq!(matrix.num_clauses(), 2);
    assert_eq!(
        matrix.to_string(),
        "Clause 1: x1 OR x2\nClause 2: NOT(x2) OR x3\n"
    );
}

#[test]
fn matrix_accessors_are_bounds_checked() {
    let matrix = ClauseMatrix::from_clauses(2, vec![vec![1, -2]]).unwrap();

    assert_eq!(matrix.get(ClauseIdx::from(0), var(1)), Some(LiteralState::Positive));
    assert_eq!(matrix.get(ClauseIdx::from(0), var(2)), Some(LiteralState::Negated));
    assert_eq!(matrix[(ClauseIdx::from(0), var(2))], LiteralState::Negated);
    assert_eq!(matrix.get(ClauseIdx::from(1), var(1)), None);
    assert_eq!(matrix.get(ClauseIdx::from(0), var(3)), None);
}

#[test]
fn matrix_rejects_bad_literals() {
    let mut matrix = ClauseMatrix::new(2, 1).unwrap();
    let clause = ClauseIdx::from(0);

    matrix.set(clause, Literal::new(var(1), true)).unwrap();
    assert!(matches!(
        matrix.set(clause, Literal::new(var(1), false)),
        Err(MatrixError::DuplicateVariable { .. })
    ));
    assert!(matches!(
        matrix.set(clause, Literal::new(var(3), true)),
        Err(MatrixError::VariableOutOfRange { .. })
    ));
    assert!(matches!(
        matrix.set(ClauseIdx::from(1), Literal::new(var(2), true)),
        Err(MatrixError::ClauseOutOfRange { .. })
    ));
    assert!(matches!(
        ClauseMatrix::from_clauses(2, vec![vec![0]]),
        Err(MatrixError::InvalidLiteral { value: 0 })
    ));
}

#[test]
fn clause_without_literals_is_never_satisfied() {
    let matrix = ClauseMatrix::new(2, 1).unwrap();
    let clause = ClauseIdx::from(0);

    for values in &[[false, false], [false, true], [true, false], [true, true]] {
        let assignment = Assignment::new(values.to_vec());
        assert!(!matrix.is_satisfied(clause, &assignment));
        assert_eq!(matrix.count_satisfied(&assignment), 0);
    }
}

#[test]
fn assignment_renders_as_bits() {
    let assignment = Assignment::new(vec![true, false, false, true]);
    assert_eq!(assignment.to_string(), "1001");
    assert_eq!(assignment.value(var(4)), Some(true));
    assert_eq!(assignment.value(var(5)), None);
}

#[test]
fn relaxation_rows_follow_literal_signs() {
    let matrix = ClauseMatrix::from_clauses(3, vec![vec![1, 2], vec![-2, 3]]).unwrap();
    let model = RelaxationModel::formulate(&matrix).unwrap();

    assert_eq!(model.num_columns(), 5);
    for (index, column) in model.columns().iter().enumerate() {
        assert_eq!((column.lower, column.upper), (0.0, 1.0));
        let expected = if index < 3 { 0.0 } else { 1.0 };
        assert_eq!(column.objective, expected);
    }

    let first = model.row(ClauseIdx::from(0)).unwrap();
    assert_eq!(first.coefficients(), &[(0, -1.0), (1, -1.0), (3, 1.0)][..]);
    assert_eq!(first.upper(), 0.0);

    let second = model.row(ClauseIdx::from(1)).unwrap();
    assert_eq!(second.coefficients(), &[(1, 1.0), (2, -1.0), (4, 1.0)][..]);
    assert_eq!(second.coefficient(0), 0.0);
    assert_eq!(second.upper(), 1.0);
    assert_eq!(model.indicator_column(ClauseIdx::from(1)), 4);
}

#[test]
fn relaxation_is_deterministic() {
    let matrix = ClauseMatrix::from_clauses(3, vec![vec![-1, 2, -3], vec![3]]).unwrap();
    assert_eq!(
        RelaxationModel::formulate(&matrix).unwrap(),
        RelaxationModel::formulate(&matrix).unwrap()
    );
}

#[test]
fn relaxation_rejects_empty_formula() {
    for &(num_variables, num_clauses) in &[(0, 1), (1, 0), (0, 0)] {
        let matrix = ClauseMatrix::new(num_variables, num_clauses).unwrap();
        assert!(matches!(
            RelaxationModel::formulate(&matrix),
            Err(Error::EmptyFormula { .. })
        ));
    }
}

#[test]
fn probabilities_are_clamped() {
    assert_eq!(clamp_probability(1.0000001), 1.0);
    assert_eq!(clamp_probability(-1e-9), 0.0);
    assert_eq!(clamp_probability(f64::NAN), 0.0);
    assert_eq!(clamp_probability(0.25), 0.25);

    let matrix = ClauseMatrix::from_clauses(3, vec![vec![1, 2, 3]]).unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..20 {
        let outcome = RoundingEngine::default()
            .round(&matrix, &[1.0000001, -1e-9, f64::NAN], &mut rng)
            .unwrap();
        assert_eq!(outcome.assignment().values(), &[true, false, false][..]);
    }
}

#[test]
fn rounding_keeps_first_of_equal_scores() {
    // Every variate is 0.0, so each trial produces the same candidate.
    let matrix = ClauseMatrix::from_clauses(1, vec![vec![1]]).unwrap();
    let mut rng = StepRng::new(0, 0);

    let outcome = RoundingEngine::default()
        .round(&matrix, &[0.5], &mut rng)
        .unwrap();
    assert_eq!(outcome.trial(), 0);
    assert_eq!(outcome.satisfied(), 1);
}

#[test]
fn rounding_replaces_only_on_strict_improvement() {
    // Variates cycle through 0.0, 0.25, 0.5, 0.75, so x1 is false in trials 3 and 7.
    let matrix = ClauseMatrix::from_clauses(1, vec![vec![-1]]).unwrap();
    let mut rng = StepRng::new(0, 1 << 62);

    let outcome = RoundingEngine::default()
        .round(&matrix, &[0.6], &mut rng)
        .unwrap();
    assert_eq!(outcome.trial(), 3);
    assert_eq!(outcome.satisfied(), 1);
    assert_eq!(outcome.assignment().values(), &[false][..]);
}

#[test]
fn rounding_records_first_trial_even_without_satisfied_clauses() {
    let matrix = ClauseMatrix::from_clauses(1, vec![vec![1]]).unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);

    let outcome = RoundingEngine::new(3)
        .unwrap()
        .round(&matrix, &[0.0], &mut rng)
        .unwrap();
    assert_eq!(outcome.trial(), 0);
    assert_eq!(outcome.satisfied(), 0);
    assert_eq!(outcome.assignment().len(), 1);
}

#[test]
fn rounding_rejects_bad_input() {
    assert!(matches!(
        RoundingEngine::new(0),
        Err(Error::InvalidTrialCount { trials: 0 })
    ));

    let matrix = ClauseMatrix::from_clauses(2, vec![vec![1]]).unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);
    assert!(matches!(
        RoundingEngine::default().round(&matrix, &[0.5], &mut rng),
        Err(Error::ProbabilityCountMismatch {
            expected: 2,
            found: 1
        })
    ));
}

#[test]
fn estimate_is_reproducible_under_seed() {
    let matrix = parse_file("testcases/bounds/random3.cnf").unwrap();
    let estimator = BoundEstimator::default();

    let first = estimator
        .estimate(&matrix, &mut StdRng::seed_from_u64(SEED))
        .unwrap();
    let second = estimator
        .estimate(&matrix, &mut StdRng::seed_from_u64(SEED))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn estimate_shares_one_generator_across_formulas() {
    let matrix = parse_file("testcases/bounds/all_pairs.cnf").unwrap();
    let estimator = BoundEstimator::new(1).unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);

    for _ in 0..5 {
        let result = estimator.estimate(&matrix, &mut rng).unwrap();
        check_invariants(&matrix, &result);
        assert_eq!(result.lower_bound(), 3);
    }
}

#[test]
fn bound_result_renders_like_the_report_line() {
    let (_, result) = estimate_file("testcases/bounds/repeated_units.cnf");
    assert_eq!(
        result.to_string(),
        "Between 4 and 4 clauses can be satisfied simultaneously.\nBest found assignment: 1"
    );
}

#[test]
fn upper_bound_policy_never_rounds_up() {
    let policy = UpperBoundPolicy::default();

    assert_eq!(policy.apply(1.9999999997, 3), 2);
    assert_eq!(policy.apply(2.7, 3), 2);
    assert_eq!(policy.apply(2.5, 3), 2);
    assert_eq!(policy.apply(-1e-9, 3), 0);
    assert_eq!(policy.apply(3.0000001, 3), 3);
    assert_eq!(policy.apply(7.0, 3), 3);
}

struct FailingSolver;

impl LpSolver for FailingSolver {
    fn solve(&self, _model: &RelaxationModel) -> Result<LpSolution, lp::Error> {
        Err(lp::Error::Backend {
            message: "problem is infeasible".to_owned(),
        })
    }
}

/// Reports a fixed objective with every column at 1.0.
struct FixedSolver(f64);

impl LpSolver for FixedSolver {
    fn solve(&self, model: &RelaxationModel) -> Result<LpSolution, lp::Error> {
        LpSolution::new(model, self.0, vec![1.0; model.num_columns()])
    }
}

#[test]
fn solver_failure_fails_the_estimate() {
    let matrix = ClauseMatrix::from_clauses(1, vec![vec![1]]).unwrap();
    let estimator = BoundEstimator::with_solver(FailingSolver, RoundingEngine::default());

    let result = estimator.estimate(&matrix, &mut StdRng::seed_from_u64(SEED));
    assert!(matches!(
        result,
        Err(Error::Solver {
            source: lp::Error::Backend { .. }
        })
    ));
}

#[test]
fn inconsistent_solver_answer_is_rejected() {
    let matrix = ClauseMatrix::from_clauses(1, vec![vec![1], vec![1]]).unwrap();
    let estimator = BoundEstimator::with_solver(FixedSolver(0.5), RoundingEngine::default());

    let result = estimator.estimate(&matrix, &mut StdRng::seed_from_u64(SEED));
    assert!(matches!(
        result,
        Err(Error::InconsistentBounds {
            lower_bound: 2,
            upper_bound: 0,
            ..
        })
    ));
}

#[test]
fn non_finite_objective_is_rejected() {
    let matrix = ClauseMatrix::from_clauses(1, vec![vec![1]]).unwrap();
    let estimator = BoundEstimator::with_solver(FixedSolver(f64::NAN), RoundingEngine::default());

    let result = estimator.estimate(&matrix, &mut StdRng::seed_from_u64(SEED));
    assert!(matches!(
        result,
        Err(Error::Solver {
            source: lp::Error::NonFiniteObjective { .. }
        })
    ));
}

#[test]
fn config_reads_debug_flag_and_files() {
    let args = vec!["-d".to_owned(), "a.cnf".to_owned(), "-d".to_owned()];
    let config = Config::parse(args, None, Some("42".to_owned())).unwrap();

    assert!(config.debug);
    assert_eq!(config.trials, RoundingEngine::DEFAULT_TRIALS);
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.files.len(), 2);
}

#[test]
fn config_rejects_bad_values() {
    let files = || vec!["a.cnf".to_owned()];

    assert!(matches!(
        Config::parse(vec!["-d".to_owned()], None, None),
        Err(config::Error::MissingArgument)
    ));
    assert!(matches!(
        Config::parse(files(), Some("0".to_owned()), None),
        Err(config::Error::InvalidTrials { .. })
    ));
    assert!(matches!(
        Config::parse(files(), None, Some("-1".to_owned())),
        Err(config::Error::InvalidSeed { .. })
    ));
    assert_eq!(
        Config::parse(files(), Some(" 25 ".to_owned()), None)
            .unwrap()
            .trials,
        25
    );
}

#[test]
fn report_prints_cause_chain() {
    let error = parse_str("p cnf 2 1\n1 1 0\n").unwrap_err();
    let report = Report::new(error);

    assert_eq!(
        report.to_string(),
        "Could not store the clause on line 2: x1 appears more than once in clause 1"
    );
    assert!(format!("{:?}", report).contains("Caused by:"));
}

#[test]
fn failed_file_does_not_stop_the_next_one() {
    let paths = [
        "testcases/does_not_exist.cnf",
        "testcases/malformed/duplicate_variable.cnf",
        "testcases/bounds/repeated_units.cnf",
    ];
    let estimator = BoundEstimator::default();
    let mut rng = StdRng::seed_from_u64(SEED);

    let results = estimate_paths(&estimator, &paths, &mut rng);
    assert_eq!(results.len(), 3);
    assert!(matches!(
        &results[0],
        Err(run::Error::Load {
            source: parser::Error::IoError { .. },
            ..
        })
    ));
    assert!(matches!(
        &results[1],
        Err(run::Error::Load {
            source: parser::Error::InvalidClause { .. },
            ..
        })
    ));

    let result = results[2].as_ref().unwrap();
    assert_eq!(result.lower_bound(), 4);
    assert_eq!(result.upper_bound(), 4);
}

#[test]
fn failed_estimate_is_reported_per_file() {
    let estimator = BoundEstimator::with_solver(FailingSolver, RoundingEngine::default());
    let mut rng = StdRng::seed_from_u64(SEED);

    let results = estimate_paths(
        &estimator,
        &["testcases/bounds/two_clauses.cnf", "testcases/bounds/all_pairs.cnf"],
        &mut rng,
    );
    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(matches!(
            result,
            Err(run::Error::Estimate {
                source: Error::Solver { .. },
                ..
            })
        ));
    }
}
