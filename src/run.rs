/*!
Per-file driver. Each file succeeds or fails on its own.
*/

use std::path::{Path, PathBuf};

use rand::Rng;

use crate::estimator::{self, aggregate::BoundResult, BoundEstimator};
use crate::lp::LpSolver;
use crate::parser::{self, parse_file};
use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Cannot read instance with filename {}", path.display()))]
    Load { path: PathBuf, source: parser::Error },
    #[snafu(display("Cannot compute bounds for {}", path.display()))]
    Estimate {
        path: PathBuf,
        source: estimator::Error,
    },
}

/// Loads one CNF file and estimates its bounds.
pub fn estimate_path<S: LpSolver, R: Rng>(
    estimator: &BoundEstimator<S>,
    path: &Path,
    rng: &mut R,
) -> Result<BoundResult, Error> {
    let matrix = parse_file(path).context(Load { path })?;
    info!("Looking at instance from {}", path.display());

    estimator
        .estimate(&matrix, rng)
        .context(Estimate { path })
}

/// Runs every file in order with one shared generator. A failure is
/// recorded for its file and the remaining files still run.
pub fn estimate_paths<S, R, P>(
    estimator: &BoundEstimator<S>,
    paths: &[P],
    rng: &mut R,
) -> Vec<Result<BoundResult, Error>>
where
    S: LpSolver,
    R: Rng,
    P: AsRef<Path>,
{
    paths
        .iter()
        .map(|path| {
            let result = estimate_path(estimator, path.as_ref(), rng);
            if let Err(e) = &result {
                warn!("{}", e);
            }
            result
        })
        .collect()
}
