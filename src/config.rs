/*!
Run configuration assembled from the command line and the environment.
*/

use std::{env, path::PathBuf};

use rand::{rngs::StdRng, SeedableRng};

use crate::estimator::rounding::RoundingEngine;
use crate::prelude::*;

pub const TRIALS_VAR: &str = "SATBOUNDS_TRIALS";
pub const SEED_VAR: &str = "SATBOUNDS_SEED";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("At least one CNF file is required"))]
    MissingArgument,
    #[snafu(display("{} must be a positive integer, got '{}'", TRIALS_VAR, value))]
    InvalidTrials { value: String },
    #[snafu(display("{} must be an unsigned 64-bit integer, got '{}'", SEED_VAR, value))]
    InvalidSeed {
        value: String,
        source: std::num::ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub debug: bool,
    pub trials: usize,
    pub seed: Option<u64>,
    pub files: Vec<PathBuf>,
}

impl Config {
    /// `args` excludes the program name. `-d` is only recognized as the first argument.
    pub fn parse(
        args: Vec<String>,
        trials: Option<String>,
        seed: Option<String>,
    ) -> Result<Self, Error> {
        let debug = args.first().map_or(false, |arg| arg == "-d");
        let files = args
            .into_iter()
            .skip(if debug { 1 } else { 0 })
            .map(PathBuf::from)
            .collect::<Vec<_>>();
        ensure!(!files.is_empty(), MissingArgument);

        let trials = match trials {
            Some(value) => {
                let parsed = value.trim().parse::<usize>();
                match parsed {
                    Ok(trials) if trials > 0 => trials,
                    _ => return InvalidTrials { value }.fail(),
                }
            }
            None => RoundingEngine::DEFAULT_TRIALS,
        };

        let seed = match seed {
            Some(value) => Some(value.trim().parse::<u64>().context(InvalidSeed { value })?),
            None => None,
        };

        Ok(Config {
            debug,
            trials,
            seed,
            files,
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Config::parse(
            env::args().skip(1).collect(),
            env::var(TRIALS_VAR).ok(),
            env::var(SEED_VAR).ok(),
        )
    }

    /// The single generator shared by every formula of this run.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
