use std::env::args;

use log::info;
use pretty_env_logger::formatted_builder;
use satbounds::{
    config::{self, Config},
    estimator::BoundEstimator,
    report::Report,
    run::{self, estimate_paths},
};

fn usage_string() -> String {
    format!(
        "Usage: {} [-d] <file1> [file2] [...]

Each <file> is the name of a file with a SAT instance in DIMACS CNF format.
-d turns on debug logging.

Environment:
    {} - number of rounding trials (default 10)
    {} - seed for the random number generator",
        args().next().unwrap_or_else(|| "satbounds".to_owned()),
        config::TRIALS_VAR,
        config::SEED_VAR,
    )
}

fn init_logger(debug: bool) {
    let mut builder = formatted_builder();

    if let Ok(s) = ::std::env::var("RUST_LOG") {
        builder.parse_filters(&s);
    } else if debug || cfg!(debug_assertions) {
        builder.parse_filters("satbounds=debug");
    } else {
        builder.parse_filters("satbounds=warn");
    }

    builder.try_init().expect("Failed to initialize the logger");
}

fn main() -> Result<(), Report> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(config::Error::MissingArgument) => {
            eprintln!("{}", usage_string());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    init_logger(config.debug);
    info!("Running {} rounding trials per instance", config.trials);

    let estimator = BoundEstimator::new(config.trials)?;
    let mut rng = config.rng();

    let results = estimate_paths(&estimator, &config.files, &mut rng);
    for (path, result) in config.files.iter().zip(results) {
        match result {
            Ok(result) => {
                println!("Looking at instance from {}", path.display());
                println!("{}", result);
            }
            Err(e @ run::Error::Load { .. }) => {
                eprintln!("{}. Skipping it.", e);
            }
            Err(e) => eprintln!("{}", Report::new(e)),
        }
    }

    Ok(())
}
