#[macro_use]
extern crate log;

pub mod config;
pub mod estimator;
pub mod formula;
pub mod lp;
pub mod parser;
pub mod prelude;
pub mod report;
pub mod run;

#[cfg(test)]
mod tests;
