//! Random schedule generation for tests, benchmarks and the `generate`
//! subcommand.

pub mod generator;
