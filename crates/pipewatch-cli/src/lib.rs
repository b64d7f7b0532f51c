//! Command-line and environment configuration surface for pipewatch.

mod cli_args;

pub use cli_args::*;
