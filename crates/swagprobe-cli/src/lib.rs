//! Swagprobe CLI Library
//!
//! Command-line front end for the Swagprobe suite: run it, repeat a case to
//! measure its stability, and inspect or clean the environment.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;
mod runner;
pub mod statistics;

pub use commands::{
    CheckArgs, CleanArgs, Cli, ColorArg, Commands, ListArgs, ListFormat, LogFormatArg, RepeatArgs,
    RunArgs, SessionArgs,
};
pub use config::{
    apply_session_args, resolve_suite_config, CliConfig, ColorChoice, LogFormat, Verbosity,
};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::{factory_for, RepeatOutcome, SuiteOutcome, TestRunner};
pub use statistics::{RunSample, RunStatistics};
