//! Swagprobe CLI: run the Swag Labs end-to-end suite
//!
//! ## Usage
//!
//! ```bash
//! swagprobe run                          # Every case, real browser
//! swagprobe run --simulate -j 4          # In-process shop, four workers
//! swagprobe run --filter checkout        # Only checkout cases
//! swagprobe repeat end_to_end -n 100     # Stability run with statistics
//! swagprobe list                         # Show case ids
//! swagprobe check                        # Browser, allure, output dirs
//! swagprobe clean                        # Remove results and logs
//! ```

use clap::Parser;
use std::process::ExitCode;
use swagprobe_cli::handlers::{execute_check, execute_clean, execute_list};
use swagprobe_cli::{logging, Cli, CliConfig, CliResult, Commands, TestRunner, Verbosity};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);

    if let Err(e) = logging::init(&config) {
        eprintln!("Warning: {e}");
    }

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli, config: CliConfig) -> CliResult<()> {
    match cli.command {
        Commands::Run(args) => {
            let mut runner = TestRunner::new(config);
            runner.run(&args)?.ensure_passed()
        }
        Commands::Repeat(args) => {
            let mut runner = TestRunner::new(config);
            runner.repeat(&args)?.ensure_passed()
        }
        Commands::List(args) => execute_list(&args),
        Commands::Check(args) => execute_check(TestRunner::new(config).reporter(), &args),
        Commands::Clean(args) => {
            execute_clean(TestRunner::new(config).reporter(), &args).map(|_| ())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}
