//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Swagprobe: page-object end-to-end suite for the Swag Labs demo shop
#[derive(Parser, Debug)]
#[command(name = "swagprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true, env = "SWAGPROBE_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the suite once
    Run(RunArgs),

    /// Run one case many times and report its stability
    Repeat(RepeatArgs),

    /// List test cases
    List(ListArgs),

    /// Check browser, allure and output directories
    Check(CheckArgs),

    /// Remove results, screenshots and logs
    Clean(CleanArgs),
}

/// Browser and output settings shared by `run` and `repeat`
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// YAML configuration file
    #[arg(long, env = "SWAGPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Browser: chrome, chromium or edge
    #[arg(short, long)]
    pub browser: Option<String>,

    /// DevTools websocket of an already running browser
    #[arg(long)]
    pub remote: Option<String>,

    /// Run without a window
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Run with a window
    #[arg(long)]
    pub headed: bool,

    /// Site root
    #[arg(long)]
    pub base_url: Option<String>,

    /// Explicit-wait budget in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Allure results directory
    #[arg(long)]
    pub alluredir: Option<PathBuf>,

    /// Screenshot directory
    #[arg(long)]
    pub screenshots: Option<PathBuf>,

    /// Seed for the product pick
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the in-process simulated shop instead of a browser
    #[arg(long)]
    pub simulate: bool,
}

impl SessionArgs {
    /// `--headless` / `--headed`, when either was given
    #[must_use]
    pub const fn headless(&self) -> Option<bool> {
        if self.headless {
            Some(true)
        } else if self.headed {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only cases whose id contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Cases run at the same time, one browser each
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Write a JSON summary here
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Browser and output settings
    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the repeat command
#[derive(Args, Debug)]
pub struct RepeatArgs {
    /// Case id, e.g. `end_to_end` or `login[standard_user]`
    pub case: String,

    /// Number of runs
    #[arg(short = 'n', long, default_value = "1")]
    pub iterations: u32,

    /// Skip Allure results and report generation
    #[arg(long)]
    pub no_report: bool,

    /// Directory for run logs
    #[arg(long, default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Directory for generated Allure reports
    #[arg(long, default_value = "reports")]
    pub reports_dir: PathBuf,

    /// Browser and output settings
    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only cases whose id contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ListFormat,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Browser to look for
    #[arg(short, long, default_value = "chrome")]
    pub browser: String,

    /// Results directory that must be writable
    #[arg(long, default_value = swagprobe::report::DEFAULT_RESULTS_DIR)]
    pub alluredir: PathBuf,
}

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Allure results directory
    #[arg(long, default_value = swagprobe::report::DEFAULT_RESULTS_DIR)]
    pub alluredir: PathBuf,

    /// Screenshot directory
    #[arg(long, default_value = swagprobe::screenshot::DEFAULT_SCREENSHOT_DIR)]
    pub screenshots: PathBuf,

    /// Run log directory
    #[arg(long, default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Generated report directory
    #[arg(long, default_value = "reports")]
    pub reports_dir: PathBuf,

    /// Show what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

/// Output of the list command
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// One case per line
    #[default]
    Text,
    /// JSON array
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}
