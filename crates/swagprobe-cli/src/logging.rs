//! Log subscriber set-up
//!
//! The library logs through `tracing`; the binary decides where it goes.
//! `SWAGPROBE_LOG` takes an `EnvFilter` directive and wins over `-v`/`-q`.

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Environment variable holding a filter directive
pub const LOG_ENV: &str = "SWAGPROBE_LOG";

/// Filter from `SWAGPROBE_LOG`, else from the verbosity
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| filter_for(config))
}

fn filter_for(config: &CliConfig) -> EnvFilter {
    let level = config.verbosity.log_directive();
    // chromiumoxide is chatty about CDP messages it does not know
    EnvFilter::new(format!("{level},chromiumoxide=error"))
}

/// Install the global subscriber, writing to stderr
pub fn init(config: &CliConfig) -> CliResult<()> {
    let ansi = config.color.should_color();
    let console = match config.log_format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .boxed(),
    };
    tracing_subscriber::registry()
        .with(console.with_filter(env_filter(config)))
        .try_init()
        .map_err(|e| CliError::config(format!("could not install logger: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Verbosity;

    #[test]
    fn test_filter_follows_verbosity() {
        let quiet = filter_for(&CliConfig::new().with_verbosity(Verbosity::Quiet));
        assert!(!quiet.to_string().contains("info"));
        let debug = filter_for(&CliConfig::new().with_verbosity(Verbosity::Debug));
        assert!(debug.to_string().contains("debug"));
        assert!(debug.to_string().contains("chromiumoxide=error"));
    }
}
