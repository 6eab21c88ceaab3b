//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more cases did not pass
    #[error("Test execution failed: {message}")]
    TestExecution {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Swagprobe library error
    #[error("Swagprobe error: {0}")]
    Swag(#[from] swagprobe::SwagError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },

    /// The environment check found problems
    #[error("Environment check failed: {failed} problem(s)")]
    Environment {
        /// Number of failed checks
        failed: usize,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a test execution error
    #[must_use]
    pub fn test_execution(message: impl Into<String>) -> Self {
        Self::TestExecution {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }

    /// Process exit code: 1 for failing cases, 2 for everything else
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::TestExecution { .. } => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_test_execution_error() {
        let err = CliError::test_execution("2 of 11 cases did not pass");
        assert!(err.to_string().contains("Test execution"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("no case matches \"zzz\"");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_swag_error_from() {
        let err: CliError = swagprobe::SwagError::UnsupportedBrowser {
            name: "firefox".into(),
        }
        .into();
        assert!(err.to_string().contains("firefox"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
