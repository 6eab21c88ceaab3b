//! Result and error types for Swagprobe.
//!
//! Every page-object operation returns a [`SwagResult`]. Errors carry a
//! [`FailureTier`] so a caller can tell an expected negative outcome (a page
//! that never reached its loaded state, a field holding the wrong value)
//! from a fault talking to the browser.

use thiserror::Error;

/// Result type for Swagprobe operations
pub type SwagResult<T> = Result<T, SwagError>;

/// Which side of the line a failure falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureTier {
    /// The application behaved differently than the test expected
    Expected,
    /// The browser, driver or environment misbehaved
    Infrastructure,
}

impl FailureTier {
    /// Allure status string for this tier
    #[must_use]
    pub const fn report_status(self) -> &'static str {
        match self {
            Self::Expected => "failed",
            Self::Infrastructure => "broken",
        }
    }
}

/// Errors that can occur in Swagprobe
#[derive(Debug, Error)]
pub enum SwagError {
    /// A wait condition did not hold within its budget
    #[error("Timed out after {waited_ms}ms waiting for {condition}")]
    Timeout {
        /// Description of the condition
        condition: String,
        /// Time actually spent waiting
        waited_ms: u64,
    },

    /// No element matched the locator
    #[error("No element matches {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// A native click landed on another element
    #[error("Click on {locator} was intercepted: {message}")]
    ClickIntercepted {
        /// Locator description
        locator: String,
        /// Driver message
        message: String,
    },

    /// Element exists but cannot receive input
    #[error("Element {locator} is not interactable: {message}")]
    NotInteractable {
        /// Locator description
        locator: String,
        /// Driver message
        message: String,
    },

    /// Script injection failed
    #[error("Script execution failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser session is gone or unusable
    #[error("Browser session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Browser launch or remote connection error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Browser kind that has no CDP support
    #[error("Unsupported browser: {name} (expected chrome, chromium or edge)")]
    UnsupportedBrowser {
        /// Requested browser name
        name: String,
    },

    /// Every strategy in a fallback chain failed
    #[error("{action} on {locator} failed after {attempts} attempt(s): {last_error}")]
    ActionExhausted {
        /// Action name (click, type)
        action: String,
        /// Locator description
        locator: String,
        /// Attempts made
        attempts: u32,
        /// Last error observed
        last_error: String,
    },

    /// A page did not reach its loaded state
    #[error("Page {page} is not loaded: {reason}")]
    PageNotLoaded {
        /// Page name
        page: String,
        /// Why the check failed
        reason: String,
    },

    /// A form field holds a different value than expected
    #[error("Field {field}: expected {expected:?}, found {actual:?}")]
    FieldMismatch {
        /// Field name
        field: String,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SwagError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify the error
    #[must_use]
    pub const fn tier(&self) -> FailureTier {
        match self {
            Self::PageNotLoaded { .. }
            | Self::FieldMismatch { .. }
            | Self::AssertionFailed { .. } => FailureTier::Expected,
            _ => FailureTier::Infrastructure,
        }
    }

    /// Errors a poll loop or fallback chain may retry
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::ClickIntercepted { .. }
                | Self::NotInteractable { .. }
                | Self::Script { .. }
                | Self::Timeout { .. }
        )
    }

    /// Whether this is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Fail with [`SwagError::AssertionFailed`] unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> SwagResult<()> {
    if condition {
        Ok(())
    } else {
        Err(SwagError::assertion(message()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_tier() {
        assert_eq!(
            SwagError::assertion("cart count").tier(),
            FailureTier::Expected
        );
        let err = SwagError::PageNotLoaded {
            page: "Inventory".into(),
            reason: "title".into(),
        };
        assert_eq!(err.tier(), FailureTier::Expected);
    }

    #[test]
    fn test_infrastructure_tier() {
        let err = SwagError::Timeout {
            condition: "visible #finish".into(),
            waited_ms: 10_000,
        };
        assert_eq!(err.tier(), FailureTier::Infrastructure);
        assert_eq!(SwagError::session("gone").tier(), FailureTier::Infrastructure);
    }

    #[test]
    fn test_report_status() {
        assert_eq!(FailureTier::Expected.report_status(), "failed");
        assert_eq!(FailureTier::Infrastructure.report_status(), "broken");
    }

    #[test]
    fn test_transient_classification() {
        assert!(SwagError::script("boom").is_transient());
        assert!(SwagError::ElementNotFound {
            locator: "#x".into()
        }
        .is_transient());
        assert!(!SwagError::session("closed").is_transient());
        assert!(!SwagError::config("bad").is_transient());
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, || "never".into()).is_ok());
        let err = ensure(false, || "cart shows 1".into()).unwrap_err();
        assert!(err.to_string().contains("cart shows 1"));
    }

    #[test]
    fn test_field_mismatch_display_is_exact() {
        let err = SwagError::FieldMismatch {
            field: "postal-code".into(),
            expected: "T6H5J3".into(),
            actual: "T6H5J3 ".into(),
        };
        assert!(err.to_string().contains("\"T6H5J3 \""));
    }
}
