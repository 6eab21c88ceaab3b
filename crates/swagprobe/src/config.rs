//! Suite configuration
//!
//! Layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. `SWAGPROBE_*` environment variables
//! 4. command-line flags (applied by the CLI)
//!
//! ```yaml
//! base_url: https://www.saucedemo.com/
//! browser: chrome
//! headless: true
//! timeout_ms: 10000
//! retry_attempts: 3
//! workers: 2
//! ```

use crate::action::{Backoff, RetryPolicy};
use crate::catalog::BASE_URL;
use crate::page_object::PageSettings;
use crate::report::DEFAULT_RESULTS_DIR;
use crate::result::{SwagError, SwagResult};
use crate::screenshot::{ScreenshotStore, DEFAULT_SCREENSHOT_DIR};
use crate::session::{BrowserKind, SessionConfig};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "SWAGPROBE_";

/// Everything a suite run needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Site root
    pub base_url: String,
    /// `chrome`, `chromium` or `edge`
    pub browser: String,
    /// Run without a window
    pub headless: bool,
    /// DevTools websocket of a running browser
    pub remote: Option<String>,
    /// Explicit browser binary
    pub executable: Option<PathBuf>,
    /// Explicit-wait budget
    pub timeout_ms: u64,
    /// Explicit-wait poll interval
    pub poll_interval_ms: u64,
    /// Attempts per click or text entry
    pub retry_attempts: u32,
    /// Pause between attempts
    pub backoff: Backoff,
    /// Budget for an action's post-condition
    pub verify_timeout_ms: u64,
    /// Allure results directory
    pub results_dir: PathBuf,
    /// Screenshot directory
    pub screenshots_dir: PathBuf,
    /// Cases run at the same time
    pub workers: usize,
    /// Seed for the product pick
    pub seed: Option<u64>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: BASE_URL.to_string(),
            browser: BrowserKind::default().name().to_string(),
            headless: true,
            remote: None,
            executable: None,
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry_attempts: retry.max_attempts,
            backoff: retry.backoff,
            verify_timeout_ms: retry.verify_timeout_ms,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            screenshots_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            workers: 1,
            seed: None,
        }
    }
}

impl SuiteConfig {
    /// Parse a YAML document; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// YAML syntax errors and unknown keys.
    pub fn from_yaml_str(yaml: &str) -> SwagResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Defaults, then `path` if given, then the process environment
    ///
    /// # Errors
    ///
    /// Unreadable or invalid file, or an unparsable environment value.
    pub fn load(path: Option<&Path>) -> SwagResult<Self> {
        let config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration file");
                Self::from_yaml_str(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `SWAGPROBE_*` overrides found through `lookup`
    ///
    /// # Errors
    ///
    /// [`SwagError::Config`] naming the variable that does not parse.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> SwagResult<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("BROWSER") {
            self.browser = v;
        }
        if let Some(v) = var("HEADLESS") {
            self.headless = parse_bool("HEADLESS", &v)?;
        }
        if let Some(v) = var("REMOTE") {
            self.remote = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = var("EXECUTABLE") {
            self.executable = Some(PathBuf::from(v));
        }
        if let Some(v) = var("TIMEOUT_MS") {
            self.timeout_ms = parse("TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse("POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = var("RETRY_ATTEMPTS") {
            self.retry_attempts = parse("RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = var("RESULTS_DIR") {
            self.results_dir = PathBuf::from(v);
        }
        if let Some(v) = var("SCREENSHOTS_DIR") {
            self.screenshots_dir = PathBuf::from(v);
        }
        if let Some(v) = var("WORKERS") {
            self.workers = parse("WORKERS", &v)?;
        }
        if let Some(v) = var("SEED") {
            self.seed = Some(parse("SEED", &v)?);
        }
        Ok(self)
    }

    /// Reject values no run could succeed with
    ///
    /// # Errors
    ///
    /// [`SwagError::Config`] or [`SwagError::UnsupportedBrowser`].
    pub fn validate(&self) -> SwagResult<()> {
        let url = Regex::new(r"^https?://[^\s/]+").map_err(|e| SwagError::config(e.to_string()))?;
        if !url.is_match(&self.base_url) {
            return Err(SwagError::config(format!(
                "base_url {:?} is not an http(s) URL",
                self.base_url
            )));
        }
        self.browser_kind()?;
        if self.timeout_ms == 0 || self.poll_interval_ms == 0 {
            return Err(SwagError::config("timeout_ms and poll_interval_ms must be positive"));
        }
        if self.retry_attempts == 0 {
            return Err(SwagError::config("retry_attempts must be at least 1"));
        }
        if self.workers == 0 {
            return Err(SwagError::config("workers must be at least 1"));
        }
        Ok(())
    }

    /// The configured browser
    ///
    /// # Errors
    ///
    /// [`SwagError::UnsupportedBrowser`] for anything without DevTools support.
    pub fn browser_kind(&self) -> SwagResult<BrowserKind> {
        BrowserKind::from_str(&self.browser)
    }

    /// Settings handed to every page object
    #[must_use]
    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            base_url: self.base_url.clone(),
            wait: WaitOptions::new()
                .with_timeout(self.timeout_ms)
                .with_poll_interval(self.poll_interval_ms),
            retry: RetryPolicy::new(self.retry_attempts)
                .with_backoff(self.backoff)
                .with_verify_timeout(self.verify_timeout_ms),
        }
    }

    /// Browser start-up settings; CI adjustments are left to the caller
    ///
    /// # Errors
    ///
    /// [`SwagError::UnsupportedBrowser`].
    pub fn session_config(&self) -> SwagResult<SessionConfig> {
        let mut session = SessionConfig::default()
            .with_browser(self.browser_kind()?)
            .with_headless(self.headless);
        if let Some(ref remote) = self.remote {
            session = session.with_remote(remote.as_str());
        }
        if let Some(ref executable) = self.executable {
            session = session.with_executable(executable.as_path());
        }
        Ok(session)
    }

    /// Where step screenshots go
    #[must_use]
    pub fn screenshot_store(&self) -> ScreenshotStore {
        ScreenshotStore::new(self.screenshots_dir.as_path())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> SwagResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        SwagError::config(format!("{ENV_PREFIX}{key}={value:?}: {e}"))
    })
}

fn parse_bool(key: &str, value: &str) -> SwagResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SwagError::config(format!(
            "{ENV_PREFIX}{key}={value:?}: expected true or false"
        ))),
    }
}
