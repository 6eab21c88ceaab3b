//! Per-test browser lifecycle
//!
//! Each test case owns one browser session from start to finish:
//!
//! ```text
//! SessionConfig ──► DriverFactory::launch ──► BrowserSession ──► quit
//!                        │                        │
//!                        └── temp user-data dir ──┘ (removed on drop)
//! ```
//!
//! [`with_session`] is the scoped form: the closure gets a shared handle on
//! the session, and `quit` runs afterwards whatever the closure returned.

use crate::driver::{browser_name, BrowserDriver};
use crate::result::{SwagError, SwagResult};
use crate::simulated::{ShopBehavior, SimulatedShop};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Window size forced on CI runners
pub const CI_WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Chrome flags added on CI runners
pub const CI_ARGS: [&str; 2] = ["--disable-dev-shm-usage", "--disable-gpu"];

/// Browsers that speak the DevTools protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Google Chrome
    #[default]
    Chrome,
    /// Chromium
    Chromium,
    /// Microsoft Edge
    Edge,
}

impl BrowserKind {
    /// Every supported kind
    pub const ALL: [Self; 3] = [Self::Chrome, Self::Chromium, Self::Edge];

    /// Lower-case name, as accepted on the command line
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Chromium => "chromium",
            Self::Edge => "edge",
        }
    }

    /// Executable names to look for on `PATH`
    #[must_use]
    pub const fn executable_names(self) -> &'static [&'static str] {
        match self {
            Self::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            Self::Chromium => &["chromium", "chromium-browser"],
            Self::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        }
    }

    /// First matching executable on `PATH`
    #[must_use]
    pub fn find_executable(self) -> Option<PathBuf> {
        find_on_path(self.executable_names())
    }
}

/// First of `names` that resolves to an executable on `PATH`
#[must_use]
pub fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| which::which(name).ok())
}

/// Like [`find_on_path`], over an explicit search path
#[must_use]
pub fn find_in(names: &[&str], search_path: &OsStr) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    names
        .iter()
        .find_map(|name| which::which_in(name, Some(search_path), &cwd).ok())
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrowserKind {
    type Err = SwagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "google-chrome" => Ok(Self::Chrome),
            "chromium" => Ok(Self::Chromium),
            "edge" | "msedge" | "microsoft-edge" => Ok(Self::Edge),
            other => Err(SwagError::UnsupportedBrowser {
                name: other.to_string(),
            }),
        }
    }
}

/// How to start (or reach) a browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Browser to launch
    pub browser: BrowserKind,
    /// Run without a window
    pub headless: bool,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Chrome sandbox (off in containers)
    pub sandbox: bool,
    /// DevTools websocket of an already running browser
    pub remote: Option<String>,
    /// Explicit browser binary
    pub executable: Option<PathBuf>,
    /// Extra command-line flags
    pub args: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            window_width: 1280,
            window_height: 800,
            sandbox: true,
            remote: None,
            executable: None,
            args: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Set the browser
    #[must_use]
    pub const fn with_browser(mut self, browser: BrowserKind) -> Self {
        self.browser = browser;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the window size
    #[must_use]
    pub const fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Disable the sandbox
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Connect to a running browser instead of launching one
    #[must_use]
    pub fn with_remote(mut self, endpoint: impl Into<String>) -> Self {
        self.remote = Some(endpoint.into());
        self
    }

    /// Use a specific browser binary
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Add a command-line flag, once
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        if !self.args.contains(&arg) {
            self.args.push(arg);
        }
        self
    }

    /// CI runner settings: headless, no sandbox, shared-memory and GPU
    /// flags, fixed 1920x1080 window
    #[must_use]
    pub fn for_ci(self) -> Self {
        let (width, height) = CI_WINDOW_SIZE;
        CI_ARGS
            .iter()
            .fold(self, |config, arg| config.with_arg(*arg))
            .with_headless(true)
            .with_no_sandbox()
            .with_window_size(width, height)
    }

    /// Apply [`SessionConfig::for_ci`] when running on a CI runner
    #[must_use]
    pub fn adjusted_for_environment(self) -> Self {
        if is_ci() {
            info!("CI environment detected, forcing headless chrome settings");
            self.for_ci()
        } else {
            self
        }
    }
}

/// Whether `lookup` describes a CI runner (`CI=true` or `GITHUB_ACTIONS=true`)
pub fn is_ci_env(lookup: impl Fn(&str) -> Option<String>) -> bool {
    ["CI", "GITHUB_ACTIONS"]
        .iter()
        .any(|&key| lookup(key).is_some_and(|v| v.eq_ignore_ascii_case("true")))
}

/// Whether this process runs on a CI runner
#[must_use]
pub fn is_ci() -> bool {
    is_ci_env(|key| std::env::var(key).ok())
}

/// Starts browser drivers
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Start a driver using `user_data_dir` as its profile directory
    async fn launch(
        &self,
        config: &SessionConfig,
        user_data_dir: &Path,
    ) -> SwagResult<Box<dyn BrowserDriver>>;
}

/// Factory handing out fresh [`SimulatedShop`]s
#[derive(Debug, Clone, Default)]
pub struct SimulatedFactory {
    behavior: ShopBehavior,
}

impl SimulatedFactory {
    /// Factory whose shops misbehave as described
    #[must_use]
    pub const fn new(behavior: ShopBehavior) -> Self {
        Self { behavior }
    }
}

#[async_trait]
impl DriverFactory for SimulatedFactory {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn launch(
        &self,
        config: &SessionConfig,
        _user_data_dir: &Path,
    ) -> SwagResult<Box<dyn BrowserDriver>> {
        let behavior = self.behavior.clone().with_browser_name(config.browser.name());
        Ok(Box::new(SimulatedShop::with_behavior(behavior)))
    }
}

/// One live browser with its profile directory
pub struct BrowserSession {
    driver: Box<dyn BrowserDriver>,
    config: SessionConfig,
    browser_name: String,
    profile: TempDir,
    started: Instant,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("browser_name", &self.browser_name)
            .field("profile", &self.profile.path())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    /// Create the profile directory and start a driver
    ///
    /// # Errors
    ///
    /// I/O errors for the profile directory, or whatever the factory raises.
    pub async fn open(factory: &dyn DriverFactory, config: SessionConfig) -> SwagResult<Self> {
        let profile = tempfile::Builder::new()
            .prefix("swagprobe-profile-")
            .tempdir()?;
        debug!(
            factory = factory.name(),
            browser = %config.browser,
            profile = %profile.path().display(),
            "starting browser session"
        );
        let driver = factory.launch(&config, profile.path()).await?;
        let browser_name = match driver.capabilities().await {
            Ok(caps) if !browser_name(&caps).is_empty() => browser_name(&caps),
            _ => config.browser.name().to_string(),
        };
        info!(browser = %browser_name, headless = config.headless, "browser session started");
        Ok(Self {
            driver,
            config,
            browser_name,
            profile,
            started: Instant::now(),
        })
    }

    /// The session's driver
    #[must_use]
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Settings the session was started with
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Browser name reported by the driver
    #[must_use]
    pub fn browser_name(&self) -> &str {
        &self.browser_name
    }

    /// Profile directory, removed when the session ends
    #[must_use]
    pub fn user_data_dir(&self) -> &Path {
        self.profile.path()
    }

    /// Time since the browser came up
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Quit the browser, leaving the profile directory in place
    ///
    /// # Errors
    ///
    /// The driver's quit error.
    pub async fn quit(&self) -> SwagResult<()> {
        let result = self.driver.quit().await;
        debug!(
            browser = %self.browser_name,
            uptime_ms = self.started.elapsed().as_millis() as u64,
            "browser session closed"
        );
        result
    }

    /// Quit the browser and remove the profile directory
    ///
    /// # Errors
    ///
    /// The driver's quit error; the profile directory is removed regardless.
    pub async fn close(self) -> SwagResult<()> {
        let result = self.quit().await;
        if let Err(e) = self.profile.close() {
            warn!(error = %e, "could not remove browser profile directory");
        }
        result
    }
}

/// Run `body` inside a fresh session, quitting the browser afterwards
///
/// Quit failures are logged and never mask the body's result. A panicking
/// body still quits the browser before the panic resumes. The profile
/// directory goes away with the last reference to the session.
///
/// ```ignore
/// let title = with_session(&factory, config, |session| async move {
///     session.driver().navigate(BASE_URL).await?;
///     session.driver().title().await
/// })
/// .await?;
/// ```
///
/// # Errors
///
/// Launch failures, or the body's own error.
pub async fn with_session<T, F, Fut>(
    factory: &dyn DriverFactory,
    config: SessionConfig,
    body: F,
) -> SwagResult<T>
where
    F: FnOnce(Arc<BrowserSession>) -> Fut,
    Fut: Future<Output = SwagResult<T>>,
{
    let session = Arc::new(BrowserSession::open(factory, config).await?);
    let outcome = AssertUnwindSafe(body(Arc::clone(&session)))
        .catch_unwind()
        .await;
    let closed = match Arc::try_unwrap(session) {
        Ok(session) => session.close().await,
        Err(shared) => shared.quit().await,
    };
    if let Err(e) = closed {
        warn!(error = %e, "browser did not quit cleanly");
    }
    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
