//! Screenshot files
//!
//! Captures land in `<root>/<browser>/<name>_<YYYY-mm-dd_HH-MM-SS>_<tag>.png`,
//! where `tag` is a short random suffix so concurrent workers never collide.
//! A capture that cannot be written is still returned so it can be attached
//! to the report.

use crate::driver::{browser_name, BrowserDriver};
use crate::result::SwagResult;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default screenshot directory
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Directory tree of captured screenshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotStore {
    root: PathBuf,
}

impl Default for ScreenshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SCREENSHOT_DIR)
    }
}

impl ScreenshotStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a capture taken at `at` would be written to
    #[must_use]
    pub fn path_for(&self, browser: &str, name: &str, at: DateTime<Local>, tag: &str) -> PathBuf {
        let browser = if browser.is_empty() { "unknown" } else { browser };
        self.root.join(sanitize(browser)).join(format!(
            "{}_{}_{}.png",
            sanitize(name),
            at.format("%Y-%m-%d_%H-%M-%S"),
            sanitize(tag)
        ))
    }

    /// Capture the current page and save it; returns the PNG bytes
    ///
    /// # Errors
    ///
    /// Only when the driver cannot produce a screenshot. Filesystem problems
    /// are logged.
    pub async fn capture(&self, driver: &dyn BrowserDriver, name: &str) -> SwagResult<Vec<u8>> {
        let shot = driver.screenshot().await?;
        let browser = driver
            .capabilities()
            .await
            .map(|caps| browser_name(&caps))
            .unwrap_or_default();
        let tag = Uuid::new_v4().simple().to_string();
        let path = self.path_for(&browser, name, Local::now(), &tag[..8]);
        match write(&path, &shot.data).await {
            Ok(()) => debug!(path = %path.display(), bytes = shot.size_bytes(), "screenshot saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not save screenshot"),
        }
        Ok(shot.data)
    }
}

async fn write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, data).await
}

/// Keep file names portable
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
