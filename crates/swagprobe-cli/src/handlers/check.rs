//! Environment check
//!
//! Verifies what a real run needs: a supported browser binary, the allure
//! command-line tool and a writable results directory.

use crate::commands::CheckArgs;
use crate::error::{CliError, CliResult};
use crate::handlers::report::{allure_executable, allure_version};
use crate::output::ProgressReporter;
use std::path::Path;
use std::str::FromStr;
use swagprobe::session::{is_ci, BrowserKind};

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    /// What was checked
    pub name: &'static str,
    /// Whether it is usable
    pub ok: bool,
    /// Path, version or hint
    pub detail: String,
}

impl CheckItem {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Browser binary for `browser`
pub fn check_browser(browser: &str) -> CheckItem {
    match BrowserKind::from_str(browser) {
        Err(e) => CheckItem::fail("browser", e.to_string()),
        Ok(kind) => match kind.find_executable() {
            Some(path) => CheckItem::pass("browser", format!("{kind}: {}", path.display())),
            None => CheckItem::fail(
                "browser",
                format!(
                    "{kind} not found on PATH (looked for {})",
                    kind.executable_names().join(", ")
                ),
            ),
        },
    }
}

/// The allure command-line tool
pub fn check_allure() -> CheckItem {
    match allure_executable() {
        Some(path) => {
            let version = allure_version(&path).unwrap_or_else(|| "unknown version".to_string());
            CheckItem::pass("allure", format!("{version} at {}", path.display()))
        }
        None => CheckItem::fail("allure", allure_install_hint()),
    }
}

fn allure_install_hint() -> &'static str {
    if cfg!(target_os = "windows") {
        "not installed; try `scoop install allure` or `choco install allure-commandline`"
    } else if cfg!(target_os = "macos") {
        "not installed; try `brew install allure`"
    } else {
        "not installed; see https://allurereport.org/docs/install/"
    }
}

/// `dir` exists or can be created, and accepts a file
pub fn check_writable(dir: &Path) -> CheckItem {
    let probe = dir.join(".swagprobe-write-check");
    let outcome = std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&probe, b"ok"))
        .and_then(|()| std::fs::remove_file(&probe));
    match outcome {
        Ok(()) => CheckItem::pass("results dir", format!("{} is writable", dir.display())),
        Err(e) => CheckItem::fail("results dir", format!("{}: {e}", dir.display())),
    }
}

/// Every check, in display order
pub fn run_checks(args: &CheckArgs) -> Vec<CheckItem> {
    vec![
        check_browser(&args.browser),
        check_allure(),
        check_writable(&args.alluredir),
        CheckItem::pass(
            "ci",
            if is_ci() {
                "CI detected; sessions run headless with CI flags"
            } else {
                "not running in CI"
            },
        ),
    ]
}

/// Execute the check command
pub fn execute_check(reporter: &ProgressReporter, args: &CheckArgs) -> CliResult<()> {
    reporter.header("Environment");
    let items = run_checks(args);
    for item in &items {
        let line = format!("{}: {}", item.name, item.detail);
        if item.ok {
            reporter.success(&line);
        } else {
            reporter.failure(&line);
        }
    }
    match items.iter().filter(|item| !item.ok).count() {
        0 => Ok(()),
        failed => Err(CliError::Environment { failed }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_browser_fails() {
        let item = check_browser("firefox");
        assert!(!item.ok);
        assert!(item.detail.contains("firefox"));
    }

    #[test]
    fn test_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let item = check_writable(&dir.path().join("allure-results"));
        assert!(item.ok, "{}", item.detail);
        assert!(dir.path().join("allure-results").is_dir());
        assert!(!dir.path().join("allure-results/.swagprobe-write-check").exists());
    }

    #[test]
    fn test_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(!check_writable(&blocker.join("results")).ok);
    }
}
