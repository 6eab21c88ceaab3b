//! Allure report generation
//!
//! Results are plain `*-result.json` files; turning them into HTML is left to
//! the `allure` command-line tool when it is installed.

use crate::error::{CliError, CliResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use swagprobe::session::find_on_path;
use tracing::{debug, info};

/// Names the allure launcher goes by
pub const ALLURE_NAMES: &[&str] = &["allure", "allure.bat", "allure.cmd"];

/// The allure launcher, if on `PATH`
pub fn allure_executable() -> Option<PathBuf> {
    find_on_path(ALLURE_NAMES)
}

/// Arguments of `allure generate <results...> -o <output> --clean`
pub fn generate_args(results_dirs: &[PathBuf], output: &Path) -> Vec<OsString> {
    let mut args = vec![OsString::from("generate")];
    args.extend(results_dirs.iter().map(|dir| dir.as_os_str().to_owned()));
    args.push("-o".into());
    args.push(output.as_os_str().to_owned());
    args.push("--clean".into());
    args
}

/// `allure --version`, if it runs
pub fn allure_version(executable: &Path) -> Option<String> {
    let output = Command::new(executable).arg("--version").output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Render `results_dirs` into an HTML report at `output`
pub fn generate_report(results_dirs: &[PathBuf], output: &Path) -> CliResult<PathBuf> {
    if results_dirs.is_empty() {
        return Err(CliError::report_generation("no results to render"));
    }
    let allure = allure_executable()
        .ok_or_else(|| CliError::report_generation("the allure command-line tool is not on PATH"))?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let args = generate_args(results_dirs, output);
    debug!(allure = %allure.display(), ?args, "running allure");
    let status = Command::new(&allure).args(&args).status()?;
    if !status.success() {
        return Err(CliError::report_generation(format!("allure exited with {status}")));
    }
    info!(report = %output.display(), "allure report generated");
    Ok(output.to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let args = generate_args(
            &[PathBuf::from("allure-results/chrome/run_1"), PathBuf::from("allure-results/chrome/run_2")],
            Path::new("reports/chrome_20240309_140507"),
        );
        let args: Vec<String> = args.into_iter().map(|a| a.into_string().unwrap()).collect();
        assert_eq!(
            args,
            [
                "generate",
                "allure-results/chrome/run_1",
                "allure-results/chrome/run_2",
                "-o",
                "reports/chrome_20240309_140507",
                "--clean"
            ]
        );
    }

    #[test]
    fn test_nothing_to_render() {
        let err = generate_report(&[], Path::new("reports/x")).unwrap_err();
        assert!(err.to_string().contains("no results"));
    }
}
