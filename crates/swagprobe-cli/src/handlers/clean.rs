//! Clean command handler

use crate::commands::CleanArgs;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Directories the clean command may remove, existing ones only
///
/// Every candidate must lie strictly inside `root`.
pub fn targets(args: &CleanArgs, root: &Path) -> CliResult<Vec<PathBuf>> {
    let candidates = [
        &args.alluredir,
        &args.screenshots,
        &args.logs_dir,
        &args.reports_dir,
    ];
    let mut found = Vec::new();
    for dir in candidates {
        if !is_safe_target(dir, root) {
            return Err(CliError::invalid_argument(format!(
                "refusing to remove {} (outside {})",
                dir.display(),
                root.display()
            )));
        }
        if dir.exists() && !found.contains(dir) {
            found.push(dir.clone());
        }
    }
    Ok(found)
}

/// Strictly below `root`, with no `..` and no symlink escape
pub fn is_safe_target(dir: &Path, root: &Path) -> bool {
    if dir.components().any(|c| c == Component::ParentDir) {
        return false;
    }
    let full = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        root.join(dir)
    };
    let (full, root) = match (full.canonicalize(), root.canonicalize()) {
        (Ok(full), Ok(root)) => (full, root),
        _ => (full, root.to_path_buf()),
    };
    full.strip_prefix(&root)
        .is_ok_and(|rest| rest.components().any(|c| matches!(c, Component::Normal(_))))
}

/// Execute the clean command under the working directory
pub fn execute_clean(reporter: &ProgressReporter, args: &CleanArgs) -> CliResult<Vec<PathBuf>> {
    let root = std::env::current_dir()?;
    clean_under(reporter, args, &root)
}

/// Remove the output directories below `root`; returns what was (or would be) removed
pub fn clean_under(
    reporter: &ProgressReporter,
    args: &CleanArgs,
    root: &Path,
) -> CliResult<Vec<PathBuf>> {
    let targets = targets(args, root)?;
    if targets.is_empty() {
        reporter.info("nothing to clean");
    }
    for dir in &targets {
        if args.dry_run {
            reporter.info(&format!("would remove {}", dir.display()));
        } else {
            std::fs::remove_dir_all(dir)?;
            info!(dir = %dir.display(), "removed");
            reporter.success(&format!("removed {}", dir.display()));
        }
    }
    Ok(targets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(root: &Path, dry_run: bool) -> CleanArgs {
        CleanArgs {
            alluredir: root.join("allure-results"),
            screenshots: root.join("screenshots"),
            logs_dir: root.join("logs"),
            reports_dir: root.join("reports"),
            dry_run,
        }
    }

    #[test]
    fn test_safe_targets() {
        let root = Path::new("/work/shop-tests");
        assert!(is_safe_target(Path::new("allure-results"), root));
        assert!(is_safe_target(Path::new("./logs"), root));
        assert!(is_safe_target(Path::new("/work/shop-tests/out/screenshots"), root));
        assert!(!is_safe_target(Path::new(""), root));
        assert!(!is_safe_target(Path::new("."), root));
        assert!(!is_safe_target(Path::new("/"), root));
        assert!(!is_safe_target(Path::new("../elsewhere"), root));
        assert!(!is_safe_target(Path::new("out/../../elsewhere"), root));
    }

    #[test]
    fn test_absolute_paths_outside_root_are_refused() {
        let root = Path::new("/work/shop-tests");
        assert!(!is_safe_target(Path::new("/home"), root));
        assert!(!is_safe_target(Path::new("/work"), root));
        assert!(!is_safe_target(Path::new("/work/shop-tests"), root));
        assert!(!is_safe_target(Path::new("/work/shop-tests-other/logs"), root));
    }

    #[test]
    fn test_outside_dir_is_not_removed() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let mut clean = args(root.path(), false);
        clean.logs_dir = outside.path().to_path_buf();

        let reporter = ProgressReporter::new(false, true);
        let err = clean_under(&reporter, &clean, root.path()).unwrap_err();
        assert!(err.to_string().contains("refusing"));
        assert!(outside.path().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link = root.path().join("logs");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        assert!(!is_safe_target(Path::new("logs"), root.path()));
    }

    #[test]
    fn test_removes_existing_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("allure-results/chrome/run_1")).unwrap();
        std::fs::create_dir_all(root.path().join("logs")).unwrap();
        std::fs::write(root.path().join("logs/end_to_end.log"), "Run #1").unwrap();

        let removed =
            clean_under(&ProgressReporter::new(false, true), &args(root.path(), false), root.path())
                .unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!root.path().join("allure-results").exists());
        assert!(!root.path().join("logs").exists());
    }

    #[test]
    fn test_dry_run_keeps_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("screenshots/chrome")).unwrap();
        let listed =
            clean_under(&ProgressReporter::new(false, true), &args(root.path(), true), root.path())
                .unwrap();
        assert_eq!(listed, vec![root.path().join("screenshots")]);
        assert!(root.path().join("screenshots/chrome").is_dir());
    }
}
