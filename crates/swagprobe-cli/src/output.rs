//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use swagprobe::report::Status;
use swagprobe::CaseResult;

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a line without tearing the progress bar
    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.suspend(|| {
                let _ = self.term.write_line(text);
            }),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn prefix(&self, symbol: &str, fallback: &str, paint: fn(&str) -> String) -> String {
        if self.use_color {
            paint(symbol)
        } else {
            fallback.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("✓", "PASS", |s| style(s).green().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // failures are printed even in quiet mode
        let prefix = self.prefix("✗", "FAIL", |s| style(s).red().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("⚠", "WARN", |s| style(s).yellow().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("ℹ", "INFO", |s| style(s).blue().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// One line per finished case
    pub fn case_finished(&self, result: &CaseResult) {
        self.increment(1);
        let secs = result.duration.as_secs_f64();
        match result.status {
            Status::Passed => self.success(&format!("{} ({secs:.2}s)", result.id)),
            Status::Skipped => self.warning(&format!("{} skipped", result.id)),
            status => self.failure(&format!(
                "{} {status} ({secs:.2}s): {}",
                result.id,
                result.message.as_deref().unwrap_or("no message")
            )),
        }
    }

    /// Print the suite summary
    pub fn summary(&self, results: &[CaseResult], duration: Duration) {
        let count = |status: Status| results.iter().filter(|r| r.status == status).count();
        let (passed, failed, broken, skipped) = (
            count(Status::Passed),
            count(Status::Failed),
            count(Status::Broken),
            count(Status::Skipped),
        );
        let unsuccessful = failed + broken;
        if self.quiet && unsuccessful == 0 {
            return;
        }

        self.line("");
        let total = results.len();
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if unsuccessful > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            self.line(&format!(
                "{} {} cases in {:.2}s ({} passed, {} failed, {} broken, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                failed_style.apply_to(failed),
                failed_style.apply_to(broken),
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if unsuccessful > 0 { "FAILED" } else { "PASSED" };
            self.line(&format!(
                "{status} {total} cases in {duration_secs:.2}s ({passed} passed, {failed} failed, {broken} broken, {skipped} skipped)"
            ));
        }
    }
}
