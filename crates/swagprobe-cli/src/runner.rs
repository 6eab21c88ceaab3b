//! Suite and repeat runners

use crate::commands::{RepeatArgs, RunArgs, SessionArgs};
use crate::config::{resolve_suite_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::handlers::report::generate_report;
use crate::output::ProgressReporter;
use crate::statistics::{RunSample, RunStatistics};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use swagprobe::suite::select;
use swagprobe::{CaseResult, DriverFactory, SimulatedFactory, SuiteConfig, SuiteRunner, TestCase};
use tracing::{info, warn};

/// Driver factory for the session flags
pub fn factory_for(session: &SessionArgs) -> CliResult<Box<dyn DriverFactory>> {
    if session.simulate {
        return Ok(Box::new(SimulatedFactory::default()));
    }
    #[cfg(feature = "browser")]
    {
        Ok(Box::new(swagprobe::ChromiumFactory))
    }
    #[cfg(not(feature = "browser"))]
    {
        Err(CliError::config(
            "built without the `browser` feature; pass --simulate",
        ))
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn suite_runner<'f>(factory: &'f dyn DriverFactory, suite: &SuiteConfig) -> CliResult<SuiteRunner<'f>> {
    let session = suite.session_config()?.adjusted_for_environment();
    Ok(SuiteRunner::new(factory, session, suite.page_settings())
        .with_screenshots(suite.screenshot_store())
        .with_seed(suite.seed))
}

/// Results of one suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteOutcome {
    /// Per-case results, in case order
    pub results: Vec<CaseResult>,
    /// Wall-clock time of the run
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl SuiteOutcome {
    /// Cases that passed
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Cases that failed or broke
    pub fn unsuccessful(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// Whether every case passed
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(CaseResult::passed)
    }

    /// [`CliError::TestExecution`] unless every case passed
    pub fn ensure_passed(&self) -> CliResult<()> {
        if self.all_passed() {
            Ok(())
        } else {
            Err(CliError::test_execution(format!(
                "{} of {} case(s) did not pass",
                self.unsuccessful(),
                self.results.len()
            )))
        }
    }
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Results of a repeat run
#[derive(Debug, Clone)]
pub struct RepeatOutcome {
    /// Case that was repeated
    pub case: String,
    /// Browser it ran in
    pub browser: String,
    /// One sample per iteration
    pub samples: Vec<RunSample>,
    /// Aggregate
    pub statistics: RunStatistics,
    /// Run log written
    pub log_file: PathBuf,
    /// Per-iteration Allure results directories
    pub results_dirs: Vec<PathBuf>,
    /// Generated HTML report, if any
    pub report_dir: Option<PathBuf>,
}

impl RepeatOutcome {
    /// [`CliError::TestExecution`] when any iteration failed
    pub fn ensure_passed(&self) -> CliResult<()> {
        if self.statistics.failed == 0 {
            Ok(())
        } else {
            Err(CliError::test_execution(format!(
                "{} of {} run(s) of {} failed",
                self.statistics.failed, self.statistics.iterations, self.case
            )))
        }
    }
}

/// Runs the suite for the CLI
#[derive(Debug)]
pub struct TestRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl TestRunner {
    /// Create a new test runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self { config, reporter }
    }

    /// Console reporter
    pub const fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    /// Run the selected cases once
    pub fn run(&mut self, args: &RunArgs) -> CliResult<SuiteOutcome> {
        let suite = resolve_suite_config(&args.session)?;
        let cases = select(args.filter.as_deref());
        if cases.is_empty() {
            return Err(CliError::invalid_argument(format!(
                "no case matches {:?}; see `swagprobe list`",
                args.filter.as_deref().unwrap_or_default()
            )));
        }
        let workers = args.workers.unwrap_or(suite.workers).max(1);
        let factory = factory_for(&args.session)?;
        let runner =
            suite_runner(factory.as_ref(), &suite)?.with_results_dir(suite.results_dir.clone());

        self.reporter.header("Swag Labs suite");
        self.reporter.info(&format!(
            "{} case(s), {} worker(s), {} via {}",
            cases.len(),
            workers,
            suite.browser,
            factory.name()
        ));
        if self.config.verbosity.is_verbose() {
            self.reporter
                .info(&format!("results in {}", suite.results_dir.display()));
        }
        self.reporter
            .start_progress(cases.len() as u64, "Running cases");

        let started = Instant::now();
        let reporter = &self.reporter;
        let results = runtime()?.block_on(runner.run_all_with(&cases, workers, |result| {
            reporter.case_finished(result);
        }));
        let outcome = SuiteOutcome {
            results,
            duration: started.elapsed(),
        };

        self.reporter.finish();
        self.reporter.summary(&outcome.results, outcome.duration);
        if let Some(ref path) = args.summary {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&outcome)?)?;
        }
        Ok(outcome)
    }

    /// Run one case `-n` times, logging every iteration
    pub fn repeat(&mut self, args: &RepeatArgs) -> CliResult<RepeatOutcome> {
        let case = TestCase::find(&args.case).ok_or_else(|| {
            CliError::invalid_argument(format!(
                "unknown case {:?}; see `swagprobe list`",
                args.case
            ))
        })?;
        if args.iterations == 0 {
            return Err(CliError::invalid_argument("-n must be at least 1"));
        }
        let suite = resolve_suite_config(&args.session)?;
        let browser = suite.browser_kind()?.name().to_string();
        let factory = factory_for(&args.session)?;
        let report = !args.no_report;
        let started_at = Local::now();

        let mut log = RunLog::create(&args.logs_dir, &case.id(), started_at)?;
        log.line(format!("Starting test run: {case}"))?;
        log.line(format!("Iterations: {}", args.iterations))?;
        log.line(format!("Browser: {browser}"))?;
        log.line(format!("Timestamp: {}", started_at.format("%Y-%m-%d %H:%M:%S")))?;
        log.line("=".repeat(80))?;

        self.reporter.header(&format!("Repeating {case}"));
        self.reporter.info(&format!(
            "{} iteration(s) with {browser}, log at {}",
            args.iterations,
            log.path.display()
        ));

        let rt = runtime()?;
        let results_root = suite.results_dir.join(&browser);
        let mut samples = Vec::new();
        let mut results_dirs = Vec::new();

        for iteration in 1..=args.iterations {
            let now = Local::now();
            log.line("")?;
            log.line(format!(
                "Run #{iteration} of {} - {}",
                args.iterations,
                now.format("%H:%M:%S")
            ))?;
            log.line("-".repeat(50))?;

            let mut runner = suite_runner(factory.as_ref(), &suite)?;
            if report {
                let dir = results_root.join(format!(
                    "run_{iteration}_{}",
                    now.format("%Y%m%d_%H%M%S_%f")
                ));
                runner = runner.with_results_dir(dir.clone());
                results_dirs.push(dir);
            }
            let result = rt.block_on(runner.run_case(&case));

            let verdict = if result.passed() { "PASSED" } else { "FAILED" };
            log.line(format!("Result: {verdict} ({})", result.status))?;
            log.line(format!(
                "Duration: {:.2} seconds",
                result.duration.as_secs_f64()
            ))?;
            if let Some(ref message) = result.message {
                log.line(format!("Error: {message}"))?;
            }
            log.line("-".repeat(50))?;

            let line = format!(
                "Run {iteration}/{} ({browser}): {verdict} in {:.2}s",
                args.iterations,
                result.duration.as_secs_f64()
            );
            if result.passed() {
                self.reporter.success(&line);
            } else {
                self.reporter.failure(&line);
            }
            samples.push(RunSample {
                iteration,
                passed: result.passed(),
                duration: result.duration,
            });
        }

        let statistics = RunStatistics::from_samples(&samples)
            .ok_or_else(|| CliError::test_execution("no iterations ran"))?;
        log.line("")?;
        log.line("=".repeat(80))?;
        log.line(statistics.to_string())?;
        log.flush()?;

        self.reporter.header("Test Run Complete");
        for line in statistics.to_string().lines() {
            self.reporter.info(line);
        }
        info!(
            case = %case,
            passed = statistics.passed,
            failed = statistics.failed,
            "repeat finished"
        );

        let report_dir = if report {
            let output = args
                .reports_dir
                .join(format!("{browser}_{}", started_at.format("%Y%m%d_%H%M%S")));
            match generate_report(&results_dirs, &output) {
                Ok(dir) => {
                    self.reporter
                        .success(&format!("Allure report generated in {}", dir.display()));
                    Some(dir)
                }
                Err(e) => {
                    warn!(error = %e, "allure report not generated");
                    self.reporter
                        .warning(&format!("Could not generate Allure report: {e}"));
                    None
                }
            }
        } else {
            None
        };

        Ok(RepeatOutcome {
            case: case.id(),
            browser,
            samples,
            statistics,
            log_file: log.path,
            results_dirs,
            report_dir,
        })
    }
}

/// Plain-text log of a repeat run
struct RunLog {
    path: PathBuf,
    out: BufWriter<File>,
}

impl RunLog {
    fn create(dir: &Path, case_id: &str, at: DateTime<Local>) -> CliResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "{}_{}.log",
            file_stem(case_id),
            at.format("%Y%m%d_%H%M%S")
        ));
        let out = BufWriter::new(File::create(&path)?);
        Ok(Self { path, out })
    }

    fn line(&mut self, text: impl AsRef<str>) -> CliResult<()> {
        writeln!(self.out, "{}", text.as_ref())?;
        Ok(())
    }

    fn flush(&mut self) -> CliResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// `login[standard_user]` -> `login_standard_user`
fn file_stem(case_id: &str) -> String {
    let stem: String = case_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    stem.trim_matches('_').to_string()
}
