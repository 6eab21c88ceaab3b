//! Report - Allure-compatible result files
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  TestRecorder (one per test case)                                    │
//! │                                                                      │
//! │   start_step ─► attach_* / parameter ─► finish_step   (nestable)     │
//! │                                                                      │
//! │   finish(status) ──► <results>/<uuid>-result.json                    │
//! │   attach_*       ──► <results>/<uuid>-attachment.<ext>               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The files follow the Allure 2 result format, so `allure generate` and
//! `allure serve` can render them directly. Without a results directory the
//! recorder still builds the result in memory.

use crate::result::{SwagError, SwagResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default results directory
pub const DEFAULT_RESULTS_DIR: &str = "allure-results";

/// Outcome of a test or step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Everything held
    Passed,
    /// An expected-tier check did not hold
    Failed,
    /// Infrastructure gave out
    Broken,
    /// Not run
    Skipped,
}

impl Status {
    /// Status an error should be reported with
    #[must_use]
    pub fn from_error(error: &SwagError) -> Self {
        match error.tier() {
            crate::result::FailureTier::Expected => Self::Failed,
            crate::result::FailureTier::Infrastructure => Self::Broken,
        }
    }

    /// Status of a finished operation
    #[must_use]
    pub fn of<T>(result: &SwagResult<T>) -> Self {
        result.as_ref().map_or_else(Self::from_error, |_| Self::Passed)
    }

    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Broken => "broken",
            Self::Skipped => "skipped",
        }
    }

    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity label values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks everything
    Blocker,
    /// Core flow
    Critical,
    /// Default
    Normal,
    /// Cosmetic
    Minor,
    /// Negligible
    Trivial,
}

impl Severity {
    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocker => "blocker",
            Self::Critical => "critical",
            Self::Normal => "normal",
            Self::Minor => "minor",
            Self::Trivial => "trivial",
        }
    }
}

/// Epic / feature / story classification of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Taxonomy {
    /// Epic
    pub epic: &'static str,
    /// Feature
    pub feature: &'static str,
    /// Story
    pub story: &'static str,
    /// Severity
    pub severity: Severity,
}

/// Name/value label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Label value
    pub value: String,
}

/// Name/value parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter value
    pub value: String,
}

/// Reference to an attachment file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name
    pub name: String,
    /// File name inside the results directory
    pub source: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Failure message and detail
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Short message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Longer detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// One step of a test, possibly with sub-steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Step title
    pub name: String,
    /// Outcome
    pub status: Status,
    /// Always `finished` once written
    pub stage: String,
    /// Start, epoch millis
    pub start: i64,
    /// Stop, epoch millis
    pub stop: i64,
    /// Nested steps
    #[serde(default)]
    pub steps: Vec<StepResult>,
    /// Attachments made while the step was open
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Step parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl StepResult {
    fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Passed,
            stage: "running".to_string(),
            start: now_millis(),
            stop: 0,
            steps: Vec::new(),
            attachments: Vec::new(),
            parameters: Vec::new(),
        }
    }
}

/// A complete test result document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// File stem of the result
    pub uuid: String,
    /// Stable identity across runs
    pub history_id: String,
    /// Short test name
    pub name: String,
    /// Qualified test name
    pub full_name: String,
    /// Outcome
    pub status: Status,
    /// Failure detail
    #[serde(default)]
    pub status_details: StatusDetails,
    /// Always `finished` once written
    pub stage: String,
    /// Start, epoch millis
    pub start: i64,
    /// Stop, epoch millis
    pub stop: i64,
    /// Labels: epic, feature, story, severity, ...
    pub labels: Vec<Label>,
    /// Test parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Top-level steps
    #[serde(default)]
    pub steps: Vec<StepResult>,
    /// Attachments made outside any step
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TestResult {
    /// Value of the first label called `name`
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Every step, depth first
    #[must_use]
    pub fn all_steps(&self) -> Vec<&StepResult> {
        fn walk<'a>(steps: &'a [StepResult], out: &mut Vec<&'a StepResult>) {
            for step in steps {
                out.push(step);
                walk(&step.steps, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.steps, &mut out);
        out
    }
}

/// Collects steps and attachments for one test and writes the result file
#[derive(Debug)]
pub struct TestRecorder {
    results_dir: Option<PathBuf>,
    result: TestResult,
    open: Vec<StepResult>,
}

impl TestRecorder {
    /// Start recording; `results_dir` is created lazily on first write
    #[must_use]
    pub fn new(
        results_dir: Option<&Path>,
        name: impl Into<String>,
        full_name: impl Into<String>,
        taxonomy: &Taxonomy,
    ) -> Self {
        let full_name = full_name.into();
        let labels = [
            ("epic", taxonomy.epic),
            ("feature", taxonomy.feature),
            ("story", taxonomy.story),
            ("severity", taxonomy.severity.as_str()),
            ("framework", "swagprobe"),
            ("language", "rust"),
        ]
        .into_iter()
        .map(|(name, value)| Label {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect();
        Self {
            results_dir: results_dir.map(Path::to_path_buf),
            result: TestResult {
                uuid: Uuid::new_v4().to_string(),
                history_id: full_name.clone(),
                name: name.into(),
                full_name,
                status: Status::Passed,
                status_details: StatusDetails::default(),
                stage: "running".to_string(),
                start: now_millis(),
                stop: 0,
                labels,
                parameters: Vec::new(),
                steps: Vec::new(),
                attachments: Vec::new(),
            },
            open: Vec::new(),
        }
    }

    /// The result built so far
    #[must_use]
    pub const fn result(&self) -> &TestResult {
        &self.result
    }

    /// Number of steps currently open
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Add a label
    pub fn label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.result.labels.push(Label {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Add a parameter to the innermost open step, or to the test
    pub fn parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let parameter = Parameter {
            name: name.into(),
            value: value.into(),
        };
        match self.open.last_mut() {
            Some(step) => step.parameters.push(parameter),
            None => self.result.parameters.push(parameter),
        }
    }

    /// Open a step nested in the current one
    pub fn start_step(&mut self, name: impl Into<String>) {
        let step = StepResult::open(name);
        debug!(step = %step.name, depth = self.open.len(), "step started");
        self.open.push(step);
    }

    /// Close the innermost open step
    pub fn finish_step(&mut self, status: Status) {
        let Some(mut step) = self.open.pop() else {
            warn!("finish_step called with no open step");
            return;
        };
        step.status = status;
        step.stage = "finished".to_string();
        step.stop = now_millis();
        match self.open.last_mut() {
            Some(parent) => parent.steps.push(step),
            None => self.result.steps.push(step),
        }
    }

    /// Attach plain text
    pub fn attach_text(&mut self, name: &str, text: &str) {
        self.attach(name, text.as_bytes(), "text/plain", "txt");
    }

    /// Attach a PNG image
    pub fn attach_png(&mut self, name: &str, png: &[u8]) {
        self.attach(name, png, "image/png", "png");
    }

    /// Attach a JSON document, pretty printed
    pub fn attach_json(&mut self, name: &str, value: &serde_json::Value) {
        match serde_json::to_vec_pretty(value) {
            Ok(bytes) => self.attach(name, &bytes, "application/json", "json"),
            Err(e) => warn!(attachment = name, error = %e, "could not serialise attachment"),
        }
    }

    fn attach(&mut self, name: &str, data: &[u8], mime_type: &str, extension: &str) {
        let source = format!("{}-attachment.{extension}", Uuid::new_v4());
        if let Some(ref dir) = self.results_dir {
            let written = std::fs::create_dir_all(dir)
                .and_then(|()| std::fs::write(dir.join(&source), data));
            if let Err(e) = written {
                warn!(attachment = name, error = %e, "could not write attachment");
                return;
            }
        }
        let attachment = Attachment {
            name: name.to_string(),
            source,
            mime_type: mime_type.to_string(),
        };
        match self.open.last_mut() {
            Some(step) => step.attachments.push(attachment),
            None => self.result.attachments.push(attachment),
        }
    }

    /// Close any open steps with `status`, stamp the result and write
    /// `<uuid>-result.json`
    ///
    /// # Errors
    ///
    /// I/O or serialisation errors while writing the result file.
    pub fn finish(mut self, status: Status, details: Option<String>) -> SwagResult<TestResult> {
        while !self.open.is_empty() {
            self.finish_step(status);
        }
        self.result.status = status;
        self.result.status_details = StatusDetails {
            message: details,
            trace: None,
        };
        self.result.stage = "finished".to_string();
        self.result.stop = now_millis();

        if let Some(ref dir) = self.results_dir {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}-result.json", self.result.uuid));
            std::fs::write(&path, serde_json::to_vec_pretty(&self.result)?)?;
            debug!(path = %path.display(), status = %status, "result written");
        }
        Ok(self.result)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
