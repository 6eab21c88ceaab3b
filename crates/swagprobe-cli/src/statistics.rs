//! Repeat-run statistics
//!
//! Summarises N runs of one case: pass/fail counts, success rate and the
//! spread of run durations. The standard deviation is the sample one
//! (n - 1 denominator) and is zero for a single run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One iteration of a repeat run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSample {
    /// 1-based iteration number
    pub iteration: u32,
    /// Whether the case passed
    pub passed: bool,
    /// Wall-clock time of the iteration
    pub duration: Duration,
}

/// Aggregate over all iterations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Iterations run
    pub iterations: usize,
    /// Iterations that passed
    pub passed: usize,
    /// Iterations that did not
    pub failed: usize,
    /// Mean duration in seconds
    pub mean_secs: f64,
    /// Shortest duration in seconds
    pub min_secs: f64,
    /// Longest duration in seconds
    pub max_secs: f64,
    /// Sample standard deviation in seconds
    pub std_dev_secs: f64,
}

impl RunStatistics {
    /// Summarise `samples`; `None` when there are none
    pub fn from_samples(samples: &[RunSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let secs: Vec<f64> = samples.iter().map(|s| s.duration.as_secs_f64()).collect();
        let n = secs.len() as f64;
        let mean = secs.iter().sum::<f64>() / n;
        let min = secs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = secs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = if secs.len() > 1 {
            (secs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let passed = samples.iter().filter(|s| s.passed).count();
        Some(Self {
            iterations: samples.len(),
            passed,
            failed: samples.len() - passed,
            mean_secs: mean,
            min_secs: min,
            max_secs: max,
            std_dev_secs: std_dev,
        })
    }

    /// Passed iterations as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.passed as f64 / self.iterations as f64 * 100.0
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results: {} passed, {} failed", self.passed, self.failed)?;
        writeln!(f, "Success rate: {:.2}%", self.success_rate())?;
        writeln!(f, "Average run time: {:.2} seconds", self.mean_secs)?;
        write!(
            f,
            "Min: {:.2}s, Max: {:.2}s, StdDev: {:.2}s",
            self.min_secs, self.max_secs, self.std_dev_secs
        )
    }
}
