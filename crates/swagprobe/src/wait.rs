//! Wait Mechanisms
//!
//! Bounded polling of the live DOM until a [`Condition`] holds.
//!
//! ## Timing contract
//!
//! - The condition is evaluated at least once, even with a zero timeout.
//! - Success is returned on the first poll that observes the condition.
//! - A condition that never holds fails with [`SwagError::Timeout`] no earlier
//!   than `timeout` and no later than `timeout + poll_interval`; the final sleep
//!   is clamped to the remaining budget.
//! - Transient driver errors (see [`SwagError::is_transient`]) count as
//!   "not yet". Anything else aborts the wait immediately.
//!
//! Sleeping goes through `tokio::time`, so tests can drive the clock with
//! `#[tokio::test(start_paused = true)]`.

use crate::driver::{BrowserDriver, ElementHandle};
use crate::locator::Locator;
use crate::result::{SwagError, SwagResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Smallest poll interval honoured; zero would spin without yielding time
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration, never below one millisecond
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// A predicate over the browser's current DOM snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one element matches
    Present(Locator),
    /// First match is displayed
    Visible(Locator),
    /// First match is displayed and enabled
    Clickable(Locator),
    /// Nothing matches, or the first match is hidden
    Absent(Locator),
    /// First match's text equals `text` exactly
    TextEquals {
        /// Element to read
        locator: Locator,
        /// Expected text, compared without normalisation
        text: String,
    },
    /// Current URL contains the fragment
    UrlContains(String),
    /// JavaScript expression evaluates to a truthy value
    ScriptTruthy(String),
    /// Every part holds on the same poll; nested `All` is rejected
    All(Vec<Condition>),
}

impl Condition {
    /// Text-equality condition
    #[must_use]
    pub fn text_equals(locator: Locator, text: impl Into<String>) -> Self {
        Self::TextEquals {
            locator,
            text: text.into(),
        }
    }

    /// Kind name, used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Present(_) => "presence",
            Self::Visible(_) => "visibility",
            Self::Clickable(_) => "clickability",
            Self::Absent(_) => "absence",
            Self::TextEquals { .. } => "text",
            Self::UrlContains(_) => "url",
            Self::ScriptTruthy(_) => "script",
            Self::All(_) => "all",
        }
    }

    /// Evaluate once. `Ok(None)` means the condition does not hold yet.
    ///
    /// # Errors
    ///
    /// Returns whatever the driver returns; the caller decides whether the
    /// error is transient.
    pub async fn probe(&self, driver: &dyn BrowserDriver) -> SwagResult<Option<WaitOutcome>> {
        let Self::All(parts) = self else {
            return self.probe_single(driver).await;
        };
        let mut last = None;
        for part in parts {
            match part.probe_single(driver).await? {
                Some(outcome) => last = Some(outcome),
                None => return Ok(None),
            }
        }
        Ok(last)
    }

    async fn probe_single(&self, driver: &dyn BrowserDriver) -> SwagResult<Option<WaitOutcome>> {
        let outcome = match self {
            Self::Present(locator) => driver.find_element(locator).await?.map(WaitOutcome::Element),
            Self::Visible(locator) => driver
                .find_element(locator)
                .await?
                .filter(|el| el.displayed)
                .map(WaitOutcome::Element),
            Self::Clickable(locator) => driver
                .find_element(locator)
                .await?
                .filter(ElementHandle::is_clickable)
                .map(WaitOutcome::Element),
            Self::Absent(locator) => match driver.find_element(locator).await? {
                Some(el) if el.displayed => None,
                _ => Some(WaitOutcome::Gone),
            },
            Self::TextEquals { locator, text } => driver
                .find_element(locator)
                .await?
                .filter(|el| el.text == *text)
                .map(WaitOutcome::Element),
            Self::UrlContains(fragment) => {
                let url = driver.current_url().await?;
                url.contains(fragment.as_str()).then_some(WaitOutcome::Url(url))
            }
            Self::ScriptTruthy(script) => {
                let value = driver.execute_script(script).await?;
                is_truthy(&value).then_some(WaitOutcome::Value(value))
            }
            Self::All(_) => {
                return Err(SwagError::config("all-of conditions cannot be nested"));
            }
        };
        Ok(outcome)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(l) => write!(f, "presence of {l}"),
            Self::Visible(l) => write!(f, "visibility of {l}"),
            Self::Clickable(l) => write!(f, "{l} to be clickable"),
            Self::Absent(l) => write!(f, "absence of {l}"),
            Self::TextEquals { locator, text } => write!(f, "{locator} to read {text:?}"),
            Self::UrlContains(s) => write!(f, "url containing {s:?}"),
            Self::ScriptTruthy(s) => write!(f, "script {s:?} to be truthy"),
            Self::All(parts) => {
                let parts: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

/// JavaScript truthiness of a JSON value
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// What a satisfied condition produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The matching element
    Element(ElementHandle),
    /// The URL that matched
    Url(String),
    /// The truthy script value
    Value(serde_json::Value),
    /// The element is gone or hidden
    Gone,
}

impl WaitOutcome {
    /// The element, if the condition produced one
    #[must_use]
    pub fn into_element(self) -> Option<ElementHandle> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls a driver until conditions hold
#[derive(Clone, Copy)]
pub struct Waiter<'a> {
    driver: &'a dyn BrowserDriver,
    options: WaitOptions,
}

impl fmt::Debug for Waiter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Waiter<'a> {
    /// Create a waiter with explicit options
    #[must_use]
    pub const fn new(driver: &'a dyn BrowserDriver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// Same driver, different budget
    #[must_use]
    pub const fn with_options(self, options: WaitOptions) -> Self {
        Self {
            driver: self.driver,
            options,
        }
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Wait for one condition
    ///
    /// # Errors
    ///
    /// [`SwagError::Timeout`] when the budget runs out, or the first
    /// non-transient driver error.
    pub async fn until(&self, condition: &Condition) -> SwagResult<WaitOutcome> {
        self.until_any(std::slice::from_ref(condition))
            .await
            .map(|(_, outcome)| outcome)
    }

    /// Wait until any condition holds; returns the index of the first one
    /// that matched on the winning poll.
    ///
    /// # Errors
    ///
    /// [`SwagError::Timeout`] when none holds within the budget, a
    /// configuration error for an empty slice, or the first non-transient
    /// driver error.
    pub async fn until_any(&self, conditions: &[Condition]) -> SwagResult<(usize, WaitOutcome)> {
        if conditions.is_empty() {
            return Err(SwagError::config("wait needs at least one condition"));
        }

        let start = Instant::now();
        let timeout = self.options.timeout();
        let poll_interval = self.options.poll_interval();
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            for (index, condition) in conditions.iter().enumerate() {
                match condition.probe(self.driver).await {
                    Ok(Some(outcome)) => {
                        debug!(
                            condition = %condition,
                            polls,
                            elapsed_ms = elapsed_ms(start),
                            "wait satisfied"
                        );
                        return Ok((index, outcome));
                    }
                    Ok(None) => {}
                    Err(err) if err.is_transient() => {
                        trace!(condition = %condition, error = %err, "transient error while waiting");
                    }
                    Err(err) => return Err(err),
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                let condition = conditions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" or ");
                debug!(%condition, polls, "wait timed out");
                return Err(SwagError::Timeout {
                    condition,
                    waited_ms: elapsed_ms(start),
                });
            }
            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Wait for presence
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn present(&self, locator: &Locator) -> SwagResult<ElementHandle> {
        self.element(Condition::Present(locator.clone())).await
    }

    /// Wait for visibility
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn visible(&self, locator: &Locator) -> SwagResult<ElementHandle> {
        self.element(Condition::Visible(locator.clone())).await
    }

    /// Wait for clickability
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn clickable(&self, locator: &Locator) -> SwagResult<ElementHandle> {
        self.element(Condition::Clickable(locator.clone())).await
    }

    /// Wait for exact text
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn text_equals(&self, locator: &Locator, text: &str) -> SwagResult<ElementHandle> {
        self.element(Condition::text_equals(locator.clone(), text)).await
    }

    /// Wait for the element to disappear or hide
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn absent(&self, locator: &Locator) -> SwagResult<()> {
        self.until(&Condition::Absent(locator.clone())).await.map(|_| ())
    }

    /// Wait for a URL fragment; returns the full URL
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn url_contains(&self, fragment: &str) -> SwagResult<String> {
        match self.until(&Condition::UrlContains(fragment.to_string())).await? {
            WaitOutcome::Url(url) => Ok(url),
            other => Err(unexpected(&other)),
        }
    }

    /// Wait for a truthy script result
    ///
    /// # Errors
    ///
    /// See [`Waiter::until`].
    pub async fn script_truthy(&self, script: &str) -> SwagResult<serde_json::Value> {
        match self.until(&Condition::ScriptTruthy(script.to_string())).await? {
            WaitOutcome::Value(value) => Ok(value),
            other => Err(unexpected(&other)),
        }
    }

    async fn element(&self, condition: Condition) -> SwagResult<ElementHandle> {
        let outcome = self.until(&condition).await?;
        outcome
            .clone()
            .into_element()
            .ok_or_else(|| unexpected(&outcome))
    }
}

fn unexpected(outcome: &WaitOutcome) -> SwagError {
    SwagError::script(format!("unexpected wait outcome {outcome:?}"))
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
