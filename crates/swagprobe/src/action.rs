//! Actions with retry and fallback.
//!
//! Every click and every text entry in the page objects goes through an
//! [`Actor`]. An action walks an ordered [`FallbackChain`]: attempt `n` uses
//! strategy `min(n, len) - 1`, so a `[Native, Script]` chain with three
//! attempts tries native once and script twice. An attempt counts as
//! successful only when its post-condition holds (for clicks) or when the
//! field reads back exactly the entered text (for typing).
//!
//! ## Example
//!
//! ```ignore
//! let actor = Actor::new(driver, RetryPolicy::default());
//! actor
//!     .click(&FINISH, &FallbackChain::native_then_script(), Some(&done))
//!     .await?;
//! ```

use crate::driver::{BrowserDriver, ScriptAction};
use crate::locator::Locator;
use crate::result::{SwagError, SwagResult};
use crate::wait::{Condition, WaitOptions, Waiter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// =============================================================================
// RETRY POLICY
// =============================================================================

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Constant delay
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Doubling delay, capped
    Exponential {
        /// First delay in milliseconds
        initial_ms: u64,
        /// Upper bound in milliseconds
        max_ms: u64,
    },
}

impl Backoff {
    /// Delay after the given 1-based attempt
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { initial_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(32);
                let factor = 1_u64 << shift;
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed { delay_ms: 1_000 }
    }
}

/// Retry policy shared by every action call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts across the fallback chain
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff: Backoff,
    /// Budget for each post-condition check, in milliseconds
    pub verify_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            verify_timeout_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt count and default backoff
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Set the backoff
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the verification budget
    #[must_use]
    pub const fn with_verify_timeout(mut self, verify_timeout_ms: u64) -> Self {
        self.verify_timeout_ms = verify_timeout_ms;
        self
    }

    /// At least one attempt is always made
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Verification budget as Duration
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

/// How to click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickStrategy {
    /// Pointer click through the driver
    Native,
    /// `element.click()` injected as script
    Script,
}

/// How to enter text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputStrategy {
    /// Clear, then keystrokes through the driver
    Native,
    /// Assign `value` and dispatch `input`/`change` events
    Script,
}

impl ClickStrategy {
    /// Name for logs and reports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Native => "native click",
            Self::Script => "script click",
        }
    }
}

impl InputStrategy {
    /// Name for logs and reports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Native => "native typing",
            Self::Script => "script value",
        }
    }
}

/// Ordered strategies tried across attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain<S> {
    strategies: Vec<S>,
}

impl<S: Copy> FallbackChain<S> {
    /// Build a chain; an empty list is rejected
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `strategies` is empty.
    pub fn new(strategies: Vec<S>) -> SwagResult<Self> {
        if strategies.is_empty() {
            return Err(SwagError::config("fallback chain needs at least one strategy"));
        }
        Ok(Self { strategies })
    }

    /// Single-strategy chain
    #[must_use]
    pub fn only(strategy: S) -> Self {
        Self {
            strategies: vec![strategy],
        }
    }

    /// Strategy for a 1-based attempt; the last strategy repeats
    #[must_use]
    pub fn strategy_for(&self, attempt: u32) -> S {
        let index = usize::try_from(attempt.saturating_sub(1)).unwrap_or(usize::MAX);
        self.strategies[index.min(self.strategies.len() - 1)]
    }

    /// Primary strategy
    #[must_use]
    pub fn primary(&self) -> S {
        self.strategies[0]
    }

    /// Number of distinct steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Always false; chains are never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl FallbackChain<ClickStrategy> {
    /// Native click, then script click
    #[must_use]
    pub fn native_then_script() -> Self {
        Self {
            strategies: vec![ClickStrategy::Native, ClickStrategy::Script],
        }
    }
}

impl FallbackChain<InputStrategy> {
    /// Native typing, then script value assignment
    #[must_use]
    pub fn typing_then_script() -> Self {
        Self {
            strategies: vec![InputStrategy::Native, InputStrategy::Script],
        }
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// What to do once every attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tolerance {
    /// Raise [`SwagError::ActionExhausted`]
    #[default]
    Strict,
    /// Return a report with `succeeded == false`
    Lenient,
}

/// Outcome of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    /// Action name
    pub action: &'static str,
    /// Locator description
    pub locator: String,
    /// Attempts made
    pub attempts: u32,
    /// Strategy that succeeded
    pub strategy: Option<&'static str>,
    /// Whether any attempt succeeded
    pub succeeded: bool,
    /// Last failure observed
    pub last_error: Option<String>,
    /// Wall time spent
    pub elapsed_ms: u64,
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.succeeded, self.strategy) {
            (true, Some(strategy)) => write!(
                f,
                "{} on {} succeeded via {strategy} (attempt {})",
                self.action, self.locator, self.attempts
            ),
            _ => write!(
                f,
                "{} on {} failed after {} attempt(s): {}",
                self.action,
                self.locator,
                self.attempts,
                self.last_error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// Performs actions against a driver under a retry policy
#[derive(Clone, Copy)]
pub struct Actor<'a> {
    driver: &'a dyn BrowserDriver,
    policy: RetryPolicy,
    tolerance: Tolerance,
    scroll_into_view: bool,
    poll_interval_ms: u64,
}

impl fmt::Debug for Actor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("policy", &self.policy)
            .field("tolerance", &self.tolerance)
            .field("scroll_into_view", &self.scroll_into_view)
            .finish_non_exhaustive()
    }
}

impl<'a> Actor<'a> {
    /// Strict actor that scrolls before each attempt
    #[must_use]
    pub fn new(driver: &'a dyn BrowserDriver, policy: RetryPolicy) -> Self {
        Self {
            driver,
            policy,
            tolerance: Tolerance::Strict,
            scroll_into_view: true,
            poll_interval_ms: crate::wait::DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set tolerance
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Toggle scroll-into-view before attempts
    #[must_use]
    pub const fn with_scroll_into_view(mut self, enabled: bool) -> Self {
        self.scroll_into_view = enabled;
        self
    }

    /// Poll interval for post-condition checks
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Active policy
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Click with fallback; when `post_condition` is given, an attempt only
    /// counts once it holds within the verification budget.
    ///
    /// # Errors
    ///
    /// Non-transient driver errors abort at once. With [`Tolerance::Strict`],
    /// exhaustion yields [`SwagError::ActionExhausted`].
    pub async fn click(
        &self,
        locator: &Locator,
        chain: &FallbackChain<ClickStrategy>,
        post_condition: Option<&Condition>,
    ) -> SwagResult<ActionReport> {
        let start = Instant::now();
        let mut last_error = None;
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            let strategy = chain.strategy_for(attempt);
            self.scroll(locator).await?;

            let outcome = match self.perform_click(locator, strategy).await {
                Ok(()) => match post_condition {
                    Some(condition) => self.verify(condition).await,
                    None => Ok(()),
                },
                Err(err) => Err(err),
            };

            match outcome {
                Ok(()) => {
                    debug!(%locator, strategy = strategy.name(), attempt, "click succeeded");
                    return Ok(success("click", locator, attempt, strategy.name(), start));
                }
                Err(err) if err.is_transient() => {
                    warn!(%locator, strategy = strategy.name(), attempt, error = %err, "click attempt failed");
                    last_error = Some(err.to_string());
                }
                Err(err) => return Err(err),
            }
            self.pause(attempt, attempts).await;
        }

        self.exhausted("click", locator, attempts, last_error, start)
    }

    /// Enter text with fallback. Each attempt reads the field back and
    /// compares with exact string equality.
    ///
    /// # Errors
    ///
    /// Non-transient driver errors abort at once. With [`Tolerance::Strict`],
    /// exhaustion yields [`SwagError::ActionExhausted`].
    pub async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        chain: &FallbackChain<InputStrategy>,
    ) -> SwagResult<ActionReport> {
        let start = Instant::now();
        let mut last_error = None;
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            let strategy = chain.strategy_for(attempt);
            self.scroll(locator).await?;

            let outcome = match self.perform_input(locator, text, strategy).await {
                Ok(()) => self.read_back(locator, text).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(()) => {
                    debug!(%locator, strategy = strategy.name(), attempt, "text entered");
                    return Ok(success("type", locator, attempt, strategy.name(), start));
                }
                Err(err) if err.is_transient() || matches!(err, SwagError::FieldMismatch { .. }) => {
                    warn!(%locator, strategy = strategy.name(), attempt, error = %err, "input attempt failed");
                    last_error = Some(err.to_string());
                }
                Err(err) => return Err(err),
            }
            self.pause(attempt, attempts).await;
        }

        self.exhausted("type", locator, attempts, last_error, start)
    }

    /// Current value of a form control, exactly as the browser reports it
    ///
    /// # Errors
    ///
    /// [`SwagError::ElementNotFound`] when nothing matches.
    pub async fn read_value(&self, locator: &Locator) -> SwagResult<String> {
        let element = self
            .driver
            .find_element(locator)
            .await?
            .ok_or_else(|| SwagError::ElementNotFound {
                locator: locator.to_string(),
            })?;
        Ok(element.value.unwrap_or_default())
    }

    async fn perform_click(&self, locator: &Locator, strategy: ClickStrategy) -> SwagResult<()> {
        match strategy {
            ClickStrategy::Native => self.driver.click(locator).await,
            ClickStrategy::Script => self
                .driver
                .run_script(locator, &ScriptAction::Click)
                .await
                .map(|_| ()),
        }
    }

    async fn perform_input(
        &self,
        locator: &Locator,
        text: &str,
        strategy: InputStrategy,
    ) -> SwagResult<()> {
        match strategy {
            InputStrategy::Native => {
                self.driver.clear(locator).await?;
                self.driver.send_keys(locator, text).await
            }
            InputStrategy::Script => self
                .driver
                .run_script(locator, &ScriptAction::SetValue(text.to_string()))
                .await
                .map(|_| ()),
        }
    }

    async fn read_back(&self, locator: &Locator, expected: &str) -> SwagResult<()> {
        let actual = self.read_value(locator).await?;
        if actual == expected {
            Ok(())
        } else {
            Err(SwagError::FieldMismatch {
                field: locator.selector().to_string(),
                expected: expected.to_string(),
                actual,
            })
        }
    }

    async fn verify(&self, condition: &Condition) -> SwagResult<()> {
        let options = WaitOptions::new()
            .with_timeout(self.policy.verify_timeout_ms)
            .with_poll_interval(self.poll_interval_ms);
        Waiter::new(self.driver, options)
            .until(condition)
            .await
            .map(|_| ())
    }

    async fn scroll(&self, locator: &Locator) -> SwagResult<()> {
        if !self.scroll_into_view {
            return Ok(());
        }
        match self
            .driver
            .run_script(locator, &ScriptAction::ScrollIntoView)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_transient() => {
                debug!(%locator, error = %err, "scroll into view skipped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn pause(&self, attempt: u32, attempts: u32) {
        if attempt < attempts {
            let delay = self.policy.backoff.delay_after(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn exhausted(
        &self,
        action: &'static str,
        locator: &Locator,
        attempts: u32,
        last_error: Option<String>,
        start: Instant,
    ) -> SwagResult<ActionReport> {
        let last_error = last_error.unwrap_or_else(|| "no attempt completed".to_string());
        match self.tolerance {
            Tolerance::Strict => Err(SwagError::ActionExhausted {
                action: action.to_string(),
                locator: locator.to_string(),
                attempts,
                last_error,
            }),
            Tolerance::Lenient => {
                info!(%locator, action, attempts, "action exhausted, continuing");
                Ok(ActionReport {
                    action,
                    locator: locator.to_string(),
                    attempts,
                    strategy: None,
                    succeeded: false,
                    last_error: Some(last_error),
                    elapsed_ms: elapsed_ms(start),
                })
            }
        }
    }
}

fn success(
    action: &'static str,
    locator: &Locator,
    attempt: u32,
    strategy: &'static str,
    start: Instant,
) -> ActionReport {
    ActionReport {
        action,
        locator: locator.to_string(),
        attempts: attempt,
        strategy: Some(strategy),
        succeeded: true,
        last_error: None,
        elapsed_ms: elapsed_ms(start),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::simulated::{ShopBehavior, SimulatedShop};
    use proptest::prelude::*;

    const BASE: &str = "https://www.saucedemo.com/";

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(3)
            .with_backoff(Backoff::None)
            .with_verify_timeout(500)
    }

    async fn login_page(behavior: ShopBehavior) -> SimulatedShop {
        let shop = SimulatedShop::with_behavior(behavior);
        shop.navigate(BASE).await.unwrap();
        shop
    }

    mod backoff_tests {
        use super::*;

        #[test]
        fn test_fixed_and_none() {
            assert_eq!(Backoff::None.delay_after(2), Duration::ZERO);
            assert_eq!(
                Backoff::Fixed { delay_ms: 1_000 }.delay_after(5),
                Duration::from_secs(1)
            );
        }

        #[test]
        fn test_exponential_doubles_then_caps() {
            let b = Backoff::Exponential {
                initial_ms: 100,
                max_ms: 350,
            };
            assert_eq!(b.delay_after(1), Duration::from_millis(100));
            assert_eq!(b.delay_after(2), Duration::from_millis(200));
            assert_eq!(b.delay_after(3), Duration::from_millis(350));
            assert_eq!(b.delay_after(200), Duration::from_millis(350));
        }

        #[test]
        fn test_policy_always_attempts_once() {
            assert_eq!(RetryPolicy::new(0).attempts(), 1);
            assert_eq!(RetryPolicy::default().attempts(), 3);
        }

        #[test]
        fn test_backoff_yaml_shape() {
            let b: Backoff =
                serde_yaml_ng::from_str("kind: exponential\ninitial_ms: 50\nmax_ms: 400\n")
                    .unwrap();
            assert_eq!(
                b,
                Backoff::Exponential {
                    initial_ms: 50,
                    max_ms: 400
                }
            );
        }

        proptest! {
            #[test]
            fn prop_exponential_never_exceeds_max(
                initial in 0u64..10_000,
                max in 0u64..60_000,
                attempt in 0u32..1_000,
            ) {
                let b = Backoff::Exponential { initial_ms: initial, max_ms: max };
                prop_assert!(b.delay_after(attempt) <= Duration::from_millis(max));
            }
        }
    }

    mod chain_tests {
        use super::*;

        #[test]
        fn test_last_strategy_repeats() {
            let chain = FallbackChain::native_then_script();
            assert_eq!(chain.strategy_for(1), ClickStrategy::Native);
            assert_eq!(chain.strategy_for(2), ClickStrategy::Script);
            assert_eq!(chain.strategy_for(3), ClickStrategy::Script);
            assert_eq!(chain.primary(), ClickStrategy::Native);
        }

        #[test]
        fn test_empty_chain_rejected() {
            assert!(FallbackChain::<ClickStrategy>::new(Vec::new()).is_err());
            assert_eq!(FallbackChain::only(InputStrategy::Script).len(), 1);
        }

        proptest! {
            #[test]
            fn prop_first_attempt_is_primary(script_first in any::<bool>(), attempts in 1u32..10) {
                let strategies = if script_first {
                    vec![ClickStrategy::Script, ClickStrategy::Native]
                } else {
                    vec![ClickStrategy::Native, ClickStrategy::Script]
                };
                let chain = FallbackChain::new(strategies.clone()).unwrap();
                prop_assert_eq!(chain.strategy_for(1), strategies[0]);
                prop_assert!(chain.strategy_for(attempts) == strategies[0]
                    || chain.strategy_for(attempts) == strategies[1]);
            }
        }
    }

    mod click_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_primary_success_reports_first_attempt() {
            let shop = login_page(ShopBehavior::default()).await;
            let actor = Actor::new(&shop, quick_policy());
            let report = actor
                .click(
                    &Locator::id("login-button"),
                    &FallbackChain::native_then_script(),
                    Some(&Condition::Visible(Locator::data_test("error"))),
                )
                .await
                .unwrap();
            assert!(report.succeeded);
            assert_eq!(report.attempts, 1);
            assert_eq!(report.strategy, Some("native click"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_intercepted_click_falls_back_to_script() {
            let shop = login_page(
                ShopBehavior::default().with_intercepted_clicks(Locator::id("login-button"), 5),
            )
            .await;
            let actor = Actor::new(&shop, quick_policy());
            let report = actor
                .click(
                    &Locator::id("login-button"),
                    &FallbackChain::native_then_script(),
                    None,
                )
                .await
                .unwrap();
            assert_eq!(report.attempts, 2);
            assert_eq!(report.strategy, Some("script click"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_strict_exhaustion_raises() {
            let shop = login_page(ShopBehavior::default()).await;
            let actor = Actor::new(&shop, quick_policy());
            let err = actor
                .click(
                    &Locator::id("missing"),
                    &FallbackChain::native_then_script(),
                    None,
                )
                .await
                .unwrap_err();
            match err {
                SwagError::ActionExhausted { attempts, .. } => assert_eq!(attempts, 3),
                other => panic!("unexpected error {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_lenient_exhaustion_reports_false() {
            let shop = login_page(ShopBehavior::default()).await;
            let actor = Actor::new(&shop, quick_policy()).with_tolerance(Tolerance::Lenient);
            let report = actor
                .click(
                    &Locator::id("login-button"),
                    &FallbackChain::only(ClickStrategy::Script),
                    Some(&Condition::Visible(Locator::id("inventory_container"))),
                )
                .await
                .unwrap();
            assert!(!report.succeeded);
            assert_eq!(report.attempts, 3);
            assert!(report.last_error.unwrap().contains("Timed out"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_backoff_spaces_attempts() {
            let shop = login_page(ShopBehavior::default()).await;
            let policy = quick_policy().with_backoff(Backoff::Fixed { delay_ms: 1_000 });
            let actor = Actor::new(&shop, policy).with_tolerance(Tolerance::Lenient);
            let start = Instant::now();
            actor
                .click(&Locator::id("missing"), &FallbackChain::only(ClickStrategy::Native), None)
                .await
                .unwrap();
            assert!(start.elapsed() >= Duration::from_secs(2));
            assert!(start.elapsed() < Duration::from_secs(3));
        }
    }

    mod type_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_read_back_is_exact() {
            let shop = login_page(ShopBehavior::default()).await;
            let actor = Actor::new(&shop, quick_policy());
            let field = Locator::id("user-name");
            actor
                .type_text(&field, "T6H5J3", &FallbackChain::typing_then_script())
                .await
                .unwrap();
            assert_eq!(actor.read_value(&field).await.unwrap(), "T6H5J3");
        }

        #[tokio::test(start_paused = true)]
        async fn test_whitespace_is_preserved() {
            let shop = login_page(ShopBehavior::default()).await;
            let actor = Actor::new(&shop, quick_policy());
            let field = Locator::id("password");
            actor
                .type_text(&field, " secret_sauce ", &FallbackChain::typing_then_script())
                .await
                .unwrap();
            assert_eq!(actor.read_value(&field).await.unwrap(), " secret_sauce ");
        }

        #[tokio::test(start_paused = true)]
        async fn test_dropped_keystrokes_fall_back_to_script() {
            let shop = login_page(ShopBehavior::default().with_dropped_keys(Locator::id("user-name")))
                .await;
            let actor = Actor::new(&shop, quick_policy());
            let report = actor
                .type_text(
                    &Locator::id("user-name"),
                    "standard_user",
                    &FallbackChain::typing_then_script(),
                )
                .await
                .unwrap();
            assert_eq!(report.attempts, 2);
            assert_eq!(report.strategy, Some("script value"));
        }
    }
}
