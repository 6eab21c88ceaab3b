//! The end-to-end suite
//!
//! | Case | Covers |
//! |---|---|
//! | `login[<user>]` | every demo account; only `locked_out_user` is refused |
//! | `inventory` | two random products, badge reads 2 after a reload |
//! | `cart` | the cart lists exactly the picked products |
//! | `checkout_step_one` | buyer details read back exactly |
//! | `checkout_step_two` | overview title, order lines and totals |
//! | `end_to_end` | finish and the confirmation screen |
//!
//! Every case runs in a browser session of its own and produces a
//! [`CaseResult`] plus an Allure result file when a results directory is set.

use crate::catalog::{Credentials, CHECKOUT_INFO, USERS};
use crate::fixture::Scenario;
use crate::page_object::{PageContext, PageObject, PageSettings};
use crate::pages::{CheckoutCompletePage, InventoryPage, LoginOutcome, LoginPage};
use crate::report::{Severity, Status, Taxonomy, TestRecorder};
use crate::result::{ensure, SwagError, SwagResult};
use crate::screenshot::ScreenshotStore;
use crate::session::{with_session, DriverFactory, SessionConfig};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Confirmation headline after a successful order
pub const ORDER_CONFIRMATION: &str = "Thank you for your order!";

/// One test case of the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCase {
    /// Log in with one account
    Login(&'static Credentials),
    /// Add products and check the badge
    Inventory,
    /// Check the cart contents
    Cart,
    /// Fill the buyer details
    CheckoutStepOne,
    /// Check the order overview
    CheckoutStepTwo,
    /// Place the order
    EndToEnd,
}

impl TestCase {
    /// Every case, in run order
    #[must_use]
    pub fn all() -> Vec<Self> {
        USERS
            .iter()
            .map(Self::Login)
            .chain([
                Self::Inventory,
                Self::Cart,
                Self::CheckoutStepOne,
                Self::CheckoutStepTwo,
                Self::EndToEnd,
            ])
            .collect()
    }

    /// Case by id, e.g. `login[problem_user]` or `cart`
    #[must_use]
    pub fn find(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|case| case.id() == id)
    }

    /// Stable identifier
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Login(credentials) => format!("login[{}]", credentials.username),
            Self::Inventory => "inventory".to_string(),
            Self::Cart => "cart".to_string(),
            Self::CheckoutStepOne => "checkout_step_one".to_string(),
            Self::CheckoutStepTwo => "checkout_step_two".to_string(),
            Self::EndToEnd => "end_to_end".to_string(),
        }
    }

    /// One-line summary
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Login(credentials) if !credentials.expect_login => {
                "login is refused with the locked-out message"
            }
            Self::Login(_) => "login reaches the inventory",
            Self::Inventory => "two random products, cart badge reads 2 after a reload",
            Self::Cart => "cart lists exactly the added products",
            Self::CheckoutStepOne => "buyer details are entered and read back exactly",
            Self::CheckoutStepTwo => "overview shows the order lines and consistent totals",
            Self::EndToEnd => "order is placed and confirmed",
        }
    }

    /// Report classification
    #[must_use]
    pub const fn taxonomy(&self) -> Taxonomy {
        let (epic, feature, story, severity) = match self {
            Self::Login(_) => (
                "Authentication",
                "Login",
                "Log in with the demo accounts",
                Severity::Critical,
            ),
            Self::Inventory => (
                "Shopping",
                "Inventory",
                "Add products to the cart",
                Severity::Critical,
            ),
            Self::Cart => ("Shopping", "Cart", "Review the cart", Severity::Normal),
            Self::CheckoutStepOne => (
                "Checkout",
                "Checkout information",
                "Enter buyer details",
                Severity::Critical,
            ),
            Self::CheckoutStepTwo => (
                "Checkout",
                "Checkout overview",
                "Review order totals",
                Severity::Critical,
            ),
            Self::EndToEnd => ("Checkout", "End to end", "Place an order", Severity::Blocker),
        };
        Taxonomy {
            epic,
            feature,
            story,
            severity,
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Cases whose id contains `filter`; every case without one
#[must_use]
pub fn select(filter: Option<&str>) -> Vec<TestCase> {
    TestCase::all()
        .into_iter()
        .filter(|case| filter.map_or(true, |f| case.id().contains(f)))
        .collect()
}

/// Outcome of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseResult {
    /// Case id
    pub id: String,
    /// passed, failed or broken
    pub status: Status,
    /// Wall-clock time including browser start-up
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Failure message
    pub message: Option<String>,
    /// Browser the case ran in
    pub browser: String,
}

impl CaseResult {
    /// Whether the case passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.status.is_passed()
    }
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Runs cases, one fresh session each
pub struct SuiteRunner<'f> {
    factory: &'f dyn DriverFactory,
    session: SessionConfig,
    settings: PageSettings,
    results_dir: Option<PathBuf>,
    screenshots: Option<ScreenshotStore>,
    seed: Option<u64>,
}

impl fmt::Debug for SuiteRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("factory", &self.factory.name())
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("results_dir", &self.results_dir)
            .field("screenshots", &self.screenshots)
            .field("seed", &self.seed)
            .finish()
    }
}

impl<'f> SuiteRunner<'f> {
    /// Runner starting sessions from `factory`
    #[must_use]
    pub fn new(
        factory: &'f dyn DriverFactory,
        session: SessionConfig,
        settings: PageSettings,
    ) -> Self {
        Self {
            factory,
            session,
            settings,
            results_dir: None,
            screenshots: None,
            seed: None,
        }
    }

    /// Write Allure results here
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    /// Save step screenshots here
    #[must_use]
    pub fn with_screenshots(mut self, store: ScreenshotStore) -> Self {
        self.screenshots = Some(store);
        self
    }

    /// Repeatable product picks
    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn recorder_for(&self, case: &TestCase) -> TestRecorder {
        TestRecorder::new(
            self.results_dir.as_deref(),
            case.id(),
            format!("swagprobe::suite::{}", case.id()),
            &case.taxonomy(),
        )
    }

    /// Run one case in its own session
    pub async fn run_case(&self, case: &TestCase) -> CaseResult {
        let started = Instant::now();
        info!(case = %case, "case started");
        let recorder = self.recorder_for(case);

        let outcome = with_session(self.factory, self.session.clone(), |session| async move {
            let mut recorder = recorder;
            let browser = session.browser_name().to_string();
            recorder.parameter("Browser Used", browser.as_str());
            if let Ok(capabilities) = session.driver().capabilities().await {
                recorder.attach_json("Capabilities", &capabilities);
            }
            let ctx = PageContext::new(session.driver(), &self.settings);
            let mut scenario = Scenario::new(ctx, recorder).with_seed(self.seed);
            if let Some(ref store) = self.screenshots {
                scenario = scenario.with_screenshots(store);
            }
            let result = run_body(case, &mut scenario).await;
            Ok((scenario.into_recorder(), browser, result))
        })
        .await;

        let (recorder, browser, result) = match outcome {
            Ok(done) => done,
            Err(launch) => (
                self.recorder_for(case),
                self.session.browser.name().to_string(),
                Err(launch),
            ),
        };

        let status = Status::of(&result);
        let message = result.err().map(|e| e.to_string());
        if let Err(e) = recorder.finish(status, message.clone()) {
            warn!(case = %case, error = %e, "could not write result file");
        }
        let duration = started.elapsed();
        match message {
            None => info!(case = %case, duration_ms = duration.as_millis() as u64, "case passed"),
            Some(ref m) => error!(case = %case, %status, error = %m, "case did not pass"),
        }
        CaseResult {
            id: case.id(),
            status,
            duration,
            message,
            browser,
        }
    }

    /// Run `cases` with up to `workers` sessions at a time; results keep the
    /// order of `cases`
    pub async fn run_all(&self, cases: &[TestCase], workers: usize) -> Vec<CaseResult> {
        self.run_all_with(cases, workers, |_| {}).await
    }

    /// [`SuiteRunner::run_all`], calling `on_done` as each case finishes
    pub async fn run_all_with(
        &self,
        cases: &[TestCase],
        workers: usize,
        mut on_done: impl FnMut(&CaseResult),
    ) -> Vec<CaseResult> {
        let mut finished: Vec<(usize, CaseResult)> = stream::iter(cases.iter().enumerate())
            .map(|(index, case)| async move { (index, self.run_case(case).await) })
            .buffer_unordered(workers.max(1))
            .inspect(|(_, result)| on_done(result))
            .collect()
            .await;
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, result)| result).collect()
    }
}

async fn run_body(case: &TestCase, scenario: &mut Scenario<'_>) -> SwagResult<()> {
    match case {
        TestCase::Login(credentials) => login_case(credentials, scenario).await,
        TestCase::Inventory => scenario.products_added_to_cart().await.map(|_| ()),
        TestCase::Cart => {
            let cart = scenario.cart_page_loaded().await?;
            let count = cart.item_count().await?;
            ensure(count == scenario.picked().len(), || {
                format!("cart shows {count} lines, expected {}", scenario.picked().len())
            })
        }
        TestCase::CheckoutStepOne => {
            let info = scenario.checkout_info_filled().await?;
            let postal_code = info.postal_code().await?;
            ensure(postal_code == CHECKOUT_INFO.postal_code, || {
                format!("postal code reads {postal_code:?}")
            })
        }
        TestCase::CheckoutStepTwo => {
            let overview = scenario.overview_page_loaded().await?;
            let names = overview.item_names().await?;
            let expected: Vec<&str> = scenario.picked().iter().map(|p| p.name).collect();
            ensure(names == expected, || {
                format!("overview lists {names:?}, expected {expected:?}")
            })?;
            let summary = overview.summary().await?;
            let subtotal: u64 = scenario.picked().iter().map(|p| p.price_cents).sum();
            scenario.recorder_mut().attach_json(
                "Order summary",
                &serde_json::to_value(summary)?,
            );
            ensure(summary.subtotal_cents == subtotal, || {
                format!(
                    "item total is {} cents, products add up to {subtotal}",
                    summary.subtotal_cents
                )
            })?;
            ensure(summary.is_consistent(), || {
                format!("tax and total do not add up: {summary:?}")
            })
        }
        TestCase::EndToEnd => {
            let overview = scenario.overview_page_loaded().await?;
            let recorder = scenario.recorder_mut();
            recorder.start_step("Finish the order");
            let report = overview.finish().await;
            recorder.finish_step(Status::of(&report));
            report?;
            let complete = CheckoutCompletePage::new(scenario.context());
            complete.assert_loaded().await?;
            let header = complete.header_text().await?;
            ensure(header == ORDER_CONFIRMATION, || {
                format!("confirmation reads {header:?}")
            })
        }
    }
}

async fn login_case(credentials: &Credentials, scenario: &mut Scenario<'_>) -> SwagResult<()> {
    let ctx = scenario.context();
    let recorder = scenario.recorder_mut();
    recorder.parameter("Username", credentials.username);
    recorder.start_step(format!("Log in as {}", credentials.username));
    let attempt = attempt_login(ctx, credentials).await;
    recorder.finish_step(Status::of(&attempt));
    match (attempt?, credentials.expect_login) {
        (LoginOutcome::LoggedIn, true) | (LoginOutcome::Rejected { .. }, false) => Ok(()),
        (LoginOutcome::LoggedIn, false) => Err(SwagError::assertion(format!(
            "{} should have been refused",
            credentials.username
        ))),
        (LoginOutcome::Rejected { message }, true) => Err(SwagError::assertion(format!(
            "{} was refused: {message}",
            credentials.username
        ))),
    }
}

async fn attempt_login(ctx: PageContext<'_>, credentials: &Credentials) -> SwagResult<LoginOutcome> {
    let login = LoginPage::new(ctx);
    login.open().await?;
    login.assert_loaded().await?;
    let outcome = login.login_as(credentials).await?;
    if outcome.is_logged_in() {
        InventoryPage::new(ctx).assert_loaded().await?;
    } else {
        // still on the login form
        login.assert_loaded().await?;
    }
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::user;
    use crate::driver::BrowserDriver;
    use crate::pages::test_support::quick_settings;
    use crate::session::SimulatedFactory;
    use async_trait::async_trait;
    use std::path::Path;

    mod case_tests {
        use super::*;

        #[test]
        fn test_case_ids() {
            let ids: Vec<String> = TestCase::all().iter().map(TestCase::id).collect();
            assert_eq!(ids.len(), 11);
            assert_eq!(ids[0], "login[standard_user]");
            assert_eq!(ids[1], "login[locked_out_user]");
            assert_eq!(ids[10], "end_to_end");
            assert_eq!(TestCase::find("cart"), Some(TestCase::Cart));
            assert_eq!(TestCase::find("nope"), None);
        }

        #[test]
        fn test_select_by_substring() {
            assert_eq!(select(Some("login")).len(), 6);
            assert_eq!(select(Some("checkout_step")).len(), 2);
            assert_eq!(select(None).len(), 11);
        }

        #[test]
        fn test_locked_out_description() {
            let locked = TestCase::Login(user("locked_out_user").unwrap());
            assert!(locked.description().contains("refused"));
            assert_eq!(TestCase::EndToEnd.taxonomy().severity, Severity::Blocker);
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_every_case_passes_on_the_simulated_shop() {
            let factory = SimulatedFactory::default();
            let runner = SuiteRunner::new(&factory, SessionConfig::default(), quick_settings())
                .with_seed(Some(3));
            let cases = TestCase::all();
            let mut seen = 0;
            let results = runner.run_all_with(&cases, 4, |_| seen += 1).await;
            assert_eq!(seen, cases.len());
            for (case, result) in cases.iter().zip(&results) {
                assert_eq!(result.id, case.id());
                assert!(result.passed(), "{}: {:?}", result.id, result.message);
                assert_eq!(result.browser, "chrome");
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_result_files_written() {
            let dir = tempfile::tempdir().unwrap();
            let factory = SimulatedFactory::default();
            let runner = SuiteRunner::new(&factory, SessionConfig::default(), quick_settings())
                .with_results_dir(dir.path());
            let result = runner.run_case(&TestCase::EndToEnd).await;
            assert!(result.passed(), "{:?}", result.message);

            let result_files: Vec<_> = std::fs::read_dir(dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .filter(|name| name.ends_with("-result.json"))
                .collect();
            assert_eq!(result_files.len(), 1);
            let raw = std::fs::read_to_string(dir.path().join(&result_files[0])).unwrap();
            assert!(raw.contains("\"Browser Used\""));
            assert!(raw.contains("Step_06_overview_loaded"));
            assert!(raw.contains("Finish the order"));
        }

        struct Unlaunchable;

        #[async_trait]
        impl DriverFactory for Unlaunchable {
            fn name(&self) -> &'static str {
                "unlaunchable"
            }

            async fn launch(
                &self,
                _config: &SessionConfig,
                _user_data_dir: &Path,
            ) -> SwagResult<Box<dyn BrowserDriver>> {
                Err(SwagError::BrowserLaunch {
                    message: "no chrome binary".into(),
                })
            }
        }

        #[tokio::test]
        async fn test_launch_failure_is_broken() {
            let runner = SuiteRunner::new(&Unlaunchable, SessionConfig::default(), quick_settings());
            let result = runner.run_case(&TestCase::Cart).await;
            assert_eq!(result.status, Status::Broken);
            assert!(result.message.unwrap().contains("no chrome binary"));
        }

        #[test]
        fn test_case_result_json() {
            let result = CaseResult {
                id: "cart".into(),
                status: Status::Failed,
                duration: Duration::from_millis(1_250),
                message: Some("cart shows 1 lines, expected 2".into()),
                browser: "chrome".into(),
            };
            let json = serde_json::to_value(&result).unwrap();
            assert_eq!(json["duration_ms"], 1250);
            assert_eq!(json["status"], "failed");
        }
    }
}
