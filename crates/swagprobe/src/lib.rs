//! Swagprobe: page-object end-to-end suite for the Swag Labs demo shop
//!
//! Every screen of <https://www.saucedemo.com/> is wrapped in a page object
//! that owns its locators and exposes "is loaded" plus the screen's actions.
//! Page objects talk to the browser only through [`BrowserDriver`], so the
//! same scenarios run against a real Chromium-family browser (feature
//! `browser`) or the in-process [`SimulatedShop`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SWAGPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ SuiteRunner│    │ Scenario   │    │ Page       │            │
//! │   │ TestCase   │───►│ (step      │───►│ Objects    │            │
//! │   │            │    │  chain)    │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │         │                 │                 │                   │
//! │         ▼                 ▼                 ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Browser    │    │ Test       │    │ Waiter +   │            │
//! │   │ Session    │    │ Recorder   │    │ Actor      │            │
//! │   │ (per case) │    │ (Allure)   │    │ (retries)  │            │
//! │   └─────┬──────┘    └────────────┘    └─────┬──────┘            │
//! │         └──────────────────┬────────────────┘                   │
//! │                            ▼                                    │
//! │                    dyn BrowserDriver                            │
//! │             (ChromiumDriver | SimulatedShop)                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use swagprobe::prelude::*;
//!
//! # async fn demo() -> SwagResult<()> {
//! let factory = SimulatedFactory::default();
//! let runner = SuiteRunner::new(&factory, SessionConfig::default(), PageSettings::default());
//! let results = runner.run_all(&TestCase::all(), 2).await;
//! assert!(results.iter().all(CaseResult::passed));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Retry policy, fallback strategies and the action executor
pub mod action;

/// Fixed site data: URL, users, catalog, checkout details
pub mod catalog;

/// Layered suite configuration
pub mod config;

/// The browser-automation seam
pub mod driver;

/// Scenario step chain shared by the test cases
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod fixture;

/// Element locators
pub mod locator;

/// Page object capability trait
pub mod page_object;

/// One page object per screen
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod pages;

/// Allure-compatible result recording
pub mod report;

/// Error and result types
pub mod result;

/// Screenshot files
pub mod screenshot;

/// Per-test browser lifecycle
pub mod session;

/// In-process fake of the shop
#[allow(clippy::missing_errors_doc)]
pub mod simulated;

/// Test cases and the concurrent runner
pub mod suite;

/// Bounded explicit waits
pub mod wait;

/// Real browser control over the DevTools protocol
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod chromium;

pub use action::{ActionReport, Actor, Backoff, FallbackChain, RetryPolicy};
pub use config::SuiteConfig;
pub use driver::{BrowserDriver, ElementHandle, Screenshot};
pub use locator::{By, Locator};
pub use page_object::{PageContext, PageObject, PageSettings};
pub use result::{FailureTier, SwagError, SwagResult};
pub use session::{BrowserKind, BrowserSession, DriverFactory, SessionConfig, SimulatedFactory};
pub use simulated::{ShopBehavior, SimulatedShop};
pub use suite::{CaseResult, SuiteRunner, TestCase};
pub use wait::{Condition, WaitOptions, Waiter};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumFactory};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::action::{
        ActionReport, Actor, Backoff, ClickStrategy, FallbackChain, InputStrategy, RetryPolicy,
        Tolerance,
    };
    pub use super::catalog::{
        format_price, parse_price, sample_products, tax_cents, user, CheckoutInfo, Credentials,
        Product, BASE_URL, PASSWORD, PRODUCTS, STANDARD_USER, USERS,
    };
    pub use super::config::SuiteConfig;
    pub use super::driver::{browser_name, BrowserDriver, ElementHandle, Screenshot, ScriptAction};
    pub use super::fixture::{Scenario, PRODUCTS_PER_ORDER};
    pub use super::locator::{By, Locator};
    pub use super::page_object::{texts, LoadCheck, PageContext, PageObject, PageSettings};
    pub use super::pages::{
        CartPage, CheckoutCompletePage, CheckoutInfoPage, CheckoutOverviewPage, CheckoutStep,
        InventoryPage, LoginOutcome, LoginPage, OrderSummary,
    };
    pub use super::report::{Severity, Status, Taxonomy, TestRecorder, TestResult};
    pub use super::result::{ensure, FailureTier, SwagError, SwagResult};
    pub use super::screenshot::ScreenshotStore;
    pub use super::session::{
        find_in, find_on_path, is_ci, with_session, BrowserKind, BrowserSession, DriverFactory,
        SessionConfig, SimulatedFactory,
    };
    pub use super::simulated::{Screen, ShopBehavior, SimulatedShop};
    pub use super::suite::{select, CaseResult, SuiteRunner, TestCase, ORDER_CONFIRMATION};
    pub use super::wait::{Condition, WaitOptions, WaitOutcome, Waiter};

    #[cfg(feature = "browser")]
    pub use super::chromium::{ChromiumDriver, ChromiumFactory};
}
