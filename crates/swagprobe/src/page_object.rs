//! Page Object Model Support
//!
//! Every screen implements [`PageObject`]: a name, a path, and a load check
//! made of a title-text equality plus one visible anchor element. Screens hold
//! nothing but a [`PageContext`] (driver reference and settings) and a
//! reference to their static locator table; navigation between screens is
//! driven by the caller, who builds the next page object after triggering a
//! transition.
//!
//! # Example
//!
//! ```ignore
//! let ctx = PageContext::new(&driver, &settings);
//! let login = LoginPage::new(ctx);
//! login.open().await?;
//! login.login("standard_user", "secret_sauce").await?;
//! InventoryPage::new(ctx).assert_loaded().await?;
//! ```

use crate::action::{Actor, RetryPolicy};
use crate::catalog::BASE_URL;
use crate::driver::BrowserDriver;
use crate::locator::Locator;
use crate::result::{SwagError, SwagResult};
use crate::wait::{Condition, WaitOptions, Waiter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Settings shared by all page objects of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSettings {
    /// Site root, with trailing slash
    pub base_url: String,
    /// Budget for explicit waits
    pub wait: WaitOptions,
    /// Policy for clicks and text entry
    pub retry: RetryPolicy,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            wait: WaitOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PageSettings {
    /// Absolute URL of a path relative to the site root
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Driver reference plus settings, copied into every page object
#[derive(Clone, Copy)]
pub struct PageContext<'a> {
    driver: &'a dyn BrowserDriver,
    settings: &'a PageSettings,
}

impl fmt::Debug for PageContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> PageContext<'a> {
    /// Bundle a driver and settings
    #[must_use]
    pub const fn new(driver: &'a dyn BrowserDriver, settings: &'a PageSettings) -> Self {
        Self { driver, settings }
    }

    /// The live driver
    #[must_use]
    pub const fn driver(&self) -> &'a dyn BrowserDriver {
        self.driver
    }

    /// The settings
    #[must_use]
    pub const fn settings(&self) -> &'a PageSettings {
        self.settings
    }

    /// Waiter with the configured budget
    #[must_use]
    pub const fn waiter(&self) -> Waiter<'a> {
        Waiter::new(self.driver, self.settings.wait)
    }

    /// Strict actor with the configured policy
    #[must_use]
    pub fn actor(&self) -> Actor<'a> {
        Actor::new(self.driver, self.settings.retry)
            .with_poll_interval(self.settings.wait.poll_interval_ms)
    }
}

/// What "loaded" means for a screen
#[derive(Debug, Clone, Copy)]
pub struct LoadCheck {
    /// Element holding the screen title
    pub title: &'static Locator,
    /// Exact title text
    pub title_text: &'static str,
    /// Element that must be visible
    pub anchor: &'static Locator,
}

/// Capability every screen implements
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Name for logs and reports
    fn page_name(&self) -> &'static str;

    /// Path relative to the site root
    fn url_path(&self) -> &'static str;

    /// Driver and settings
    fn context(&self) -> PageContext<'_>;

    /// Title and anchor of the screen
    fn load_check(&self) -> LoadCheck;

    /// Navigate straight to this screen
    ///
    /// # Errors
    ///
    /// Navigation failures from the driver.
    async fn open(&self) -> SwagResult<()> {
        let ctx = self.context();
        let url = ctx.settings().url(self.url_path());
        info!(page = self.page_name(), %url, "opening page");
        ctx.driver().navigate(&url).await
    }

    /// Wait for the title text and the anchor within one budget
    ///
    /// # Errors
    ///
    /// [`SwagError::Timeout`] when both do not hold in time.
    async fn wait_loaded(&self) -> SwagResult<()> {
        let check = self.load_check();
        let loaded = Condition::All(vec![
            Condition::text_equals(check.title.clone(), check.title_text),
            Condition::Visible(check.anchor.clone()),
        ]);
        self.context().waiter().until(&loaded).await.map(|_| ())
    }

    /// Title matches and anchor is visible. A timeout is a plain `false`.
    ///
    /// # Errors
    ///
    /// Non-timeout driver errors propagate.
    async fn is_loaded(&self) -> SwagResult<bool> {
        match self.wait_loaded().await {
            Ok(()) => {
                debug!(page = self.page_name(), "page loaded");
                Ok(true)
            }
            Err(err) if err.is_timeout() => {
                info!(page = self.page_name(), error = %err, "page not loaded");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Like [`PageObject::is_loaded`], but a miss is an error
    ///
    /// # Errors
    ///
    /// [`SwagError::PageNotLoaded`] on timeout; other driver errors as-is.
    async fn assert_loaded(&self) -> SwagResult<()> {
        match self.wait_loaded().await {
            Ok(()) => Ok(()),
            Err(err) if err.is_timeout() => Err(SwagError::PageNotLoaded {
                page: self.page_name().to_string(),
                reason: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }
}

/// Text of every element matching `locator`
///
/// # Errors
///
/// Driver errors.
pub async fn texts(driver: &dyn BrowserDriver, locator: &Locator) -> SwagResult<Vec<String>> {
    Ok(driver
        .find_elements(locator)
        .await?
        .into_iter()
        .map(|el| el.text)
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let settings = PageSettings::default();
        assert_eq!(
            settings.url("inventory.html"),
            "https://www.saucedemo.com/inventory.html"
        );
        assert_eq!(settings.url("/cart.html"), "https://www.saucedemo.com/cart.html");
        assert_eq!(settings.url(""), "https://www.saucedemo.com/");
    }

    #[test]
    fn test_custom_base_url() {
        let settings = PageSettings {
            base_url: "http://localhost:3000".into(),
            ..PageSettings::default()
        };
        assert_eq!(settings.url("cart.html"), "http://localhost:3000/cart.html");
    }

    mod load_check_tests {
        use super::*;
        use crate::simulated::{ShopBehavior, SimulatedShop};
        use std::time::Duration;
        use tokio::time::Instant;

        static LOGO: Locator = Locator::class_name("login_logo");
        static LOGIN_BUTTON: Locator = Locator::id("login-button");
        static INVENTORY: Locator = Locator::id("inventory_container");

        struct LogoPage<'a> {
            ctx: PageContext<'a>,
            anchor: &'static Locator,
        }

        #[async_trait]
        impl PageObject for LogoPage<'_> {
            fn page_name(&self) -> &'static str {
                "login"
            }

            fn url_path(&self) -> &'static str {
                ""
            }

            fn context(&self) -> PageContext<'_> {
                self.ctx
            }

            fn load_check(&self) -> LoadCheck {
                LoadCheck {
                    title: &LOGO,
                    title_text: "Swag Labs",
                    anchor: self.anchor,
                }
            }
        }

        fn settings() -> PageSettings {
            PageSettings {
                wait: WaitOptions::new().with_timeout(2_000).with_poll_interval(300),
                ..PageSettings::default()
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_loaded_once_anchor_renders() {
            let shop = SimulatedShop::with_behavior(
                ShopBehavior::default().with_render_delay(Duration::from_millis(1_500)),
            );
            let settings = settings();
            let page = LogoPage {
                ctx: PageContext::new(&shop, &settings),
                anchor: &LOGIN_BUTTON,
            };
            page.open().await.unwrap();
            assert!(page.is_loaded().await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_anchor_costs_one_budget() {
            let shop = SimulatedShop::new();
            let settings = settings();
            let page = LogoPage {
                ctx: PageContext::new(&shop, &settings),
                anchor: &INVENTORY,
            };
            page.open().await.unwrap();
            let start = Instant::now();

            let err = page.assert_loaded().await.unwrap_err();

            assert!(matches!(err, SwagError::PageNotLoaded { .. }));
            assert!(start.elapsed() >= Duration::from_millis(2_000));
            assert!(start.elapsed() <= Duration::from_millis(2_300));
        }
    }

    #[test]
    fn test_defaults_follow_wait_and_retry() {
        let settings = PageSettings::default();
        assert_eq!(settings.wait.timeout_ms, 10_000);
        assert_eq!(settings.retry.max_attempts, 3);
    }
}
