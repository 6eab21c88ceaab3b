//! Login screen

use crate::action::FallbackChain;
use crate::catalog::Credentials;
use crate::locator::Locator;
use crate::page_object::{LoadCheck, PageContext, PageObject};
use crate::pages::inventory::INVENTORY;
use crate::result::SwagResult;
use crate::wait::Condition;
use async_trait::async_trait;
use tracing::info;

/// Locators of the login screen
#[derive(Debug)]
pub struct LoginLocators {
    /// Logo doubling as the screen title
    pub logo: Locator,
    /// Username field
    pub username: Locator,
    /// Password field
    pub password: Locator,
    /// Submit button
    pub login_button: Locator,
    /// Error banner
    pub error: Locator,
}

/// The login screen's locator table
pub static LOGIN: LoginLocators = LoginLocators {
    logo: Locator::class_name("login_logo"),
    username: Locator::id("user-name"),
    password: Locator::id("password"),
    login_button: Locator::id("login-button"),
    error: Locator::data_test("error"),
};

/// Where a login attempt ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Inventory is showing
    LoggedIn,
    /// The site refused, with its message
    Rejected {
        /// Error banner text
        message: String,
    },
}

impl LoginOutcome {
    /// Whether the user got in
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn)
    }
}

/// Login page object
#[derive(Debug, Clone, Copy)]
pub struct LoginPage<'a> {
    ctx: PageContext<'a>,
    locators: &'static LoginLocators,
}

impl<'a> LoginPage<'a> {
    /// Page object over a live context
    #[must_use]
    pub fn new(ctx: PageContext<'a>) -> Self {
        Self {
            ctx,
            locators: &LOGIN,
        }
    }

    /// Type the username
    ///
    /// # Errors
    ///
    /// Fails when the field never reads back the given text.
    pub async fn enter_username(&self, username: &str) -> SwagResult<()> {
        self.ctx
            .actor()
            .type_text(&self.locators.username, username, &FallbackChain::typing_then_script())
            .await
            .map(|_| ())
    }

    /// Type the password
    ///
    /// # Errors
    ///
    /// Fails when the field never reads back the given text.
    pub async fn enter_password(&self, password: &str) -> SwagResult<()> {
        self.ctx
            .actor()
            .type_text(&self.locators.password, password, &FallbackChain::typing_then_script())
            .await
            .map(|_| ())
    }

    /// Press the login button
    ///
    /// # Errors
    ///
    /// Fails when neither click strategy lands.
    pub async fn click_login(&self) -> SwagResult<()> {
        self.ctx
            .waiter()
            .clickable(&self.locators.login_button)
            .await?;
        self.ctx
            .actor()
            .click(
                &self.locators.login_button,
                &FallbackChain::native_then_script(),
                None,
            )
            .await
            .map(|_| ())
    }

    /// Fill both fields and submit
    ///
    /// # Errors
    ///
    /// See [`LoginPage::enter_username`] and [`LoginPage::click_login`].
    pub async fn login(&self, username: &str, password: &str) -> SwagResult<()> {
        info!(username, "logging in");
        self.enter_username(username).await?;
        self.enter_password(password).await?;
        self.click_login().await
    }

    /// Submit credentials and report whether the inventory or the error
    /// banner showed up
    ///
    /// # Errors
    ///
    /// Timeout when neither appears; driver errors.
    pub async fn login_as(&self, credentials: &Credentials) -> SwagResult<LoginOutcome> {
        self.login(credentials.username, credentials.password).await?;
        let (index, outcome) = self
            .ctx
            .waiter()
            .until_any(&[
                Condition::Visible(INVENTORY.container.clone()),
                Condition::Visible(self.locators.error.clone()),
            ])
            .await?;
        if index == 0 {
            info!(username = credentials.username, "login accepted");
            return Ok(LoginOutcome::LoggedIn);
        }
        let message = outcome.into_element().map(|el| el.text).unwrap_or_default();
        info!(username = credentials.username, %message, "login rejected");
        Ok(LoginOutcome::Rejected { message })
    }

    /// Error banner text, if shown
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn error_message(&self) -> SwagResult<Option<String>> {
        Ok(self
            .ctx
            .driver()
            .find_element(&self.locators.error)
            .await?
            .filter(|el| el.displayed)
            .map(|el| el.text))
    }
}

#[async_trait]
impl PageObject for LoginPage<'_> {
    fn page_name(&self) -> &'static str {
        "Login"
    }

    fn url_path(&self) -> &'static str {
        ""
    }

    fn context(&self) -> PageContext<'_> {
        self.ctx
    }

    fn load_check(&self) -> LoadCheck {
        LoadCheck {
            title: &self.locators.logo,
            title_text: "Swag Labs",
            anchor: &self.locators.login_button,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{user, USERS};
    use crate::pages::test_support::quick_settings;
    use crate::simulated::SimulatedShop;

    #[tokio::test(start_paused = true)]
    async fn test_open_and_loaded() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let page = LoginPage::new(PageContext::new(&shop, &settings));
        page.open().await.unwrap();
        assert!(page.is_loaded().await.unwrap());
        assert!(page.error_message().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_account_but_locked_out_gets_in() {
        for credentials in &USERS {
            let shop = SimulatedShop::new();
            let settings = quick_settings();
            let page = LoginPage::new(PageContext::new(&shop, &settings));
            page.open().await.unwrap();
            let outcome = page.login_as(credentials).await.unwrap();
            assert_eq!(outcome.is_logged_in(), credentials.expect_login, "{}", credentials.username);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_out_message() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let page = LoginPage::new(PageContext::new(&shop, &settings));
        page.open().await.unwrap();
        let outcome = page.login_as(user("locked_out_user").unwrap()).await.unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Rejected {
                message: "Epic sadface: Sorry, this user has been locked out.".into()
            }
        );
        assert_eq!(
            page.error_message().await.unwrap().as_deref(),
            Some("Epic sadface: Sorry, this user has been locked out.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_loaded_before_navigation() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let page = LoginPage::new(PageContext::new(&shop, &settings));
        assert!(!page.is_loaded().await.unwrap());
        assert!(page.assert_loaded().await.is_err());
    }
}
