//! Checkout step one: buyer information
//!
//! Fields are filled natively first and by script assignment when the
//! keystrokes do not stick; every entry is read back and compared exactly.

use crate::action::FallbackChain;
use crate::catalog::CheckoutInfo;
use crate::locator::Locator;
use crate::page_object::{LoadCheck, PageContext, PageObject};
use crate::pages::cart::CART;
use crate::pages::checkout_overview::CHECKOUT_OVERVIEW;
use crate::result::{SwagError, SwagResult};
use crate::wait::Condition;
use async_trait::async_trait;
use tracing::info;

/// Locators of the checkout information screen
#[derive(Debug)]
pub struct CheckoutInfoLocators {
    /// Screen title
    pub title: Locator,
    /// First name field
    pub first_name: Locator,
    /// Last name field
    pub last_name: Locator,
    /// Postal code field
    pub postal_code: Locator,
    /// Continue button
    pub continue_button: Locator,
    /// Cancel button
    pub cancel: Locator,
    /// Validation banner
    pub error: Locator,
}

/// The checkout information screen's locator table
pub static CHECKOUT_INFO: CheckoutInfoLocators = CheckoutInfoLocators {
    title: Locator::class_name("title"),
    first_name: Locator::id("first-name"),
    last_name: Locator::id("last-name"),
    postal_code: Locator::id("postal-code"),
    continue_button: Locator::id("continue"),
    cancel: Locator::id("cancel"),
    error: Locator::data_test("error"),
};

/// Where "Continue" led
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    /// The overview is showing
    Overview,
    /// Validation refused the form
    Rejected {
        /// Banner text
        message: String,
    },
}

/// Checkout information page object
#[derive(Debug, Clone, Copy)]
pub struct CheckoutInfoPage<'a> {
    ctx: PageContext<'a>,
    locators: &'static CheckoutInfoLocators,
}

impl<'a> CheckoutInfoPage<'a> {
    /// Page object over a live context
    #[must_use]
    pub fn new(ctx: PageContext<'a>) -> Self {
        Self {
            ctx,
            locators: &CHECKOUT_INFO,
        }
    }

    async fn enter(&self, field: &Locator, text: &str) -> SwagResult<()> {
        self.ctx
            .actor()
            .type_text(field, text, &FallbackChain::typing_then_script())
            .await
            .map(|_| ())
    }

    /// Enter the first name
    ///
    /// # Errors
    ///
    /// Fails when the field never reads back `name`.
    pub async fn enter_first_name(&self, name: &str) -> SwagResult<()> {
        self.enter(&self.locators.first_name, name).await
    }

    /// Enter the last name
    ///
    /// # Errors
    ///
    /// Fails when the field never reads back `name`.
    pub async fn enter_last_name(&self, name: &str) -> SwagResult<()> {
        self.enter(&self.locators.last_name, name).await
    }

    /// Enter the postal code
    ///
    /// # Errors
    ///
    /// Fails when the field never reads back `code`.
    pub async fn enter_postal_code(&self, code: &str) -> SwagResult<()> {
        self.enter(&self.locators.postal_code, code).await
    }

    /// Fill all three fields
    ///
    /// # Errors
    ///
    /// The first field that does not take its value.
    pub async fn fill(&self, info: &CheckoutInfo) -> SwagResult<()> {
        self.enter_first_name(info.first_name).await?;
        self.enter_last_name(info.last_name).await?;
        self.enter_postal_code(info.postal_code).await?;
        info!(
            first_name = info.first_name,
            last_name = info.last_name,
            postal_code = info.postal_code,
            "checkout information entered"
        );
        Ok(())
    }

    /// Current first name
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn first_name(&self) -> SwagResult<String> {
        self.ctx.actor().read_value(&self.locators.first_name).await
    }

    /// Current last name
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn last_name(&self) -> SwagResult<String> {
        self.ctx.actor().read_value(&self.locators.last_name).await
    }

    /// Current postal code
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn postal_code(&self) -> SwagResult<String> {
        self.ctx.actor().read_value(&self.locators.postal_code).await
    }

    /// Check all three fields hold exactly the given values
    ///
    /// # Errors
    ///
    /// [`SwagError::FieldMismatch`] for the first field that differs.
    pub async fn verify_information(&self, info: &CheckoutInfo) -> SwagResult<()> {
        let fields = [
            ("first-name", info.first_name, self.first_name().await?),
            ("last-name", info.last_name, self.last_name().await?),
            ("postal-code", info.postal_code, self.postal_code().await?),
        ];
        for (field, expected, actual) in fields {
            if actual != expected {
                return Err(SwagError::FieldMismatch {
                    field: field.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Press "Continue" and report whether the overview or a validation
    /// message appeared
    ///
    /// # Errors
    ///
    /// Click exhaustion, or a timeout when neither appears.
    pub async fn continue_checkout(&self) -> SwagResult<CheckoutStep> {
        self.ctx
            .actor()
            .click(
                &self.locators.continue_button,
                &FallbackChain::native_then_script(),
                None,
            )
            .await?;
        let (index, outcome) = self
            .ctx
            .waiter()
            .until_any(&[
                Condition::Visible(CHECKOUT_OVERVIEW.finish.clone()),
                Condition::Visible(self.locators.error.clone()),
            ])
            .await?;
        if index == 0 {
            return Ok(CheckoutStep::Overview);
        }
        let message = outcome.into_element().map(|el| el.text).unwrap_or_default();
        info!(%message, "checkout information rejected");
        Ok(CheckoutStep::Rejected { message })
    }

    /// Abandon checkout and return to the cart
    ///
    /// # Errors
    ///
    /// Fails when the cart never reappears.
    pub async fn cancel(&self) -> SwagResult<()> {
        self.ctx
            .actor()
            .click(
                &self.locators.cancel,
                &FallbackChain::native_then_script(),
                Some(&Condition::Visible(CART.checkout.clone())),
            )
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PageObject for CheckoutInfoPage<'_> {
    fn page_name(&self) -> &'static str {
        "Checkout: Your Information"
    }

    fn url_path(&self) -> &'static str {
        "checkout-step-one.html"
    }

    fn context(&self) -> PageContext<'_> {
        self.ctx
    }

    fn load_check(&self) -> LoadCheck {
        LoadCheck {
            title: &self.locators.title,
            title_text: "Checkout: Your Information",
            anchor: &self.locators.continue_button,
        }
    }
}
