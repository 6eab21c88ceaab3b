//! Order confirmation screen

use crate::action::FallbackChain;
use crate::locator::Locator;
use crate::page_object::{LoadCheck, PageContext, PageObject};
use crate::pages::inventory::INVENTORY;
use crate::result::SwagResult;
use crate::wait::Condition;
use async_trait::async_trait;

/// Locators of the confirmation screen
#[derive(Debug)]
pub struct CheckoutCompleteLocators {
    /// Screen title
    pub title: Locator,
    /// "Thank you for your order!"
    pub header: Locator,
    /// Dispatch note
    pub text: Locator,
    /// Back to the product list
    pub back_home: Locator,
}

/// The confirmation screen's locator table
pub static CHECKOUT_COMPLETE: CheckoutCompleteLocators = CheckoutCompleteLocators {
    title: Locator::class_name("title"),
    header: Locator::class_name("complete-header"),
    text: Locator::class_name("complete-text"),
    back_home: Locator::id("back-to-products"),
};

/// Confirmation page object
#[derive(Debug, Clone, Copy)]
pub struct CheckoutCompletePage<'a> {
    ctx: PageContext<'a>,
    locators: &'static CheckoutCompleteLocators,
}

impl<'a> CheckoutCompletePage<'a> {
    /// Page object over a live context
    #[must_use]
    pub fn new(ctx: PageContext<'a>) -> Self {
        Self {
            ctx,
            locators: &CHECKOUT_COMPLETE,
        }
    }

    /// Confirmation headline
    ///
    /// # Errors
    ///
    /// Timeout when the header never shows.
    pub async fn header_text(&self) -> SwagResult<String> {
        Ok(self.ctx.waiter().visible(&self.locators.header).await?.text)
    }

    /// Dispatch note below the headline
    ///
    /// # Errors
    ///
    /// Timeout when the note never shows.
    pub async fn body_text(&self) -> SwagResult<String> {
        Ok(self.ctx.waiter().visible(&self.locators.text).await?.text)
    }

    /// Back to the product list
    ///
    /// # Errors
    ///
    /// Fails when the inventory never appears.
    pub async fn back_home(&self) -> SwagResult<()> {
        self.ctx
            .actor()
            .click(
                &self.locators.back_home,
                &FallbackChain::native_then_script(),
                Some(&Condition::Visible(INVENTORY.container.clone())),
            )
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PageObject for CheckoutCompletePage<'_> {
    fn page_name(&self) -> &'static str {
        "Checkout: Complete"
    }

    fn url_path(&self) -> &'static str {
        "checkout-complete.html"
    }

    fn context(&self) -> PageContext<'_> {
        self.ctx
    }

    fn load_check(&self) -> LoadCheck {
        LoadCheck {
            title: &self.locators.title,
            title_text: "Checkout: Complete!",
            anchor: &self.locators.header,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::STANDARD_USER;
    use crate::pages::inventory::InventoryPage;
    use crate::pages::login::LoginPage;
    use crate::pages::test_support::quick_settings;
    use crate::simulated::SimulatedShop;

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_and_back_home() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let ctx = PageContext::new(&shop, &settings);
        let login = LoginPage::new(ctx);
        login.open().await.unwrap();
        login
            .login(STANDARD_USER.username, STANDARD_USER.password)
            .await
            .unwrap();

        let page = CheckoutCompletePage::new(ctx);
        page.open().await.unwrap();
        page.assert_loaded().await.unwrap();
        assert_eq!(page.header_text().await.unwrap(), "Thank you for your order!");
        assert!(page.body_text().await.unwrap().contains("pony"));

        page.back_home().await.unwrap();
        assert!(InventoryPage::new(ctx).is_loaded().await.unwrap());
    }
}
