//! Cart screen

use crate::action::FallbackChain;
use crate::locator::Locator;
use crate::page_object::{texts, LoadCheck, PageContext, PageObject};
use crate::pages::checkout_info::CHECKOUT_INFO;
use crate::pages::inventory::INVENTORY;
use crate::result::SwagResult;
use crate::wait::Condition;
use async_trait::async_trait;

/// Locators of the cart screen
#[derive(Debug)]
pub struct CartLocators {
    /// Screen title
    pub title: Locator,
    /// One row per cart line
    pub cart_item: Locator,
    /// Product names of the rows
    pub item_name: Locator,
    /// Checkout button
    pub checkout: Locator,
    /// Back to the inventory
    pub continue_shopping: Locator,
}

/// The cart screen's locator table
pub static CART: CartLocators = CartLocators {
    title: Locator::class_name("title"),
    cart_item: Locator::class_name("cart_item"),
    item_name: Locator::class_name("inventory_item_name"),
    checkout: Locator::id("checkout"),
    continue_shopping: Locator::id("continue-shopping"),
};

/// Cart page object
#[derive(Debug, Clone, Copy)]
pub struct CartPage<'a> {
    ctx: PageContext<'a>,
    locators: &'static CartLocators,
}

impl<'a> CartPage<'a> {
    /// Page object over a live context
    #[must_use]
    pub fn new(ctx: PageContext<'a>) -> Self {
        Self {
            ctx,
            locators: &CART,
        }
    }

    /// Number of cart lines
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn item_count(&self) -> SwagResult<usize> {
        Ok(self
            .ctx
            .driver()
            .find_elements(&self.locators.cart_item)
            .await?
            .len())
    }

    /// Product names in the cart
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn item_names(&self) -> SwagResult<Vec<String>> {
        texts(self.ctx.driver(), &self.locators.item_name).await
    }

    /// Proceed to checkout
    ///
    /// # Errors
    ///
    /// Fails when the information form never appears.
    pub async fn checkout(&self) -> SwagResult<()> {
        self.ctx
            .actor()
            .click(
                &self.locators.checkout,
                &FallbackChain::native_then_script(),
                Some(&Condition::Visible(CHECKOUT_INFO.continue_button.clone())),
            )
            .await
            .map(|_| ())
    }

    /// Back to the product list
    ///
    /// # Errors
    ///
    /// Fails when the inventory never appears.
    pub async fn continue_shopping(&self) -> SwagResult<()> {
        self.ctx
            .actor()
            .click(
                &self.locators.continue_shopping,
                &FallbackChain::native_then_script(),
                Some(&Condition::Visible(INVENTORY.container.clone())),
            )
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PageObject for CartPage<'_> {
    fn page_name(&self) -> &'static str {
        "Cart"
    }

    fn url_path(&self) -> &'static str {
        "cart.html"
    }

    fn context(&self) -> PageContext<'_> {
        self.ctx
    }

    fn load_check(&self) -> LoadCheck {
        LoadCheck {
            title: &self.locators.title,
            title_text: "Your Cart",
            anchor: &self.locators.checkout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::BrowserDriver;
    use crate::catalog::{STANDARD_USER, PRODUCTS};
    use crate::pages::inventory::InventoryPage;
    use crate::pages::login::LoginPage;
    use crate::pages::test_support::quick_settings;
    use crate::simulated::SimulatedShop;

    #[tokio::test(start_paused = true)]
    async fn test_cart_lists_added_products() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let ctx = PageContext::new(&shop, &settings);
        let login = LoginPage::new(ctx);
        login.open().await.unwrap();
        login
            .login(STANDARD_USER.username, STANDARD_USER.password)
            .await
            .unwrap();
        let inventory = InventoryPage::new(ctx);
        inventory.add_products(&[&PRODUCTS[0], &PRODUCTS[3]]).await.unwrap();
        inventory.go_to_cart().await.unwrap();

        let cart = CartPage::new(ctx);
        cart.assert_loaded().await.unwrap();
        assert_eq!(cart.item_count().await.unwrap(), 2);
        assert_eq!(
            cart.item_names().await.unwrap(),
            vec!["Sauce Labs Backpack", "Sauce Labs Fleece Jacket"]
        );

        cart.continue_shopping().await.unwrap();
        assert!(inventory.is_loaded().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_button_opens_form() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let ctx = PageContext::new(&shop, &settings);
        let login = LoginPage::new(ctx);
        login.open().await.unwrap();
        login
            .login(STANDARD_USER.username, STANDARD_USER.password)
            .await
            .unwrap();
        let cart = CartPage::new(ctx);
        cart.open().await.unwrap();
        assert_eq!(cart.item_count().await.unwrap(), 0);
        cart.checkout().await.unwrap();
        assert!(shop
            .current_url()
            .await
            .unwrap()
            .ends_with("/checkout-step-one.html"));
    }
}
