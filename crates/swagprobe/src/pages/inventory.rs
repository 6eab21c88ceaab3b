//! Inventory (product list) screen

use crate::action::{ClickStrategy, FallbackChain, Tolerance};
use crate::catalog::Product;
use crate::locator::{By, Locator};
use crate::page_object::{texts, LoadCheck, PageContext, PageObject};
use crate::pages::cart::CART;
use crate::result::{SwagError, SwagResult};
use crate::wait::Condition;
use async_trait::async_trait;
use tracing::{info, warn};

/// Locators of the inventory screen
#[derive(Debug)]
pub struct InventoryLocators {
    /// Screen title
    pub title: Locator,
    /// Product grid
    pub container: Locator,
    /// Product names
    pub item_name: Locator,
    /// Cart icon
    pub cart_link: Locator,
    /// Item count on the cart icon, absent when the cart is empty
    pub cart_badge: Locator,
}

/// The inventory screen's locator table
pub static INVENTORY: InventoryLocators = InventoryLocators {
    title: Locator::class_name("title"),
    container: Locator::id("inventory_container"),
    item_name: Locator::class_name("inventory_item_name"),
    cart_link: Locator::class_name("shopping_cart_link"),
    cart_badge: Locator::class_name("shopping_cart_badge"),
};

/// Inventory page object
#[derive(Debug, Clone, Copy)]
pub struct InventoryPage<'a> {
    ctx: PageContext<'a>,
    locators: &'static InventoryLocators,
}

impl<'a> InventoryPage<'a> {
    /// Page object over a live context
    #[must_use]
    pub fn new(ctx: PageContext<'a>) -> Self {
        Self {
            ctx,
            locators: &INVENTORY,
        }
    }

    /// Add a product; `false` when the button never turned into "Remove"
    ///
    /// # Errors
    ///
    /// Only non-transient driver errors; exhaustion is reported as `false`.
    pub async fn add_product(&self, product: &Product) -> SwagResult<bool> {
        let button = Locator::new(By::Id, product.add_button_id());
        let done = Condition::Present(Locator::new(By::Id, product.remove_button_id()));
        self.toggle(product, &button, &done, "added to cart").await
    }

    /// Remove a product; `false` when the button never turned back
    ///
    /// # Errors
    ///
    /// Only non-transient driver errors; exhaustion is reported as `false`.
    pub async fn remove_product(&self, product: &Product) -> SwagResult<bool> {
        let button = Locator::new(By::Id, product.remove_button_id());
        let done = Condition::Present(Locator::new(By::Id, product.add_button_id()));
        self.toggle(product, &button, &done, "removed from cart").await
    }

    /// Add several products; returns how many made it
    ///
    /// # Errors
    ///
    /// Non-transient driver errors.
    pub async fn add_products(&self, products: &[&Product]) -> SwagResult<usize> {
        let mut added = 0;
        for product in products {
            if self.add_product(product).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn toggle(
        &self,
        product: &Product,
        button: &Locator,
        done: &Condition,
        verb: &str,
    ) -> SwagResult<bool> {
        let report = self
            .ctx
            .actor()
            .with_tolerance(Tolerance::Lenient)
            .click(button, &FallbackChain::only(ClickStrategy::Script), Some(done))
            .await?;
        if report.succeeded {
            info!(product = product.name, attempts = report.attempts, "{verb}");
        } else {
            warn!(product = product.name, %report, "cart button did not respond");
        }
        Ok(report.succeeded)
    }

    /// Number on the cart badge; no badge means zero
    ///
    /// # Errors
    ///
    /// Driver errors, or an assertion failure for a non-numeric badge.
    pub async fn cart_count(&self) -> SwagResult<usize> {
        let badge = self
            .ctx
            .driver()
            .find_element(&self.locators.cart_badge)
            .await?;
        match badge {
            Some(el) if el.displayed => el.text.trim().parse().map_err(|_| {
                SwagError::assertion(format!("cart badge reads {:?}", el.text))
            }),
            _ => Ok(0),
        }
    }

    /// Product names in display order
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn product_names(&self) -> SwagResult<Vec<String>> {
        texts(self.ctx.driver(), &self.locators.item_name).await
    }

    /// Reload and wait for the grid again
    ///
    /// # Errors
    ///
    /// Driver errors, or [`crate::SwagError::PageNotLoaded`].
    pub async fn refresh(&self) -> SwagResult<()> {
        self.ctx.driver().refresh().await?;
        self.assert_loaded().await
    }

    /// Open the cart
    ///
    /// # Errors
    ///
    /// Fails when the cart screen never shows its checkout button.
    pub async fn go_to_cart(&self) -> SwagResult<()> {
        self.ctx
            .actor()
            .click(
                &self.locators.cart_link,
                &FallbackChain::only(ClickStrategy::Script),
                Some(&Condition::Visible(CART.checkout.clone())),
            )
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PageObject for InventoryPage<'_> {
    fn page_name(&self) -> &'static str {
        "Inventory"
    }

    fn url_path(&self) -> &'static str {
        "inventory.html"
    }

    fn context(&self) -> PageContext<'_> {
        self.ctx
    }

    fn load_check(&self) -> LoadCheck {
        LoadCheck {
            title: &self.locators.title,
            title_text: "Products",
            anchor: &self.locators.container,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::BrowserDriver;
    use crate::catalog::{product, STANDARD_USER, PRODUCTS};
    use crate::pages::login::LoginPage;
    use crate::pages::test_support::quick_settings;
    use crate::simulated::SimulatedShop;

    async fn logged_in(shop: &SimulatedShop, username: &str) {
        let settings = quick_settings();
        let login = LoginPage::new(PageContext::new(shop, &settings));
        login.open().await.unwrap();
        login.login(username, STANDARD_USER.password).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_lists_all_products() {
        let shop = SimulatedShop::new();
        logged_in(&shop, "standard_user").await;
        let settings = quick_settings();
        let page = InventoryPage::new(PageContext::new(&shop, &settings));
        page.assert_loaded().await.unwrap();
        let names = page.product_names().await.unwrap();
        assert_eq!(names.len(), PRODUCTS.len());
        assert_eq!(names[0], "Sauce Labs Backpack");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cart_count_survives_refresh() {
        let shop = SimulatedShop::new();
        logged_in(&shop, "standard_user").await;
        let settings = quick_settings();
        let page = InventoryPage::new(PageContext::new(&shop, &settings));
        assert_eq!(page.cart_count().await.unwrap(), 0);

        let picks = [&PRODUCTS[1], &PRODUCTS[4], &PRODUCTS[5]];
        assert_eq!(page.add_products(&picks).await.unwrap(), 3);
        page.refresh().await.unwrap();
        assert_eq!(page.cart_count().await.unwrap(), 3);

        assert!(page.remove_product(&PRODUCTS[4]).await.unwrap());
        assert_eq!(page.cart_count().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_button_reports_false() {
        let shop = SimulatedShop::new();
        logged_in(&shop, "problem_user").await;
        let settings = quick_settings();
        let page = InventoryPage::new(PageContext::new(&shop, &settings));
        let jacket = product("sauce-labs-fleece-jacket").unwrap();
        assert!(!page.add_product(jacket).await.unwrap());
        assert_eq!(page.cart_count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_go_to_cart() {
        let shop = SimulatedShop::new();
        logged_in(&shop, "standard_user").await;
        let settings = quick_settings();
        let page = InventoryPage::new(PageContext::new(&shop, &settings));
        page.go_to_cart().await.unwrap();
        assert!(shop.current_url().await.unwrap().ends_with("/cart.html"));
    }
}
