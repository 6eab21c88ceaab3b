//! Checkout step two: order overview

use crate::action::{ActionReport, FallbackChain};
use crate::catalog::{parse_price, tax_cents};
use crate::locator::Locator;
use crate::page_object::{texts, LoadCheck, PageContext, PageObject};
use crate::pages::checkout_complete::CHECKOUT_COMPLETE;
use crate::result::{SwagError, SwagResult};
use crate::wait::Condition;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Locators of the overview screen
#[derive(Debug)]
pub struct CheckoutOverviewLocators {
    /// Screen title
    pub title: Locator,
    /// Product names of the order lines
    pub item_name: Locator,
    /// "Item total: $x"
    pub subtotal: Locator,
    /// "Tax: $x"
    pub tax: Locator,
    /// "Total: $x"
    pub total: Locator,
    /// Finish button
    pub finish: Locator,
    /// Cancel button
    pub cancel: Locator,
}

/// The overview screen's locator table
pub static CHECKOUT_OVERVIEW: CheckoutOverviewLocators = CheckoutOverviewLocators {
    title: Locator::class_name("title"),
    item_name: Locator::class_name("inventory_item_name"),
    subtotal: Locator::class_name("summary_subtotal_label"),
    tax: Locator::class_name("summary_tax_label"),
    total: Locator::class_name("summary_total_label"),
    finish: Locator::id("finish"),
    cancel: Locator::id("cancel"),
};

/// Price summary, in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    /// Item total
    pub subtotal_cents: u64,
    /// Tax
    pub tax_cents: u64,
    /// Grand total
    pub total_cents: u64,
}

impl OrderSummary {
    /// Tax matches the shop's rate and the total adds up
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.tax_cents == tax_cents(self.subtotal_cents)
            && self.subtotal_cents + self.tax_cents == self.total_cents
    }
}

/// Overview page object
#[derive(Debug, Clone, Copy)]
pub struct CheckoutOverviewPage<'a> {
    ctx: PageContext<'a>,
    locators: &'static CheckoutOverviewLocators,
}

impl<'a> CheckoutOverviewPage<'a> {
    /// Page object over a live context
    #[must_use]
    pub fn new(ctx: PageContext<'a>) -> Self {
        Self {
            ctx,
            locators: &CHECKOUT_OVERVIEW,
        }
    }

    /// Product names in the order
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn item_names(&self) -> SwagResult<Vec<String>> {
        texts(self.ctx.driver(), &self.locators.item_name).await
    }

    async fn amount(&self, label: &Locator) -> SwagResult<u64> {
        let element = self.ctx.waiter().visible(label).await?;
        parse_price(&element.text).ok_or_else(|| {
            SwagError::assertion(format!("no price in {label} text {:?}", element.text))
        })
    }

    /// Read subtotal, tax and total
    ///
    /// # Errors
    ///
    /// Timeout when a label is missing, or an assertion failure for a label
    /// without a price.
    pub async fn summary(&self) -> SwagResult<OrderSummary> {
        Ok(OrderSummary {
            subtotal_cents: self.amount(&self.locators.subtotal).await?,
            tax_cents: self.amount(&self.locators.tax).await?,
            total_cents: self.amount(&self.locators.total).await?,
        })
    }

    /// Place the order; scrolls first, then native click with script fallback
    ///
    /// # Errors
    ///
    /// Fails when the confirmation never appears.
    pub async fn finish(&self) -> SwagResult<ActionReport> {
        let report = self
            .ctx
            .actor()
            .click(
                &self.locators.finish,
                &FallbackChain::native_then_script(),
                Some(&Condition::Visible(CHECKOUT_COMPLETE.header.clone())),
            )
            .await?;
        info!(%report, "order finished");
        Ok(report)
    }

    /// Abandon the order
    ///
    /// # Errors
    ///
    /// Click exhaustion.
    pub async fn cancel(&self) -> SwagResult<()> {
        self.ctx
            .actor()
            .click(&self.locators.cancel, &FallbackChain::native_then_script(), None)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PageObject for CheckoutOverviewPage<'_> {
    fn page_name(&self) -> &'static str {
        "Checkout: Overview"
    }

    fn url_path(&self) -> &'static str {
        "checkout-step-two.html"
    }

    fn context(&self) -> PageContext<'_> {
        self.ctx
    }

    fn load_check(&self) -> LoadCheck {
        LoadCheck {
            title: &self.locators.title,
            title_text: "Checkout: Overview",
            anchor: &self.locators.finish,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{PASSWORD, PRODUCTS};
    use crate::pages::inventory::InventoryPage;
    use crate::pages::login::LoginPage;
    use crate::pages::test_support::quick_settings;
    use crate::simulated::{ShopBehavior, SimulatedShop};

    async fn on_overview(shop: &SimulatedShop, username: &str) {
        let settings = quick_settings();
        let ctx = PageContext::new(shop, &settings);
        let login = LoginPage::new(ctx);
        login.open().await.unwrap();
        login.login(username, PASSWORD).await.unwrap();
        InventoryPage::new(ctx)
            .add_products(&[&PRODUCTS[0], &PRODUCTS[2]])
            .await
            .unwrap();
        CheckoutOverviewPage::new(ctx).open().await.unwrap();
    }

    #[test]
    fn test_summary_consistency() {
        let good = OrderSummary {
            subtotal_cents: 4598,
            tax_cents: 368,
            total_cents: 4966,
        };
        assert!(good.is_consistent());
        let bad = OrderSummary {
            total_cents: 4967,
            ..good
        };
        assert!(!bad.is_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_matches_catalog_prices() {
        let shop = SimulatedShop::new();
        on_overview(&shop, "standard_user").await;
        let settings = quick_settings();
        let page = CheckoutOverviewPage::new(PageContext::new(&shop, &settings));
        page.assert_loaded().await.unwrap();
        let summary = page.summary().await.unwrap();
        assert_eq!(summary.subtotal_cents, 2999 + 1599);
        assert!(summary.is_consistent());
        assert_eq!(page.item_names().await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_falls_back_when_covered() {
        let shop = SimulatedShop::with_behavior(
            ShopBehavior::default().with_intercepted_clicks(CHECKOUT_OVERVIEW.finish.clone(), 1),
        );
        on_overview(&shop, "standard_user").await;
        let settings = quick_settings();
        let page = CheckoutOverviewPage::new(PageContext::new(&shop, &settings));
        let report = page.finish().await.unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.strategy, Some("script click"));
        assert!(shop.cart().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_user_cannot_finish() {
        let shop = SimulatedShop::new();
        on_overview(&shop, "error_user").await;
        let settings = quick_settings();
        let page = CheckoutOverviewPage::new(PageContext::new(&shop, &settings));
        let err = page.finish().await.unwrap_err();
        assert!(matches!(err, SwagError::ActionExhausted { attempts: 3, .. }));
    }
}
