//! Scenario fixtures
//!
//! The checkout flow is built as a chain where every link depends on the one
//! before it:
//!
//! ```text
//! logged_in_standard_user
//!   └─► products_added_to_cart      (2 random products, badge = 2 after reload)
//!         └─► cart_page_loaded
//!               └─► checkout_info_page_loaded
//!                     └─► checkout_info_filled   (Vamsi / Kolla / T6H5J3)
//!                           └─► overview_page_loaded
//! ```
//!
//! Asking for a link runs all of its predecessors. Each link is recorded as a
//! report step named after what it does, gets a `Step_NN_<link>` log line and
//! ends with a screenshot attachment, whether it passed or not.

use crate::catalog::{sample_products, Product, CHECKOUT_INFO, STANDARD_USER};
use crate::page_object::{PageContext, PageObject};
use crate::pages::{
    CartPage, CheckoutInfoPage, CheckoutOverviewPage, CheckoutStep, InventoryPage, LoginOutcome,
    LoginPage,
};
use crate::report::{Status, TestRecorder};
use crate::result::{ensure, SwagError, SwagResult};
use crate::screenshot::ScreenshotStore;
use tracing::{error, info, warn};

/// Products put in the cart by [`Scenario::products_added_to_cart`]
pub const PRODUCTS_PER_ORDER: usize = 2;

/// Fixture chain over one live session
#[derive(Debug)]
pub struct Scenario<'a> {
    ctx: PageContext<'a>,
    recorder: TestRecorder,
    screenshots: Option<&'a ScreenshotStore>,
    seed: Option<u64>,
    step: u32,
    picked: Vec<&'static Product>,
}

impl<'a> Scenario<'a> {
    /// Chain recording into `recorder`
    #[must_use]
    pub fn new(ctx: PageContext<'a>, recorder: TestRecorder) -> Self {
        Self {
            ctx,
            recorder,
            screenshots: None,
            seed: None,
            step: 0,
            picked: Vec::new(),
        }
    }

    /// Also save every step screenshot to disk
    #[must_use]
    pub const fn with_screenshots(mut self, store: &'a ScreenshotStore) -> Self {
        self.screenshots = Some(store);
        self
    }

    /// Make the product pick repeatable
    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Page context shared by every link
    #[must_use]
    pub const fn context(&self) -> PageContext<'a> {
        self.ctx
    }

    /// Products added by the chain so far
    #[must_use]
    pub fn picked(&self) -> &[&'static Product] {
        &self.picked
    }

    /// Steps recorded so far
    #[must_use]
    pub const fn steps_taken(&self) -> u32 {
        self.step
    }

    /// The recorder, for test-level steps and attachments
    pub fn recorder_mut(&mut self) -> &mut TestRecorder {
        &mut self.recorder
    }

    /// Hand the recorder back to finish the test
    #[must_use]
    pub fn into_recorder(self) -> TestRecorder {
        self.recorder
    }

    /// Inventory, reached by logging in as `standard_user`
    ///
    /// # Errors
    ///
    /// Login rejection is an assertion failure; anything else propagates.
    pub async fn logged_in_standard_user(&mut self) -> SwagResult<InventoryPage<'a>> {
        self.recorder.start_step("Log in as standard_user");
        let outcome = log_in(self.ctx).await;
        self.finish("logged_in", &outcome).await;
        outcome
    }

    /// Inventory with two random products in the cart
    ///
    /// # Errors
    ///
    /// A product that does not go in, or a badge that does not read 2 after a
    /// reload, is an assertion failure.
    pub async fn products_added_to_cart(&mut self) -> SwagResult<InventoryPage<'a>> {
        self.logged_in_standard_user().await?;
        self.recorder.start_step("Add two random products to the cart");
        let picks = sample_products(PRODUCTS_PER_ORDER, self.seed);
        let names: Vec<&str> = picks.iter().map(|p| p.name).collect();
        self.recorder.parameter("Products", names.join(", "));
        let outcome = add_to_cart(self.ctx, &picks).await;
        if outcome.is_ok() {
            self.picked = picks;
        }
        self.finish("products_added", &outcome).await;
        outcome
    }

    /// Cart screen holding the picked products
    ///
    /// # Errors
    ///
    /// Cart lines that differ from the picks are an assertion failure.
    pub async fn cart_page_loaded(&mut self) -> SwagResult<CartPage<'a>> {
        self.products_added_to_cart().await?;
        self.recorder.start_step("Open the cart");
        let outcome = open_cart(self.ctx, &self.picked).await;
        self.finish("cart_loaded", &outcome).await;
        outcome
    }

    /// Checkout information form
    ///
    /// # Errors
    ///
    /// Fails when the form never loads.
    pub async fn checkout_info_page_loaded(&mut self) -> SwagResult<CheckoutInfoPage<'a>> {
        self.cart_page_loaded().await?;
        self.recorder.start_step("Proceed to checkout");
        let outcome = start_checkout(self.ctx).await;
        self.finish("checkout_info_loaded", &outcome).await;
        outcome
    }

    /// Checkout form holding the fixed buyer details
    ///
    /// # Errors
    ///
    /// A field that does not read back exactly is a field mismatch.
    pub async fn checkout_info_filled(&mut self) -> SwagResult<CheckoutInfoPage<'a>> {
        self.checkout_info_page_loaded().await?;
        self.recorder.start_step("Enter checkout information");
        self.recorder.parameter("First Name", CHECKOUT_INFO.first_name);
        self.recorder.parameter("Last Name", CHECKOUT_INFO.last_name);
        self.recorder.parameter("Postal Code", CHECKOUT_INFO.postal_code);
        let outcome = fill_info(self.ctx).await;
        self.finish("checkout_info_filled", &outcome).await;
        outcome
    }

    /// Order overview
    ///
    /// # Errors
    ///
    /// A validation message instead of the overview is an assertion failure.
    pub async fn overview_page_loaded(&mut self) -> SwagResult<CheckoutOverviewPage<'a>> {
        self.checkout_info_filled().await?;
        self.recorder.start_step("Continue to the overview");
        let outcome = continue_to_overview(self.ctx).await;
        self.finish("overview_loaded", &outcome).await;
        outcome
    }

    /// Close the open step with a log line and a screenshot
    async fn finish<T>(&mut self, link: &str, outcome: &SwagResult<T>) {
        self.step += 1;
        let name = format!("Step_{:02}_{link}", self.step);
        match outcome {
            Ok(_) => info!(step = %name, "fixture step passed"),
            Err(e) => error!(step = %name, error = %e, "fixture step failed"),
        }

        let driver = self.ctx.driver();
        let shot = match self.screenshots {
            Some(store) => store.capture(driver, &name).await,
            None => driver.screenshot().await.map(|s| s.data),
        };
        match shot {
            Ok(png) => self.recorder.attach_png(&name, &png),
            Err(e) => warn!(step = %name, error = %e, "no screenshot for step"),
        }
        if let Err(e) = outcome {
            self.recorder.attach_text("Error", &e.to_string());
        }
        self.recorder.finish_step(Status::of(outcome));
    }
}

async fn log_in(ctx: PageContext<'_>) -> SwagResult<InventoryPage<'_>> {
    let login = LoginPage::new(ctx);
    login.open().await?;
    if let LoginOutcome::Rejected { message } = login.login_as(&STANDARD_USER).await? {
        return Err(SwagError::assertion(format!(
            "{} was rejected: {message}",
            STANDARD_USER.username
        )));
    }
    let inventory = InventoryPage::new(ctx);
    inventory.assert_loaded().await?;
    Ok(inventory)
}

async fn add_to_cart<'a>(
    ctx: PageContext<'a>,
    picks: &[&'static Product],
) -> SwagResult<InventoryPage<'a>> {
    let inventory = InventoryPage::new(ctx);
    let added = inventory.add_products(picks).await?;
    ensure(added == picks.len(), || {
        format!("only {added} of {} products went into the cart", picks.len())
    })?;
    inventory.refresh().await?;
    let count = inventory.cart_count().await?;
    ensure(count == picks.len(), || {
        format!(
            "cart badge shows {count} after reload, expected {}",
            picks.len()
        )
    })?;
    Ok(inventory)
}

async fn open_cart<'a>(
    ctx: PageContext<'a>,
    picks: &[&'static Product],
) -> SwagResult<CartPage<'a>> {
    InventoryPage::new(ctx).go_to_cart().await?;
    let cart = CartPage::new(ctx);
    cart.assert_loaded().await?;
    let names = cart.item_names().await?;
    let expected: Vec<&str> = picks.iter().map(|p| p.name).collect();
    ensure(names == expected, || {
        format!("cart holds {names:?}, expected {expected:?}")
    })?;
    Ok(cart)
}

async fn start_checkout(ctx: PageContext<'_>) -> SwagResult<CheckoutInfoPage<'_>> {
    CartPage::new(ctx).checkout().await?;
    let info = CheckoutInfoPage::new(ctx);
    info.assert_loaded().await?;
    Ok(info)
}

async fn fill_info(ctx: PageContext<'_>) -> SwagResult<CheckoutInfoPage<'_>> {
    let info = CheckoutInfoPage::new(ctx);
    info.fill(&CHECKOUT_INFO).await?;
    info.verify_information(&CHECKOUT_INFO).await?;
    Ok(info)
}

async fn continue_to_overview(ctx: PageContext<'_>) -> SwagResult<CheckoutOverviewPage<'_>> {
    if let CheckoutStep::Rejected { message } = CheckoutInfoPage::new(ctx).continue_checkout().await? {
        return Err(SwagError::assertion(format!(
            "checkout information rejected: {message}"
        )));
    }
    let overview = CheckoutOverviewPage::new(ctx);
    overview.assert_loaded().await?;
    Ok(overview)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::BrowserDriver;
    use crate::pages::test_support::quick_settings;
    use crate::report::{Severity, Taxonomy};
    use crate::simulated::{Screen, SimulatedShop};

    const TAXONOMY: Taxonomy = Taxonomy {
        epic: "Checkout",
        feature: "Fixtures",
        story: "Chain",
        severity: Severity::Normal,
    };

    fn recorder() -> TestRecorder {
        TestRecorder::new(None, "chain", "fixture::chain", &TAXONOMY)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_chain_reaches_overview() {
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let mut scenario =
            Scenario::new(PageContext::new(&shop, &settings), recorder()).with_seed(Some(7));

        let overview = scenario.overview_page_loaded().await.unwrap();
        assert_eq!(shop.title().await.unwrap(), "Swag Labs");
        assert_eq!(shop.screen().unwrap(), Screen::Overview);
        assert_eq!(scenario.picked().len(), PRODUCTS_PER_ORDER);
        assert_eq!(shop.cart().unwrap().len(), PRODUCTS_PER_ORDER);
        assert!(overview.summary().await.unwrap().is_consistent());
        assert_eq!(scenario.steps_taken(), 6);

        let result = scenario.into_recorder().finish(Status::Passed, None).unwrap();
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Log in as standard_user",
                "Add two random products to the cart",
                "Open the cart",
                "Proceed to checkout",
                "Enter checkout information",
                "Continue to the overview",
            ]
        );
        for (i, step) in result.steps.iter().enumerate() {
            assert_eq!(step.status, Status::Passed);
            assert!(step.attachments[0].name.starts_with(&format!("Step_{:02}_", i + 1)));
            assert_eq!(step.attachments[0].mime_type, "image/png");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_repeats_the_pick() {
        let first = {
            let shop = SimulatedShop::new();
            let settings = quick_settings();
            let mut scenario =
                Scenario::new(PageContext::new(&shop, &settings), recorder()).with_seed(Some(42));
            scenario.products_added_to_cart().await.unwrap();
            scenario.picked().to_vec()
        };
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let mut scenario =
            Scenario::new(PageContext::new(&shop, &settings), recorder()).with_seed(Some(42));
        scenario.products_added_to_cart().await.unwrap();
        assert_eq!(scenario.picked(), first.as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_session_marks_step_broken() {
        let shop = SimulatedShop::new();
        shop.quit().await.unwrap();
        let settings = quick_settings();
        let mut scenario = Scenario::new(PageContext::new(&shop, &settings), recorder());

        let err = scenario.cart_page_loaded().await.unwrap_err();
        assert!(matches!(err, SwagError::Session { .. }));
        assert_eq!(scenario.steps_taken(), 1);

        let result = scenario.into_recorder().finish(Status::Broken, None).unwrap();
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].status, Status::Broken);
        assert_eq!(result.steps[0].attachments[0].name, "Error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_screenshots_saved_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path());
        let shop = SimulatedShop::new();
        let settings = quick_settings();
        let mut scenario = Scenario::new(PageContext::new(&shop, &settings), recorder())
            .with_screenshots(&store);
        scenario.logged_in_standard_user().await.unwrap();
        let files = std::fs::read_dir(dir.path().join("chrome")).unwrap().count();
        assert_eq!(files, 1);
    }
}
