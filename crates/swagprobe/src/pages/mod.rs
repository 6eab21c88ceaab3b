//! Page objects for every screen of the shop.
//!
//! | Screen | Title | Anchor |
//! |---|---|---|
//! | [`LoginPage`] | `.login_logo` = `Swag Labs` | `#login-button` |
//! | [`InventoryPage`] | `Products` | `#inventory_container` |
//! | [`CartPage`] | `Your Cart` | `#checkout` |
//! | [`CheckoutInfoPage`] | `Checkout: Your Information` | `#continue` |
//! | [`CheckoutOverviewPage`] | `Checkout: Overview` | `#finish` |
//! | [`CheckoutCompletePage`] | `Checkout: Complete!` | `.complete-header` |

pub mod cart;
pub mod checkout_complete;
pub mod checkout_info;
pub mod checkout_overview;
pub mod inventory;
pub mod login;

pub use cart::{CartLocators, CartPage, CART};
pub use checkout_complete::{CheckoutCompleteLocators, CheckoutCompletePage, CHECKOUT_COMPLETE};
pub use checkout_info::{CheckoutInfoLocators, CheckoutInfoPage, CheckoutStep, CHECKOUT_INFO};
pub use checkout_overview::{
    CheckoutOverviewLocators, CheckoutOverviewPage, OrderSummary, CHECKOUT_OVERVIEW,
};
pub use inventory::{InventoryLocators, InventoryPage, INVENTORY};
pub use login::{LoginLocators, LoginOutcome, LoginPage, LOGIN};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::action::{Backoff, RetryPolicy};
    use crate::page_object::PageSettings;
    use crate::wait::WaitOptions;

    /// Short budgets so paused-clock tests stay readable
    pub fn quick_settings() -> PageSettings {
        PageSettings {
            wait: WaitOptions::new().with_timeout(5_000).with_poll_interval(100),
            retry: RetryPolicy::new(3)
                .with_backoff(Backoff::None)
                .with_verify_timeout(1_000),
            ..PageSettings::default()
        }
    }
}
