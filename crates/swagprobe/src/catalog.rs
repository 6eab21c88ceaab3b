//! Fixed fixtures of the demo shop: base URL, products, credentials and
//! checkout details. These are literal test data, never discovered.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

/// Base URL of the site under test
pub const BASE_URL: &str = "https://www.saucedemo.com/";

/// Shared password of every demo account
pub const PASSWORD: &str = "secret_sauce";

/// Sales tax applied at checkout, in basis points
pub const TAX_RATE_BASIS_POINTS: u64 = 800;

/// A catalog product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Product {
    /// Slug used in button ids (`add-to-cart-<id>`, `remove-<id>`)
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Price in cents
    pub price_cents: u64,
}

impl Product {
    /// Id of the "Add to cart" button
    #[must_use]
    pub fn add_button_id(&self) -> String {
        format!("add-to-cart-{}", self.id)
    }

    /// Id of the "Remove" button
    #[must_use]
    pub fn remove_button_id(&self) -> String {
        format!("remove-{}", self.id)
    }
}

/// The six products on the inventory page, in display order
pub static PRODUCTS: [Product; 6] = [
    Product {
        id: "sauce-labs-backpack",
        name: "Sauce Labs Backpack",
        price_cents: 2999,
    },
    Product {
        id: "sauce-labs-bike-light",
        name: "Sauce Labs Bike Light",
        price_cents: 999,
    },
    Product {
        id: "sauce-labs-bolt-t-shirt",
        name: "Sauce Labs Bolt T-Shirt",
        price_cents: 1599,
    },
    Product {
        id: "sauce-labs-fleece-jacket",
        name: "Sauce Labs Fleece Jacket",
        price_cents: 4999,
    },
    Product {
        id: "sauce-labs-onesie",
        name: "Sauce Labs Onesie",
        price_cents: 799,
    },
    Product {
        id: "test.allthethings()-t-shirt-(red)",
        name: "Test.allTheThings() T-Shirt (Red)",
        price_cents: 1599,
    },
];

/// Look up a product by slug
#[must_use]
pub fn product(id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Look up a product by display name
#[must_use]
pub fn product_by_name(name: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.name == name)
}

/// `k` distinct products picked at random; a seed makes the pick repeatable.
/// `k` is clamped to the catalog size.
#[must_use]
pub fn sample_products(k: usize, seed: Option<u64>) -> Vec<&'static Product> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    PRODUCTS
        .choose_multiple(&mut rng, k.min(PRODUCTS.len()))
        .collect()
}

/// A demo account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Credentials {
    /// Login name
    pub username: &'static str,
    /// Password
    pub password: &'static str,
    /// Whether the site lets this account in
    pub expect_login: bool,
}

/// The account used by every flow past login
pub const STANDARD_USER: Credentials = Credentials {
    username: "standard_user",
    password: PASSWORD,
    expect_login: true,
};

/// The credential tuples exercised by the login test
pub static USERS: [Credentials; 6] = [
    STANDARD_USER,
    Credentials {
        username: "locked_out_user",
        password: PASSWORD,
        expect_login: false,
    },
    Credentials {
        username: "problem_user",
        password: PASSWORD,
        expect_login: true,
    },
    Credentials {
        username: "performance_glitch_user",
        password: PASSWORD,
        expect_login: true,
    },
    Credentials {
        username: "error_user",
        password: PASSWORD,
        expect_login: true,
    },
    Credentials {
        username: "visual_user",
        password: PASSWORD,
        expect_login: true,
    },
];

/// Look up an account by name
#[must_use]
pub fn user(username: &str) -> Option<&'static Credentials> {
    USERS.iter().find(|u| u.username == username)
}

/// Checkout form details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutInfo {
    /// First name
    pub first_name: &'static str,
    /// Last name
    pub last_name: &'static str,
    /// Postal code
    pub postal_code: &'static str,
}

/// Details entered on the checkout information step
pub static CHECKOUT_INFO: CheckoutInfo = CheckoutInfo {
    first_name: "Vamsi",
    last_name: "Kolla",
    postal_code: "T6H5J3",
};

/// Tax on a subtotal, rounded half up to the cent
#[must_use]
pub const fn tax_cents(subtotal_cents: u64) -> u64 {
    (subtotal_cents * TAX_RATE_BASIS_POINTS + 5_000) / 10_000
}

/// Render cents as `$12.34`
#[must_use]
pub fn format_price(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

/// Parse the first `$12.34` amount in a label into cents
#[must_use]
pub fn parse_price(label: &str) -> Option<u64> {
    let amount = &label[label.find('$')? + 1..];
    let amount: String = amount
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let (dollars, cents) = amount.split_once('.').unwrap_or((amount.as_str(), "0"));
    let cents = match cents.len() {
        0 => 0,
        1 => cents.parse::<u64>().ok()? * 10,
        2 => cents.parse::<u64>().ok()?,
        _ => return None,
    };
    Some(dollars.parse::<u64>().ok()? * 100 + cents)
}
