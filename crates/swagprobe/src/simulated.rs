//! SimulatedShop - in-memory replica of the demo shop
//!
//! Implements [`BrowserDriver`] over a small model of the site: six screens,
//! a cart kept in (simulated) local storage so it survives reloads, the login
//! and checkout validation messages, and the quirks of the special demo
//! accounts. Tests and `swagprobe run --simulate` drive it exactly like a
//! real browser.
//!
//! [`ShopBehavior`] adds the failure modes the action layer has to cope with:
//! delayed rendering, intercepted pointer clicks and dropped keystrokes.
//!
//! XPath locators never match; everything else is resolved against the
//! rendered node list with first-match semantics.

use crate::catalog::{self, PRODUCTS};
use crate::driver::{BrowserDriver, ElementHandle, ScriptAction, Screenshot};
use crate::locator::{By, Locator};
use crate::result::{SwagError, SwagResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Add-to-cart buttons that ignore `problem_user`
const PROBLEM_USER_DEAD_BUTTONS: [&str; 3] = [
    "sauce-labs-bolt-t-shirt",
    "sauce-labs-fleece-jacket",
    "test.allthethings()-t-shirt-(red)",
];

const SCREENSHOT_WIDTH: u32 = 160;
const SCREENSHOT_HEIGHT: u32 = 100;

/// A screen of the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Nothing loaded yet
    Blank,
    /// Login form
    Login,
    /// Product list
    Inventory,
    /// Cart contents
    Cart,
    /// Checkout step one
    CheckoutInfo,
    /// Checkout step two
    Overview,
    /// Order confirmation
    Complete,
}

impl Screen {
    /// Path relative to the origin
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Blank => "",
            Self::Login => "/",
            Self::Inventory => "/inventory.html",
            Self::Cart => "/cart.html",
            Self::CheckoutInfo => "/checkout-step-one.html",
            Self::Overview => "/checkout-step-two.html",
            Self::Complete => "/checkout-complete.html",
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path {
            "" | "/" | "/index.html" => Some(Self::Login),
            "/inventory.html" => Some(Self::Inventory),
            "/cart.html" => Some(Self::Cart),
            "/checkout-step-one.html" => Some(Self::CheckoutInfo),
            "/checkout-step-two.html" => Some(Self::Overview),
            "/checkout-complete.html" => Some(Self::Complete),
            _ => None,
        }
    }

    const fn requires_login(self) -> bool {
        !matches!(self, Self::Blank | Self::Login)
    }

    const fn heading(self) -> &'static str {
        match self {
            Self::Blank => "",
            Self::Login => "Swag Labs",
            Self::Inventory => "Products",
            Self::Cart => "Your Cart",
            Self::CheckoutInfo => "Checkout: Your Information",
            Self::Overview => "Checkout: Overview",
            Self::Complete => "Checkout: Complete!",
        }
    }

    const fn colour(self) -> [u8; 3] {
        match self {
            Self::Blank => [255, 255, 255],
            Self::Login => [226, 35, 26],
            Self::Inventory => [19, 35, 34],
            Self::Cart => [61, 220, 145],
            Self::CheckoutInfo => [72, 76, 85],
            Self::Overview => [18, 110, 200],
            Self::Complete => [250, 190, 40],
        }
    }
}

/// Injected misbehaviour
#[derive(Debug, Clone)]
pub struct ShopBehavior {
    render_delay: Duration,
    glitch_delay: Duration,
    intercepted_clicks: HashMap<Locator, u32>,
    dropped_keys: HashSet<Locator>,
    browser_name: String,
}

impl Default for ShopBehavior {
    fn default() -> Self {
        Self {
            render_delay: Duration::ZERO,
            glitch_delay: Duration::from_millis(2_000),
            intercepted_clicks: HashMap::new(),
            dropped_keys: HashSet::new(),
            browser_name: "chrome".to_string(),
        }
    }
}

impl ShopBehavior {
    /// Elements stay hidden this long after every page load
    #[must_use]
    pub const fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    /// Extra load time of the inventory page for `performance_glitch_user`
    #[must_use]
    pub const fn with_glitch_delay(mut self, delay: Duration) -> Self {
        self.glitch_delay = delay;
        self
    }

    /// The next `times` pointer clicks on `locator` hit an overlay instead
    #[must_use]
    pub fn with_intercepted_clicks(mut self, locator: Locator, times: u32) -> Self {
        self.intercepted_clicks.insert(locator, times);
        self
    }

    /// Keystrokes sent to `locator` are silently lost
    #[must_use]
    pub fn with_dropped_keys(mut self, locator: Locator) -> Self {
        self.dropped_keys.insert(locator);
        self
    }

    /// Browser name reported in capabilities
    #[must_use]
    pub fn with_browser_name(mut self, name: impl Into<String>) -> Self {
        self.browser_name = name.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
    FirstName,
    LastName,
    PostalCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Click {
    Login,
    AddToCart(&'static str),
    Remove(&'static str),
    OpenCart,
    Checkout,
    ContinueShopping,
    CancelInfo,
    ContinueInfo,
    CancelOverview,
    Finish,
    BackHome,
}

#[derive(Debug, Clone)]
struct Node {
    tag: &'static str,
    id: Option<String>,
    classes: Vec<&'static str>,
    data_test: Option<String>,
    name: Option<&'static str>,
    text: String,
    value: Option<String>,
    field: Option<Field>,
    on_click: Option<Click>,
    displayed: bool,
}

impl Node {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            id: None,
            classes: Vec::new(),
            data_test: None,
            name: None,
            text: String::new(),
            value: None,
            field: None,
            on_click: None,
            displayed: true,
        }
    }

    fn id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.data_test = Some(id.clone());
        self.id = Some(id);
        self
    }

    fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    fn data_test(mut self, value: &'static str) -> Self {
        self.data_test = Some(value.to_string());
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn input(mut self, name: &'static str, field: Field, value: &str) -> Self {
        self.name = Some(name);
        self.field = Some(field);
        self.value = Some(value.to_string());
        self
    }

    fn submit(mut self, label: &str, click: Click) -> Self {
        self.value = Some(label.to_string());
        self.on_click = Some(click);
        self
    }

    fn on_click(mut self, click: Click) -> Self {
        self.on_click = Some(click);
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        let selector = locator.selector();
        match locator.by() {
            By::Id => self.id.as_deref() == Some(selector),
            By::ClassName => self.classes.contains(&selector),
            By::Name => self.name == Some(selector),
            By::TagName => self.tag.eq_ignore_ascii_case(selector),
            By::DataTest => self.data_test.as_deref() == Some(selector),
            By::Css => self.matches_css(selector),
            By::XPath => false,
        }
    }

    /// `#id`, `.class`, `[attr="value"]` and bare tag selectors
    fn matches_css(&self, css: &str) -> bool {
        let css = css.trim();
        if let Some(id) = css.strip_prefix('#') {
            return self.id.as_deref() == Some(id);
        }
        if let Some(class) = css.strip_prefix('.') {
            return self.classes.contains(&class);
        }
        if let Some(attr) = css.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
            let Some((key, value)) = attr.split_once('=') else {
                return false;
            };
            let value = value.trim_matches(['"', '\'']);
            return match key {
                "id" => self.id.as_deref() == Some(value),
                "data-test" => self.data_test.as_deref() == Some(value),
                "name" => self.name == Some(value),
                _ => false,
            };
        }
        self.tag.eq_ignore_ascii_case(css)
    }

    fn snapshot(&self) -> ElementHandle {
        ElementHandle {
            tag_name: self.tag.to_string(),
            text: self.text.clone(),
            value: self.value.clone(),
            displayed: self.displayed,
            enabled: true,
        }
    }
}

#[derive(Debug)]
struct ShopState {
    screen: Screen,
    origin: String,
    url: String,
    user: Option<&'static str>,
    cart: Vec<&'static str>,
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    postal_code: String,
    error: Option<String>,
    loaded_at: Instant,
    load_time: Duration,
    intercepts_left: HashMap<Locator, u32>,
    native_clicks: u32,
    script_clicks: u32,
    closed: bool,
}

impl ShopState {
    fn is_ready(&self) -> bool {
        self.loaded_at.elapsed() >= self.load_time
    }

    fn field(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Password => &self.password,
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::PostalCode => &self.postal_code,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::PostalCode => &mut self.postal_code,
        }
    }

    fn subtotal_cents(&self) -> u64 {
        self.cart
            .iter()
            .filter_map(|id| catalog::product(id))
            .map(|p| p.price_cents)
            .sum()
    }
}

/// In-memory demo shop
#[derive(Debug)]
pub struct SimulatedShop {
    behavior: ShopBehavior,
    state: Mutex<ShopState>,
}

impl Default for SimulatedShop {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedShop {
    /// Shop that behaves like the live site
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(ShopBehavior::default())
    }

    /// Shop with injected misbehaviour
    #[must_use]
    pub fn with_behavior(behavior: ShopBehavior) -> Self {
        let state = ShopState {
            screen: Screen::Blank,
            origin: String::new(),
            url: "about:blank".to_string(),
            user: None,
            cart: Vec::new(),
            username: String::new(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            postal_code: String::new(),
            error: None,
            loaded_at: Instant::now(),
            load_time: Duration::ZERO,
            intercepts_left: behavior.intercepted_clicks.clone(),
            native_clicks: 0,
            script_clicks: 0,
            closed: false,
        };
        Self {
            behavior,
            state: Mutex::new(state),
        }
    }

    /// Screen currently shown
    ///
    /// # Errors
    ///
    /// Fails once the session has been closed.
    pub fn screen(&self) -> SwagResult<Screen> {
        Ok(self.open_state()?.screen)
    }

    /// Product ids in the cart, in the order they were added
    ///
    /// # Errors
    ///
    /// Fails once the session has been closed.
    pub fn cart(&self) -> SwagResult<Vec<&'static str>> {
        Ok(self.open_state()?.cart.clone())
    }

    /// Pointer and script clicks performed so far
    ///
    /// # Errors
    ///
    /// Fails once the session has been closed.
    pub fn click_counts(&self) -> SwagResult<(u32, u32)> {
        let state = self.open_state()?;
        Ok((state.native_clicks, state.script_clicks))
    }

    /// Whether `quit` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().map_or(true, |s| s.closed)
    }

    fn lock(&self) -> SwagResult<MutexGuard<'_, ShopState>> {
        self.state
            .lock()
            .map_err(|_| SwagError::session("simulated shop state poisoned"))
    }

    fn open_state(&self) -> SwagResult<MutexGuard<'_, ShopState>> {
        let state = self.lock()?;
        if state.closed {
            return Err(SwagError::session(
                "invalid session id: browser has been closed",
            ));
        }
        Ok(state)
    }

    fn load(&self, state: &mut ShopState, screen: Screen) {
        let screen = if screen.requires_login() && state.user.is_none() {
            state.error = Some(format!(
                "Epic sadface: You can only access '{}' when you are logged in.",
                screen.path()
            ));
            Screen::Login
        } else {
            state.error = None;
            screen
        };
        let glitch = screen == Screen::Inventory && state.user == Some("performance_glitch_user");

        state.screen = screen;
        state.url = format!("{}{}", state.origin, screen.path());
        state.loaded_at = Instant::now();
        state.load_time = self.behavior.render_delay
            + if glitch {
                self.behavior.glitch_delay
            } else {
                Duration::ZERO
            };
        state.username.clear();
        state.password.clear();
        state.first_name.clear();
        state.last_name.clear();
        state.postal_code.clear();
        debug!(path = screen.path(), "simulated page load");
    }

    fn render(state: &ShopState) -> Vec<Node> {
        let mut nodes = Vec::new();
        let screen = state.screen;

        if screen == Screen::Login {
            nodes.push(Node::new("div").class("login_logo").text(screen.heading()));
            nodes.push(
                Node::new("input")
                    .id("user-name")
                    .data_test("username")
                    .input("user-name", Field::Username, &state.username),
            );
            nodes.push(
                Node::new("input")
                    .id("password")
                    .input("password", Field::Password, &state.password),
            );
            nodes.push(
                Node::new("input")
                    .id("login-button")
                    .class("submit-button")
                    .submit("Login", Click::Login),
            );
        }

        if screen.requires_login() {
            nodes.push(
                Node::new("a")
                    .class("shopping_cart_link")
                    .data_test("shopping-cart-link")
                    .on_click(Click::OpenCart),
            );
            if !state.cart.is_empty() {
                nodes.push(
                    Node::new("span")
                        .class("shopping_cart_badge")
                        .data_test("shopping-cart-badge")
                        .text(state.cart.len().to_string()),
                );
            }
            nodes.push(
                Node::new("span")
                    .class("title")
                    .data_test("title")
                    .text(screen.heading()),
            );
        }

        match screen {
            Screen::Blank | Screen::Login => {}
            Screen::Inventory => {
                nodes.push(Node::new("div").id("inventory_container"));
                for product in &PRODUCTS {
                    nodes.push(
                        Node::new("div")
                            .class("inventory_item_name")
                            .text(product.name),
                    );
                    nodes.push(
                        Node::new("div")
                            .class("inventory_item_price")
                            .text(catalog::format_price(product.price_cents)),
                    );
                    let button = if state.cart.contains(&product.id) {
                        Node::new("button")
                            .id(product.remove_button_id())
                            .text("Remove")
                            .on_click(Click::Remove(product.id))
                    } else {
                        Node::new("button")
                            .id(product.add_button_id())
                            .text("Add to cart")
                            .on_click(Click::AddToCart(product.id))
                    };
                    nodes.push(button.class("btn_inventory"));
                }
            }
            Screen::Cart | Screen::Overview => {
                nodes.push(Node::new("div").class("cart_list"));
                for product in state.cart.iter().filter_map(|id| catalog::product(id)) {
                    nodes.push(Node::new("div").class("cart_item"));
                    nodes.push(
                        Node::new("div")
                            .class("inventory_item_name")
                            .text(product.name),
                    );
                    nodes.push(
                        Node::new("div")
                            .class("inventory_item_price")
                            .text(catalog::format_price(product.price_cents)),
                    );
                    if screen == Screen::Cart {
                        nodes.push(
                            Node::new("button")
                                .id(product.remove_button_id())
                                .text("Remove")
                                .on_click(Click::Remove(product.id)),
                        );
                    }
                }
                if screen == Screen::Cart {
                    nodes.push(
                        Node::new("button")
                            .id("continue-shopping")
                            .text("Continue Shopping")
                            .on_click(Click::ContinueShopping),
                    );
                    nodes.push(
                        Node::new("button")
                            .id("checkout")
                            .text("Checkout")
                            .on_click(Click::Checkout),
                    );
                } else {
                    let subtotal = state.subtotal_cents();
                    let tax = catalog::tax_cents(subtotal);
                    nodes.push(
                        Node::new("div")
                            .class("summary_subtotal_label")
                            .text(format!("Item total: {}", catalog::format_price(subtotal))),
                    );
                    nodes.push(
                        Node::new("div")
                            .class("summary_tax_label")
                            .text(format!("Tax: {}", catalog::format_price(tax))),
                    );
                    nodes.push(
                        Node::new("div")
                            .class("summary_total_label")
                            .text(format!("Total: {}", catalog::format_price(subtotal + tax))),
                    );
                    nodes.push(
                        Node::new("button")
                            .id("cancel")
                            .text("Cancel")
                            .on_click(Click::CancelOverview),
                    );
                    nodes.push(
                        Node::new("button")
                            .id("finish")
                            .text("Finish")
                            .on_click(Click::Finish),
                    );
                }
            }
            Screen::CheckoutInfo => {
                nodes.push(
                    Node::new("input")
                        .id("first-name")
                        .data_test("firstName")
                        .input("firstName", Field::FirstName, &state.first_name),
                );
                nodes.push(
                    Node::new("input")
                        .id("last-name")
                        .data_test("lastName")
                        .input("lastName", Field::LastName, &state.last_name),
                );
                nodes.push(
                    Node::new("input")
                        .id("postal-code")
                        .data_test("postalCode")
                        .input("postalCode", Field::PostalCode, &state.postal_code),
                );
                nodes.push(
                    Node::new("button")
                        .id("cancel")
                        .text("Cancel")
                        .on_click(Click::CancelInfo),
                );
                nodes.push(
                    Node::new("input")
                        .id("continue")
                        .class("submit-button")
                        .submit("Continue", Click::ContinueInfo),
                );
            }
            Screen::Complete => {
                nodes.push(
                    Node::new("h2")
                        .class("complete-header")
                        .data_test("complete-header")
                        .text("Thank you for your order!"),
                );
                nodes.push(Node::new("div").class("complete-text").text(
                    "Your order has been dispatched, and will arrive just as fast as the pony can get there!",
                ));
                nodes.push(
                    Node::new("button")
                        .id("back-to-products")
                        .text("Back Home")
                        .on_click(Click::BackHome),
                );
            }
        }

        if let Some(error) = &state.error {
            if matches!(screen, Screen::Login | Screen::CheckoutInfo) {
                nodes.push(
                    Node::new("h3")
                        .class("error-message")
                        .data_test("error")
                        .text(error.clone()),
                );
            }
        }

        let ready = state.is_ready();
        for node in &mut nodes {
            node.displayed = ready;
        }
        nodes
    }

    fn locate(state: &ShopState, locator: &Locator) -> Option<Node> {
        Self::render(state).into_iter().find(|n| n.matches(locator))
    }

    fn apply(&self, state: &mut ShopState, click: Click) {
        trace!(?click, "simulated click");
        match click {
            Click::Login => self.submit_login(state),
            Click::AddToCart(id) => {
                let dead = state.user == Some("problem_user") && PROBLEM_USER_DEAD_BUTTONS.contains(&id);
                if !dead && !state.cart.contains(&id) {
                    state.cart.push(id);
                }
            }
            Click::Remove(id) => state.cart.retain(|p| *p != id),
            Click::OpenCart => self.load(state, Screen::Cart),
            Click::Checkout => self.load(state, Screen::CheckoutInfo),
            Click::ContinueShopping | Click::CancelOverview | Click::BackHome => {
                self.load(state, Screen::Inventory);
            }
            Click::CancelInfo => self.load(state, Screen::Cart),
            Click::ContinueInfo => {
                let missing = [
                    (Field::FirstName, "First Name"),
                    (Field::LastName, "Last Name"),
                    (Field::PostalCode, "Postal Code"),
                ]
                .into_iter()
                .find(|(field, _)| state.field(*field).is_empty());
                match missing {
                    Some((_, label)) => state.error = Some(format!("Error: {label} is required")),
                    None => self.load(state, Screen::Overview),
                }
            }
            Click::Finish => {
                if state.user != Some("error_user") {
                    state.cart.clear();
                    self.load(state, Screen::Complete);
                }
            }
        }
    }

    fn submit_login(&self, state: &mut ShopState) {
        let message = if state.username.is_empty() {
            Some("Epic sadface: Username is required")
        } else if state.password.is_empty() {
            Some("Epic sadface: Password is required")
        } else {
            match catalog::user(&state.username) {
                Some(user) if user.password == state.password && user.expect_login => {
                    state.user = Some(user.username);
                    None
                }
                Some(user) if user.password == state.password => {
                    Some("Epic sadface: Sorry, this user has been locked out.")
                }
                _ => Some(
                    "Epic sadface: Username and password do not match any user in this service",
                ),
            }
        };
        match message {
            Some(message) => state.error = Some(message.to_string()),
            None => self.load(state, Screen::Inventory),
        }
    }

    fn type_into(&self, state: &mut ShopState, locator: &Locator, field: Field, text: &str) {
        if self.behavior.dropped_keys.contains(locator) {
            debug!(%locator, "keystrokes dropped");
            return;
        }
        match (state.user, field) {
            (Some("problem_user"), Field::LastName) => {
                if let Some(last) = text.chars().last() {
                    state.first_name = last.to_string();
                }
            }
            (Some("error_user"), Field::LastName) => {}
            _ => state.field_mut(field).push_str(text),
        }
    }

    fn encode_screenshot(screen: Screen) -> SwagResult<Vec<u8>> {
        let [r, g, b] = screen.colour();
        let mut pixels = Vec::with_capacity((SCREENSHOT_WIDTH * SCREENSHOT_HEIGHT * 3) as usize);
        for row in 0..SCREENSHOT_HEIGHT {
            for _ in 0..SCREENSHOT_WIDTH {
                if row < 12 {
                    pixels.extend_from_slice(&[r, g, b]);
                } else {
                    pixels.extend_from_slice(&[245, 245, 245]);
                }
            }
        }

        let mut output = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut output, SCREENSHOT_WIDTH, SCREENSHOT_HEIGHT);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().map_err(|e| SwagError::Screenshot {
                message: format!("Failed to write PNG header: {e}"),
            })?;
            writer
                .write_image_data(&pixels)
                .map_err(|e| SwagError::Screenshot {
                    message: format!("Failed to write PNG data: {e}"),
                })?;
        }
        Ok(output)
    }
}

fn split_url(url: &str) -> Option<(String, String)> {
    let scheme_end = url.find("://")? + 3;
    let (scheme, rest) = url.split_at(scheme_end);
    if !scheme.starts_with("http") {
        return None;
    }
    let path_start = rest.find('/').unwrap_or(rest.len());
    let (host, path) = rest.split_at(path_start);
    if host.is_empty() {
        return None;
    }
    Some((format!("{scheme}{host}"), path.to_string()))
}

#[async_trait]
impl BrowserDriver for SimulatedShop {
    async fn navigate(&self, url: &str) -> SwagResult<()> {
        let mut state = self.open_state()?;
        let (origin, path) = split_url(url).ok_or_else(|| SwagError::Navigation {
            url: url.to_string(),
            message: "invalid URL".to_string(),
        })?;
        let screen = Screen::from_path(&path).ok_or_else(|| SwagError::Navigation {
            url: url.to_string(),
            message: "404 Not Found".to_string(),
        })?;
        state.origin = origin;
        self.load(&mut state, screen);
        Ok(())
    }

    async fn refresh(&self) -> SwagResult<()> {
        let mut state = self.open_state()?;
        let screen = state.screen;
        if screen != Screen::Blank {
            self.load(&mut state, screen);
        }
        Ok(())
    }

    async fn current_url(&self) -> SwagResult<String> {
        Ok(self.open_state()?.url.clone())
    }

    async fn title(&self) -> SwagResult<String> {
        let state = self.open_state()?;
        Ok(if state.screen == Screen::Blank {
            String::new()
        } else {
            "Swag Labs".to_string()
        })
    }

    async fn find_element(&self, locator: &Locator) -> SwagResult<Option<ElementHandle>> {
        let state = self.open_state()?;
        Ok(Self::locate(&state, locator).map(|n| n.snapshot()))
    }

    async fn find_elements(&self, locator: &Locator) -> SwagResult<Vec<ElementHandle>> {
        let state = self.open_state()?;
        Ok(Self::render(&state)
            .iter()
            .filter(|n| n.matches(locator))
            .map(Node::snapshot)
            .collect())
    }

    async fn click(&self, locator: &Locator) -> SwagResult<()> {
        let mut state = self.open_state()?;
        let node = Self::locate(&state, locator).ok_or_else(|| SwagError::ElementNotFound {
            locator: locator.to_string(),
        })?;
        if !node.displayed {
            return Err(SwagError::NotInteractable {
                locator: locator.to_string(),
                message: "element not interactable".to_string(),
            });
        }
        if let Some(left) = state.intercepts_left.get_mut(locator) {
            if *left > 0 {
                *left -= 1;
                return Err(SwagError::ClickIntercepted {
                    locator: locator.to_string(),
                    message: "Other element would receive the click: <div class=\"bm-overlay\">"
                        .to_string(),
                });
            }
        }
        state.native_clicks += 1;
        if let Some(click) = node.on_click {
            self.apply(&mut state, click);
        }
        Ok(())
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> SwagResult<()> {
        let mut state = self.open_state()?;
        let node = Self::locate(&state, locator).ok_or_else(|| SwagError::ElementNotFound {
            locator: locator.to_string(),
        })?;
        match (node.displayed, node.field) {
            (true, Some(field)) => {
                self.type_into(&mut state, locator, field, text);
                Ok(())
            }
            _ => Err(SwagError::NotInteractable {
                locator: locator.to_string(),
                message: "element not interactable".to_string(),
            }),
        }
    }

    async fn clear(&self, locator: &Locator) -> SwagResult<()> {
        let mut state = self.open_state()?;
        let node = Self::locate(&state, locator).ok_or_else(|| SwagError::ElementNotFound {
            locator: locator.to_string(),
        })?;
        match (node.displayed, node.field) {
            (true, Some(field)) => {
                state.field_mut(field).clear();
                Ok(())
            }
            _ => Err(SwagError::NotInteractable {
                locator: locator.to_string(),
                message: "invalid element state: element must be user-editable".to_string(),
            }),
        }
    }

    async fn run_script(
        &self,
        locator: &Locator,
        action: &ScriptAction,
    ) -> SwagResult<serde_json::Value> {
        let mut state = self.open_state()?;
        let node = Self::locate(&state, locator)
            .ok_or_else(|| SwagError::script(format!("no element matches {locator}")))?;
        match action {
            ScriptAction::Click => {
                state.script_clicks += 1;
                if let Some(click) = node.on_click {
                    self.apply(&mut state, click);
                }
                Ok(serde_json::Value::Bool(true))
            }
            ScriptAction::ScrollIntoView => Ok(serde_json::Value::Bool(true)),
            ScriptAction::SetValue(text) => {
                let field = node
                    .field
                    .ok_or_else(|| SwagError::script(format!("{locator} has no value property")))?;
                *state.field_mut(field) = text.clone();
                Ok(serde_json::Value::String(text.clone()))
            }
            ScriptAction::ReadValue => Ok(node
                .value
                .map_or(serde_json::Value::Null, serde_json::Value::String)),
        }
    }

    async fn execute_script(&self, script: &str) -> SwagResult<serde_json::Value> {
        let state = self.open_state()?;
        let script = script.trim().trim_start_matches("return ").trim_end_matches(';');
        match script {
            "document.readyState" => {
                let ready_state = if state.is_ready() { "complete" } else { "interactive" };
                Ok(serde_json::Value::String(ready_state.to_string()))
            }
            "document.title" => {
                let title = if state.screen == Screen::Blank { "" } else { "Swag Labs" };
                Ok(serde_json::Value::String(title.to_string()))
            }
            "window.location.href" => Ok(serde_json::Value::String(state.url.clone())),
            "localStorage.getItem('cart-contents')" => {
                if state.cart.is_empty() {
                    Ok(serde_json::Value::Null)
                } else {
                    Ok(serde_json::Value::String(serde_json::to_string(&state.cart)?))
                }
            }
            other => Err(SwagError::script(format!(
                "simulated shop cannot evaluate {other:?}"
            ))),
        }
    }

    async fn screenshot(&self) -> SwagResult<Screenshot> {
        let screen = self.open_state()?.screen;
        Ok(Screenshot::new(Self::encode_screenshot(screen)?))
    }

    async fn capabilities(&self) -> SwagResult<serde_json::Value> {
        let _state = self.open_state()?;
        Ok(serde_json::json!({
            "browserName": self.behavior.browser_name,
            "browserVersion": "simulated",
            "platformName": std::env::consts::OS,
            "simulated": true,
        }))
    }

    async fn quit(&self) -> SwagResult<()> {
        let mut state = self.lock()?;
        if !state.closed {
            debug!("simulated session closed");
            state.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.saucedemo.com/";

    async fn logged_in(username: &str) -> SimulatedShop {
        let shop = SimulatedShop::new();
        shop.navigate(BASE).await.unwrap();
        shop.send_keys(&Locator::id("user-name"), username).await.unwrap();
        shop.send_keys(&Locator::id("password"), "secret_sauce").await.unwrap();
        shop.click(&Locator::id("login-button")).await.unwrap();
        shop
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_blank_until_navigated() {
            let shop = SimulatedShop::new();
            assert_eq!(shop.current_url().await.unwrap(), "about:blank");
            assert_eq!(shop.title().await.unwrap(), "");
            shop.navigate(BASE).await.unwrap();
            assert_eq!(shop.screen().unwrap(), Screen::Login);
            assert_eq!(shop.title().await.unwrap(), "Swag Labs");
        }

        #[tokio::test]
        async fn test_protected_page_redirects_to_login() {
            let shop = SimulatedShop::new();
            shop.navigate("https://www.saucedemo.com/inventory.html")
                .await
                .unwrap();
            assert_eq!(shop.screen().unwrap(), Screen::Login);
            let error = shop.find_element(&Locator::data_test("error")).await.unwrap().unwrap();
            assert!(error.text.contains("'/inventory.html'"));
        }

        #[tokio::test]
        async fn test_bad_urls() {
            let shop = SimulatedShop::new();
            assert!(matches!(
                shop.navigate("not a url").await,
                Err(SwagError::Navigation { .. })
            ));
            assert!(matches!(
                shop.navigate("https://www.saucedemo.com/nope.html").await,
                Err(SwagError::Navigation { .. })
            ));
        }

        #[test]
        fn test_split_url() {
            assert_eq!(
                split_url("https://www.saucedemo.com/cart.html"),
                Some(("https://www.saucedemo.com".into(), "/cart.html".into()))
            );
            assert_eq!(
                split_url("http://localhost:8080"),
                Some(("http://localhost:8080".into(), String::new()))
            );
            assert_eq!(split_url("file:///tmp/x"), None);
        }
    }

    mod login_tests {
        use super::*;

        #[tokio::test]
        async fn test_standard_user_reaches_inventory() {
            let shop = logged_in("standard_user").await;
            assert_eq!(shop.screen().unwrap(), Screen::Inventory);
            assert!(shop.current_url().await.unwrap().ends_with("/inventory.html"));
        }

        #[tokio::test]
        async fn test_locked_out_user_sees_error() {
            let shop = logged_in("locked_out_user").await;
            assert_eq!(shop.screen().unwrap(), Screen::Login);
            let error = shop.find_element(&Locator::data_test("error")).await.unwrap().unwrap();
            assert_eq!(error.text, "Epic sadface: Sorry, this user has been locked out.");
        }

        #[tokio::test]
        async fn test_empty_username_message() {
            let shop = SimulatedShop::new();
            shop.navigate(BASE).await.unwrap();
            shop.click(&Locator::id("login-button")).await.unwrap();
            let error = shop.find_element(&Locator::data_test("error")).await.unwrap().unwrap();
            assert_eq!(error.text, "Epic sadface: Username is required");
        }

        #[tokio::test(start_paused = true)]
        async fn test_performance_glitch_delays_inventory() {
            let shop = logged_in("performance_glitch_user").await;
            let container = Locator::id("inventory_container");
            assert!(!shop.find_element(&container).await.unwrap().unwrap().displayed);
            tokio::time::sleep(Duration::from_millis(2_000)).await;
            assert!(shop.find_element(&container).await.unwrap().unwrap().displayed);
        }
    }

    mod cart_tests {
        use super::*;

        #[tokio::test]
        async fn test_badge_tracks_cart_and_survives_refresh() {
            let shop = logged_in("standard_user").await;
            let badge = Locator::class_name("shopping_cart_badge");
            assert!(shop.find_element(&badge).await.unwrap().is_none());

            shop.click(&Locator::id("add-to-cart-sauce-labs-onesie")).await.unwrap();
            shop.run_script(&Locator::id("add-to-cart-sauce-labs-backpack"), &ScriptAction::Click)
                .await
                .unwrap();
            shop.refresh().await.unwrap();

            assert_eq!(shop.find_element(&badge).await.unwrap().unwrap().text, "2");
            assert_eq!(
                shop.cart().unwrap(),
                vec!["sauce-labs-onesie", "sauce-labs-backpack"]
            );
            assert!(shop
                .find_element(&Locator::id("remove-sauce-labs-onesie"))
                .await
                .unwrap()
                .is_some());
            assert_eq!(shop.click_counts().unwrap(), (2, 1));
        }

        #[tokio::test]
        async fn test_problem_user_dead_buttons() {
            let shop = logged_in("problem_user").await;
            shop.click(&Locator::id("add-to-cart-sauce-labs-fleece-jacket"))
                .await
                .unwrap();
            assert!(shop.cart().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_cart_storage_script() {
            let shop = logged_in("standard_user").await;
            shop.click(&Locator::id("add-to-cart-sauce-labs-bike-light")).await.unwrap();
            let stored = shop
                .execute_script("localStorage.getItem('cart-contents')")
                .await
                .unwrap();
            assert_eq!(stored, serde_json::json!("[\"sauce-labs-bike-light\"]"));
        }
    }

    mod checkout_tests {
        use super::*;

        #[tokio::test]
        async fn test_missing_postal_code() {
            let shop = logged_in("standard_user").await;
            shop.click(&Locator::class_name("shopping_cart_link")).await.unwrap();
            shop.click(&Locator::id("checkout")).await.unwrap();
            shop.send_keys(&Locator::id("first-name"), "Vamsi").await.unwrap();
            shop.send_keys(&Locator::id("last-name"), "Kolla").await.unwrap();
            shop.click(&Locator::id("continue")).await.unwrap();
            let error = shop.find_element(&Locator::data_test("error")).await.unwrap().unwrap();
            assert_eq!(error.text, "Error: Postal Code is required");
            assert_eq!(shop.screen().unwrap(), Screen::CheckoutInfo);
        }

        #[tokio::test]
        async fn test_error_user_last_name_ignores_keys() {
            let shop = logged_in("error_user").await;
            shop.navigate("https://www.saucedemo.com/checkout-step-one.html")
                .await
                .unwrap();
            let last = Locator::id("last-name");
            shop.send_keys(&last, "Kolla").await.unwrap();
            assert_eq!(shop.find_element(&last).await.unwrap().unwrap().value.unwrap(), "");
            shop.run_script(&last, &ScriptAction::SetValue("Kolla".into()))
                .await
                .unwrap();
            assert_eq!(shop.find_element(&last).await.unwrap().unwrap().value.unwrap(), "Kolla");
        }

        #[tokio::test]
        async fn test_overview_totals() {
            let shop = logged_in("standard_user").await;
            shop.click(&Locator::id("add-to-cart-sauce-labs-backpack")).await.unwrap();
            shop.click(&Locator::id("add-to-cart-sauce-labs-bolt-t-shirt")).await.unwrap();
            shop.navigate("https://www.saucedemo.com/checkout-step-two.html")
                .await
                .unwrap();
            let total = shop
                .find_element(&Locator::class_name("summary_total_label"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(total.text, "Total: $49.66");
        }
    }

    mod session_tests {
        use super::*;

        #[tokio::test]
        async fn test_quit_closes_session() {
            let shop = SimulatedShop::new();
            shop.quit().await.unwrap();
            shop.quit().await.unwrap();
            assert!(shop.is_closed());
            assert!(matches!(
                shop.current_url().await,
                Err(SwagError::Session { .. })
            ));
        }

        #[tokio::test]
        async fn test_screenshot_is_png() {
            let shop = SimulatedShop::new();
            shop.navigate(BASE).await.unwrap();
            let shot = shop.screenshot().await.unwrap();
            assert!(shot.is_png());
        }

        #[tokio::test]
        async fn test_css_and_name_locators() {
            let shop = SimulatedShop::new();
            shop.navigate(BASE).await.unwrap();
            for locator in [
                Locator::css("#login-button"),
                Locator::css("[data-test=\"username\"]"),
                Locator::name("password"),
                Locator::new(By::Css, Locator::id("password").to_css().unwrap()),
            ] {
                assert!(shop.find_element(&locator).await.unwrap().is_some(), "{locator}");
            }
            assert!(shop
                .find_element(&Locator::xpath("//input"))
                .await
                .unwrap()
                .is_none());
        }
    }
}
