//! BrowserDriver - abstract browser-automation seam
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BrowserDriver (async trait)                                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐        ┌──────────────────────────┐    │
//! │  │  ChromiumDriver      │        │  SimulatedShop           │    │
//! │  │  (feature `browser`) │        │  (in-memory demo shop)   │    │
//! │  │  CDP via chromiumoxide│       │  tests and --simulate    │    │
//! │  └──────────────────────┘        └──────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Element lookups return an [`ElementHandle`] snapshot rather than a live
//! reference; every interaction re-resolves its locator. Script injection is
//! expressed as a typed [`ScriptAction`] so that both implementations agree on
//! what a "script click" or "script value assignment" means.

use crate::locator::{js_string, Locator};
use crate::result::SwagResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Point-in-time view of a DOM element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Lower-case tag name
    pub tag_name: String,
    /// Rendered text content
    pub text: String,
    /// `value` property for form controls
    pub value: Option<String>,
    /// Whether the element is rendered and visible
    pub displayed: bool,
    /// Whether the element accepts interaction
    pub enabled: bool,
}

impl ElementHandle {
    /// Create a visible, enabled element snapshot
    #[must_use]
    pub fn new(tag_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            text: text.into(),
            value: None,
            displayed: true,
            enabled: true,
        }
    }

    /// Set the form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Visible and enabled
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when screenshot was taken
    pub timestamp: std::time::SystemTime,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            timestamp: std::time::SystemTime::now(),
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check for the PNG signature
    #[must_use]
    pub fn is_png(&self) -> bool {
        self.data.starts_with(&[0x89, b'P', b'N', b'G'])
    }
}

/// Script-injected operations on a located element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptAction {
    /// `element.click()` bypassing hit-testing
    Click,
    /// `element.scrollIntoView(true)`
    ScrollIntoView,
    /// Assign `value` and dispatch `input` and `change` events
    SetValue(String),
    /// Return `element.value`
    ReadValue,
}

impl ScriptAction {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "script click",
            Self::ScrollIntoView => "scroll into view",
            Self::SetValue(_) => "script set value",
            Self::ReadValue => "script read value",
        }
    }

    /// Render as a self-contained JavaScript expression against `locator`.
    ///
    /// The expression throws when nothing matches, so drivers surface a
    /// script error instead of silently acting on `null`.
    #[must_use]
    pub fn to_js(&self, locator: &Locator) -> String {
        let body = match self {
            Self::Click => "el.click(); return true;".to_string(),
            Self::ScrollIntoView => "el.scrollIntoView(true); return true;".to_string(),
            Self::SetValue(text) => format!(
                "el.value = {}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return el.value;",
                js_string(text)
            ),
            Self::ReadValue => "return el.value === undefined ? null : el.value;".to_string(),
        };
        format!(
            "(() => {{ const el = {}; if (!el) {{ throw new Error('no element matches ' + {}); }} {} }})()",
            locator.to_js(),
            js_string(&locator.to_string()),
            body
        )
    }
}

/// Abstract browser automation driver.
///
/// All methods take `&self`; implementations synchronise internally so page
/// objects can share one driver reference for the lifetime of a test.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> SwagResult<()>;

    /// Reload the current page
    async fn refresh(&self) -> SwagResult<()>;

    /// Current URL
    async fn current_url(&self) -> SwagResult<String>;

    /// Document title
    async fn title(&self) -> SwagResult<String>;

    /// First element matching the locator, if any
    async fn find_element(&self, locator: &Locator) -> SwagResult<Option<ElementHandle>>;

    /// All elements matching the locator
    async fn find_elements(&self, locator: &Locator) -> SwagResult<Vec<ElementHandle>>;

    /// Native (pointer) click
    async fn click(&self, locator: &Locator) -> SwagResult<()>;

    /// Native keyboard input appended to the current value
    async fn send_keys(&self, locator: &Locator, text: &str) -> SwagResult<()>;

    /// Clear a form control
    async fn clear(&self, locator: &Locator) -> SwagResult<()>;

    /// Run a typed script action against a located element
    async fn run_script(
        &self,
        locator: &Locator,
        action: &ScriptAction,
    ) -> SwagResult<serde_json::Value>;

    /// Evaluate an arbitrary JavaScript expression
    async fn execute_script(&self, script: &str) -> SwagResult<serde_json::Value>;

    /// Capture a PNG of the viewport
    async fn screenshot(&self) -> SwagResult<Screenshot>;

    /// Session capabilities (browser name, version, ...)
    async fn capabilities(&self) -> SwagResult<serde_json::Value>;

    /// End the session
    async fn quit(&self) -> SwagResult<()>;
}

#[async_trait]
impl<T: BrowserDriver + ?Sized> BrowserDriver for std::sync::Arc<T> {
    async fn navigate(&self, url: &str) -> SwagResult<()> {
        (**self).navigate(url).await
    }

    async fn refresh(&self) -> SwagResult<()> {
        (**self).refresh().await
    }

    async fn current_url(&self) -> SwagResult<String> {
        (**self).current_url().await
    }

    async fn title(&self) -> SwagResult<String> {
        (**self).title().await
    }

    async fn find_element(&self, locator: &Locator) -> SwagResult<Option<ElementHandle>> {
        (**self).find_element(locator).await
    }

    async fn find_elements(&self, locator: &Locator) -> SwagResult<Vec<ElementHandle>> {
        (**self).find_elements(locator).await
    }

    async fn click(&self, locator: &Locator) -> SwagResult<()> {
        (**self).click(locator).await
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> SwagResult<()> {
        (**self).send_keys(locator, text).await
    }

    async fn clear(&self, locator: &Locator) -> SwagResult<()> {
        (**self).clear(locator).await
    }

    async fn run_script(
        &self,
        locator: &Locator,
        action: &ScriptAction,
    ) -> SwagResult<serde_json::Value> {
        (**self).run_script(locator, action).await
    }

    async fn execute_script(&self, script: &str) -> SwagResult<serde_json::Value> {
        (**self).execute_script(script).await
    }

    async fn screenshot(&self) -> SwagResult<Screenshot> {
        (**self).screenshot().await
    }

    async fn capabilities(&self) -> SwagResult<serde_json::Value> {
        (**self).capabilities().await
    }

    async fn quit(&self) -> SwagResult<()> {
        (**self).quit().await
    }
}

/// Browser name from a capabilities document, lower-cased
#[must_use]
pub fn browser_name(capabilities: &serde_json::Value) -> String {
    capabilities
        .get("browserName")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}
