//! Locators: an immutable (strategy, selector) pair identifying DOM nodes.
//!
//! A locator may match zero or more elements; every consumer uses the first
//! match. Locators render either to a CSS selector (for native CDP element
//! lookup) or to a JavaScript expression (for script-injected actions).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Location strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum By {
    /// `id` attribute
    Id,
    /// A single class name
    ClassName,
    /// Raw CSS selector
    Css,
    /// XPath expression
    XPath,
    /// `name` attribute
    Name,
    /// Tag name
    TagName,
    /// `data-test` attribute (the demo shop's test hooks)
    DataTest,
}

impl By {
    /// Strategy name as used in diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ClassName => "class name",
            Self::Css => "css selector",
            Self::XPath => "xpath",
            Self::Name => "name",
            Self::TagName => "tag name",
            Self::DataTest => "data-test",
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locator for finding elements.
///
/// The `const` constructors allow locator tables to live in `static` items;
/// [`Locator::new`] builds locators for selectors computed at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    by: By,
    selector: Cow<'static, str>,
}

impl Locator {
    /// Create a locator from a strategy and an owned or borrowed selector
    #[must_use]
    pub fn new(by: By, selector: impl Into<Cow<'static, str>>) -> Self {
        Self {
            by,
            selector: selector.into(),
        }
    }

    /// Locate by `id`
    #[must_use]
    pub const fn id(id: &'static str) -> Self {
        Self {
            by: By::Id,
            selector: Cow::Borrowed(id),
        }
    }

    /// Locate by class name
    #[must_use]
    pub const fn class_name(class: &'static str) -> Self {
        Self {
            by: By::ClassName,
            selector: Cow::Borrowed(class),
        }
    }

    /// Locate by CSS selector
    #[must_use]
    pub const fn css(css: &'static str) -> Self {
        Self {
            by: By::Css,
            selector: Cow::Borrowed(css),
        }
    }

    /// Locate by XPath
    #[must_use]
    pub const fn xpath(xpath: &'static str) -> Self {
        Self {
            by: By::XPath,
            selector: Cow::Borrowed(xpath),
        }
    }

    /// Locate by `name` attribute
    #[must_use]
    pub const fn name(name: &'static str) -> Self {
        Self {
            by: By::Name,
            selector: Cow::Borrowed(name),
        }
    }

    /// Locate by tag name
    #[must_use]
    pub const fn tag(tag: &'static str) -> Self {
        Self {
            by: By::TagName,
            selector: Cow::Borrowed(tag),
        }
    }

    /// Locate by `data-test` attribute
    #[must_use]
    pub const fn data_test(value: &'static str) -> Self {
        Self {
            by: By::DataTest,
            selector: Cow::Borrowed(value),
        }
    }

    /// Strategy
    #[must_use]
    pub const fn by(&self) -> By {
        self.by
    }

    /// Raw selector text
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Equivalent CSS selector, if the strategy has one
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        let s = self.selector();
        match self.by {
            By::Id => Some(format!("[id={}]", css_string(s))),
            By::ClassName => Some(format!(".{s}")),
            By::Css => Some(s.to_string()),
            By::Name => Some(format!("[name={}]", css_string(s))),
            By::TagName => Some(s.to_string()),
            By::DataTest => Some(format!("[data-test={}]", css_string(s))),
            By::XPath => None,
        }
    }

    /// JavaScript expression evaluating to the first match or `null`
    #[must_use]
    pub fn to_js(&self) -> String {
        match self.by {
            By::Id => format!("document.getElementById({})", js_string(self.selector())),
            By::XPath => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(self.selector())
            ),
            _ => format!(
                "document.querySelector({})",
                js_string(&self.to_css().unwrap_or_default())
            ),
        }
    }

    /// JavaScript expression evaluating to an array of all matches
    #[must_use]
    pub fn to_js_all(&self) -> String {
        match self.by {
            By::XPath => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
                js_string(self.selector())
            ),
            _ => format!(
                "Array.from(document.querySelectorAll({}))",
                js_string(&self.to_css().unwrap_or_default())
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.by, self.selector())
    }
}

/// Quote a value for use inside a CSS attribute selector
fn css_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Quote a value as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod css_tests {
        use super::*;

        #[test]
        fn test_id_uses_attribute_selector() {
            let loc = Locator::id("add-to-cart-test.allthethings()-t-shirt-(red)");
            assert_eq!(
                loc.to_css().unwrap(),
                "[id=\"add-to-cart-test.allthethings()-t-shirt-(red)\"]"
            );
        }

        #[test]
        fn test_class_name() {
            assert_eq!(
                Locator::class_name("shopping_cart_badge").to_css().unwrap(),
                ".shopping_cart_badge"
            );
        }

        #[test]
        fn test_data_test() {
            assert_eq!(
                Locator::data_test("error").to_css().unwrap(),
                "[data-test=\"error\"]"
            );
        }

        #[test]
        fn test_xpath_has_no_css() {
            assert!(Locator::xpath("//button").to_css().is_none());
        }

        #[test]
        fn test_quotes_are_escaped() {
            let loc = Locator::new(By::Name, "say \"hi\"");
            assert_eq!(loc.to_css().unwrap(), "[name=\"say \\\"hi\\\"\"]");
        }
    }

    mod js_tests {
        use super::*;

        #[test]
        fn test_id_query() {
            assert_eq!(
                Locator::id("user-name").to_js(),
                "document.getElementById(\"user-name\")"
            );
        }

        #[test]
        fn test_class_query() {
            assert_eq!(
                Locator::class_name("title").to_js(),
                "document.querySelector(\".title\")"
            );
        }

        #[test]
        fn test_xpath_query() {
            let js = Locator::xpath("//div[@id='x']").to_js();
            assert!(js.starts_with("document.evaluate(\"//div[@id='x']\""));
            assert!(js.contains("FIRST_ORDERED_NODE_TYPE"));
        }

        #[test]
        fn test_query_all() {
            assert_eq!(
                Locator::class_name("cart_item").to_js_all(),
                "Array.from(document.querySelectorAll(\".cart_item\"))"
            );
            assert!(Locator::xpath("//li").to_js_all().contains("snapshotItem"));
        }
    }

    #[test]
    fn test_dynamic_locator_equals_static() {
        let product = "sauce-labs-onesie";
        let dynamic = Locator::new(By::Id, format!("remove-{product}"));
        assert_eq!(dynamic.selector(), "remove-sauce-labs-onesie");
        assert_eq!(Locator::id("checkout"), Locator::new(By::Id, "checkout"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::id("finish").to_string(), "id \"finish\"");
        assert_eq!(
            Locator::class_name("title").to_string(),
            "class name \"title\""
        );
    }
}
