//! Real browser control over the Chrome DevTools Protocol.
//!
//! Chrome, Chromium and Edge are launched (or reached through a remote
//! `ws://` endpoint) with chromiumoxide. Element snapshots and every
//! [`ScriptAction`] go through `Runtime.evaluate`; native clicks and typing use
//! chromiumoxide's input emulation, which dispatches real pointer and key
//! events at the element's position.

use crate::driver::{BrowserDriver, ElementHandle, ScriptAction, Screenshot};
use crate::locator::Locator;
use crate::result::{SwagError, SwagResult};
use crate::session::{BrowserKind, DriverFactory, SessionConfig};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Serialises one element the way [`ElementHandle`] expects it
const SNAPSHOT_FN: &str = "(el) => el ? ({ \
    tag_name: el.tagName.toLowerCase(), \
    text: (el.innerText || '').trim(), \
    value: ('value' in el && el.value !== undefined) ? String(el.value) : null, \
    displayed: !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length) \
        && getComputedStyle(el).visibility !== 'hidden', \
    enabled: !el.disabled \
}) : null";

/// [`BrowserDriver`] over a chromiumoxide page
#[derive(Debug)]
pub struct ChromiumDriver {
    kind: BrowserKind,
    browser: Arc<Mutex<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    closed: AtomicBool,
}

impl ChromiumDriver {
    /// Launch a local browser, or connect to `config.remote`
    ///
    /// # Errors
    ///
    /// [`SwagError::BrowserLaunch`] when the browser cannot be started or
    /// reached.
    pub async fn launch(config: &SessionConfig, user_data_dir: &Path) -> SwagResult<Self> {
        let (browser, mut handler) = match config.remote {
            Some(ref endpoint) => {
                debug!(%endpoint, "connecting to remote browser");
                Browser::connect(endpoint.as_str()).await.map_err(launch_error)?
            }
            None => Browser::launch(Self::browser_config(config, user_data_dir)?)
                .await
                .map_err(launch_error)?,
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(launch_error)?;

        Ok(Self {
            kind: config.browser,
            browser: Arc::new(Mutex::new(browser)),
            page,
            handler,
            closed: AtomicBool::new(false),
        })
    }

    fn browser_config(config: &SessionConfig, user_data_dir: &Path) -> SwagResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .user_data_dir(user_data_dir)
            .args(config.args.iter().map(String::as_str));

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        let executable = config
            .executable
            .clone()
            .or_else(|| config.browser.find_executable());
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|message| SwagError::BrowserLaunch { message })
    }

    fn ensure_open(&self) -> SwagResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SwagError::session("invalid session id: browser has been closed"));
        }
        Ok(())
    }

    async fn evaluate(&self, script: String) -> SwagResult<serde_json::Value> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SwagError::script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn element(&self, locator: &Locator) -> SwagResult<Element> {
        self.ensure_open()?;
        let css = locator.to_css().ok_or_else(|| SwagError::NotInteractable {
            locator: locator.to_string(),
            message: "locator has no CSS form for native input".into(),
        })?;
        self.page
            .find_element(css)
            .await
            .map_err(|_| SwagError::ElementNotFound {
                locator: locator.to_string(),
            })
    }
}

fn launch_error(e: impl std::fmt::Display) -> SwagError {
    SwagError::BrowserLaunch {
        message: e.to_string(),
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> SwagResult<()> {
        self.ensure_open()?;
        self.page
            .goto(url)
            .await
            .map_err(|e| SwagError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn refresh(&self) -> SwagResult<()> {
        self.ensure_open()?;
        self.page
            .reload()
            .await
            .map_err(|e| SwagError::Navigation {
                url: "(reload)".into(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> SwagResult<String> {
        self.ensure_open()?;
        let url = self
            .page
            .url()
            .await
            .map_err(|e| SwagError::session(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> SwagResult<String> {
        self.ensure_open()?;
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| SwagError::session(e.to_string()))?;
        Ok(title.unwrap_or_default())
    }

    async fn find_element(&self, locator: &Locator) -> SwagResult<Option<ElementHandle>> {
        let value = self
            .evaluate(format!("({SNAPSHOT_FN})({})", locator.to_js()))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn find_elements(&self, locator: &Locator) -> SwagResult<Vec<ElementHandle>> {
        let value = self
            .evaluate(format!(
                "Array.from({}).map({SNAPSHOT_FN})",
                locator.to_js_all()
            ))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&self, locator: &Locator) -> SwagResult<()> {
        let element = self.element(locator).await?;
        element
            .click()
            .await
            .map_err(|e| SwagError::ClickIntercepted {
                locator: locator.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> SwagResult<()> {
        let element = self.element(locator).await?;
        let not_interactable = |e: chromiumoxide::error::CdpError| SwagError::NotInteractable {
            locator: locator.to_string(),
            message: e.to_string(),
        };
        element.focus().await.map_err(not_interactable)?;
        element.type_str(text).await.map_err(not_interactable)?;
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> SwagResult<()> {
        self.run_script(locator, &ScriptAction::SetValue(String::new()))
            .await
            .map(|_| ())
    }

    async fn run_script(
        &self,
        locator: &Locator,
        action: &ScriptAction,
    ) -> SwagResult<serde_json::Value> {
        self.evaluate(action.to_js(locator)).await
    }

    async fn execute_script(&self, script: &str) -> SwagResult<serde_json::Value> {
        self.evaluate(script.to_string()).await
    }

    async fn screenshot(&self) -> SwagResult<Screenshot> {
        self.ensure_open()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let data = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| SwagError::Screenshot {
                message: e.to_string(),
            })?;
        Ok(Screenshot::new(data))
    }

    async fn capabilities(&self) -> SwagResult<serde_json::Value> {
        self.ensure_open()?;
        let version = self
            .browser
            .lock()
            .await
            .version()
            .await
            .map_err(|e| SwagError::session(e.to_string()))?;
        let browser_version = version
            .product
            .split_once('/')
            .map_or(version.product.as_str(), |(_, v)| v)
            .to_string();
        Ok(serde_json::json!({
            "browserName": self.kind.name(),
            "browserVersion": browser_version,
            "product": version.product,
            "userAgent": version.user_agent,
            "protocolVersion": version.protocol_version,
            "platformName": std::env::consts::OS,
        }))
    }

    async fn quit(&self) -> SwagResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map_err(|e| SwagError::session(e.to_string()));
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// Factory launching [`ChromiumDriver`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumFactory;

#[async_trait]
impl DriverFactory for ChromiumFactory {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(
        &self,
        config: &SessionConfig,
        user_data_dir: &Path,
    ) -> SwagResult<Box<dyn BrowserDriver>> {
        Ok(Box::new(ChromiumDriver::launch(config, user_data_dir).await?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_fn_fields_match_element_handle() {
        for field in ["tag_name", "text", "value", "displayed", "enabled"] {
            assert!(SNAPSHOT_FN.contains(field), "{field}");
        }
        let parsed: ElementHandle = serde_json::from_value(serde_json::json!({
            "tag_name": "input",
            "text": "",
            "value": "T6H5J3",
            "displayed": true,
            "enabled": true,
        }))
        .unwrap();
        assert_eq!(parsed.value.as_deref(), Some("T6H5J3"));
    }

    #[tokio::test]
    #[ignore = "requires a local chrome installation"]
    async fn test_live_title() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::default().for_ci();
        let driver = ChromiumDriver::launch(&config, dir.path()).await.unwrap();
        driver.navigate("https://www.saucedemo.com/").await.unwrap();
        assert_eq!(driver.title().await.unwrap(), "Swag Labs");
        driver.quit().await.unwrap();
    }
}
