//! Chromium backend for the browser capability (`chromium` feature).
//!
//! Form interaction goes through small DOM snippets evaluated in the page,
//! which keeps "selector matched nothing" distinguishable from protocol
//! errors.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Elements considered when scanning for a submit button by caption.
const BUTTON_LIKE: &str = "button, input[type=submit], input[type=button], a.btn, [role=button]";

fn protocol(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

/// Quote a value as a JavaScript string literal.
fn js_string(value: &str) -> Result<String, BrowserError> {
    serde_json::to_string(value).map_err(protocol)
}

/// Launches a fresh headless Chromium per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    /// Show the browser window; useful when adjusting selectors.
    pub headful: bool,
    /// Explicit executable; otherwise chromiumoxide searches the usual paths.
    pub executable: Option<String>,
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = BrowserConfig::builder();
        if self.headful {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(protocol)?;

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
        }))
    }
}

/// One Chromium process with a single page.
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    async fn eval_bool(&self, script: String) -> Result<bool, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(protocol)?
            .into_value::<bool>()
            .map_err(protocol)
    }

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        self.eval_bool(format!(
            "document.querySelector({}) !== null",
            js_string(selector)?
        ))
        .await
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation(e.to_string()))
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        if !self.exists(selector).await? {
            return Ok(false);
        }
        let element = self.page.find_element(selector).await.map_err(protocol)?;
        element.click().await.map_err(protocol)?;
        Ok(true)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        if !self.exists(selector).await? {
            return Ok(false);
        }
        let element = self.page.find_element(selector).await.map_err(protocol)?;
        element.click().await.map_err(protocol)?;
        element.type_str(value).await.map_err(protocol)?;
        Ok(true)
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        self.eval_bool(format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.value = {val}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            sel = js_string(selector)?,
            val = js_string(value)?,
        ))
        .await
    }

    async fn click_button_with_text(&self, text: &str) -> Result<bool, BrowserError> {
        self.eval_bool(format!(
            "(() => {{ const needle = {text}.toLowerCase(); \
             for (const el of document.querySelectorAll({scope})) {{ \
               const caption = (el.innerText || el.value || '').toLowerCase(); \
               if (caption.includes(needle)) {{ el.click(); return true; }} \
             }} return false; }})()",
            text = js_string(text)?,
            scope = js_string(BUTTON_LIKE)?,
        ))
        .await
    }

    async fn wait_for_navigation(&self) -> Result<(), BrowserError> {
        self.page
            .wait_for_navigation()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation(e.to_string()))
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), BrowserError> {
        loop {
            if self.exists(selector).await? {
                return Ok(());
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page.content().await.map_err(protocol)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Err(BrowserError::Closed);
        };
        let result = browser.close().await.map(|_| ()).map_err(protocol);
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "chromium process wait failed");
        }
        self.handler_task.abort();
        result
    }

    fn abort(&self) {
        // Dropping the Browser kills the child process.
        if let Ok(mut slot) = self.browser.try_lock() {
            slot.take();
        }
        self.handler_task.abort();
    }
}
