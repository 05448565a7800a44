//! Headless-browser capability.
//!
//! The registry provider only needs to "render a page and query its DOM",
//! so the browser is modelled as two traits. A Chromium backend lives in
//! [`crate::chromium`] behind the `chromium` feature; tests drive the
//! provider with scripted sessions.

use async_trait::async_trait;
use credence_core::ProviderFailure;
use thiserror::Error;

/// Errors raised by a browser backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("browser session already closed")]
    Closed,
}

impl From<BrowserError> for ProviderFailure {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Launch(_) => ProviderFailure::unavailable(e.to_string()),
            _ => ProviderFailure::transport(e.to_string()),
        }
    }
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One open page.
///
/// Interaction methods return `Ok(false)` when the selector (or button text)
/// matches nothing, so callers can walk ordered fallback lists.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<bool, BrowserError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<bool, BrowserError>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<bool, BrowserError>;

    /// Scan every button-like element and click the first whose visible
    /// text contains `text`.
    async fn click_button_with_text(&self, text: &str) -> Result<bool, BrowserError>;

    /// Resolves when the current page finishes a navigation.
    async fn wait_for_navigation(&self) -> Result<(), BrowserError>;

    /// Resolves once an element matching `selector` exists. Never times
    /// out on its own; callers bound it.
    async fn wait_for_selector(&self, selector: &str) -> Result<(), BrowserError>;

    /// Rendered HTML of the current page.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Graceful shutdown.
    async fn close(&self) -> Result<(), BrowserError>;

    /// Synchronous teardown for paths that cannot await (drop, cancellation).
    fn abort(&self);
}

/// Scoped ownership of a [`BrowserSession`].
///
/// [`SessionGuard::release`] closes the session on the normal path. A guard
/// dropped without release (the owning future was cancelled or timed out,
/// or a panic unwound through it) aborts the session instead.
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    /// Close the session gracefully.
    pub async fn release(mut self) -> Result<(), BrowserError> {
        let result = self.session.close().await;
        self.released = true;
        result
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!("browser session dropped without release, aborting");
            self.session.abort();
        }
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("released", &self.released)
            .finish()
    }
}
