//! Browser session abstraction and bounded session pool
//!
//! All page I/O goes through the [`BrowserSession`] trait so that the
//! pool, dispatcher, and scheduler never depend on a concrete automation
//! backend. Production uses WebDriver sessions; tests use scripted mocks.

mod pool;
mod webdriver;

pub use pool::{PooledSession, SessionPool};
pub use webdriver::{WebDriverFactory, WebDriverSession};

use crate::SessionResult;
use async_trait::async_trait;
use std::time::Duration;

/// One headless browser automation session
///
/// The unit of pooled, reusable browser capacity. A session that returns
/// an error from any command is considered crashed; callers must destroy
/// it rather than return it to the pool.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates the session to the given URL
    async fn goto(&mut self, url: &str) -> SessionResult<()>;

    /// Waits until an element matching `selector` is present
    ///
    /// Returns `Ok(true)` if the markup appeared within `timeout`, and
    /// `Ok(false)` on a plain timeout with the session still usable.
    /// Session-level failures return `Err`.
    async fn wait_for_markup(&mut self, selector: &str, timeout: Duration) -> SessionResult<bool>;

    /// Returns the current page source
    async fn page_source(&mut self) -> SessionResult<String>;

    /// Probes whether the underlying browser process still responds
    ///
    /// The pool calls this before handing a pooled session out, so a dead
    /// process is detected up front rather than on the first failed
    /// navigation.
    async fn is_alive(&mut self) -> bool;

    /// Tears the session down, releasing the browser process
    async fn close(self: Box<Self>);
}

/// Creates new browser sessions on demand
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> SessionResult<Box<dyn BrowserSession>>;
}
