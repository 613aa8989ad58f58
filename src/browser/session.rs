//! Single-shot browser session.
//!
//! The program makes exactly one booking attempt with one browser, so the
//! session is owned directly by `main` rather than lazily managed behind a
//! shared handle. Shutdown order matters: close the browser, wait for the
//! process to exit, abort the handler task, then remove the profile
//! directory — Chrome must release its file handles before the removal.

use std::path::PathBuf;

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{BrowserError, BrowserResult};
use crate::browser_setup;

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Launch a browser and wrap it in a session.
    pub async fn launch(headless: bool) -> BrowserResult<Self> {
        let (browser, handler, user_data_dir) = browser_setup::launch_browser(headless)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        })
    }

    /// Open a blank page. The whole run drives this single page.
    pub async fn new_page(&self) -> BrowserResult<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))
    }

    /// Close the browser, wait for the process to exit, and clean up.
    ///
    /// Both `close()` and `wait()` are required: drop alone only aborts the
    /// handler task and leaves the Chrome process as a zombie.
    pub async fn shutdown(mut self) {
        info!("shutting down browser");

        if let Err(e) = self.browser.close().await {
            warn!("failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("failed to wait for browser exit: {}", e);
        }

        self.handler.abort();

        if let Some(path) = self.user_data_dir.take() {
            info!("cleaning up temp profile: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "failed to remove temp profile {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Last-resort cleanup for early-error paths. Browser::drop kills the
        // Chrome process; we only need to stop the handler task.
        self.handler.abort();
        if let Some(path) = self.user_data_dir.as_ref() {
            warn!(
                "session dropped without shutdown; temp profile may be orphaned: {}",
                path.display()
            );
        }
    }
}
