//! Element polling with exponential backoff.
//!
//! The reservation site renders its availability list via JavaScript well
//! after the page load event fires, so a single `find_element` call right
//! after navigation routinely misses.

use std::time::Duration;

use anyhow::{Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::element::Element;

/// Poll for an element until it appears or `timeout` elapses.
///
/// Starts at 100ms between probes, doubling up to a 1 second cap.
pub async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let start = std::time::Instant::now();
    let mut poll_interval = Duration::from_millis(100);
    let max_interval = Duration::from_secs(1);

    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }

        if start.elapsed() >= timeout {
            return Err(anyhow!(
                "element not found after {}ms: '{}'",
                timeout.as_millis(),
                selector
            ));
        }

        tokio::time::sleep(poll_interval).await;
        poll_interval = (poll_interval * 2).min(max_interval);
    }
}
