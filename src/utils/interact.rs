//! Low-level page interaction helpers shared by the login flow and the
//! slot claim sequence.

use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::element::Element;

use super::wait_for_element;

/// Click an element via its clickable point.
///
/// Scrolls into view first, then dispatches a real mouse click on the page
/// rather than element.click(), which can hang on IntersectionObserver.
pub async fn click_element(page: &Page, element: &Element) -> Result<()> {
    element
        .scroll_into_view()
        .await
        .context("failed to scroll element into view")?;

    let point = element
        .clickable_point()
        .await
        .context("element has no clickable point; it may not be visible")?;

    page.click(point).await.context("click was rejected")?;
    Ok(())
}

/// Wait for `selector` and click it.
pub async fn click_selector(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    let element = wait_for_element(page, selector, timeout).await?;
    click_element(page, &element)
        .await
        .with_context(|| format!("click failed for '{selector}'"))
}

/// Wait for an input field, focus it, clear it, and type `text`.
pub async fn type_into(page: &Page, selector: &str, text: &str, timeout: Duration) -> Result<()> {
    let element = wait_for_element(page, selector, timeout).await?;

    // Click to focus before typing.
    click_element(page, &element)
        .await
        .with_context(|| format!("could not focus '{selector}'"))?;

    element
        .call_js_fn("function() { this.value = ''; }", false)
        .await
        .with_context(|| format!("could not clear '{selector}'"))?;

    element
        .type_str(text)
        .await
        .with_context(|| format!("typing into '{selector}' failed"))?;

    Ok(())
}
