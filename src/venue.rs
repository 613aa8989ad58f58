//! Venue availability page: slot discovery and the claim sequence.
//!
//! The reservation site's DOM is an uncontrolled external document, so the
//! string-matched querying lives behind a narrow trait pair. The booking loop
//! only ever sees `VenuePage`/`SlotCandidate`; the chromiumoxide-backed
//! implementation and its selectors are the fragile part that changes when
//! the site does.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::element::Element;
use thiserror::Error;
use tracing::debug;

use crate::utils;
use crate::utils::constants::{
    CONFIRM_BUTTON_SELECTOR, CONFIRM_FRAME_SELECTOR, CONFIRM_SETTLE_DELAY, ELEMENT_TIMEOUT,
    NOTIFY_LABEL_FRAGMENT, SLOT_BUTTON_SELECTOR,
};

/// A single candidate's claim sequence failed. Always recoverable: the loop
/// moves to the next candidate or the next pass.
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("slot discovery failed: {0}")]
    Discovery(String),

    #[error("click rejected for slot '{label}': {reason}")]
    Click { label: String, reason: String },

    #[error("confirmation frame did not appear: {0}")]
    FrameMissing(String),

    #[error("confirm control missing or unclickable: {0}")]
    ConfirmFailed(String),
}

/// A bookable time offering rendered on the venue page.
pub trait SlotCandidate: Send + Sync {
    /// Displayed time label, diagnostic only.
    fn label(&self) -> &str;

    /// Waitlist/alert signup rather than an immediately bookable slot.
    fn is_notify_only(&self) -> bool;
}

/// The availability page as the booking loop sees it. Slots are rediscovered
/// every poll because the page may re-render at any time.
#[async_trait]
pub trait VenuePage: Send + Sync {
    type Slot: SlotCandidate;

    async fn poll_slots(&self) -> Result<Vec<Self::Slot>, ClaimError>;

    async fn claim(&self, slot: &Self::Slot) -> Result<(), ClaimError>;
}

pub(crate) fn is_notify_label(label: &str) -> bool {
    label.to_ascii_lowercase().contains(NOTIFY_LABEL_FRAGMENT)
}

/// Slot backed by a live DOM element. The handle goes stale whenever the
/// page re-renders, which is why slots never outlive a poll pass.
pub struct BookableSlot {
    element: Element,
    label: String,
    notify_only: bool,
}

impl SlotCandidate for BookableSlot {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_notify_only(&self) -> bool {
        self.notify_only
    }
}

/// Chromiumoxide-backed venue page.
pub struct LiveVenuePage {
    page: Page,
}

impl LiveVenuePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Click the confirm control inside the booking iframe.
    ///
    /// The widget renders in its own iframe, so the click has to cross into
    /// the frame's document; the browser is launched with frame isolation
    /// relaxed to allow this.
    async fn click_confirm_in_frame(&self) -> Result<(), ClaimError> {
        let script = format!(
            r#"(() => {{
                const frame = document.querySelector("{CONFIRM_FRAME_SELECTOR}");
                if (!frame || !frame.contentDocument) {{ return "no-frame"; }}
                const button = frame.contentDocument.querySelector("{CONFIRM_BUTTON_SELECTOR}");
                if (!button) {{ return "no-button"; }}
                button.click();
                return "clicked";
            }})()"#
        );

        let result: String = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ClaimError::ConfirmFailed(e.to_string()))?
            .into_value()
            .map_err(|e| ClaimError::ConfirmFailed(e.to_string()))?;

        match result.as_str() {
            "clicked" => Ok(()),
            "no-frame" => Err(ClaimError::ConfirmFailed(
                "confirmation frame document not reachable".into(),
            )),
            other => Err(ClaimError::ConfirmFailed(format!(
                "confirm button not found ({other})"
            ))),
        }
    }
}

#[async_trait]
impl VenuePage for LiveVenuePage {
    type Slot = BookableSlot;

    async fn poll_slots(&self) -> Result<Vec<Self::Slot>, ClaimError> {
        let elements = self
            .page
            .find_elements(SLOT_BUTTON_SELECTOR)
            .await
            .map_err(|e| ClaimError::Discovery(e.to_string()))?;

        let mut slots = Vec::with_capacity(elements.len());
        for element in elements {
            let raw = element.inner_text().await.ok().flatten().unwrap_or_default();
            // Button labels render time and room on separate lines.
            let label = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            let notify_only = is_notify_label(&label);
            slots.push(BookableSlot {
                element,
                label,
                notify_only,
            });
        }

        debug!(count = slots.len(), "discovered slot candidates");
        Ok(slots)
    }

    async fn claim(&self, slot: &Self::Slot) -> Result<(), ClaimError> {
        utils::click_element(&self.page, &slot.element)
            .await
            .map_err(|e| ClaimError::Click {
                label: slot.label.clone(),
                reason: e.to_string(),
            })?;

        tokio::time::sleep(CONFIRM_SETTLE_DELAY).await;

        utils::wait_for_element(&self.page, CONFIRM_FRAME_SELECTOR, ELEMENT_TIMEOUT)
            .await
            .map_err(|e| ClaimError::FrameMissing(e.to_string()))?;

        tokio::time::sleep(CONFIRM_SETTLE_DELAY).await;

        self.click_confirm_in_frame().await
    }
}
