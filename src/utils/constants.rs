//! Shared constants: user agent, page selectors, and fixed delays.
//!
//! Every selector the program matches against the reservation site lives
//! here. The site's DOM is an uncontrolled external document; when it
//! changes, this file is the only thing that should need to change.

use std::time::Duration;

/// Chrome user agent string for stealth mode
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Chrome releases new stable versions ~every 4 weeks.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

// Login flow selectors
pub const LOGIN_BUTTON_SELECTOR: &str = "button[data-test-id='menu_container-button-log_in']";
pub const EMAIL_METHOD_SELECTOR: &str = "div.AuthView__Footer button";
pub const EMAIL_INPUT_SELECTOR: &str = "input[name='email']";
pub const PASSWORD_INPUT_SELECTOR: &str = "input[name='password']";
pub const LOGIN_SUBMIT_SELECTOR: &str = "form button[type='submit']";

// Venue page selectors
pub const SLOT_BUTTON_SELECTOR: &str = "div.ReservationButtonList button.ReservationButton";
pub const CONFIRM_FRAME_SELECTOR: &str = "iframe[title='Resy - Book Now']";
pub const CONFIRM_BUTTON_SELECTOR: &str = "button.Button--double-confirm";

/// Label fragment marking a waitlist/alert affordance rather than a bookable
/// slot (matched case-insensitively).
pub const NOTIFY_LABEL_FRAGMENT: &str = "notify";

/// Settle delay after each login step. The site renders asynchronously and
/// the login flow uses fixed delays rather than wait-for-condition.
pub const LOGIN_STEP_DELAY: Duration = Duration::from_secs(2);

/// How long to wait for an interactive element to appear before giving up.
pub const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between clicking a slot and looking for the confirmation iframe,
/// and again between finding the iframe and clicking confirm inside it.
pub const CONFIRM_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Delay between poll passes when no slot was claimed.
pub const PASS_DELAY: Duration = Duration::from_secs(1);

/// A pass counter above this value terminates the loop, i.e. 11 full passes.
/// Slot inventory is externally controlled and may never open; an unbounded
/// loop would hang forever on a venue that never frees a table.
pub const MAX_RETRIES: u32 = 10;
