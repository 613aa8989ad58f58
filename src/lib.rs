//! Reservation sniper: books a restaurant slot by driving a real Chrome
//! session over CDP.
//!
//! One linear run: resolve configuration, launch a browser, log in, wait for
//! the booking window, then poll the venue page and claim the first slot
//! that sticks, bounded by a retry cap.

pub mod auth;
pub mod booking;
mod browser;
pub mod browser_setup;
pub mod config;
pub mod schedule;
pub mod utils;
pub mod venue;

pub use auth::AuthError;
pub use booking::{
    AttemptOutcome, LoopPolicy, Operator, StdinOperator, Supervision, acquire_slot,
};
pub use browser::{BrowserError, BrowserResult, BrowserSession};
pub use config::{BookingRequest, Cli, ConfigError, Credentials, RuntimeFlags};
pub use venue::{ClaimError, LiveVenuePage, SlotCandidate, VenuePage};
