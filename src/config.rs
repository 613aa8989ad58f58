//! Run configuration: CLI flags, credentials, and runtime behavior flags.
//!
//! Everything is resolved once at startup into immutable structs that are
//! passed down to the components that need them. No ambient global state.

use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use thiserror::Error;
use url::Url;

/// Command-line interface for a single booking run.
#[derive(Debug, Parser)]
#[command(name = "resnipe")]
#[command(about = "Books a restaurant reservation by driving a real Chrome session")]
pub struct Cli {
    /// Reservation date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Venue page URL; any query string or fragment is discarded
    #[arg(long)]
    pub venue_url: String,

    /// Number of seats to book (must be at least 1)
    #[arg(long)]
    pub party_size: u32,

    /// Local instant to start polling (YYYY-MM-DDTHH:MM:SS).
    /// When absent, polling starts immediately after login.
    #[arg(long)]
    pub book_time: Option<NaiveDateTime>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("party size must be a positive integer, got {0}")]
    InvalidPartySize(u32),

    #[error("venue URL did not parse: {0}")]
    InvalidVenueUrl(#[from] url::ParseError),

    #[error("venue URL has no origin to build the login page from")]
    MissingOrigin,

    #[error("missing required environment variable {0}")]
    MissingEnvVar(&'static str),
}

/// Immutable description of what to book. Built once from the CLI and passed
/// by reference everywhere.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    venue: Url,
    pub date: NaiveDate,
    pub party_size: u32,
    pub book_time: Option<NaiveDateTime>,
}

impl BookingRequest {
    pub fn new(
        venue_url: &str,
        date: NaiveDate,
        party_size: u32,
        book_time: Option<NaiveDateTime>,
    ) -> Result<Self, ConfigError> {
        if party_size == 0 {
            return Err(ConfigError::InvalidPartySize(party_size));
        }

        let mut venue = Url::parse(venue_url)?;
        // The venue page re-renders from our own date/seats parameters, so any
        // query the operator pasted along with the URL is dropped up front.
        venue.set_query(None);
        venue.set_fragment(None);

        Ok(Self {
            venue,
            date,
            party_size,
            book_time,
        })
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::new(&cli.venue_url, cli.date, cli.party_size, cli.book_time)
    }

    /// Venue availability page with the date/seats query attached.
    pub fn venue_page_url(&self) -> Url {
        let mut url = self.venue.clone();
        url.set_query(Some(&format!(
            "date={}&seats={}",
            self.date, self.party_size
        )));
        url
    }

    /// Site landing page (venue origin) with the same date/seats query.
    /// The login flow starts here.
    pub fn home_url(&self) -> Result<Url, ConfigError> {
        let origin = self.venue.origin();
        if !matches!(origin, url::Origin::Tuple(..)) {
            return Err(ConfigError::MissingOrigin);
        }
        let mut url = Url::parse(&origin.ascii_serialization())?;
        url.set_query(Some(&format!(
            "date={}&seats={}",
            self.date, self.party_size
        )));
        Ok(url)
    }

    pub fn venue_host(&self) -> &str {
        self.venue.host_str().unwrap_or("venue")
    }
}

/// Login credentials, sourced from the environment. Opaque strings, never
/// validated locally.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let email = std::env::var("RESY_EMAIL")
            .map_err(|_| ConfigError::MissingEnvVar("RESY_EMAIL"))?;
        let password = std::env::var("RESY_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("RESY_PASSWORD"))?;
        Ok(Self { email, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the password.
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Behavior flags, each a presence-as-boolean environment variable and each
/// independently defaulting to off.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeFlags {
    /// DRY_RUN: navigate to the venue page but never click a slot.
    pub dry_run: bool,
    /// HEADLESS: run the browser without a visible window.
    pub headless: bool,
    /// QUIT_DRIVER: tear the browser down without waiting for operator input.
    pub auto_quit: bool,
    /// SUPERVISED: prompt the operator after each failed claim.
    pub supervised: bool,
}

impl RuntimeFlags {
    pub fn from_env() -> Self {
        Self {
            dry_run: env_flag("DRY_RUN"),
            headless: env_flag("HEADLESS"),
            auto_quit: env_flag("QUIT_DRIVER"),
            supervised: env_flag("SUPERVISED"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var_os(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("test date")
    }

    #[test]
    fn missing_required_flags_fail_parsing() {
        for args in [
            vec!["resnipe", "--venue-url", "https://resy.com/x", "--party-size", "2"],
            vec!["resnipe", "--date", "2024-07-15", "--party-size", "2"],
            vec!["resnipe", "--date", "2024-07-15", "--venue-url", "https://resy.com/x"],
        ] {
            assert!(Cli::try_parse_from(args).is_err());
        }
    }

    #[test]
    fn all_required_flags_parse() {
        let cli = Cli::try_parse_from([
            "resnipe",
            "--date",
            "2024-07-15",
            "--venue-url",
            "https://resy.com/hip-cool-venue",
            "--party-size",
            "2",
        ])
        .expect("valid args");
        assert_eq!(cli.date, date("2024-07-15"));
        assert_eq!(cli.party_size, 2);
        assert!(cli.book_time.is_none());
    }

    #[test]
    fn book_time_is_optional_and_parses_local_instants() {
        let cli = Cli::try_parse_from([
            "resnipe",
            "--date",
            "2024-07-15",
            "--venue-url",
            "https://resy.com/hip-cool-venue",
            "--party-size",
            "2",
            "--book-time",
            "2024-07-15T09:00:00",
        ])
        .expect("valid args");
        let book_time = cli.book_time.expect("book time parsed");
        assert_eq!(book_time.date(), date("2024-07-15"));
    }

    #[test]
    fn zero_party_size_is_rejected() {
        let err = BookingRequest::new("https://resy.com/hip-cool-venue", date("2024-07-15"), 0, None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPartySize(0)));
    }

    #[test]
    fn unparseable_venue_url_is_rejected() {
        let err =
            BookingRequest::new("not a url", date("2024-07-15"), 2, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVenueUrl(_)));
    }

    #[test]
    fn venue_query_is_stripped_and_replaced() {
        let request = BookingRequest::new(
            "https://resy.com/hip-cool-venue?foo=bar",
            date("2024-07-15"),
            2,
            None,
        )
        .expect("valid request");
        assert_eq!(
            request.venue_page_url().as_str(),
            "https://resy.com/hip-cool-venue?date=2024-07-15&seats=2"
        );
    }

    #[test]
    fn home_url_is_the_venue_origin_with_the_same_query() {
        let request = BookingRequest::new(
            "https://resy.com/cities/ny/hip-cool-venue",
            date("2024-07-15"),
            4,
            None,
        )
        .expect("valid request");
        assert_eq!(
            request.home_url().expect("home url").as_str(),
            "https://resy.com/?date=2024-07-15&seats=4"
        );
    }
}
