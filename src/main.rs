use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use resnipe::{
    AttemptOutcome, BookingRequest, BrowserSession, Cli, Credentials, LiveVenuePage, LoopPolicy,
    RuntimeFlags, StdinOperator, acquire_slot, auth, schedule,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let request = BookingRequest::from_cli(&cli)?;
    let flags = RuntimeFlags::from_env();
    let credentials = Credentials::from_env()?;

    info!(
        venue = request.venue_host(),
        date = %request.date,
        party_size = request.party_size,
        ?flags,
        "starting booking run"
    );

    let session = BrowserSession::launch(flags.headless).await?;
    let page = session.new_page().await?;

    auth::login(&page, &request, &credentials).await?;

    if let Some(book_time) = request.book_time {
        schedule::wait_until(book_time).await;
    }

    let venue_url = request.venue_page_url();
    info!(url = %venue_url, "navigating to venue page");
    page.goto(venue_url.as_str())
        .await
        .map_err(|e| anyhow::anyhow!("failed to open venue page: {e}"))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| anyhow::anyhow!("venue page did not finish loading: {e}"))?;

    let policy = LoopPolicy::from_flags(&flags);
    let venue = LiveVenuePage::new(page.clone());
    let outcome = acquire_slot(&venue, &StdinOperator, &policy).await;

    match &outcome {
        AttemptOutcome::Booked { slot_label } => info!(slot = %slot_label, "reservation booked"),
        AttemptOutcome::DryRun => info!("dry run complete, nothing was claimed"),
        AttemptOutcome::RetryLimitExceeded => {
            warn!("gave up: no slot claimed within the retry budget");
        }
        AttemptOutcome::OperatorAborted => warn!("run aborted by operator"),
    }

    if !flags.auto_quit {
        // Leave the browser up so the operator can inspect the result.
        println!("Press Enter to close the browser...");
        let mut line = String::new();
        let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
    }

    session.shutdown().await;
    Ok(())
}
