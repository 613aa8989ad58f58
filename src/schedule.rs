//! Scheduler gate: block until the booking window opens.

use chrono::{Local, NaiveDateTime};
use tracing::info;

/// Sleep until `target` (local wall clock). Returns immediately when the
/// target is already in the past. A single sleep, no drift correction: the
/// program is single-shot and a few milliseconds of skew don't matter
/// against a site that releases inventory on whole minutes.
pub async fn wait_until(target: NaiveDateTime) {
    let now = Local::now().naive_local();
    let remaining = target.signed_duration_since(now);

    match remaining.to_std() {
        Ok(wait) => {
            info!(
                target = %target,
                wait_secs = wait.as_secs(),
                "waiting for the booking window to open"
            );
            tokio::time::sleep(wait).await;
        }
        Err(_) => {
            info!(target = %target, "booking window already open, starting immediately");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[tokio::test(start_paused = true)]
    async fn past_target_returns_immediately() {
        let start = tokio::time::Instant::now();
        let target = Local::now().naive_local() - ChronoDuration::hours(1);

        wait_until(target).await;

        // No timer was registered, so even the paused clock didn't advance.
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn future_target_sleeps_the_remaining_duration() {
        let start = tokio::time::Instant::now();
        let target = Local::now().naive_local() + ChronoDuration::seconds(30);

        wait_until(target).await;

        // Paused clock auto-advances through the sleep; elapsed reflects the
        // full wait (allow slack for wall-clock skew while computing it).
        assert!(start.elapsed() >= std::time::Duration::from_secs(25));
    }
}
