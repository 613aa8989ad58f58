//! The slot acquisition loop.
//!
//! A bounded-retry state machine: every pass rediscovers the candidate list,
//! filters out waitlist affordances, and tries to claim candidates one by one
//! until something sticks. One slot's claim can legitimately fail (already
//! taken by a racing party) without invalidating the others in the same pass,
//! so a failed claim only skips that candidate.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::RuntimeFlags;
use crate::utils::constants::{MAX_RETRIES, PASS_DELAY};
use crate::venue::{SlotCandidate, VenuePage};

/// Terminal state of a booking run. Mutually exclusive; observable only via
/// log output, never via exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A claim sequence completed end to end.
    Booked { slot_label: String },
    /// Dry-run mode: the page was visited but nothing was clicked.
    DryRun,
    /// No slot claimed within the pass budget.
    RetryLimitExceeded,
    /// The operator typed the cancellation key mid-loop.
    OperatorAborted,
}

/// Whether a human sits between failed claims and the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervision {
    /// Keep going silently after a failed claim.
    Autonomous,
    /// Ask the operator after each failed claim.
    Supervised,
}

/// Human override point, injected so the loop is testable without a terminal.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Called after a failed claim under supervised operation. Returning
    /// false aborts the whole run.
    async fn keep_going(&self, failed_label: &str) -> bool;
}

/// Reads one line from stdin; `c` (any case) cancels, anything else
/// continues.
pub struct StdinOperator;

#[async_trait]
impl Operator for StdinOperator {
    async fn keep_going(&self, failed_label: &str) -> bool {
        println!("Claim failed for '{failed_label}'. Type 'c' to cancel, anything else to keep trying:");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        if reader.read_line(&mut line).await.is_err() {
            // Stdin gone (detached terminal); keep running autonomously.
            return true;
        }
        !line.trim().eq_ignore_ascii_case("c")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopPolicy {
    /// Pass counter above this value terminates the loop.
    pub max_retries: u32,
    /// Sleep between passes when nothing was claimed.
    pub pass_delay: Duration,
    pub dry_run: bool,
    pub supervision: Supervision,
}

impl LoopPolicy {
    pub fn from_flags(flags: &RuntimeFlags) -> Self {
        Self {
            max_retries: MAX_RETRIES,
            pass_delay: PASS_DELAY,
            dry_run: flags.dry_run,
            supervision: if flags.supervised {
                Supervision::Supervised
            } else {
                Supervision::Autonomous
            },
        }
    }
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            pass_delay: PASS_DELAY,
            dry_run: false,
            supervision: Supervision::Autonomous,
        }
    }
}

/// Poll the venue page and try to claim a slot until one is booked, the
/// retry budget runs out, or the operator aborts.
///
/// The caller has already navigated to the venue page; this function only
/// reads and clicks.
pub async fn acquire_slot<V, O>(venue: &V, operator: &O, policy: &LoopPolicy) -> AttemptOutcome
where
    V: VenuePage,
    O: Operator,
{
    if policy.dry_run {
        info!("dry run: venue page reached, skipping all claim attempts");
        return AttemptOutcome::DryRun;
    }

    let mut attempts: u32 = 0;
    loop {
        // Always re-read fresh; the page may have re-rendered and stale
        // element handles are useless.
        let mut slots = match venue.poll_slots().await {
            Ok(slots) => slots,
            Err(e) => {
                warn!(error = %e, "slot discovery failed, treating as an empty pass");
                Vec::new()
            }
        };

        let discovered = slots.len();
        slots.retain(|slot| !slot.is_notify_only());
        if discovered > slots.len() {
            debug!(
                skipped = discovered - slots.len(),
                "ignoring notify-only candidates"
            );
        }

        if slots.is_empty() {
            info!("no bookable slots rendered this pass");
        }

        // Randomized order avoids deterministic contention with other bookers
        // racing for the same popular slot.
        slots.shuffle(&mut rand::rng());

        for slot in &slots {
            info!(slot = slot.label(), "attempting to claim slot");
            match venue.claim(slot).await {
                Ok(()) => {
                    info!(slot = slot.label(), "slot booked");
                    return AttemptOutcome::Booked {
                        slot_label: slot.label().to_string(),
                    };
                }
                Err(e) => {
                    warn!(slot = slot.label(), error = %e, "claim failed, moving on");
                    if policy.supervision == Supervision::Supervised
                        && !operator.keep_going(slot.label()).await
                    {
                        return AttemptOutcome::OperatorAborted;
                    }
                }
            }
        }

        attempts += 1;
        if attempts > policy.max_retries {
            warn!(passes = attempts, "no slot claimed within the retry budget, giving up");
            return AttemptOutcome::RetryLimitExceeded;
        }

        tokio::time::sleep(policy.pass_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::ClaimError;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct FakeSlot {
        label: String,
        notify_only: bool,
    }

    impl FakeSlot {
        fn open(label: &str) -> Self {
            Self {
                label: label.to_string(),
                notify_only: false,
            }
        }

        fn notify(label: &str) -> Self {
            Self {
                label: label.to_string(),
                notify_only: true,
            }
        }
    }

    impl SlotCandidate for FakeSlot {
        fn label(&self) -> &str {
            &self.label
        }

        fn is_notify_only(&self) -> bool {
            self.notify_only
        }
    }

    /// Scripted venue page: each poll pops the next pass off the script;
    /// once the script runs dry every pass is empty. Claims on labels in
    /// `failing` fail as if another party got there first.
    struct FakeVenue {
        script: Mutex<VecDeque<Vec<FakeSlot>>>,
        failing: HashSet<String>,
        polls: AtomicUsize,
        claims: Mutex<Vec<String>>,
    }

    impl FakeVenue {
        fn new(passes: Vec<Vec<FakeSlot>>, failing: &[&str]) -> Self {
            Self {
                script: Mutex::new(passes.into()),
                failing: failing.iter().map(|s| s.to_string()).collect(),
                polls: AtomicUsize::new(0),
                claims: Mutex::new(Vec::new()),
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }

        fn claims(&self) -> Vec<String> {
            self.claims.lock().expect("claims lock").clone()
        }
    }

    #[async_trait]
    impl VenuePage for FakeVenue {
        type Slot = FakeSlot;

        async fn poll_slots(&self) -> Result<Vec<FakeSlot>, ClaimError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_default())
        }

        async fn claim(&self, slot: &FakeSlot) -> Result<(), ClaimError> {
            self.claims
                .lock()
                .expect("claims lock")
                .push(slot.label.clone());
            if self.failing.contains(&slot.label) {
                Err(ClaimError::ConfirmFailed("slot taken by a racing party".into()))
            } else {
                Ok(())
            }
        }
    }

    /// Operator that must never be consulted.
    struct NoOperator;

    #[async_trait]
    impl Operator for NoOperator {
        async fn keep_going(&self, failed_label: &str) -> bool {
            panic!("operator consulted in autonomous mode for '{failed_label}'");
        }
    }

    struct ScriptedOperator {
        answers: Mutex<VecDeque<bool>>,
        calls: AtomicUsize,
    }

    impl ScriptedOperator {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Operator for ScriptedOperator {
        async fn keep_going(&self, _failed_label: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .expect("answers lock")
                .pop_front()
                .unwrap_or(true)
        }
    }

    fn fast_policy(max_retries: u32) -> LoopPolicy {
        LoopPolicy {
            max_retries,
            pass_delay: Duration::ZERO,
            dry_run: false,
            supervision: Supervision::Autonomous,
        }
    }

    #[tokio::test]
    async fn dry_run_terminates_without_any_interaction() {
        let venue = FakeVenue::new(vec![vec![FakeSlot::open("7:00 PM")]], &[]);
        let policy = LoopPolicy {
            dry_run: true,
            ..fast_policy(10)
        };

        let outcome = acquire_slot(&venue, &NoOperator, &policy).await;

        assert_eq!(outcome, AttemptOutcome::DryRun);
        assert_eq!(venue.polls(), 0);
        assert!(venue.claims().is_empty());
    }

    #[tokio::test]
    async fn books_a_claimable_slot() {
        let venue = FakeVenue::new(vec![vec![FakeSlot::open("7:00 PM")]], &[]);

        let outcome = acquire_slot(&venue, &NoOperator, &fast_policy(10)).await;

        assert_eq!(
            outcome,
            AttemptOutcome::Booked {
                slot_label: "7:00 PM".into()
            }
        );
        assert_eq!(venue.claims(), vec!["7:00 PM".to_string()]);
    }

    #[tokio::test]
    async fn notify_only_candidates_are_never_claimed() {
        let venue = FakeVenue::new(
            vec![
                vec![FakeSlot::notify("Notify Me"), FakeSlot::notify("Notify Me")],
                vec![FakeSlot::notify("Notify Me")],
            ],
            &[],
        );

        let outcome = acquire_slot(&venue, &NoOperator, &fast_policy(2)).await;

        assert_eq!(outcome, AttemptOutcome::RetryLimitExceeded);
        assert!(venue.claims().is_empty());
        // Notify-only passes still consume the retry budget.
        assert_eq!(venue.polls(), 3);
    }

    #[tokio::test]
    async fn failed_claim_moves_to_the_next_candidate_in_the_same_pass() {
        let venue = FakeVenue::new(
            vec![vec![FakeSlot::open("7:00 PM"), FakeSlot::open("7:30 PM")]],
            &["7:00 PM", "7:30 PM"],
        );

        let outcome = acquire_slot(&venue, &NoOperator, &fast_policy(0)).await;

        assert_eq!(outcome, AttemptOutcome::RetryLimitExceeded);
        // Both candidates were attempted despite the first failure,
        // whichever order the shuffle produced.
        let mut claims = venue.claims();
        claims.sort();
        assert_eq!(claims, vec!["7:00 PM".to_string(), "7:30 PM".to_string()]);
    }

    #[tokio::test]
    async fn retry_budget_allows_exactly_eleven_passes() {
        let venue = FakeVenue::new(Vec::new(), &[]);

        let outcome = acquire_slot(&venue, &NoOperator, &fast_policy(10)).await;

        assert_eq!(outcome, AttemptOutcome::RetryLimitExceeded);
        assert_eq!(venue.polls(), 11);
    }

    #[tokio::test]
    async fn supervised_abort_stops_the_run() {
        let venue = FakeVenue::new(
            vec![vec![FakeSlot::open("7:00 PM")], vec![FakeSlot::open("7:30 PM")]],
            &["7:00 PM", "7:30 PM"],
        );
        let operator = ScriptedOperator::new(&[false]);
        let policy = LoopPolicy {
            supervision: Supervision::Supervised,
            ..fast_policy(10)
        };

        let outcome = acquire_slot(&venue, &operator, &policy).await;

        assert_eq!(outcome, AttemptOutcome::OperatorAborted);
        assert_eq!(operator.calls(), 1);
        assert_eq!(venue.polls(), 1);
        assert_eq!(venue.claims().len(), 1);
    }

    #[tokio::test]
    async fn supervised_continue_keeps_attempting() {
        let venue = FakeVenue::new(
            vec![vec![FakeSlot::open("7:00 PM")], vec![FakeSlot::open("7:30 PM")]],
            &["7:00 PM"],
        );
        let operator = ScriptedOperator::new(&[true]);
        let policy = LoopPolicy {
            supervision: Supervision::Supervised,
            ..fast_policy(10)
        };

        let outcome = acquire_slot(&venue, &operator, &policy).await;

        assert_eq!(
            outcome,
            AttemptOutcome::Booked {
                slot_label: "7:30 PM".into()
            }
        );
        assert_eq!(operator.calls(), 1);
    }

    #[tokio::test]
    async fn discovery_errors_count_as_empty_passes() {
        struct BrokenVenue {
            polls: AtomicUsize,
        }

        #[async_trait]
        impl VenuePage for BrokenVenue {
            type Slot = FakeSlot;

            async fn poll_slots(&self) -> Result<Vec<FakeSlot>, ClaimError> {
                self.polls.fetch_add(1, Ordering::SeqCst);
                Err(ClaimError::Discovery("page went away".into()))
            }

            async fn claim(&self, _slot: &FakeSlot) -> Result<(), ClaimError> {
                unreachable!("nothing to claim");
            }
        }

        let venue = BrokenVenue {
            polls: AtomicUsize::new(0),
        };

        let outcome = acquire_slot(&venue, &NoOperator, &fast_policy(2)).await;

        assert_eq!(outcome, AttemptOutcome::RetryLimitExceeded);
        assert_eq!(venue.polls.load(Ordering::SeqCst), 3);
    }
}
