//! Debounce scheduler
//!
//! Decides *when* to commit. A burst of change signals collapses into one
//! commit attempt once the directory has been quiet for `quiet_period`, and
//! no two attempts are closer than `cooldown`.
//!
//! ```text
//! Idle ──signal──▶ PendingQuiet ──quiet elapsed, cooldown elapsed──▶ Committing
//!   ▲                 │  ▲                                              │
//!   │                 │  └─signal (refresh)                             │ done
//!   │  quiet elapsed, │                                                 ▼
//!   ├──cooldown not ──┘                                              Cooldown
//!   │  elapsed (drop)                                                   │
//!   └────────────────────────spacing elapsed───────────────────────────┘
//! ```
//!
//! Filesystem changes refresh the quiet period. Engine reports of pending
//! artifacts only arm it: they repeat for as long as anything is uncommitted,
//! so letting them refresh the timer would postpone the commit forever.
//!
//! Time is always passed in, so the machine is driven the same way by the
//! daemon loop and by tests.

use std::time::{Duration, Instant};
use tracing::debug;

/// Timing knobs for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    /// Silence required after the last signal
    pub quiet_period: Duration,

    /// Minimum spacing between commit attempts
    pub cooldown: Duration,
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    PendingQuiet,
    Committing,
    Cooldown,
}

/// What the caller should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run one commit attempt, then call [`DebounceScheduler::commit_finished`]
    Commit,

    /// Nothing to do for this long (or until the next signal)
    Wait(Duration),

    /// Nothing scheduled; wait for a signal
    Idle,
}

/// Debounce state machine
#[derive(Debug, Clone)]
pub struct DebounceScheduler {
    policy: DebouncePolicy,
    state: DebounceState,
    last_signal: Option<Instant>,
    last_commit: Option<Instant>,

    /// Signal seen while a commit was in flight
    signal_during_commit: bool,

    /// Signals dropped because they landed too close to the last commit
    dropped: u64,
}

impl DebounceScheduler {
    pub fn new(policy: DebouncePolicy) -> Self {
        Self {
            policy,
            state: DebounceState::Idle,
            last_signal: None,
            last_commit: None,
            signal_during_commit: false,
            dropped: 0,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }

    pub fn last_signal(&self) -> Option<Instant> {
        self.last_signal
    }

    pub fn last_commit(&self) -> Option<Instant> {
        self.last_commit
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Record a change signal
    ///
    /// Signals coalesce: only the time of the latest one matters.
    pub fn on_signal(&mut self, now: Instant) {
        self.last_signal = Some(now);

        match self.state {
            DebounceState::Committing => self.signal_during_commit = true,
            DebounceState::Idle | DebounceState::PendingQuiet | DebounceState::Cooldown => {
                self.state = DebounceState::PendingQuiet;
            }
        }
    }

    /// Record that uncommitted artifacts exist, without a new change
    ///
    /// Starts the quiet period if none is running; never extends one.
    pub fn on_pending(&mut self, now: Instant) {
        match self.state {
            DebounceState::PendingQuiet => {}
            DebounceState::Committing => self.signal_during_commit = true,
            DebounceState::Idle | DebounceState::Cooldown => {
                self.last_signal = Some(now);
                self.state = DebounceState::PendingQuiet;
            }
        }
    }

    /// Advance the machine to `now` and report what to do
    pub fn poll(&mut self, now: Instant) -> Decision {
        match self.state {
            DebounceState::Idle | DebounceState::Committing => Decision::Idle,

            DebounceState::PendingQuiet => {
                let quiet_left = remaining(self.last_signal, self.policy.quiet_period, now);
                if !quiet_left.is_zero() {
                    return Decision::Wait(quiet_left);
                }

                if remaining(self.last_commit, self.policy.cooldown, now).is_zero() {
                    self.state = DebounceState::Committing;
                    Decision::Commit
                } else {
                    // Too close to the previous attempt; a later signal retries
                    self.dropped += 1;
                    self.state = DebounceState::Idle;
                    debug!("Dropping change signal inside commit cooldown");
                    Decision::Idle
                }
            }

            DebounceState::Cooldown => {
                let spacing_left = remaining(self.last_commit, self.policy.cooldown, now);
                if spacing_left.is_zero() {
                    self.state = DebounceState::Idle;
                    Decision::Idle
                } else {
                    Decision::Wait(spacing_left)
                }
            }
        }
    }

    /// Record the end of a commit attempt, whatever its outcome
    pub fn commit_finished(&mut self, now: Instant) {
        self.last_commit = Some(now);

        if std::mem::take(&mut self.signal_during_commit) {
            self.state = DebounceState::PendingQuiet;
        } else {
            self.state = DebounceState::Cooldown;
        }
    }
}

/// Time left until `since + period`, zero when never set or already passed
fn remaining(since: Option<Instant>, period: Duration, now: Instant) -> Duration {
    match since {
        Some(t) => period.saturating_sub(now.saturating_duration_since(t)),
        None => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_secs(10);
    const COOLDOWN: Duration = Duration::from_secs(5);

    fn scheduler() -> DebounceScheduler {
        DebounceScheduler::new(DebouncePolicy {
            quiet_period: QUIET,
            cooldown: COOLDOWN,
        })
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// Drive the scheduler like the daemon loop: every Commit is finished at once
    fn run_until(s: &mut DebounceScheduler, now: Instant, commits: &mut u32) {
        if s.poll(now) == Decision::Commit {
            *commits += 1;
            s.commit_finished(now);
        }
    }

    #[test]
    fn test_idle_until_signal() {
        let t0 = Instant::now();
        let mut s = scheduler();

        assert_eq!(s.state(), DebounceState::Idle);
        assert_eq!(s.poll(t0 + secs(100)), Decision::Idle);
    }

    #[test]
    fn test_burst_coalesces_into_one_commit() {
        let t0 = Instant::now();
        let mut s = scheduler();
        let mut commits = 0;

        // Ten signals, one per second, all inside one quiet period of each other
        for i in 0..10 {
            let now = t0 + secs(i);
            s.on_signal(now);
            run_until(&mut s, now, &mut commits);
            assert_eq!(s.state(), DebounceState::PendingQuiet);
        }

        // Quiet period measured from the *last* signal
        assert_eq!(s.poll(t0 + secs(15)), Decision::Wait(secs(4)));

        for tick in 19..60 {
            run_until(&mut s, t0 + secs(tick), &mut commits);
        }

        assert_eq!(commits, 1);
        assert_eq!(s.last_commit(), Some(t0 + secs(19)));
        assert_eq!(s.state(), DebounceState::Idle);
    }

    #[test]
    fn test_commit_always_enters_cooldown() {
        let t0 = Instant::now();
        let mut s = scheduler();

        s.on_signal(t0);
        assert_eq!(s.poll(t0 + QUIET), Decision::Commit);
        assert_eq!(s.state(), DebounceState::Committing);

        // Polling mid-commit schedules nothing
        assert_eq!(s.poll(t0 + QUIET + secs(1)), Decision::Idle);

        s.commit_finished(t0 + QUIET + secs(2));
        assert_eq!(s.state(), DebounceState::Cooldown);
        assert_eq!(s.poll(t0 + QUIET + secs(3)), Decision::Wait(secs(4)));
        assert_eq!(s.poll(t0 + QUIET + secs(7)), Decision::Idle);
        assert_eq!(s.state(), DebounceState::Idle);
    }

    #[test]
    fn test_no_attempt_inside_cooldown() {
        let t0 = Instant::now();
        let mut s = DebounceScheduler::new(DebouncePolicy {
            quiet_period: secs(2),
            cooldown: secs(30),
        });

        s.on_signal(t0);
        assert_eq!(s.poll(t0 + secs(2)), Decision::Commit);
        s.commit_finished(t0 + secs(2));

        // Signal one second after the commit; quiet elapses long before cooldown
        s.on_signal(t0 + secs(3));
        assert_eq!(s.state(), DebounceState::PendingQuiet);
        assert_eq!(s.poll(t0 + secs(4)), Decision::Wait(secs(1)));

        // Quiet elapsed but cooldown not: signal is dropped
        assert_eq!(s.poll(t0 + secs(5)), Decision::Idle);
        assert_eq!(s.state(), DebounceState::Idle);
        assert_eq!(s.dropped(), 1);

        for tick in 5..32 {
            assert_ne!(s.poll(t0 + secs(tick)), Decision::Commit);
        }

        // A fresh signal after the cooldown commits again
        s.on_signal(t0 + secs(40));
        assert_eq!(s.poll(t0 + secs(42)), Decision::Commit);
    }

    #[test]
    fn test_signal_in_cooldown_waits_for_quiet_then_commits() {
        let t0 = Instant::now();
        let mut s = scheduler();

        s.on_signal(t0);
        assert_eq!(s.poll(t0 + QUIET), Decision::Commit);
        s.commit_finished(t0 + QUIET);

        s.on_signal(t0 + QUIET + secs(1));
        assert_eq!(s.state(), DebounceState::PendingQuiet);

        // Quiet (10s) outlasts cooldown (5s), so this one is not dropped
        assert_eq!(s.poll(t0 + QUIET + secs(11)), Decision::Commit);
        assert_eq!(s.dropped(), 0);
    }

    #[test]
    fn test_signal_during_commit_rearms() {
        let t0 = Instant::now();
        let mut s = scheduler();

        s.on_signal(t0);
        assert_eq!(s.poll(t0 + QUIET), Decision::Commit);

        s.on_signal(t0 + QUIET + secs(1));
        assert_eq!(s.state(), DebounceState::Committing);

        s.commit_finished(t0 + QUIET + secs(2));
        assert_eq!(s.state(), DebounceState::PendingQuiet);
        assert_eq!(s.poll(t0 + QUIET + secs(3)), Decision::Wait(secs(8)));
        assert_eq!(s.poll(t0 + QUIET + secs(11)), Decision::Commit);
    }

    #[test]
    fn test_pending_reports_do_not_extend_quiet_period() {
        let t0 = Instant::now();
        let mut s = DebounceScheduler::new(DebouncePolicy {
            quiet_period: secs(30),
            cooldown: COOLDOWN,
        });
        let mut commits = 0;

        s.on_signal(t0);

        // Reported every 10s while the artifact stays uncommitted
        for tick in 1..=40 {
            let now = t0 + secs(tick);
            if tick % 10 == 0 {
                s.on_pending(now);
            }
            run_until(&mut s, now, &mut commits);
        }

        assert_eq!(commits, 1);
        assert_eq!(s.last_commit(), Some(t0 + secs(30)));
    }

    #[test]
    fn test_pending_arms_idle_scheduler() {
        let t0 = Instant::now();
        let mut s = scheduler();

        s.on_pending(t0);
        assert_eq!(s.state(), DebounceState::PendingQuiet);
        assert_eq!(s.poll(t0 + secs(4)), Decision::Wait(secs(6)));
        assert_eq!(s.poll(t0 + QUIET), Decision::Commit);

        // Pending report mid-commit re-arms like a change does
        s.on_pending(t0 + QUIET);
        s.commit_finished(t0 + QUIET + secs(1));
        assert_eq!(s.state(), DebounceState::PendingQuiet);
    }

    #[test]
    fn test_zero_cooldown() {
        let t0 = Instant::now();
        let mut s = DebounceScheduler::new(DebouncePolicy {
            quiet_period: secs(1),
            cooldown: Duration::ZERO,
        });

        s.on_signal(t0);
        assert_eq!(s.poll(t0 + secs(1)), Decision::Commit);
        s.commit_finished(t0 + secs(1));
        assert_eq!(s.poll(t0 + secs(1)), Decision::Idle);
    }
}
