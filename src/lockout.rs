//! Login attempt tracking and account lockout.
//!
//! Failures are counted per username within a sliding window; exceeding the
//! policy locks the identifier for a fixed duration. State is in-process
//! only, so a restart clears all counters. Locked-out logins are rejected
//! before any credential check runs, which also keeps response timing flat
//! during an active lockout.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lockout policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Failures within the window before lockout.
    pub max_attempts: u32,
    /// Sliding window over which failures are counted.
    pub attempt_window: Duration,
    /// How long a locked identifier stays locked.
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_window: Duration::from_secs(30 * 60),
            lockout_duration: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug)]
struct AttemptRecord {
    failures: Vec<Instant>,
    locked_until: Option<Instant>,
}

/// Outcome of a pre-login lockout check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutStatus {
    Clear,
    /// Locked; remaining lockout time.
    Locked(Duration),
}

/// Tracks login failures per username.
pub struct LoginTracker {
    policy: LockoutPolicy,
    records: RwLock<HashMap<String, AttemptRecord>>,
}

impl LoginTracker {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Checks whether `username` is currently locked out.
    pub fn check(&self, username: &str) -> LockoutStatus {
        self.check_at(username, Instant::now())
    }

    fn check_at(&self, username: &str, now: Instant) -> LockoutStatus {
        let records = self.records.read();
        if let Some(record) = records.get(username) {
            if let Some(until) = record.locked_until {
                if until > now {
                    return LockoutStatus::Locked(until - now);
                }
            }
        }
        LockoutStatus::Clear
    }

    /// Records a failed login. Returns the new status so callers can log a
    /// lockout the moment it begins.
    pub fn record_failure(&self, username: &str) -> LockoutStatus {
        self.record_failure_at(username, Instant::now())
    }

    fn record_failure_at(&self, username: &str, now: Instant) -> LockoutStatus {
        let window_start = now.checked_sub(self.policy.attempt_window);
        let mut records = self.records.write();

        // Drop entries with no failures left in the window and no active
        // lockout, so the map only tracks identifiers still in play
        records.retain(|_, r| {
            r.locked_until.map_or(false, |until| until > now)
                || r.failures
                    .iter()
                    .any(|t| window_start.map_or(true, |start| *t >= start))
        });

        let record = records.entry(username.to_owned()).or_insert(AttemptRecord {
            failures: Vec::new(),
            locked_until: None,
        });

        record.failures.push(now);
        record
            .failures
            .retain(|t| window_start.map_or(true, |start| *t >= start));

        if record.failures.len() >= self.policy.max_attempts as usize {
            record.locked_until = Some(now + self.policy.lockout_duration);
            record.failures.clear();
            return LockoutStatus::Locked(self.policy.lockout_duration);
        }
        LockoutStatus::Clear
    }

    /// Clears all state for `username` after a successful login.
    pub fn record_success(&self, username: &str) {
        self.records.write().remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LoginTracker {
        LoginTracker::new(LockoutPolicy {
            max_attempts: 3,
            attempt_window: Duration::from_secs(60),
            lockout_duration: Duration::from_secs(120),
        })
    }

    #[test]
    fn locks_after_max_failures() {
        let t = tracker();
        assert_eq!(t.record_failure("alice"), LockoutStatus::Clear);
        assert_eq!(t.record_failure("alice"), LockoutStatus::Clear);
        assert!(matches!(t.record_failure("alice"), LockoutStatus::Locked(_)));
        assert!(matches!(t.check("alice"), LockoutStatus::Locked(_)));
    }

    #[test]
    fn counters_are_per_username() {
        let t = tracker();
        t.record_failure("alice");
        t.record_failure("alice");
        assert_eq!(t.check("bob"), LockoutStatus::Clear);
        assert_eq!(t.record_failure("bob"), LockoutStatus::Clear);
    }

    #[test]
    fn success_clears_failures() {
        let t = tracker();
        t.record_failure("alice");
        t.record_failure("alice");
        t.record_success("alice");
        assert_eq!(t.record_failure("alice"), LockoutStatus::Clear);
    }

    #[test]
    fn old_failures_age_out_of_the_window() {
        let t = tracker();
        let start = Instant::now();
        t.record_failure_at("alice", start);
        t.record_failure_at("alice", start);
        // Third failure lands after the window; earlier ones no longer count
        let late = start + Duration::from_secs(120);
        assert_eq!(t.record_failure_at("alice", late), LockoutStatus::Clear);
    }

    #[test]
    fn stale_records_are_pruned() {
        let t = tracker();
        let start = Instant::now();
        for i in 0..100 {
            t.record_failure_at(&format!("user{i}"), start);
        }
        assert_eq!(t.records.read().len(), 100);

        // One failure an hour on; every earlier record is past its window
        // and holds no lockout, so only the fresh one remains
        let later = start + Duration::from_secs(3600);
        t.record_failure_at("fresh", later);
        let records = t.records.read();
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("fresh"));
    }

    #[test]
    fn active_lockouts_survive_pruning() {
        let t = tracker();
        let start = Instant::now();
        t.record_failure_at("alice", start);
        t.record_failure_at("alice", start);
        t.record_failure_at("alice", start);

        // alice is locked until start+120; a later failure for another
        // identifier must not evict the live lockout
        t.record_failure_at("bob", start + Duration::from_secs(90));
        assert!(t.records.read().contains_key("alice"));
        assert!(matches!(
            t.check_at("alice", start + Duration::from_secs(90)),
            LockoutStatus::Locked(_)
        ));
    }

    #[test]
    fn lockout_expires() {
        let t = tracker();
        let start = Instant::now();
        t.record_failure_at("alice", start);
        t.record_failure_at("alice", start);
        assert!(matches!(
            t.record_failure_at("alice", start),
            LockoutStatus::Locked(_)
        ));
        assert_eq!(
            t.check_at("alice", start + Duration::from_secs(121)),
            LockoutStatus::Clear
        );
    }
}
