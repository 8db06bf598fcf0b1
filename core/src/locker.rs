//! Cooldown gate for debouncing repeated user actions.
//!
//! `ExecutionLocker` is a value owned by whoever needs debouncing (typically
//! one per screen), not process-wide state. The lock expires on its own:
//! `try_acquire` compares the stored deadline against the clock, so no timer
//! task is needed.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

/// Longer cooldowns are clamped to this.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
pub struct ExecutionLocker {
    cooldown: Duration,
    locked_until: Mutex<Option<Instant>>,
}

impl Default for ExecutionLocker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl ExecutionLocker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: cooldown.min(MAX_COOLDOWN),
            locked_until: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns `true` and arms the lock if it is not currently held.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut locked_until = self.locked_until.lock();
        if locked_until.is_some_and(|until| now < until) {
            trace!("execution locked");
            return false;
        }
        *locked_until = Some(now + self.cooldown);
        trace!(cooldown_ms = self.cooldown.as_millis() as u64, "execution lock armed");
        true
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Instant::now())
    }

    pub fn is_locked_at(&self, now: Instant) -> bool {
        self.locked_until.lock().is_some_and(|until| now < until)
    }

    /// Drops the lock early, e.g. when the guarded action failed to start.
    pub fn release(&self) {
        *self.locked_until.lock() = None;
    }

    /// Runs `action` only if the lock could be acquired. The lock is armed
    /// before `action` starts, so re-entrant presses are rejected; a panic in
    /// `action` releases it.
    pub fn run<R>(&self, action: impl FnOnce() -> R) -> Option<R> {
        if !self.try_acquire() {
            return None;
        }
        let guard = ReleaseOnUnwind(self);
        let result = action();
        std::mem::forget(guard);
        Some(result)
    }
}

struct ReleaseOnUnwind<'a>(&'a ExecutionLocker);

impl Drop for ReleaseOnUnwind<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_within_cooldown_fails() {
        let locker = ExecutionLocker::new(Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(locker.try_acquire_at(t0));
        assert!(!locker.try_acquire_at(t0 + Duration::from_millis(500)));
        assert!(locker.is_locked_at(t0 + Duration::from_millis(1999)));
    }

    #[test]
    fn lock_expires_after_cooldown() {
        let locker = ExecutionLocker::new(Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(locker.try_acquire_at(t0));
        assert!(!locker.is_locked_at(t0 + Duration::from_secs(2)));
        assert!(locker.try_acquire_at(t0 + Duration::from_secs(2)));
        assert!(!locker.try_acquire_at(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn release_unlocks_immediately() {
        let locker = ExecutionLocker::default();
        assert!(locker.try_acquire());
        assert!(locker.is_locked());
        locker.release();
        assert!(!locker.is_locked());
        assert!(locker.try_acquire());
    }

    #[test]
    fn run_skips_action_while_locked() {
        let locker = ExecutionLocker::new(Duration::from_secs(60));
        let mut presses = 0;
        assert_eq!(locker.run(|| presses += 1), Some(()));
        assert_eq!(locker.run(|| presses += 1), None);
        assert_eq!(presses, 1);
    }

    #[test]
    fn default_cooldown_is_two_seconds() {
        assert_eq!(ExecutionLocker::default().cooldown(), Duration::from_millis(2000));
    }

    #[test]
    fn huge_cooldown_is_clamped() {
        let locker = ExecutionLocker::new(Duration::MAX);
        assert_eq!(locker.cooldown(), MAX_COOLDOWN);
        assert!(locker.try_acquire());
        assert!(locker.is_locked());
    }

    #[test]
    fn only_one_thread_wins_a_burst() {
        let locker = std::sync::Arc::new(ExecutionLocker::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locker = locker.clone();
                std::thread::spawn(move || locker.try_acquire())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn panicking_action_releases_the_lock() {
        let locker = ExecutionLocker::new(Duration::from_secs(60));
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locker.run(|| panic!("action failed"))
        }));
        assert!(outcome.is_err());
        assert!(!locker.is_locked());
        assert_eq!(locker.run(|| 7), Some(7));
        assert!(locker.is_locked());
    }

    #[test]
    fn action_sees_the_lock_already_held() {
        let locker = ExecutionLocker::new(Duration::from_secs(60));
        assert_eq!(locker.run(|| locker.try_acquire()), Some(false));
    }
}
