//! Failed-login throttling, keyed by account role and email.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Failures allowed inside the window before a key is locked.
const MAX_FAILURES: usize = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);
const LOCKOUT: Duration = Duration::from_secs(15 * 60);
/// Tracked keys above which stale entries are swept.
const SWEEP_THRESHOLD: usize = 1000;

pub struct LoginThrottle {
    failures: HashMap<String, Vec<Instant>>,
    locked_until: HashMap<String, Instant>,
    max_failures: usize,
    window: Duration,
    lockout: Duration,
}

impl LoginThrottle {
    pub fn new() -> Self {
        Self::with_limits(MAX_FAILURES, WINDOW, LOCKOUT)
    }

    pub fn with_limits(max_failures: usize, window: Duration, lockout: Duration) -> Self {
        Self {
            failures: HashMap::new(),
            locked_until: HashMap::new(),
            max_failures,
            window,
            lockout,
        }
    }

    /// `Err(retry_after_secs)` while the key is locked.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        match self.locked_until.get(key) {
            Some(until) if *until > now => Err(until.duration_since(now).as_secs().max(1)),
            Some(_) => {
                self.locked_until.remove(key);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn record_failure(&mut self, key: &str) {
        let now = Instant::now();
        if self.failures.len() + self.locked_until.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let window = self.window;
        let entries = self.failures.entry(key.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < window);
        entries.push(now);

        if entries.len() >= self.max_failures {
            self.failures.remove(key);
            self.locked_until.insert(key.to_string(), now + self.lockout);
            tracing::warn!("Login locked after repeated failures");
        }
    }

    /// Drop keys with no failure inside the window and expired locks.
    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.failures.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < window);
            !entries.is_empty()
        });
        self.locked_until.retain(|_, until| *until > now);
    }

    pub fn clear(&mut self, key: &str) {
        self.failures.remove(key);
        self.locked_until.remove(key);
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new()
    }
}
