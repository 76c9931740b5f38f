// Sliding-window rate limiter keyed by (operation, target)

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::error::DiagnosticError;

#[derive(Debug, Clone, Copy)]
pub struct Limit {
    pub max_requests: u32,
    pub window: Duration,
}

type Window = Arc<Mutex<VecDeque<Instant>>>;

/// Per-key sliding windows of request timestamps. Entries older than the
/// window width are evicted lazily on each check; an admission records the
/// current instant, a rejection records nothing.
///
/// Keys map to individually locked windows so concurrent requests for
/// different targets never contend on one lock.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: RwLock<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast-read lookup; falls back to a write lock only to create a
    /// missing window.
    fn window(&self, key: &str) -> Window {
        if let Some(w) = self.windows.read().get(key) {
            return w.clone();
        }
        self.windows
            .write()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Admits iff fewer than `max_requests` admissions happened within the
    /// trailing window. Records the timestamp only on admission.
    pub fn allow(&self, key: &str, window: Duration, max_requests: u32) -> bool {
        let w = self.window(key);
        let mut entries = w.lock();
        let now = Instant::now();
        prune(&mut entries, now, window);
        if entries.len() >= max_requests as usize {
            return false;
        }
        entries.push_back(now);
        true
    }

    /// `allow` with a typed rejection carrying the scope that refused.
    pub fn check(&self, key: &str, scope: &str, limit: Limit) -> Result<(), DiagnosticError> {
        if self.allow(key, limit.window, limit.max_requests) {
            Ok(())
        } else {
            Err(rejection(scope, limit))
        }
    }

    /// Dual-scope admission for the diagnostic path: the global cap and the
    /// per-target cap must both pass, and nothing is recorded unless both
    /// do. Locks are taken global-first; global and target keys are
    /// disjoint namespaces so the order never inverts.
    pub fn check_scoped(
        &self,
        global_key: &str,
        global_limit: Limit,
        target_key: &str,
        target_limit: Limit,
    ) -> Result<(), DiagnosticError> {
        let global = self.window(global_key);
        let target = self.window(target_key);
        let mut global_entries = global.lock();
        let mut target_entries = target.lock();
        let now = Instant::now();
        prune(&mut global_entries, now, global_limit.window);
        prune(&mut target_entries, now, target_limit.window);
        if global_entries.len() >= global_limit.max_requests as usize {
            return Err(rejection(global_key, global_limit));
        }
        if target_entries.len() >= target_limit.max_requests as usize {
            return Err(rejection(target_key, target_limit));
        }
        global_entries.push_back(now);
        target_entries.push_back(now);
        Ok(())
    }
}

fn prune(entries: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = entries.front() {
        if now.duration_since(*oldest) > window {
            entries.pop_front();
        } else {
            break;
        }
    }
}

fn rejection(scope: &str, limit: Limit) -> DiagnosticError {
    DiagnosticError::RateLimitExceeded {
        scope: scope.to_string(),
        max: limit.max_requests,
        window_secs: limit.window.as_secs(),
    }
}
