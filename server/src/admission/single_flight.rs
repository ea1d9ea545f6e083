//! Per-user single-flight registry.
//!
//! At most one analysis is in flight per user at any instant. The registry
//! maps `user_id -> normalized_url` so a conflicting caller learns which
//! URL holds the lock. Process-local by design; more than one process needs
//! a durable lock instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<Uuid, String>>,
}

impl SingleFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the user's slot for `normalized_url`.
    ///
    /// On conflict, returns the URL currently holding the lock. On success
    /// the returned guard releases the slot when dropped, which makes
    /// release structural on every exit path of the admission sequence.
    pub fn try_acquire(
        self: &Arc<Self>,
        user_id: Uuid,
        normalized_url: &str,
    ) -> Result<FlightGuard, String> {
        let mut locks = self.locks.lock().expect("single flight lock poisoned");
        match locks.get(&user_id) {
            Some(locked_url) => Err(locked_url.clone()),
            None => {
                locks.insert(user_id, normalized_url.to_string());
                Ok(FlightGuard {
                    registry: Arc::clone(self),
                    user_id,
                })
            }
        }
    }

    /// Idempotent release.
    pub fn release(&self, user_id: Uuid) {
        self.locks
            .lock()
            .expect("single flight lock poisoned")
            .remove(&user_id);
    }

    /// Number of users currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.locks.lock().expect("single flight lock poisoned").len()
    }
}

/// RAII handle for an acquired slot.
#[derive(Debug)]
pub struct FlightGuard {
    registry: Arc<SingleFlight>,
    user_id: Uuid,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.registry.release(self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_conflict_reports_locked_url() {
        let registry = SingleFlight::new();
        let user = Uuid::new_v4();

        let _guard = registry
            .try_acquire(user, "https://tiktok.com/@c/video/1")
            .unwrap();

        // Same user, any URL: denied with the holder's URL.
        let err = registry
            .try_acquire(user, "https://tiktok.com/@c/video/2")
            .unwrap_err();
        assert_eq!(err, "https://tiktok.com/@c/video/1");

        // Other users are unaffected.
        let other = Uuid::new_v4();
        assert!(registry
            .try_acquire(other, "https://tiktok.com/@c/video/1")
            .is_ok());
    }

    #[test]
    fn test_guard_drop_releases() {
        let registry = SingleFlight::new();
        let user = Uuid::new_v4();

        {
            let _guard = registry.try_acquire(user, "https://u").unwrap();
            assert_eq!(registry.in_flight(), 1);
        }
        assert_eq!(registry.in_flight(), 0);
        assert!(registry.try_acquire(user, "https://u").is_ok());
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = SingleFlight::new();
        let user = Uuid::new_v4();
        registry.release(user);
        let guard = registry.try_acquire(user, "https://u").unwrap();
        drop(guard);
        registry.release(user);
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_exactly_one_concurrent_winner_per_user() {
        let registry = SingleFlight::new();
        let user = Uuid::new_v4();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.try_acquire(user, "https://u").ok())
            })
            .collect();

        // Hold the winning guards until every thread has finished, so a
        // released slot cannot be re-won mid-test.
        let guards: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().expect("thread panicked"))
            .collect();
        assert_eq!(guards.len(), 1);
    }
}
