//! Per-user mutual exclusion for timeline mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::calendar::UserId;

/// One lock per user, created on first use.
///
/// The guarded value is `()`, so a poisoned lock carries no broken state
/// and is simply re-entered.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user_id).or_default())
    }

    /// Run `f` while holding `user_id`'s lock.
    pub fn with_user<T>(&self, user_id: UserId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of users that have taken a lock so far.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (locks, inside, max_seen) = (locks.clone(), inside.clone(), max_seen.clone());
                thread::spawn(move || {
                    locks.with_user(1, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_users_run_in_parallel() {
        let locks = Arc::new(UserLocks::new());
        let barrier = Arc::new(Barrier::new(2));

        // Both closures must be inside their lock at once to pass the barrier.
        let handles: Vec<_> = [1, 2]
            .into_iter()
            .map(|user| {
                let (locks, barrier) = (locks.clone(), barrier.clone());
                thread::spawn(move || locks.with_user(user, || barrier.wait()))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn panicking_holder_does_not_wedge_the_user() {
        let locks = Arc::new(UserLocks::new());
        let l = locks.clone();
        let _ = thread::spawn(move || l.with_user(7, || panic!("boom"))).join();
        assert_eq!(locks.with_user(7, || 42), 42);
    }
}
