//! Cancellation of blocked acquires

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Something with blocked waiters that must re-check their wake condition
pub(crate) trait WakeWaiters: Send + Sync {
    fn wake_all(&self);
}

struct CancelInner {
    cancelled: AtomicBool,
    waiters: Mutex<Vec<Weak<dyn WakeWaiters>>>,
}

/// Cancels acquires blocked on one or more pools
///
/// Clones share the same state. Once cancelled a token stays cancelled;
/// every acquire using it fails with
/// [`TranscodeError::AcquireCancelled`](crate::TranscodeError::AcquireCancelled)
/// without taking a session.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Cancel and wake every pool an acquire with this token may be blocked on
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        // Wake outside the token lock; waking takes each pool's own lock
        let pools: Vec<Arc<dyn WakeWaiters>> = self
            .inner
            .waiters
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for pool in pools {
            pool.wake_all();
        }
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn register(&self, pool: Weak<dyn WakeWaiters>) {
        let mut waiters = self.inner.waiters.lock();
        waiters.retain(|w| w.strong_count() > 0);
        if !waiters.iter().any(|w| w.ptr_eq(&pool)) {
            waiters.push(pool);
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counter(AtomicUsize);

    impl WakeWaiters for Counter {
        fn wake_all(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cancel_wakes_registered_pools() {
        let token = CancelToken::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let weak: Weak<dyn WakeWaiters> = Arc::downgrade(&counter) as Weak<dyn WakeWaiters>;

        token.register(weak.clone());
        token.register(weak);
        assert!(!token.is_cancelled());

        token.clone().cancel();
        assert!(token.is_cancelled());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_pools_are_pruned() {
        let token = CancelToken::new();
        {
            let counter = Arc::new(Counter(AtomicUsize::new(0)));
            token.register(Arc::downgrade(&counter) as Weak<dyn WakeWaiters>);
        }
        let live = Arc::new(Counter(AtomicUsize::new(0)));
        token.register(Arc::downgrade(&live) as Weak<dyn WakeWaiters>);
        assert_eq!(token.inner.waiters.lock().len(), 1);
        token.cancel();
        assert_eq!(live.0.load(Ordering::SeqCst), 1);
    }
}
