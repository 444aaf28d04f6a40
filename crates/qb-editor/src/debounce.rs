//! Quiet-period timer for high-churn edits
//!
//! ```text
//! edit ──► schedule()
//!            ├─► abort previous timer (if any)
//!            └─► spawn timer task
//!                  ├─► sleep(quiet period)
//!                  ├─► take own handle out of the slot
//!                  └─► run action
//! ```
//!
//! Once the timer task has taken its handle out of the slot, neither a new
//! schedule nor a cancel can abort it, so a write that has started always
//! finishes.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Default quiet period before a debounced commit
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(3);

#[derive(Debug)]
struct Pending {
    ticket: u64,
    handle: AbortHandle,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Pending>,
    next_ticket: u64,
}

/// Single restartable timer
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl Debouncer {
    /// Create debouncer with a quiet period
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Quiet period
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Run `action` after the quiet period, replacing any pending timer
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(prev) = slot.pending.take() {
            prev.handle.abort();
            tracing::trace!(ticket = prev.ticket, "debounce timer restarted");
        }
        slot.next_ticket += 1;
        let ticket = slot.next_ticket;

        let quiet = self.quiet;
        let shared = Arc::clone(&self.slot);
        let task = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            {
                let mut slot = shared.lock();
                match &slot.pending {
                    Some(p) if p.ticket == ticket => slot.pending = None,
                    // Superseded between wake-up and lock.
                    _ => return,
                }
            }
            tracing::debug!(ticket, "debounce timer fired");
            action().await;
        });

        // Still holding the lock, so the task cannot observe the slot first.
        slot.pending = Some(Pending {
            ticket,
            handle: task.abort_handle(),
        });
    }

    /// Abort the pending timer without running it
    ///
    /// Returns whether a timer was pending.
    pub fn cancel(&self) -> bool {
        let pending = self.slot.lock().pending.take();
        match pending {
            Some(p) => {
                p.handle.abort();
                tracing::trace!(ticket = p.ticket, "debounce timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Check if a timer is waiting
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_schedule_fires() {
        let debouncer = Debouncer::new(Duration::from_secs(3));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let fired = Arc::clone(&fired);
            debouncer.schedule(move || async move { fired.lock().push(i) });
            settle().await;
            advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert!(fired.lock().is_empty());
        assert!(debouncer.is_pending());

        advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(*fired.lock(), vec![2]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        debouncer.schedule(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn running_action_is_not_aborted_by_cancel() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        debouncer.schedule(move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            d.fetch_add(1, Ordering::SeqCst);
        });

        advance(Duration::from_millis(10)).await;
        settle().await;
        // Timer fired, action in flight.
        assert!(!debouncer.cancel());

        advance(Duration::from_millis(50)).await;
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
