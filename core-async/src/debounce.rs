//! Keyed, cancelable debounce timers.
//!
//! A [`Debouncer`] owns at most one pending timer per key. Scheduling a new
//! task for a key aborts the previous one, so only the last request inside the
//! quiet window runs. Dropping the debouncer (or calling
//! [`Debouncer::cancel_all`]) aborts every pending timer, which is what owners
//! rely on for cancel-on-unmount semantics.
//!
//! ```rust
//! use core_async::debounce::Debouncer;
//! use core_async::time::Duration;
//!
//! # async fn example() {
//! let debouncer: Debouncer<&'static str> = Debouncer::new(Duration::from_millis(150));
//! debouncer.schedule("visibility", async { println!("settled") });
//! debouncer.schedule("visibility", async { println!("only this one runs") });
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::sync::BlockingMutex;
use crate::task::{self, JoinHandle};
use crate::time::{sleep, Duration};

struct PendingTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

type PendingMap<K> = Arc<BlockingMutex<HashMap<K, PendingTimer>>>;

/// Debounced task scheduler keyed by `K`.
pub struct Debouncer<K> {
    delay: Duration,
    pending: PendingMap<K>,
    next_ticket: AtomicU64,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Create a debouncer whose [`schedule`](Self::schedule) uses `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(BlockingMutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Default quiet window.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` to run after the default delay, replacing any pending
    /// task for `key`.
    pub fn schedule<F>(&self, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_after(key, self.delay, task);
    }

    /// Schedule `task` to run after `delay`, replacing any pending task for
    /// `key`.
    pub fn schedule_after<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let timer_key = key.clone();

        // The map lock is held while spawning so a zero-delay timer cannot
        // observe the map before its own entry is inserted.
        let mut map = self.pending.lock();
        let handle = task::spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }

            {
                let mut map = pending.lock();
                match map.get(&timer_key) {
                    Some(current) if current.ticket == ticket => {
                        map.remove(&timer_key);
                    }
                    _ => return,
                }
            }

            task.await;
        });

        if let Some(previous) = map.insert(key, PendingTimer { ticket, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancel the pending task for `key`. Returns `true` when one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.lock().remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task.
    pub fn cancel_all(&self) {
        let drained: Vec<PendingTimer> = self.pending.lock().drain().map(|(_, t)| t).collect();
        for timer in drained {
            timer.handle.abort();
        }
    }

    /// Returns `true` while a task for `key` is waiting for its delay.
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().contains_key(key)
    }

    /// Number of keys with a pending task.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, timer) in self.pending.lock().drain() {
            timer.handle.abort();
        }
    }
}

impl<K> fmt::Debug for Debouncer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_last_schedule_wins() {
        let debouncer = Debouncer::new(Duration::from_millis(150));
        let hits = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=3 {
            let hits = Arc::clone(&hits);
            let last = Arc::clone(&last);
            debouncer.schedule("scroll", async move {
                hits.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(50)).await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 3);
        assert!(!debouncer.is_pending(&"scroll"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        debouncer.schedule(1u8, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending(&1));
        assert!(debouncer.cancel(&1));
        assert!(!debouncer.cancel(&1));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let hits = Arc::new(AtomicUsize::new(0));

        for key in ["hover", "visibility"] {
            let counter = Arc::clone(&hits);
            debouncer.schedule(key, async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(debouncer.pending_count(), 2);

        debouncer.cancel(&"hover");
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let debouncer = Debouncer::new(Duration::from_millis(100));
            let counter = Arc::clone(&hits);
            debouncer.schedule((), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_delay_runs() {
        let debouncer = Debouncer::new(Duration::ZERO);
        let (tx, rx) = tokio::sync::oneshot::channel();
        debouncer.schedule("now", async move {
            let _ = tx.send(7);
        });
        assert_eq!(rx.await.unwrap(), 7);
    }
}
