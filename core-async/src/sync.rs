//! Synchronization primitives.
//!
//! Async-aware primitives come from `tokio::sync`. Short critical sections
//! that never cross an `.await` should use [`BlockingMutex`] instead, which is
//! cheaper and cannot be poisoned.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let (tx, rx) = watch::channel(0u32);
//! tx.send_replace(1);
//! assert_eq!(*rx.borrow(), 1);
//! token.cancel();
//! assert!(token.is_cancelled());
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::CancellationToken;

/// Non-async mutex for state that is only touched between suspension points.
pub type BlockingMutex<T> = parking_lot::Mutex<T>;
