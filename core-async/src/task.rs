//! Task spawning and execution abstractions.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 42 });
//!     let result = handle.await.unwrap();
//!     assert_eq!(result, 42);
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, AbortHandle, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current Tokio runtime.
///
/// The spawned task may run on a different thread, so the future must be
/// `Send + 'static`.
///
/// # Panics
///
/// Panics when called outside of a Tokio runtime, like `tokio::spawn`.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Returns `true` when a Tokio runtime is available on the current thread.
///
/// Used by fire-and-forget paths that must degrade gracefully when invoked
/// from a synchronous context.
pub fn runtime_available() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
