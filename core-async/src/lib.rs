//! Async runtime layer for the vidshelf core.
//!
//! All core-* crates depend on this crate instead of reaching into Tokio for
//! task spawning, timers and synchronization. Keeping the runtime behind one
//! crate means the resolver and the playback orchestrator share a single
//! notion of "spawn", "sleep" and "cancel".
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeout and monotonic instants
//! - `sync`: Async-aware synchronization primitives and cancellation tokens
//! - `debounce`: Keyed, cancelable timer handles
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod debounce;
pub mod sync;
pub mod task;
pub mod time;

pub use debounce::Debouncer;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
