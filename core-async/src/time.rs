//! Time-related abstractions.
//!
//! Re-exports Tokio's timer wheel so that tests can drive time
//! deterministically with `tokio::time::pause()` / `advance()`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     println!("Took {:?}", start.elapsed());
//! }
//! ```

pub use tokio::time::{error::Elapsed, sleep, sleep_until, timeout, Instant, Sleep, Timeout};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
