//! Time utilities: async sleep and deadline-bounded futures.
//!
//! - [`sleep`] parks the calling task on a one-shot reactor timer.
//! - [`timeout`] runs a future with a deadline, resolving to
//!   [`TimeError::Elapsed`] when the deadline wins.
//!
//! # Example
//!
//! ```ignore
//! use coopio::time::{sleep, timeout};
//! use std::time::Duration;
//!
//! async fn wait_briefly() {
//!     sleep(Duration::from_millis(50)).await;
//!
//!     let result = timeout(Duration::from_millis(10), sleep(Duration::from_secs(1))).await;
//!     assert!(result.is_err());
//! }
//! ```

pub mod sleep;
pub mod timeout;

pub use sleep::{Sleep, sleep};
pub use timeout::{Timeout, timeout};

use thiserror::Error;

/// Errors from time-bounded operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The deadline elapsed before the wrapped future completed.
    #[error("deadline elapsed before the future completed")]
    Elapsed,
}
