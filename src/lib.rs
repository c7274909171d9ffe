//! Single-threaded cooperative runtime with reactor-backed file I/O.
//!
//! This crate pairs a user-space scheduler with an epoll reactor and a
//! non-blocking file façade: blocking-style read/write/seek operations
//! suspend the calling task instead of blocking the process, and resume
//! when the descriptor reports readiness.
//!
//! # Architecture
//!
//! - **Runtime**: owns the scheduler state and runs futures via `block_on`
//! - **Reactor**: epoll-backed demultiplexer with one-shot watches and timers
//! - **Wait index**: parked tasks keyed by event kind and descriptor
//! - **Task**: a spawned future with waker integration and a join handle
//! - **File**: non-blocking file handle with line/number/byte read specs
//! - **RuntimeBuilder**: fluent builder with I/O and filesystem feature gates
//!
//! # Example
//!
//! ```ignore
//! use coopio::{Runtime, Task, fs::File};
//!
//! let mut rt = Runtime::new();
//!
//! rt.block_on(async {
//!     let handle = Task::spawn(async {
//!         let file = File::open("/etc/hostname", "r").await?;
//!         file.read_line().await
//!     });
//!
//!     let line = handle.await;
//!     println!("{line:?}");
//! });
//! ```

mod builder;
mod error;
pub mod fs;
mod reactor;
mod runtime;
mod task;
pub mod time;

pub use builder::RuntimeBuilder;
pub use error::{Error, Result};
pub use reactor::future::{Readable, Writable, readable, writable};
pub use runtime::Runtime;
pub use runtime::yield_now::yield_now;
pub use task::{JoinHandle, Task};
pub use time::{TimeError, sleep, timeout};
