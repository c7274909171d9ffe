//! Bounded free-list of read buffers.
//!
//! Read operations borrow a `BUFSIZ`-sized scratch buffer for the duration
//! of one syscall batch and return it on every exit path via the guard's
//! `Drop`. The pool is capped at a small fixed size; overflow buffers are
//! simply freed. Correctness never depends on pool residency.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Size of one pooled buffer, the platform stdio buffer size.
pub(crate) const BUF_SIZE: usize = libc::BUFSIZ as usize;

/// Maximum number of idle buffers retained.
const MAX_POOLED: usize = 8;

static POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

/// A pooled buffer, returned to the pool on drop.
pub(crate) struct PooledBuf {
    buf: Vec<u8>,
}

/// Borrows a buffer from the pool, allocating when the pool is empty.
pub(crate) fn acquire() -> PooledBuf {
    let buf = POOL
        .lock()
        .unwrap()
        .pop()
        .unwrap_or_else(|| vec![0; BUF_SIZE]);

    PooledBuf { buf }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let mut pool = POOL.lock().unwrap();

        if pool.len() < MAX_POOLED {
            pool.push(std::mem::take(&mut self.buf));
        }
    }
}

impl Deref for PooledBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}
