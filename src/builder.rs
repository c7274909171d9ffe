//! Runtime configuration.

use crate::reactor::DEFAULT_EVENT_CAPACITY;
use crate::runtime::Runtime;
use crate::runtime::context::Features;

/// Configures and builds a [`Runtime`].
///
/// A builder starts from a bare scheduler: tasks and yields work, but
/// nothing that needs the reactor does. The gates are enforced lazily —
/// building without a feature costs nothing, and the first API call that
/// needs the missing feature panics with a hint naming the builder method
/// to call. [`Runtime::new`] is the everything-on shorthand.
///
/// # Example
/// ```ignore
/// let rt = RuntimeBuilder::new()
///     .enable_fs()
///     .event_capacity(256)
///     .build();
/// ```
pub struct RuntimeBuilder {
    features: Features,
    event_capacity: usize,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder for a bare scheduler with every gate closed.
    pub fn new() -> Self {
        Self {
            features: Features {
                io_enabled: false,
                fs_enabled: false,
            },
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Opens the I/O gate: fd yields ([`readable`](crate::readable),
    /// [`writable`](crate::writable)) and reactor timers.
    pub fn enable_io(mut self) -> Self {
        self.features.io_enabled = true;
        self
    }

    /// Opens the filesystem gate: file handles, subprocess pipes, and the
    /// standard streams.
    pub fn enable_fs(mut self) -> Self {
        self.features.fs_enabled = true;
        self
    }

    /// Sets how many readiness events one reactor pump can deliver at once.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Builds the configured [`Runtime`].
    ///
    /// File operations suspend through reactor watches, so the filesystem
    /// gate opens the I/O gate with it.
    pub fn build(self) -> Runtime {
        let features = Features {
            io_enabled: self.features.io_enabled || self.features.fs_enabled,
            fs_enabled: self.features.fs_enabled,
        };

        Runtime::with_config(features, self.event_capacity)
    }
}
