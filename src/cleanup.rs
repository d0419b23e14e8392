//! Process cleanup registry
//!
//! Holds callbacks that undo temporary on-disk mutations (a manifest
//! override, the cache directory) if the process is interrupted while they
//! are live. The registry is owned by the link command and passed down
//! explicitly; nothing here is process-global. Each callback runs at most
//! once, in registration order.

use std::sync::{Arc, Mutex};

type CleanupFn = Box<dyn FnOnce() + Send + 'static>;

/// Handle for unregistering a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupId(u64);

/// Registry of pending cleanup callbacks
#[derive(Clone, Default)]
pub struct CleanupRegistry {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    callbacks: Vec<(u64, CleanupFn)>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays pending until unregistered or run
    pub fn register(&self, callback: impl FnOnce() + Send + 'static) -> CleanupId {
        let mut inner = self.inner.lock().expect("cleanup registry poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.callbacks.push((id, Box::new(callback)));
        CleanupId(id)
    }

    /// Remove a callback without running it. Returns whether it was still
    /// pending; `false` means it already ran (or was never registered).
    pub fn unregister(&self, id: CleanupId) -> bool {
        let mut inner = self.inner.lock().expect("cleanup registry poisoned");
        let before = inner.callbacks.len();
        inner.callbacks.retain(|(candidate, _)| *candidate != id.0);
        inner.callbacks.len() != before
    }

    /// Run and drain every pending callback, in registration order
    ///
    /// The callbacks are taken out of the registry before any of them runs,
    /// so a concurrent `run_all` cannot execute one twice.
    pub fn run_all(&self) {
        let callbacks = {
            let mut inner = self.inner.lock().expect("cleanup registry poisoned");
            std::mem::take(&mut inner.callbacks)
        };
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Number of pending callbacks
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .expect("cleanup registry poisoned")
            .callbacks
            .len()
    }
}
