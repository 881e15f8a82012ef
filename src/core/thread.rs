//! Single-writer discipline for the UI execution context.

use std::thread::{self, ThreadId};

/// Identity of the thread that owns the component graph and factory registry.
///
/// Every mutating operation calls [`UiThread::assert_current`]; mutating from
/// any other thread is a programming error and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiThread(ThreadId);

impl UiThread {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self(thread::current().id())
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.0
    }

    /// Panic unless called on the owning thread.
    #[track_caller]
    pub fn assert_current(&self, operation: &str) {
        assert!(
            self.is_current(),
            "`{operation}` must run on the UI thread ({:?}), called from {:?}",
            self.0,
            thread::current().id()
        );
    }
}
