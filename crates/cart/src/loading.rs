//! Observable busy flag with guaranteed release.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared loading flag.
///
/// UI code observes the flag to disable the triggering control while an
/// operation is in flight. The flag is only ever set through [`begin`],
/// which returns a guard that clears it on drop, so every exit path —
/// success, caught failure, or early return — releases it.
///
/// [`begin`]: LoadingFlag::begin
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while an operation holds the flag.
    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag and returns the guard that clears it.
    pub fn begin(&self) -> LoadingGuard {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(Arc::clone(&self.0))
    }
}

/// Clears the owning [`LoadingFlag`] when dropped.
#[derive(Debug)]
pub struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
