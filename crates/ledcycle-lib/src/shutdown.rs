//! Termination request shared between the dispatch loop and signal delivery.
//!
//! This is the only state that crosses an execution-context boundary. The
//! signal side may do nothing but [`TerminationFlag::request`]: a single
//! atomic store. No logging, no allocation, no peripheral access there.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once, never cleared. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop at the top of its next iteration.
    ///
    /// Async-signal-safe: performs one atomic store and nothing else.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        assert!(!TerminationFlag::new().is_requested());
    }

    #[test]
    fn clones_share_state() {
        let flag = TerminationFlag::new();
        let signal_side = flag.clone();
        signal_side.request();
        assert!(flag.is_requested());
    }

    #[test]
    fn request_is_idempotent() {
        let flag = TerminationFlag::new();
        flag.request();
        flag.request();
        assert!(flag.is_requested());
    }

    #[test]
    fn visible_across_threads() {
        let flag = TerminationFlag::new();
        let remote = flag.clone();
        std::thread::spawn(move || remote.request()).join().unwrap();
        assert!(flag.is_requested());
    }
}
