//! Cooperative cancellation for source adapters
//!
//! The pipeline holds one run-wide token and derives a child token per
//! adapter. Cancelling the run stops every adapter; cancelling a child
//! (on timeout) stops only that adapter. Adapters check between records;
//! records already sent stay in the graph.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: None,
        }
    }

    /// A token that is cancelled when either it or `self` is cancelled
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: Some(self.cancelled.clone()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.load(Ordering::Relaxed))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cloned_token_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn run_cancellation_reaches_every_child() {
        let run = CancellationToken::new();
        let a = run.child();
        let b = run.child();
        run.cancel();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn child_cancellation_stays_local() {
        let run = CancellationToken::new();
        let timed_out = run.child();
        let sibling = run.child();
        timed_out.cancel();
        assert!(timed_out.is_cancelled());
        assert!(!sibling.is_cancelled());
        assert!(!run.is_cancelled());
    }
}
