//! Cooperative cancellation for long-running store operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// A cheap, cloneable cancellation flag threaded through public operations.
///
/// Honored at transaction and iterator boundaries (opening a read/write
/// transaction, stepping a prefix scan, starting the next batch of a bulk
/// drop) — never mid-batch on the hot path, per the concurrency model.
#[derive(Clone, Debug)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Returns a token that can never be cancelled, for call sites that
    /// don't need cooperative cancellation.
    pub fn none() -> Self {
        Self::new()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(GraphError::Cancelled)` if cancellation has been requested.
    pub(crate) fn check(&self, op: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(GraphError::Cancelled(op.to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
