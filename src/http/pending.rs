//! Callers suspended while a credential refresh is in flight.

use std::collections::VecDeque;

/// Result of one refresh cycle as seen by a suspended caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Carries the new access token.
    Renewed(String),
    Failed,
    /// The caller performing the refresh went away before it finished.
    Abandoned,
}

type Continuation = Box<dyn FnOnce(RefreshOutcome) + Send>;

/// FIFO queue of continuations, each invoked exactly once when drained.
#[derive(Default)]
pub struct PendingQueue {
    waiters: VecDeque<Continuation>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, continuation: F)
    where
        F: FnOnce(RefreshOutcome) + Send + 'static,
    {
        self.waiters.push_back(Box::new(continuation));
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Invokes every continuation in enqueue order, consuming the queue.
    pub fn drain(self, outcome: RefreshOutcome) -> usize {
        let count = self.waiters.len();
        for continuation in self.waiters {
            continuation(outcome.clone());
        }
        count
    }
}

impl std::fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingQueue")
            .field("waiters", &self.waiters.len())
            .finish()
    }
}
