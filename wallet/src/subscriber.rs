//! # The Subscriber
//!
//! Client-side follower of a transaction tree. Given a root report from
//! [`Ledger::send_external`](crate::ledger::Ledger::send_external), a
//! [`Trace`] walks every descendant transaction the root triggered and
//! either waits for the walk to finish or folds an accumulator over it.
//!
//! The ledger embeds children directly in the report, so the walk is
//! over in-memory data; the API stays async because that is the shape a
//! follower over a live environment has, and callers should not care
//! which one they got.

use tracing::debug;

use crate::ledger::Transaction;

/// Issues traces over transaction trees.
#[derive(Debug, Clone, Default)]
pub struct Subscriber {
    _private: (),
}

impl Subscriber {
    /// Creates a subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a trace rooted at `tx`.
    pub fn trace<'a>(&self, tx: &'a Transaction) -> Trace<'a> {
        Trace { root: tx }
    }
}

/// A pending walk over one transaction tree.
pub struct Trace<'a> {
    root: &'a Transaction,
}

impl<'a> Trace<'a> {
    /// Waits until every transaction the root triggered has been seen.
    pub async fn finished(self) {
        let count = self.fold(0usize, |n, _| n + 1).await;
        debug!(root = %self.root.id, descendants = count, "trace finished");
    }

    /// Folds `f` over every *descendant* of the root, depth-first in
    /// message order. The root itself is not visited: the caller already
    /// holds it.
    pub async fn fold<T, F>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, &Transaction) -> T,
    {
        // One yield so a trace behaves like the awaitable it claims to
        // be even when the tree is already local.
        tokio::task::yield_now().await;

        let mut acc = init;
        let mut stack: Vec<&Transaction> = self.root.children.iter().rev().collect();
        while let Some(tx) = stack.pop() {
            acc = f(acc, tx);
            stack.extend(tx.children.iter().rev());
        }
        acc
    }
}
