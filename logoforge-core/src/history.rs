//! # History
//!
//! Linear undo and redo over whole-scene [`Snapshot`]s. Recording a new state forgets every
//! redo-able state, so redo is only ever valid forward from the last real edit.

use std::num::NonZeroUsize;

use crate::scene::Snapshot;

#[derive(Debug, Default)]
pub struct History {
    /// Oldest first.
    past: Vec<Snapshot>,
    /// Oldest first, so the nearest redo is the *last* element.
    future: Vec<Snapshot>,
    /// Maximum length of `past`, or unbounded.
    limit: Option<NonZeroUsize>,
}
impl History {
    #[must_use]
    pub fn new(limit: Option<NonZeroUsize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.limit
    }
    /// Change the limit, dropping the oldest entries if there are now too many.
    pub fn set_limit(&mut self, limit: Option<NonZeroUsize>) {
        self.limit = limit;
        self.enforce_limit();
    }
    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            let excess = self.past.len().saturating_sub(limit.get());
            if excess > 0 {
                log::trace!("history over limit, forgetting {excess} oldest");
                self.past.drain(..excess);
            }
        }
    }
    /// Push the state from before a mutation. Clears redo.
    pub fn record(&mut self, current: Snapshot) {
        log::trace!(
            "record ({} past, {} future discarded)",
            self.past.len(),
            self.future.len()
        );
        self.past.push(current);
        self.future.clear();
        self.enforce_limit();
    }
    /// Step back. `current` becomes the nearest redo, and the returned snapshot is the new state.
    /// `None` if there's nothing to undo, and `current` is dropped unchanged.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.past.pop()?;
        self.future.push(current);
        log::trace!("undo ({} past, {} future)", self.past.len(), self.future.len());
        Some(previous)
    }
    /// Step forward. Symmetric with [`Self::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop()?;
        self.past.push(current);
        // Can't exceed the limit by more than the entry undo took away, but keep it tidy.
        self.enforce_limit();
        log::trace!("redo ({} past, {} future)", self.past.len(), self.future.len());
        Some(next)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
    /// Number of (undo, redo) steps available.
    #[must_use]
    pub fn len(&self) -> (usize, usize) {
        (self.past.len(), self.future.len())
    }
    /// Forget everything, e.g. when a different scene is loaded.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
