//! Pooled statement entries.

use std::fmt;

use crate::connection::{DriverError, RawStatement};
use crate::key::StatementKey;

/// Lifecycle state of a pooled entry.
///
/// An entry alternates between `Idle` (held by the cache) and `Active`
/// (borrowed). Destruction takes the entry by value through
/// [`CachedStatement::release`], so a destroyed entry cannot be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Held by the cache, not in any caller's hands.
    Idle,
    /// Borrowed; owned exclusively by one caller.
    Active,
}

/// One real underlying statement plus its owning key.
///
/// Entries move between the pool and borrowers by value, which is what
/// guarantees that at most one borrower holds an entry at a time.
pub struct CachedStatement {
    key: StatementKey,
    raw: Box<dyn RawStatement>,
    state: EntryState,
    activations: u64,
}

impl CachedStatement {
    /// Wrap a freshly prepared raw statement under its key.
    #[must_use]
    pub fn new(key: StatementKey, raw: Box<dyn RawStatement>) -> Self {
        Self {
            key,
            raw,
            state: EntryState::Idle,
            activations: 0,
        }
    }

    /// The key this entry was prepared for.
    #[must_use]
    pub fn key(&self) -> &StatementKey {
        &self.key
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// How many times this entry has been handed to a borrower.
    #[must_use]
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Access the raw driver statement.
    #[must_use]
    pub fn raw(&self) -> &dyn RawStatement {
        self.raw.as_ref()
    }

    /// Mutably access the raw driver statement.
    pub fn raw_mut(&mut self) -> &mut dyn RawStatement {
        self.raw.as_mut()
    }

    /// Mark the entry ready for a new borrower.
    pub fn activate(&mut self) {
        self.state = EntryState::Active;
        self.activations += 1;
    }

    /// Clear per-use state before the entry becomes reusable.
    ///
    /// The transition to `Idle` is recorded even when clearing fails; the
    /// failure propagates so the pool destroys the entry instead of
    /// recycling it.
    pub fn passivate(&mut self) -> Result<(), DriverError> {
        let cleared = self.raw.clear_parameters();
        self.state = EntryState::Idle;
        cleared
    }

    /// Truly close the underlying statement, consuming the entry.
    pub fn release(mut self) -> Result<(), DriverError> {
        tracing::debug!(sql = self.key.sql(), "releasing cached statement");
        self.raw.close()
    }
}

impl fmt::Debug for CachedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedStatement")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("activations", &self.activations)
            .finish_non_exhaustive()
    }
}
