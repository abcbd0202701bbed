//! Caller-facing statement handle with close interception.
//!
//! A [`Statement`] looks like an ordinary prepared statement: everything
//! except close goes straight through to the raw driver statement. Close,
//! however, gives the entry back to the pool for reuse instead of releasing
//! the server-side resource — unless the pool rejects it, in which case the
//! handle falls back to a true release so nothing leaks.

use std::sync::Arc;

use stmt_pool::ReturnError;

use crate::cache::StatementPool;
use crate::connection::RawStatement;
use crate::entry::CachedStatement;
use crate::error::{Error, Result};
use crate::key::StatementKey;

/// A pooled statement handle.
///
/// Obtained from the prepare methods of
/// [`PoolingConnection`](crate::PoolingConnection). Per handle the lifecycle
/// is one-way: open until the first [`close`](Self::close), closed forever
/// after. Closing twice is a no-op; any other operation on a closed handle
/// fails with [`Error::AlreadyClosed`].
///
/// Dropping an open handle closes it best-effort, logging failures instead
/// of surfacing them; call `close` explicitly to observe errors.
pub struct Statement {
    /// `None` once the handle has been closed.
    entry: Option<CachedStatement>,
    /// The engine handle captured at prepare time, so a statement that was
    /// in flight during shutdown can still complete its return.
    pool: Arc<StatementPool>,
}

impl Statement {
    pub(crate) fn new(entry: CachedStatement, pool: Arc<StatementPool>) -> Self {
        Self {
            entry: Some(entry),
            pool,
        }
    }

    /// The key this statement is cached under.
    pub fn key(&self) -> Result<&StatementKey> {
        Ok(self.entry()?.key())
    }

    /// The underlying cache entry.
    pub fn entry(&self) -> Result<&CachedStatement> {
        self.entry.as_ref().ok_or(Error::AlreadyClosed)
    }

    /// Access the raw driver statement, e.g. to bind parameters or execute.
    pub fn raw(&self) -> Result<&dyn RawStatement> {
        Ok(self.entry()?.raw())
    }

    /// Mutably access the raw driver statement.
    pub fn raw_mut(&mut self) -> Result<&mut dyn RawStatement> {
        Ok(self
            .entry
            .as_mut()
            .ok_or(Error::AlreadyClosed)?
            .raw_mut())
    }

    /// Whether this handle has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.entry.is_none()
    }

    /// Close the statement, giving it back to the cache for reuse.
    ///
    /// If the pool rejects the return (it was shut down while this
    /// statement was out), the underlying statement is truly released
    /// instead. Calling close on an already closed handle is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(entry) = self.entry.take() else {
            return Ok(());
        };
        let key = entry.key().clone();
        match self.pool.give_back(&key, entry) {
            Ok(()) => Ok(()),
            Err(ReturnError::Closed(entry)) => {
                tracing::debug!(sql = key.sql(), "pool rejected return, releasing statement");
                entry.release().map_err(Error::Driver)
            }
            Err(ReturnError::Passivate(e)) => {
                // The pool already destroyed the entry; surface the cause.
                tracing::warn!(error = %e, "statement could not be passivated, destroyed");
                Err(Error::Driver(e))
            }
        }
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        if self.entry.is_some() {
            tracing::trace!("statement dropped without close, returning to pool");
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "failed to return dropped statement");
            }
        }
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}
