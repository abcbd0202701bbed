//! Pool error types.

use std::fmt;

use thiserror::Error;

use crate::factory::FactoryError;

/// Errors that can occur while borrowing from or managing a keyed pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No capacity is available to satisfy a borrow.
    ///
    /// This is a retryable condition: capacity frees up when a borrower
    /// gives its object back.
    #[error("pool exhausted: {in_use} of {max} objects in use")]
    Exhausted {
        /// Objects currently counted against the exceeded limit.
        in_use: usize,
        /// The limit that was hit.
        max: usize,
    },

    /// The pool has been closed; no new borrows are accepted.
    #[error("pool is closed")]
    Closed,

    /// The object factory failed to create, activate, or destroy an object.
    #[error("object factory failed: {0}")]
    Factory(#[source] FactoryError),

    /// Invalid pool configuration.
    #[error("invalid pool configuration: {0}")]
    Config(String),
}

/// Errors returned when giving an object back to the pool.
///
/// A rejected object is handed back to the caller inside
/// [`ReturnError::Closed`] so the caller can release the underlying resource
/// itself; the pool never silently leaks a rejected object.
#[derive(Error)]
pub enum ReturnError<T> {
    /// The pool closed while the object was borrowed. The object is handed
    /// back untouched; the caller is responsible for releasing it.
    #[error("pool is closed, object handed back for release")]
    Closed(T),

    /// Passivation failed. The pool has already destroyed the object
    /// instead of recycling it.
    #[error("passivation failed, object destroyed")]
    Passivate(#[source] FactoryError),
}

impl<T> fmt::Debug for ReturnError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.debug_tuple("Closed").finish_non_exhaustive(),
            Self::Passivate(e) => f.debug_tuple("Passivate").field(e).finish(),
        }
    }
}
