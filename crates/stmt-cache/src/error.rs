//! Statement cache error types.

use thiserror::Error;

use stmt_pool::PoolError;

use crate::connection::DriverError;

/// A specialized `Result` type for statement cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the statement cache.
#[derive(Debug, Error)]
pub enum Error {
    /// A prepare or create was attempted with a missing or malformed key
    /// (for example, statement text that is empty after normalization).
    /// Fatal to that call, not to the cache.
    #[error("statement key is missing or malformed")]
    InvalidKey,

    /// No pool capacity was available to satisfy the prepare. Retryable:
    /// capacity frees up when another statement is closed.
    #[error("statement pool exhausted")]
    PoolExhausted(#[source] PoolError),

    /// The pool engine failed to hand out a statement for a reason other
    /// than exhaustion. Wraps the underlying cause.
    #[error("failed to borrow statement from pool")]
    BorrowFailed(#[source] PoolError),

    /// A prepare was attempted after the cache was shut down, or before a
    /// statement pool was attached.
    #[error("statement cache is closed")]
    CacheClosed,

    /// An operation other than close was attempted on a closed statement.
    #[error("statement is already closed")]
    AlreadyClosed,

    /// The underlying driver connection or statement failed.
    #[error("driver error: {0}")]
    Driver(#[source] DriverError),

    /// The pool engine reported a failure while being closed during
    /// shutdown. The underlying connection was still released.
    #[error("failed to close statement pool")]
    PoolClose(#[source] PoolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_wraps_pool_error() {
        let err = Error::PoolExhausted(PoolError::Exhausted { in_use: 1, max: 1 });
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("pool exhausted: 1 of 1 objects in use")
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::CacheClosed.to_string(), "statement cache is closed");
        assert_eq!(
            Error::AlreadyClosed.to_string(),
            "statement is already closed"
        );
    }
}
