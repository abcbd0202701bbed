//! Collaborator traits for the underlying driver connection.
//!
//! The cache is driver-agnostic: it only needs the connection to materialize
//! raw statement handles for a given configuration, report its current
//! catalog, and close. Real drivers implement these traits; tests use
//! in-memory fakes.

use crate::key::StatementConfig;

/// Boxed error type for driver-level failures.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The driver-level connection the cache sits on top of.
pub trait Connection: Send + Sync {
    /// Materialize a prepared statement for the given text and configuration.
    fn prepare(
        &self,
        sql: &str,
        config: &StatementConfig,
    ) -> Result<Box<dyn RawStatement>, DriverError>;

    /// Materialize a callable (stored-procedure) statement.
    fn prepare_call(
        &self,
        sql: &str,
        config: &StatementConfig,
    ) -> Result<Box<dyn RawStatement>, DriverError>;

    /// The connection's current catalog, when one is set.
    ///
    /// May fail if the metadata is transiently unavailable; the cache treats
    /// a failure as "no catalog" rather than failing the prepare.
    fn current_catalog(&self) -> Result<Option<String>, DriverError>;

    /// Close the underlying connection.
    fn close(&self) -> Result<(), DriverError>;
}

/// A raw driver-level statement handle.
pub trait RawStatement: Send {
    /// Clear any bound parameter state so the next user starts clean.
    fn clear_parameters(&mut self) -> Result<(), DriverError>;

    /// Truly close the statement, releasing the server-side resource.
    fn close(&mut self) -> Result<(), DriverError>;
}
