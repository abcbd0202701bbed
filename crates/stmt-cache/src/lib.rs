//! # stmt-cache
//!
//! A prepared/callable-statement cache layered over a single logical
//! database connection.
//!
//! Re-preparing a statement against a server is expensive (parse, plan,
//! bind metadata). [`PoolingConnection`] transparently reuses previously
//! prepared statements created with identical text and configuration while
//! presenting an interface indistinguishable from "always prepare fresh":
//! the prepare methods hand out [`Statement`] handles whose close gives the
//! underlying statement back to the cache instead of releasing it.
//!
//! Statement identity is a [`StatementKey`]: normalized text, optional
//! catalog, prepared-vs-callable kind, and one [`StatementConfig`]
//! configuration shape. Keys that a server would treat as requiring the
//! same statement metadata compare equal; any metadata-affecting difference
//! produces a distinct cache entry.
//!
//! The cache sits on the keyed-pool engine from the `stmt-pool` crate and
//! implements its [`PooledObjectFactory`](stmt_pool::PooledObjectFactory)
//! lifecycle contract. Drivers plug in through the [`Connection`] and
//! [`RawStatement`] traits.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stmt_cache::PoolingConnection;
//! use stmt_pool::PoolConfig;
//!
//! let cache = PoolingConnection::with_pool(Arc::new(driver_conn), PoolConfig::new())?;
//!
//! let mut stmt = cache.prepare("SELECT name FROM users WHERE id = ?")?;
//! // bind and execute through stmt.raw_mut() ...
//! stmt.close()?; // back to the cache, not released
//!
//! // Identical text and configuration: no second server-side prepare.
//! let stmt = cache.prepare("SELECT name FROM users WHERE id = ?")?;
//!
//! cache.shutdown()?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod connection;
pub mod entry;
pub mod error;
pub mod key;
pub mod statement;

// Error types
pub use error::{Error, Result};

// Statement identity
pub use key::{
    AutoGeneratedKeys, Concurrency, Holdability, ResultSetType, StatementConfig, StatementKey,
    StatementKind,
};

// Collaborator traits
pub use connection::{Connection, DriverError, RawStatement};

// Cache types
pub use cache::{PoolingConnection, StatementPool};
pub use entry::{CachedStatement, EntryState};
pub use statement::Statement;
