//! # stmt-pool
//!
//! A generic keyed object pool with a factory-driven object lifecycle.
//!
//! Objects are pooled per key: borrowing with a key either reuses an idle
//! object previously created for that key or asks the
//! [`PooledObjectFactory`] to create a fresh one. The factory owns the whole
//! object lifecycle — creation, activation before handoff, passivation on
//! return, optional validation, and destruction.
//!
//! The pool is fail-fast: a borrow that finds no idle object and no free
//! capacity returns [`PoolError::Exhausted`] immediately rather than waiting.
//!
//! ## Example
//!
//! ```rust,ignore
//! use stmt_pool::{KeyedObjectPool, KeyedPool, PoolConfig};
//!
//! let config = PoolConfig::new()
//!     .max_total(32)
//!     .max_total_per_key(4);
//!
//! let pool = KeyedPool::new(factory, config)?;
//!
//! let obj = pool.borrow("some-key".to_string())?;
//! // Use the object...
//! pool.give_back(&"some-key".to_string(), obj)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod factory;
pub mod pool;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::{PoolError, ReturnError};

// Factory contract
pub use factory::{FactoryError, PooledObjectFactory};

// Pool types
pub use pool::{KeyedObjectPool, KeyedPool, PoolStats};
