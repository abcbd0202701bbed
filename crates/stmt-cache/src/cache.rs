//! The caching connection wrapper.
//!
//! [`PoolingConnection`] sits between callers and a driver
//! [`Connection`]. Its prepare entry points translate each request into a
//! [`StatementKey`] and a pool borrow, so a statement prepared earlier with
//! identical text and configuration is reused instead of re-prepared. It is
//! also the pool's [`PooledObjectFactory`]: the pool calls back into it to
//! create, activate, passivate, validate, and destroy entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use stmt_pool::{
    FactoryError, KeyedObjectPool, KeyedPool, PoolConfig, PoolError, PooledObjectFactory,
};

use crate::connection::Connection;
use crate::entry::CachedStatement;
use crate::error::{Error, Result};
use crate::key::{StatementConfig, StatementKey, StatementKind, normalize_sql};
use crate::statement::Statement;

/// The pool engine type the cache borrows statements from.
pub type StatementPool = dyn KeyedObjectPool<StatementKey, CachedStatement>;

/// A connection wrapper that caches prepared and callable statements.
///
/// Statements returned by the prepare methods look and behave like freshly
/// prepared statements; closing one gives it back to the cache for reuse.
///
/// # Example
///
/// ```rust,ignore
/// use stmt_cache::PoolingConnection;
/// use stmt_pool::PoolConfig;
///
/// let cache = PoolingConnection::with_pool(driver_conn, PoolConfig::new())?;
///
/// let mut stmt = cache.prepare("SELECT name FROM users WHERE id = ?")?;
/// // Use the statement...
/// stmt.close()?;
///
/// // Same text and configuration: reuses the server-side statement.
/// let stmt = cache.prepare("SELECT name FROM users WHERE id = ?")?;
/// ```
pub struct PoolingConnection {
    conn: Arc<dyn Connection>,
    /// Guarded pool cell. `None` before a pool is attached and after
    /// shutdown; `shutdown` and the prepare-side reads synchronize here.
    pool: Mutex<Option<Arc<StatementPool>>>,
    closed: AtomicBool,
}

impl PoolingConnection {
    /// Wrap a driver connection. No statement pool is attached yet; attach
    /// one with [`set_statement_pool`](Self::set_statement_pool) or use
    /// [`with_pool`](Self::with_pool).
    #[must_use]
    pub fn new(conn: Arc<dyn Connection>) -> Arc<Self> {
        Arc::new(Self {
            conn,
            pool: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Wrap a driver connection and wire up a [`KeyedPool`] engine with the
    /// given configuration.
    pub fn with_pool(
        conn: Arc<dyn Connection>,
        config: PoolConfig,
    ) -> std::result::Result<Arc<Self>, PoolError> {
        let cache = Self::new(conn);
        let factory: Arc<dyn PooledObjectFactory<StatementKey, CachedStatement>> = cache.clone();
        let pool: Arc<StatementPool> = Arc::new(KeyedPool::new(factory, config)?);
        cache.set_statement_pool(pool);
        Ok(cache)
    }

    /// Attach the statement pool this connection borrows from.
    pub fn set_statement_pool(&self, pool: Arc<StatementPool>) {
        *self.pool.lock() = Some(pool);
    }

    /// Prepare a statement with no additional configuration.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        self.prepare_with(sql, StatementConfig::Default)
    }

    /// Prepare a statement with an explicit configuration shape.
    pub fn prepare_with(&self, sql: &str, config: StatementConfig) -> Result<Statement> {
        self.borrow_statement(sql, StatementKind::Prepared, config)
    }

    /// Prepare a callable (stored-procedure) statement.
    pub fn prepare_call(&self, sql: &str) -> Result<Statement> {
        self.prepare_call_with(sql, StatementConfig::Default)
    }

    /// Prepare a callable statement with an explicit configuration shape.
    pub fn prepare_call_with(&self, sql: &str, config: StatementConfig) -> Result<Statement> {
        self.borrow_statement(sql, StatementKind::Callable, config)
    }

    /// Whether the connection has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut down the cache and release the underlying connection.
    ///
    /// Detaches the statement pool so no new prepare can borrow from it,
    /// closes the detached pool (destroying every idle statement — active
    /// statements are released when their holders close them), and then
    /// releases the driver connection and marks this connection closed
    /// regardless of whether the pool close succeeded. The first failure is
    /// reported once both releases have been attempted.
    ///
    /// Repeated or concurrent calls are safe; later callers find the pool
    /// already detached and return `Ok`.
    pub fn shutdown(&self) -> Result<()> {
        // The whole detach-and-close sequence runs under the pool cell's
        // lock, mutually exclusive with the reads in the prepare path. A
        // second caller finds the cell empty and the closed flag set.
        let mut cell = self.pool.lock();
        let detached = cell.take();
        if detached.is_none() && self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        tracing::debug!("shutting down statement cache");
        let pool_result = match detached {
            Some(pool) => pool.close().map_err(Error::PoolClose),
            None => Ok(()),
        };

        // The connection is released and the closed flag set even when the
        // pool failed to close.
        let conn_result = self.conn.close().map_err(Error::Driver);
        self.closed.store(true, Ordering::Release);

        pool_result.and(conn_result)
    }

    fn borrow_statement(
        &self,
        sql: &str,
        kind: StatementKind,
        config: StatementConfig,
    ) -> Result<Statement> {
        if normalize_sql(sql).is_empty() {
            return Err(Error::InvalidKey);
        }

        let pool = {
            let guard = self.pool.lock();
            guard.clone().ok_or(Error::CacheClosed)?
        };

        let key = self.make_key(sql, kind, config);
        tracing::trace!(sql = key.sql(), kind = ?kind, "preparing statement via cache");

        match pool.borrow(key) {
            Ok(entry) => Ok(Statement::new(entry, pool)),
            Err(e @ PoolError::Exhausted { .. }) => Err(Error::PoolExhausted(e)),
            Err(e) => Err(Error::BorrowFailed(e)),
        }
    }

    /// Derive the cache key for a prepare request.
    ///
    /// The catalog read is non-fatal enrichment: when the lookup fails the
    /// key is built without a catalog rather than failing the prepare.
    fn make_key(&self, sql: &str, kind: StatementKind, config: StatementConfig) -> StatementKey {
        let catalog = match self.conn.current_catalog() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::debug!(error = %e, "catalog lookup failed, building key without catalog");
                None
            }
        };
        StatementKey::new(sql, catalog, kind, config)
    }
}

impl PooledObjectFactory<StatementKey, CachedStatement> for PoolingConnection {
    fn create(&self, key: &StatementKey) -> std::result::Result<CachedStatement, FactoryError> {
        if key.sql().is_empty() {
            return Err(Box::new(Error::InvalidKey));
        }
        let raw = match key.kind() {
            StatementKind::Prepared => self.conn.prepare(key.sql(), key.config())?,
            StatementKind::Callable => self.conn.prepare_call(key.sql(), key.config())?,
        };
        tracing::debug!(sql = key.sql(), kind = ?key.kind(), "prepared new statement");
        Ok(CachedStatement::new(key.clone(), raw))
    }

    fn activate(
        &self,
        _key: &StatementKey,
        entry: &mut CachedStatement,
    ) -> std::result::Result<(), FactoryError> {
        entry.activate();
        Ok(())
    }

    fn passivate(
        &self,
        _key: &StatementKey,
        entry: &mut CachedStatement,
    ) -> std::result::Result<(), FactoryError> {
        entry.passivate()
    }

    /// Liveness checking is delegated to collaborators; entries are always
    /// reported valid here.
    fn validate(&self, _key: &StatementKey, _entry: &CachedStatement) -> bool {
        true
    }

    fn destroy(
        &self,
        _key: &StatementKey,
        entry: CachedStatement,
    ) -> std::result::Result<(), FactoryError> {
        entry.release()
    }
}

impl std::fmt::Debug for PoolingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolingConnection")
            .field("pool_attached", &self.pool.lock().is_some())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
