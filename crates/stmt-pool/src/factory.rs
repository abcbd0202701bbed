//! Object lifecycle factory contract.
//!
//! The pool drives every pooled object through the factory: objects are
//! created on demand, activated just before handoff to a borrower,
//! passivated when given back, optionally validated before reuse, and
//! destroyed when evicted or when the pool closes.

/// Boxed error type for factory callbacks.
///
/// Factories wrap arbitrary driver or resource errors; the pool reports them
/// through [`PoolError::Factory`](crate::PoolError::Factory) without
/// inspecting them.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lifecycle callbacks for objects managed by a keyed pool.
///
/// Implementations must be safe to call from multiple threads; the pool
/// invokes callbacks outside its internal lock.
pub trait PooledObjectFactory<K, T>: Send + Sync {
    /// Create a new object for the given key.
    fn create(&self, key: &K) -> Result<T, FactoryError>;

    /// Prepare an object for handoff to a borrower.
    ///
    /// Called on every borrow, for freshly created and reused objects alike.
    fn activate(&self, key: &K, obj: &mut T) -> Result<(), FactoryError>;

    /// Clear per-use state before an object becomes reusable.
    ///
    /// Called on every return. A failure here causes the pool to destroy the
    /// object instead of recycling it.
    fn passivate(&self, key: &K, obj: &mut T) -> Result<(), FactoryError>;

    /// Check whether an idle object is still usable.
    ///
    /// Only consulted when the pool is configured with
    /// [`test_on_borrow`](crate::PoolConfig::test_on_borrow). An object that
    /// fails validation is destroyed and replaced.
    fn validate(&self, key: &K, obj: &T) -> bool;

    /// Permanently release the resource behind an object.
    fn destroy(&self, key: &K, obj: T) -> Result<(), FactoryError>;
}
