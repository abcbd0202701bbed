//! Keyed object pool implementation.
//!
//! [`KeyedPool`] keeps one idle list per key and enforces per-key and total
//! capacity limits. All object lifecycle work is delegated to a
//! [`PooledObjectFactory`]; factory callbacks run outside the pool's internal
//! lock so a slow creation never stalls unrelated borrows.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::error::{PoolError, ReturnError};
use crate::factory::PooledObjectFactory;

/// Capability contract of a keyed object pool.
///
/// Borrowed objects are owned exclusively by the borrower until given back;
/// the pool never hands the same object to two borrowers.
pub trait KeyedObjectPool<K, T>: Send + Sync {
    /// Borrow an object for the given key, reusing an idle one if available.
    fn borrow(&self, key: K) -> Result<T, PoolError>;

    /// Give a borrowed object back for potential reuse.
    ///
    /// On [`ReturnError::Closed`] the object is handed back to the caller,
    /// which must release the underlying resource itself.
    fn give_back(&self, key: &K, obj: T) -> Result<(), ReturnError<T>>;

    /// Destroy a borrowed object instead of returning it.
    fn invalidate(&self, key: &K, obj: T) -> Result<(), PoolError>;

    /// Close the pool, destroying every idle object.
    ///
    /// Borrowed objects are not touched; they are destroyed or handed back
    /// when their borrowers eventually return them. Closing an already
    /// closed pool is a no-op.
    fn close(&self) -> Result<(), PoolError>;

    /// Whether the pool has been closed.
    fn is_closed(&self) -> bool;

    /// Number of objects currently borrowed.
    fn num_active(&self) -> usize;

    /// Number of idle objects currently cached.
    fn num_idle(&self) -> usize;
}

/// Per-key bookkeeping: borrowed count plus the idle list.
struct KeySlot<T> {
    active: usize,
    idle: VecDeque<T>,
}

impl<T> Default for KeySlot<T> {
    fn default() -> Self {
        Self {
            active: 0,
            idle: VecDeque::new(),
        }
    }
}

struct PoolState<K, T> {
    slots: HashMap<K, KeySlot<T>>,
    total_active: usize,
    total_idle: usize,
    closed: bool,
}

/// Internal counters, snapshot via [`KeyedPool::stats`].
#[derive(Debug, Default, Clone)]
struct StatsInner {
    created: u64,
    destroyed: u64,
    borrows: u64,
    returns: u64,
    idle_hits: u64,
}

/// A snapshot of pool activity counters.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Objects created by the factory.
    pub created: u64,
    /// Objects destroyed (eviction, invalidation, close).
    pub destroyed: u64,
    /// Successful borrows.
    pub borrows: u64,
    /// Successful returns.
    pub returns: u64,
    /// Borrows satisfied from the idle list.
    pub idle_hits: u64,
}

impl PoolStats {
    /// Fraction of borrows satisfied without creating a new object.
    #[must_use]
    pub fn idle_hit_rate(&self) -> f64 {
        if self.borrows == 0 {
            return 0.0;
        }
        self.idle_hits as f64 / self.borrows as f64
    }
}

/// A keyed object pool with per-key idle lists and capacity limits.
///
/// Borrowing is fail-fast: when both the per-key and total limits are
/// reached, [`PoolError::Exhausted`] is returned immediately.
pub struct KeyedPool<K, T> {
    factory: Arc<dyn PooledObjectFactory<K, T>>,
    config: PoolConfig,
    state: Mutex<PoolState<K, T>>,
    stats: Mutex<StatsInner>,
}

impl<K, T> KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send,
    T: Send,
{
    /// Create a new pool backed by the given factory.
    pub fn new(
        factory: Arc<dyn PooledObjectFactory<K, T>>,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        tracing::info!(
            max_total = config.max_total,
            max_total_per_key = config.max_total_per_key,
            "keyed pool created"
        );

        Ok(Self {
            factory,
            config,
            state: Mutex::new(PoolState {
                slots: HashMap::new(),
                total_active: 0,
                total_idle: 0,
                closed: false,
            }),
            stats: Mutex::new(StatsInner::default()),
        })
    }

    /// Get a snapshot of the pool's activity counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let inner = self.stats.lock();
        PoolStats {
            created: inner.created,
            destroyed: inner.destroyed,
            borrows: inner.borrows,
            returns: inner.returns,
            idle_hits: inner.idle_hits,
        }
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Reserve an active slot for `key`, or pop an idle object.
    ///
    /// Returns `Ok(Some(obj))` for an idle hit, `Ok(None)` when a fresh
    /// object must be created into the reserved slot.
    fn reserve(&self, key: &K) -> Result<Option<T>, PoolError> {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        if st.closed {
            return Err(PoolError::Closed);
        }
        let slot = st.slots.entry(key.clone()).or_default();
        if let Some(obj) = slot.idle.pop_front() {
            slot.active += 1;
            st.total_active += 1;
            st.total_idle -= 1;
            return Ok(Some(obj));
        }
        let per_key = slot.active + slot.idle.len();
        if per_key >= self.config.max_total_per_key {
            return Err(PoolError::Exhausted {
                in_use: per_key,
                max: self.config.max_total_per_key,
            });
        }
        let total = st.total_active + st.total_idle;
        if total >= self.config.max_total {
            return Err(PoolError::Exhausted {
                in_use: total,
                max: self.config.max_total,
            });
        }
        slot.active += 1;
        st.total_active += 1;
        Ok(None)
    }

    /// Release a slot reserved by [`reserve`](Self::reserve) after a failed
    /// creation or activation.
    fn unreserve(&self, key: &K) {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        if let Some(slot) = st.slots.get_mut(key) {
            slot.active = slot.active.saturating_sub(1);
        }
        st.total_active = st.total_active.saturating_sub(1);
    }

    /// Mark a borrowed object as gone (destroyed or handed back).
    fn forget_active(&self, key: &K) {
        self.unreserve(key);
    }

    fn destroy_logged(&self, key: &K, obj: T, context: &str) {
        self.stats.lock().destroyed += 1;
        if let Err(e) = self.factory.destroy(key, obj) {
            tracing::warn!(error = %e, context, "failed to destroy pooled object");
        }
    }
}

impl<K, T> KeyedObjectPool<K, T> for KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send + Sync,
    T: Send,
{
    fn borrow(&self, key: K) -> Result<T, PoolError> {
        tracing::trace!("borrowing object from keyed pool");

        let reused = self.reserve(&key)?;
        let idle_hit = reused.is_some();

        let mut obj = match reused {
            Some(obj) => {
                if self.config.test_on_borrow && !self.factory.validate(&key, &obj) {
                    tracing::debug!("idle object failed validation, replacing");
                    self.destroy_logged(&key, obj, "borrow validation");
                    match self.factory.create(&key) {
                        Ok(fresh) => {
                            self.stats.lock().created += 1;
                            fresh
                        }
                        Err(e) => {
                            self.unreserve(&key);
                            return Err(PoolError::Factory(e));
                        }
                    }
                } else {
                    obj
                }
            }
            None => match self.factory.create(&key) {
                Ok(fresh) => {
                    self.stats.lock().created += 1;
                    fresh
                }
                Err(e) => {
                    self.unreserve(&key);
                    return Err(PoolError::Factory(e));
                }
            },
        };

        if let Err(e) = self.factory.activate(&key, &mut obj) {
            self.destroy_logged(&key, obj, "activation failure");
            self.unreserve(&key);
            return Err(PoolError::Factory(e));
        }

        {
            let mut stats = self.stats.lock();
            stats.borrows += 1;
            if idle_hit {
                stats.idle_hits += 1;
            }
        }
        Ok(obj)
    }

    fn give_back(&self, key: &K, mut obj: T) -> Result<(), ReturnError<T>> {
        tracing::trace!("returning object to keyed pool");

        if let Err(e) = self.factory.passivate(key, &mut obj) {
            self.destroy_logged(key, obj, "passivation failure");
            self.forget_active(key);
            return Err(ReturnError::Passivate(e));
        }

        let surplus = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            if st.closed {
                // The idle lists were already drained; hand the object back
                // so the borrower can release the real resource.
                if let Some(slot) = st.slots.get_mut(key) {
                    slot.active = slot.active.saturating_sub(1);
                }
                st.total_active = st.total_active.saturating_sub(1);
                return Err(ReturnError::Closed(obj));
            }
            let slot = st.slots.entry(key.clone()).or_default();
            slot.active = slot.active.saturating_sub(1);
            st.total_active = st.total_active.saturating_sub(1);
            if slot.idle.len() < self.config.max_idle_per_key {
                slot.idle.push_back(obj);
                st.total_idle += 1;
                None
            } else {
                Some(obj)
            }
        };

        if let Some(obj) = surplus {
            tracing::debug!("idle list full, destroying surplus object");
            self.destroy_logged(key, obj, "surplus idle");
        }

        self.stats.lock().returns += 1;
        Ok(())
    }

    fn invalidate(&self, key: &K, obj: T) -> Result<(), PoolError> {
        tracing::debug!("invalidating borrowed object");
        self.forget_active(key);
        self.stats.lock().destroyed += 1;
        self.factory.destroy(key, obj).map_err(PoolError::Factory)
    }

    fn close(&self) -> Result<(), PoolError> {
        let drained: Vec<(K, T)> = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            if st.closed {
                return Ok(());
            }
            st.closed = true;
            st.total_idle = 0;
            st.slots
                .iter_mut()
                .flat_map(|(key, slot)| slot.idle.drain(..).map(move |obj| (key.clone(), obj)))
                .collect()
        };

        let mut first_err = None;
        for (key, obj) in drained {
            self.stats.lock().destroyed += 1;
            if let Err(e) = self.factory.destroy(&key, obj) {
                tracing::warn!(error = %e, "failed to destroy idle object during close");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        tracing::info!("keyed pool closed");
        match first_err {
            Some(e) => Err(PoolError::Factory(e)),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn num_active(&self) -> usize {
        self.state.lock().total_active
    }

    fn num_idle(&self) -> usize {
        self.state.lock().total_idle
    }
}

impl<K, T> std::fmt::Debug for KeyedPool<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("KeyedPool")
            .field("total_active", &st.total_active)
            .field("total_idle", &st.total_idle)
            .field("closed", &st.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::factory::FactoryError;

    /// Counting factory producing sequentially numbered objects.
    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        destroyed: AtomicUsize,
        activated: AtomicUsize,
        passivated: AtomicUsize,
        fail_passivate: AtomicBool,
        fail_destroy: AtomicBool,
        valid: AtomicBool,
    }

    impl CountingFactory {
        fn new() -> Self {
            let f = Self::default();
            f.valid.store(true, Ordering::Relaxed);
            f
        }
    }

    impl PooledObjectFactory<String, usize> for CountingFactory {
        fn create(&self, _key: &String) -> Result<usize, FactoryError> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }

        fn activate(&self, _key: &String, _obj: &mut usize) -> Result<(), FactoryError> {
            self.activated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn passivate(&self, _key: &String, _obj: &mut usize) -> Result<(), FactoryError> {
            self.passivated.fetch_add(1, Ordering::SeqCst);
            if self.fail_passivate.load(Ordering::SeqCst) {
                return Err("passivate failed".into());
            }
            Ok(())
        }

        fn validate(&self, _key: &String, _obj: &usize) -> bool {
            self.valid.load(Ordering::SeqCst)
        }

        fn destroy(&self, _key: &String, _obj: usize) -> Result<(), FactoryError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            if self.fail_destroy.load(Ordering::SeqCst) {
                return Err("destroy failed".into());
            }
            Ok(())
        }
    }

    fn pool_with(
        factory: Arc<CountingFactory>,
        config: PoolConfig,
    ) -> KeyedPool<String, usize> {
        KeyedPool::new(factory, config).unwrap()
    }

    #[test]
    fn test_borrow_creates_then_reuses() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(Arc::clone(&factory), PoolConfig::new());
        let key = "SELECT 1".to_string();

        let obj = pool.borrow(key.clone()).unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        pool.give_back(&key, obj).unwrap();
        assert_eq!(pool.num_idle(), 1);

        let obj = pool.borrow(key.clone()).unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.activated.load(Ordering::SeqCst), 2);
        pool.give_back(&key, obj).unwrap();

        assert_eq!(pool.stats().idle_hits, 1);
    }

    #[test]
    fn test_per_key_exhaustion_leaves_other_keys_usable() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(
            Arc::clone(&factory),
            PoolConfig::new().max_total_per_key(1),
        );

        let a = pool.borrow("a".to_string()).unwrap();
        let err = pool.borrow("a".to_string()).unwrap_err();
        assert!(matches!(err, PoolError::Exhausted { in_use: 1, max: 1 }));

        // A different key still has capacity.
        let b = pool.borrow("b".to_string()).unwrap();
        pool.give_back(&"a".to_string(), a).unwrap();
        pool.give_back(&"b".to_string(), b).unwrap();
    }

    #[test]
    fn test_total_exhaustion() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(
            Arc::clone(&factory),
            PoolConfig::new().max_total(2).max_total_per_key(2),
        );

        let _a = pool.borrow("a".to_string()).unwrap();
        let _b = pool.borrow("b".to_string()).unwrap();
        let err = pool.borrow("c".to_string()).unwrap_err();
        assert!(matches!(err, PoolError::Exhausted { in_use: 2, max: 2 }));
    }

    #[test]
    fn test_exhaustion_counts_idle_objects_per_key() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(
            Arc::clone(&factory),
            PoolConfig::new().max_total_per_key(1),
        );
        let key = "k".to_string();

        let obj = pool.borrow(key.clone()).unwrap();
        pool.give_back(&key, obj).unwrap();

        // The single slot is idle, so a borrow reuses it rather than failing.
        let obj = pool.borrow(key.clone()).unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        pool.give_back(&key, obj).unwrap();
    }

    #[test]
    fn test_passivation_failure_destroys_object() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(Arc::clone(&factory), PoolConfig::new());
        let key = "k".to_string();

        let obj = pool.borrow(key.clone()).unwrap();
        factory.fail_passivate.store(true, Ordering::SeqCst);
        let err = pool.give_back(&key, obj).unwrap_err();
        assert!(matches!(err, ReturnError::Passivate(_)));
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.num_idle(), 0);
        assert_eq!(pool.num_active(), 0);
    }

    #[test]
    fn test_validation_failure_replaces_object() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(
            Arc::clone(&factory),
            PoolConfig::new().test_on_borrow(true),
        );
        let key = "k".to_string();

        let obj = pool.borrow(key.clone()).unwrap();
        pool.give_back(&key, obj).unwrap();

        factory.valid.store(false, Ordering::SeqCst);
        let obj = pool.borrow(key.clone()).unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        pool.give_back(&key, obj).unwrap();
    }

    #[test]
    fn test_surplus_idle_destroyed() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(
            Arc::clone(&factory),
            PoolConfig::new().max_total_per_key(4).max_idle_per_key(1),
        );
        let key = "k".to_string();

        let a = pool.borrow(key.clone()).unwrap();
        let b = pool.borrow(key.clone()).unwrap();
        pool.give_back(&key, a).unwrap();
        pool.give_back(&key, b).unwrap();

        assert_eq!(pool.num_idle(), 1);
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_destroys_idle_only() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(Arc::clone(&factory), PoolConfig::new());

        let held = pool.borrow("held".to_string()).unwrap();
        let idle = pool.borrow("idle".to_string()).unwrap();
        pool.give_back(&"idle".to_string(), idle).unwrap();

        pool.close().unwrap();
        assert!(pool.is_closed());
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);

        // The borrowed object comes back to the caller for release.
        let err = pool.give_back(&"held".to_string(), held).unwrap_err();
        assert!(matches!(err, ReturnError::Closed(_)));
    }

    #[test]
    fn test_close_is_idempotent_and_reports_destroy_failure() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(Arc::clone(&factory), PoolConfig::new());

        let a = pool.borrow("a".to_string()).unwrap();
        let b = pool.borrow("b".to_string()).unwrap();
        pool.give_back(&"a".to_string(), a).unwrap();
        pool.give_back(&"b".to_string(), b).unwrap();

        factory.fail_destroy.store(true, Ordering::SeqCst);
        let err = pool.close().unwrap_err();
        assert!(matches!(err, PoolError::Factory(_)));
        // Both idle objects were destroy-attempted despite the failure.
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 2);

        assert!(pool.close().is_ok());
    }

    #[test]
    fn test_borrow_after_close_fails() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(Arc::clone(&factory), PoolConfig::new());
        pool.close().unwrap();
        assert!(matches!(
            pool.borrow("k".to_string()),
            Err(PoolError::Closed)
        ));
    }

    #[test]
    fn test_invalidate_frees_capacity() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(
            Arc::clone(&factory),
            PoolConfig::new().max_total_per_key(1),
        );
        let key = "k".to_string();

        let obj = pool.borrow(key.clone()).unwrap();
        pool.invalidate(&key, obj).unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);

        // Capacity is free again.
        let obj = pool.borrow(key.clone()).unwrap();
        pool.give_back(&key, obj).unwrap();
    }

    #[test]
    fn test_stats_snapshot() {
        let factory = Arc::new(CountingFactory::new());
        let pool = pool_with(Arc::clone(&factory), PoolConfig::new());
        let key = "k".to_string();

        let obj = pool.borrow(key.clone()).unwrap();
        pool.give_back(&key, obj).unwrap();
        let obj = pool.borrow(key.clone()).unwrap();
        pool.give_back(&key, obj).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.borrows, 2);
        assert_eq!(stats.returns, 2);
        assert_eq!(stats.idle_hits, 1);
        assert!((stats.idle_hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
