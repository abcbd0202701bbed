//! Pool configuration.

use crate::error::PoolError;

/// Configuration for a [`KeyedPool`](crate::KeyedPool).
///
/// # Example
///
/// ```
/// use stmt_pool::PoolConfig;
///
/// let config = PoolConfig::new()
///     .max_total(32)
///     .max_total_per_key(4)
///     .max_idle_per_key(4)
///     .test_on_borrow(true);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of objects (active + idle) across all keys.
    pub max_total: usize,
    /// Maximum number of objects (active + idle) per key.
    pub max_total_per_key: usize,
    /// Maximum number of idle objects kept per key; surplus returns are
    /// destroyed instead of cached.
    pub max_idle_per_key: usize,
    /// Whether to validate idle objects before reuse.
    pub test_on_borrow: bool,
}

impl PoolConfig {
    /// Default maximum total objects across all keys.
    pub const DEFAULT_MAX_TOTAL: usize = 64;
    /// Default maximum objects per key.
    pub const DEFAULT_MAX_TOTAL_PER_KEY: usize = 8;
    /// Default maximum idle objects per key.
    pub const DEFAULT_MAX_IDLE_PER_KEY: usize = 8;

    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_total: Self::DEFAULT_MAX_TOTAL,
            max_total_per_key: Self::DEFAULT_MAX_TOTAL_PER_KEY,
            max_idle_per_key: Self::DEFAULT_MAX_IDLE_PER_KEY,
            test_on_borrow: false,
        }
    }

    /// Set the maximum number of objects across all keys.
    #[must_use]
    pub fn max_total(mut self, max: usize) -> Self {
        self.max_total = max;
        self
    }

    /// Set the maximum number of objects per key.
    #[must_use]
    pub fn max_total_per_key(mut self, max: usize) -> Self {
        self.max_total_per_key = max;
        self
    }

    /// Set the maximum number of idle objects kept per key.
    #[must_use]
    pub fn max_idle_per_key(mut self, max: usize) -> Self {
        self.max_idle_per_key = max;
        self
    }

    /// Enable or disable validation of idle objects before reuse.
    #[must_use]
    pub fn test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_total == 0 {
            return Err(PoolError::Config("max_total must be at least 1".into()));
        }
        if self.max_total_per_key == 0 {
            return Err(PoolError::Config(
                "max_total_per_key must be at least 1".into(),
            ));
        }
        if self.max_total_per_key > self.max_total {
            return Err(PoolError::Config(format!(
                "max_total_per_key ({}) exceeds max_total ({})",
                self.max_total_per_key, self.max_total
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::new();
        assert_eq!(config.max_total, PoolConfig::DEFAULT_MAX_TOTAL);
        assert_eq!(
            config.max_total_per_key,
            PoolConfig::DEFAULT_MAX_TOTAL_PER_KEY
        );
        assert!(!config.test_on_borrow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_fluent() {
        let config = PoolConfig::new()
            .max_total(100)
            .max_total_per_key(10)
            .max_idle_per_key(5)
            .test_on_borrow(true);

        assert_eq!(config.max_total, 100);
        assert_eq!(config.max_total_per_key, 10);
        assert_eq!(config.max_idle_per_key, 5);
        assert!(config.test_on_borrow);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        assert!(PoolConfig::new().max_total(0).validate().is_err());
        assert!(PoolConfig::new().max_total_per_key(0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_per_key_above_total() {
        let config = PoolConfig::new().max_total(4).max_total_per_key(8);
        assert!(config.validate().is_err());
    }
}
