//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Environment variable that overrides the default pool capacity.
pub const POOL_SIZE_ENV: &str = "DB_POOL_SIZE";

/// Default number of connections opened during warm-up.
pub const DEFAULT_CAPACITY: u32 = 4;

/// Configuration for the connection pool.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future minor versions without breaking changes. Use the builder
/// pattern methods or [`Default::default()`] to construct instances.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Number of connections the pool opens during warm-up and owns for
    /// its whole life. Connections are never created or destroyed after
    /// warm-up; the only teardown is whole-pool close.
    pub capacity: u32,

    /// Optional per-connection query-thread hint forwarded to the
    /// connection factory. `None` leaves the engine default.
    pub threads_per_conn: Option<u32>,

    /// Default deadline for `acquire` while queued behind other holders.
    /// `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            threads_per_conn: None,
            acquire_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment.
    ///
    /// `DB_POOL_SIZE` overrides the default capacity when set; a value that
    /// is not a positive integer is a configuration error.
    pub fn from_env() -> Result<Self, PoolError> {
        let raw = std::env::var(POOL_SIZE_ENV).ok();
        Self::from_capacity_var(raw.as_deref())
    }

    fn from_capacity_var(raw: Option<&str>) -> Result<Self, PoolError> {
        let mut config = Self::default();
        if let Some(raw) = raw {
            config.capacity = raw.trim().parse().map_err(|_| {
                PoolError::Configuration(format!(
                    "{POOL_SIZE_ENV} must be a positive integer, got {raw:?}"
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the number of connections opened during warm-up.
    #[must_use]
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the per-connection query-thread hint.
    #[must_use]
    pub fn threads_per_conn(mut self, threads: u32) -> Self {
        self.threads_per_conn = Some(threads);
        self
    }

    /// Set the default acquisition deadline.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::Configuration(
                "capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.threads_per_conn, None);
        assert_eq!(config.acquire_timeout, None);
    }

    #[test]
    fn test_config_builder_methods() {
        let config = PoolConfig::new()
            .capacity(8)
            .threads_per_conn(2)
            .acquire_timeout(Duration::from_secs(5));

        assert_eq!(config.capacity, 8);
        assert_eq!(config.threads_per_conn, Some(2));
        assert_eq!(config.acquire_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_config_validation_zero_capacity() {
        let config = PoolConfig::new().capacity(0);

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("capacity must be greater than 0")
        );
    }

    #[test]
    fn test_capacity_from_env_unset() {
        let config = PoolConfig::from_capacity_var(None).unwrap();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_capacity_from_env_override() {
        let config = PoolConfig::from_capacity_var(Some("12")).unwrap();
        assert_eq!(config.capacity, 12);

        // Surrounding whitespace is tolerated
        let config = PoolConfig::from_capacity_var(Some(" 2 ")).unwrap();
        assert_eq!(config.capacity, 2);
    }

    #[test]
    fn test_capacity_from_env_rejects_garbage() {
        for raw in ["four", "", "-1", "2.5"] {
            let result = PoolConfig::from_capacity_var(Some(raw));
            assert!(result.is_err(), "expected {raw:?} to be rejected");
        }
    }

    #[test]
    fn test_capacity_from_env_rejects_zero() {
        let result = PoolConfig::from_capacity_var(Some("0"));
        assert!(result.is_err());
    }
}
