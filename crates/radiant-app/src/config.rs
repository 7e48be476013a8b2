//! Kernel configuration read from the environment.
//!
//! Every variable is optional. A missing variable takes its default; a
//! present but malformed one is a startup error.

use std::str::FromStr;
use std::time::Duration;

use radiant_eventing::{SaturationPolicy, WorkerPoolConfig};
use radiant_trending::TrendingConfig;

use crate::error::AppError;

/// Everything the kernel needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// PostgreSQL URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Pool size for the PostgreSQL store.
    pub database_max_connections: u32,
    /// Worker pool running translation jobs.
    pub translation_pool: WorkerPoolConfig,
    /// Upper bound on one provider call.
    pub provider_timeout: Duration,
    /// Trending query cache.
    pub trending: TrendingConfig,
    /// Period of the projection catch-up loop.
    pub catch_up_interval: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            translation_pool: WorkerPoolConfig {
                name: "translation".to_owned(),
                ..WorkerPoolConfig::default()
            },
            provider_timeout: Duration::from_secs(60),
            trending: TrendingConfig::default(),
            catch_up_interval: Duration::from_secs(30),
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, AppError> {
    parse(lookup, key, default).map(Duration::from_secs)
}

impl KernelConfig {
    /// Builds the configuration from `lookup`, which returns the value of an
    /// environment variable or `None` if it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first malformed variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let pool = &defaults.translation_pool;

        let reject = parse(&lookup, "TRANSLATION_EXECUTOR_REJECT_WHEN_SATURATED", false)?;
        let translation_pool = WorkerPoolConfig {
            name: pool.name.clone(),
            core_size: parse(&lookup, "TRANSLATION_EXECUTOR_CORE_POOL_SIZE", pool.core_size)?,
            max_size: parse(&lookup, "TRANSLATION_EXECUTOR_MAX_POOL_SIZE", pool.max_size)?,
            queue_capacity: parse(
                &lookup,
                "TRANSLATION_EXECUTOR_QUEUE_CAPACITY",
                pool.queue_capacity,
            )?,
            await_termination: seconds(
                &lookup,
                "TRANSLATION_EXECUTOR_AWAIT_TERMINATION_SECONDS",
                pool.await_termination.as_secs(),
            )?,
            saturation_policy: if reject {
                SaturationPolicy::Reject
            } else {
                SaturationPolicy::CallerRuns
            },
        };
        if translation_pool.max_size < translation_pool.core_size {
            return Err(AppError::Config(format!(
                "TRANSLATION_EXECUTOR_MAX_POOL_SIZE ({}) is below the core pool size ({})",
                translation_pool.max_size, translation_pool.core_size
            )));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            translation_pool,
            provider_timeout: seconds(
                &lookup,
                "TRANSLATION_PROVIDER_TIMEOUT_SECONDS",
                defaults.provider_timeout.as_secs(),
            )?,
            trending: TrendingConfig {
                cache_ttl: seconds(
                    &lookup,
                    "TRENDING_CACHE_TTL_SECONDS",
                    defaults.trending.cache_ttl.as_secs(),
                )?,
                cache_max_entries: parse(
                    &lookup,
                    "TRENDING_CACHE_MAX_ENTRIES",
                    defaults.trending.cache_max_entries,
                )?,
            },
            catch_up_interval: seconds(
                &lookup,
                "PROJECTION_CATCH_UP_INTERVAL_SECONDS",
                defaults.catch_up_interval.as_secs(),
            )?,
        })
    }

    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first malformed variable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        // Act
        let config = KernelConfig::from_lookup(lookup(&[])).unwrap();

        // Assert
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.database_url, None);
        assert_eq!(config.translation_pool.core_size, 4);
        assert_eq!(config.translation_pool.max_size, 8);
        assert_eq!(config.translation_pool.queue_capacity, 100);
        assert_eq!(
            config.translation_pool.saturation_policy,
            SaturationPolicy::CallerRuns
        );
        assert_eq!(config.trending.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.trending.cache_max_entries, 100);
        assert_eq!(config.provider_timeout, Duration::from_secs(60));
        assert_eq!(config.catch_up_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_variables_override_defaults() {
        // Arrange
        let vars = lookup(&[
            ("DATABASE_URL", "postgres://localhost/radiant"),
            ("TRANSLATION_EXECUTOR_CORE_POOL_SIZE", "2"),
            ("TRANSLATION_EXECUTOR_MAX_POOL_SIZE", "3"),
            ("TRANSLATION_EXECUTOR_REJECT_WHEN_SATURATED", "true"),
            ("TRENDING_CACHE_TTL_SECONDS", " 60 "),
        ]);

        // Act
        let config = KernelConfig::from_lookup(vars).unwrap();

        // Assert
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/radiant")
        );
        assert_eq!(config.translation_pool.core_size, 2);
        assert_eq!(config.translation_pool.max_size, 3);
        assert_eq!(
            config.translation_pool.saturation_policy,
            SaturationPolicy::Reject
        );
        assert_eq!(config.trending.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_variable_is_config_error() {
        let result = KernelConfig::from_lookup(lookup(&[("TRENDING_CACHE_MAX_ENTRIES", "lots")]));

        match result {
            Err(AppError::Config(message)) => {
                assert!(message.contains("TRENDING_CACHE_MAX_ENTRIES"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_max_below_core_is_rejected() {
        let result = KernelConfig::from_lookup(lookup(&[
            ("TRANSLATION_EXECUTOR_CORE_POOL_SIZE", "6"),
            ("TRANSLATION_EXECUTOR_MAX_POOL_SIZE", "2"),
        ]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = KernelConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();

        assert_eq!(config.database_url, None);
    }
}
