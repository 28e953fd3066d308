//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Balance engine tuning.
    #[serde(default)]
    pub finance: FinanceConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Balance engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FinanceConfig {
    /// Lifetime of a point-in-time balance cache entry, in seconds.
    #[serde(default = "default_balance_cache_ttl")]
    pub balance_cache_ttl_secs: u64,
    /// Maximum number of days held in the point-in-time cache.
    #[serde(default = "default_balance_cache_capacity")]
    pub balance_cache_capacity: u64,
    /// Age after which a cached period balance is treated as a miss, in seconds.
    #[serde(default = "default_period_max_age")]
    pub period_max_age_secs: u64,
    /// Largest stored-vs-recomputed difference still considered consistent
    /// (exclusive).
    #[serde(default = "default_consistency_tolerance")]
    pub consistency_tolerance: Decimal,
    /// Widest yearly report accepted, in calendar years.
    #[serde(default = "default_max_report_years")]
    pub max_report_years: u32,
}

fn default_balance_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_balance_cache_capacity() -> u64 {
    10_000
}

fn default_period_max_age() -> u64 {
    3600 // 1 hour
}

fn default_consistency_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn default_max_report_years() -> u32 {
    50
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            balance_cache_ttl_secs: default_balance_cache_ttl(),
            balance_cache_capacity: default_balance_cache_capacity(),
            period_max_age_secs: default_period_max_age(),
            consistency_tolerance: default_consistency_tolerance(),
            max_report_years: default_max_report_years(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones: `config/default`,
    /// `config/{RUN_MODE}`, then `MIZAN__`-prefixed environment variables
    /// (e.g. `MIZAN__DATABASE__URL`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MIZAN").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_finance_defaults() {
        let finance = FinanceConfig::default();
        assert_eq!(finance.balance_cache_ttl_secs, 3600);
        assert_eq!(finance.balance_cache_capacity, 10_000);
        assert_eq!(finance.period_max_age_secs, 3600);
        assert_eq!(finance.consistency_tolerance, dec!(0.01));
        assert_eq!(finance.max_report_years, 50);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("MIZAN__DATABASE__URL", Some("postgres://localhost/mizan_test")),
                ("MIZAN__SERVER__HOST", Some("127.0.0.1")),
                ("MIZAN__SERVER__PORT", Some("9090")),
                ("MIZAN__FINANCE__PERIOD_MAX_AGE_SECS", Some("60")),
                ("MIZAN__FINANCE__MAX_REPORT_YEARS", Some("5")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/mizan_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.host, "127.0.0.1");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.finance.period_max_age_secs, 60);
                assert_eq!(config.finance.balance_cache_ttl_secs, 3600);
                assert_eq!(config.finance.max_report_years, 5);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars(
            [
                ("MIZAN__DATABASE__URL", None::<&str>),
                ("MIZAN__SERVER__HOST", Some("127.0.0.1")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
