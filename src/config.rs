//! Configuration with defaults and presets
//!
//! Loaded through [`crate::common::config::ConfigLoader`], which layers a
//! TOML file and `CASINO_*` environment variables over these defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub wallet: WalletConfig,
    pub slots: SlotsConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the ledger database
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://casino.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://casino.db".to_string(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// HTTP surface settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8050,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Token wallet rules
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Fixed conversion rate used for both purchases and cash-outs
    pub tokens_per_usd: i64,
    /// Require exactly 16 digits when registering a card
    pub strict_card_numbers: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            tokens_per_usd: 10,
            strict_card_numbers: false,
        }
    }
}

/// Slot machine settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotsConfig {
    /// Seed for a reproducible reel source; thread-local entropy when unset
    pub seed: Option<u64>,
    /// Upper bound for a single bet; unbounded when unset
    pub max_bet: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "casino_ledger=info,tower_http=info".to_string(),
        }
    }
}

impl CasinoConfig {
    /// Private in-memory database with a single connection, for tests and demos
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// In-memory database with a seeded reel source
    pub fn deterministic(seed: u64) -> Self {
        let mut config = Self::in_memory();
        config.slots.seed = Some(seed);
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CasinoConfig::default();
        assert_eq!(config.wallet.tokens_per_usd, 10);
        assert_eq!(config.api.port, 8050);
        assert!(!config.database.is_in_memory());
        assert!(config.slots.seed.is_none());
    }

    #[test]
    fn test_in_memory_preset() {
        let config = CasinoConfig::in_memory();
        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CasinoConfig = toml::from_str(
            r#"
            [wallet]
            strict_card_numbers = true

            [slots]
            seed = 7
            "#,
        )
        .unwrap();

        assert!(config.wallet.strict_card_numbers);
        assert_eq!(config.wallet.tokens_per_usd, 10);
        assert_eq!(config.slots.seed, Some(7));
        assert_eq!(config.database.busy_timeout(), Duration::from_millis(5_000));
    }
}
