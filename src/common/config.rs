//! Configuration loading
//!
//! File first, then environment overrides, then validation.

use crate::config::CasinoConfig;
use crate::errors::{CasinoResult, ConfigurationError};
use std::env;
use std::path::Path;

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            CasinoConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        Ok(toml::from_str(&content)?)
    }

    fn apply_env_overrides(&self, config: &mut CasinoConfig) -> CasinoResult<()> {
        if let Ok(url) = env::var("CASINO_DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(max) = env::var("CASINO_DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse_env("CASINO_DATABASE_MAX_CONNECTIONS", max)?;
        }
        if let Ok(host) = env::var("CASINO_API_HOST") {
            config.api.host = host;
        }
        if let Ok(port) = env::var("CASINO_API_PORT") {
            config.api.port = parse_env("CASINO_API_PORT", port)?;
        }
        if let Ok(rate) = env::var("CASINO_TOKENS_PER_USD") {
            config.wallet.tokens_per_usd = parse_env("CASINO_TOKENS_PER_USD", rate)?;
        }
        if let Ok(seed) = env::var("CASINO_SLOTS_SEED") {
            config.slots.seed = Some(parse_env("CASINO_SLOTS_SEED", seed)?);
        }
        if let Ok(filter) = env::var("CASINO_LOG") {
            config.logging.filter = filter;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &CasinoConfig) -> CasinoResult<()> {
        if config.database.url.trim().is_empty() {
            return Err(invalid("database.url", "", "Database URL is required"));
        }

        if config.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "0", "Pool needs at least one connection"));
        }

        // Each connection to `sqlite::memory:` opens its own private database.
        if config.database.is_in_memory() && config.database.max_connections != 1 {
            return Err(invalid(
                "database.max_connections",
                &config.database.max_connections.to_string(),
                "In-memory databases require exactly one connection",
            ));
        }

        if config.api.port == 0 {
            return Err(invalid("api.port", "0", "Port cannot be zero"));
        }

        if config.wallet.tokens_per_usd <= 0 {
            return Err(invalid(
                "wallet.tokens_per_usd",
                &config.wallet.tokens_per_usd.to_string(),
                "Conversion rate must be positive",
            ));
        }

        if let Some(max_bet) = config.slots.max_bet {
            if max_bet <= 0 {
                return Err(invalid("slots.max_bet", &max_bet.to_string(), "Max bet must be positive"));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &CasinoConfig, path: &str) -> CasinoResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String) -> CasinoResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "Could not parse value".to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::errors::CasinoError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
