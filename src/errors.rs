//! Error types for the casino ledger
//!
//! Every service call returns [`CasinoResult`]. The first four variants of
//! [`CasinoError`] are the domain taxonomy surfaced to callers; the rest wrap
//! infrastructure failures.

use thiserror::Error;

/// Root error type for all casino operations
#[derive(Debug, Error)]
pub enum CasinoError {
    /// Bad input shape or value
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Balance too low for the requested debit
    #[error("Insufficient funds: {required} tokens required, {available} available")]
    InsufficientFunds { required: i64, available: i64 },

    /// Unknown user, card, menu item or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation or conflicting concurrent mutation
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Database failure that is not a constraint violation
    #[error("Storage error: {0}")]
    Storage(sqlx::Error),

    #[error("Schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

impl CasinoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CasinoError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CasinoError::NotFound(msg.into())
    }

    /// Stable machine-readable code, used in API bodies and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            CasinoError::Validation(_) => "VALIDATION_ERROR",
            CasinoError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CasinoError::NotFound(_) => "NOT_FOUND",
            CasinoError::Integrity(_) => "INTEGRITY_ERROR",
            CasinoError::Storage(_) | CasinoError::Migration(_) => "STORAGE_ERROR",
            CasinoError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Whether the error belongs to the caller-facing taxonomy
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            CasinoError::Validation(_)
                | CasinoError::InsufficientFunds { .. }
                | CasinoError::NotFound(_)
                | CasinoError::Integrity(_)
        )
    }
}

// SQLite primary result codes for a locked or busy database.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for CasinoError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => CasinoError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) => {
                use sqlx::error::ErrorKind;
                match db.kind() {
                    ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation => CasinoError::Integrity(db.message().to_string()),
                    _ => {
                        let primary = db
                            .code()
                            .and_then(|code| code.parse::<i32>().ok())
                            .map(|code| code & 0xff);
                        match primary {
                            Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => CasinoError::Integrity(
                                format!("concurrent modification: {}", db.message()),
                            ),
                            _ => CasinoError::Storage(e),
                        }
                    }
                }
            }
            _ => CasinoError::Storage(e),
        }
    }
}

impl From<std::io::Error> for CasinoError {
    fn from(e: std::io::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<toml::de::Error> for CasinoError {
    fn from(e: toml::de::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(format!(
            "Failed to parse TOML: {}",
            e
        )))
    }
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;
