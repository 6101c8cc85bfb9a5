//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The database URL is wrapped in secrecy::SecretString to prevent log leaks.

use crate::error::{Error, Result};
use secrecy::SecretString;

pub const DEFAULT_TABLE_NAME: &str = "graphs";
pub const DEFAULT_QUEUE_NAME: &str = "graph_work";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Longest table or queue name accepted. pgmq prefixes queue names when it
/// creates its backing tables, so the limit leaves room under Postgres'
/// 63-byte identifier cap.
const MAX_IDENTIFIER_LEN: usize = 48;

#[derive(Debug)]
pub struct Config {
    /// Postgres connection string. `None` only makes sense with the
    /// in-memory backend.
    pub database_url: Option<SecretString>,
    pub intake: IntakeConfig,
    pub bind_addr: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// Where the intake handler writes records and publishes work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub table_name: String,
    pub queue_name: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
        }
    }
}

impl IntakeConfig {
    /// Build an intake config, rejecting names that are not plain SQL
    /// identifiers. The table name is interpolated into SQL text.
    pub fn new(table_name: impl Into<String>, queue_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        let queue_name = queue_name.into();
        validate_identifier("GRAPH_TABLE_NAME", &table_name)?;
        validate_identifier("WORK_QUEUE_NAME", &queue_name)?;
        Ok(Self {
            table_name,
            queue_name,
        })
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let intake = IntakeConfig::new(
            var_or("GRAPH_TABLE_NAME", DEFAULT_TABLE_NAME),
            var_or("WORK_QUEUE_NAME", DEFAULT_QUEUE_NAME),
        )?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok().map(SecretString::from),
            intake,
            bind_addr: var_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }

    /// The database URL, or a configuration error naming the missing var.
    pub fn require_database_url(&self) -> Result<&SecretString> {
        self.database_url.as_ref().ok_or_else(|| {
            Error::Config("required environment variable DATABASE_URL is not set".to_string())
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn validate_identifier(var: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && value.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{var} must be a lowercase SQL identifier of at most {MAX_IDENTIFIER_LEN} characters, got {value:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_are_valid_identifiers() {
        let config = IntakeConfig::new(DEFAULT_TABLE_NAME, DEFAULT_QUEUE_NAME).unwrap();
        assert_eq!(config, IntakeConfig::default());
    }

    #[test]
    fn rejects_names_that_would_break_sql() {
        assert!(IntakeConfig::new("graphs; drop table x", "q").is_err());
        assert!(IntakeConfig::new("graphs", "Work").is_err());
        assert!(IntakeConfig::new("", "q").is_err());
        assert!(IntakeConfig::new("1graphs", "q").is_err());
        assert!(IntakeConfig::new("g".repeat(49), "q").is_err());
    }
}
