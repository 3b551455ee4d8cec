//! Database connection configuration types.

use serde::Deserialize;

/// Connection settings for one database (source or warehouse).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
    /// Upper bound on pooled connections. One is enough for the ETL.
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 2,
        }
    }

    /// Default source database.
    pub fn default_source() -> Self {
        Self::with_url("postgres://localhost:5432/cinema")
    }

    /// Default warehouse database.
    pub fn default_warehouse() -> Self {
        Self::with_url("postgres://localhost:5432/warehouse")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::with_url("")
    }
}
