//! Loader- and run-level error types.
//!
//! Row-level problems are not errors: they are [`crate::etl::SkipReason`]
//! values that get logged and counted. Anything in here aborts the loader
//! that produced it.

use crate::config::ConfigError;

/// Result type for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors that abort a loader (and roll back its open batch).
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query build error: {0}")]
    QueryBuild(#[from] sea_query::error::Error),

    #[error("Watermark store unavailable: {0}")]
    WatermarkUnavailable(String),

    #[error("Dimension load failed for {table}: {source}")]
    Dimension {
        table: &'static str,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EtlError {
    /// True when the error came from the database driver itself.
    pub fn is_database(&self) -> bool {
        match self {
            EtlError::Database(_) => true,
            EtlError::Dimension { source, .. } => source.is_database(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_error_wraps_source() {
        let err = EtlError::Dimension {
            table: "dim_film",
            source: Box::new(EtlError::Database(sqlx::Error::RowNotFound)),
        };
        assert!(err.is_database());
        assert!(err.to_string().contains("dim_film"));
    }

    #[test]
    fn test_watermark_error_is_not_database() {
        let err = EtlError::WatermarkUnavailable("down".to_string());
        assert!(!err.is_database());
    }
}
