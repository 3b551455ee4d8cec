//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter. Only startup
//! connections retry; a running ETL never retries within one invocation.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Backoff for database connection retries at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

/// Determines if a connection error is worth retrying.
///
/// Retryable:
/// - I/O errors and pool timeouts (database still starting, network blip)
///
/// Non-retryable:
/// - Configuration and protocol errors, which will fail the same way again.
pub fn is_retryable_connect_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_connect_error() {
        assert!(is_retryable_connect_error(&sqlx::Error::PoolTimedOut));
        assert!(is_retryable_connect_error(&sqlx::Error::Io(
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")
        )));
        assert!(!is_retryable_connect_error(&sqlx::Error::Configuration(
            "bad url".into()
        )));
        assert!(!is_retryable_connect_error(&sqlx::Error::RowNotFound));
    }
}
