//! Standardized error types following the `error-tokenstore-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-tokenstore-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when version information is not available
    #[error("error-tokenstore-config-2 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-tokenstore-config-3 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when the configured storage backend is not known
    #[error("error-tokenstore-config-4 Unknown storage backend: {0}")]
    UnknownBackend(String),
}

/// Token storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when the secret service cannot be reached
    #[error("error-tokenstore-storage-1 Connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when the secret service rejects our credentials
    #[error("error-tokenstore-storage-2 Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Error when the secret service answers with a non-success status
    #[error("error-tokenstore-storage-3 Request failed ({status}): {}", .errors.join(", "))]
    RequestFailed { status: u16, errors: Vec<String> },

    /// Error when a response is missing the expected fields
    #[error("error-tokenstore-storage-4 Malformed response: {0}")]
    MalformedResponse(String),

    /// Error when data validation fails
    #[error("error-tokenstore-storage-5 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-tokenstore-storage-6 Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_display() {
        let err = StorageError::RequestFailed {
            status: 500,
            errors: vec!["internal error".to_string(), "try later".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "error-tokenstore-storage-3 Request failed (500): internal error, try later"
        );
    }

    #[test]
    fn test_config_error_prefix() {
        let err = ConfigError::EnvVarRequired("VAULT_ADDR".to_string());
        assert!(err.to_string().starts_with("error-tokenstore-config-1"));
    }
}
