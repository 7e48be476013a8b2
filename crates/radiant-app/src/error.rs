//! Radiant — startup and runtime error types.

use radiant_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the kernel runner.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or schema error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A kernel operation failed during startup.
    #[error("kernel error: {0}")]
    Kernel(#[from] DomainError),

    /// Signal handling or other I/O error.
    #[error("runtime error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_config_error_message_names_the_problem() {
        let err = AppError::Config("PORT must be a number".into());

        assert_eq!(err.to_string(), "configuration error: PORT must be a number");
    }

    #[test]
    fn test_domain_error_converts_into_kernel_error() {
        let id = Uuid::new_v4();

        let err: AppError = DomainError::AggregateNotFound(id).into();

        assert!(matches!(err, AppError::Kernel(DomainError::AggregateNotFound(found)) if found == id));
    }
}
