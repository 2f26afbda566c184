use thiserror::Error;

use crate::{cache::FlushError, domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Flush(#[from] FlushError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code used by the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) | AppError::Domain(DomainError::Validation { .. }) => 2,
            AppError::Infra(InfraError::Configuration { .. }) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_usage_exit_code() {
        assert_eq!(AppError::validation("bad input").exit_code(), 2);
        assert_eq!(
            AppError::from(DomainError::validation("bad path")).exit_code(),
            2
        );
        assert_eq!(AppError::unexpected("boom").exit_code(), 1);
    }

    #[test]
    fn configuration_errors_have_dedicated_exit_code() {
        let err = AppError::from(InfraError::configuration("missing fixture"));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("missing fixture"));
    }
}
