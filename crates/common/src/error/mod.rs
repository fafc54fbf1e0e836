//! Error type shared by the crypto primitives.
//!
//! Storage has its own [`crate::storage::StorageError`]; infra maps both into
//! the domain error at the crate boundary.

use thiserror::Error;

/// Errors raised below the storage layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommonError {
    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Serialization error ({format}): {message}")]
    Serialization { message: String, format: String },
}

impl CommonError {
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }

    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), format: format.into() }
    }
}

/// Result alias for [`CommonError`].
pub type CommonResult<T> = Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = CommonError::serialization("base64", "invalid padding");
        assert_eq!(err.to_string(), "Serialization error (base64): invalid padding");
        assert_eq!(CommonError::crypto("tag mismatch").to_string(), "Cryptography error: tag mismatch");
    }
}
