//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur when building or decoding commitment inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Secret label too long: max {max} bytes, got {got}")]
    LabelTooLong { max: usize, got: usize },
}
