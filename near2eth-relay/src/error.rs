//! Error types of the relay core.

use thiserror::Error;

use crate::near_types::hash::CryptoHash;

/// A light-client block record could not be turned into the contract's
/// binary layout. The block must not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("field `{field}` is not valid base58: {reason}")]
    InvalidBase58 { field: String, reason: String },
    #[error("field `{field}` decodes to {actual} bytes, expected {expected}")]
    InvalidLength {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("field `{field}` has an unsupported key type: {value}")]
    UnknownKeyType { field: String, value: String },
    #[error("borsh serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Error)]
pub enum RelayError {
    /// The source chain has not exposed the next light-client block yet.
    #[error("no light client block after {after} is available yet")]
    ProofUnavailable { after: CryptoHash },
    /// The verifier contract reverted or the transaction failed to submit.
    #[error("transaction `{method}` was rejected: {reason}")]
    TransactionRejected { method: String, reason: String },
    /// RPC or network failure on either chain.
    #[error("transport error: {0}")]
    Transport(String),
    /// The chain answered with data the relay cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to encode light client block: {0}")]
    Encoding(#[from] EncodeError),
}

impl RelayError {
    /// Fatal errors end the advancement loop; all others are retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Configuration(_))
    }

    /// Failures that come back unchanged on every retry of the same step.
    pub fn is_persistent(&self) -> bool {
        matches!(self, RelayError::Encoding(_))
    }

    /// Failures of a read that may succeed when asked again.
    pub fn is_retryable_read(&self) -> bool {
        matches!(
            self,
            RelayError::Transport(_)
                | RelayError::InvalidResponse(_)
                | RelayError::ProofUnavailable { .. }
        )
    }

    pub fn rejected(method: impl Into<String>, reason: impl ToString) -> Self {
        RelayError::TransactionRejected {
            method: method.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transport(err: impl ToString) -> Self {
        RelayError::Transport(err.to_string())
    }
}
