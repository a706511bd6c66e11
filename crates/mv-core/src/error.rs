//! Error types for the MV client core

use thiserror::Error;

/// Core MV errors
///
/// None of these are fatal to the client. Resolution and negotiation
/// failures degrade to street mode instead of surfacing here; this type
/// covers construction, parsing and collaborator plumbing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MvError {
    // Crypto errors
    #[error("Invalid public key bytes")]
    InvalidPublicKey,

    #[error("Invalid signature length: expected 64, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Invalid signature")]
    InvalidSignature,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Directory errors
    #[error("Directory error: {0}")]
    DirectoryError(String),

    // Transport errors
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Transport closed")]
    TransportClosed,
}

/// Result type for MV operations
pub type MvResult<T> = Result<T, MvError>;
