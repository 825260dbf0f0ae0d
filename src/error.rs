//! Error taxonomy for the vault core.
//!
//! Every variant is recoverable: callers surface it as transient state and
//! let the user retry. `AuthRejected` carries one constant message no matter
//! which credential path was attempted.

use thiserror::Error;

/// Message shown for any PIN that matches neither secret.
pub const AUTH_REJECTED_MESSAGE: &str = "Decryption Failed";

/// Message shown when the registration confirmation differs.
pub const PIN_MISMATCH_MESSAGE: &str = "PINs do not match";

/// Message shown when the camera cannot be acquired.
pub const CAMERA_DENIED_MESSAGE: &str = "Camera access needed for enrollment.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: String, available: String },

    #[error("Decryption Failed")]
    AuthRejected,

    #[error("PINs do not match")]
    PinMismatch,

    #[error("Enclave Connection Failed: {0}")]
    EnclaveUnreachable(String),

    #[error("Camera access needed for enrollment.")]
    CameraAccessDenied,

    #[error("Illegal transition: {event} while {phase}")]
    IllegalTransition { phase: String, event: String },

    #[error("No authenticated session")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid config: {0}")]
    Config(String),
}

impl VaultError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code, used by the HTTP and CLI adapters.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Validation(_) => "validation",
            VaultError::InsufficientFunds { .. } => "insufficient_funds",
            VaultError::AuthRejected => "auth_rejected",
            VaultError::PinMismatch => "pin_mismatch",
            VaultError::EnclaveUnreachable(_) => "enclave_unreachable",
            VaultError::CameraAccessDenied => "camera_access_denied",
            VaultError::IllegalTransition { .. } => "illegal_transition",
            VaultError::NotAuthenticated => "not_authenticated",
            VaultError::Storage(_) => "storage",
            VaultError::Config(_) => "config",
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
