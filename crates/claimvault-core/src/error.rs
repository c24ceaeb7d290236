//! Error types for Claim Vault Core.

use thiserror::Error;

/// Errors raised when building or parsing core identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid entity id {0:?}")]
    InvalidEntityId(String),

    #[error("invalid partner code {0:?}")]
    InvalidPartnerCode(String),

    #[error("invalid artifact path {0:?}")]
    InvalidPath(String),
}

/// Error returned by collaborator bookkeeping hooks.
///
/// The host application owns the entity records; this crate only needs to
/// know that a hook failed and why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hook {hook} failed: {message}")]
pub struct HookError {
    pub hook: &'static str,
    pub message: String,
}

impl HookError {
    /// Create a new hook error.
    pub fn new(hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            hook,
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
