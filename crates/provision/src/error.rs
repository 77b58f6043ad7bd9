//! Provisioning error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// The remote schedule does not exist (already deleted or never created).
    #[error("schedule not found: {0}")]
    NotFound(String),

    /// The remote API rejected or failed the call.
    #[error("provider error: {0}")]
    Provider(String),

    /// Failure unrelated to the remote call, e.g. encoding the target payload.
    #[error("internal error: {0}")]
    Internal(String),

    /// The caller's scope was cancelled before the call completed.
    #[error("provisioning cancelled")]
    Cancelled,
}

impl ProvisionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProvisionError::NotFound(_))
    }
}
