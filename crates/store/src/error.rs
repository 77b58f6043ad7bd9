//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service rejected or failed the call.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored item could not be turned back into an alarm.
    #[error("malformed stored item: {0}")]
    Decode(String),
}
