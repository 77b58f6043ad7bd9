use thiserror::Error;

/// A request that cannot be turned into provisioning work.
///
/// Raised before any task is built; the display text is safe to return to
/// the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("\"{0}\" cannot be an empty string")]
    EmptyField(&'static str),

    #[error("there are no crons or dates specified")]
    NoSchedules,

    #[error("invalid date '{0}': expected YYYY-MM-DDThh:mm[:ss]")]
    InvalidDate(String),

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
}

/// Configuration that parsed but cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}
