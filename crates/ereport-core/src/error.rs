use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown interval: {0:?} (expected daily, weekly, fortnightly, monthly, quarterly or yearly)")]
    UnknownInterval(String),
}

impl CoreError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::UnknownInterval(_) => "INVALID_INTERVAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
