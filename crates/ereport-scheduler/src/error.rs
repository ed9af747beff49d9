use ereport_delivery::DeliveryError;
use ereport_render::RenderError;
use thiserror::Error;

/// Errors that can occur while running scheduled reports.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Fetching panel data or emailing the report failed.
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No schedule with the given ID exists in the store.
    #[error("Schedule not found: {id}")]
    ScheduleNotFound { id: String },
}

impl SchedulerError {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::Database(_) => "DATABASE_ERROR",
            SchedulerError::Render(e) => e.code(),
            SchedulerError::Delivery(e) => e.code(),
            SchedulerError::Io(_) => "IO_ERROR",
            SchedulerError::ScheduleNotFound { .. } => "SCHEDULE_NOT_FOUND",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
