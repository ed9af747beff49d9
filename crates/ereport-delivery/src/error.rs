use thiserror::Error;

/// Errors raised while fetching panel data or emailing a report.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The query endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered but reported a failed query.
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Could not build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryError::Http(_) => "HTTP_ERROR",
            DeliveryError::Api { .. } => "API_ERROR",
            DeliveryError::Query(_) => "QUERY_ERROR",
            DeliveryError::Parse(_) => "PARSE_ERROR",
            DeliveryError::Address(_) => "ADDRESS_ERROR",
            DeliveryError::Message(_) | DeliveryError::Smtp(_) => "SMTP_ERROR",
            DeliveryError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
