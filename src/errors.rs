use std::fmt;

/// Application-specific error types.
///
/// Transport and parse failures never escape the resolver surface: the
/// public lookup methods catch them, log, and return the empty value for
/// their return type. These variants exist for the internal fetch/parse
/// layer and for callers of `PropertyAssembler::assemble`.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Error interacting with an external service (timeout, connection
    /// failure, HTTP error status).
    ExternalApiError(String),
    /// An expected landmark or structure was missing from a scraped page.
    ParseError(String),
    /// Invalid input (e.g. an address missing required parts).
    BadRequest(String),
    /// Internal error.
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApiError(err.to_string())
    }
}
