// Service Errors
// Umbrella error type for the matrix service library

use crate::parser::error::ParseError;

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed declaration; nothing runs
    #[error(transparent)]
    Configuration(#[from] ParseError),

    #[error("unknown environment '{name}' (available: {})", .available.join(", "))]
    UnknownEnvironment { name: String, available: Vec<String> },

    #[error("no configuration file found (looked for {} from {})", .candidates.join(", "), .start.display())]
    ConfigNotFound {
        start: std::path::PathBuf,
        candidates: Vec<String>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
