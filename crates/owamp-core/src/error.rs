//! Shared error type across owamp-export crates.

use thiserror::Error;

/// Coarse error classes (stable, used in logs and assertions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or inconsistent configuration. Fatal at startup.
    Config,
    /// A summary artifact could not be turned into a report.
    Ingestion,
    /// The measurement subprocess could not be launched or wired up.
    Lifecycle,
    /// Filesystem or sink I/O.
    Io,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Config => "CONFIG",
            ErrorClass::Ingestion => "INGESTION",
            ErrorClass::Lifecycle => "LIFECYCLE",
            ErrorClass::Io => "IO",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, OwampError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum OwampError {
    #[error("config: {0}")]
    Config(String),
    #[error("report: {0}")]
    Report(String),
    #[error("process: {0}")]
    Process(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl OwampError {
    /// Map the error to its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            OwampError::Config(_) => ErrorClass::Config,
            OwampError::Report(_) => ErrorClass::Ingestion,
            OwampError::Process(_) => ErrorClass::Lifecycle,
            OwampError::Io(_) => ErrorClass::Io,
            OwampError::Internal(_) => ErrorClass::Internal,
        }
    }
}
