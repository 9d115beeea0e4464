use thiserror::Error;

/// Errors surfaced by the ingestion and analysis pipeline.
///
/// Every variant carries the underlying message so the HTTP layer can report
/// it as `details`.
#[derive(Error, Debug)]
pub enum CodefixError {
    /// Missing or malformed input. The caller has to fix the request.
    #[error("{0}")]
    Validation(String),

    /// A record, repository slot or file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Cloning the remote repository failed.
    #[error("Failed to clone repository: {0}")]
    Acquisition(String),

    /// The text-generation endpoint was unreachable or answered with an error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Local filesystem read or traversal failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The record store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CodefixError>;

impl CodefixError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Short machine-friendly label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Acquisition(_) => "acquisition",
            Self::ExternalService(_) => "external_service",
            Self::Io(_) => "io",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

impl From<rusqlite::Error> for CodefixError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for CodefixError {
    fn from(err: r2d2::Error) -> Self {
        Self::Storage(format!("connection pool: {}", err))
    }
}

impl From<serde_json::Error> for CodefixError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("document encoding: {}", err))
    }
}

impl From<tokio::task::JoinError> for CodefixError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}

impl From<::config::ConfigError> for CodefixError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
