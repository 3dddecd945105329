use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Duplicate record: {0}")]
    DuplicateError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// The provider accepted the submission but returned no task id.
    #[error("Failed to start image generation: {0}")]
    MissingTaskId(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::RequestError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
