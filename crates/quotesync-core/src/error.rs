use thiserror::Error;

/// All the ways things can go wrong in QuoteSync
///
/// Nothing here is fatal to the process. Callers either keep their prior
/// state or fall back to a safe default and carry on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("No valid quotes found in the import data")]
    NoValidRecords,

    #[error("Import data could not be read: {0}")]
    ImportUnreadable(String),

    #[error("Failed to fetch quotes from server: {0}")]
    RemoteFetch(String),

    #[error("Failed to publish quote to server: {0}")]
    RemotePublish(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// User-facing input problems. The operation is aborted with no mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter the quote text")]
    EmptyText,

    #[error("Please enter a category")]
    EmptyCategory,

    #[error("That quote already exists in '{0}'")]
    Duplicate(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

impl From<quotesync_cache::CacheError> for Error {
    fn from(err: quotesync_cache::CacheError) -> Self {
        Error::Storage(err.to_string())
    }
}
