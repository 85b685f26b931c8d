//! Error types for the store, the directory and the coordinator

/// Failure of the backing key-value store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(Box<str>),
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Failure of the user directory itself (a missing user is not an error)
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(Box<str>),
}

/// Invalid or unreadable configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Configuration validation error: {0}")]
    Validation(Box<str>),
}

/// Error returned by coordinator operations
///
/// Domain conditions (already drawn, too few participants, no result yet)
/// are never errors; only collaborator faults surface here.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Coordinator lock poisoned")]
    LockPoisoned,
}

impl ExchangeError {
    /// Check if the error came from the backing store
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Check if the error came from the user directory
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}
