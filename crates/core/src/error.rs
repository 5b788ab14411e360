//! Error types for cosup-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for cosup-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cosup-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing or malformed settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid local path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Object key or prefix that cannot be stored
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::InvalidKey(_) => 2, // UsageError
            Error::Config(_) | Error::TomlParse(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::Network(_) => 3,                            // NetworkError
            Error::Auth(_) => 4,                               // AuthError
            Error::NotFound(_) => 5,                           // NotFound
            _ => 1,                                            // GeneralError
        }
    }
}
