//! Error types for bw-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for bw-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bw-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The blob URL does not follow the address grammar
    #[error("Malformed blob address: {0}")]
    MalformedAddress(String),

    /// No registered instance matched and no usable inline credentials were given
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Container does not exist (reads never create containers)
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Blob does not exist in an existing container
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    /// Staged data could not be committed to the backend
    #[error("Commit of {target} failed: {reason}")]
    CommitFailure { target: String, reason: String },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configured instance not found
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network error talking to the backend
    #[error("Network error: {0}")]
    Network(String),

    /// A bounded wait elapsed
    #[error("Timed out: {0}")]
    Timeout(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::MalformedAddress(_) | Error::Config(_) => 2, // UsageError
            Error::Network(_) | Error::CommitFailure { .. } | Error::Timeout(_) => 3,
            Error::Auth(_) => 4,
            Error::BackendUnavailable(_)
            | Error::ContainerNotFound(_)
            | Error::BlobNotFound(_)
            | Error::InstanceNotFound(_) => 5, // NotFound
            _ => 1,
        }
    }

    /// Whether the error means the addressed container or blob is absent
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::ContainerNotFound(_) | Error::BlobNotFound(_))
    }
}
