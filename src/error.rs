//! Error types for pose-stream

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// pose-stream error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (socket or file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wire protocol violation by the peer
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Endpoint string is not `tcp://<host>:<port>`
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Text payload could not be parsed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Bone name not in the humanoid bone set
    #[error("Unknown bone: {0}")]
    UnknownBone(String),

    /// Publisher initialized without a rig
    #[error("No rig attached to publisher")]
    MissingRig,

    /// Operation requires an initialized publisher
    #[error("Publisher not initialized")]
    NotInitialized,

    /// Publisher already initialized
    #[error("Publisher already initialized")]
    AlreadyInitialized,

    /// Publisher was torn down
    #[error("Publisher has been shut down")]
    ShutDown,
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
