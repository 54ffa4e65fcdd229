use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Remote error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Node store error: {0}")]
    NodeStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::net::AddrParseError> for RefreshError {
    fn from(err: std::net::AddrParseError) -> Self {
        RefreshError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RefreshError>;
