use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    /// True for failures that ended the underlying connection.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::ConnectionTimeout(_) | Self::ConnectionClosed
        )
    }
}
