use thiserror::Error;

/// Errors that can occur when building or opening a telemetry connection.
///
/// Once a [`TelemetryClient`](crate::TelemetryClient) exists, none of these reach
/// the consumer: runtime failures are absorbed into the connection state machine.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid client options
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Endpoint is not a `ws://` or `wss://` URL
    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// Handshake did not complete within the connect timeout
    #[error("Timeout error")]
    Timeout,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, TelemetryError>`.
pub type Result<T> = std::result::Result<T, TelemetryError>;
