use super::TelemetryClient;
use super::core::{Settings, Shared};
use crate::infrastructure::Backoff;
use crate::types::{
    CLOSE_TIMEOUT, CONNECT_TIMEOUT, HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS,
    OUTBOUND_QUEUE_CAPACITY, RECONNECT_BASE_DELAY, RECONNECT_JITTER, RECONNECT_MAX_DELAY, Result,
    TelemetryError,
};
use crate::websocket::{Connector, WebSocketConnector};
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for a [`TelemetryClient`]. Durations are in milliseconds;
/// `None` selects the default.
#[derive(Debug, Clone, Default)]
pub struct TelemetryClientOptions {
    /// Interval between heartbeats (default 15000)
    pub heartbeat_interval: Option<u64>,
    /// Automatic reconnects allowed before going idle (default 12)
    pub max_reconnect_attempts: Option<u32>,
    /// Outbound queue capacity in messages (default 200)
    pub queue_capacity: Option<usize>,
    /// Backoff base delay (default 400)
    pub reconnect_base_delay: Option<u64>,
    /// Backoff cap before jitter (default 30000)
    pub reconnect_max_delay: Option<u64>,
    /// Upper bound of the random delay added to each backoff (default 1000)
    pub reconnect_jitter: Option<u64>,
    /// Handshake timeout for the default connector (default 10000)
    pub connect_timeout: Option<u64>,
}

/// Builder for TelemetryClient that handles initialization
pub struct TelemetryClientBuilder {
    endpoint: String,
    options: TelemetryClientOptions,
    connector: Option<Arc<dyn Connector>>,
}

impl TelemetryClientBuilder {
    /// Create a new builder
    pub fn new(endpoint: impl Into<String>, options: TelemetryClientOptions) -> Result<Self> {
        let endpoint = endpoint.into();

        if endpoint.trim().is_empty() {
            return Err(TelemetryError::Config("endpoint is required".to_string()));
        }
        if options.queue_capacity == Some(0) {
            return Err(TelemetryError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if options.heartbeat_interval == Some(0) {
            return Err(TelemetryError::Config(
                "heartbeat_interval must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            options,
            connector: None,
        })
    }

    /// Use `connector` instead of the WebSocket transport
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Build the client. No connection is made until `connect()`.
    pub fn build(self) -> TelemetryClient {
        let options = &self.options;
        let settings = Settings {
            heartbeat_interval: Duration::from_millis(
                options.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL),
            ),
            max_reconnect_attempts: options
                .max_reconnect_attempts
                .unwrap_or(MAX_RECONNECT_ATTEMPTS),
            backoff: Backoff::new(
                Duration::from_millis(options.reconnect_base_delay.unwrap_or(RECONNECT_BASE_DELAY)),
                Duration::from_millis(options.reconnect_max_delay.unwrap_or(RECONNECT_MAX_DELAY)),
                Duration::from_millis(options.reconnect_jitter.unwrap_or(RECONNECT_JITTER)),
            ),
            close_timeout: Duration::from_millis(CLOSE_TIMEOUT),
        };
        let queue_capacity = options.queue_capacity.unwrap_or(OUTBOUND_QUEUE_CAPACITY);

        let connector = self.connector.unwrap_or_else(|| {
            Arc::new(WebSocketConnector::new(Duration::from_millis(
                self.options.connect_timeout.unwrap_or(CONNECT_TIMEOUT),
            )))
        });

        TelemetryClient {
            shared: Shared::new(self.endpoint, settings, queue_capacity, connector),
        }
    }
}
