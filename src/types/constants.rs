/// Text reported to `on_message` in place of a non-text frame
pub const BINARY_FRAME_SENTINEL: &str = "[binary]";

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 15_000;

/// Default ceiling on consecutive automatic reconnect attempts
pub const MAX_RECONNECT_ATTEMPTS: u32 = 12;

/// Default outbound queue capacity (messages)
pub const OUTBOUND_QUEUE_CAPACITY: usize = 200;

/// Reconnect backoff defaults (milliseconds)
pub const RECONNECT_BASE_DELAY: u64 = 400;
pub const RECONNECT_MAX_DELAY: u64 = 30_000;
pub const RECONNECT_JITTER: u64 = 1_000;

/// Default handshake timeout (milliseconds)
pub const CONNECT_TIMEOUT: u64 = 10_000;

/// How long the writer waits for the close handshake before dropping the socket (milliseconds)
pub const CLOSE_TIMEOUT: u64 = 2_000;
