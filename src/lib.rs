//! # Sensor Hub Realtime
//!
//! A resilient streaming connection to an on-device sensor hub over WebSocket.
//!
//! The client keeps at most one socket open, reconnects with capped exponential
//! backoff and jitter, sends a periodic heartbeat, and buffers outbound
//! messages while the link is down. Consumers observe it through two callbacks:
//! connection state and raw message text. Payloads are opaque; parsing belongs
//! to the consumer (see [`decode_frame`]).
//!
//! ## Example
//!
//! ```no_run
//! use sensorhub_realtime_rs::{TelemetryClient, TelemetryClientOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TelemetryClient::new(
//!         "ws://192.168.4.1:81/stream",
//!         TelemetryClientOptions::default(),
//!     )?;
//!
//!     client.on_message(|text| println!("{text}"));
//!     client.connect();
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use client::{ConnectionState, TelemetryClient, TelemetryClientBuilder, TelemetryClientOptions};
pub use messaging::{ParseError, decode_frame};
pub use types::{BINARY_FRAME_SENTINEL, HeartbeatFrame, Result, TelemetryError};
pub use websocket::{Connector, PendingSocket, Socket, WebSocketConnector};
