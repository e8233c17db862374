// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{TelemetryClientBuilder, TelemetryClientOptions};
pub use connection::ConnectionState;
pub use core::TelemetryClient;
pub(crate) use state::ClientState;
pub use state::{ExhaustedCallback, MessageCallback, StateCallback};
