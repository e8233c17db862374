pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{Result, TelemetryError};
pub use message::HeartbeatFrame;
