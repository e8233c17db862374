// WebSocket module - Transport seam and the tungstenite-backed connector
mod factory;

pub use factory::{Connector, FrameSink, FrameStream, PendingSocket, Socket, WebSocketConnector};
pub(crate) use factory::{Outgoing, run_writer};
