use crate::websocket::Outgoing;
use tokio::sync::mpsc;

/// Phase of the client's connection, as reported to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single socket a client owns: its phase and the writer feeding it
pub(crate) struct SocketHandle {
    phase: ConnectionState,
    writer: Option<mpsc::UnboundedSender<Outgoing>>,
}

impl SocketHandle {
    /// Handshake started, nothing to write to yet
    pub fn connecting() -> Self {
        Self {
            phase: ConnectionState::Connecting,
            writer: None,
        }
    }

    pub fn phase(&self) -> ConnectionState {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == ConnectionState::Open
    }

    pub fn mark_open(&mut self, writer: mpsc::UnboundedSender<Outgoing>) {
        self.phase = ConnectionState::Open;
        self.writer = Some(writer);
    }

    pub fn mark_closing(&mut self) {
        self.phase = ConnectionState::Closing;
    }

    /// Hands `text` to the writer task, giving it back if the socket cannot take it
    pub fn try_send(&self, text: String) -> Result<(), String> {
        self.forward(Outgoing::Text(text))
    }

    /// Like [`try_send`](Self::try_send), but the writer drops it on a failed write
    pub fn send_heartbeat(&self, text: String) -> Result<(), String> {
        self.forward(Outgoing::Heartbeat(text))
    }

    fn forward(&self, frame: Outgoing) -> Result<(), String> {
        match &self.writer {
            Some(writer) if self.is_open() => writer.send(frame).map_err(|e| e.0.into_text()),
            _ => Err(frame.into_text()),
        }
    }

    /// Releases the socket; the writer task finishes the close handshake on its own
    pub fn close(mut self) {
        self.phase = ConnectionState::Closed;
        self.writer.take();
    }
}
