use crate::types::{Result, TelemetryError};
use futures::future::BoxFuture;
use futures::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

pub type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

/// Handshake in flight; resolves to an open socket or a failed attempt
pub type PendingSocket = BoxFuture<'static, Result<Socket>>;

/// An open, full-duplex frame transport
pub struct Socket {
    pub(crate) sink: FrameSink,
    pub(crate) stream: FrameStream,
}

impl Socket {
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<Message, Error = WsError> + Send + 'static,
        R: Stream<Item = std::result::Result<Message, WsError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

/// Creates sockets for a [`TelemetryClient`](crate::TelemetryClient).
///
/// Returning `Err` synchronously means the socket could not even be
/// constructed; the client skips the `Connecting` phase and goes straight to
/// the reconnect scheduler. A pending socket that resolves to `Err` is a
/// failed handshake.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, endpoint: &str) -> Result<PendingSocket>;
}

/// WebSocket connector for creating hub connections
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::types::CONNECT_TIMEOUT))
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, endpoint: &str) -> Result<PendingSocket> {
        let url = Url::parse(endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TelemetryError::UnsupportedScheme(url.scheme().to_string()));
        }

        let connect_timeout = self.connect_timeout;
        Ok(async move {
            tracing::debug!("Creating WebSocket connection to: {}", url);
            let (ws_stream, response) =
                tokio::time::timeout(connect_timeout, connect_async(url.as_str()))
                    .await
                    .map_err(|_| TelemetryError::Timeout)??;
            tracing::debug!("Handshake completed with status {}", response.status());

            let (write_half, read_half) = ws_stream.split();
            Ok::<_, TelemetryError>(Socket::new(write_half, read_half))
        }
        .boxed())
    }
}

/// Frames queued for the writer task of one socket
#[derive(Debug)]
pub(crate) enum Outgoing {
    /// Consumer message; handed back if the socket cannot take it
    Text(String),
    /// Heartbeat frame; dropped if the socket cannot take it
    Heartbeat(String),
}

impl Outgoing {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Heartbeat(text) => text,
        }
    }
}

/// Forwards queued frames to the socket until the sender side is dropped,
/// then performs the close handshake.
///
/// If a write fails, returns the consumer messages that never reached the
/// socket, in send order: the failed one first, then everything still queued.
pub(crate) async fn run_writer(
    mut sink: FrameSink,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<Outgoing>,
    close_timeout: Duration,
) -> Vec<String> {
    while let Some(frame) = rx.recv().await {
        let message = match &frame {
            Outgoing::Text(text) | Outgoing::Heartbeat(text) => {
                Message::Text(text.clone().into())
            }
        };
        if let Err(e) = sink.send(message).await {
            tracing::debug!("WebSocket write failed: {}", e);
            rx.close();
            let mut unsent = Vec::new();
            if let Outgoing::Text(text) = frame {
                unsent.push(text);
            }
            while let Ok(frame) = rx.try_recv() {
                if let Outgoing::Text(text) = frame {
                    unsent.push(text);
                }
            }
            return unsent;
        }
    }

    match tokio::time::timeout(close_timeout, sink.close()).await {
        Ok(Ok(())) => tracing::debug!("WebSocket closed by client"),
        Ok(Err(e)) => tracing::debug!("WebSocket close handshake failed: {}", e),
        Err(_) => tracing::debug!("WebSocket close handshake timed out"),
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_endpoint_synchronously() {
        let connector = WebSocketConnector::default();
        assert!(matches!(
            connector.connect("not a url"),
            Err(TelemetryError::UrlParse(_))
        ));
    }

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let connector = WebSocketConnector::default();
        match connector.connect("http://192.168.4.1:81/stream") {
            Err(TelemetryError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "http"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("http endpoint should be rejected"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_hub_fails_the_handshake() {
        // Port 9 on localhost is discard; nothing listens there in CI.
        let connector = WebSocketConnector::new(Duration::from_millis(500));
        let pending = connector.connect("ws://127.0.0.1:9/stream").unwrap();
        assert!(pending.await.is_err());
    }

    #[tokio::test]
    async fn test_writer_forwards_frames_then_closes() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (frame_tx, mut frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        let sink: FrameSink = Box::pin(frame_tx.sink_map_err(|_| WsError::ConnectionClosed));

        tx.send(Outgoing::Text("a".to_string())).unwrap();
        tx.send(Outgoing::Text("b".to_string())).unwrap();
        drop(tx);

        assert!(run_writer(sink, rx, Duration::from_millis(100)).await.is_empty());

        assert_eq!(frame_rx.next().await, Some(Message::Text("a".into())));
        assert_eq!(frame_rx.next().await, Some(Message::Text("b".into())));
        assert_eq!(frame_rx.next().await, None);
    }

    #[tokio::test]
    async fn test_failed_write_returns_unsent_messages() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        drop(frame_rx);
        let sink: FrameSink = Box::pin(frame_tx.sink_map_err(|_| WsError::ConnectionClosed));

        tx.send(Outgoing::Text("a".to_string())).unwrap();
        tx.send(Outgoing::Heartbeat(r#"{"type":"ping","ts":1}"#.to_string()))
            .unwrap();
        tx.send(Outgoing::Text("b".to_string())).unwrap();

        let unsent = run_writer(sink, rx, Duration::from_millis(100)).await;

        assert_eq!(unsent, vec!["a".to_string(), "b".to_string()]);
        // The writer refuses anything sent after the failure.
        assert!(tx.send(Outgoing::Text("c".to_string())).is_err());
    }
}
