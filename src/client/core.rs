use super::connection::SocketHandle;
use super::{ClientState, ConnectionState, TelemetryClientBuilder, TelemetryClientOptions};
use crate::infrastructure::{Backoff, Beat, HeartbeatManager, HeartbeatTarget, TaskSlot};
use crate::messaging::InboundFrame;
use crate::types::{HeartbeatFrame, Result, TelemetryError};
use crate::websocket::{Connector, FrameStream, PendingSocket, Socket, run_writer};
use futures::stream::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Resolved client options
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub heartbeat_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub backoff: Backoff,
    pub close_timeout: Duration,
}

/// A resilient streaming connection to one sensor hub endpoint.
///
/// `TelemetryClient` owns at most one socket at a time. It reconnects with
/// capped exponential backoff after unexpected drops, sends a heartbeat
/// while open, and queues outbound messages while disconnected. Consumers see
/// it only through [`on_state`](Self::on_state) and
/// [`on_message`](Self::on_message); no runtime error ever reaches them.
///
/// `connect`, `send` and `close` return immediately and must be called from
/// within a Tokio runtime. Callbacks run synchronously on the task that
/// observed the event, so keep them short. A current-thread runtime gives the
/// strict single-context ordering consumers usually expect.
///
/// Dropping the client is the same as calling [`close()`](Self::close).
///
/// # Example
///
/// ```no_run
/// use sensorhub_realtime_rs::{TelemetryClient, TelemetryClientOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TelemetryClient::new("ws://192.168.4.1:81/stream", TelemetryClientOptions::default())?;
///
/// client.on_state(|state| println!("hub is {state}"));
/// client.on_message(|text| println!("reading: {text}"));
/// client.connect();
/// client.send(r#"{"cmd":"start"}"#);
/// # Ok(())
/// # }
/// ```
pub struct TelemetryClient {
    pub(crate) shared: Arc<Shared>,
}

impl TelemetryClient {
    /// Creates a client bound to `endpoint` using the WebSocket transport.
    ///
    /// This does not connect; call [`connect()`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Config`] if the endpoint is empty or an option is out of range.
    pub fn new(endpoint: impl Into<String>, options: TelemetryClientOptions) -> Result<Self> {
        TelemetryClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    /// Opens the socket unless one already exists (in any phase).
    ///
    /// Clears the manual-close flag. Failures are never returned: they show up
    /// as `Closed` on [`on_state`](Self::on_state) followed by automatic retries.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Best-effort send.
    ///
    /// Transmits immediately while open; otherwise, or if transmission fails,
    /// the message joins the outbound queue and goes out on the next open.
    pub fn send(&self, message: impl Into<String>) {
        self.shared.send(message.into());
    }

    /// Closes the socket and stops every timer. No automatic reconnect will
    /// follow; only a new [`connect()`](Self::connect) resumes. Safe to call repeatedly.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Current phase of the socket, `Closed` when there is none
    pub fn ready_state(&self) -> ConnectionState {
        self.shared.lock().ready_state()
    }

    pub fn is_connected(&self) -> bool {
        self.ready_state() == ConnectionState::Open
    }

    /// Replaces the state callback
    pub fn on_state<F>(&self, callback: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.shared.lock().callbacks.on_state = Some(Arc::new(callback));
    }

    /// Replaces the message callback. Non-text frames arrive as
    /// [`BINARY_FRAME_SENTINEL`](crate::types::BINARY_FRAME_SENTINEL).
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.lock().callbacks.on_message = Some(Arc::new(callback));
    }

    /// Replaces the callback fired when automatic reconnection gives up.
    /// Receives the number of attempts made.
    pub fn on_exhausted<F>(&self, callback: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.shared.lock().callbacks.on_exhausted = Some(Arc::new(callback));
    }

    /// Watch channel carrying every reported state change
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.lock().subscribe()
    }

    /// Text of the most recently received frame
    pub fn last_message(&self) -> Option<String> {
        self.shared.lock().last_message.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.lock().reconnect_attempts
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.shared.settings.max_reconnect_attempts
    }

    /// Number of messages waiting for an open socket
    pub fn queued_len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.shared.lock().queue.capacity()
    }

    /// Drops every queued message
    pub fn clear_queue(&self) {
        self.shared.lock().queue.clear();
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// State and behavior shared between the client handle and its tasks.
///
/// Tasks hold only a `Weak` reference, so they stop once the owning
/// [`TelemetryClient`] is gone.
pub(crate) struct Shared {
    endpoint: String,
    settings: Settings,
    connector: Arc<dyn Connector>,
    state: Mutex<ClientState>,
    this: Weak<Shared>,
}

impl Shared {
    pub fn new(
        endpoint: String,
        settings: Settings,
        queue_capacity: usize,
        connector: Arc<dyn Connector>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            endpoint,
            settings,
            connector,
            state: Mutex::new(ClientState::new(queue_capacity)),
            this: this.clone(),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, ClientState> {
        // Callbacks never run under the lock, so a poisoned guard still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(&self) {
        let generation = {
            let mut state = self.lock();
            if let Some(socket) = state.socket.as_ref() {
                tracing::debug!("connect() ignored, socket is {}", socket.phase());
                return;
            }
            state.manually_closed = false;
            state.task_manager.abort(TaskSlot::Reconnect);
            state.begin_attempt()
        };
        self.open_socket(generation);
    }

    /// Runs the connection attempt claimed by `begin_attempt` under `generation`
    fn open_socket(&self, generation: u64) {
        tracing::info!("Connecting to {}", self.endpoint);

        let pending = match self.connector.connect(&self.endpoint) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!("Could not create socket for {}: {}", self.endpoint, e);
                {
                    let mut state = self.lock();
                    if !state.is_current(generation) {
                        return;
                    }
                    state.socket = None;
                }
                self.schedule_reconnect(generation);
                return;
            }
        };

        let notice = {
            let mut state = self.lock();
            if !state.is_current(generation) {
                return;
            }
            state.transition(ConnectionState::Connecting)
        };
        notice.deliver();

        let mut state = self.lock();
        if state.is_current(generation) {
            let task = run_connection(self.this.clone(), generation, pending);
            state.task_manager.spawn(TaskSlot::Connection, task);
        }
    }

    /// Handshake succeeded: hand out the read half if this attempt is still wanted
    fn on_open(&self, generation: u64, socket: Socket) -> Option<FrameStream> {
        let Socket { sink, stream } = socket;
        let close_timeout = self.settings.close_timeout;

        let (notice, flushed) = {
            let mut state = self.lock();
            if !state.is_current(generation) {
                // Superseded while handshaking; let the writer close it politely.
                let (_, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_writer(sink, rx, close_timeout));
                return None;
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let this = self.this.clone();
            tokio::spawn(async move {
                let unsent = run_writer(sink, rx, close_timeout).await;
                if unsent.is_empty() {
                    return;
                }
                if let Some(client) = this.upgrade() {
                    client.requeue_unsent(unsent);
                }
            });

            let socket = state.socket.get_or_insert_with(SocketHandle::connecting);
            socket.mark_open(tx);
            state.reconnect_attempts = 0;
            let flushed = state.flush_queue();

            HeartbeatManager::new(self.this.clone(), generation)
                .with_interval(self.settings.heartbeat_interval)
                .spawn_on(&mut state.task_manager);

            (state.transition(ConnectionState::Open), flushed)
        };

        tracing::info!("Connected to {} ({} queued messages flushed)", self.endpoint, flushed);
        notice.deliver();
        Some(stream)
    }

    /// A writer died mid-stream; its untransmitted messages go back in the queue
    fn requeue_unsent(&self, unsent: Vec<String>) {
        let mut state = self.lock();
        tracing::debug!("Requeueing {} untransmitted messages", unsent.len());
        state.requeue_unsent(unsent);
        if state.socket.as_ref().is_some_and(|socket| socket.is_open()) {
            state.flush_queue();
        }
    }

    fn on_handshake_failed(&self, generation: u64, error: TelemetryError) {
        let notice = {
            let mut state = self.lock();
            if !state.is_current(generation) {
                return;
            }
            state.socket = None;
            state.task_manager.detach(TaskSlot::Connection);
            state.transition(ConnectionState::Closed)
        };

        tracing::warn!("Connection attempt to {} failed: {}", self.endpoint, error);
        notice.deliver();
        self.schedule_reconnect(generation);
    }

    fn on_message(&self, generation: u64, text: &str) {
        let callback = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.last_message = Some(text.to_owned());
            state.callbacks.on_message.clone()
        };

        if let Some(callback) = callback {
            callback(text);
        }
    }

    fn on_closing(&self, generation: u64) {
        let notice = {
            let mut state = self.lock();
            if !state.is_current(generation) {
                return;
            }
            match state.socket.as_mut() {
                Some(socket) if socket.is_open() => socket.mark_closing(),
                _ => return,
            }
            state.transition(ConnectionState::Closing)
        };
        notice.deliver();
    }

    fn on_closed(&self, generation: u64) {
        let notice = {
            let mut state = self.lock();
            if !state.is_current(generation) {
                return;
            }
            state.task_manager.abort(TaskSlot::Heartbeat);
            state.task_manager.detach(TaskSlot::Connection);
            if let Some(socket) = state.socket.take() {
                socket.close();
            }
            state.transition(ConnectionState::Closed)
        };

        tracing::info!("Connection to {} closed", self.endpoint);
        notice.deliver();
        self.schedule_reconnect(generation);
    }

    /// Arms the reconnect timer for a failed or dropped attempt, or gives up
    /// once the attempt ceiling is reached
    fn schedule_reconnect(&self, generation: u64) {
        let exhausted = {
            let mut state = self.lock();
            if !state.is_current(generation) || state.socket.is_some() {
                return;
            }

            if state.reconnect_attempts >= self.settings.max_reconnect_attempts {
                Some((state.reconnect_attempts, state.callbacks.on_exhausted.clone()))
            } else {
                state.reconnect_attempts += 1;
                let attempt = state.reconnect_attempts;
                let delay = self.settings.backoff.delay(attempt);
                tracing::info!(
                    "Reconnecting to {} in {}ms (attempt {}/{})",
                    self.endpoint,
                    delay.as_millis(),
                    attempt,
                    self.settings.max_reconnect_attempts
                );

                let this = self.this.clone();
                state.task_manager.spawn(TaskSlot::Reconnect, async move {
                    tokio::time::sleep(delay).await;
                    if let Some(client) = this.upgrade() {
                        client.on_reconnect_timer(generation);
                    }
                });
                None
            }
        };

        if let Some((attempts, callback)) = exhausted {
            tracing::warn!(
                "Giving up on {} after {} reconnect attempts",
                self.endpoint,
                attempts
            );
            if let Some(callback) = callback {
                callback(attempts);
            }
        }
    }

    fn on_reconnect_timer(&self, generation: u64) {
        let generation = {
            let mut state = self.lock();
            if !state.is_current(generation) || state.socket.is_some() {
                tracing::debug!("Stale reconnect timer ignored");
                return;
            }
            // This task is about to arm its own successor.
            state.task_manager.detach(TaskSlot::Reconnect);
            state.begin_attempt()
        };
        self.open_socket(generation);
    }

    fn send(&self, message: String) {
        let mut state = self.lock();

        let message = match state.socket.as_ref() {
            Some(socket) if socket.is_open() && state.queue.is_empty() => {
                match socket.try_send(message) {
                    Ok(()) => return,
                    Err(message) => {
                        tracing::debug!("Transmit failed, queueing message");
                        message
                    }
                }
            }
            _ => message,
        };

        if let Some(evicted) = state.queue.push(message) {
            tracing::debug!(
                "Outbound queue full, dropped oldest message ({} bytes)",
                evicted.len()
            );
        }

        if state.socket.as_ref().is_some_and(|socket| socket.is_open()) {
            state.flush_queue();
        }
    }

    fn close(&self) {
        let notice = {
            let mut state = self.lock();
            state.manually_closed = true;
            state.next_generation();
            state.task_manager.abort_all();
            match state.socket.take() {
                Some(socket) => {
                    socket.close();
                    tracing::info!("Closed connection to {}", self.endpoint);
                    Some(state.transition(ConnectionState::Closed))
                }
                None => None,
            }
        };

        if let Some(notice) = notice {
            notice.deliver();
        }
    }
}

impl HeartbeatTarget for Shared {
    fn beat(&self, generation: u64, frame: &HeartbeatFrame) -> Beat {
        let state = self.lock();
        if state.generation != generation {
            return Beat::Stale;
        }
        let Some(socket) = state.socket.as_ref() else {
            return Beat::Stale;
        };

        let text = match frame.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Could not encode heartbeat: {}", e);
                return Beat::Dropped;
            }
        };
        match socket.send_heartbeat(text) {
            Ok(()) => Beat::Sent,
            Err(_) => Beat::Dropped,
        }
    }
}

/// Drives one socket: waits for the handshake, then reads until the stream ends
async fn run_connection(this: Weak<Shared>, generation: u64, pending: PendingSocket) {
    let result = pending.await;

    let mut stream = {
        let Some(client) = this.upgrade() else {
            return;
        };
        match result {
            Ok(socket) => match client.on_open(generation, socket) {
                Some(stream) => stream,
                None => return,
            },
            Err(e) => {
                client.on_handshake_failed(generation, e);
                return;
            }
        }
    };

    tracing::debug!("Starting read task");
    while let Some(msg_result) = stream.next().await {
        let Some(client) = this.upgrade() else {
            return;
        };

        match msg_result {
            Ok(msg) => match InboundFrame::from_message(msg) {
                InboundFrame::Close { code, reason } => {
                    tracing::info!("Hub closed connection: code={:?}, reason='{}'", code, reason);
                    client.on_closing(generation);
                }
                InboundFrame::Control => {
                    tracing::trace!("Received control frame");
                }
                frame => {
                    if let InboundFrame::Binary(len) = frame {
                        tracing::debug!("Received binary frame ({} bytes)", len);
                    }
                    if let Some(text) = frame.delivered_text() {
                        client.on_message(generation, text);
                    }
                }
            },
            Err(e) => {
                // Absorbed; the close below drives the state change.
                tracing::warn!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    tracing::debug!("Read task finished");
    if let Some(client) = this.upgrade() {
        client.on_closed(generation);
    }
}
