use super::connection::{ConnectionState, SocketHandle};
use crate::infrastructure::{OutboundQueue, TaskManager};
use std::sync::Arc;
use tokio::sync::watch;

pub type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync + 'static>;
pub type MessageCallback = Arc<dyn Fn(&str) + Send + Sync + 'static>;
pub type ExhaustedCallback = Arc<dyn Fn(u32) + Send + Sync + 'static>;

/// Single-slot consumer callbacks
#[derive(Default)]
pub struct Callbacks {
    pub on_state: Option<StateCallback>,
    pub on_message: Option<MessageCallback>,
    pub on_exhausted: Option<ExhaustedCallback>,
}

/// A state change to deliver once the state lock is released
#[must_use]
pub struct StateNotice {
    state: ConnectionState,
    callback: Option<StateCallback>,
}

impl StateNotice {
    fn silent(state: ConnectionState) -> Self {
        Self {
            state,
            callback: None,
        }
    }

    pub fn deliver(self) {
        if let Some(callback) = self.callback {
            callback(self.state);
        }
    }
}

/// Consolidated mutable state for TelemetryClient
/// Using a single struct keeps every transition under one lock
pub struct ClientState {
    /// The live socket, if any (`None` reads as `Closed`)
    pub(crate) socket: Option<SocketHandle>,

    /// Messages waiting for an open socket
    pub queue: OutboundQueue,

    /// Consecutive failed attempts since the last successful open
    pub reconnect_attempts: u32,

    /// Set by `close()`, cleared by `connect()`
    pub manually_closed: bool,

    /// Bumped by every connection attempt and every `close()`
    pub generation: u64,

    /// Background task manager
    pub task_manager: TaskManager,

    /// Most recent frame text delivered to consumers
    pub last_message: Option<String>,

    pub callbacks: Callbacks,

    /// Last state pushed to consumers
    reported: ConnectionState,

    /// Sender for state change notifications
    state_change_tx: watch::Sender<ConnectionState>,
}

impl ClientState {
    pub fn new(queue_capacity: usize) -> Self {
        let (state_change_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            socket: None,
            queue: OutboundQueue::new(queue_capacity),
            reconnect_attempts: 0,
            manually_closed: false,
            generation: 0,
            task_manager: TaskManager::new(),
            last_message: None,
            callbacks: Callbacks::default(),
            reported: ConnectionState::Closed,
            state_change_tx,
        }
    }

    /// Start a new generation; anything tagged with an older one becomes a no-op
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Claim the socket slot for a new connection attempt.
    ///
    /// Callers check `socket.is_none()` under the same lock, so concurrent
    /// `connect()` calls cannot both start a handshake.
    pub fn begin_attempt(&mut self) -> u64 {
        self.socket = Some(SocketHandle::connecting());
        self.next_generation()
    }

    /// Whether work tagged `generation` may still act on this client
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && !self.manually_closed
    }

    pub fn ready_state(&self) -> ConnectionState {
        self.socket
            .as_ref()
            .map_or(ConnectionState::Closed, SocketHandle::phase)
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_change_tx.subscribe()
    }

    /// Record a state change and prepare its notification.
    ///
    /// Repeating the last reported state produces a silent notice.
    pub fn transition(&mut self, state: ConnectionState) -> StateNotice {
        if self.reported == state {
            return StateNotice::silent(state);
        }
        self.reported = state;
        self.state_change_tx.send_replace(state);
        StateNotice {
            state,
            callback: self.callbacks.on_state.clone(),
        }
    }

    /// Transmit queued messages in order; stops at the first failure and
    /// leaves that message at the head of the queue
    pub fn flush_queue(&mut self) -> usize {
        let Some(socket) = self.socket.as_ref() else {
            return 0;
        };

        let mut flushed = 0;
        while let Some(message) = self.queue.pop_front() {
            if let Err(message) = socket.try_send(message) {
                self.queue.requeue_front(message);
                break;
            }
            flushed += 1;
        }
        flushed
    }

    /// Put messages a dead writer never transmitted back at the head of the
    /// queue, keeping their original order
    pub fn requeue_unsent(&mut self, unsent: Vec<String>) {
        for message in unsent.into_iter().rev() {
            self.queue.requeue_front(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[test]
    fn test_transition_dedupes_repeated_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut state = ClientState::new(4);
        let sink = Arc::clone(&seen);
        state.callbacks.on_state = Some(Arc::new(move |s| sink.lock().unwrap().push(s)));

        state.transition(ConnectionState::Closed).deliver();
        state.transition(ConnectionState::Connecting).deliver();
        state.transition(ConnectionState::Connecting).deliver();
        state.transition(ConnectionState::Open).deliver();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionState::Connecting, ConnectionState::Open]
        );
    }

    #[test]
    fn test_begin_attempt_claims_the_socket_slot() {
        let mut state = ClientState::new(4);
        let generation = state.begin_attempt();

        assert!(state.is_current(generation));
        assert_eq!(state.ready_state(), ConnectionState::Connecting);
        assert!(state.socket.is_some());
    }

    #[test]
    fn test_requeue_unsent_goes_ahead_of_newer_messages() {
        let mut state = ClientState::new(4);
        state.queue.push("c".to_string());
        state.requeue_unsent(vec!["a".to_string(), "b".to_string()]);

        let queued: Vec<&str> = state.queue.iter().collect();
        assert_eq!(queued, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_transition_updates_watchers() {
        let mut state = ClientState::new(4);
        let rx = state.subscribe();
        state.transition(ConnectionState::Connecting).deliver();
        assert_eq!(*rx.borrow(), ConnectionState::Connecting);
    }

    #[test]
    fn test_generation_guard() {
        let mut state = ClientState::new(4);
        let first = state.next_generation();
        assert!(state.is_current(first));

        let second = state.next_generation();
        assert!(!state.is_current(first));
        assert!(state.is_current(second));

        state.manually_closed = true;
        assert!(!state.is_current(second));
    }

    #[test]
    fn test_flush_drains_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ClientState::new(4);
        state.queue.push("a".to_string());
        state.queue.push("b".to_string());
        let mut socket = SocketHandle::connecting();
        socket.mark_open(tx);
        state.socket = Some(socket);

        assert_eq!(state.flush_queue(), 2);
        assert!(state.queue.is_empty());
        let sent: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|frame| frame.into_text())
            .collect();
        assert_eq!(sent, vec!["a", "b"]);
    }

    #[test]
    fn test_failed_flush_keeps_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut state = ClientState::new(4);
        state.queue.push("a".to_string());
        state.queue.push("b".to_string());
        let mut socket = SocketHandle::connecting();
        socket.mark_open(tx);
        state.socket = Some(socket);

        assert_eq!(state.flush_queue(), 0);
        assert_eq!(state.queue.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
