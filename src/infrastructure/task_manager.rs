use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Background task roles owned by one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    /// Handshake followed by the read loop
    Connection,
    Heartbeat,
    Reconnect,
}

/// Manages background tasks with proper lifecycle handling
pub struct TaskManager {
    handles: HashMap<TaskSlot, JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Spawn a task into `slot`, aborting whatever occupied it
    pub fn spawn<F>(&mut self, slot: TaskSlot, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        if let Some(previous) = self.handles.insert(slot, handle) {
            previous.abort();
        }
    }

    /// Abort the task in `slot`, if any
    pub fn abort(&mut self, slot: TaskSlot) {
        if let Some(handle) = self.handles.remove(&slot) {
            handle.abort();
        }
    }

    /// Forget the task in `slot` without aborting it.
    ///
    /// Used by a task that is about to replace itself, so the replacement
    /// does not cancel the caller mid-flight.
    pub fn detach(&mut self, slot: TaskSlot) {
        self.handles.remove(&slot);
    }

    pub fn is_active(&self, slot: TaskSlot) -> bool {
        self.handles
            .get(&slot)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
