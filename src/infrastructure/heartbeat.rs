use super::{TaskManager, TaskSlot};
use crate::types::{HEARTBEAT_INTERVAL, HeartbeatFrame};
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{self, Instant};

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_INTERVAL);

/// Outcome of handing one heartbeat to the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Heartbeat handed to the socket writer
    Sent,
    /// Heartbeat could not be transmitted; ignored
    Dropped,
    /// The socket this heartbeat belongs to is gone
    Stale,
}

/// Receiver of heartbeats
pub trait HeartbeatTarget: Send + Sync + 'static {
    fn beat(&self, generation: u64, frame: &HeartbeatFrame) -> Beat;
}

/// Periodically sends heartbeats on one open socket
pub struct HeartbeatManager<T: HeartbeatTarget> {
    interval: Duration,
    generation: u64,
    target: Weak<T>,
}

impl<T: HeartbeatTarget> HeartbeatManager<T> {
    pub fn new(target: Weak<T>, generation: u64) -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            generation,
            target,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat task into the heartbeat slot of `tasks`
    pub fn spawn_on(self, tasks: &mut TaskManager) {
        tasks.spawn(TaskSlot::Heartbeat, self.run());
    }

    async fn run(self) {
        // First heartbeat one full interval after open, so flushed sends go first.
        let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;

            // Client dropped, exit heartbeat task
            let Some(target) = self.target.upgrade() else {
                break;
            };

            let frame = HeartbeatFrame::now();
            match target.beat(self.generation, &frame) {
                Beat::Sent => tracing::debug!("Sent heartbeat ts={}", frame.ts),
                Beat::Dropped => tracing::debug!("Heartbeat ts={} not sent, ignoring", frame.ts),
                Beat::Stale => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct Recorder {
        generation: u64,
        beats: Mutex<Vec<u64>>,
        outcome: Beat,
    }

    impl HeartbeatTarget for Recorder {
        fn beat(&self, generation: u64, frame: &HeartbeatFrame) -> Beat {
            if generation != self.generation {
                return Beat::Stale;
            }
            self.beats.lock().unwrap().push(frame.ts);
            self.outcome
        }
    }

    fn recorder(generation: u64, outcome: Beat) -> Arc<Recorder> {
        Arc::new(Recorder {
            generation,
            beats: Mutex::new(Vec::new()),
            outcome,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_beat_waits_one_interval() {
        let target = recorder(1, Beat::Sent);
        let mut tasks = TaskManager::new();
        HeartbeatManager::new(Arc::downgrade(&target), 1)
            .with_interval(Duration::from_millis(15_000))
            .spawn_on(&mut tasks);

        time::sleep(Duration::from_millis(14_999)).await;
        assert!(target.beats.lock().unwrap().is_empty());

        time::sleep(Duration::from_millis(30_002)).await;
        assert_eq!(target.beats.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_beats_keep_the_loop_alive() {
        let target = recorder(1, Beat::Dropped);
        let mut tasks = TaskManager::new();
        HeartbeatManager::new(Arc::downgrade(&target), 1)
            .with_interval(Duration::from_millis(1_000))
            .spawn_on(&mut tasks);

        time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(target.beats.lock().unwrap().len(), 3);
        assert!(tasks.is_active(TaskSlot::Heartbeat));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_stops_task() {
        let target = recorder(2, Beat::Sent);
        let mut tasks = TaskManager::new();
        HeartbeatManager::new(Arc::downgrade(&target), 1)
            .with_interval(Duration::from_millis(1_000))
            .spawn_on(&mut tasks);

        time::sleep(Duration::from_millis(1_500)).await;
        assert!(target.beats.lock().unwrap().is_empty());
        assert!(!tasks.is_active(TaskSlot::Heartbeat));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_target_stops_task() {
        let target = recorder(1, Beat::Sent);
        let mut tasks = TaskManager::new();
        HeartbeatManager::new(Arc::downgrade(&target), 1)
            .with_interval(Duration::from_millis(1_000))
            .spawn_on(&mut tasks);
        drop(target);

        time::sleep(Duration::from_millis(1_500)).await;
        assert!(!tasks.is_active(TaskSlot::Heartbeat));
    }
}
