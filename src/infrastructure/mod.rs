// Infrastructure module - Core background services and utilities
pub mod heartbeat;
pub mod queue;
pub mod task_manager;
pub mod timer;

pub use heartbeat::{Beat, HeartbeatManager, HeartbeatTarget};
pub use queue::OutboundQueue;
pub use task_manager::{TaskManager, TaskSlot};
pub use timer::Backoff;
