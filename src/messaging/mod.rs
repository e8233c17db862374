// Messaging module - Inbound frame handling and the consumer parse boundary
pub mod decode;
pub mod event;

pub use decode::{ParseError, decode_frame};
pub use event::InboundFrame;
