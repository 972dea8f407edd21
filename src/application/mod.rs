//! Application Layer
//!
//! The publish/receive pipeline: bus publisher, queue receiver, and the
//! typed local event bus that decouples transport from socket delivery.

pub mod local_bus;
pub mod publisher;
pub mod receiver;

pub use local_bus::LocalBus;
pub use publisher::EventPublisher;
pub use receiver::{EventReceiver, QueueBinding};
