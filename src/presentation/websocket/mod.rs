//! WebSocket Gateways
//!
//! Authenticated real-time fan-out, one gateway per event namespace.

pub mod gateway;
pub mod handler;
pub mod messages;

pub use gateway::{DeliveryMode, Gateway, Namespace, SocketId};
pub use handler::{dm_events_handler, room_events_handler, user_events_handler};
pub use messages::{ConnectParams, SubscriptionChange};
