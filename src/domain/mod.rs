//! Domain Layer
//!
//! The envelope contract carried through the bus and the topic routing rules.

pub mod envelope;
pub mod routing;

pub use envelope::{
    circle_room, Address, DmActivity, EventBody, EventEnvelope, EventOrigin, MessageKind,
    PresenceState, RoomMessage, StatusUpdate,
};
pub use routing::topic_matches;
