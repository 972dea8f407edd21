//! Event Envelope Contract
//!
//! The immutable `{messageType, from, data}` structure carried through the
//! topic bus and the local fan-out. The set of message types is closed:
//! unknown tags fail deserialization at the receiver boundary instead of
//! flowing through untyped.

use serde::{Deserialize, Serialize};

/// Identity of the publishing user as stamped into every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOrigin {
    pub uid: String,
    #[serde(default)]
    pub username: String,
    /// Socket that triggered the event, when one exists.
    #[serde(rename = "socketId", default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
}

impl EventOrigin {
    pub fn new(uid: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            username: username.into(),
            socket_id: None,
        }
    }
}

/// The envelope published to the bus and delivered verbatim to sockets.
///
/// Immutable once published; handler stages pass it by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub from: EventOrigin,
    #[serde(flatten)]
    pub body: EventBody,
}

impl EventEnvelope {
    pub fn new(from: EventOrigin, body: EventBody) -> Self {
        Self { from, body }
    }

    /// Broadcast group this envelope is addressed to.
    pub fn address(&self) -> Address {
        match &self.body {
            EventBody::Status(_) => Address::Circle(self.from.uid.clone()),
            EventBody::DmActivity(dm) => Address::Circle(dm.recipient_uid.clone()),
            EventBody::RoomMessage(msg) => Address::Room(msg.room_uid.clone()),
        }
    }
}

/// Closed tagged union of `messageType -> data` shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "data")]
pub enum EventBody {
    /// Presence change for the publishing user.
    #[serde(rename = "user.notification.status")]
    Status(StatusUpdate),
    /// Activity in a direct-message thread, addressed to the recipient.
    #[serde(rename = "user.notification.dm")]
    DmActivity(DmActivity),
    /// New message in a public room.
    #[serde(rename = "publicRooms.message")]
    RoomMessage(RoomMessage),
}

impl EventBody {
    /// Wire tag, also the channel the local bus re-emits under.
    pub fn message_type(&self) -> &'static str {
        match self {
            EventBody::Status(_) => "user.notification.status",
            EventBody::DmActivity(_) => "user.notification.dm",
            EventBody::RoomMessage(_) => "publicRooms.message",
        }
    }

    /// Routing key fixed by the producer at publish time.
    pub fn routing_key(&self) -> &'static str {
        match self {
            EventBody::Status(_) => "events.user.status",
            EventBody::DmActivity(_) => "events.dms",
            EventBody::RoomMessage(_) => "events.publicRooms",
        }
    }

    /// Coarse category used to key the local bus and pick the exchange.
    pub fn kind(&self) -> MessageKind {
        match self {
            EventBody::Status(_) => MessageKind::Status,
            EventBody::DmActivity(_) => MessageKind::Dm,
            EventBody::RoomMessage(_) => MessageKind::RoomMessage,
        }
    }
}

/// Local re-emit channel selector, one per message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Status,
    Dm,
    RoomMessage,
}

/// Broadcast group an envelope resolves to.
///
/// A circle is the implicit per-user notification group; a room is a named
/// shared group (public room or DM thread).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Circle(String),
    Room(String),
}

impl Address {
    /// Broker-level room name for this address.
    pub fn room_name(&self) -> String {
        match self {
            Address::Circle(uid) => circle_room(uid),
            Address::Room(room) => room.clone(),
        }
    }
}

/// Name of a user's notification circle.
pub fn circle_room(uid: &str) -> String {
    format!("{uid}-circle")
}

/// Presence states carried by status events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    Online,
    Offline,
    Away,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub state: PresenceState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmActivity {
    pub recipient_uid: String,
    pub room_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub room_uid: String,
    pub message_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}
