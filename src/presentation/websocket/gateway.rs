//! Connection Gateway
//!
//! Manages live sockets and their broadcast-group memberships for one event
//! namespace, and fans local-bus events out to the sockets joined to the
//! addressed room. Membership exists only as live socket-group state; it is
//! rebuilt on every reconnect and nothing here is persisted.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::local_bus::LocalBus;
use crate::domain::envelope::{circle_room, EventEnvelope, MessageKind};
use crate::infrastructure::metrics;

pub type SocketId = String;

/// Event namespaces, one gateway instance per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    UserStatus,
    DirectMessages,
    Rooms,
}

impl Namespace {
    /// Local-bus channels this namespace bridges to its sockets.
    pub fn kinds(&self) -> &'static [MessageKind] {
        match self {
            Namespace::UserStatus => &[MessageKind::Status],
            Namespace::DirectMessages => &[MessageKind::Dm],
            Namespace::Rooms => &[MessageKind::RoomMessage],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::UserStatus => "user",
            Namespace::DirectMessages => "dms",
            Namespace::Rooms => "rooms",
        }
    }
}

/// Multi-connection delivery policy for a single uid.
///
/// `PerConnection` sends every circle event to every socket of the user;
/// `PerUser` deduplicates to one socket per uid per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    PerConnection,
    PerUser,
}

/// A live, authenticated socket.
struct ConnectedSocket {
    uid: String,
    sender: mpsc::UnboundedSender<EventEnvelope>,
    /// Rooms this socket is joined to, mirrored in the room index.
    rooms: Mutex<HashSet<String>>,
}

/// Socket registry and room index for one namespace.
pub struct Gateway {
    namespace: Namespace,
    delivery: DeliveryMode,
    sockets: DashMap<SocketId, Arc<ConnectedSocket>>,
    rooms: DashMap<String, HashSet<SocketId>>,
}

impl Gateway {
    pub fn new(namespace: Namespace, delivery: DeliveryMode) -> Self {
        Self {
            namespace,
            delivery,
            sockets: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Register an authenticated connection.
    ///
    /// The socket is auto-joined to its own notification circle and to the
    /// bare uid room for targeted addressing.
    pub fn register(&self, uid: &str, sender: mpsc::UnboundedSender<EventEnvelope>) -> SocketId {
        let socket_id = Uuid::new_v4().to_string();
        let socket = Arc::new(ConnectedSocket {
            uid: uid.to_string(),
            sender,
            rooms: Mutex::new(HashSet::new()),
        });
        self.sockets.insert(socket_id.clone(), socket);

        self.join(&socket_id, &circle_room(uid));
        self.join(&socket_id, uid);

        metrics::add_websocket_connections(self.namespace.as_str(), 1.0);
        tracing::info!(
            namespace = self.namespace.as_str(),
            uid,
            socket_id = %socket_id,
            "Socket registered"
        );
        socket_id
    }

    /// Join a socket to a room. Idempotent.
    pub fn join(&self, socket_id: &SocketId, room: &str) {
        let Some(socket) = self.sockets.get(socket_id) else {
            return;
        };
        socket.rooms.lock().insert(room.to_string());
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(socket_id.clone());
    }

    /// Remove a socket from a room.
    pub fn leave(&self, socket_id: &SocketId, room: &str) {
        if let Some(socket) = self.sockets.get(socket_id) {
            socket.rooms.lock().remove(room);
        }
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(socket_id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }

    /// Terminal transition: release every membership the socket held.
    pub fn disconnect(&self, socket_id: &SocketId) {
        if let Some((_, socket)) = self.sockets.remove(socket_id) {
            let rooms: Vec<String> = socket.rooms.lock().drain().collect();
            for room in rooms {
                if let Some(mut members) = self.rooms.get_mut(&room) {
                    members.remove(socket_id);
                }
                self.rooms.remove_if(&room, |_, members| members.is_empty());
            }
            metrics::add_websocket_connections(self.namespace.as_str(), -1.0);
            tracing::info!(
                namespace = self.namespace.as_str(),
                uid = %socket.uid,
                socket_id = %socket_id,
                "Socket disconnected"
            );
        }
    }

    /// Deliver an envelope to the room it is addressed to.
    ///
    /// At-most-once, best-effort: an empty room drops the event silently.
    pub fn dispatch(&self, envelope: EventEnvelope) {
        let room = envelope.address().room_name();
        self.emit_to_room(&room, envelope);
    }

    fn emit_to_room(&self, room: &str, envelope: EventEnvelope) {
        let member_ids: Vec<SocketId> = match self.rooms.get(room) {
            Some(members) => members.iter().cloned().collect(),
            None => Vec::new(),
        };

        if member_ids.is_empty() {
            tracing::debug!(
                namespace = self.namespace.as_str(),
                room,
                message_type = envelope.body.message_type(),
                "No sockets joined, event dropped"
            );
            metrics::record_drop("empty_room");
            return;
        }

        let mut seen_uids: HashSet<String> = HashSet::new();
        let mut delivered = 0usize;
        for socket_id in member_ids {
            let Some(socket) = self.sockets.get(&socket_id) else {
                continue;
            };
            if self.delivery == DeliveryMode::PerUser && !seen_uids.insert(socket.uid.clone()) {
                continue;
            }
            if socket.sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }

        metrics::record_delivery(self.namespace.as_str(), delivered);
        tracing::debug!(
            namespace = self.namespace.as_str(),
            room,
            delivered,
            message_type = envelope.body.message_type(),
            "Event fanned out"
        );
    }

    /// Bridge a gateway to the local bus, one pump task per message kind.
    pub fn spawn_pumps(gateway: &Arc<Gateway>, local: &LocalBus) -> Vec<JoinHandle<()>> {
        gateway
            .namespace
            .kinds()
            .iter()
            .map(|kind| {
                let mut rx = local.subscribe(*kind);
                let gateway = Arc::clone(gateway);
                tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(envelope) => gateway.dispatch(envelope),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(
                                    namespace = gateway.namespace.as_str(),
                                    skipped,
                                    "Gateway pump lagged"
                                );
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                })
            })
            .collect()
    }

    pub fn is_joined(&self, socket_id: &SocketId, room: &str) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(socket_id))
            .unwrap_or(false)
    }

    /// Rooms the socket is currently joined to.
    pub fn joined_rooms(&self, socket_id: &SocketId) -> Vec<String> {
        self.sockets
            .get(socket_id)
            .map(|socket| socket.rooms.lock().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Socket ids currently joined to a room.
    pub fn room_members(&self, room: &str) -> Vec<SocketId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All rooms with at least one member.
    pub fn room_names(&self) -> Vec<String> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{EventBody, EventOrigin, PresenceState, StatusUpdate};
    use pretty_assertions::assert_eq;

    fn status_envelope(uid: &str) -> EventEnvelope {
        EventEnvelope::new(
            EventOrigin::new(uid, "alice"),
            EventBody::Status(StatusUpdate {
                state: PresenceState::Online,
            }),
        )
    }

    fn connect(gateway: &Gateway, uid: &str) -> (SocketId, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (gateway.register(uid, tx), rx)
    }

    #[tokio::test]
    async fn register_joins_circle_and_uid_room() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerConnection);
        let (socket_id, _rx) = connect(&gateway, "u1");

        let mut rooms = gateway.joined_rooms(&socket_id);
        rooms.sort();
        assert_eq!(rooms, vec!["u1".to_string(), "u1-circle".to_string()]);
    }

    #[tokio::test]
    async fn double_join_delivers_once() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerConnection);
        let (socket_id, mut rx) = connect(&gateway, "u2");

        gateway.join(&socket_id, "u1-circle");
        gateway.join(&socket_id, "u1-circle");

        gateway.dispatch(status_envelope("u1"));
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_stops_delivery() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerConnection);
        let (socket_id, mut rx) = connect(&gateway, "u2");

        gateway.join(&socket_id, "u1-circle");
        gateway.leave(&socket_id, "u1-circle");

        gateway.dispatch(status_envelope("u1"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_clears_all_memberships() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerConnection);
        let (socket_id, _rx) = connect(&gateway, "u1");
        gateway.join(&socket_id, "u9-circle");
        gateway.join(&socket_id, "room-42");

        gateway.disconnect(&socket_id);

        assert_eq!(gateway.socket_count(), 0);
        for room in gateway.room_names() {
            assert!(
                !gateway.room_members(&room).contains(&socket_id),
                "socket still indexed in {room}"
            );
        }
    }

    #[tokio::test]
    async fn empty_room_drops_event() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerConnection);
        // No sockets at all; dispatch must be a silent no-op.
        gateway.dispatch(status_envelope("u1"));
        assert_eq!(gateway.socket_count(), 0);
    }

    #[tokio::test]
    async fn per_user_mode_deduplicates_multi_tab_delivery() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerUser);
        let (_first, mut rx1) = connect(&gateway, "u2");
        let (_second, mut rx2) = connect(&gateway, "u2");

        gateway.dispatch(status_envelope("u2"));

        let delivered = usize::from(rx1.try_recv().is_ok()) + usize::from(rx2.try_recv().is_ok());
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn per_connection_mode_reaches_every_tab() {
        let gateway = Gateway::new(Namespace::UserStatus, DeliveryMode::PerConnection);
        let (_first, mut rx1) = connect(&gateway, "u2");
        let (_second, mut rx2) = connect(&gateway, "u2");

        gateway.dispatch(status_envelope("u2"));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }
}
