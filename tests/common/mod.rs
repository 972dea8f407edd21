//! Common Test Utilities
//!
//! Shared helpers wiring a full in-process distribution stack: bus,
//! receivers, local bus, and one gateway per namespace.

use std::sync::Arc;

use tokio::sync::mpsc;

use event_gateway::application::{EventPublisher, EventReceiver, LocalBus, QueueBinding};
use event_gateway::config::BusSettings;
use event_gateway::domain::{
    DmActivity, EventBody, EventEnvelope, EventOrigin, PresenceState, RoomMessage, StatusUpdate,
};
use event_gateway::infrastructure::bus::{client::BusClient, topology};
use event_gateway::presentation::websocket::{DeliveryMode, Gateway, Namespace, SocketId};

/// A full publish-to-socket pipeline with all three namespaces wired up.
pub struct TestStack {
    pub bus: Arc<BusClient>,
    pub local: Arc<LocalBus>,
    pub settings: BusSettings,
    pub user_gateway: Arc<Gateway>,
    pub dm_gateway: Arc<Gateway>,
    pub room_gateway: Arc<Gateway>,
}

impl TestStack {
    pub fn new(delivery: DeliveryMode) -> Self {
        let settings = BusSettings::default();
        let bus = Arc::new(BusClient::new());
        topology::declare_topology(&bus, &settings).unwrap();
        let local = Arc::new(LocalBus::new(64));

        let bindings = [
            QueueBinding {
                queue: "user-status-notifications".into(),
                exchange: settings.status_exchange.clone(),
                pattern: "events.user.*".into(),
                options: topology::status_queue(&settings),
            },
            QueueBinding {
                queue: "dm-notifications".into(),
                exchange: settings.events_exchange.clone(),
                pattern: "events.dms".into(),
                options: topology::durable_queue(),
            },
            QueueBinding {
                queue: "room-notifications".into(),
                exchange: settings.events_exchange.clone(),
                pattern: "events.publicRooms".into(),
                options: topology::durable_queue(),
            },
        ];
        for binding in bindings {
            EventReceiver::bind(Arc::clone(&bus), Arc::clone(&local), binding)
                .unwrap()
                .spawn();
        }

        let user_gateway = Arc::new(Gateway::new(Namespace::UserStatus, delivery));
        let dm_gateway = Arc::new(Gateway::new(Namespace::DirectMessages, delivery));
        let room_gateway = Arc::new(Gateway::new(Namespace::Rooms, delivery));
        Gateway::spawn_pumps(&user_gateway, &local);
        Gateway::spawn_pumps(&dm_gateway, &local);
        Gateway::spawn_pumps(&room_gateway, &local);

        Self {
            bus,
            local,
            settings,
            user_gateway,
            dm_gateway,
            room_gateway,
        }
    }

    pub fn publisher(&self, app_id: &str) -> EventPublisher {
        EventPublisher::new(Arc::clone(&self.bus), &self.settings, app_id)
    }

    /// Register an authenticated socket on a gateway, returning its id and
    /// the receiving end standing in for the wire.
    pub fn connect(
        &self,
        gateway: &Gateway,
        uid: &str,
    ) -> (SocketId, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (gateway.register(uid, tx), rx)
    }
}

pub fn status_event(uid: &str, state: PresenceState) -> EventEnvelope {
    EventEnvelope::new(
        EventOrigin::new(uid, format!("user-{uid}")),
        EventBody::Status(StatusUpdate { state }),
    )
}

pub fn dm_event(from: &str, recipient: &str, room: &str) -> EventEnvelope {
    EventEnvelope::new(
        EventOrigin::new(from, format!("user-{from}")),
        EventBody::DmActivity(DmActivity {
            recipient_uid: recipient.into(),
            room_uid: room.into(),
            preview: None,
        }),
    )
}

pub fn room_event(from: &str, room: &str, message: &str) -> EventEnvelope {
    EventEnvelope::new(
        EventOrigin::new(from, format!("user-{from}")),
        EventBody::RoomMessage(RoomMessage {
            room_uid: room.into(),
            message_uid: message.into(),
            preview: None,
        }),
    )
}
