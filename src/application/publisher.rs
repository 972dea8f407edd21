//! Event Publisher
//!
//! Wraps the shared bus connection for upstream services. Publishing is
//! fire-and-forget from the caller's perspective (no ack wait); broker
//! failures are logged and returned to the immediate caller, never
//! swallowed, so the caller decides whether to retry or drop.

use std::sync::Arc;

use chrono::Utc;

use crate::config::BusSettings;
use crate::domain::envelope::{EventEnvelope, MessageKind};
use crate::infrastructure::bus::client::{BusClient, PublishOptions};
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

/// Publishing side of the event distribution layer.
pub struct EventPublisher {
    bus: Arc<BusClient>,
    app_id: String,
    events_exchange: String,
    status_exchange: String,
}

impl EventPublisher {
    pub fn new(bus: Arc<BusClient>, settings: &BusSettings, app_id: impl Into<String>) -> Self {
        Self {
            bus,
            app_id: app_id.into(),
            events_exchange: settings.events_exchange.clone(),
            status_exchange: settings.status_exchange.clone(),
        }
    }

    fn exchange_for(&self, kind: MessageKind) -> &str {
        match kind {
            MessageKind::Status => &self.status_exchange,
            MessageKind::Dm | MessageKind::RoomMessage => &self.events_exchange,
        }
    }

    /// Publish an envelope to the routing key fixed by its category.
    pub fn publish(&self, envelope: &EventEnvelope) -> Result<(), GatewayError> {
        let payload = serde_json::to_vec(envelope)?;
        let routing_key = envelope.body.routing_key();
        let exchange = self.exchange_for(envelope.body.kind());
        let properties = PublishOptions {
            delivery_mode: 1,
            timestamp: Utc::now(),
            app_id: self.app_id.clone(),
        };

        self.bus
            .publish(exchange, routing_key, payload, properties)
            .map_err(|e| {
                tracing::error!(
                    exchange,
                    routing_key,
                    message_type = envelope.body.message_type(),
                    error = %e,
                    "Failed to publish event"
                );
                GatewayError::Publish(e)
            })?;

        metrics::record_publish(exchange);
        tracing::debug!(
            exchange,
            routing_key,
            message_type = envelope.body.message_type(),
            from = %envelope.from.uid,
            "Event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{DmActivity, EventBody, EventOrigin, PresenceState, StatusUpdate};
    use crate::infrastructure::bus::topology;
    use crate::infrastructure::bus::QueueOptions;
    use pretty_assertions::assert_eq;

    fn setup() -> (Arc<BusClient>, BusSettings, EventPublisher) {
        let settings = BusSettings::default();
        let bus = Arc::new(BusClient::new());
        topology::declare_topology(&bus, &settings).unwrap();
        let publisher = EventPublisher::new(Arc::clone(&bus), &settings, "user-service");
        (bus, settings, publisher)
    }

    fn status_envelope() -> EventEnvelope {
        EventEnvelope::new(
            EventOrigin::new("u1", "alice"),
            EventBody::Status(StatusUpdate {
                state: PresenceState::Online,
            }),
        )
    }

    #[tokio::test]
    async fn status_events_go_to_status_exchange() {
        let (bus, settings, publisher) = setup();
        bus.declare_queue("status", QueueOptions::default()).unwrap();
        bus.bind_queue("status", &settings.status_exchange, "events.user.*")
            .unwrap();

        publisher.publish(&status_envelope()).unwrap();

        let mut consumer = bus.consume("status").unwrap();
        let delivery = consumer.recv().await.unwrap();
        assert_eq!(delivery.routing_key, "events.user.status");
        assert_eq!(delivery.properties.delivery_mode, 1);
        assert_eq!(delivery.properties.app_id, "user-service");
    }

    #[tokio::test]
    async fn dm_events_go_to_main_exchange() {
        let (bus, settings, publisher) = setup();
        bus.declare_queue("dms", QueueOptions::default()).unwrap();
        bus.bind_queue("dms", &settings.events_exchange, "events.dms")
            .unwrap();

        let envelope = EventEnvelope::new(
            EventOrigin::new("u1", "alice"),
            EventBody::DmActivity(DmActivity {
                recipient_uid: "u2".into(),
                room_uid: "dm-7".into(),
                preview: None,
            }),
        );
        publisher.publish(&envelope).unwrap();

        let mut consumer = bus.consume("dms").unwrap();
        let delivery = consumer.recv().await.unwrap();
        let decoded: EventEnvelope = serde_json::from_slice(&delivery.payload).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn broker_failure_propagates_to_caller() {
        let (bus, _, publisher) = setup();
        bus.shutdown();

        let err = publisher.publish(&status_envelope()).unwrap_err();
        assert!(matches!(err, GatewayError::Publish(_)));
    }
}
