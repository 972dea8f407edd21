//! Local Event Bus
//!
//! Typed in-process publish-subscribe keyed by message kind. Receivers
//! re-emit decoded envelopes here; gateways subscribe to the kinds of their
//! namespace. One broker consumer per service fans out to arbitrarily many
//! local subscribers without additional broker load.
//!
//! Dropping a subscription deregisters it, so subscriber lifetime follows
//! the subscribing task (no leaked registrations after a socket closes).

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::domain::envelope::{EventEnvelope, MessageKind};

/// In-process fan-out channel set, one broadcast channel per message kind.
pub struct LocalBus {
    channels: DashMap<MessageKind, broadcast::Sender<EventEnvelope>>,
    capacity: usize,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    fn channel(&self, kind: MessageKind) -> broadcast::Sender<EventEnvelope> {
        self.channels
            .entry(kind)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Re-emit an envelope under its message kind.
    ///
    /// Returns the number of live subscribers; zero means the event had no
    /// local consumer and was dropped.
    pub fn emit(&self, envelope: EventEnvelope) -> usize {
        let kind = envelope.body.kind();
        let sender = self.channel(kind);
        match sender.send(envelope) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(?kind, "No local subscribers, event dropped");
                0
            }
        }
    }

    /// Subscribe to all envelopes of one kind.
    pub fn subscribe(&self, kind: MessageKind) -> broadcast::Receiver<EventEnvelope> {
        self.channel(kind).subscribe()
    }

    /// Live subscriber count for a kind.
    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.channels
            .get(&kind)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
