//! Event Receiver
//!
//! Binds one queue to one routing-key pattern, decodes delivered envelopes,
//! and re-emits them on the local event bus. A failing handler drops that
//! single message and keeps the consume loop alive, so one bad delivery
//! cannot take down the receiving process.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::application::local_bus::LocalBus;
use crate::domain::envelope::EventEnvelope;
use crate::infrastructure::bus::client::{BusClient, Delivery, QueueOptions};
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

/// One queue bound to one routing-key pattern on one exchange.
#[derive(Debug, Clone)]
pub struct QueueBinding {
    pub queue: String,
    pub exchange: String,
    pub pattern: String,
    pub options: QueueOptions,
}

/// Receiving side of the event distribution layer.
pub struct EventReceiver {
    bus: Arc<BusClient>,
    local: Arc<LocalBus>,
    binding: QueueBinding,
}

impl EventReceiver {
    /// Declare and bind the queue, ready to consume.
    pub fn bind(
        bus: Arc<BusClient>,
        local: Arc<LocalBus>,
        binding: QueueBinding,
    ) -> Result<Self, GatewayError> {
        bus.declare_queue(&binding.queue, binding.options.clone())?;
        bus.bind_queue(&binding.queue, &binding.exchange, &binding.pattern)?;
        tracing::info!(
            queue = %binding.queue,
            exchange = %binding.exchange,
            pattern = %binding.pattern,
            "Receiver bound"
        );
        Ok(Self { bus, local, binding })
    }

    /// Spawn the consume loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let mut consumer = match self.bus.consume(&self.binding.queue) {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!(queue = %self.binding.queue, error = %e, "Failed to consume");
                return;
            }
        };

        while let Some(delivery) = consumer.recv().await {
            if let Err(e) = self.handle(&delivery) {
                // Contained: the broker's redelivery policy governs retry,
                // not application code.
                tracing::warn!(
                    queue = %self.binding.queue,
                    routing_key = %delivery.routing_key,
                    error = %e,
                    "Dropping undeliverable message"
                );
                metrics::record_drop("handler_failure");
            }
        }
        tracing::info!(queue = %self.binding.queue, "Consume loop terminated");
    }

    fn handle(&self, delivery: &Delivery) -> Result<(), GatewayError> {
        let envelope: EventEnvelope = serde_json::from_slice(&delivery.payload)
            .map_err(|e| GatewayError::Handler(e.to_string()))?;

        // Transport timestamp is observability-only, never used for ordering.
        tracing::debug!(
            queue = %self.binding.queue,
            routing_key = %delivery.routing_key,
            timestamp = %delivery.properties.timestamp,
            app_id = %delivery.properties.app_id,
            message_type = envelope.body.message_type(),
            "Event received"
        );
        metrics::record_receive(&self.binding.queue);

        self.local.emit(envelope);
        Ok(())
    }
}
