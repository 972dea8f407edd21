//! Bus Topology
//!
//! Exchange and queue declarations for the event distribution layer.
//!
//! Standing event categories (DMs, public rooms) flow through a durable
//! topic exchange. Status events flow through a separate non-durable
//! exchange whose queues are transient with a short message TTL: presence
//! is perishable, and a stale update is worse than none.

use tokio::time::Duration;

use crate::config::BusSettings;
use crate::infrastructure::bus::client::{BusClient, ExchangeKind, QueueOptions};
use crate::shared::error::BusError;

/// Declare both exchanges on a freshly constructed client.
pub fn declare_topology(bus: &BusClient, settings: &BusSettings) -> Result<(), BusError> {
    bus.declare_exchange(&settings.events_exchange, ExchangeKind::Topic, true)?;
    bus.declare_exchange(&settings.status_exchange, ExchangeKind::Topic, false)?;
    tracing::info!(
        events_exchange = %settings.events_exchange,
        status_exchange = %settings.status_exchange,
        "Bus topology declared"
    );
    Ok(())
}

/// Options for the default fan-out queues bound to the main exchange.
pub fn durable_queue() -> QueueOptions {
    QueueOptions {
        durable: true,
        auto_delete: false,
        message_ttl: None,
    }
}

/// Options for high-churn status queues.
pub fn status_queue(settings: &BusSettings) -> QueueOptions {
    QueueOptions {
        durable: false,
        auto_delete: true,
        message_ttl: Some(Duration::from_millis(settings.status_message_ttl_ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_declares_both_exchanges() {
        let settings = BusSettings::default();
        let bus = BusClient::new();
        declare_topology(&bus, &settings).unwrap();

        assert_eq!(bus.exchange_is_durable(&settings.events_exchange), Some(true));
        assert_eq!(bus.exchange_is_durable(&settings.status_exchange), Some(false));
    }

    #[test]
    fn status_queue_carries_ttl() {
        let settings = BusSettings::default();
        let options = status_queue(&settings);
        assert!(options.auto_delete);
        assert!(!options.durable);
        assert_eq!(options.message_ttl, Some(Duration::from_millis(10_000)));
    }
}
