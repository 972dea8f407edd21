//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Events published per exchange
//! - Events received per queue
//! - Events delivered / dropped per gateway namespace
//! - Active WebSocket connection gauges

use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Events published to the bus, by exchange
pub static EVENTS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_published_total", "Total events published to the bus")
            .namespace("event_gateway"),
        &["exchange"],
    )
    .expect("Failed to create EVENTS_PUBLISHED_TOTAL metric")
});

/// Events received from bound queues, by queue
pub static EVENTS_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_received_total", "Total events received from the bus")
            .namespace("event_gateway"),
        &["queue"],
    )
    .expect("Failed to create EVENTS_RECEIVED_TOTAL metric")
});

/// Events delivered to sockets, by gateway namespace
pub static EVENTS_DELIVERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_delivered_total", "Total events delivered to sockets")
            .namespace("event_gateway"),
        &["namespace"],
    )
    .expect("Failed to create EVENTS_DELIVERED_TOTAL metric")
});

/// Events dropped without delivery, by reason
pub static EVENTS_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_dropped_total", "Total events dropped without delivery")
            .namespace("event_gateway"),
        &["reason"],
    )
    .expect("Failed to create EVENTS_DROPPED_TOTAL metric")
});

/// Active WebSocket connections gauge, by gateway namespace
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("event_gateway"),
        &["namespace"],
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(EVENTS_PUBLISHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_PUBLISHED_TOTAL");
    registry
        .register(Box::new(EVENTS_RECEIVED_TOTAL.clone()))
        .expect("Failed to register EVENTS_RECEIVED_TOTAL");
    registry
        .register(Box::new(EVENTS_DELIVERED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DELIVERED_TOTAL");
    registry
        .register(Box::new(EVENTS_DROPPED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DROPPED_TOTAL");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to record a publish
pub fn record_publish(exchange: &str) {
    EVENTS_PUBLISHED_TOTAL.with_label_values(&[exchange]).inc();
}

/// Helper to record a receipt from a bound queue
pub fn record_receive(queue: &str) {
    EVENTS_RECEIVED_TOTAL.with_label_values(&[queue]).inc();
}

/// Helper to record socket deliveries for a namespace
pub fn record_delivery(namespace: &str, sockets: usize) {
    EVENTS_DELIVERED_TOTAL
        .with_label_values(&[namespace])
        .inc_by(sockets as u64);
}

/// Helper to record a dropped event
pub fn record_drop(reason: &str) {
    EVENTS_DROPPED_TOTAL.with_label_values(&[reason]).inc();
}

/// Helper to track connection count changes for a namespace
pub fn add_websocket_connections(namespace: &str, delta: f64) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&[namespace])
        .add(delta);
}
