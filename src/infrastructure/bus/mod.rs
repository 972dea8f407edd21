//! Topic Bus
//!
//! In-process topic bus with AMQP-style semantics: topic exchanges, durable
//! and transient (TTL) queues, wildcard bindings, and per-queue consumers.

pub mod client;
pub mod topology;

pub use client::{BusClient, Consumer, Delivery, ExchangeKind, PublishOptions, QueueOptions};
pub use topology::{declare_topology, durable_queue, status_queue};
