//! Bus Client
//!
//! An explicitly constructed bus handle with an init/teardown lifecycle
//! scoped to process startup/shutdown. Models AMQP 0-9-1 topic semantics:
//! exchanges route published messages to bound queues by pattern-matching
//! the dot-delimited routing key.
//!
//! Channel operations are serialized by the underlying primitives; callers
//! share a single client per process across all publishers and receivers.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};

use crate::domain::routing::topic_matches;
use crate::shared::error::BusError;

/// Exchange types supported by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
}

/// Queue declaration options.
///
/// Durable queues survive broker restart and back the standing event
/// categories. Transient queues auto-delete and carry a message TTL for
/// high-churn status events where staleness makes redelivery useless.
#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    pub durable: bool,
    pub auto_delete: bool,
    pub message_ttl: Option<Duration>,
}

/// Properties stamped on every published message.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// 1 = non-persistent; routed events are not required to survive restart.
    pub delivery_mode: u8,
    pub timestamp: DateTime<Utc>,
    /// Publishing service identifier, for traceability.
    pub app_id: String,
}

/// A message delivered to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub properties: PublishOptions,
}

#[derive(Debug)]
struct Exchange {
    #[allow(dead_code)]
    kind: ExchangeKind,
    durable: bool,
}

#[derive(Debug, Clone)]
struct Binding {
    exchange: String,
    pattern: String,
    queue: String,
}

#[derive(Debug)]
struct Queue {
    options: QueueOptions,
    messages: Mutex<VecDeque<(Instant, Delivery)>>,
    notify: Notify,
    consumers: AtomicUsize,
}

impl Queue {
    fn new(options: QueueOptions) -> Self {
        Self {
            options,
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            consumers: AtomicUsize::new(0),
        }
    }

    /// Pop the next message whose TTL has not elapsed.
    fn pop_live(&self) -> Option<Delivery> {
        let mut messages = self.messages.lock();
        while let Some((enqueued_at, delivery)) = messages.pop_front() {
            if let Some(ttl) = self.options.message_ttl {
                if enqueued_at.elapsed() > ttl {
                    tracing::trace!(
                        routing_key = %delivery.routing_key,
                        "Discarding expired message"
                    );
                    continue;
                }
            }
            return Some(delivery);
        }
        None
    }
}

/// Shared bus connection handle.
///
/// One instance per process; cheap to share behind an `Arc`.
pub struct BusClient {
    exchanges: DashMap<String, Exchange>,
    queues: Arc<DashMap<String, Arc<Queue>>>,
    bindings: Mutex<Vec<Binding>>,
    closed: Arc<AtomicBool>,
}

impl BusClient {
    pub fn new() -> Self {
        Self {
            exchanges: DashMap::new(),
            queues: Arc::new(DashMap::new()),
            bindings: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::ConnectionClosed);
        }
        Ok(())
    }

    /// Declare an exchange. Idempotent.
    pub fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BusError> {
        self.ensure_open()?;
        self.exchanges
            .entry(name.to_string())
            .or_insert(Exchange { kind, durable });
        Ok(())
    }

    /// Declare a queue. Idempotent; options of the first declaration win.
    pub fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<(), BusError> {
        self.ensure_open()?;
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Queue::new(options)));
        Ok(())
    }

    /// Bind a queue to an exchange under a routing-key pattern.
    pub fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<(), BusError> {
        self.ensure_open()?;
        if !self.exchanges.contains_key(exchange) {
            return Err(BusError::UnknownExchange(exchange.to_string()));
        }
        if !self.queues.contains_key(queue) {
            return Err(BusError::UnknownQueue(queue.to_string()));
        }
        self.bindings.lock().push(Binding {
            exchange: exchange.to_string(),
            pattern: pattern.to_string(),
            queue: queue.to_string(),
        });
        Ok(())
    }

    /// Publish a message to an exchange.
    ///
    /// Routing that matches no binding succeeds and drops the message, per
    /// topic-exchange semantics. Returns an error only when the connection is
    /// closed or the exchange was never declared.
    pub fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
        properties: PublishOptions,
    ) -> Result<(), BusError> {
        self.ensure_open()?;
        if !self.exchanges.contains_key(exchange) {
            return Err(BusError::UnknownExchange(exchange.to_string()));
        }

        // A queue receives one copy even if several of its bindings match.
        let mut matched: HashSet<String> = HashSet::new();
        {
            let bindings = self.bindings.lock();
            for binding in bindings.iter() {
                if binding.exchange == exchange && topic_matches(&binding.pattern, routing_key) {
                    matched.insert(binding.queue.clone());
                }
            }
        }

        if matched.is_empty() {
            tracing::debug!(exchange, routing_key, "No binding matched, message dropped");
            return Ok(());
        }

        let delivery = Delivery {
            routing_key: routing_key.to_string(),
            payload,
            properties,
        };
        for name in matched {
            if let Some(queue) = self.queues.get(&name) {
                queue
                    .messages
                    .lock()
                    .push_back((Instant::now(), delivery.clone()));
                queue.notify.notify_one();
            }
        }
        Ok(())
    }

    /// Attach a consumer to a queue.
    pub fn consume(&self, queue: &str) -> Result<Consumer, BusError> {
        self.ensure_open()?;
        let handle = self
            .queues
            .get(queue)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))?;
        handle.consumers.fetch_add(1, Ordering::SeqCst);
        Ok(Consumer {
            name: queue.to_string(),
            queue: handle,
            queues: Arc::clone(&self.queues),
            closed: Arc::clone(&self.closed),
        })
    }

    /// Close the connection. Pending consumers drain and terminate.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for entry in self.queues.iter() {
            entry.value().notify.notify_waiters();
            entry.value().notify.notify_one();
        }
        tracing::info!("Bus connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether an exchange was declared durable.
    pub fn exchange_is_durable(&self, name: &str) -> Option<bool> {
        self.exchanges.get(name).map(|e| e.durable)
    }
}

impl Default for BusClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Single consumer attached to one queue.
#[derive(Debug)]
pub struct Consumer {
    name: String,
    queue: Arc<Queue>,
    queues: Arc<DashMap<String, Arc<Queue>>>,
    closed: Arc<AtomicBool>,
}

impl Consumer {
    /// Receive the next live delivery.
    ///
    /// Returns `None` once the bus connection has been shut down. Messages
    /// whose TTL elapsed while queued are discarded, never delivered.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            if let Some(delivery) = self.queue.pop_live() {
                return Some(delivery);
            }
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        let remaining = self.queue.consumers.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && self.queue.options.auto_delete {
            self.queues.remove(&self.name);
            tracing::debug!(queue = %self.name, "Auto-deleted queue");
        }
    }
}
