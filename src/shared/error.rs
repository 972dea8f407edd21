//! Application Error Types
//!
//! Centralized error handling for the event distribution layer.

/// Errors raised by the topic bus client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("bus connection is closed")]
    ConnectionClosed,

    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),
}

/// Application error type.
///
/// `AuthRejected` is terminal for a connection attempt; every verification
/// failure cause collapses into it. `Publish` propagates to the immediate
/// caller, which decides whether to retry. `Handler` is contained to a single
/// message delivery.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("connection rejected: {0}")]
    AuthRejected(String),

    #[error("publish failed: {0}")]
    Publish(#[from] BusError),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
