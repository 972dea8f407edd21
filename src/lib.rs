//! # Event Gateway Library
//!
//! This crate provides the real-time event distribution layer of a social
//! chat platform:
//! - A topic bus with durable and transient (TTL) queue topology
//! - Publisher/receiver pairs carrying typed event envelopes
//! - A typed in-process event bus decoupling transport from delivery
//! - Authenticated WebSocket gateways fanning events out to live sockets
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Event envelopes, routing keys, and addressing
//! - **Application Layer**: Publisher, receiver, and the local event bus
//! - **Infrastructure Layer**: Bus client, auth verifier, and metrics
//! - **Presentation Layer**: HTTP routes and WebSocket gateways
//!
//! ## Module Structure
//!
//! ```text
//! event_gateway/
//! +-- config/        Configuration management
//! +-- domain/        Envelope contract and topic routing
//! +-- application/   Publisher, receiver, local bus
//! +-- infrastructure/ Bus client, auth verifier, metrics
//! +-- presentation/  HTTP routes and WebSocket gateways
//! +-- shared/        Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Envelope contract and routing
pub mod domain;

// Application layer - Publish/receive pipeline
pub mod application;

// Infrastructure layer - Bus, auth, metrics
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
