//! HTTP Surface
//!
//! Gateway upgrade routes, health checks, and the metrics endpoint.

pub mod health;
pub mod routes;
