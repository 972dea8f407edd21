//! Infrastructure Layer
//!
//! Bus client, auth verifier, and metrics implementations.

pub mod auth;
pub mod bus;
pub mod metrics;
