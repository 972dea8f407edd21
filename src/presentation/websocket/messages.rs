//! WebSocket Message Types
//!
//! Client-to-server frames and connection parameters. Server-to-client
//! frames are raw event envelopes serialized as JSON text.

use serde::Deserialize;

/// Connection-time query parameters on the upgrade request.
///
/// The token is the only handshake input; there is no renegotiation
/// mid-connection. A refreshed token requires a new connection.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Client request to start or stop receiving another user's circle events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionChange {
    pub subscribed_user_uid: String,
    pub should_receive: bool,
}
