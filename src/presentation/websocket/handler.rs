//! WebSocket Connection Handler
//!
//! Auth-gated handshake and per-connection read/write loops. A connection
//! moves Connecting -> Authenticated -> Disconnected; auth failure is
//! terminal for the attempt and the client must reconnect with a fresh
//! token. No error payload is sent on rejection, the socket is simply torn
//! down.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::gateway::Gateway;
use super::messages::{ConnectParams, SubscriptionChange};
use crate::domain::envelope::{circle_room, EventEnvelope};
use crate::infrastructure::auth::{AuthVerifier, Identity};
use crate::shared::error::GatewayError;
use crate::startup::AppState;

/// Upgrade handler for the user/status namespace.
pub async fn user_events_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let gateway = Arc::clone(&state.user_gateway);
    let verifier = Arc::clone(&state.verifier);
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, verifier, params.token))
}

/// Upgrade handler for the DM namespace.
pub async fn dm_events_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let gateway = Arc::clone(&state.dm_gateway);
    let verifier = Arc::clone(&state.verifier);
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, verifier, params.token))
}

/// Upgrade handler for the public-rooms namespace.
pub async fn room_events_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let gateway = Arc::clone(&state.room_gateway);
    let verifier = Arc::clone(&state.verifier);
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, verifier, params.token))
}

/// Gate a connection attempt on its handshake token.
///
/// The sole suspension point in the connect path. Every failure cause is
/// collapsed into `AuthRejected`; a missing token never reaches the
/// verifier at all.
pub(crate) async fn authenticate(
    token: Option<&str>,
    verifier: &dyn AuthVerifier,
) -> Result<Identity, GatewayError> {
    let token = token.ok_or_else(|| GatewayError::AuthRejected("missing token".into()))?;
    verifier.decode_token(token).await
}

/// Handle an individual WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    gateway: Arc<Gateway>,
    verifier: Arc<dyn AuthVerifier>,
    token: Option<String>,
) {
    // If the client already disconnected while verification was pending,
    // the read loop below exits immediately and registration is undone.
    let identity = match authenticate(token.as_deref(), verifier.as_ref()).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(
                namespace = gateway.namespace().as_str(),
                error = %e,
                "Rejecting connection"
            );
            return;
        }
    };

    // Split socket for concurrent read/write
    let (mut sink, mut stream) = socket.split();

    // Channel for outgoing envelopes
    let (tx, mut rx) = mpsc::unbounded_channel::<EventEnvelope>();
    let socket_id = gateway.register(&identity.uid, tx);

    // Forward envelopes from the gateway to the wire
    let writer = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize envelope");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: the only client-initiated mutation is circle subscription
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<SubscriptionChange>(&text) {
                Ok(change) => {
                    let circle = circle_room(&change.subscribed_user_uid);
                    if change.should_receive {
                        gateway.join(&socket_id, &circle);
                    } else {
                        gateway.leave(&socket_id, &circle);
                    }
                    tracing::debug!(
                        socket_id = %socket_id,
                        circle = %circle,
                        subscribed = change.should_receive,
                        "Circle subscription changed"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        socket_id = %socket_id,
                        error = %e,
                        "Ignoring malformed client frame"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by axum
            }
            Err(e) => {
                tracing::debug!(socket_id = %socket_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    gateway.disconnect(&socket_id);
    writer.abort();
}
