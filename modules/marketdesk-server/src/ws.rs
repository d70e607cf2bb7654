//! Live WebSocket delivery.
//!
//! `ConnectionRegistry` tracks every open socket per user. A single fan-out
//! task subscribes to the pipeline's `ProgressRelay` and routes each frame:
//! public updates go to every connection, user-scoped updates only to that
//! user's connections. Sends are best-effort; a connection that fails to
//! accept a frame is pruned.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use marketdesk_common::{Scope, WsMessage};
use marketdesk_news::ProgressRelay;

use crate::envelope::ApiError;
use crate::AppState;

type Outbound = mpsc::UnboundedSender<Message>;

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    // user id -> (connection id, outbound channel)
    connections: Arc<Mutex<HashMap<Uuid, Vec<(Uuid, Outbound)>>>>,
}

impl ConnectionRegistry {
    pub async fn connect(&self, user_id: Uuid, sender: Outbound) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.connections
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .push((conn_id, sender));
        info!(%user_id, %conn_id, "websocket connected");
        conn_id
    }

    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) {
        let mut connections = self.connections.lock().await;
        if let Some(list) = connections.get_mut(&user_id) {
            list.retain(|(id, _)| *id != conn_id);
            if list.is_empty() {
                connections.remove(&user_id);
            }
        }
        info!(%user_id, %conn_id, "websocket disconnected");
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.values().map(Vec::len).sum()
    }

    /// Send to every connection of every user.
    pub async fn broadcast(&self, message: &WsMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize ws message");
                return;
            }
        };

        // Snapshot under the lock, send outside it
        let snapshot: Vec<(Uuid, Uuid, Outbound)> = {
            let connections = self.connections.lock().await;
            connections
                .iter()
                .flat_map(|(user_id, list)| {
                    list.iter()
                        .map(|(conn_id, tx)| (*user_id, *conn_id, tx.clone()))
                })
                .collect()
        };

        for (user_id, conn_id, tx) in snapshot {
            if tx.send(Message::Text(payload.clone().into())).is_err() {
                self.disconnect(user_id, conn_id).await;
            }
        }
    }

    /// Send to one user's connections only.
    pub async fn send_to_user(&self, user_id: Uuid, message: &WsMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize ws message");
                return;
            }
        };

        let snapshot: Vec<(Uuid, Outbound)> = {
            let connections = self.connections.lock().await;
            connections
                .get(&user_id)
                .map(|list| list.to_vec())
                .unwrap_or_default()
        };

        for (conn_id, tx) in snapshot {
            if tx.send(Message::Text(payload.clone().into())).is_err() {
                self.disconnect(user_id, conn_id).await;
            }
        }
    }
}

/// Route relay frames to sockets until the relay closes. Subscribes before
/// returning so no frame published after this call is missed.
pub fn spawn_fanout(registry: ConnectionRegistry, relay: ProgressRelay) {
    let mut rx = relay.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => match update.scope {
                    Scope::Public => registry.broadcast(&update.message).await,
                    Scope::User(user_id) => {
                        registry.send_to_user(user_id, &update.message).await
                    }
                },
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "ws fan-out lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[derive(Deserialize)]
pub struct LiveQuery {
    #[serde(default)]
    token: String,
}

/// `GET /api/v1/market-events/live?token=...`: upgrade to a live event feed.
pub async fn live(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let claims = match state.jwt.verify_access_token(&query.token) {
        Ok(claims) => claims,
        Err(_) => return ApiError::Auth("Invalid or expired token".into()).into_response(),
    };
    let user_id: Uuid = match claims.sub.parse() {
        Ok(user_id) => user_id,
        Err(_) => return ApiError::Auth("Invalid token subject".into()).into_response(),
    };

    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, registry))
}

async fn handle_socket(socket: WebSocket, user_id: Uuid, registry: ConnectionRegistry) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let conn_id = registry.connect(user_id, tx).await;

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    // Clients only send keepalives; ignore the content
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(other)) => {
                        debug!(%user_id, ?other, "ignoring inbound ws message");
                    }
                }
            }
        }
    }

    registry.disconnect(user_id, conn_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdesk_common::{EventSnapshot, EventSource, ProgressUpdate};

    fn message(title: &str) -> WsMessage {
        WsMessage::LiveEvent(EventSnapshot::new(
            Uuid::new_v4(),
            title.into(),
            "body".into(),
            EventSource::AlphaVantage,
        ))
    }

    #[tokio::test]
    async fn broadcast_reaches_every_user() {
        let registry = ConnectionRegistry::default();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.connect(Uuid::new_v4(), tx1).await;
        registry.connect(Uuid::new_v4(), tx2).await;

        registry.broadcast(&message("Fed minutes")).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn targeted_send_skips_other_users() {
        let registry = ConnectionRegistry::default();
        let target = Uuid::new_v4();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.connect(target, tx1).await;
        registry.connect(Uuid::new_v4(), tx2).await;

        registry.send_to_user(target, &message("Custom research")).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_connections_are_pruned_on_send() {
        let registry = ConnectionRegistry::default();
        let user = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx); // receiver gone: the send must fail
        registry.connect(user, tx).await;
        assert_eq!(registry.connection_count().await, 1);

        registry.broadcast(&message("Prune me")).await;

        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect_removes_only_that_connection() {
        let registry = ConnectionRegistry::default();
        let user = Uuid::new_v4();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let conn1 = registry.connect(user, tx1).await;
        registry.connect(user, tx2).await;

        registry.disconnect(user, conn1).await;

        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn fanout_routes_by_scope() {
        let registry = ConnectionRegistry::default();
        let relay = ProgressRelay::default();
        let owner = Uuid::new_v4();
        let (tx_owner, mut rx_owner) = mpsc::unbounded_channel();
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();
        registry.connect(owner, tx_owner).await;
        registry.connect(Uuid::new_v4(), tx_other).await;

        spawn_fanout(registry.clone(), relay.clone());

        let snapshot = EventSnapshot::new(
            Uuid::new_v4(),
            "Private research".into(),
            String::new(),
            EventSource::Custom,
        );
        relay.publish(ProgressUpdate::for_snapshot(snapshot, Some(owner)));

        // Owner sees the frame, the other user does not
        let frame = tokio::time::timeout(std::time::Duration::from_secs(1), rx_owner.recv())
            .await
            .expect("fanout delivered")
            .expect("channel open");
        assert!(matches!(frame, Message::Text(_)));
        assert!(rx_other.try_recv().is_err());
    }
}
