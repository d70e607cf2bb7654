//! Progress messages that flow from the enrichment pipeline to live
//! WebSocket subscribers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EventSnapshot;

/// Routing key for a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every connected client.
    Public,
    /// Only the connections of one user.
    User(Uuid),
}

/// Wire message delivered over the live WebSocket.
///
/// The tag mirrors the channel split: `live_event` for platform-wide ingest,
/// `custom_event` for user-initiated research.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    LiveEvent(EventSnapshot),
    CustomEvent(EventSnapshot),
}

impl WsMessage {
    pub fn snapshot(&self) -> &EventSnapshot {
        match self {
            WsMessage::LiveEvent(s) | WsMessage::CustomEvent(s) => s,
        }
    }
}

/// One relay frame: a message plus where it should go.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub scope: Scope,
    pub message: WsMessage,
}

impl ProgressUpdate {
    /// Build the frame for a snapshot: user-scoped research goes only to its
    /// owner, everything else goes to the public feed.
    pub fn for_snapshot(snapshot: EventSnapshot, user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(id) => Self {
                scope: Scope::User(id),
                message: WsMessage::CustomEvent(snapshot),
            },
            None => Self {
                scope: Scope::Public,
                message: WsMessage::LiveEvent(snapshot),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventSource;

    fn snapshot() -> EventSnapshot {
        EventSnapshot::new(
            Uuid::new_v4(),
            "ECB cuts rates".into(),
            "Surprise 25bp cut".into(),
            EventSource::EventRegistry,
        )
    }

    #[test]
    fn ws_message_tag() {
        let json = serde_json::to_value(WsMessage::LiveEvent(snapshot())).unwrap();
        assert_eq!(json["type"], "live_event");
        assert!(json["data"]["id"].is_string());
    }

    #[test]
    fn snapshot_routing_follows_ownership() {
        let user = Uuid::new_v4();

        let personal = ProgressUpdate::for_snapshot(snapshot(), Some(user));
        assert_eq!(personal.scope, Scope::User(user));
        assert!(matches!(personal.message, WsMessage::CustomEvent(_)));

        let public = ProgressUpdate::for_snapshot(snapshot(), None);
        assert_eq!(public.scope, Scope::Public);
        assert!(matches!(public.message, WsMessage::LiveEvent(_)));
    }
}
