//! Publish/subscribe relay between the enrichment pipeline and live
//! WebSocket connections.
//!
//! A single tokio broadcast channel carries every progress update together
//! with its routing scope; the server's fan-out task decides which sockets
//! see each frame. Delivery is best-effort: a subscriber that lags past the
//! channel capacity loses the oldest frames rather than backpressuring the
//! pipeline.

use tokio::sync::broadcast;

use marketdesk_common::ProgressUpdate;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct ProgressRelay {
    tx: broadcast::Sender<ProgressUpdate>,
}

impl Default for ProgressRelay {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressRelay {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an update to every live subscriber.
    ///
    /// Returns how many subscribers received it, or `None` when nobody is
    /// listening. No subscribers is not an error; the pipeline runs with or
    /// without spectators.
    pub fn publish(&self, update: ProgressUpdate) -> Option<usize> {
        self.tx.send(update).ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdesk_common::{EventSnapshot, EventSource, Scope, WsMessage};
    use uuid::Uuid;

    fn update() -> ProgressUpdate {
        let snapshot = EventSnapshot::new(
            Uuid::new_v4(),
            "Gold rallies".into(),
            "Safe haven flows".into(),
            EventSource::EventRegistry,
        );
        ProgressUpdate::for_snapshot(snapshot, None)
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let relay = ProgressRelay::default();
        assert_eq!(relay.publish(update()), None);
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_frame() {
        let relay = ProgressRelay::default();
        let mut rx1 = relay.subscribe();
        let mut rx2 = relay.subscribe();

        assert_eq!(relay.publish(update()), Some(2));

        let f1 = rx1.recv().await.unwrap();
        let f2 = rx2.recv().await.unwrap();
        assert_eq!(f1.scope, Scope::Public);
        assert!(matches!(f2.message, WsMessage::LiveEvent(_)));
    }

    #[tokio::test]
    async fn lagged_subscriber_drops_oldest_frames() {
        let relay = ProgressRelay::new(2);
        let mut rx = relay.subscribe();

        for _ in 0..4 {
            relay.publish(update());
        }

        // First recv reports the lag, then frames resume
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let relay = ProgressRelay::default();
        assert_eq!(relay.subscriber_count(), 0);
        let _rx = relay.subscribe();
        assert_eq!(relay.subscriber_count(), 1);
    }
}
