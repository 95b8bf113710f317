//! Realtime Broadcaster (spec §6 "Realtime broadcaster event kinds"): an
//! in-process pub/sub that pushes inventory and pairing events to
//! subscribed sessions. Generalizes the shutdown-broadcast-channel idiom
//! used by the Weather Background Scheduler (see `crate::scheduler`) from a
//! single shutdown signal to a general event bus.
//!
//! Broadcast is best-effort: a subscriber that lags or drops never fails
//! the publisher (§6 "per-subscriber send failure is logged, never
//! propagated"). The bus is ignorable when no subscribers are attached —
//! publishing into a channel with zero receivers is a no-op send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 1024;

/// Realtime event kinds (§6). `EventKind::as_str` is the wire value carried
/// in [`EventEnvelope::event_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InventoryItemAdded,
    InventoryItemConsumed,
    InventoryItemMoved,
    InventoryItemReserved,
    PairingSessionCreated,
    PairingFeedbackReceived,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::InventoryItemAdded => "inventory.item_added",
            EventKind::InventoryItemConsumed => "inventory.item_consumed",
            EventKind::InventoryItemMoved => "inventory.item_moved",
            EventKind::InventoryItemReserved => "inventory.item_reserved",
            EventKind::PairingSessionCreated => "pairing.session_created",
            EventKind::PairingFeedbackReceived => "pairing.feedback_received",
        }
    }
}

/// Wire envelope: `{type, data, ts}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub data: serde_json::Value,
    pub ts: DateTime<Utc>,
}

/// A subscriber's stable identity (§6 "Subscribers are assigned stable
/// ids"), handed back from [`RealtimeBroadcaster::subscribe`] so a
/// collaborator can log/correlate which session a delivery failure
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberId(pub Uuid);

pub struct Subscription {
    pub id: SubscriberId,
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl Subscription {
    /// Awaits the next event. Returns `None` once the broadcaster itself
    /// has been dropped; a lagged subscriber (too slow to keep up) silently
    /// skips ahead to the oldest event still buffered rather than erroring,
    /// since replay-from-gap is not meaningful for this event stream.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = %self.id.0, skipped, "realtime subscriber lagged, skipping ahead");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// In-process pub/sub over a single `tokio::sync::broadcast` channel. Cheap
/// to clone (an `Arc`-free handle around the sender, mirroring
/// `broadcast::Sender`'s own internal `Arc`).
#[derive(Clone)]
pub struct RealtimeBroadcaster {
    tx: broadcast::Sender<EventEnvelope>,
}

impl RealtimeBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { id: SubscriberId(Uuid::new_v4()), receiver: self.tx.subscribe() }
    }

    /// Publishes an event. Best-effort: no receivers is not an error, and a
    /// send failure (only possible if somehow all receivers dropped between
    /// `subscriber_count` and `send`) is logged, never returned, so a
    /// broadcaster can never fail the operation it's instrumenting.
    pub fn publish(&self, kind: EventKind, data: serde_json::Value) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        let envelope = EventEnvelope { event_type: kind.as_str(), data, ts: Utc::now() };
        if let Err(err) = self.tx.send(envelope) {
            tracing::debug!(error = %err, event = kind.as_str(), "realtime publish had no live receivers");
        }
    }
}

impl Default for RealtimeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = RealtimeBroadcaster::new();
        let mut sub = bus.subscribe();

        bus.publish(EventKind::InventoryItemAdded, serde_json::json!({"vintage_id": "abc"}));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type, "inventory.item_added");
        assert_eq!(event.data["vintage_id"], "abc");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = RealtimeBroadcaster::new();
        bus.publish(EventKind::PairingSessionCreated, serde_json::json!({}));
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_stable_id() {
        let bus = RealtimeBroadcaster::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_ne!(a.id.0, b.id.0);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive_the_same_event() {
        let bus = RealtimeBroadcaster::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(EventKind::InventoryItemConsumed, serde_json::json!({"qty": 2}));

        assert_eq!(a.recv().await.unwrap().event_type, "inventory.item_consumed");
        assert_eq!(b.recv().await.unwrap().event_type, "inventory.item_consumed");
    }
}
