//! Notification delivery.
//!
//! Delivery is best-effort: the primary state change is already committed
//! by the time a notification is sent, so a failed send is logged and
//! dropped rather than surfaced.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::{Booking, EventBus, Notification};
use crate::store::{DocumentStore, StoreError};

/// Writes a notification for its recipient to read later.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Delivers one notification.
    async fn notify(&self, notification: Notification) -> Result<(), StoreError>;
}

/// Persists notifications in the document store and publishes each
/// delivered one on the [`EventBus`].
#[derive(Debug, Clone)]
pub struct StoreNotifier {
    store: Arc<dyn DocumentStore>,
    event_bus: EventBus,
}

impl StoreNotifier {
    /// Creates a notifier over `store` publishing on `event_bus`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        self.store.add_notification(&notification).await?;
        let _ = self.event_bus.publish(notification);
        Ok(())
    }
}

/// Sends `notification`, logging instead of failing.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    let to = notification.to_user_id.clone();
    let kind = notification.kind;
    if let Err(e) = notifier.notify(notification).await {
        tracing::warn!(%to, kind = kind.as_str(), error = %e, "notification not delivered");
    }
}

/// Spawns a listener that records every notification published on `bus`.
///
/// The task ends once every [`EventBus`] handle is dropped and resolves to
/// the number of notifications it saw.
pub fn spawn_delivery_log(bus: &EventBus) -> JoinHandle<u64> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        let mut delivered = 0_u64;
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    delivered += 1;
                    tracing::info!(
                        id = %notification.id,
                        to = %notification.to_user_id,
                        kind = notification.kind.as_str(),
                        "notification delivered"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "delivery log lagged behind event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        delivered
    })
}

/// Standard payload attached to booking notifications.
#[must_use]
pub fn booking_payload(booking: &Booking) -> serde_json::Value {
    json!({
        "booking_id": booking.id,
        "market_id": booking.market_id,
        "slot_id": booking.slot_id,
        "status": booking.status,
        "payment_status": booking.payment_status,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{NotificationKind, UserId};
    use crate::store::MemoryStore;

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        async fn notify(&self, _n: Notification) -> Result<(), StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }
    }

    fn sample(to: &str) -> Notification {
        Notification::new(
            UserId::from(to),
            NotificationKind::BookingSubmitted,
            "Booking submitted",
            "Your request was sent",
            json!({}),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn store_notifier_persists_and_publishes() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let notifier = StoreNotifier::new(Arc::<MemoryStore>::clone(&store), bus);

        let Ok(()) = notifier.notify(sample("alice")).await else {
            panic!("notify should succeed");
        };

        let Ok(list) = store.notifications_for_user(&UserId::from("alice")).await else {
            panic!("list");
        };
        assert_eq!(list.len(), 1);
        let Ok(published) = rx.recv().await else {
            panic!("published notification");
        };
        assert_eq!(published.to_user_id.as_str(), "alice");
    }

    #[tokio::test]
    async fn delivery_log_consumes_until_bus_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(8);
        let log = spawn_delivery_log(&bus);
        assert_eq!(bus.receiver_count(), 1);

        let notifier = StoreNotifier::new(Arc::<MemoryStore>::clone(&store), bus.clone());
        let Ok(()) = notifier.notify(sample("alice")).await else {
            panic!("notify");
        };
        let Ok(()) = notifier.notify(sample("bob")).await else {
            panic!("notify");
        };
        drop(notifier);
        drop(bus);

        let Ok(Ok(seen)) = tokio::time::timeout(std::time::Duration::from_secs(5), log).await
        else {
            panic!("delivery log should stop once the bus closes");
        };
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        notify_best_effort(&Broken, sample("bob")).await;
    }
}
