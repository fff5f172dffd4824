//! Event broadcast bus for live observers
//!
//! This module fans registry changes and journal lines out to connected
//! observers without requiring them to poll. The bus is decoupled from the
//! transport: the WebSocket layer in `api.rs` is just one subscriber adapter.

use serde_json::json;
use tokio::sync::broadcast;

use crate::coordinator::registry::Instance;
use crate::journal::LogSink;

// ============================================================================
// Bus Events
// ============================================================================

/// An event delivered to every connected observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// A new instance was appended to the registry
    Registered(Instance),

    /// A line was recorded in the coordinator's journal
    Log(String),
}

impl BusEvent {
    /// Wire representation pushed to observers
    pub fn to_frame(&self) -> String {
        match self {
            Self::Registered(instance) => {
                json!({ "host": instance.host, "port": instance.port }).to_string()
            }
            Self::Log(line) => json!({ "log": line }).to_string(),
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Publish/subscribe bus over a broadcast channel
///
/// Publishing never blocks and never fails: events sent while no observer is
/// connected are dropped, and a slow observer that falls more than the
/// channel capacity behind skips the overwritten events rather than erroring.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a bus with the given per-observer buffer capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach a new observer; dropping the subscription unsubscribes it
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver an event to all current observers, returning how many it
    /// reached
    pub fn publish(&self, event: BusEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of currently attached observers
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ============================================================================
// Bus Subscription
// ============================================================================

/// A single observer's view of the bus
pub struct BusSubscription {
    rx: broadcast::Receiver<BusEvent>,
}

impl BusSubscription {
    /// Wait for the next event
    ///
    /// Returns `None` once the bus is gone. Events missed through lag are
    /// skipped silently.
    pub async fn next(&mut self) -> Option<BusEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// Journal Sink
// ============================================================================

/// Journal sink that republishes every recorded line onto the bus
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl LogSink for BusSink {
    fn emit(&self, line: &str) {
        self.bus.publish(BusEvent::Log(line.to_string()));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_frame() {
        let event = BusEvent::Registered(Instance::new("a", 1));
        assert_eq!(event.to_frame(), r#"{"host":"a","port":1}"#);
    }

    #[test]
    fn test_log_frame() {
        let event = BusEvent::Log("hello".to_string());
        assert_eq!(event.to_frame(), r#"{"log":"hello"}"#);
    }

    #[tokio::test]
    async fn test_events_delivered_to_all_observers_in_order() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(BusEvent::Log("one".to_string()));
        bus.publish(BusEvent::Log("two".to_string()));

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.next().await, Some(BusEvent::Log("one".to_string())));
            assert_eq!(sub.next().await, Some(BusEvent::Log("two".to_string())));
        }
    }

    #[tokio::test]
    async fn test_dropped_observer_is_not_counted() {
        let bus = EventBus::new(16);
        let first = bus.subscribe();
        let _second = bus.subscribe();
        assert_eq!(bus.observer_count(), 2);

        drop(first);
        assert_eq!(bus.observer_count(), 1);

        // Delivery only reaches the remaining observer
        let reached = bus.publish(BusEvent::Log("after".to_string()));
        assert_eq!(reached, 1);
    }

    #[tokio::test]
    async fn test_publish_without_observers_is_dropped() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(BusEvent::Log("nobody".to_string())), 0);
    }

    #[tokio::test]
    async fn test_bus_sink_republishes_journal_lines() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        let sink = BusSink::new(bus.clone());

        sink.emit("[ts] something happened");

        assert_eq!(
            sub.next().await,
            Some(BusEvent::Log("[ts] something happened".to_string()))
        );
    }
}
