//! Instance registry for tracking time nodes
//!
//! This module records every node announced through the registration
//! protocol, in arrival order, and exposes the full set for enumeration by
//! the synchronization engine and the HTTP listing endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::coordinator::broadcast::{BusEvent, EventBus};
use crate::journal::Journal;

// ============================================================================
// Instance
// ============================================================================

/// A registered time node, identified by its (host, port) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub host: String,
    pub port: u16,
}

impl Instance {
    /// Create a new instance record
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the full address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the base HTTP URL for the node's service
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Instance Registry
// ============================================================================

/// Registry of all known time nodes
///
/// Entries are appended unconditionally in arrival order. Repeated
/// registration of the same (host, port) pair accumulates duplicate entries,
/// which the synchronization engine then polls once each; there is no
/// deregistration, so an unreachable node stays listed until the process
/// restarts.
pub struct InstanceRegistry {
    instances: RwLock<Vec<Instance>>,
    bus: EventBus,
    journal: Arc<Journal>,
}

impl InstanceRegistry {
    /// Create an empty registry wired to the coordinator's bus and journal
    pub fn new(bus: EventBus, journal: Arc<Journal>) -> Self {
        Self {
            instances: RwLock::new(Vec::new()),
            bus,
            journal,
        }
    }

    /// Register an instance, returning the registry size afterwards
    ///
    /// The new entry is published to all connected observers and a line is
    /// recorded in the journal.
    pub async fn register(&self, instance: Instance) -> usize {
        let count = {
            let mut instances = self.instances.write().await;
            instances.push(instance.clone());
            instances.len()
        };

        self.bus.publish(BusEvent::Registered(instance.clone()));
        self.journal
            .record(format!("Registered instance {instance}"))
            .await;

        count
    }

    /// Snapshot of all instances, in insertion order
    pub async fn list(&self) -> Vec<Instance> {
        self.instances.read().await.clone()
    }

    /// Number of registered entries (duplicates counted)
    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> InstanceRegistry {
        InstanceRegistry::new(EventBus::new(16), Arc::new(Journal::new()))
    }

    #[test]
    fn test_instance_address() {
        let instance = Instance::new("192.168.1.10", 5001);
        assert_eq!(instance.address(), "192.168.1.10:5001");
        assert_eq!(instance.base_url(), "http://192.168.1.10:5001");
    }

    #[test]
    fn test_instance_serialization() {
        let instance = Instance::new("a", 1);
        let json = serde_json::to_string(&instance).unwrap();
        assert_eq!(json, r#"{"host":"a","port":1}"#);
    }

    #[tokio::test]
    async fn test_register_appends_in_order() {
        let registry = test_registry();

        registry.register(Instance::new("a", 1)).await;
        registry.register(Instance::new("b", 2)).await;

        let instances = registry.list().await;
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0], Instance::new("a", 1));
        assert_eq!(instances[1], Instance::new("b", 2));
    }

    #[tokio::test]
    async fn test_duplicate_registrations_are_preserved() {
        let registry = test_registry();

        let count = registry.register(Instance::new("a", 1)).await;
        assert_eq!(count, 1);
        let count = registry.register(Instance::new("a", 1)).await;
        assert_eq!(count, 2);

        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_register_publishes_bus_event() {
        let bus = EventBus::new(16);
        let registry = InstanceRegistry::new(bus.clone(), Arc::new(Journal::new()));
        let mut sub = bus.subscribe();

        registry.register(Instance::new("a", 1)).await;

        match sub.next().await {
            Some(BusEvent::Registered(instance)) => {
                assert_eq!(instance, Instance::new("a", 1));
            }
            other => panic!("expected Registered event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_records_journal_line() {
        let journal = Arc::new(Journal::new());
        let registry = InstanceRegistry::new(EventBus::new(16), journal.clone());

        registry.register(Instance::new("a", 1)).await;

        let lines = journal.snapshot().await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Registered instance a:1"));
    }
}
