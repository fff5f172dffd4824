//! chronod - Distributed clock synchronization
//!
//! A Berkeley-style clock-synchronization system: a coordinator process
//! periodically polls a set of independently drifting time nodes, computes a
//! correction from the average observed offset, and pushes it back to bring
//! all nodes into rough agreement.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`coordinator`] - Instance registry, synchronization engine, event bus
//! - [`node`] - Logical clock and the time node HTTP service
//! - [`journal`] - Append-only timestamped log store with pluggable sinks
//! - [`metrics`] - Prometheus metrics for the coordinator
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use chronod::coordinator::{CoordinatorConfig, CoordinatorServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CoordinatorConfig::default();
//!     let server = CoordinatorServer::new(config)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod error;
pub mod journal;
pub mod metrics;
pub mod node;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::coordinator::{
        CoordinatorConfig, CoordinatorServer, EventBus, Instance, InstanceRegistry, SyncEngine,
    };
    pub use crate::error::{Error, Result};
    pub use crate::journal::Journal;
    pub use crate::node::{LogicalClock, NodeConfig, NodeServer};
}

// Direct re-exports for convenience
pub use coordinator::registry::Instance;
pub use node::clock::LogicalClock;
