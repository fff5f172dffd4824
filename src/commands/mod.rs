pub mod coordinator;
pub mod node;

// Re-export command functions for convenience
pub use coordinator::{coordinator_server, CoordinatorParams};
pub use node::{node_server, NodeParams};
