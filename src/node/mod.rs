//! Time node: a logical clock behind an HTTP service
//!
//! A node hosts a [`clock::LogicalClock`] that drifts via one-second ticks
//! and a one-time random startup skew, answers the synchronization protocol,
//! and streams its display time to WebSocket observers. On startup it
//! announces itself to the coordinator once; whether that works or not, the
//! node serves.

pub mod clock;
pub mod config;
pub mod service;

// Re-export main types
pub use clock::{ClockError, LogicalClock};
pub use config::NodeConfig;
pub use service::{NodeServer, NodeState};
