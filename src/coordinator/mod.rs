//! Coordinator for distributed clock synchronization
//!
//! This module provides the central process that tracks time nodes, runs
//! Berkeley-style synchronization rounds against them, and streams registry
//! and log changes to live observers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │         Coordinator Server          │
//! │                                     │
//! │  ┌──────────────────────────────┐  │
//! │  │      Instance Registry       │  │
//! │  │  - Registration (append)     │  │
//! │  │  - Enumeration               │  │
//! │  └──────────────────────────────┘  │
//! │                                     │
//! │  ┌──────────────────────────────┐  │
//! │  │    Synchronization Engine    │  │
//! │  │  - Reference time fetch      │  │
//! │  │  - Per-node clock polling    │  │
//! │  │  - Offset averaging          │  │
//! │  │  - Correction pushes         │  │
//! │  └──────────────────────────────┘  │
//! │                                     │
//! │  ┌──────────────────────────────┐  │
//! │  │     Event Broadcast Bus      │  │
//! │  │  - Registry change fan-out   │  │
//! │  │  - Log line fan-out          │  │
//! │  │  - Snapshot on connect       │  │
//! │  └──────────────────────────────┘  │
//! │                                     │
//! │  ┌──────────────────────────────┐  │
//! │  │          REST API            │  │
//! │  │  POST /register              │  │
//! │  │  POST /launch                │  │
//! │  │  GET  /instances             │  │
//! │  │  GET  /logs   POST /logs     │  │
//! │  │  POST /sync-clocks           │  │
//! │  │  GET  /worldtime             │  │
//! │  │  WS   <any path>             │  │
//! │  └──────────────────────────────┘  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chronod::coordinator::{CoordinatorConfig, CoordinatorServer};
//!
//! let config = CoordinatorConfig::default();
//! let server = CoordinatorServer::new(config)?;
//! server.start().await?;
//! ```

pub mod api;
pub mod authority;
pub mod broadcast;
pub mod client;
pub mod config;
pub mod launcher;
pub mod registry;
pub mod server;
pub mod sync;

// Re-export main types
pub use broadcast::{BusEvent, EventBus};
pub use client::{ClientConfig, CoordinatorClient};
pub use config::CoordinatorConfig;
pub use registry::{Instance, InstanceRegistry};
pub use server::CoordinatorServer;
pub use sync::{RoundReport, SyncEngine};
