//! Follow what an OpenLP instance is presenting.
//!
//! A client connects to the first reachable OpenLP host, listens to its push
//! notifications and keeps a local model of the live service, item and slide,
//! fetching full snapshots over HTTP only when identifiers move.

/// Connect-and-forward loop
pub mod client;
/// Configuration and CLI arguments
pub mod config;
/// Push-channel failover
pub mod connection;
/// Service, item and slide model
pub mod model;
/// Wire types and the HTTP snapshot client
pub mod remote;
/// Notification processing and change events
pub mod sync;

pub use client::OpenLpClient;
pub use config::{ClientArgs, ClientConfig};
pub use sync::{EventKind, SyncEngine, SyncError, SyncEvent};
