//! OpenLP remote endpoints
//!
//! This module provides the wire types pushed over the notification socket and
//! the HTTP client used to pull full snapshots from the v2 API.

/// HTTP snapshot client
mod client;
/// Wire types for notifications and snapshots
mod types;

pub use client::{OpenLpApiClient, SnapshotSource};
pub use types::*;
