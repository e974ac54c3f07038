//! Push-channel connection management
//!
//! Owns the transport handle: candidate failover, fixed backoff between full
//! passes, and the record of which host answered. It has no knowledge of the
//! messages carried over the channel.

/// Failover connector
mod manager;

pub use manager::*;
