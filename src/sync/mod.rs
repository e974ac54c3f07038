//! Synchronization Module
//!
//! Keeps a local model of what an OpenLP instance has live, driven by its push
//! notifications:
//!
//! - `engine`: decodes notifications, suppresses duplicates, fetches snapshots
//!   when identifiers move and dispatches change events.
//! - `events`: event types, the handler trait and the per-category dispatcher.
//! - `state`: display mode, composite position key and the engine-held state
//!   model objects resolve against.

/// Notification processing
pub mod engine;
/// Change events and subscribers
pub mod events;
/// Engine-held state
pub mod state;
mod types;

pub use engine::SyncEngine;
pub use events::{ChannelHandler, EventDispatcher, EventKind, FnHandler, SyncEvent, SyncEventHandler};
pub use state::{DisplayMode, EngineRef, PositionKey, SyncState};
pub use types::SyncError;
