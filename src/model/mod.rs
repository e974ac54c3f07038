//! Derived data model
//!
//! Three levels: a [`Collection`] (the service at one revision) holds
//! [`Entry`] values, and the live entry exposes its slides as [`SubEntry`]
//! values. Model objects store only raw descriptors plus a weak reference to
//! the engine; "active", "previous", "next" and the domain views are computed
//! on every access.

/// Scripture title parsing
pub mod citation;
/// Versioned service snapshot
mod collection;
/// Service and live items
mod entry;
/// Slides of the live item
mod sub_entry;

pub use citation::{Citation, CitationError, parse_citation};
pub use collection::Collection;
pub use entry::{Entry, EntryKind, SongView};
pub use sub_entry::{SlideScripture, SlideSongView, SubEntry, SubEntryId};
