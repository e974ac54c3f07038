//! A versioned snapshot of the service order.

use super::entry::{Entry, EntryKind};
use crate::remote::ServiceItem;
use crate::sync::EngineRef;

use std::sync::Arc;

#[derive(Debug)]
struct CollectionInner {
	id: u64,
	entries: Vec<Entry>,
	engine: EngineRef,
}

/// The service as of one revision.
///
/// Never patched: a new revision produces a new collection.
#[derive(Debug, Clone)]
pub struct Collection {
	inner: Arc<CollectionInner>,
}

impl Collection {
	/// Build a collection from a `service/items` snapshot.
	pub fn from_service_items(id: u64, items: Vec<ServiceItem>, engine: EngineRef) -> Self {
		let entries = items
			.into_iter()
			.map(|item| Entry::from_service_item(item, engine.clone()))
			.collect();

		Self {
			inner: Arc::new(CollectionInner {
				id,
				entries,
				engine,
			}),
		}
	}

	/// Service revision this snapshot was taken at.
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	pub fn entries(&self) -> &[Entry] {
		&self.inner.entries
	}

	pub fn len(&self) -> usize {
		self.inner.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.entries.is_empty()
	}

	pub fn get(&self, id: &str) -> Option<&Entry> {
		self.inner.entries.iter().find(|e| e.id() == id)
	}

	/// Position of the entry with the given id.
	pub fn position(&self, id: &str) -> Option<usize> {
		self.inner.entries.iter().position(|e| e.id() == id)
	}

	/// The entry the engine last observed as live, if it is in this service.
	pub fn active(&self) -> Option<&Entry> {
		let live = self.inner.engine.live_slide_id()?;
		self.get(&live.entry_id)
	}

	pub fn songs(&self) -> impl Iterator<Item = &Entry> {
		self.of_kind(EntryKind::Song)
	}

	pub fn scriptures(&self) -> impl Iterator<Item = &Entry> {
		self.of_kind(EntryKind::Scripture)
	}

	fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &Entry> {
		self.inner.entries.iter().filter(move |e| e.kind() == kind)
	}

	/// True when both handles point at the same snapshot.
	pub fn same_as(&self, other: &Collection) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}
