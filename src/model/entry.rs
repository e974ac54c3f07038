//! Service items as seen by the client.
//!
//! An [`Entry`] wraps up to two raw descriptors of the same item: the
//! lightweight one from `service/items` and the detailed one from
//! `controller/live-items`. Nothing is stored beyond those; every view is
//! computed on access, preferring live data when both descriptors carry it.

use super::citation::{Citation, CitationError, parse_citation};
use super::sub_entry::SubEntry;
use crate::remote::{LiveItem, LiveSlide, ServiceItem};
use crate::sync::EngineRef;

use serde::Serialize;
use std::sync::Arc;

/// Item category derived from the providing plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	Song,
	Scripture,
	/// Any other plugin, by name (`images`, `presentations`, ...).
	Other(String),
}

impl EntryKind {
	pub fn from_plugin(plugin: &str) -> Self {
		match plugin {
			"songs" => EntryKind::Song,
			"bibles" => EntryKind::Scripture,
			other => EntryKind::Other(other.to_string()),
		}
	}
}

/// Authorship view of a song.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SongView {
	pub ccli: Option<String>,
	pub authors: Option<String>,
}

#[derive(Debug)]
struct EntryInner {
	service_item: Option<ServiceItem>,
	live_item: Option<LiveItem>,
	engine: EngineRef,
}

/// One item of a service, or the live item.
///
/// Cheap to clone; clones share the same immutable descriptors.
#[derive(Debug, Clone)]
pub struct Entry {
	inner: Arc<EntryInner>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
	s.filter(|s| !s.is_empty())
}

impl Entry {
	/// Entry built from a `service/items` descriptor. Carries no slides.
	pub fn from_service_item(service_item: ServiceItem, engine: EngineRef) -> Self {
		Self {
			inner: Arc::new(EntryInner {
				service_item: Some(service_item),
				live_item: None,
				engine,
			}),
		}
	}

	/// Entry built from the live descriptor, optionally paired with the
	/// service descriptor of the same item.
	pub fn from_live_item(
		live_item: LiveItem,
		service_item: Option<ServiceItem>,
		engine: EngineRef,
	) -> Self {
		Self {
			inner: Arc::new(EntryInner {
				service_item,
				live_item: Some(live_item),
				engine,
			}),
		}
	}

	pub fn service_item(&self) -> Option<&ServiceItem> {
		self.inner.service_item.as_ref()
	}

	pub fn live_item(&self) -> Option<&LiveItem> {
		self.inner.live_item.as_ref()
	}

	pub(crate) fn engine(&self) -> &EngineRef {
		&self.inner.engine
	}

	/// Live value when set, otherwise the service value.
	fn pick<'a>(
		&'a self,
		live: impl FnOnce(&'a LiveItem) -> &'a str,
		service: impl FnOnce(&'a ServiceItem) -> &'a str,
	) -> &'a str {
		non_empty(self.live_item().map(live))
			.or_else(|| non_empty(self.service_item().map(service)))
			.unwrap_or_default()
	}

	/// Remote-assigned identifier, stable across fetches.
	pub fn id(&self) -> &str {
		self.pick(|l| l.id.as_str(), |s| s.id.as_str())
	}

	pub fn title(&self) -> &str {
		self.pick(|l| l.title.as_str(), |s| s.title.as_str())
	}

	pub fn notes(&self) -> &str {
		self.pick(|l| l.notes.as_str(), |s| s.notes.as_str())
	}

	/// Name of the providing plugin.
	pub fn plugin(&self) -> &str {
		self.pick(|l| l.name.as_str(), |s| s.plugin.as_str())
	}

	pub fn kind(&self) -> EntryKind {
		EntryKind::from_plugin(self.plugin())
	}

	/// Theme of the live item. The service listing does not report one.
	pub fn theme(&self) -> Option<&str> {
		self.live_item().and_then(|l| l.theme.as_deref())
	}

	/// Display type of the live item, e.g. `ServiceItemType.Text`.
	pub fn content(&self) -> Option<&str> {
		non_empty(self.live_item().map(|l| l.content_type.as_str()))
	}

	/// Position in the engine's current service, found by identity.
	pub fn index(&self) -> Option<usize> {
		self.engine().service()?.position(self.id())
	}

	/// Previous entry of the engine's current service.
	pub fn previous(&self) -> Option<Entry> {
		let service = self.engine().service()?;
		let index = service.position(self.id())?;
		service.entries().get(index.checked_sub(1)?).cloned()
	}

	/// Next entry of the engine's current service.
	pub fn next(&self) -> Option<Entry> {
		let service = self.engine().service()?;
		let index = service.position(self.id())?;
		service.entries().get(index + 1).cloned()
	}

	/// True when this is the item the engine last observed as live.
	pub fn is_active(&self) -> bool {
		self.engine()
			.live_slide_id()
			.is_some_and(|live| !live.entry_id.is_empty() && live.entry_id == self.id())
	}

	pub fn song(&self) -> Option<SongView> {
		if self.kind() != EntryKind::Song {
			return None;
		}
		Some(SongView {
			ccli: non_empty(self.service_item().map(|s| s.ccli_number.as_str()))
				.map(str::to_string),
			authors: self.live_item().and_then(LiveItem::authors),
		})
	}

	/// Parsed scripture reference; `None` for anything but bible items.
	pub fn scripture(&self) -> Option<Result<Citation, CitationError>> {
		if self.kind() != EntryKind::Scripture {
			return None;
		}
		Some(parse_citation(self.title()))
	}

	pub(crate) fn slides(&self) -> &[LiveSlide] {
		self.live_item().map(|l| l.slides.as_slice()).unwrap_or_default()
	}

	/// Number of slides. Zero unless this entry came from the live fetch.
	pub fn sub_entry_count(&self) -> usize {
		self.slides().len()
	}

	pub fn sub_entry(&self, position: usize) -> Option<SubEntry> {
		(position < self.sub_entry_count()).then(|| SubEntry::new(self.clone(), position))
	}

	pub fn sub_entries(&self) -> impl Iterator<Item = SubEntry> + '_ {
		(0..self.sub_entry_count()).map(|position| SubEntry::new(self.clone(), position))
	}

	/// True when both handles point at the same constructed entry.
	pub fn same_as(&self, other: &Entry) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}
