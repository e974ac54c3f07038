//! The synchronization engine.
//!
//! Turns push notifications into a consistent model of what is live. Each
//! notification is one cycle:
//!
//! 1. compute the display mode from the notification flags,
//! 2. drop positional duplicates (same service revision, item and slide),
//! 3. fetch `service/items` when the service revision moved,
//! 4. fetch `controller/live-items` when a different item went live,
//! 5. select the live slide,
//! 6. commit all state at once, then dispatch mode, service, item and slide
//!    events in that order.
//!
//! A failed fetch aborts the cycle before anything is committed, so held state
//! stays at the last successful cycle and a repeat of the same notification
//! is not mistaken for a duplicate.

use super::events::{
	ChannelHandler, EventDispatcher, EventKind, FnHandler, SyncEvent, SyncEventHandler,
};
use super::state::{DisplayMode, EngineRef, PositionKey, SharedState, SyncState};
use super::types::SyncError;
use crate::model::{Collection, Entry, SubEntry, SubEntryId};
use crate::remote::{Notification, SnapshotSource};

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Single-writer owner of the synchronization state.
pub struct SyncEngine {
	state: SharedState,
	source: Option<Box<dyn SnapshotSource>>,
	dispatcher: EventDispatcher,
}

impl Default for SyncEngine {
	fn default() -> Self {
		Self::new()
	}
}

impl SyncEngine {
	/// Create an engine with no snapshot source yet.
	pub fn new() -> Self {
		Self {
			state: Arc::new(RwLock::new(SyncState::default())),
			source: None,
			dispatcher: EventDispatcher::new(),
		}
	}

	pub fn with_source(mut self, source: impl SnapshotSource + 'static) -> Self {
		self.set_source(source);
		self
	}

	/// Point snapshot fetches at a new source, e.g. after connecting to a host.
	pub fn set_source(&mut self, source: impl SnapshotSource + 'static) {
		self.source = Some(Box::new(source));
	}

	pub fn set_boxed_source(&mut self, source: Box<dyn SnapshotSource>) {
		self.source = Some(source);
	}

	/// Subscribe a handler to one event category.
	pub fn on(&mut self, kind: EventKind, handler: impl SyncEventHandler + 'static) -> &mut Self {
		let name = handler.name();
		self.dispatcher.register_handler(kind, Box::new(handler));
		debug!(
			"Registered handler {} for {:?} ({} total)",
			name,
			kind,
			self.dispatcher.handler_count(kind)
		);
		self
	}

	/// Subscribe a closure to one event category.
	pub fn on_fn<F>(&mut self, kind: EventKind, name: &'static str, f: F) -> &mut Self
	where
		F: FnMut(&SyncEvent) + Send + Sync + 'static,
	{
		self.on(kind, FnHandler::new(name, f))
	}

	/// Receive every event of every category through a channel.
	pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SyncEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		for kind in EventKind::ALL {
			self.on(kind, ChannelHandler::new(tx.clone()));
		}
		rx
	}

	/// Back-reference handed to model objects built by this engine.
	pub fn engine_ref(&self) -> EngineRef {
		EngineRef::new(&self.state)
	}

	/// Read the current state.
	pub fn read<R>(&self, f: impl FnOnce(&SyncState) -> R) -> R {
		let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
		f(&guard)
	}

	pub fn mode(&self) -> Option<DisplayMode> {
		self.read(|s| s.mode())
	}

	pub fn service(&self) -> Option<Collection> {
		self.read(|s| s.service().cloned())
	}

	pub fn item(&self) -> Option<Entry> {
		self.read(|s| s.item().cloned())
	}

	pub fn slide(&self) -> Option<SubEntry> {
		self.read(SyncState::slide)
	}

	/// Decode a raw push-channel frame and process it.
	pub async fn handle_message(&mut self, raw: &[u8]) -> Result<Vec<SyncEvent>, SyncError> {
		let notification = Notification::decode(raw)?;
		debug!("OpenLP: notification {:?}", notification);
		self.process(notification).await
	}

	fn source(&self) -> Result<&dyn SnapshotSource, SyncError> {
		self.source.as_deref().ok_or(SyncError::NotConnected)
	}

	/// Run one synchronization cycle and return the events it dispatched.
	pub async fn process(&mut self, notification: Notification) -> Result<Vec<SyncEvent>, SyncError> {
		let (held_mode, last_key, live_slide, held_service, held_item) = self.read(|s| {
			(
				s.mode,
				s.last_key.clone(),
				s.live_slide.clone(),
				s.service.clone(),
				s.item.clone(),
			)
		});

		let mode = DisplayMode::from_notification(&notification);
		let mode_changed = held_mode != Some(mode);

		let key = PositionKey::from_notification(&notification);
		if last_key.as_ref() == Some(&key) {
			debug!("OpenLP: websocket sent positional duplicate {}", key);
			if !mode_changed {
				return Ok(Vec::new());
			}
			self.commit(|s| s.mode = Some(mode));
			return Ok(self.dispatch(vec![SyncEvent::ModeChanged(mode)]).await);
		}

		let engine = self.engine_ref();

		let mut service = held_service;
		let mut service_changed = false;
		if service.as_ref().map(Collection::id) != Some(notification.service) {
			let items = self.source()?.service_items().await?;
			info!(
				"OpenLP: loaded service revision {} with {} items",
				notification.service,
				items.len()
			);
			service = Some(Collection::from_service_items(
				notification.service,
				items,
				engine.clone(),
			));
			service_changed = true;
		}

		let is_live = !notification.item.is_empty();

		let mut item = held_item;
		let mut item_changed = false;
		if is_live && item.as_ref().map(Entry::id) != Some(notification.item.as_str()) {
			let live = self.source()?.live_item().await?;
			if live.id != notification.item {
				warn!(
					"OpenLP: live item {} does not match notified item {}",
					live.id, notification.item
				);
			}
			let service_item = service
				.as_ref()
				.and_then(|s| s.get(&live.id))
				.and_then(|e| e.service_item().cloned());
			let entry = Entry::from_live_item(live, service_item, engine.clone());
			info!(
				"OpenLP: live item is now {:?} ({} slides)",
				entry.title(),
				entry.sub_entry_count()
			);
			item = Some(entry);
			item_changed = true;
		}

		if !is_live && item.take().is_some() {
			info!("OpenLP: nothing is live");
		}

		let slide_id = SubEntryId::new(notification.item.as_str(), notification.slide);
		let slide_changed = is_live && live_slide.as_ref() != Some(&slide_id);

		self.commit(|s| {
			s.mode = Some(mode);
			s.last_key = Some(key);
			s.live_slide = is_live.then(|| slide_id.clone());
			s.service = service.clone();
			s.item = item.clone();
		});

		let mut events = Vec::new();
		if mode_changed {
			events.push(SyncEvent::ModeChanged(mode));
		}
		if service_changed {
			if let Some(service) = service {
				events.push(SyncEvent::ServiceChanged(service));
			}
		}
		if item_changed {
			if let Some(item) = item.clone() {
				events.push(SyncEvent::ItemChanged(item));
			}
		}
		if slide_changed {
			let slide = item.and_then(|i| i.sub_entry(notification.slide));
			if slide.is_none() {
				warn!("OpenLP: live item has no slide {}", slide_id);
			}
			events.push(SyncEvent::SlideChanged { id: slide_id, slide });
		}

		Ok(self.dispatch(events).await)
	}

	fn commit(&self, f: impl FnOnce(&mut SyncState)) {
		let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
		f(&mut guard);
	}

	async fn dispatch(&mut self, events: Vec<SyncEvent>) -> Vec<SyncEvent> {
		for event in &events {
			self.dispatcher.dispatch(event).await;
		}
		events
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::remote::{LiveItem, LiveSlide, RemoteError, ServiceItem};
	use async_trait::async_trait;
	use std::sync::Mutex;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use tokio_tungstenite::tungstenite;

	/// In-memory snapshot source counting every fetch.
	#[derive(Default)]
	struct FakeSource {
		items: Mutex<Vec<ServiceItem>>,
		live: Mutex<LiveItem>,
		service_fetches: AtomicUsize,
		live_fetches: AtomicUsize,
		fail: AtomicBool,
		fail_live: AtomicBool,
	}

	#[async_trait]
	impl SnapshotSource for Arc<FakeSource> {
		async fn service_items(&self) -> Result<Vec<ServiceItem>, RemoteError> {
			self.service_fetches.fetch_add(1, Ordering::SeqCst);
			if self.fail.load(Ordering::SeqCst) {
				return Err(tungstenite::Error::ConnectionClosed.into());
			}
			Ok(self.items.lock().unwrap().clone())
		}

		async fn live_item(&self) -> Result<LiveItem, RemoteError> {
			self.live_fetches.fetch_add(1, Ordering::SeqCst);
			if self.fail.load(Ordering::SeqCst) || self.fail_live.load(Ordering::SeqCst) {
				return Err(tungstenite::Error::ConnectionClosed.into());
			}
			Ok(self.live.lock().unwrap().clone())
		}
	}

	impl FakeSource {
		fn set_items(&self, ids: &[&str]) {
			*self.items.lock().unwrap() = ids
				.iter()
				.map(|id| ServiceItem {
					id: id.to_string(),
					title: format!("Song {}", id),
					plugin: "songs".into(),
					ccli_number: "1".into(),
					..Default::default()
				})
				.collect();
		}

		fn set_live(&self, id: &str, slides: usize) {
			*self.live.lock().unwrap() = LiveItem {
				id: id.into(),
				title: format!("Song {}", id),
				name: "songs".into(),
				slides: (0..slides)
					.map(|i| LiveSlide {
						text: format!("{} slide {}", id, i),
						..Default::default()
					})
					.collect(),
				..Default::default()
			};
		}

		fn fetches(&self) -> (usize, usize) {
			(
				self.service_fetches.load(Ordering::SeqCst),
				self.live_fetches.load(Ordering::SeqCst),
			)
		}
	}

	fn setup() -> (Arc<FakeSource>, SyncEngine) {
		let source = Arc::new(FakeSource::default());
		source.set_items(&["G0", "G1", "G2"]);
		source.set_live("G1", 3);
		let engine = SyncEngine::new().with_source(source.clone());
		(source, engine)
	}

	fn notification(service: u64, item: &str, slide: usize) -> Notification {
		Notification {
			service,
			item: item.into(),
			slide,
			..Default::default()
		}
	}

	fn kinds(events: &[SyncEvent]) -> Vec<EventKind> {
		events.iter().map(SyncEvent::kind).collect()
	}

	#[tokio::test]
	async fn first_notification_builds_everything() {
		let (source, mut engine) = setup();

		let events = engine.process(notification(5, "G1", 1)).await.unwrap();

		assert_eq!(
			kinds(&events),
			vec![
				EventKind::Mode,
				EventKind::Service,
				EventKind::Item,
				EventKind::Slide
			]
		);
		assert_eq!(source.fetches(), (1, 1));
		assert_eq!(engine.mode(), Some(DisplayMode::Presentation));
		assert_eq!(engine.service().unwrap().id(), 5);
		assert_eq!(engine.item().unwrap().id(), "G1");

		let slide = engine.slide().unwrap();
		assert_eq!(slide.position(), 1);
		assert_eq!(slide.text(), "G1 slide 1");
		assert!(slide.is_active());
		match &events[3] {
			SyncEvent::SlideChanged { id, slide } => {
				assert_eq!(*id, SubEntryId::new("G1", 1));
				assert_eq!(slide.as_ref().unwrap().text(), "G1 slide 1");
			}
			other => panic!("unexpected event {:?}", other),
		}
	}

	#[tokio::test]
	async fn positional_duplicate_is_dropped() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 1)).await.unwrap();

		let mut repeat = notification(5, "G1", 1);
		repeat.counter = 42;
		let events = engine.process(repeat).await.unwrap();

		assert!(events.is_empty());
		assert_eq!(source.fetches(), (1, 1));
	}

	#[tokio::test]
	async fn mode_toggle_on_same_position_fetches_nothing() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 1)).await.unwrap();

		let mut blanked = notification(5, "G1", 1);
		blanked.blank = true;
		blanked.display = true;
		let events = engine.process(blanked).await.unwrap();

		assert_eq!(kinds(&events), vec![EventKind::Mode]);
		assert_eq!(engine.mode(), Some(DisplayMode::Blank));
		assert_eq!(source.fetches(), (1, 1));
	}

	#[tokio::test]
	async fn slide_change_only_selects_slide() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 0)).await.unwrap();

		let events = engine.process(notification(5, "G1", 2)).await.unwrap();

		assert_eq!(kinds(&events), vec![EventKind::Slide]);
		assert_eq!(source.fetches(), (1, 1));
		let item = engine.item().unwrap();
		let active: Vec<_> = item.sub_entries().filter(SubEntry::is_active).collect();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].position(), 2);
	}

	#[tokio::test]
	async fn item_change_refetches_live_item_only() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 0)).await.unwrap();

		source.set_live("G2", 2);
		let events = engine.process(notification(5, "G2", 0)).await.unwrap();

		assert_eq!(kinds(&events), vec![EventKind::Item, EventKind::Slide]);
		assert_eq!(source.fetches(), (1, 2));

		let service = engine.service().unwrap();
		let active: Vec<_> = service.entries().iter().filter(|e| e.is_active()).collect();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].id(), "G2");
		assert_eq!(service.active().map(Entry::id), Some("G2"));
	}

	#[tokio::test]
	async fn live_entry_is_paired_with_service_descriptor() {
		let (_source, mut engine) = setup();
		engine.process(notification(5, "G1", 0)).await.unwrap();

		let item = engine.item().unwrap();
		assert_eq!(item.song().unwrap().ccli.as_deref(), Some("1"));
		assert_eq!(item.index(), Some(1));
		assert_eq!(item.previous().map(|e| e.id().to_string()), Some("G0".into()));
		assert_eq!(item.next().map(|e| e.id().to_string()), Some("G2".into()));
	}

	#[tokio::test]
	async fn revision_change_replaces_collection_for_held_entries() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 0)).await.unwrap();

		let old_service = engine.service().unwrap();
		let held = old_service.get("G1").unwrap().clone();
		assert_eq!(held.next().unwrap().id(), "G2");

		source.set_items(&["G9", "G1", "G3", "G2"]);
		let events = engine.process(notification(6, "G1", 0)).await.unwrap();

		assert_eq!(kinds(&events), vec![EventKind::Service]);
		assert_eq!(source.fetches(), (2, 1));
		let new_service = engine.service().unwrap();
		assert!(!new_service.same_as(&old_service));
		assert_eq!(held.previous().unwrap().id(), "G9");
		assert_eq!(held.next().unwrap().id(), "G3");
	}

	#[tokio::test]
	async fn failed_fetch_keeps_state_and_allows_retry() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 0)).await.unwrap();

		source.fail.store(true, Ordering::SeqCst);
		let result = engine.process(notification(6, "G1", 0)).await;
		assert!(matches!(result, Err(SyncError::FetchError(_))));
		assert_eq!(engine.service().unwrap().id(), 5);

		source.fail.store(false, Ordering::SeqCst);
		let events = engine.process(notification(6, "G1", 0)).await.unwrap();
		assert_eq!(kinds(&events), vec![EventKind::Service]);
		assert_eq!(engine.service().unwrap().id(), 6);
	}

	#[tokio::test]
	async fn failed_live_fetch_discards_new_collection() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 0)).await.unwrap();

		source.fail_live.store(true, Ordering::SeqCst);
		let result = engine.process(notification(6, "G2", 0)).await;
		assert!(matches!(result, Err(SyncError::FetchError(_))));
		assert_eq!(source.fetches(), (2, 2));
		assert_eq!(engine.service().unwrap().id(), 5);
		assert_eq!(engine.item().unwrap().id(), "G1");
		assert_eq!(
			engine.read(|s| s.last_key().cloned()),
			Some(PositionKey::from_notification(&notification(5, "G1", 0)))
		);

		source.fail_live.store(false, Ordering::SeqCst);
		source.set_live("G2", 1);
		let events = engine.process(notification(6, "G2", 0)).await.unwrap();
		assert_eq!(
			kinds(&events),
			vec![EventKind::Service, EventKind::Item, EventKind::Slide]
		);
		assert_eq!(engine.service().unwrap().id(), 6);
	}

	#[tokio::test]
	async fn going_dark_clears_the_live_item() {
		let (_source, mut engine) = setup();
		engine.process(notification(5, "G1", 1)).await.unwrap();
		let held = engine.item().unwrap();
		let held_slide = engine.slide().unwrap();

		let events = engine.process(notification(5, "", 0)).await.unwrap();

		assert!(events.is_empty());
		assert!(engine.item().is_none());
		assert!(engine.slide().is_none());
		assert!(!held.is_active());
		assert!(!held_slide.is_active());
		assert!(engine.service().unwrap().active().is_none());

		let events = engine.process(notification(5, "G1", 1)).await.unwrap();
		assert_eq!(kinds(&events), vec![EventKind::Item, EventKind::Slide]);
		assert!(held.is_active());
	}

	#[tokio::test]
	async fn nothing_live_skips_live_fetch() {
		let (source, mut engine) = setup();
		let events = engine.process(notification(1, "", 0)).await.unwrap();

		assert_eq!(kinds(&events), vec![EventKind::Mode, EventKind::Service]);
		assert_eq!(source.fetches(), (1, 0));
		assert!(engine.item().is_none());
		assert!(engine.slide().is_none());
	}

	#[tokio::test]
	async fn undecodable_frame_changes_nothing() {
		let (source, mut engine) = setup();
		let result = engine.handle_message(b"{not json").await;

		assert!(matches!(result, Err(SyncError::DecodeError(_))));
		assert_eq!(source.fetches(), (0, 0));
		assert!(engine.mode().is_none());
	}

	#[tokio::test]
	async fn malformed_program_state_changes_nothing() {
		let (source, mut engine) = setup();
		engine.process(notification(5, "G1", 1)).await.unwrap();

		let result = engine
			.handle_message(br#"{"results":{"service":"five","item":"G1","slide":1}}"#)
			.await;
		assert!(matches!(result, Err(SyncError::DecodeError(_))));

		let result = engine.handle_message(b"[]").await;
		assert!(matches!(result, Err(SyncError::DecodeError(_))));

		assert_eq!(engine.service().unwrap().id(), 5);
		assert_eq!(source.fetches(), (1, 1));
	}

	#[tokio::test]
	async fn missing_source_is_reported() {
		let mut engine = SyncEngine::new();
		let result = engine.process(notification(1, "G1", 0)).await;
		assert!(matches!(result, Err(SyncError::NotConnected)));
	}

	#[tokio::test]
	async fn handlers_see_committed_state() {
		let (_source, mut engine) = setup();
		let seen = Arc::new(Mutex::new(None));

		let record = seen.clone();
		engine.on_fn(EventKind::Item, "record", move |event: &SyncEvent| {
			if let SyncEvent::ItemChanged(item) = event {
				let active_slides = item.sub_entries().filter(SubEntry::is_active).count();
				*record.lock().unwrap() = Some((item.is_active(), active_slides));
			}
		});

		engine
			.handle_message(br#"{"results":{"service":5,"item":"G1","slide":2}}"#)
			.await
			.unwrap();

		assert_eq!(*seen.lock().unwrap(), Some((true, 1)));
	}

	#[tokio::test]
	async fn subscribe_receives_events_in_order() {
		let (_source, mut engine) = setup();
		let mut rx = engine.subscribe();

		engine.process(notification(5, "G1", 1)).await.unwrap();

		let mut received = Vec::new();
		while let Ok(event) = rx.try_recv() {
			received.push(event.kind());
		}
		assert_eq!(
			received,
			vec![
				EventKind::Mode,
				EventKind::Service,
				EventKind::Item,
				EventKind::Slide
			]
		);
	}
}
