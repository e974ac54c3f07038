//! Change events and their dispatch.
//!
//! The engine emits one event per category that changed in a cycle, after all
//! state for that cycle has been committed. Handlers subscribe to a single
//! category; a failing handler is logged and does not stop the others.

use super::state::DisplayMode;
use super::types::SyncError;
use crate::model::{Collection, Entry, SubEntry, SubEntryId};

use tokio::sync::mpsc;

/// Subscription categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	Mode,
	Service,
	Item,
	Slide,
}

impl EventKind {
	pub const ALL: [EventKind; 4] = [
		EventKind::Mode,
		EventKind::Service,
		EventKind::Item,
		EventKind::Slide,
	];
}

/// Semantic changes observed on the remote controller
#[derive(Debug, Clone)]
pub enum SyncEvent {
	/// The display mode changed
	ModeChanged(DisplayMode),
	/// A new service revision was loaded
	ServiceChanged(Collection),
	/// A different item went live
	ItemChanged(Entry),
	/// A different slide went live. `slide` is `None` when the live item has
	/// no slide at the reported position.
	SlideChanged {
		id: SubEntryId,
		slide: Option<SubEntry>,
	},
}

impl SyncEvent {
	pub fn kind(&self) -> EventKind {
		match self {
			SyncEvent::ModeChanged(_) => EventKind::Mode,
			SyncEvent::ServiceChanged(_) => EventKind::Service,
			SyncEvent::ItemChanged(_) => EventKind::Item,
			SyncEvent::SlideChanged { .. } => EventKind::Slide,
		}
	}
}

/// Trait for handling sync events.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
	/// Handle an event of the category this handler was registered for.
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Adapter running a closure for each event.
pub struct FnHandler<F> {
	name: &'static str,
	f: F,
}

impl<F> FnHandler<F>
where
	F: FnMut(&SyncEvent) + Send + Sync,
{
	pub fn new(name: &'static str, f: F) -> Self {
		Self { name, f }
	}
}

#[async_trait::async_trait]
impl<F> SyncEventHandler for FnHandler<F>
where
	F: FnMut(&SyncEvent) + Send + Sync,
{
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
		(self.f)(event);
		Ok(())
	}

	fn name(&self) -> &'static str {
		self.name
	}
}

/// Adapter forwarding events into a channel.
pub struct ChannelHandler {
	tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelHandler {
	pub fn new(tx: mpsc::UnboundedSender<SyncEvent>) -> Self {
		Self { tx }
	}
}

#[async_trait::async_trait]
impl SyncEventHandler for ChannelHandler {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
		self.tx
			.send(event.clone())
			.map_err(|_| SyncError::HandlerError("event receiver dropped".to_string()))
	}

	fn name(&self) -> &'static str {
		"ChannelHandler"
	}
}

/// Event dispatcher that manages handlers per category.
#[derive(Default)]
pub struct EventDispatcher {
	handlers: Vec<(EventKind, Box<dyn SyncEventHandler>)>,
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a handler for one category.
	///
	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, kind: EventKind, handler: Box<dyn SyncEventHandler>) {
		self.handlers.push((kind, handler));
	}

	pub fn handler_count(&self, kind: EventKind) -> usize {
		self.handlers.iter().filter(|(k, _)| *k == kind).count()
	}

	/// Dispatch an event to every handler registered for its category.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub async fn dispatch(&mut self, event: &SyncEvent) {
		let kind = event.kind();
		for (_, handler) in self.handlers.iter_mut().filter(|(k, _)| *k == kind) {
			if let Err(e) = handler.handle(event).await {
				tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	struct FailingHandler;

	#[async_trait::async_trait]
	impl SyncEventHandler for FailingHandler {
		async fn handle(&mut self, _event: &SyncEvent) -> Result<(), SyncError> {
			Err(SyncError::HandlerError("boom".into()))
		}

		fn name(&self) -> &'static str {
			"FailingHandler"
		}
	}

	#[tokio::test]
	async fn dispatch_reaches_only_matching_category() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let mut dispatcher = EventDispatcher::new();

		let log = seen.clone();
		dispatcher.register_handler(
			EventKind::Mode,
			Box::new(FnHandler::new("mode", move |e: &SyncEvent| {
				log.lock().unwrap().push(e.kind())
			})),
		);
		let log = seen.clone();
		dispatcher.register_handler(
			EventKind::Item,
			Box::new(FnHandler::new("item", move |e: &SyncEvent| {
				log.lock().unwrap().push(e.kind())
			})),
		);

		dispatcher
			.dispatch(&SyncEvent::ModeChanged(DisplayMode::Blank))
			.await;

		assert_eq!(*seen.lock().unwrap(), vec![EventKind::Mode]);
		assert_eq!(dispatcher.handler_count(EventKind::Item), 1);
		assert_eq!(dispatcher.handler_count(EventKind::Slide), 0);
	}

	#[tokio::test]
	async fn failing_handler_does_not_stop_others() {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let mut dispatcher = EventDispatcher::new();
		dispatcher.register_handler(EventKind::Mode, Box::new(FailingHandler));
		dispatcher.register_handler(EventKind::Mode, Box::new(ChannelHandler::new(tx)));

		dispatcher
			.dispatch(&SyncEvent::ModeChanged(DisplayMode::Theme))
			.await;

		assert!(matches!(
			rx.try_recv(),
			Ok(SyncEvent::ModeChanged(DisplayMode::Theme))
		));
	}
}
