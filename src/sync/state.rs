//! Engine-held synchronization state.
//!
//! The state is written only by [`SyncEngine`](super::SyncEngine) at the end of
//! a successful cycle. Model objects keep a weak [`EngineRef`] to it so their
//! "active"/"previous"/"next" accessors always resolve against what is live
//! now, not against what was live when they were built.

use crate::model::{Collection, Entry, SubEntry, SubEntryId};
use crate::remote::Notification;

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// What the main display is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
	Blank,
	/// The desktop (external output) is shown instead of OpenLP's display.
	Desktop,
	/// Only the theme background is shown.
	Theme,
	Presentation,
}

impl DisplayMode {
	/// Blank wins over desktop, desktop over theme; otherwise presenting.
	pub fn from_flags(blank: bool, display: bool, theme: bool) -> Self {
		if blank {
			DisplayMode::Blank
		} else if display {
			DisplayMode::Desktop
		} else if theme {
			DisplayMode::Theme
		} else {
			DisplayMode::Presentation
		}
	}

	pub fn from_notification(notification: &Notification) -> Self {
		Self::from_flags(notification.blank, notification.display, notification.theme)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			DisplayMode::Blank => "blank",
			DisplayMode::Desktop => "desktop",
			DisplayMode::Theme => "theme",
			DisplayMode::Presentation => "presentation",
		}
	}
}

impl fmt::Display for DisplayMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Composite position key used for duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
	pub service: u64,
	pub item: String,
	pub slide: usize,
}

impl PositionKey {
	pub fn from_notification(notification: &Notification) -> Self {
		Self {
			service: notification.service,
			item: notification.item.clone(),
			slide: notification.slide,
		}
	}
}

impl fmt::Display for PositionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}|{}|{}", self.service, self.item, self.slide)
	}
}

/// Everything the engine last synchronized.
#[derive(Debug, Default)]
pub struct SyncState {
	pub(crate) mode: Option<DisplayMode>,
	pub(crate) last_key: Option<PositionKey>,
	pub(crate) live_slide: Option<SubEntryId>,
	pub(crate) service: Option<Collection>,
	pub(crate) item: Option<Entry>,
}

impl SyncState {
	pub fn mode(&self) -> Option<DisplayMode> {
		self.mode
	}

	pub fn last_key(&self) -> Option<&PositionKey> {
		self.last_key.as_ref()
	}

	/// Identity of the live slide as last observed.
	pub fn live_slide_id(&self) -> Option<&SubEntryId> {
		self.live_slide.as_ref()
	}

	pub fn service(&self) -> Option<&Collection> {
		self.service.as_ref()
	}

	pub fn item(&self) -> Option<&Entry> {
		self.item.as_ref()
	}

	/// The live slide, if the live item has one at the observed position.
	pub fn slide(&self) -> Option<SubEntry> {
		let id = self.live_slide.as_ref()?;
		let item = self.item.as_ref()?;
		if item.id() != id.entry_id {
			return None;
		}
		item.sub_entry(id.position)
	}
}

pub(crate) type SharedState = Arc<RwLock<SyncState>>;

/// Weak back-reference from model objects to the owning engine's state.
#[derive(Debug, Clone, Default)]
pub struct EngineRef(Weak<RwLock<SyncState>>);

impl EngineRef {
	pub(crate) fn new(state: &SharedState) -> Self {
		Self(Arc::downgrade(state))
	}

	/// A reference that never resolves, for objects built outside an engine.
	pub fn detached() -> Self {
		Self(Weak::new())
	}

	/// Read the engine state. `None` once the engine is gone.
	///
	/// Closures must not call back into model accessors; clone what is
	/// needed out of the state instead.
	pub(crate) fn with<R>(&self, f: impl FnOnce(&SyncState) -> R) -> Option<R> {
		let state = self.0.upgrade()?;
		let guard = state.read().unwrap_or_else(PoisonError::into_inner);
		Some(f(&guard))
	}

	pub(crate) fn service(&self) -> Option<Collection> {
		self.with(|s| s.service.clone()).flatten()
	}

	pub(crate) fn live_slide_id(&self) -> Option<SubEntryId> {
		self.with(|s| s.live_slide.clone()).flatten()
	}
}
