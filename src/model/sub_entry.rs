//! Slides of the live item.

use super::citation::{Citation, CitationError, slide_chapter_verse};
use super::entry::{Entry, EntryKind, SongView};
use crate::remote::LiveSlide;

use serde::Serialize;
use std::fmt;

/// Slide identity: owning item id plus position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SubEntryId {
	pub entry_id: String,
	pub position: usize,
}

impl SubEntryId {
	pub fn new(entry_id: impl Into<String>, position: usize) -> Self {
		Self {
			entry_id: entry_id.into(),
			position,
		}
	}
}

impl fmt::Display for SubEntryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}|{}", self.entry_id, self.position)
	}
}

/// Song view of a single slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideSongView {
	#[serde(flatten)]
	pub song: SongView,
	/// Verse tag, e.g. `V1`.
	pub tag: String,
	/// HTML with chords, when the server renders them.
	pub chords: Option<String>,
}

/// Scripture view of a single slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideScripture {
	#[serde(flatten)]
	pub citation: Citation,
	/// Chapter shown on this slide, if known.
	pub slide_chapter: Option<u32>,
	/// Verse the slide starts in, if known.
	pub slide_verse: Option<u32>,
}

/// One slide of the live item.
///
/// Holds only its owning entry and position; the slide data and its
/// neighbours are looked up in the entry on every access.
#[derive(Debug, Clone)]
pub struct SubEntry {
	entry: Entry,
	position: usize,
}

impl SubEntry {
	/// `position` must be within the entry's slides.
	pub(crate) fn new(entry: Entry, position: usize) -> Self {
		debug_assert!(position < entry.sub_entry_count());
		Self { entry, position }
	}

	pub fn entry(&self) -> &Entry {
		&self.entry
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn id(&self) -> SubEntryId {
		SubEntryId::new(self.entry.id(), self.position)
	}

	/// Raw slide descriptor.
	pub fn raw(&self) -> &LiveSlide {
		&self.entry.slides()[self.position]
	}

	/// Plain text without chords.
	pub fn text(&self) -> &str {
		&self.raw().text
	}

	/// HTML formatted text without chords.
	pub fn html(&self) -> &str {
		&self.raw().html
	}

	/// The item title, falling back to the slide's own title.
	pub fn title(&self) -> &str {
		match self.entry.title() {
			"" => self.raw().title.as_str(),
			title => title,
		}
	}

	pub fn kind(&self) -> EntryKind {
		self.entry.kind()
	}

	pub fn previous(&self) -> Option<SubEntry> {
		self.entry.sub_entry(self.position.checked_sub(1)?)
	}

	pub fn next(&self) -> Option<SubEntry> {
		self.entry.sub_entry(self.position + 1)
	}

	/// True when this is the slide the engine last observed as live.
	pub fn is_active(&self) -> bool {
		self.entry
			.engine()
			.live_slide_id()
			.is_some_and(|live| live == self.id())
	}

	pub fn song(&self) -> Option<SlideSongView> {
		let song = self.entry.song()?;
		let raw = self.raw();
		Some(SlideSongView {
			song,
			tag: raw.tag.clone(),
			chords: raw.chords.clone(),
		})
	}

	/// The item's citation plus the chapter and verse this slide shows.
	///
	/// Long passages are split across slides mid-verse; a slide that does not
	/// start with `chapter:verse` continues the nearest earlier slide that
	/// does.
	pub fn scripture(&self) -> Option<Result<SlideScripture, CitationError>> {
		let citation = match self.entry.scripture()? {
			Ok(citation) => citation,
			Err(e) => return Some(Err(e)),
		};

		let slides = self.entry.slides();
		let found = slides[..=self.position]
			.iter()
			.rev()
			.find_map(|slide| slide_chapter_verse(&slide.text));

		Some(Ok(SlideScripture {
			citation,
			slide_chapter: found.map(|(chapter, _)| chapter),
			slide_verse: found.map(|(_, verse)| verse),
		}))
	}
}
