//! Scripture citation parsing.
//!
//! Bible items carry their reference only in the human readable title, e.g.
//! `John 3:16-18, 20 New International Version (NIV), Copyright 2011`. The
//! title is the one source available for every scripture in a service (the
//! live footer only exists for the live item), so the structured reference is
//! recovered from it here.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// `<book> <range> <translation> (<abbreviation>), <copyright>`
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\d?[A-Za-z\s]+)\s([\d:,\s-]+)\s([A-Za-z\s]+)\s\(([A-Z]+)\), (?s:(.+))$")
		.expect("title pattern is valid")
});

/// `[chapter:]verseStart[-[verseEnd]]`
static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?:(\d+):)?(\d+)(?:-(\d+)?)?$").expect("range group pattern is valid")
});

/// Leading `chapter:verse` of a slide's text.
static SLIDE_PREFIX_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(\d+):(\d+)").expect("slide prefix pattern is valid"));

/// Structured form of a scripture title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
	/// Book and range as written, e.g. `John 3:16-18, 20`.
	pub reference: String,
	pub chapter_start: u32,
	pub chapter_start_verse_start: u32,
	pub chapter_start_verse_end: u32,
	pub chapter_end: u32,
	pub chapter_end_verse_start: u32,
	pub chapter_end_verse_end: u32,
	pub book: String,
	pub translation: String,
	pub abbreviation: String,
	pub copyright: String,
}

/// Citation parse failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CitationError {
	#[error("Title is not a scripture reference: {0:?}")]
	Malformed(String),

	#[error("Invalid verse range group: {0:?}")]
	InvalidRange(String),
}

#[derive(Debug, Clone, Copy)]
struct Group {
	chapter: Option<u32>,
	verse_start: u32,
	verse_end: Option<u32>,
}

fn parse_number(digits: &str, group: &str) -> Result<u32, CitationError> {
	digits
		.parse()
		.map_err(|_| CitationError::InvalidRange(group.to_string()))
}

fn parse_group(group: &str) -> Result<Group, CitationError> {
	let caps = GROUP_RE
		.captures(group)
		.ok_or_else(|| CitationError::InvalidRange(group.to_string()))?;

	let number = |idx: usize| {
		caps.get(idx)
			.map(|m| parse_number(m.as_str(), group))
			.transpose()
	};

	Ok(Group {
		chapter: number(1)?,
		verse_start: parse_number(&caps[2], group)?,
		verse_end: number(3)?,
	})
}

/// Parse a scripture title into a [`Citation`].
///
/// The range holds one or more `, ` separated groups: the first is the start
/// of the passage and must name a chapter, the second is its end. Further
/// groups must be well formed but are otherwise ignored. An end group
/// without a chapter continues the start chapter. With a single group the end
/// of the passage is the start group's last verse.
pub fn parse_citation(title: &str) -> Result<Citation, CitationError> {
	let caps = TITLE_RE
		.captures(title)
		.ok_or_else(|| CitationError::Malformed(title.to_string()))?;

	let book = caps[1].trim().to_string();
	let range = caps[2].trim();

	let groups = range
		.split(", ")
		.map(|g| parse_group(g.trim()))
		.collect::<Result<Vec<_>, _>>()?;

	let first = groups[0];
	let chapter_start = first
		.chapter
		.ok_or_else(|| CitationError::InvalidRange(range.to_string()))?;
	let chapter_start_verse_start = first.verse_start;
	let chapter_start_verse_end = first.verse_end.unwrap_or(chapter_start_verse_start);

	let (chapter_end, chapter_end_verse_start, chapter_end_verse_end) = match groups.get(1) {
		Some(last) => {
			let chapter = last.chapter.unwrap_or(chapter_start);
			(
				chapter,
				last.verse_start,
				last.verse_end.unwrap_or(last.verse_start),
			)
		}
		_ => (chapter_start, chapter_start_verse_end, chapter_start_verse_end),
	};

	Ok(Citation {
		reference: format!("{} {}", book, range),
		chapter_start,
		chapter_start_verse_start,
		chapter_start_verse_end,
		chapter_end,
		chapter_end_verse_start,
		chapter_end_verse_end,
		book,
		translation: caps[3].trim().to_string(),
		abbreviation: caps[4].to_string(),
		copyright: caps[5].to_string(),
	})
}

/// `chapter:verse` a slide's text starts with, if any.
pub fn slide_chapter_verse(text: &str) -> Option<(u32, u32)> {
	let caps = SLIDE_PREFIX_RE.captures(text)?;
	Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}
