//! Wire types for the OpenLP push channel and the v2 HTTP API.
//!
//! Field names follow the remote JSON exactly (via `serde` renames). Fields the
//! synchronization core never interprets are still decoded and kept so that
//! consumers can reach them through the raw descriptors.

use serde::{Deserialize, Deserializer, Serialize};

/// Program state pushed over the websocket whenever the live display changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Incremented whenever the live display changed. Informational only.
    #[serde(default)]
    pub counter: u64,
    /// Service revision; bumped whenever the service is modified.
    pub service: u64,
    /// Index of the live slide within the live item.
    pub slide: usize,
    /// Unique identifier of the live item. Empty when nothing is live.
    pub item: String,
    /// Display is blanked.
    #[serde(default)]
    pub blank: bool,
    /// Display is showing the desktop.
    #[serde(default)]
    pub display: bool,
    /// Display is showing only the theme.
    #[serde(default)]
    pub theme: bool,
    #[serde(default)]
    pub twelve: bool,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(rename = "isSecure", default)]
    pub is_secure: bool,
    #[serde(rename = "chordNotation", default)]
    pub chord_notation: Option<String>,
}

impl Notification {
    /// Decode a raw push-channel frame.
    ///
    /// The websocket wraps the program state in a `results` object; older
    /// servers send the bare object. `service`, `slide` and `item` are
    /// required either way.
    pub fn decode(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let mut frame: serde_json::Value = serde_json::from_slice(raw)?;
        if let Some(results) = frame.get_mut("results").map(serde_json::Value::take) {
            return serde_json::from_value(results);
        }
        serde_json::from_value(frame)
    }
}

/// Lightweight item descriptor returned by `service/items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Plugin providing the item (`songs`, `bibles`, `images`, ...).
    #[serde(default)]
    pub plugin: String,
    /// CCLI number; empty when not applicable. Some servers send a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub ccli_number: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub theme: Option<serde_json::Value>,
    /// False when a required file is missing.
    #[serde(default = "default_true")]
    pub is_valid: bool,
    /// True when this item is currently live.
    #[serde(default)]
    pub selected: bool,
}

/// Detailed descriptor of the live item returned by `controller/live-items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Name of the plugin that created the item.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub theme: Option<String>,
    /// Display type, e.g. `ServiceItemType.Text`.
    #[serde(rename = "type", default)]
    pub content_type: String,
    /// Legal information: `[title, authors, copyright, ccli_number]`.
    #[serde(default)]
    pub audit: Vec<serde_json::Value>,
    #[serde(default)]
    pub footer: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<u32>,
    #[serde(rename = "backgroundAudio", default)]
    pub background_audio: Vec<serde_json::Value>,
    #[serde(rename = "fromPlugin", default)]
    pub from_plugin: bool,
    #[serde(rename = "isThemeOverwritten", default)]
    pub is_theme_overwritten: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub slides: Vec<LiveSlide>,
}

impl LiveItem {
    /// Authors line from the audit record, when present.
    pub fn authors(&self) -> Option<String> {
        match self.audit.get(1)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(names) => {
                let names: Vec<&str> = names.iter().filter_map(|n| n.as_str()).collect();
                if names.is_empty() {
                    None
                } else {
                    Some(names.join(", "))
                }
            }
            _ => None,
        }
    }
}

/// One slide inside a [`LiveItem`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveSlide {
    /// Plain text without chords.
    #[serde(default)]
    pub text: String,
    /// HTML formatted text without chords.
    #[serde(default)]
    pub html: String,
    /// HTML formatted text with chords.
    #[serde(default)]
    pub chords: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    /// Verse tag, e.g. `V1`.
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selected: bool,
}

fn default_true() -> bool {
    true
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Error types for the remote endpoints
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    StatusError {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),
}
