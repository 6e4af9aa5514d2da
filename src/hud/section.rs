//! Typed content sections and tolerant payload parsing.
//!
//! A payload is `{ "sections": [ { "type", "title"?, "data" }, ... ] }`.
//! Parsing never fails on a single bad section: an unknown `type` becomes
//! [`SectionContent::Unsupported`] and data that does not match its type's
//! shape becomes [`SectionContent::Malformed`]. Both render as placeholders.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Row key that flags a table row as highlighted (e.g. the next calendar event).
pub const HIGHLIGHT_KEY: &str = "_highlight";

/// Alt text used for image sections that do not carry one.
pub const DEFAULT_IMAGE_ALT: &str = "HUD Image";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("payload `sections` must be an array")]
    SectionsNotArray,
}

/// A batch of sections pushed by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub sections: Vec<Section>,
}

impl Payload {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Build a payload from an already-decoded JSON value. A missing
    /// `sections` key yields an empty payload.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Err(PayloadError::NotAnObject(json_kind(&other))),
        };
        match object.remove("sections") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Array(items)) => Ok(Self::new(Section::parse_all(items))),
            Some(_) => Err(PayloadError::SectionsNotArray),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// The fixed set of content type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    Text,
    KeyValue,
    Image,
    Video,
    Youtube,
    Chart,
    List,
    Table,
    Html,
}

impl SectionType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "text" => Self::Text,
            "keyvalue" => Self::KeyValue,
            "image" => Self::Image,
            "video" => Self::Video,
            "youtube" => Self::Youtube,
            "chart" => Self::Chart,
            "list" => Self::List,
            "table" => Self::Table,
            "html" => Self::Html,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::KeyValue => "keyvalue",
            Self::Image => "image",
            Self::Video => "video",
            Self::Youtube => "youtube",
            Self::Chart => "chart",
            Self::List => "list",
            Self::Table => "table",
            Self::Html => "html",
        }
    }

    /// Visual hierarchy used when a batch is displayed together; lower
    /// values are shown first.
    pub fn display_priority(self) -> u8 {
        match self {
            Self::Image => 0,
            Self::KeyValue => 1,
            Self::Table => 2,
            Self::Text => 3,
            Self::List => 4,
            Self::Chart => 5,
            Self::Video | Self::Youtube | Self::Html => UNRANKED_PRIORITY,
        }
    }
}

pub(crate) const UNRANKED_PRIORITY: u8 = 99;

/// One typed unit of structured content.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: Option<String>,
    pub content: SectionContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionContent {
    Text(TextData),
    KeyValue(KeyValueData),
    Image(ImageData),
    Video(VideoData),
    Youtube(YoutubeData),
    Chart(ChartData),
    List(ListData),
    Table(TableData),
    Html(HtmlData),
    /// A known tag whose `data` did not match the expected shape.
    Malformed { kind: SectionType, reason: String },
    /// A tag outside the known set.
    Unsupported { tag: String },
    /// The single error panel shown when a fetch fails.
    LoadError { message: String },
}

impl Section {
    pub fn new(content: SectionContent) -> Self {
        Self {
            title: None,
            content,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(SectionContent::Text(TextData {
            text: Some(body.into()),
            content: None,
        }))
    }

    pub fn load_error(message: impl Into<String>) -> Self {
        Self::new(SectionContent::LoadError {
            message: message.into(),
        })
    }

    /// Type tag driving renderer dispatch and display priority. Malformed
    /// sections keep the tag they were sent with.
    pub fn section_type(&self) -> Option<SectionType> {
        match &self.content {
            SectionContent::Text(_) => Some(SectionType::Text),
            SectionContent::KeyValue(_) => Some(SectionType::KeyValue),
            SectionContent::Image(_) => Some(SectionType::Image),
            SectionContent::Video(_) => Some(SectionType::Video),
            SectionContent::Youtube(_) => Some(SectionType::Youtube),
            SectionContent::Chart(_) => Some(SectionType::Chart),
            SectionContent::List(_) => Some(SectionType::List),
            SectionContent::Table(_) => Some(SectionType::Table),
            SectionContent::Html(_) => Some(SectionType::Html),
            SectionContent::Malformed { kind, .. } => Some(*kind),
            SectionContent::Unsupported { .. } | SectionContent::LoadError { .. } => None,
        }
    }

    pub fn display_priority(&self) -> u8 {
        self.section_type()
            .map(SectionType::display_priority)
            .unwrap_or(UNRANKED_PRIORITY)
    }

    pub fn parse_all(items: Vec<Value>) -> Vec<Section> {
        items.into_iter().map(Section::from_value).collect()
    }

    /// Decode one section. Never fails; problems surface as placeholder
    /// variants and a warning in the log.
    pub fn from_value(value: Value) -> Self {
        let raw: RawSection = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "section is not an object");
                return Self::new(SectionContent::Unsupported { tag: String::new() });
            }
        };
        let title = raw.title.filter(|title| !title.is_empty());
        let Some(kind) = SectionType::from_tag(&raw.kind) else {
            tracing::warn!(section_type = %raw.kind, "unsupported section type");
            return Self {
                title,
                content: SectionContent::Unsupported { tag: raw.kind },
            };
        };
        let data = match raw.data {
            Value::Null => Value::Object(Map::new()),
            data => data,
        };
        let content = match kind {
            SectionType::Text => decode(kind, data, SectionContent::Text),
            SectionType::KeyValue => decode(kind, data, SectionContent::KeyValue),
            SectionType::Image => decode(kind, data, SectionContent::Image),
            SectionType::Video => decode(kind, data, SectionContent::Video),
            SectionType::Youtube => decode(kind, data, SectionContent::Youtube),
            SectionType::Chart => decode(kind, data, SectionContent::Chart),
            SectionType::List => decode(kind, data, SectionContent::List),
            SectionType::Table => decode(kind, data, SectionContent::Table),
            SectionType::Html => decode(kind, data, SectionContent::Html),
        };
        Self { title, content }
    }
}

fn decode<T: DeserializeOwned>(
    kind: SectionType,
    data: Value,
    wrap: fn(T) -> SectionContent,
) -> SectionContent {
    match serde_json::from_value::<T>(data) {
        Ok(data) => wrap(data),
        Err(err) => {
            tracing::warn!(section_type = kind.tag(), error = %err, "malformed section data");
            SectionContent::Malformed {
                kind,
                reason: err.to_string(),
            }
        }
    }
}

#[derive(Deserialize)]
struct RawSection {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    title: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextData {
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub content: Option<String>,
}

impl TextData {
    /// `text` wins over `content`; an empty string counts as absent.
    pub fn body(&self) -> &str {
        first_non_empty(&[&self.text, &self.content]).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeyValueData {
    #[serde(default)]
    pub items: Vec<KeyValueItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeyValueItem {
    #[serde(default, deserialize_with = "scalar_string")]
    pub key: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub caption: Option<String>,
}

impl ImageData {
    pub fn source(&self) -> Option<&str> {
        first_non_empty(&[&self.url, &self.src])
    }

    pub fn alt(&self) -> &str {
        first_non_empty(&[&self.alt]).unwrap_or(DEFAULT_IMAGE_ALT)
    }

    pub fn caption(&self) -> Option<&str> {
        first_non_empty(&[&self.caption])
    }
}

/// Playback flags for video sections.
///
/// `controls` defaults to on; `autoplay`, `looped` and `muted` default to off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackFlags {
    pub controls: bool,
    pub autoplay: bool,
    pub looped: bool,
    pub muted: bool,
}

impl Default for PlaybackFlags {
    fn default() -> Self {
        Self {
            controls: true,
            autoplay: false,
            looped: false,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub controls: Option<bool>,
    #[serde(default)]
    pub autoplay: Option<bool>,
    #[serde(default, rename = "loop")]
    pub looped: Option<bool>,
    #[serde(default)]
    pub muted: Option<bool>,
}

impl VideoData {
    pub fn source(&self) -> Option<&str> {
        first_non_empty(&[&self.url, &self.src])
    }

    pub fn flags(&self) -> PlaybackFlags {
        let defaults = PlaybackFlags::default();
        PlaybackFlags {
            controls: self.controls.unwrap_or(defaults.controls),
            autoplay: self.autoplay.unwrap_or(defaults.autoplay),
            looped: self.looped.unwrap_or(defaults.looped),
            muted: self.muted.unwrap_or(defaults.muted),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct YoutubeData {
    #[serde(default, rename = "videoId")]
    pub video_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl YoutubeData {
    pub fn explicit_id(&self) -> Option<&str> {
        first_non_empty(&[&self.video_id, &self.id])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartData {
    #[serde(default, rename = "chartType")]
    pub chart_type: Option<String>,
    #[serde(default, rename = "chartData")]
    pub chart_data: Value,
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListData {
    #[serde(default)]
    pub items: Vec<ListItemData>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListItemData {
    Plain(String),
    Entry(ListEntryData),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListEntryData {
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ListEntryData {
    pub fn label(&self) -> Option<&str> {
        first_non_empty(&[&self.label, &self.title])
    }

    pub fn value(&self) -> &str {
        first_non_empty(&[&self.value, &self.text]).unwrap_or("")
    }

    pub fn url(&self) -> Option<&str> {
        first_non_empty(&[&self.url])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HtmlData {
    #[serde(default)]
    pub content: String,
}

/// Display form of a JSON scalar: strings verbatim, `null` empty, everything
/// else in its JSON spelling.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(display_value(&value))
}

fn opt_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(display_value(&other)),
    })
}

fn first_non_empty<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|candidate| candidate.as_deref())
        .find(|value| !value.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_is_unsupported_not_an_error() {
        let section = Section::from_value(json!({"type": "hologram", "data": {}}));
        assert_eq!(
            section.content,
            SectionContent::Unsupported {
                tag: "hologram".into()
            }
        );
        assert_eq!(section.display_priority(), UNRANKED_PRIORITY);
    }

    #[test]
    fn bad_data_shape_is_contained_to_the_section() {
        let payload = Payload::from_value(json!({
            "sections": [
                {"type": "keyvalue", "data": {"items": "not-a-list"}},
                {"type": "text", "title": "Note", "data": {"text": "hello"}}
            ]
        }))
        .unwrap();
        assert_eq!(payload.sections.len(), 2);
        assert!(matches!(
            payload.sections[0].content,
            SectionContent::Malformed {
                kind: SectionType::KeyValue,
                ..
            }
        ));
        assert_eq!(payload.sections[1].title.as_deref(), Some("Note"));
    }

    #[test]
    fn text_prefers_text_then_content() {
        let data: TextData = serde_json::from_value(json!({"content": "fallback"})).unwrap();
        assert_eq!(data.body(), "fallback");
        let data: TextData =
            serde_json::from_value(json!({"text": "", "content": "fallback"})).unwrap();
        assert_eq!(data.body(), "fallback");
        let data: TextData = serde_json::from_value(json!({})).unwrap();
        assert_eq!(data.body(), "");
    }

    #[test]
    fn video_flags_use_named_defaults() {
        let data: VideoData = serde_json::from_value(json!({"src": "clip.mp4"})).unwrap();
        assert_eq!(data.flags(), PlaybackFlags::default());
        let data: VideoData =
            serde_json::from_value(json!({"src": "clip.mp4", "controls": false, "loop": true}))
                .unwrap();
        let flags = data.flags();
        assert!(!flags.controls);
        assert!(flags.looped);
        assert!(!flags.autoplay);
    }

    #[test]
    fn keyvalue_values_accept_numbers() {
        let section = Section::from_value(json!({
            "type": "keyvalue",
            "data": {"items": [{"key": "Humidity", "value": 81}]}
        }));
        let SectionContent::KeyValue(data) = section.content else {
            panic!("expected keyvalue");
        };
        assert_eq!(data.items[0].value, "81");
    }

    #[test]
    fn list_items_mix_strings_and_entries() {
        let data: ListData = serde_json::from_value(json!({
            "items": ["plain", {"title": "Rust", "text": "systems", "url": "https://rust-lang.org"}, 7]
        }))
        .unwrap();
        assert_eq!(data.items[0], ListItemData::Plain("plain".into()));
        let ListItemData::Entry(entry) = &data.items[1] else {
            panic!("expected entry");
        };
        assert_eq!(entry.label(), Some("Rust"));
        assert_eq!(entry.value(), "systems");
        assert_eq!(entry.url(), Some("https://rust-lang.org"));
        assert_eq!(data.items[2], ListItemData::Other(json!(7)));
    }

    #[test]
    fn payload_without_sections_is_empty() {
        assert!(Payload::from_value(json!({})).unwrap().is_empty());
        assert!(matches!(
            Payload::from_value(json!([1, 2])),
            Err(PayloadError::NotAnObject("an array"))
        ));
        assert!(matches!(
            Payload::from_json("{\"sections\": 3}"),
            Err(PayloadError::SectionsNotArray)
        ));
    }

    #[test]
    fn display_priority_follows_visual_hierarchy() {
        let order = [
            SectionType::Image,
            SectionType::KeyValue,
            SectionType::Table,
            SectionType::Text,
            SectionType::List,
            SectionType::Chart,
            SectionType::Html,
        ];
        let priorities: Vec<u8> = order.iter().map(|kind| kind.display_priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
    }
}
