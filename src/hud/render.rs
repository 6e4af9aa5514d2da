//! Section renderer: a pure mapping from one [`Section`] to a [`RenderNode`].
//!
//! Nodes are terminal-agnostic; `crate::view` lays them out into cells. Every
//! failure mode produces a [`Placeholder`] so a batch always renders.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::chart::{ChartNode, ChartSpec};
use super::section::{
    HIGHLIGHT_KEY, KeyValueData, ListData, ListItemData, PlaybackFlags, Section, SectionContent,
    SectionType, TableData, YoutubeData, display_value,
};

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";

static YOUTUBE_URL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&?#\s/]+)").ok()
});

/// Identity of one rendered node. Deferred work (chart plotting) is keyed to
/// it, so a replaced section invalidates any pending work for its old node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(u64);

impl NodeKey {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct NodeKeyAllocator {
    next: u64,
}

impl NodeKeyAllocator {
    pub fn allocate(&mut self) -> NodeKey {
        self.next += 1;
        NodeKey(self.next)
    }
}

/// One section after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSection {
    pub key: NodeKey,
    pub section_type: Option<SectionType>,
    /// Upper-cased display title.
    pub title: Option<String>,
    pub node: RenderNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Text(String),
    KeyValue(Vec<KeyValueRow>),
    Image {
        source: String,
        alt: String,
        caption: Option<String>,
    },
    Video {
        source: String,
        flags: PlaybackFlags,
    },
    Youtube {
        video_id: String,
        embed_url: String,
    },
    Chart(ChartNode),
    List(Vec<ListNode>),
    Table(TableNode),
    /// Trusted markup, passed through untouched.
    Html(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueRow {
    /// Key with its trailing colon, e.g. `Humidity:`.
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNode {
    pub label: Option<String>,
    pub value: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNode {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Unsupported { tag: String },
    InvalidYoutubeUrl,
    MissingSource { kind: SectionType },
    Malformed { kind: SectionType, reason: String },
    LoadFailed { message: String },
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { .. } => f.write_str("Unsupported content type"),
            Self::InvalidYoutubeUrl => f.write_str("Invalid YouTube URL"),
            Self::MissingSource { kind } => write!(f, "No {} source", kind.tag()),
            Self::Malformed { kind, .. } => write!(f, "Could not display {} section", kind.tag()),
            Self::LoadFailed { message } => f.write_str(message),
        }
    }
}

/// Render one section. Pure apart from the key handed in by the caller.
pub fn render_section(section: &Section, key: NodeKey) -> RenderedSection {
    RenderedSection {
        key,
        section_type: section.section_type(),
        title: section.title.as_ref().map(|title| title.to_uppercase()),
        node: render_content(&section.content, key),
    }
}

/// Indices of `sections` in display order: stable sort by type priority.
pub fn display_order(sections: &[Section]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sections.len()).collect();
    order.sort_by_key(|&index| sections[index].display_priority());
    order
}

/// Render a whole batch in display order, allocating one key per section.
pub fn render_batch(
    sections: &[Section],
    mut next_key: impl FnMut() -> NodeKey,
) -> Vec<RenderedSection> {
    display_order(sections)
        .into_iter()
        .map(|index| render_section(&sections[index], next_key()))
        .collect()
}

fn render_content(content: &SectionContent, key: NodeKey) -> RenderNode {
    match content {
        SectionContent::Text(data) => RenderNode::Text(sanitize_text(data.body())),
        SectionContent::KeyValue(data) => RenderNode::KeyValue(key_value_rows(data)),
        SectionContent::Image(data) => match data.source() {
            Some(source) => RenderNode::Image {
                source: source.to_string(),
                alt: sanitize_text(data.alt()),
                caption: data.caption().map(sanitize_text),
            },
            None => RenderNode::Placeholder(Placeholder::MissingSource {
                kind: SectionType::Image,
            }),
        },
        SectionContent::Video(data) => match data.source() {
            Some(source) => RenderNode::Video {
                source: source.to_string(),
                flags: data.flags(),
            },
            None => RenderNode::Placeholder(Placeholder::MissingSource {
                kind: SectionType::Video,
            }),
        },
        SectionContent::Youtube(data) => match youtube_id(data) {
            Some(video_id) => RenderNode::Youtube {
                embed_url: format!("{YOUTUBE_EMBED_BASE}{video_id}"),
                video_id,
            },
            None => RenderNode::Placeholder(Placeholder::InvalidYoutubeUrl),
        },
        SectionContent::Chart(data) => RenderNode::Chart(ChartNode::pending(key, ChartSpec::from_data(data))),
        SectionContent::List(data) => RenderNode::List(list_nodes(data)),
        SectionContent::Table(data) => RenderNode::Table(table_node(data)),
        SectionContent::Html(data) => RenderNode::Html(data.content.clone()),
        SectionContent::Malformed { kind, reason } => RenderNode::Placeholder(Placeholder::Malformed {
            kind: *kind,
            reason: reason.clone(),
        }),
        SectionContent::Unsupported { tag } => {
            RenderNode::Placeholder(Placeholder::Unsupported { tag: tag.clone() })
        }
        SectionContent::LoadError { message } => RenderNode::Placeholder(Placeholder::LoadFailed {
            message: sanitize_text(message),
        }),
    }
}

/// Escape text for the terminal: control characters other than newline are
/// dropped, tabs become a space.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter_map(|ch| match ch {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            ch if ch.is_control() => None,
            ch => Some(ch),
        })
        .collect()
}

/// Video id from a `youtube.com/watch?v=` or `youtu.be/` URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let pattern = YOUTUBE_URL.as_ref()?;
    pattern
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

fn youtube_id(data: &YoutubeData) -> Option<String> {
    if let Some(id) = data.explicit_id() {
        return Some(id.to_string());
    }
    data.url.as_deref().and_then(extract_video_id)
}

fn key_value_rows(data: &KeyValueData) -> Vec<KeyValueRow> {
    data.items
        .iter()
        .map(|item| KeyValueRow {
            label: format!("{}:", sanitize_text(&item.key)),
            value: sanitize_text(&item.value),
        })
        .collect()
}

fn list_nodes(data: &ListData) -> Vec<ListNode> {
    data.items
        .iter()
        .map(|item| match item {
            ListItemData::Plain(text) => ListNode {
                label: None,
                value: sanitize_text(text),
                url: None,
            },
            ListItemData::Entry(entry) => ListNode {
                label: entry.label().map(sanitize_text),
                value: sanitize_text(entry.value()),
                url: entry.url().map(str::to_string),
            },
            ListItemData::Other(value) => ListNode {
                label: None,
                value: sanitize_text(&display_value(value)),
                url: None,
            },
        })
        .collect()
}

fn table_node(data: &TableData) -> TableNode {
    let headers: Vec<String> = data.headers.iter().map(|h| sanitize_text(h)).collect();
    let rows = data
        .rows
        .iter()
        .map(|row| match row {
            Value::Object(cells) => TableRow {
                cells: data
                    .headers
                    .iter()
                    .map(|header| {
                        cells
                            .get(header)
                            .map(|cell| sanitize_text(&display_value(cell)))
                            .unwrap_or_default()
                    })
                    .collect(),
                highlighted: cells.get(HIGHLIGHT_KEY) == Some(&Value::Bool(true)),
            },
            Value::Array(cells) => TableRow {
                cells: cells
                    .iter()
                    .map(|cell| sanitize_text(&display_value(cell)))
                    .collect(),
                highlighted: false,
            },
            scalar => TableRow {
                cells: vec![sanitize_text(&display_value(scalar))],
                highlighted: false,
            },
        })
        .collect();
    TableNode { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hud::section::Payload;
    use serde_json::json;

    fn render(value: Value) -> RenderNode {
        render_section(&Section::from_value(value), NodeKey(1)).node
    }

    #[test]
    fn youtube_short_url_extracts_id() {
        assert_eq!(extract_video_id("https://youtu.be/abc123"), Some("abc123".into()));
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".into())
        );
        assert_eq!(extract_video_id("https://youtu.be/xyz?t=5"), Some("xyz".into()));
        assert_eq!(extract_video_id("https://vimeo.com/1234"), None);
    }

    #[test]
    fn youtube_prefers_explicit_id_and_embeds() {
        let node = render(json!({
            "type": "youtube",
            "data": {"videoId": "explicit", "url": "https://youtu.be/other"}
        }));
        assert_eq!(
            node,
            RenderNode::Youtube {
                video_id: "explicit".into(),
                embed_url: "https://www.youtube.com/embed/explicit".into(),
            }
        );
    }

    #[test]
    fn youtube_without_id_is_invalid_placeholder() {
        let node = render(json!({"type": "youtube", "data": {"url": "not a link"}}));
        assert_eq!(node, RenderNode::Placeholder(Placeholder::InvalidYoutubeUrl));
        assert_eq!(Placeholder::InvalidYoutubeUrl.to_string(), "Invalid YouTube URL");
    }

    #[test]
    fn text_is_escaped_but_html_is_verbatim() {
        let node = render(json!({"type": "text", "data": {"text": "a\u{1b}[31mred\tb"}}));
        assert_eq!(node, RenderNode::Text("a[31mred b".into()));
        let node = render(json!({"type": "html", "data": {"content": "<b>\u{1b}x</b>"}}));
        assert_eq!(node, RenderNode::Html("<b>\u{1b}x</b>".into()));
    }

    #[test]
    fn keyvalue_rows_keep_order_and_colon() {
        let node = render(json!({
            "type": "keyvalue",
            "data": {"items": [{"key": "B", "value": "2"}, {"key": "A", "value": "1"}]}
        }));
        let RenderNode::KeyValue(rows) = node else {
            panic!("expected keyvalue");
        };
        assert_eq!(rows[0].label, "B:");
        assert_eq!(rows[1].label, "A:");
        assert_eq!(rows[1].value, "1");
    }

    #[test]
    fn table_object_rows_follow_headers_and_highlight() {
        let node = render(json!({
            "type": "table",
            "data": {
                "headers": ["name", "when"],
                "rows": [{"name": "A"}, {"name": "B", "when": 3, "_highlight": true}, ["x", "y"]]
            }
        }));
        let RenderNode::Table(table) = node else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].cells, vec!["A".to_string(), String::new()]);
        assert!(!table.rows[0].highlighted);
        assert_eq!(table.rows[1].cells, vec!["B".to_string(), "3".to_string()]);
        assert!(table.rows[1].highlighted);
        assert_eq!(table.rows[2].cells, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn list_entries_render_label_value_and_link() {
        let node = render(json!({
            "type": "list",
            "data": {"items": ["plain", {"label": "Docs", "value": "read", "url": "https://docs.rs"}]}
        }));
        let RenderNode::List(items) = node else {
            panic!("expected list");
        };
        assert_eq!(items[0].label, None);
        assert_eq!(items[0].value, "plain");
        assert_eq!(items[1].label.as_deref(), Some("Docs"));
        assert_eq!(items[1].url.as_deref(), Some("https://docs.rs"));
    }

    #[test]
    fn image_without_source_is_placeholder_and_alt_defaults() {
        let node = render(json!({"type": "image", "data": {"caption": "x"}}));
        assert!(matches!(
            node,
            RenderNode::Placeholder(Placeholder::MissingSource {
                kind: SectionType::Image
            })
        ));
        let node = render(json!({"type": "image", "data": {"url": "https://img/1.png"}}));
        assert_eq!(
            node,
            RenderNode::Image {
                source: "https://img/1.png".into(),
                alt: "HUD Image".into(),
                caption: None,
            }
        );
    }

    #[test]
    fn unknown_type_renders_unsupported() {
        let node = render(json!({"type": "map", "data": {}}));
        assert_eq!(node.clone(), RenderNode::Placeholder(Placeholder::Unsupported { tag: "map".into() }));
        let RenderNode::Placeholder(placeholder) = node else {
            unreachable!();
        };
        assert_eq!(placeholder.to_string(), "Unsupported content type");
    }

    #[test]
    fn batch_is_ordered_by_type_priority() {
        let payload = Payload::from_value(json!({
            "sections": [
                {"type": "table", "data": {"headers": [], "rows": []}},
                {"type": "html", "data": {"content": ""}},
                {"type": "image", "data": {"url": "u"}},
                {"type": "text", "data": {"text": "t"}}
            ]
        }))
        .unwrap();
        let mut allocator = NodeKeyAllocator::default();
        let rendered = render_batch(&payload.sections, || allocator.allocate());
        let kinds: Vec<_> = rendered.iter().map(|r| r.section_type).collect();
        assert_eq!(
            kinds,
            vec![
                Some(SectionType::Image),
                Some(SectionType::Table),
                Some(SectionType::Text),
                Some(SectionType::Html),
            ]
        );
        let keys: Vec<u64> = rendered.iter().map(|r| r.key.get()).collect();
        assert_eq!(keys, vec![1, 2, 3, 4]);
    }

    #[test]
    fn titles_are_upper_cased() {
        let section = Section::text("x").with_title("Sun Times");
        let rendered = render_section(&section, NodeKey(9));
        assert_eq!(rendered.title.as_deref(), Some("SUN TIMES"));
    }
}
