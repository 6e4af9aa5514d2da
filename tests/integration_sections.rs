use serde_json::json;

use aura_hud::hud::render::{
    NodeKeyAllocator, Placeholder, RenderNode, extract_video_id, render_batch, render_section,
};
use aura_hud::hud::section::{Payload, Section, SectionType};

fn section(value: serde_json::Value) -> Section {
    Section::from_value(value)
}

#[test]
fn batch_renders_in_type_priority_order() {
    let sections = vec![
        section(json!({"type": "table", "data": {"headers": ["a"], "rows": [["1"]]}})),
        section(json!({"type": "image", "data": {"url": "https://x/img.png"}})),
        section(json!({"type": "text", "data": {"text": "hello"}})),
    ];
    let mut keys = NodeKeyAllocator::default();
    let rendered = render_batch(&sections, || keys.allocate());
    let types: Vec<_> = rendered.iter().map(|r| r.section_type).collect();
    assert_eq!(
        types,
        vec![
            Some(SectionType::Image),
            Some(SectionType::Table),
            Some(SectionType::Text)
        ]
    );
}

#[test]
fn table_marks_only_the_highlighted_row() {
    let table = section(json!({
        "type": "table",
        "data": {
            "headers": ["name"],
            "rows": [{"name": "A"}, {"name": "B", "_highlight": true}]
        }
    }));
    let mut keys = NodeKeyAllocator::default();
    let RenderNode::Table(node) = render_section(&table, keys.allocate()).node else {
        panic!("expected table node");
    };
    assert_eq!(node.headers, vec!["name"]);
    assert_eq!(node.rows.len(), 2);
    assert!(!node.rows[0].highlighted);
    assert!(node.rows[1].highlighted);
    assert_eq!(node.rows[1].cells, vec!["B"]);
}

#[test]
fn youtube_ids_and_invalid_urls() {
    assert_eq!(
        extract_video_id("https://youtu.be/abc123").as_deref(),
        Some("abc123")
    );
    let mut keys = NodeKeyAllocator::default();

    let short = section(json!({"type": "youtube", "data": {"url": "https://youtu.be/abc123"}}));
    match render_section(&short, keys.allocate()).node {
        RenderNode::Youtube { video_id, .. } => assert_eq!(video_id, "abc123"),
        other => panic!("unexpected {other:?}"),
    }

    let bad = section(json!({"type": "youtube", "data": {"url": "https://example.com/v"}}));
    assert_eq!(
        render_section(&bad, keys.allocate()).node,
        RenderNode::Placeholder(Placeholder::InvalidYoutubeUrl)
    );
}

#[test]
fn one_bad_section_never_blanks_the_batch() {
    let payload = Payload::from_value(json!({
        "sections": [
            {"type": "hologram", "data": {}},
            {"type": "keyvalue", "data": "not an object"},
            {"type": "text", "data": {"text": "still here"}}
        ]
    }))
    .unwrap();
    let mut keys = NodeKeyAllocator::default();
    let rendered = render_batch(&payload.sections, || keys.allocate());
    assert_eq!(rendered.len(), 3);
    assert!(
        rendered
            .iter()
            .any(|r| r.node == RenderNode::Text("still here".to_string()))
    );
    assert!(rendered.iter().any(|r| matches!(
        r.node,
        RenderNode::Placeholder(Placeholder::Unsupported { .. })
    )));
    assert!(rendered.iter().any(|r| matches!(
        r.node,
        RenderNode::Placeholder(Placeholder::Malformed { .. })
    )));
}

#[test]
fn text_is_never_interpreted_as_markup() {
    let text = section(json!({"type": "text", "data": {"text": "<b>bold</b>"}}));
    let mut keys = NodeKeyAllocator::default();
    assert_eq!(
        render_section(&text, keys.allocate()).node,
        RenderNode::Text("<b>bold</b>".to_string())
    );
}
