//! URL detection for text sections.
//!
//! A small wrapper around `linkify::LinkFinder` that splits plain text into
//! link and non-link segments so the view can style URLs and record where
//! they land for click handling.

use std::ops::Range;

use linkify::{LinkFinder, LinkKind};
use ratatui::style::{Modifier, Style};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectedLink {
    pub range: Range<usize>,
    pub url: String,
}

#[derive(Debug)]
pub struct Linkifier {
    finder: LinkFinder,
}

impl Default for Linkifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Linkifier {
    pub fn new() -> Self {
        let mut finder = LinkFinder::new();
        finder.kinds(&[LinkKind::Url]);
        finder.url_must_have_scheme(true);
        Self { finder }
    }

    pub fn detect_links(&self, text: &str) -> Vec<DetectedLink> {
        let mut links = Vec::new();
        for span in self.finder.links(text) {
            let start = span.start();
            let url = strip_trailing_punctuation(span.as_str());
            if url.is_empty() {
                continue;
            }
            links.push(DetectedLink {
                range: start..start + url.len(),
                url: url.to_string(),
            });
        }
        links
    }

    /// Split `text` into `(segment, url)` pairs covering the whole input.
    pub fn split(&self, text: &str) -> Vec<(String, Option<String>)> {
        let mut parts = Vec::new();
        let mut last = 0;
        for link in self.detect_links(text) {
            if link.range.start > last {
                parts.push((text[last..link.range.start].to_string(), None));
            }
            parts.push((text[link.range.clone()].to_string(), Some(link.url)));
            last = link.range.end;
        }
        if last < text.len() || parts.is_empty() {
            parts.push((text[last..].to_string(), None));
        }
        parts
    }
}

pub fn link_style(style: Style) -> Style {
    style
        .fg(crate::theme::link())
        .add_modifier(Modifier::UNDERLINED)
}

// linkify keeps sentence punctuation that directly follows a URL.
fn strip_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(['.', ',', '?', '!', ':', ';', ')', ']', '\'', '"'])
}
