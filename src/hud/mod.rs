//! HUD facade: the entry point backend responses go through.
//!
//! Every payload opens a new window. The facade derives the window title,
//! hands the sections to the [`WindowManager`], and in fetch-driven mode
//! turns backend replies into windows or a single error panel.

pub mod chart;
pub mod render;
pub mod section;

use thiserror::Error;

use crate::backend::{BackendError, BackendReply, BackendRequest, BackendWorker};
use crate::window::{WindowId, WindowManager, WindowOptions};
use section::{Payload, PayloadError, Section};

pub const DEFAULT_TITLE: &str = "AURA HUD";
pub const LOAD_FAILED: &str = "Failed to load HUD data";

/// Keyword (matched case-insensitively inside the first section's title) to
/// window title. First match wins.
const TITLE_KEYWORDS: &[(&str, &str)] = &[
    ("weather", "Weather"),
    ("conditions", "Weather"),
    ("forecast", "Weather"),
    ("to-do", "To-Do List"),
    ("todo", "To-Do List"),
    ("task", "To-Do List"),
    ("calendar", "Calendar"),
    ("event", "Calendar"),
    ("search", "Search Results"),
    ("date & time", "Date & Time"),
    ("time", "Date & Time"),
];

#[derive(Debug, Error)]
pub enum HudError {
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no backend configured")]
    NoBackend,
    #[error("query is empty")]
    EmptyQuery,
}

/// Where [`Hud::load_data`] gets its sections from.
#[derive(Debug, Clone, PartialEq)]
pub enum HudSource {
    Inline(Payload),
    Backend { location: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub query: String,
    pub response: String,
    /// Window opened for the reply's sections, if it carried any.
    pub window: Option<WindowId>,
    pub has_audio: bool,
}

/// Outcome of a finished backend request.
#[derive(Debug, Clone, PartialEq)]
pub enum HudUpdate {
    Opened(WindowId),
    LoadFailed { window: WindowId, message: String },
    Reply(AssistantReply),
    QueryFailed { query: String, message: String },
}

#[derive(Debug, Default)]
pub struct Hud {
    windows: WindowManager,
    backend: Option<BackendWorker>,
}

impl Hud {
    pub fn new(windows: WindowManager) -> Self {
        Self {
            windows,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: BackendWorker) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut WindowManager {
        &mut self.windows
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|backend| backend.in_flight() > 0)
    }

    /// A query has been sent and its answer has not arrived yet.
    pub fn is_answering(&self) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|backend| backend.queries_in_flight() > 0)
    }

    /// Open a new window for `payload`.
    pub fn render_content(&mut self, payload: Payload) -> WindowId {
        let title = derive_title(&payload.sections);
        self.windows
            .create(title, payload.sections, WindowOptions::default())
    }

    pub fn render_json(&mut self, text: &str) -> Result<WindowId, HudError> {
        let payload = Payload::from_json(text)?;
        Ok(self.render_content(payload))
    }

    /// Open the single-section error panel used when a fetch fails.
    pub fn show_error(&mut self, detail: &str) -> WindowId {
        let message = if detail.is_empty() {
            LOAD_FAILED.to_string()
        } else {
            format!("{LOAD_FAILED}: {detail}")
        };
        self.windows.create(
            DEFAULT_TITLE,
            vec![Section::load_error(message)],
            WindowOptions::default(),
        )
    }

    /// Render an inline payload now, or ask the backend for one. Backend
    /// results arrive through [`Hud::poll_backend`].
    pub fn load_data(&mut self, source: HudSource) -> Result<Option<WindowId>, HudError> {
        match source {
            HudSource::Inline(payload) => Ok(Some(self.render_content(payload))),
            HudSource::Backend { location } => {
                let backend = self.backend.as_mut().ok_or(HudError::NoBackend)?;
                backend.submit(BackendRequest::HudData { location });
                Ok(None)
            }
        }
    }

    pub fn send_query(&mut self, query: &str) -> Result<(), HudError> {
        let query = query.trim();
        if query.is_empty() {
            tracing::warn!("ignoring empty query");
            return Err(HudError::EmptyQuery);
        }
        let backend = self.backend.as_mut().ok_or(HudError::NoBackend)?;
        backend.submit(BackendRequest::Generate {
            query: query.to_string(),
        });
        Ok(())
    }

    /// Drain finished backend requests and apply them.
    pub fn poll_backend(&mut self) -> Vec<HudUpdate> {
        let mut replies = Vec::new();
        if let Some(backend) = self.backend.as_mut() {
            while let Some(reply) = backend.try_recv() {
                replies.push(reply);
            }
        }
        replies
            .into_iter()
            .map(|reply| self.apply_reply(reply))
            .collect()
    }

    pub fn apply_reply(&mut self, reply: BackendReply) -> HudUpdate {
        match reply {
            BackendReply::HudData(Ok(payload)) => HudUpdate::Opened(self.render_content(payload)),
            BackendReply::HudData(Err(err)) => {
                tracing::error!(error = %err, "error loading HUD data");
                let message = err.to_string();
                let window = self.show_error(&message);
                HudUpdate::LoadFailed { window, message }
            }
            BackendReply::Generate {
                query,
                result: Ok(response),
            } => {
                let sections = response.sections();
                let window =
                    (!sections.is_empty()).then(|| self.render_content(Payload::new(sections)));
                HudUpdate::Reply(AssistantReply {
                    query,
                    has_audio: response.has_audio(),
                    response: response.response,
                    window,
                })
            }
            BackendReply::Generate {
                query,
                result: Err(err),
            } => {
                tracing::error!(error = %err, %query, "query failed");
                HudUpdate::QueryFailed {
                    query,
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Window title for a batch of sections: a keyword match on the first
/// section's title, else that title verbatim, else [`DEFAULT_TITLE`].
pub fn derive_title(sections: &[Section]) -> String {
    let Some(title) = sections
        .first()
        .and_then(|section| section.title.as_deref())
        .map(str::trim)
        .filter(|title| !title.is_empty())
    else {
        return DEFAULT_TITLE.to_string();
    };
    let lowered = title.to_lowercase();
    TITLE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hud::section::SectionContent;

    fn titled(title: &str) -> Section {
        Section::text("x").with_title(title)
    }

    #[test]
    fn title_keywords_map_to_labels() {
        assert_eq!(derive_title(&[titled("Weather - London, GB")]), "Weather");
        assert_eq!(derive_title(&[titled("My To-Do items")]), "To-Do List");
        assert_eq!(derive_title(&[titled("Upcoming Events")]), "Calendar");
        assert_eq!(derive_title(&[titled("Search: rust")]), "Search Results");
    }

    #[test]
    fn title_falls_back_to_explicit_then_default() {
        assert_eq!(derive_title(&[titled("Stock Prices")]), "Stock Prices");
        assert_eq!(derive_title(&[Section::text("x")]), DEFAULT_TITLE);
        assert_eq!(derive_title(&[titled("   ")]), DEFAULT_TITLE);
        assert_eq!(derive_title(&[]), DEFAULT_TITLE);
    }

    #[test]
    fn only_first_section_is_consulted() {
        let sections = vec![Section::text("x"), titled("Weather")];
        assert_eq!(derive_title(&sections), DEFAULT_TITLE);
    }

    #[test]
    fn each_render_opens_a_new_window() {
        let mut hud = Hud::default();
        let first = hud.render_content(Payload::new(vec![titled("Weather")]));
        let second = hud.render_content(Payload::new(vec![titled("Weather")]));
        assert_ne!(first, second);
        assert_eq!(hud.windows().len(), 2);
        assert_eq!(hud.windows().window(first).unwrap().title(), "Weather");
    }

    #[test]
    fn error_panel_has_a_single_section() {
        let mut hud = Hud::default();
        let id = hud.show_error("connection refused");
        let window = hud.windows().window(id).unwrap();
        assert_eq!(window.title(), DEFAULT_TITLE);
        assert_eq!(window.sections().len(), 1);
        match &window.sections()[0].content {
            SectionContent::LoadError { message } => {
                assert_eq!(message, "Failed to load HUD data: connection refused");
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn backend_operations_require_a_backend() {
        let mut hud = Hud::default();
        assert!(matches!(
            hud.load_data(HudSource::Backend { location: None }),
            Err(HudError::NoBackend)
        ));
        assert!(matches!(hud.send_query("  "), Err(HudError::EmptyQuery)));
        assert!(matches!(hud.send_query("hi"), Err(HudError::NoBackend)));
        assert!(hud.poll_backend().is_empty());
        assert!(!hud.is_busy());
    }

    #[test]
    fn inline_source_renders_immediately() {
        let mut hud = Hud::default();
        let id = hud
            .load_data(HudSource::Inline(Payload::new(vec![titled("Calendar")])))
            .unwrap();
        assert_eq!(hud.windows().window(id.unwrap()).unwrap().title(), "Calendar");
    }
}
