//! Interactive application: routes input to the HUD, polls the backend and
//! draws windows, tray and status row.

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use indoc::indoc;
use ratatui::prelude::Rect;
use ratatui::style::{Modifier, Style};

use crate::components::StatusBar;
use crate::debug_log::{DebugLogHandle, take_panic_pending};
use crate::event_loop::ControlFlow;
use crate::hud::section::{KeyValueData, KeyValueItem, Payload, Section, SectionContent};
use crate::hud::{Hud, HudError, HudSource, HudUpdate};
use crate::keybindings::{Action, KeyBindings};
use crate::ui::UiFrame;
use crate::window::EventOutcome;

/// Sample payload covering every section type.
pub const DEMO_PAYLOAD: &str = indoc! {r##"
    {
      "sections": [
        {
          "type": "keyvalue",
          "title": "Weather - Lisbon, PT",
          "data": {
            "items": [
              { "key": "Temperature", "value": "21°C" },
              { "key": "Feels like", "value": "20°C" },
              { "key": "Conditions", "value": "Scattered clouds" },
              { "key": "Humidity", "value": "64%" },
              { "key": "Wind", "value": 3.6 }
            ]
          }
        },
        {
          "type": "image",
          "data": {
            "url": "https://openweathermap.org/img/wn/03d@2x.png",
            "alt": "Scattered clouds"
          }
        },
        {
          "type": "chart",
          "title": "Temperature today",
          "data": {
            "chartType": "line",
            "chartData": {
              "labels": ["06:00", "09:00", "12:00", "15:00", "18:00", "21:00"],
              "datasets": [
                { "label": "°C", "data": [14, 17, 21, 23, 20, 16], "borderColor": "#0ff" }
              ]
            }
          }
        },
        {
          "type": "table",
          "title": "Upcoming",
          "data": {
            "headers": ["Time", "Event"],
            "rows": [
              { "Time": "09:30", "Event": "Standup", "_highlight": true },
              { "Time": "13:00", "Event": "Lunch with Sam" },
              ["16:00", "Review"]
            ]
          }
        },
        {
          "type": "list",
          "title": "Headlines",
          "data": {
            "items": [
              { "label": "Rust", "value": "2024 edition released", "url": "https://blog.rust-lang.org/" },
              "Plain entry"
            ]
          }
        },
        {
          "type": "text",
          "data": { "text": "Ask me anything with / and press Enter. Docs: https://ratatui.rs" }
        }
      ]
    }
"##};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssistantState {
    #[default]
    Idle,
    Processing,
}

impl AssistantState {
    pub fn label(self) -> &'static str {
        match self {
            AssistantState::Idle => "IDLE",
            AssistantState::Processing => "PROCESSING",
        }
    }
}

#[derive(Debug)]
pub struct App {
    hud: Hud,
    keys: KeyBindings,
    status: StatusBar,
    prompt: Option<String>,
    assistant: AssistantState,
    location: Option<String>,
    message: String,
    debug_log: Option<DebugLogHandle>,
}

impl App {
    pub fn new(hud: Hud) -> Self {
        Self {
            hud,
            keys: KeyBindings::default(),
            status: StatusBar::new(),
            prompt: None,
            assistant: AssistantState::Idle,
            location: None,
            message: String::new(),
            debug_log: None,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_debug_log(mut self, handle: DebugLogHandle) -> Self {
        self.debug_log = Some(handle);
        self
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn hud_mut(&mut self) -> &mut Hud {
        &mut self.hud
    }

    pub fn assistant_state(&self) -> AssistantState {
        self.assistant
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_text(&self) -> String {
        if self.message.is_empty() {
            format!("[{}]", self.assistant.label())
        } else {
            format!("{}  [{}]", self.message, self.assistant.label())
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> ControlFlow {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(_) => {
                if let EventOutcome::OpenLink(url) = self.hud.windows_mut().handle_event(event) {
                    self.open_link(&url);
                }
                ControlFlow::Continue
            }
            _ => ControlFlow::Continue,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> ControlFlow {
        if self.keys.matches(Action::Quit, key) {
            return ControlFlow::Quit;
        }
        let Some(prompt) = self.prompt.as_mut() else {
            return match self.keys.action_for_key(key) {
                Some(action) => self.run_action(action),
                None => ControlFlow::Continue,
            };
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                prompt.pop();
            }
            KeyCode::Enter => {
                let query = std::mem::take(prompt);
                self.prompt = None;
                self.submit_query(&query);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => prompt.push(c),
            _ => {}
        }
        ControlFlow::Continue
    }

    pub fn run_action(&mut self, action: Action) -> ControlFlow {
        let windows = self.hud.windows_mut();
        match action {
            Action::Quit => return ControlFlow::Quit,
            Action::CloseFront => {
                if let Some(id) = windows.front_window() {
                    windows.close(id);
                }
            }
            Action::CloseAll => windows.close_all_windows(),
            Action::Minimize => {
                if let Some(id) = windows.front_window() {
                    windows.minimize(id);
                }
            }
            Action::RestoreLast => {
                if let Some(id) = windows.tray().last() {
                    windows.restore(id);
                }
            }
            Action::RaiseNext => {
                windows.raise_next();
            }
            Action::Fetch => self.fetch(),
            Action::Query => self.prompt = Some(String::new()),
            Action::DebugLog => match &self.debug_log {
                Some(handle) => {
                    let payload = handle.snapshot_payload();
                    self.hud.render_content(payload);
                }
                None => self.message = "debug log is not enabled".to_string(),
            },
            Action::Help => {
                let payload = help_payload(&self.keys);
                self.hud.render_content(payload);
            }
        }
        ControlFlow::Continue
    }

    pub fn fetch(&mut self) {
        let source = HudSource::Backend {
            location: self.location.clone(),
        };
        match self.hud.load_data(source) {
            Ok(_) => self.message = "loading HUD data…".to_string(),
            Err(err) => self.report(err),
        }
    }

    fn submit_query(&mut self, query: &str) {
        match self.hud.send_query(query) {
            Ok(()) => {
                self.assistant = AssistantState::Processing;
                self.message = format!("asked: {}", query.trim());
            }
            Err(err) => self.report(err),
        }
    }

    fn report(&mut self, err: HudError) {
        tracing::warn!(error = %err, "request not sent");
        self.message = err.to_string();
    }

    fn open_link(&mut self, url: &str) {
        tracing::debug!(%url, "opening link");
        if let Err(err) = webbrowser::open(url) {
            tracing::warn!(%url, error = %err, "failed to open link");
            self.message = format!("could not open {url}");
        }
    }

    /// Idle work: apply finished backend requests and run deferred plots.
    /// Returns how many updates were applied.
    pub fn tick(&mut self) -> usize {
        let updates = self.hud.poll_backend();
        let applied = updates.len();
        for update in updates {
            self.apply_update(update);
        }
        if self.assistant == AssistantState::Processing && !self.hud.is_answering() {
            self.assistant = AssistantState::Idle;
        }
        if take_panic_pending() {
            self.message = "a worker panicked, press d for details".to_string();
        }
        self.hud.windows_mut().run_deferred_plots();
        applied
    }

    pub fn apply_update(&mut self, update: HudUpdate) {
        self.message = match update {
            HudUpdate::Opened(id) => format!("opened {id}"),
            HudUpdate::LoadFailed { message, .. } => message,
            HudUpdate::Reply(reply) => {
                if reply.has_audio {
                    tracing::debug!(query = %reply.query, "reply carried audio, not played");
                }
                single_line(&reply.response)
            }
            HudUpdate::QueryFailed { message, .. } => message,
        };
    }

    pub fn draw(&mut self, frame: &mut UiFrame<'_>, now: Instant) {
        let area = frame.area();
        if area.width == 0 || area.height == 0 {
            return;
        }
        let viewport = Rect {
            height: area.height - 1,
            ..area
        };
        let status_row = Rect {
            y: area.y + area.height - 1,
            height: 1,
            ..area
        };
        self.hud.windows_mut().set_viewport(viewport);
        self.hud.windows().render(frame, now);

        let row_style = Style::default().bg(crate::theme::tray_bg());
        frame.fill(status_row, row_style);
        let fg = match self.assistant {
            AssistantState::Idle => crate::theme::status_fg(),
            AssistantState::Processing => crate::theme::status_busy_fg(),
        };
        self.status.set_style(row_style.fg(fg));

        if let Some(prompt) = &self.prompt {
            self.hud.windows_mut().hide_tray();
            self.status.set_left(format!("query> {prompt}_"));
            self.status.set_right("Enter to send, Esc to cancel");
            self.status
                .set_style(row_style.fg(crate::theme::accent()).add_modifier(Modifier::BOLD));
            self.status.render(frame, status_row);
            return;
        }

        let used = self.hud.windows_mut().render_tray(frame, status_row);
        let rest = Rect {
            x: used,
            width: status_row.right().saturating_sub(used),
            ..status_row
        };
        self.status.set_left("");
        self.status.set_right(self.status_text());
        self.status.render(frame, rest);
    }
}

/// Key bindings as a key/value window.
pub fn help_payload(keys: &KeyBindings) -> Payload {
    let items = keys
        .help_entries()
        .into_iter()
        .map(|(action, combos)| KeyValueItem {
            key: combos.join(", "),
            value: action.to_string(),
        })
        .chain([
            KeyValueItem {
                key: "drag header".to_string(),
                value: "Move window".to_string(),
            },
            KeyValueItem {
                key: "wheel".to_string(),
                value: "Scroll window".to_string(),
            },
        ])
        .collect();
    Payload::new(vec![
        Section::new(SectionContent::KeyValue(KeyValueData { items })).with_title("Key bindings"),
    ])
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hud::AssistantReply;

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn app() -> App {
        App::new(Hud::default())
    }

    #[test]
    fn demo_payload_parses_into_every_section() {
        let payload = Payload::from_json(DEMO_PAYLOAD).unwrap();
        assert_eq!(payload.sections.len(), 6);
        assert!(payload.sections.iter().all(|s| !matches!(
            s.content,
            SectionContent::Malformed { .. } | SectionContent::Unsupported { .. }
        )));
    }

    #[test]
    fn keys_drive_window_actions() {
        let mut app = app();
        let first = app.hud_mut().render_json(DEMO_PAYLOAD).unwrap();
        let second = app.hud_mut().render_json(DEMO_PAYLOAD).unwrap();
        assert_eq!(app.hud().windows().front_window(), Some(second));

        app.handle_event(&key('m'));
        assert_eq!(app.hud().windows().minimized_windows(), vec![second]);
        app.handle_event(&key('r'));
        assert!(app.hud().windows().minimized_windows().is_empty());

        app.handle_event(&key('x'));
        assert!(app.hud().windows().window(second).is_none());
        assert!(app.hud().windows().window(first).is_some());

        app.handle_event(&Event::Key(KeyEvent::new(
            KeyCode::Char('X'),
            KeyModifiers::SHIFT,
        )));
        assert!(app.hud().windows().is_empty());
    }

    #[test]
    fn ctrl_q_quits_even_while_prompting() {
        let mut app = app();
        app.handle_event(&key('/'));
        assert_eq!(app.prompt(), Some(""));
        let quit = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert_eq!(app.handle_event(&quit), ControlFlow::Quit);
    }

    #[test]
    fn prompt_collects_text_and_reports_missing_backend() {
        let mut app = app();
        app.handle_event(&key('/'));
        for c in "hi!".chars() {
            app.handle_event(&key(c));
        }
        app.handle_event(&Event::Key(KeyEvent::new(
            KeyCode::Backspace,
            KeyModifiers::NONE,
        )));
        assert_eq!(app.prompt(), Some("hi"));
        app.handle_event(&Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert_eq!(app.prompt(), None);
        assert_eq!(app.message(), "no backend configured");
        assert_eq!(app.assistant_state(), AssistantState::Idle);
    }

    #[test]
    fn help_opens_a_key_bindings_window() {
        let mut app = app();
        app.handle_event(&key('?'));
        let id = app.hud().windows().front_window().unwrap();
        let window = app.hud().windows().window(id).unwrap();
        assert_eq!(window.title(), "Key bindings");
    }

    #[test]
    fn reply_text_lands_in_status() {
        let mut app = app();
        app.apply_update(HudUpdate::Reply(AssistantReply {
            query: "weather".into(),
            response: "It is\nsunny.".into(),
            window: None,
            has_audio: false,
        }));
        assert_eq!(app.message(), "It is sunny.");
        assert!(app.status_text().ends_with("[IDLE]"));
    }

    #[test]
    fn draw_puts_status_on_last_row() {
        use ratatui::buffer::Buffer;

        let mut app = app();
        let area = Rect::new(0, 0, 60, 20);
        let mut buffer = Buffer::empty(area);
        app.draw(&mut UiFrame::from_parts(area, &mut buffer), Instant::now());
        assert_eq!(app.hud().windows().viewport().height, 19);
        let last: String = (0..60)
            .map(|x| buffer.cell((x, 19)).map(|c| c.symbol()).unwrap_or(" "))
            .collect();
        assert!(last.trim_end().ends_with("[IDLE]"), "{last:?}");
    }

    #[test]
    fn tray_under_the_prompt_is_not_clickable() {
        use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
        use ratatui::buffer::Buffer;

        let mut app = app();
        let id = app.hud_mut().render_json(DEMO_PAYLOAD).unwrap();
        app.handle_event(&key('m'));
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        app.draw(&mut UiFrame::from_parts(area, &mut buffer), Instant::now());
        assert_eq!(app.hud().windows().tray().hit_test(2, 23), Some(id));

        app.handle_event(&key('/'));
        app.draw(&mut UiFrame::from_parts(area, &mut buffer), Instant::now());
        let click = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 2,
            row: 23,
            modifiers: KeyModifiers::NONE,
        });
        app.handle_event(&click);
        assert_eq!(app.hud().windows().minimized_windows(), vec![id]);
        assert_eq!(app.prompt(), Some(""));
    }
}
