use ratatui::layout::Rect;
use ratatui::style::Style;

use crate::ui::{UiFrame, safe_set_string, truncate_to_width};

/// One-row bar: left text (the query prompt) and right-aligned status.
#[derive(Debug, Default)]
pub struct StatusBar {
    left: String,
    right: String,
    style: Style,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_left<T: Into<String>>(&mut self, value: T) {
        self.left = value.into();
    }

    pub fn set_right<T: Into<String>>(&mut self, value: T) {
        self.right = value.into();
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub fn render(&self, frame: &mut UiFrame<'_>, area: Rect) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let bounds = area.intersection(frame.area());
        if bounds.width == 0 || bounds.height == 0 {
            return;
        }
        let width = area.width as usize;
        let buffer = frame.buffer_mut();

        let left = truncate_to_width(&self.left, width);
        let left_width = left.chars().count();
        safe_set_string(buffer, bounds, area.x, area.y, &left, self.style);

        if self.right.is_empty() {
            return;
        }
        let room = width.saturating_sub(left_width);
        if room == 0 {
            return;
        }
        let right = truncate_to_width(&self.right, room);
        let start_x = area.x.saturating_add((width - right.chars().count()) as u16);
        safe_set_string(buffer, bounds, start_x, area.y, &right, self.style);
    }
}
