use ratatui::prelude::Rect;
use ratatui::style::{Modifier, Style};

use crate::ui::{UiFrame, safe_set_string, truncate_to_width};

const CLOSE_LABEL: &str = "[x]";
const MINIMIZE_LABEL: &str = "[_]";

/// What a pointer-down on a window's chrome means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    Drag,
    Minimize,
    Close,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChromeState {
    pub dragging: bool,
}

pub trait WindowDecorator: std::fmt::Debug {
    fn render_window(&self, frame: &mut UiFrame<'_>, rect: Rect, title: &str, state: ChromeState);

    fn hit_test(&self, rect: Rect, column: u16, row: u16) -> HeaderAction;

    /// Body area left inside the chrome.
    fn inner(&self, rect: Rect) -> Rect;
}

/// Header bar on the top row with title and `[_]` `[x]` controls, single-line
/// border on the remaining sides.
#[derive(Debug, Default)]
pub struct HudDecorator;

impl HudDecorator {
    fn close_x(rect: Rect) -> Option<u16> {
        (rect.width >= 6).then(|| rect.x + rect.width - 4)
    }

    fn minimize_x(rect: Rect) -> Option<u16> {
        (rect.width >= 9).then(|| rect.x + rect.width - 7)
    }
}

impl WindowDecorator for HudDecorator {
    fn render_window(&self, frame: &mut UiFrame<'_>, rect: Rect, title: &str, state: ChromeState) {
        let bounds = rect.intersection(frame.area());
        if bounds.width == 0 || bounds.height == 0 {
            return;
        }
        let header_style = Style::default()
            .bg(crate::theme::header_bg())
            .fg(crate::theme::header_fg())
            .add_modifier(Modifier::BOLD);
        let button_style = Style::default()
            .bg(crate::theme::header_bg())
            .fg(crate::theme::header_button_fg());
        let border_color = if state.dragging {
            crate::theme::border_dragging()
        } else {
            crate::theme::border()
        };
        let border_style = Style::default()
            .fg(border_color)
            .bg(crate::theme::window_bg());

        let left = rect.x;
        let right = rect.x.saturating_add(rect.width).saturating_sub(1);
        let top = rect.y;
        let bottom = rect.y.saturating_add(rect.height).saturating_sub(1);
        let buffer = frame.buffer_mut();

        for x in left..=right {
            if let Some(cell) = buffer.cell_mut((x, top))
                && bounds.x <= x
                && x < bounds.x + bounds.width
            {
                cell.set_symbol(" ");
                cell.set_style(header_style);
            }
        }
        let title_end = Self::minimize_x(rect)
            .or(Self::close_x(rect))
            .unwrap_or(right)
            .saturating_sub(1);
        let title_width = title_end.saturating_sub(left + 2) as usize;
        let title = truncate_to_width(title, title_width);
        safe_set_string(buffer, bounds, left + 2, top, &title, header_style);
        if let Some(x) = Self::minimize_x(rect) {
            safe_set_string(buffer, bounds, x, top, MINIMIZE_LABEL, button_style);
        }
        if let Some(x) = Self::close_x(rect) {
            safe_set_string(buffer, bounds, x, top, CLOSE_LABEL, button_style);
        }

        if bottom > top {
            for x in left..=right {
                let symbol = if x == left {
                    "└"
                } else if x == right {
                    "┘"
                } else {
                    "─"
                };
                safe_set_string(buffer, bounds, x, bottom, symbol, border_style);
            }
        }
        for y in top.saturating_add(1)..bottom {
            safe_set_string(buffer, bounds, left, y, "│", border_style);
            if right > left {
                safe_set_string(buffer, bounds, right, y, "│", border_style);
            }
        }
    }

    fn hit_test(&self, rect: Rect, column: u16, row: u16) -> HeaderAction {
        if row != rect.y || column < rect.x || column >= rect.x.saturating_add(rect.width) {
            return HeaderAction::None;
        }
        let within = |start: Option<u16>| {
            start.is_some_and(|start| column >= start && column < start + 3)
        };
        if within(Self::close_x(rect)) {
            HeaderAction::Close
        } else if within(Self::minimize_x(rect)) {
            HeaderAction::Minimize
        } else {
            HeaderAction::Drag
        }
    }

    fn inner(&self, rect: Rect) -> Rect {
        Rect {
            x: rect.x.saturating_add(1),
            y: rect.y.saturating_add(1),
            width: rect.width.saturating_sub(2),
            height: rect.height.saturating_sub(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;

    fn rect() -> Rect {
        Rect {
            x: 2,
            y: 1,
            width: 20,
            height: 6,
        }
    }

    #[test]
    fn header_hit_test_finds_controls() {
        let decorator = HudDecorator;
        let r = rect();
        // close spans columns 18..21, minimize 15..18
        assert_eq!(decorator.hit_test(r, 18, 1), HeaderAction::Close);
        assert_eq!(decorator.hit_test(r, 20, 1), HeaderAction::Close);
        assert_eq!(decorator.hit_test(r, 15, 1), HeaderAction::Minimize);
        assert_eq!(decorator.hit_test(r, 5, 1), HeaderAction::Drag);
        assert_eq!(decorator.hit_test(r, 21, 1), HeaderAction::Drag);
        assert_eq!(decorator.hit_test(r, 5, 2), HeaderAction::None);
        assert_eq!(decorator.hit_test(r, 30, 1), HeaderAction::None);
    }

    #[test]
    fn renders_title_controls_and_border() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 30,
            height: 10,
        };
        let mut buffer = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        HudDecorator.render_window(&mut frame, rect(), "Weather", ChromeState::default());
        assert_eq!(buffer.cell((4, 1)).unwrap().symbol(), "W");
        assert_eq!(buffer.cell((18, 1)).unwrap().symbol(), "[");
        assert_eq!(buffer.cell((19, 1)).unwrap().symbol(), "x");
        assert_eq!(buffer.cell((16, 1)).unwrap().symbol(), "_");
        assert_eq!(buffer.cell((2, 6)).unwrap().symbol(), "└");
        assert_eq!(buffer.cell((21, 3)).unwrap().symbol(), "│");
    }

    #[test]
    fn inner_excludes_chrome() {
        assert_eq!(
            HudDecorator.inner(rect()),
            Rect {
                x: 3,
                y: 2,
                width: 18,
                height: 4,
            }
        );
    }
}
