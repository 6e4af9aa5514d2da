//! The tray: one clickable `[▾ title]` entry per minimized window, in the
//! order the windows were minimized.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};

use super::WindowId;
use crate::ui::{UiFrame, rect_contains, safe_set_string, truncate_to_width};

const MAX_LABEL: usize = 18;

#[derive(Debug, Clone, Copy)]
struct TrayHit {
    id: WindowId,
    rect: Rect,
}

#[derive(Debug, Default)]
pub struct Tray {
    entries: Vec<WindowId>,
    hits: Vec<TrayHit>,
}

impl Tray {
    pub fn push(&mut self, id: WindowId) {
        if !self.contains(id) {
            self.entries.push(id);
        }
    }

    pub fn remove(&mut self, id: WindowId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| *entry != id);
        self.hits.retain(|hit| hit.id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.entries.contains(&id)
    }

    pub fn entries(&self) -> &[WindowId] {
        &self.entries
    }

    /// Most recently minimized window.
    pub fn last(&self) -> Option<WindowId> {
        self.entries.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits.clear();
    }

    /// Forget the click targets of the last render. Called when the tray row
    /// is used for something else.
    pub fn clear_hits(&mut self) {
        self.hits.clear();
    }

    pub fn hit_test(&self, column: u16, row: u16) -> Option<WindowId> {
        self.hits
            .iter()
            .find(|hit| rect_contains(hit.rect, column, row))
            .map(|hit| hit.id)
    }

    /// Draw entries left to right on the first row of `area`, recording hit
    /// rectangles. Entries that do not fit collapse into a `+N` marker which
    /// restores the first hidden window. Returns the first free column.
    pub fn render<F>(&mut self, frame: &mut UiFrame<'_>, area: Rect, label_for: F) -> u16
    where
        F: Fn(WindowId) -> String,
    {
        self.hits.clear();
        if area.width == 0 || area.height == 0 {
            return area.x;
        }
        let style = Style::default()
            .bg(crate::theme::tray_bg())
            .fg(crate::theme::tray_fg())
            .add_modifier(Modifier::BOLD);
        let max_x = area.x.saturating_add(area.width);
        let mut x = area.x;
        let mut hidden_from = None;
        let buffer = frame.buffer_mut();
        for (index, id) in self.entries.iter().copied().enumerate() {
            let label = truncate_to_width(&label_for(id), MAX_LABEL);
            let chunk = format!("[▾ {label}]");
            let width = chunk.chars().count() as u16;
            if x.saturating_add(width) > max_x {
                hidden_from = Some(index);
                break;
            }
            safe_set_string(buffer, area, x, area.y, &chunk, style);
            self.hits.push(TrayHit {
                id,
                rect: Rect {
                    x,
                    y: area.y,
                    width,
                    height: 1,
                },
            });
            x = x.saturating_add(width).saturating_add(1);
        }

        let Some(mut first_hidden) = hidden_from else {
            return x;
        };
        loop {
            let marker = format!("+{}", self.entries.len() - first_hidden);
            let width = marker.chars().count() as u16;
            if x.saturating_add(width) <= max_x {
                safe_set_string(buffer, area, x, area.y, &marker, style);
                self.hits.push(TrayHit {
                    id: self.entries[first_hidden],
                    rect: Rect {
                        x,
                        y: area.y,
                        width,
                        height: 1,
                    },
                });
                return x.saturating_add(width).saturating_add(1);
            }
            // Give up the last visible entry to make room for the marker.
            let Some(last) = self.hits.pop() else {
                return x;
            };
            let blank = " ".repeat(last.rect.width as usize);
            safe_set_string(buffer, area, last.rect.x, area.y, &blank, style);
            x = last.rect.x;
            first_hidden -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;

    #[test]
    fn entries_keep_minimize_order_without_duplicates() {
        let mut tray = Tray::default();
        tray.push(WindowId::new(2));
        tray.push(WindowId::new(1));
        tray.push(WindowId::new(2));
        assert_eq!(tray.entries(), &[WindowId::new(2), WindowId::new(1)]);
        assert_eq!(tray.last(), Some(WindowId::new(1)));
        assert!(tray.remove(WindowId::new(2)));
        assert!(!tray.remove(WindowId::new(2)));
        assert!(!tray.contains(WindowId::new(2)));
    }

    #[test]
    fn render_records_clickable_entries() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 40,
            height: 1,
        };
        let mut buffer = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        let mut tray = Tray::default();
        tray.push(WindowId::new(1));
        tray.push(WindowId::new(2));
        let end = tray.render(&mut frame, area, |id| format!("W{}", id.get()));
        // "[▾ W1]" is 6 columns wide plus a gap.
        assert_eq!(end, 14);
        assert_eq!(tray.hit_test(0, 0), Some(WindowId::new(1)));
        assert_eq!(tray.hit_test(7, 0), Some(WindowId::new(2)));
        assert_eq!(tray.hit_test(6, 0), None);
        assert_eq!(buffer.cell((0, 0)).unwrap().symbol(), "[");
    }

    #[test]
    fn overflow_collapses_into_a_count_marker() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 20,
            height: 1,
        };
        let mut buffer = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        let mut tray = Tray::default();
        for n in 1..=4 {
            tray.push(WindowId::new(n));
        }
        let end = tray.render(&mut frame, area, |id| format!("W{}", id.get()));
        // Three entries fit exactly; the third gives way to "+2".
        assert_eq!(end, 17);
        assert_eq!(tray.hit_test(7, 0), Some(WindowId::new(2)));
        assert_eq!(tray.hit_test(14, 0), Some(WindowId::new(3)));
        assert_eq!(tray.hit_test(16, 0), None);
        assert_eq!(buffer.cell((14, 0)).unwrap().symbol(), "+");
        assert_eq!(buffer.cell((15, 0)).unwrap().symbol(), "2");
        assert_eq!(buffer.cell((16, 0)).unwrap().symbol(), " ");
    }

    #[test]
    fn cleared_hits_stop_matching_until_rendered_again() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 40,
            height: 1,
        };
        let mut buffer = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        let mut tray = Tray::default();
        tray.push(WindowId::new(1));
        tray.render(&mut frame, area, |_| "W".into());
        assert_eq!(tray.hit_test(1, 0), Some(WindowId::new(1)));
        tray.clear_hits();
        assert_eq!(tray.hit_test(1, 0), None);
        assert!(tray.contains(WindowId::new(1)));
    }
}
