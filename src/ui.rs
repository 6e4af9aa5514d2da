//! UiFrame: a thin wrapper around `ratatui::Frame` that clamps drawing to the
//! visible area and centralizes clipping logic.
//!
//! Windows may be dragged flush against the viewport edges and their bodies
//! are rendered offscreen at full content height, so every draw call and
//! every blit goes through a clip against the frame area. Writing outside the
//! `Buffer` would otherwise panic.
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;

/// Wrapper around `ratatui::Frame` that clamps drawing to the visible area.
///
/// Window chrome, bodies and the tray render through this type so any
/// rectangle that drifts outside the buffer is clipped.
pub struct UiFrame<'a> {
    area: Rect,
    buffer: &'a mut Buffer,
}

impl<'a> UiFrame<'a> {
    pub fn new(frame: &'a mut Frame<'_>) -> Self {
        let area = frame.area();
        let buffer = frame.buffer_mut();
        Self { area, buffer }
    }

    /// Construct a `UiFrame` directly from an area and buffer.
    ///
    /// Also used for offscreen window bodies, which are drawn at full content
    /// height before the visible rows are blitted into place.
    pub(crate) fn from_parts(area: Rect, buffer: &'a mut Buffer) -> Self {
        Self { area, buffer }
    }

    /// Draw into a standalone buffer covering its whole area.
    pub fn from_buffer(buffer: &'a mut Buffer) -> Self {
        let area = buffer.area;
        Self { area, buffer }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.buffer
    }

    fn clip_rect(&self, rect: Rect) -> Option<Rect> {
        let clipped = rect.intersection(self.area);
        if clipped.width == 0 || clipped.height == 0 {
            None
        } else {
            Some(clipped)
        }
    }

    pub fn render_widget<W>(&mut self, widget: W, area: Rect)
    where
        W: Widget,
    {
        if let Some(clipped) = self.clip_rect(area) {
            widget.render(clipped, self.buffer);
        }
    }

    /// Copy `dest.height` rows of `src`, starting at row `src_y` of `src`'s
    /// area, onto `dest`. Used to show a scrolled window body.
    pub fn blit_scrolled(&mut self, src: &Buffer, src_y: u16, dest: Rect) {
        let Some(clipped) = self.clip_rect(dest) else {
            return;
        };
        let src_area = src.area;
        for y in clipped.y..clipped.y.saturating_add(clipped.height) {
            let sy = src_area.y + src_y + (y - dest.y);
            for x in clipped.x..clipped.x.saturating_add(clipped.width) {
                let sx = src_area.x + (x - dest.x);
                if let (Some(src_cell), Some(dst_cell)) =
                    (src.cell((sx, sy)), self.buffer.cell_mut((x, y)))
                {
                    *dst_cell = src_cell.clone();
                }
            }
        }
    }

    /// Add `modifier` to every visible cell of `area`.
    pub fn add_modifier(&mut self, area: Rect, modifier: Modifier) {
        let Some(clipped) = self.clip_rect(area) else {
            return;
        };
        for y in clipped.y..clipped.y.saturating_add(clipped.height) {
            for x in clipped.x..clipped.x.saturating_add(clipped.width) {
                if let Some(cell) = self.buffer.cell_mut((x, y)) {
                    cell.modifier.insert(modifier);
                }
            }
        }
    }

    /// Paint `area` with blanks in `style`.
    pub fn fill(&mut self, area: Rect, style: Style) {
        let Some(clipped) = self.clip_rect(area) else {
            return;
        };
        for y in clipped.y..clipped.y.saturating_add(clipped.height) {
            for x in clipped.x..clipped.x.saturating_add(clipped.width) {
                if let Some(cell) = self.buffer.cell_mut((x, y)) {
                    cell.reset();
                    cell.set_style(style);
                }
            }
        }
    }
}

pub(crate) fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

pub(crate) fn safe_set_string(
    buffer: &mut Buffer,
    bounds: Rect,
    x: u16,
    y: u16,
    text: &str,
    style: Style,
) {
    if bounds.width == 0 || bounds.height == 0 {
        return;
    }
    let max_x = bounds.x.saturating_add(bounds.width);
    let max_y = bounds.y.saturating_add(bounds.height);
    if x < bounds.x || x >= max_x || y < bounds.y || y >= max_y {
        return;
    }
    let available = max_x.saturating_sub(x);
    if available == 0 {
        return;
    }
    let text = truncate_to_width(text, available as usize);
    buffer.set_string(x, y, text, style);
}

pub(crate) fn truncate_to_width(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    value.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;
    use ratatui::layout::Rect;
    use ratatui::style::Style;

    fn filled(area: Rect, symbol: &str) -> Buffer {
        let mut buffer = Buffer::empty(area);
        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                if let Some(cell) = buffer.cell_mut((x, y)) {
                    cell.set_symbol(symbol);
                }
            }
        }
        buffer
    }

    #[test]
    fn blit_scrolled_skips_rows_above_offset() {
        let frame_area = Rect::new(0, 0, 6, 4);
        let mut dest = Buffer::empty(frame_area);
        let mut frame = UiFrame::from_parts(frame_area, &mut dest);
        let mut src = Buffer::empty(Rect::new(0, 0, 3, 5));
        for row in 0..5u16 {
            let digit = row.to_string();
            for col in 0..3u16 {
                if let Some(cell) = src.cell_mut((col, row)) {
                    cell.set_symbol(&digit);
                }
            }
        }
        frame.blit_scrolled(&src, 2, Rect::new(1, 1, 3, 2));
        assert_eq!(dest.cell((1, 1)).unwrap().symbol(), "2");
        assert_eq!(dest.cell((3, 2)).unwrap().symbol(), "3");
        assert_eq!(dest.cell((1, 3)).unwrap().symbol(), " ");
        assert_eq!(dest.cell((0, 1)).unwrap().symbol(), " ");
    }

    #[test]
    fn blit_scrolled_clips_to_frame() {
        let frame_area = Rect::new(0, 0, 4, 2);
        let mut dest = Buffer::empty(frame_area);
        let mut frame = UiFrame::from_parts(frame_area, &mut dest);
        let src = filled(Rect::new(0, 0, 5, 5), "#");
        frame.blit_scrolled(&src, 0, Rect::new(2, 1, 5, 5));
        assert_eq!(dest.cell((3, 1)).unwrap().symbol(), "#");
        assert_eq!(dest.cell((1, 1)).unwrap().symbol(), " ");
        assert_eq!(dest.cell((2, 0)).unwrap().symbol(), " ");
    }

    #[test]
    fn add_modifier_and_fill_stay_inside_area() {
        let area = Rect::new(0, 0, 4, 2);
        let mut buffer = filled(area, "a");
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        frame.add_modifier(Rect::new(2, 0, 10, 1), Modifier::DIM);
        frame.fill(Rect::new(0, 1, 1, 1), Style::default());
        assert!(buffer.cell((3, 0)).unwrap().modifier.contains(Modifier::DIM));
        assert!(!buffer.cell((1, 0)).unwrap().modifier.contains(Modifier::DIM));
        assert_eq!(buffer.cell((0, 1)).unwrap().symbol(), " ");
        assert_eq!(buffer.cell((1, 1)).unwrap().symbol(), "a");
    }

    #[test]
    fn rect_contains_is_half_open() {
        let rect = Rect::new(2, 2, 3, 1);
        assert!(rect_contains(rect, 2, 2));
        assert!(rect_contains(rect, 4, 2));
        assert!(!rect_contains(rect, 5, 2));
        assert!(!rect_contains(rect, 2, 3));
    }

    #[test]
    fn truncate_to_width_short_and_long() {
        assert_eq!(truncate_to_width("abc", 5), "abc");
        assert_eq!(truncate_to_width("abcdef", 3), "abc");
    }

    #[test]
    fn safe_set_string_writes_within_bounds() {
        let bounds = Rect::new(0, 0, 10, 2);
        let mut buf = Buffer::empty(bounds);
        safe_set_string(&mut buf, bounds, 1, 0, "hello", Style::default());
        assert_eq!(buf.cell((1, 0)).unwrap().symbol(), "h");
        safe_set_string(&mut buf, bounds, 8, 1, "clipped", Style::default());
        assert_eq!(buf.cell((9, 1)).unwrap().symbol(), "l");
        // outside bounds should be ignored (no panic)
        safe_set_string(&mut buf, bounds, 100, 0, "x", Style::default());
    }

    #[test]
    fn render_widget_clips_to_frame_area() {
        let area = Rect::new(0, 0, 5, 3);
        let mut buf = Buffer::empty(area);
        let mut ui = UiFrame::from_parts(area, &mut buf);

        struct FillWidget;
        impl Widget for FillWidget {
            fn render(self, area: Rect, buf: &mut Buffer) {
                for y in area.y..area.y.saturating_add(area.height) {
                    for x in area.x..area.x.saturating_add(area.width) {
                        if let Some(cell) = buf.cell_mut((x, y)) {
                            cell.set_symbol("A");
                        }
                    }
                }
            }
        }

        // Request an area that partially lies outside the right edge.
        ui.render_widget(FillWidget, Rect::new(3, 1, 5, 2));
        assert_eq!(buf.cell((3, 1)).unwrap().symbol(), "A");
        assert_eq!(buf.cell((2, 1)).unwrap().symbol(), " ");
    }
}
