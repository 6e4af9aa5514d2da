pub mod decorator;
pub mod tray;

mod window_manager;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ratatui::prelude::Rect;

use crate::hud::render::RenderedSection;
use crate::hud::section::Section;

pub use window_manager::{EventOutcome, WindowManager};

/// How long a new window takes to fade from transparent to opaque.
pub const FADE_IN: Duration = Duration::from_millis(300);

/// Window identity. Allocated from a per-manager counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hud-window-{}", self.0)
    }
}

/// Top-left corner in screen cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub position: Position,
    pub size: Size,
}

impl Geometry {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.position.x,
            y: self.position.y,
            width: self.size.width,
            height: self.size.height,
        }
    }
}

/// Size limits a window's natural content size is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min_width: u16,
    pub max_width: u16,
    pub min_height: u16,
    pub max_height: u16,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min_width: 28,
            max_width: 64,
            min_height: 5,
            max_height: 22,
        }
    }
}

impl SizeBounds {
    /// Per-window options layered over these bounds.
    pub fn with_options(self, options: &WindowOptions) -> Self {
        let min_width = options.min_width.unwrap_or(self.min_width);
        let min_height = options.min_height.unwrap_or(self.min_height);
        Self {
            min_width,
            max_width: options.max_width.unwrap_or(self.max_width).max(min_width),
            min_height,
            max_height: options.max_height.unwrap_or(self.max_height).max(min_height),
        }
    }

    pub fn clamp(&self, size: Size) -> Size {
        Size {
            width: size
                .width
                .max(self.min_width)
                .min(self.max_width.max(self.min_width)),
            height: size
                .height
                .max(self.min_height)
                .min(self.max_height.max(self.min_height)),
        }
    }
}

/// Optional creation parameters; unset fields fall back to the manager's
/// defaults and computed spawn position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowOptions {
    pub min_width: Option<u16>,
    pub max_width: Option<u16>,
    pub min_height: Option<u16>,
    pub max_height: Option<u16>,
    pub x: Option<u16>,
    pub y: Option<u16>,
}

impl WindowOptions {
    pub fn at(x: u16, y: u16) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragState {
    pub dragging: bool,
    /// Pointer offset from the window's top-left at drag start.
    pub grab_offset: (i32, i32),
}

/// Shared flag telling deferred work whether its window still exists.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    fn revoke(&self) {
        self.0.set(false);
    }
}

#[derive(Debug)]
pub struct Window {
    id: WindowId,
    title: String,
    geometry: Geometry,
    bounds: SizeBounds,
    z_index: u64,
    minimized: bool,
    saved_geometry: Option<Geometry>,
    drag: DragState,
    sections: Vec<Section>,
    rendered: Vec<RenderedSection>,
    /// Section index behind each entry of `rendered`.
    order: Vec<usize>,
    scroll: u16,
    content_height: u16,
    liveness: Liveness,
    created_at: Instant,
}

impl Window {
    fn new(id: WindowId, title: String, bounds: SizeBounds, z_index: u64) -> Self {
        Self {
            id,
            title,
            geometry: Geometry::default(),
            bounds,
            z_index,
            minimized: false,
            saved_geometry: None,
            drag: DragState::default(),
            sections: Vec::new(),
            rendered: Vec::new(),
            order: Vec::new(),
            scroll: 0,
            content_height: 0,
            liveness: Liveness::new(),
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn position(&self) -> Position {
        self.geometry.position
    }

    pub fn size(&self) -> Size {
        self.geometry.size
    }

    pub fn rect(&self) -> Rect {
        self.geometry.rect()
    }

    pub fn bounds(&self) -> SizeBounds {
        self.bounds
    }

    pub fn z_index(&self) -> u64 {
        self.z_index
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.dragging
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Rendered sections in display order.
    pub fn rendered(&self) -> &[RenderedSection] {
        &self.rendered
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Fade-in progress in `0.0..=1.0`. Purely visual.
    pub fn opacity(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.created_at);
        (elapsed.as_secs_f32() / FADE_IN.as_secs_f32()).min(1.0)
    }

    fn minimize(&mut self) {
        self.saved_geometry = Some(self.geometry);
        self.drag = DragState::default();
        self.minimized = true;
    }

    fn restore(&mut self) {
        if let Some(saved) = self.saved_geometry.take() {
            self.geometry.position = saved.position;
        }
        self.minimized = false;
    }

    fn begin_drag(&mut self, pointer: (u16, u16)) {
        self.drag = DragState {
            dragging: true,
            grab_offset: (
                pointer.0 as i32 - self.geometry.position.x as i32,
                pointer.1 as i32 - self.geometry.position.y as i32,
            ),
        };
    }

    fn end_drag(&mut self) {
        self.drag.dragging = false;
    }

    fn close(&mut self) {
        self.end_drag();
        self.liveness.revoke();
    }

    fn set_scroll(&mut self, scroll: u16) {
        let visible = self.geometry.size.height.saturating_sub(2);
        let max_scroll = self.content_height.saturating_sub(visible);
        self.scroll = scroll.min(max_scroll);
    }
}

/// Clamp a top-left candidate so a window of `size` stays fully inside
/// `viewport`. Windows larger than the viewport pin to its origin.
pub fn clamp_to_viewport(x: i32, y: i32, size: Size, viewport: Rect) -> Position {
    let min_x = viewport.x as i32;
    let min_y = viewport.y as i32;
    let max_x = (min_x + viewport.width as i32 - size.width as i32).max(min_x);
    let max_y = (min_y + viewport.height as i32 - size.height as i32).max(min_y);
    Position {
        x: x.clamp(min_x, max_x) as u16,
        y: y.clamp(min_y, max_y) as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 24,
        }
    }

    #[test]
    fn clamp_keeps_window_inside_viewport() {
        let size = Size {
            width: 20,
            height: 10,
        };
        assert_eq!(
            clamp_to_viewport(-5, -5, size, viewport()),
            Position { x: 0, y: 0 }
        );
        assert_eq!(
            clamp_to_viewport(100, 100, size, viewport()),
            Position { x: 60, y: 14 }
        );
        assert_eq!(
            clamp_to_viewport(10, 3, size, viewport()),
            Position { x: 10, y: 3 }
        );
    }

    #[test]
    fn oversized_window_pins_to_origin() {
        let size = Size {
            width: 200,
            height: 50,
        };
        assert_eq!(
            clamp_to_viewport(40, 40, size, viewport()),
            Position { x: 0, y: 0 }
        );
    }

    #[test]
    fn bounds_clamp_natural_size() {
        let bounds = SizeBounds::default();
        let tiny = bounds.clamp(Size {
            width: 3,
            height: 1,
        });
        assert_eq!(tiny, Size { width: 28, height: 5 });
        let huge = bounds.clamp(Size {
            width: 500,
            height: 500,
        });
        assert_eq!(huge, Size { width: 64, height: 22 });
    }

    #[test]
    fn options_never_invert_bounds() {
        let bounds = SizeBounds::default().with_options(&WindowOptions {
            min_width: Some(70),
            ..WindowOptions::default()
        });
        assert_eq!(bounds.min_width, 70);
        assert_eq!(bounds.max_width, 70);
    }

    #[test]
    fn minimize_saves_geometry_and_drops_drag() {
        let mut window = Window::new(WindowId::new(1), "t".into(), SizeBounds::default(), 1);
        window.geometry.position = Position { x: 7, y: 4 };
        window.begin_drag((9, 4));
        assert_eq!(window.drag_state().grab_offset, (2, 0));
        window.minimize();
        assert!(!window.is_dragging());
        window.geometry.position = Position { x: 0, y: 0 };
        window.restore();
        assert_eq!(window.position(), Position { x: 7, y: 4 });
    }

    #[test]
    fn liveness_is_shared_and_revoked_on_close() {
        let mut window = Window::new(WindowId::new(2), "t".into(), SizeBounds::default(), 1);
        let flag = window.liveness().clone();
        assert!(flag.is_alive());
        window.close();
        assert!(!flag.is_alive());
    }

    #[test]
    fn opacity_ramps_to_one() {
        let window = Window::new(WindowId::new(3), "t".into(), SizeBounds::default(), 1);
        assert!(window.opacity(window.created_at) < 0.01);
        assert_eq!(window.opacity(window.created_at + FADE_IN * 2), 1.0);
    }

    #[test]
    fn window_id_displays_with_prefix() {
        assert_eq!(WindowId::new(4).to_string(), "hud-window-4");
    }
}
