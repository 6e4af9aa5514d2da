use std::collections::BTreeMap;
use std::time::Instant;

use crossterm::event::{Event, MouseButton, MouseEventKind};
use ratatui::prelude::Rect;

use super::decorator::{HeaderAction, HudDecorator, WindowDecorator};
use super::tray::Tray;
use super::{Liveness, Size, SizeBounds, Window, WindowId, WindowOptions, clamp_to_viewport};
use crate::hud::chart::{PlotQueue, PlotTicket};
use crate::hud::render::{
    NodeKeyAllocator, RenderNode, RenderedSection, display_order, render_section,
};
use crate::hud::section::Section;
use crate::ui::{UiFrame, rect_contains};
use crate::view;

/// Gap between the viewport edge and a spawned window.
const SPAWN_MARGIN: u16 = 1;
/// Vertical step between successively spawned windows.
const STACK_OFFSET: u16 = 2;
const DEFAULT_VIEWPORT: Rect = Rect {
    x: 0,
    y: 0,
    width: 80,
    height: 24,
};

/// Result of routing one input event through the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Handled,
    /// A link inside a window body was clicked.
    OpenLink(String),
}

/// Owns every window, the z-order counter, the tray and pending chart plots.
///
/// Operations on an id that is unknown or already closed are logged no-ops:
/// content pushes may race a user closing the window.
#[derive(Debug)]
pub struct WindowManager {
    windows: BTreeMap<WindowId, Window>,
    tray: Tray,
    next_window_id: u64,
    highest_z_index: u64,
    node_keys: NodeKeyAllocator,
    plots: PlotQueue,
    viewport: Rect,
    defaults: SizeBounds,
    decorator: Box<dyn WindowDecorator>,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(SizeBounds::default())
    }
}

impl WindowManager {
    pub fn new(defaults: SizeBounds) -> Self {
        Self {
            windows: BTreeMap::new(),
            tray: Tray::default(),
            next_window_id: 0,
            highest_z_index: 0,
            node_keys: NodeKeyAllocator::default(),
            plots: PlotQueue::default(),
            viewport: DEFAULT_VIEWPORT,
            defaults,
            decorator: Box::new(HudDecorator),
        }
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Resize the area windows live in. Every window is refitted and pulled
    /// back inside.
    pub fn set_viewport(&mut self, viewport: Rect) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for id in ids {
            self.relayout(id);
        }
    }

    pub fn create(
        &mut self,
        title: impl Into<String>,
        sections: Vec<Section>,
        options: WindowOptions,
    ) -> WindowId {
        self.next_window_id += 1;
        self.highest_z_index += 1;
        let id = WindowId::new(self.next_window_id);
        let stack_index = self.windows.len() as u16;
        let bounds = self.defaults.with_options(&options);
        let mut window = Window::new(id, title.into(), bounds, self.highest_z_index);
        window.sections = sections;
        self.windows.insert(id, window);
        self.rerender_all(id);

        let viewport = self.viewport;
        let Some(window) = self.windows.get_mut(&id) else {
            return id;
        };
        let size = window.geometry.size;
        let x = options.x.map(i32::from).unwrap_or_else(|| {
            if stack_index % 2 == 0 {
                (viewport.x + SPAWN_MARGIN) as i32
            } else {
                viewport.x as i32 + viewport.width as i32
                    - size.width as i32
                    - SPAWN_MARGIN as i32
            }
        });
        let y = options.y.map(i32::from).unwrap_or_else(|| {
            viewport.y as i32
                + SPAWN_MARGIN as i32
                + stack_index as i32 * STACK_OFFSET as i32
        });
        window.geometry.position = clamp_to_viewport(x, y, size, viewport);
        tracing::debug!(
            window_id = %id,
            z_index = window.z_index,
            sections = window.sections.len(),
            "opened window"
        );
        id
    }

    /// Replace a window's whole section list.
    pub fn set_sections(&mut self, id: WindowId, sections: Vec<Section>) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            tracing::warn!(window_id = %id, "set_sections on unknown window ignored");
            return false;
        };
        window.sections = sections;
        window.scroll = 0;
        self.rerender_all(id);
        true
    }

    /// Replace one section in place. Only that section is re-rendered.
    pub fn update_section(&mut self, id: WindowId, index: usize, section: Section) -> bool {
        let Self {
            windows,
            node_keys,
            plots,
            ..
        } = self;
        let Some(window) = windows.get_mut(&id) else {
            tracing::warn!(window_id = %id, "update_section on unknown window ignored");
            return false;
        };
        if index >= window.sections.len() {
            tracing::warn!(
                window_id = %id,
                index,
                len = window.sections.len(),
                "update_section index out of range ignored"
            );
            return false;
        }
        window.sections[index] = section;
        let mut by_index: Vec<Option<RenderedSection>> = vec![None; window.sections.len()];
        let previous = std::mem::take(&mut window.rendered);
        for (position, rendered) in previous.into_iter().enumerate() {
            if let Some(&section_index) = window.order.get(position) {
                by_index[section_index] = Some(rendered);
            }
        }
        let fresh = render_section(&window.sections[index], node_keys.allocate());
        queue_plots(plots, id, &window.liveness, std::slice::from_ref(&fresh));
        by_index[index] = Some(fresh);
        window.order = display_order(&window.sections);
        window.rendered = window
            .order
            .iter()
            .filter_map(|&section_index| by_index[section_index].take())
            .collect();
        self.relayout(id);
        true
    }

    pub fn minimize(&mut self, id: WindowId) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            tracing::warn!(window_id = %id, "minimize on unknown window ignored");
            return false;
        };
        if window.minimized {
            return false;
        }
        window.minimize();
        self.tray.push(id);
        tracing::debug!(window_id = %id, "minimized window");
        true
    }

    pub fn restore(&mut self, id: WindowId) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            tracing::warn!(window_id = %id, "restore on unknown window ignored");
            return false;
        };
        if !window.minimized {
            return false;
        }
        window.restore();
        self.tray.remove(id);
        self.relayout(id);
        self.bring_to_front(id);
        tracing::debug!(window_id = %id, "restored window");
        true
    }

    /// Remove a window for good, along with its tray entry and any pending
    /// deferred work.
    pub fn close(&mut self, id: WindowId) -> bool {
        let Some(mut window) = self.windows.remove(&id) else {
            tracing::warn!(window_id = %id, "close on unknown window ignored");
            return false;
        };
        tracing::debug!(window_id = %id, "closing window");
        window.close();
        self.tray.remove(id);
        true
    }

    /// Give a visible window the highest z-index. Minimized windows have no
    /// stacking position and are left alone.
    pub fn bring_to_front(&mut self, id: WindowId) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            tracing::warn!(window_id = %id, "bring_to_front on unknown window ignored");
            return false;
        };
        if window.minimized {
            return false;
        }
        self.highest_z_index += 1;
        window.z_index = self.highest_z_index;
        true
    }

    /// Header pointer-down: start dragging and raise. Any other drag ends.
    pub fn start_drag(&mut self, id: WindowId, column: u16, row: u16) -> bool {
        match self.windows.get(&id) {
            Some(window) if !window.minimized => {}
            Some(_) => return false,
            None => {
                tracing::warn!(window_id = %id, "start_drag on unknown window ignored");
                return false;
            }
        }
        self.stop_drag();
        if let Some(window) = self.windows.get_mut(&id) {
            window.begin_drag((column, row));
        }
        self.bring_to_front(id);
        true
    }

    /// Pointer move: reposition the dragging window, if any, keeping it fully
    /// inside the viewport.
    pub fn drag(&mut self, column: u16, row: u16) -> bool {
        let viewport = self.viewport;
        let Some(window) = self.windows.values_mut().find(|window| window.drag.dragging) else {
            return false;
        };
        let (grab_x, grab_y) = window.drag.grab_offset;
        let position = clamp_to_viewport(
            column as i32 - grab_x,
            row as i32 - grab_y,
            window.geometry.size,
            viewport,
        );
        window.geometry.position = position;
        true
    }

    /// Pointer up: end whichever drag is active.
    pub fn stop_drag(&mut self) -> bool {
        let mut stopped = false;
        for window in self.windows.values_mut() {
            if window.drag.dragging {
                window.end_drag();
                stopped = true;
            }
        }
        stopped
    }

    pub fn dragging_window(&self) -> Option<WindowId> {
        self.windows
            .values()
            .find(|window| window.drag.dragging)
            .map(|window| window.id)
    }

    /// Header click outside the controls while nothing is dragging.
    pub fn header_click(&mut self, id: WindowId) -> bool {
        if self.dragging_window().is_some() {
            return false;
        }
        self.bring_to_front(id)
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn tray(&self) -> &Tray {
        &self.tray
    }

    /// Visible windows, in id order.
    pub fn open_windows(&self) -> Vec<WindowId> {
        self.windows
            .values()
            .filter(|window| !window.minimized)
            .map(|window| window.id)
            .collect()
    }

    /// Minimized windows, in the order they were minimized.
    pub fn minimized_windows(&self) -> Vec<WindowId> {
        self.tray.entries().to_vec()
    }

    pub fn close_all_windows(&mut self) {
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for id in ids {
            self.close(id);
        }
        self.tray.clear();
    }

    /// Visible windows from back to front.
    pub fn draw_order(&self) -> Vec<WindowId> {
        let mut visible: Vec<&Window> = self
            .windows
            .values()
            .filter(|window| !window.minimized)
            .collect();
        visible.sort_by_key(|window| window.z_index);
        visible.into_iter().map(|window| window.id).collect()
    }

    pub fn front_window(&self) -> Option<WindowId> {
        self.draw_order().last().copied()
    }

    pub fn topmost_at(&self, column: u16, row: u16) -> Option<WindowId> {
        self.draw_order().into_iter().rev().find(|id| {
            self.windows
                .get(id)
                .is_some_and(|window| rect_contains(window.rect(), column, row))
        })
    }

    /// Raise the back-most visible window, cycling focus through the stack.
    pub fn raise_next(&mut self) -> Option<WindowId> {
        let order = self.draw_order();
        if order.len() < 2 {
            return order.first().copied();
        }
        let id = order[0];
        self.bring_to_front(id);
        Some(id)
    }

    pub fn scroll(&mut self, id: WindowId, delta: i32) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        let target = (window.scroll as i32 + delta).max(0);
        let before = window.scroll;
        window.set_scroll(target.min(u16::MAX as i32) as u16);
        window.scroll != before
    }

    pub fn pending_plots(&self) -> usize {
        self.plots.len()
    }

    /// Plot every queued chart whose window and node still exist. Returns the
    /// number of charts plotted.
    pub fn run_deferred_plots(&mut self) -> usize {
        let mut plotted = 0;
        for ticket in self.plots.drain() {
            if !ticket.liveness.is_alive() {
                tracing::debug!(window_id = %ticket.window, node = %ticket.node, "dropping plot for closed window");
                continue;
            }
            let Some(window) = self.windows.get_mut(&ticket.window) else {
                continue;
            };
            let chart = window
                .rendered
                .iter_mut()
                .find(|rendered| rendered.key == ticket.node)
                .and_then(|rendered| match &mut rendered.node {
                    RenderNode::Chart(chart) => Some(chart),
                    _ => None,
                });
            match chart {
                Some(chart) => {
                    if chart.resolve() {
                        plotted += 1;
                    }
                }
                None => {
                    tracing::debug!(window_id = %ticket.window, node = %ticket.node, "chart node replaced before plotting");
                }
            }
        }
        plotted
    }

    /// URL under a screen cell in the topmost window's body.
    pub fn link_at(&self, column: u16, row: u16) -> Option<String> {
        let id = self.topmost_at(column, row)?;
        let window = self.windows.get(&id)?;
        let inner = self.decorator.inner(window.rect());
        if !rect_contains(inner, column, row) {
            return None;
        }
        let layout = view::layout_body(&window.rendered, inner.width);
        layout
            .link_at(column - inner.x, row - inner.y + window.scroll)
            .map(str::to_string)
    }

    /// Whether any window is still fading in.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.windows
            .values()
            .any(|window| !window.minimized && window.opacity(now) < 1.0)
    }

    /// Paint visible windows back to front.
    pub fn render(&self, frame: &mut UiFrame<'_>, now: Instant) {
        for id in self.draw_order() {
            if let Some(window) = self.windows.get(&id) {
                view::paint_window(frame, window, self.decorator.as_ref(), now);
            }
        }
    }

    /// Paint the tray into `area`. Returns the first free column after it.
    pub fn render_tray(&mut self, frame: &mut UiFrame<'_>, area: Rect) -> u16 {
        let windows = &self.windows;
        self.tray.render(frame, area, |id| {
            windows
                .get(&id)
                .map(|window| window.title.clone())
                .unwrap_or_default()
        })
    }

    /// The tray row is showing something else; its entries are not clickable.
    pub fn hide_tray(&mut self) {
        self.tray.clear_hits();
    }

    pub fn handle_event(&mut self, event: &Event) -> EventOutcome {
        let Event::Mouse(mouse) = event else {
            return EventOutcome::Ignored;
        };
        let (column, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = self.tray.hit_test(column, row) {
                    self.restore(id);
                    return EventOutcome::Handled;
                }
                let Some(id) = self.topmost_at(column, row) else {
                    return EventOutcome::Ignored;
                };
                let Some(rect) = self.windows.get(&id).map(Window::rect) else {
                    return EventOutcome::Ignored;
                };
                match self.decorator.hit_test(rect, column, row) {
                    HeaderAction::Minimize => {
                        self.minimize(id);
                    }
                    HeaderAction::Close => {
                        self.close(id);
                    }
                    HeaderAction::Drag => {
                        self.start_drag(id, column, row);
                    }
                    HeaderAction::None => {
                        self.bring_to_front(id);
                        if let Some(url) = self.link_at(column, row) {
                            return EventOutcome::OpenLink(url);
                        }
                    }
                }
                EventOutcome::Handled
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                if self.drag(column, row) {
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            MouseEventKind::Up(_) => {
                if self.stop_drag() {
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let Some(id) = self.topmost_at(column, row) else {
                    return EventOutcome::Ignored;
                };
                let delta = if mouse.kind == MouseEventKind::ScrollDown {
                    1
                } else {
                    -1
                };
                self.scroll(id, delta);
                EventOutcome::Handled
            }
            _ => EventOutcome::Ignored,
        }
    }

    /// Render every section of a window from scratch.
    fn rerender_all(&mut self, id: WindowId) {
        let Self {
            windows,
            node_keys,
            plots,
            ..
        } = self;
        let Some(window) = windows.get_mut(&id) else {
            return;
        };
        window.order = display_order(&window.sections);
        window.rendered = window
            .order
            .iter()
            .map(|&index| render_section(&window.sections[index], node_keys.allocate()))
            .collect();
        queue_plots(plots, id, &window.liveness, &window.rendered);
        self.relayout(id);
    }

    /// Refit a window's size to its content and keep it inside the viewport.
    fn relayout(&mut self, id: WindowId) {
        let viewport = self.viewport;
        let limit = Size {
            width: viewport.width,
            height: viewport.height,
        };
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        let size = view::natural_size(&window.rendered, window.bounds, limit);
        window.geometry.size = size;
        let inner = self.decorator.inner(window.geometry.rect());
        let content_height = view::layout_body(&window.rendered, inner.width).height();
        window.content_height = content_height;
        let position = window.geometry.position;
        window.geometry.position =
            clamp_to_viewport(position.x as i32, position.y as i32, size, viewport);
        window.set_scroll(window.scroll);
    }
}

fn queue_plots(plots: &mut PlotQueue, id: WindowId, liveness: &Liveness, rendered: &[RenderedSection]) {
    for section in rendered {
        if let RenderNode::Chart(chart) = &section.node
            && chart.is_pending()
        {
            plots.push(PlotTicket {
                window: id,
                node: chart.key,
                liveness: liveness.clone(),
            });
        }
    }
}
