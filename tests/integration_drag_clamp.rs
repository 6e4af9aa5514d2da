use crossterm::event::{Event, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use aura_hud::hud::section::Section;
use aura_hud::window::{WindowManager, WindowOptions};

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
    Event::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

/// Small xorshift so pointer paths are varied but reproducible.
struct Pointer(u64);

impl Pointer {
    fn next(&mut self, limit: u16) -> u16 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % limit as u64) as u16
    }
}

fn assert_inside(wm: &WindowManager) {
    let viewport = wm.viewport();
    for window in wm.windows() {
        let rect = window.rect();
        assert!(rect.x >= viewport.x && rect.y >= viewport.y, "{rect:?}");
        assert!(rect.right() <= viewport.right(), "{rect:?} in {viewport:?}");
        assert!(rect.bottom() <= viewport.bottom(), "{rect:?} in {viewport:?}");
    }
}

#[test]
fn random_drags_never_leave_the_viewport() {
    let mut wm = WindowManager::default();
    wm.set_viewport(Rect::new(0, 0, 90, 30));
    let ids: Vec<_> = (0..3)
        .map(|i| {
            wm.create(
                format!("w{i}"),
                vec![Section::text("drag me around")],
                WindowOptions::default(),
            )
        })
        .collect();
    let mut pointer = Pointer(0x2545_f491_4f6c_dd1d);

    for step in 0..300 {
        let id = ids[step % ids.len()];
        let rect = wm.window(id).unwrap().rect();
        let grab = rect.x + pointer.next(rect.width);
        // Windows overlap, so grab directly rather than through hit testing.
        assert!(wm.start_drag(id, grab, rect.y));
        for _ in 0..5 {
            // Positions well past the right and bottom edges.
            let column = pointer.next(400);
            let row = pointer.next(200);
            wm.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), column, row));
            assert_inside(&wm);
        }
        wm.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 0, 0));
        assert!(wm.dragging_window().is_none());
    }
}

#[test]
fn dragging_past_the_origin_pins_to_zero() {
    let mut wm = WindowManager::default();
    let id = wm.create("w", vec![Section::text("x")], WindowOptions::at(30, 10));
    assert!(wm.start_drag(id, 40, 10));
    wm.drag(0, 0);
    let position = wm.window(id).unwrap().position();
    assert_eq!((position.x, position.y), (0, 0));
}

#[test]
fn only_one_window_drags_at_a_time() {
    let mut wm = WindowManager::default();
    let a = wm.create("a", vec![Section::text("a")], WindowOptions::at(0, 0));
    let b = wm.create("b", vec![Section::text("b")], WindowOptions::at(40, 10));
    assert!(wm.start_drag(a, 2, 0));
    assert!(wm.start_drag(b, 42, 10));
    assert_eq!(wm.dragging_window(), Some(b));
    assert!(!wm.window(a).unwrap().is_dragging());

    let before = wm.window(a).unwrap().position();
    wm.drag(50, 12);
    assert_eq!(wm.window(a).unwrap().position(), before);
    assert_eq!(wm.window(b).unwrap().position().x, 48);
}

#[test]
fn shrinking_viewport_mid_drag_still_clamps() {
    let mut wm = WindowManager::default();
    let id = wm.create("w", vec![Section::text("x")], WindowOptions::at(10, 5));
    assert!(wm.start_drag(id, 11, 5));
    wm.set_viewport(Rect::new(0, 0, 40, 12));
    wm.drag(200, 200);
    let rect = wm.window(id).unwrap().rect();
    assert!(rect.right() <= 40 && rect.bottom() <= 12, "{rect:?}");
}
