//! Selection state machine tests: full drag / adjust / commit scenarios in
//! UI-space coordinates over a synthetic two-display union.

use snapgrab::geometry::{Point, Rect};
use snapgrab::selection::{
    Corner, PointerEvent, SelectionKey, SelectionPhase, SelectionSession,
};

/// Two side-by-side 1920x1080 displays.
fn bounds() -> Rect {
    Rect::new(0.0, 0.0, 3840.0, 1080.0)
}

fn drag(session: &mut SelectionSession, from: Point, to: Point) {
    session.on_pointer_event(PointerEvent::Down(from));
    session.on_pointer_event(PointerEvent::Moved(to));
    session.on_pointer_event(PointerEvent::Up(to));
}

fn preset_session() -> SelectionSession {
    let mut s = SelectionSession::begin(bounds(), None);
    drag(&mut s, Point::new(100.0, 100.0), Point::new(500.0, 400.0));
    assert_eq!(s.phase(), SelectionPhase::Preset);
    s
}

#[test]
fn test_full_drag_confirm_cycle() {
    let mut s = preset_session();
    assert_eq!(s.current_rect(), Some(Rect::new(100.0, 100.0, 400.0, 300.0)));
    s.on_key_event(SelectionKey::Confirm);
    assert_eq!(s.phase(), SelectionPhase::Committed);
    // The committed rectangle survives into the terminal phase.
    assert_eq!(s.current_rect(), Some(Rect::new(100.0, 100.0, 400.0, 300.0)));
}

#[test]
fn test_reverse_drag_normalizes() {
    let mut s = SelectionSession::begin(bounds(), None);
    drag(&mut s, Point::new(500.0, 400.0), Point::new(100.0, 100.0));
    assert_eq!(s.current_rect(), Some(Rect::new(100.0, 100.0, 400.0, 300.0)));
}

#[test]
fn test_cancel_wins_in_every_live_phase() {
    let mut s = SelectionSession::begin(bounds(), None);
    s.on_key_event(SelectionKey::Cancel);
    assert_eq!(s.phase(), SelectionPhase::Cancelled);

    let mut s = SelectionSession::begin(bounds(), None);
    s.on_pointer_event(PointerEvent::Down(Point::new(100.0, 100.0)));
    s.on_key_event(SelectionKey::Cancel);
    assert_eq!(s.phase(), SelectionPhase::Cancelled);

    let mut s = preset_session();
    s.on_key_event(SelectionKey::Cancel);
    assert_eq!(s.phase(), SelectionPhase::Cancelled);
    assert_eq!(s.current_rect(), None);
}

#[test]
fn test_terminal_phases_ignore_further_events() {
    let mut s = preset_session();
    s.on_key_event(SelectionKey::Confirm);
    s.on_pointer_event(PointerEvent::Down(Point::new(0.0, 0.0)));
    s.on_key_event(SelectionKey::Cancel);
    assert_eq!(s.phase(), SelectionPhase::Committed);
}

#[test]
fn test_confirm_requires_a_preset() {
    let mut s = SelectionSession::begin(bounds(), None);
    s.on_key_event(SelectionKey::Confirm);
    assert_eq!(s.phase(), SelectionPhase::Idle);
    s.on_pointer_event(PointerEvent::Down(Point::new(100.0, 100.0)));
    s.on_key_event(SelectionKey::Confirm);
    assert_eq!(s.phase(), SelectionPhase::Selecting);
}

#[test]
fn test_live_points_clamped_to_display_union() {
    let mut s = SelectionSession::begin(bounds(), None);
    drag(&mut s, Point::new(3700.0, 900.0), Point::new(4500.0, 2000.0));
    // The runaway corner stops at the union edge.
    assert_eq!(s.current_rect(), Some(Rect::new(3700.0, 900.0, 140.0, 180.0)));
}

#[test]
fn test_region_drag_moves_preset_preserving_size() {
    let mut s = preset_session();
    // Grab the interior away from any corner handle and move it.
    s.on_pointer_event(PointerEvent::Down(Point::new(300.0, 250.0)));
    assert_eq!(s.phase(), SelectionPhase::RegionDragging);
    s.on_pointer_event(PointerEvent::Moved(Point::new(1300.0, 550.0)));
    s.on_pointer_event(PointerEvent::Up(Point::new(1300.0, 550.0)));
    assert_eq!(s.phase(), SelectionPhase::Preset);
    assert_eq!(s.current_rect(), Some(Rect::new(1100.0, 400.0, 400.0, 300.0)));
}

#[test]
fn test_region_drag_clamps_at_union_edge() {
    let mut s = preset_session();
    s.on_pointer_event(PointerEvent::Down(Point::new(300.0, 250.0)));
    s.on_pointer_event(PointerEvent::Moved(Point::new(3839.0, 1079.0)));
    s.on_pointer_event(PointerEvent::Up(Point::new(3839.0, 1079.0)));
    let rect = s.current_rect().unwrap();
    // Size unchanged, rectangle fully inside the union.
    assert_eq!((rect.width, rect.height), (400.0, 300.0));
    assert_eq!((rect.right(), rect.top()), (3840.0, 1080.0));
}

#[test]
fn test_corner_resize_anchors_opposite_corner() {
    let mut s = preset_session();
    // Grab the top-right handle; bottom-left (100,100) anchors.
    s.on_pointer_event(PointerEvent::Down(Point::new(500.0, 400.0)));
    assert_eq!(s.phase(), SelectionPhase::CornerDragging(Corner::TopRight));
    s.on_pointer_event(PointerEvent::Moved(Point::new(700.0, 600.0)));
    s.on_pointer_event(PointerEvent::Up(Point::new(700.0, 600.0)));
    assert_eq!(s.phase(), SelectionPhase::Preset);
    assert_eq!(s.current_rect(), Some(Rect::new(100.0, 100.0, 600.0, 500.0)));
}

#[test]
fn test_corner_hit_tolerance() {
    let mut s = preset_session();
    // 8 units off the exact corner still grabs the handle.
    s.on_pointer_event(PointerEvent::Down(Point::new(508.0, 392.0)));
    assert_eq!(s.phase(), SelectionPhase::CornerDragging(Corner::TopRight));
}

#[test]
fn test_corner_resize_clamps_at_minimum_size() {
    let mut s = preset_session();
    // Drag the top-right handle far past the bottom-left anchor: both sides
    // clamp at the floor instead of inverting, anchored at (100,100).
    s.on_pointer_event(PointerEvent::Down(Point::new(500.0, 400.0)));
    s.on_pointer_event(PointerEvent::Moved(Point::new(0.0, 0.0)));
    s.on_pointer_event(PointerEvent::Up(Point::new(0.0, 0.0)));
    assert_eq!(s.current_rect(), Some(Rect::new(100.0, 100.0, 10.0, 10.0)));
}

#[test]
fn test_bottom_left_resize_keeps_top_right_anchor() {
    let mut s = preset_session();
    s.on_pointer_event(PointerEvent::Down(Point::new(100.0, 100.0)));
    assert_eq!(s.phase(), SelectionPhase::CornerDragging(Corner::BottomLeft));
    s.on_pointer_event(PointerEvent::Moved(Point::new(50.0, 50.0)));
    s.on_pointer_event(PointerEvent::Up(Point::new(50.0, 50.0)));
    assert_eq!(s.current_rect(), Some(Rect::new(50.0, 50.0, 450.0, 350.0)));
}

#[test]
fn test_click_outside_preset_starts_new_selection() {
    let mut s = preset_session();
    s.on_pointer_event(PointerEvent::Down(Point::new(2000.0, 800.0)));
    assert_eq!(s.phase(), SelectionPhase::Selecting);
    s.on_pointer_event(PointerEvent::Moved(Point::new(2200.0, 900.0)));
    s.on_pointer_event(PointerEvent::Up(Point::new(2200.0, 900.0)));
    assert_eq!(s.current_rect(), Some(Rect::new(2000.0, 800.0, 200.0, 100.0)));
}

#[test]
fn test_preset_seed_enters_adjustable_phase() {
    let seed = Rect::new(200.0, 200.0, 640.0, 480.0);
    let mut s = SelectionSession::begin(bounds(), Some(seed));
    assert_eq!(s.phase(), SelectionPhase::Preset);
    assert_eq!(s.current_rect(), Some(seed));
    s.confirm();
    assert_eq!(s.phase(), SelectionPhase::Committed);
}

#[test]
fn test_preset_seed_clamped_into_bounds() {
    let seed = Rect::new(3700.0, 900.0, 640.0, 480.0);
    let s = SelectionSession::begin(bounds(), Some(seed));
    let rect = s.current_rect().unwrap();
    assert_eq!((rect.width, rect.height), (640.0, 480.0));
    assert_eq!((rect.right(), rect.top()), (3840.0, 1080.0));
}

#[test]
fn test_auto_commit_commits_on_pointer_up() {
    let mut s = SelectionSession::begin_auto_commit(bounds());
    drag(&mut s, Point::new(100.0, 100.0), Point::new(400.0, 300.0));
    assert_eq!(s.phase(), SelectionPhase::Committed);
    assert_eq!(s.current_rect(), Some(Rect::new(100.0, 100.0, 300.0, 200.0)));
}

#[test]
fn test_auto_commit_tiny_drag_still_cancels() {
    let mut s = SelectionSession::begin_auto_commit(bounds());
    drag(&mut s, Point::new(100.0, 100.0), Point::new(103.0, 103.0));
    assert_eq!(s.phase(), SelectionPhase::Cancelled);
}

#[test]
fn test_current_rect_rounds_to_pixel_boundaries() {
    let mut s = SelectionSession::begin(bounds(), None);
    drag(&mut s, Point::new(100.4, 100.6), Point::new(500.2, 400.8));
    let rect = s.current_rect().unwrap();
    assert_eq!(rect.x.fract(), 0.0);
    assert_eq!(rect.y.fract(), 0.0);
    assert_eq!(rect.width.fract(), 0.0);
    assert_eq!(rect.height.fract(), 0.0);
}
