//! Interactive rubber-band selection state machine.
//!
//! Pure state transitions driven by pointer and key events delivered from
//! the presentation layer; no I/O and nothing blocking happens here. All
//! coordinates are UI space (bottom-left origin, Y up). The driving layer
//! converts the committed rectangle to capture space exactly once before
//! handing it to the capture engine.

use crate::geometry::{Point, Rect};

/// Free-drag commit floor: a drag this small or smaller cancels instead of
/// producing a preset.
pub const MIN_DRAG_SIZE: f64 = 5.0;

/// Corner-resize floor: resizing clamps the moving corner so neither side
/// drops below this. Deliberately different from [`MIN_DRAG_SIZE`]; resize
/// protects the anchor from degenerating, free-drag only filters accidental
/// clicks.
pub const MIN_RESIZE_SIZE: f64 = 10.0;

/// Hit radius around a corner handle, UI units.
pub const CORNER_HIT_RADIUS: f64 = 10.0;

/// The four resize handles of a preset rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::BottomLeft,
        Corner::BottomRight,
        Corner::TopLeft,
        Corner::TopRight,
    ];

    /// The diagonally opposite corner, which anchors a resize.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
        }
    }

    pub fn point_of(self, rect: &Rect) -> Point {
        match self {
            Corner::BottomLeft => Point::new(rect.x, rect.y),
            Corner::BottomRight => Point::new(rect.right(), rect.y),
            Corner::TopLeft => Point::new(rect.x, rect.top()),
            Corner::TopRight => Point::new(rect.right(), rect.top()),
        }
    }
}

/// Where a selection session currently is. `Committed` and `Cancelled` are
/// terminal; a new session must be created afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Selecting,
    Preset,
    CornerDragging(Corner),
    RegionDragging,
    Committed,
    Cancelled,
}

/// Pointer events delivered by the presentation layer, UI space.
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Down(Point),
    Moved(Point),
    Up(Point),
}

/// Keyboard actions relevant to a selection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKey {
    Confirm,
    Cancel,
}

/// One interactive selection session.
///
/// Owned by exactly one driving overlay at a time; a new session is only
/// created after the previous one reached a terminal phase.
pub struct SelectionSession {
    /// Union of all display bounds, UI space. Every live point and the
    /// preset rectangle are clamped into it.
    bounds: Rect,
    phase: SelectionPhase,
    start: Point,
    current: Point,
    rect: Option<Rect>,
    /// Pointer offset from the rect origin while the whole region drags.
    drag_offset: (f64, f64),
    /// Anchor corner and per-axis drag direction while a corner drags.
    drag_anchor: Point,
    drag_sign: (f64, f64),
    /// Commit on the first pointer-up instead of requiring an explicit
    /// confirm; used by one-shot custom-region selection.
    auto_commit: bool,
}

impl SelectionSession {
    /// Begin a session over the combined display bounds, optionally seeded
    /// with a preset rectangle (clamped into bounds).
    pub fn begin(bounds: Rect, preset: Option<Rect>) -> Self {
        let (phase, rect) = match preset {
            Some(r) if !r.is_empty() => (SelectionPhase::Preset, Some(clamp_into(r, &bounds))),
            _ => (SelectionPhase::Idle, None),
        };
        Self {
            bounds,
            phase,
            start: Point::default(),
            current: Point::default(),
            rect,
            drag_offset: (0.0, 0.0),
            drag_anchor: Point::default(),
            drag_sign: (1.0, 1.0),
            auto_commit: false,
        }
    }

    /// One-shot variant: the first pointer-up commits immediately.
    pub fn begin_auto_commit(bounds: Rect) -> Self {
        Self {
            auto_commit: true,
            ..Self::begin(bounds, None)
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            SelectionPhase::Committed | SelectionPhase::Cancelled
        )
    }

    /// The rectangle a consumer (overlay renderer, capture engine) should
    /// read right now, rounded to integer boundaries so the captured pixels
    /// match what was displayed. `None` while nothing is selected.
    pub fn current_rect(&self) -> Option<Rect> {
        match self.phase {
            SelectionPhase::Selecting => {
                Some(Rect::from_corners(self.start, self.current).rounded())
            }
            SelectionPhase::Preset
            | SelectionPhase::CornerDragging(_)
            | SelectionPhase::RegionDragging
            | SelectionPhase::Committed => self.rect.map(|r| r.rounded()),
            SelectionPhase::Idle | SelectionPhase::Cancelled => None,
        }
    }

    pub fn on_key_event(&mut self, key: SelectionKey) {
        if self.is_terminal() {
            return;
        }
        match key {
            SelectionKey::Cancel => self.phase = SelectionPhase::Cancelled,
            SelectionKey::Confirm => self.confirm(),
        }
    }

    /// Explicit confirm: commits a preset rectangle. Invoked by the confirm
    /// key, an overlay control, or the triggering shortcut's re-press.
    pub fn confirm(&mut self) {
        if self.phase == SelectionPhase::Preset && self.rect.is_some() {
            self.phase = SelectionPhase::Committed;
        }
    }

    pub fn on_pointer_event(&mut self, event: PointerEvent) {
        if self.is_terminal() {
            return;
        }
        match event {
            PointerEvent::Down(p) => self.pointer_down(p),
            PointerEvent::Moved(p) => self.pointer_moved(p),
            PointerEvent::Up(p) => self.pointer_up(p),
        }
    }

    fn pointer_down(&mut self, p: Point) {
        let p = self.bounds.clamp_point(p);
        match self.phase {
            SelectionPhase::Idle => {
                self.start = p;
                self.current = p;
                self.phase = SelectionPhase::Selecting;
            }
            SelectionPhase::Preset => {
                let rect = match self.rect {
                    Some(r) => r,
                    None => return,
                };
                if let Some(corner) = hit_corner(&rect, p) {
                    let anchor = corner.opposite().point_of(&rect);
                    let moving = corner.point_of(&rect);
                    self.drag_anchor = anchor;
                    self.drag_sign = (
                        if moving.x >= anchor.x { 1.0 } else { -1.0 },
                        if moving.y >= anchor.y { 1.0 } else { -1.0 },
                    );
                    self.phase = SelectionPhase::CornerDragging(corner);
                } else if rect.contains(p) {
                    self.drag_offset = (p.x - rect.x, p.y - rect.y);
                    self.phase = SelectionPhase::RegionDragging;
                } else {
                    // Outside the preset: discard it and immediately start a
                    // fresh drag from here.
                    self.rect = None;
                    self.start = p;
                    self.current = p;
                    self.phase = SelectionPhase::Selecting;
                }
            }
            _ => {}
        }
    }

    fn pointer_moved(&mut self, p: Point) {
        let p = self.bounds.clamp_point(p);
        match self.phase {
            SelectionPhase::Selecting => self.current = p,
            SelectionPhase::CornerDragging(_) => {
                let (sx, sy) = self.drag_sign;
                let anchor = self.drag_anchor;
                // Clamp the moving corner, never the anchor: each side stays
                // at least MIN_RESIZE_SIZE on the corner's original side.
                let width = ((p.x - anchor.x) * sx).max(MIN_RESIZE_SIZE);
                let height = ((p.y - anchor.y) * sy).max(MIN_RESIZE_SIZE);
                let moving = Point::new(anchor.x + sx * width, anchor.y + sy * height);
                self.rect = Some(Rect::from_corners(anchor, moving));
            }
            SelectionPhase::RegionDragging => {
                if let Some(rect) = self.rect {
                    let target = Rect::new(
                        p.x - self.drag_offset.0,
                        p.y - self.drag_offset.1,
                        rect.width,
                        rect.height,
                    );
                    self.rect = Some(clamp_into(target, &self.bounds));
                }
            }
            _ => {}
        }
    }

    fn pointer_up(&mut self, p: Point) {
        match self.phase {
            SelectionPhase::Selecting => {
                self.pointer_moved(p);
                let rect = Rect::from_corners(self.start, self.current);
                if rect.width > MIN_DRAG_SIZE && rect.height > MIN_DRAG_SIZE {
                    self.rect = Some(rect);
                    self.phase = if self.auto_commit {
                        SelectionPhase::Committed
                    } else {
                        SelectionPhase::Preset
                    };
                } else {
                    self.phase = SelectionPhase::Cancelled;
                }
            }
            SelectionPhase::CornerDragging(_) | SelectionPhase::RegionDragging => {
                self.phase = SelectionPhase::Preset;
            }
            _ => {}
        }
    }
}

/// Which corner handle, if any, a pointer-down at `p` grabs.
fn hit_corner(rect: &Rect, p: Point) -> Option<Corner> {
    Corner::ALL.into_iter().find(|corner| {
        let c = corner.point_of(rect);
        (p.x - c.x).abs() <= CORNER_HIT_RADIUS && (p.y - c.y).abs() <= CORNER_HIT_RADIUS
    })
}

/// Translate `rect` the minimal amount to sit fully inside `bounds`.
fn clamp_into(rect: Rect, bounds: &Rect) -> Rect {
    let x = rect
        .x
        .min(bounds.right() - rect.width)
        .max(bounds.x);
    let y = rect.y.min(bounds.top() - rect.height).max(bounds.y);
    Rect::new(x, y, rect.width, rect.height)
}
