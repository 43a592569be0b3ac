//! Rectangle and point math shared by capture and selection.
//!
//! Two coordinate conventions exist side by side: pointer/interaction events
//! arrive in UI space (origin at the bottom-left of the primary display, Y
//! up), while display enumeration and pixel capture use capture space (origin
//! at the top-left of the primary display, Y down). Both share the primary
//! display and the same unit scale, so converting between them only flips the
//! Y axis around the primary display's height.

/// A point in either coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle. Valid when width and height are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from two opposite corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_valid(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.top()
    }

    /// Overlapping region of two rectangles, `None` when they don't overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        if right > x && top > y {
            Some(Rect::new(x, y, right - x, top - y))
        } else {
            None
        }
    }

    /// Smallest rectangle covering both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());
        Rect::new(x, y, right - x, top - y)
    }

    /// Round all four components to integer boundaries. Consumers read
    /// selection rectangles through this so the captured image's pixel
    /// dimensions match what was displayed.
    pub fn rounded(&self) -> Rect {
        Rect::new(
            self.x.round(),
            self.y.round(),
            self.width.round(),
            self.height.round(),
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Clamp a point into this rectangle.
    pub fn clamp_point(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.x, self.right()),
            p.y.clamp(self.y, self.top()),
        )
    }

    /// Whether `other` lies entirely within this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.top() <= self.top()
    }
}

/// Union of a set of rectangles, typically the combined display bounds.
pub fn bounds_union(rects: &[Rect]) -> Option<Rect> {
    let mut iter = rects.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |acc, r| acc.union(r)))
}

/// Convert a UI-space rectangle (bottom-left origin, Y up) into capture
/// space (top-left origin, Y down). `primary_height` is the primary
/// display's height, shared by both conventions.
pub fn to_capture_space(rect: Rect, primary_height: f64) -> Rect {
    Rect::new(
        rect.x,
        primary_height - rect.y - rect.height,
        rect.width,
        rect.height,
    )
}

/// Inverse of [`to_capture_space`]. The formula is its own inverse, but the
/// two names keep call sites honest about which direction they convert:
/// every rectangle crossing the boundary is converted exactly once.
pub fn to_ui_space(rect: Rect, primary_height: f64) -> Rect {
    to_capture_space(rect, primary_height)
}
