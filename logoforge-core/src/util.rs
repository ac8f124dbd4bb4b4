//! Geometry helpers, used throughout the crate.
//! Units are logical canvas pixels. 0,0 is top left, +X right, +Y down.

/// An axis-aligned rectangle. Width and height are expected to be non-negative.
#[derive(Copy, Clone, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    #[must_use]
    pub fn from_position_size(position: [f32; 2], size: [f32; 2]) -> Self {
        Self::new(position[0], position[1], size[0], size[1])
    }
    #[must_use]
    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }
    #[must_use]
    pub fn size(&self) -> [f32; 2] {
        [self.width, self.height]
    }
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
    /// Is the point within this rect? Inclusive of the top-left edges, exclusive of bottom-right.
    #[must_use]
    pub fn contains(&self, [x, y]: [f32; 2]) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }
    /// Smallest rect containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right - x, bottom - y)
    }
    /// Smallest rect containing every rect of the iterator, or None if it's empty.
    pub fn union_all(rects: impl IntoIterator<Item = Self>) -> Option<Self> {
        rects.into_iter().reduce(|a, b| a.union(&b))
    }
    #[must_use]
    pub fn translated(&self, [dx, dy]: [f32; 2]) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Round a coordinate to the nearest multiple of `grid`.
/// A non-positive or non-finite grid leaves the value untouched.
#[must_use]
pub fn snap_to_grid(value: f32, grid: f32) -> f32 {
    if grid.is_finite() && grid > 0.0 {
        (value / grid).round() * grid
    } else {
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 15.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 30.0, 20.0));
        assert_eq!(Rect::union_all([a, b]), Some(Rect::new(0.0, 0.0, 30.0, 20.0)));
        assert_eq!(Rect::union_all(std::iter::empty()), None);
    }
    #[test]
    fn contains_edges() {
        let r = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(r.contains([10.0, 10.0]));
        assert!(r.contains([14.9, 14.9]));
        assert!(!r.contains([15.0, 12.0]));
        assert!(!r.contains([9.9, 12.0]));
    }
    #[test]
    fn snapping() {
        assert_eq!(snap_to_grid(37.0, 20.0), 40.0);
        assert_eq!(snap_to_grid(53.0, 20.0), 60.0);
        assert_eq!(snap_to_grid(9.0, 20.0), 0.0);
        assert_eq!(snap_to_grid(-11.0, 20.0), -20.0);
        // Degenerate grids are ignored.
        assert_eq!(snap_to_grid(37.0, 0.0), 37.0);
        assert_eq!(snap_to_grid(37.0, f32::NAN), 37.0);
    }
}
