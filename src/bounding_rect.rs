use crate::matrix::Matrix;

/// An axis-aligned box.
///
/// Edges are inclusive for [`contain`](BoundingRect::contain) and
/// [`intersect`](BoundingRect::intersect), so two boxes that merely touch
/// are considered intersecting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x, self.y),
            (self.right(), self.y),
            (self.right(), self.bottom()),
            (self.x, self.bottom()),
        ]
    }

    /// Map all four corners through `matrix` and return the enclosing box.
    ///
    /// Under rotation this is deliberately conservative: the result is the
    /// AABB around the rotated corners, not the rotated rectangle itself.
    pub fn transform(&self, matrix: &Matrix) -> BoundingRect {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;

        for (x, y) in self.corners() {
            let (tx, ty) = matrix.apply(x, y);
            min_x = min_x.min(tx);
            min_y = min_y.min(ty);
            max_x = max_x.max(tx);
            max_y = max_y.max(ty);
        }

        BoundingRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn contain(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn intersect(&self, other: &BoundingRect) -> bool {
        !(self.right() < other.x
            || other.right() < self.x
            || self.bottom() < other.y
            || other.bottom() < self.y)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn extend(&self, other: &BoundingRect) -> BoundingRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingRect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow the box by `amount` on every side.
    pub fn outset(&self, amount: f32) -> BoundingRect {
        BoundingRect::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }
}
