//! Geometry helpers shared by painting and hit-testing.

use resvg::tiny_skia::{Path, PathBuilder, PathSegment, Point, Rect};

/// Control point distance for approximating a quarter circle with a cubic.
const KAPPA: f32 = 0.552_284_8;

/// Line segments used per curve when flattening for hit-testing.
const CURVE_STEPS: usize = 16;

/// Radii shrunk so that no pair of adjacent corners overlaps.
pub fn clamp_radii(width: f32, height: f32, radii: [f32; 4]) -> [f32; 4] {
    let max = (width.min(height) / 2.0).max(0.0);
    radii.map(|r| r.clamp(0.0, max))
}

/// A rectangle with per-corner radii (top-left, top-right, bottom-right,
/// bottom-left). Returns `None` for an empty box.
pub fn rounded_rect(x: f32, y: f32, width: f32, height: f32, radii: [f32; 4]) -> Option<Path> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    let [tl, tr, br, bl] = clamp_radii(width, height, radii);
    if tl == 0.0 && tr == 0.0 && br == 0.0 && bl == 0.0 {
        return Rect::from_xywh(x, y, width, height).map(PathBuilder::from_rect);
    }

    let right = x + width;
    let bottom = y + height;
    let mut pb = PathBuilder::new();

    pb.move_to(x + tl, y);
    pb.line_to(right - tr, y);
    if tr > 0.0 {
        pb.cubic_to(
            right - tr + tr * KAPPA,
            y,
            right,
            y + tr - tr * KAPPA,
            right,
            y + tr,
        );
    }
    pb.line_to(right, bottom - br);
    if br > 0.0 {
        pb.cubic_to(
            right,
            bottom - br + br * KAPPA,
            right - br + br * KAPPA,
            bottom,
            right - br,
            bottom,
        );
    }
    pb.line_to(x + bl, bottom);
    if bl > 0.0 {
        pb.cubic_to(
            x + bl - bl * KAPPA,
            bottom,
            x,
            bottom - bl + bl * KAPPA,
            x,
            bottom - bl,
        );
    }
    pb.line_to(x, y + tl);
    if tl > 0.0 {
        pb.cubic_to(x, y + tl - tl * KAPPA, x + tl - tl * KAPPA, y, x + tl, y);
    }
    pb.close();
    pb.finish()
}

/// Whether `(px, py)` lies inside the rounded box. Edges are inclusive.
pub fn contains_rounded(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    radii: [f32; 4],
    px: f32,
    py: f32,
) -> bool {
    if px < x || px > x + width || py < y || py > y + height {
        return false;
    }

    let [tl, tr, br, bl] = clamp_radii(width, height, radii);
    let corners = [
        (tl, x + tl, y + tl, px < x + tl && py < y + tl),
        (tr, x + width - tr, y + tr, px > x + width - tr && py < y + tr),
        (
            br,
            x + width - br,
            y + height - br,
            px > x + width - br && py > y + height - br,
        ),
        (bl, x + bl, y + height - bl, px < x + bl && py > y + height - bl),
    ];

    for (radius, cx, cy, in_corner) in corners {
        if radius > 0.0 && in_corner {
            let dx = px - cx;
            let dy = py - cy;
            return dx * dx + dy * dy <= radius * radius;
        }
    }
    true
}

/// Non-zero winding test of a point against a path.
///
/// Curves are flattened into [`CURVE_STEPS`] line segments each; open
/// contours are treated as closed.
pub fn contains_path(path: &Path, px: f32, py: f32) -> bool {
    let bounds = path.bounds();
    if px < bounds.left() || px > bounds.right() || py < bounds.top() || py > bounds.bottom() {
        return false;
    }

    let mut winding = 0;
    let mut start = Point::zero();
    let mut current = Point::zero();

    let mut edge = |from: Point, to: Point| {
        winding += crossing(from, to, px, py);
    };

    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                if current != start {
                    edge(current, start);
                }
                start = p;
                current = p;
            }
            PathSegment::LineTo(p) => {
                edge(current, p);
                current = p;
            }
            PathSegment::QuadTo(c, p) => {
                let from = current;
                let mut prev = from;
                for i in 1..=CURVE_STEPS {
                    let t = i as f32 / CURVE_STEPS as f32;
                    let mt = 1.0 - t;
                    let next = Point::from_xy(
                        mt * mt * from.x + 2.0 * mt * t * c.x + t * t * p.x,
                        mt * mt * from.y + 2.0 * mt * t * c.y + t * t * p.y,
                    );
                    edge(prev, next);
                    prev = next;
                }
                current = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let from = current;
                let mut prev = from;
                for i in 1..=CURVE_STEPS {
                    let t = i as f32 / CURVE_STEPS as f32;
                    let mt = 1.0 - t;
                    let a = mt * mt * mt;
                    let b = 3.0 * mt * mt * t;
                    let c = 3.0 * mt * t * t;
                    let d = t * t * t;
                    let next = Point::from_xy(
                        a * from.x + b * c1.x + c * c2.x + d * p.x,
                        a * from.y + b * c1.y + c * c2.y + d * p.y,
                    );
                    edge(prev, next);
                    prev = next;
                }
                current = p;
            }
            PathSegment::Close => {
                edge(current, start);
                current = start;
            }
        }
    }
    if current != start {
        edge(current, start);
    }

    winding != 0
}

/// Signed crossing of an upward ray-cast edge, for the winding count.
fn crossing(from: Point, to: Point, px: f32, py: f32) -> i32 {
    let side = (to.x - from.x) * (py - from.y) - (px - from.x) * (to.y - from.y);
    if from.y <= py {
        if to.y > py && side > 0.0 {
            return 1;
        }
    } else if to.y <= py && side < 0.0 {
        return -1;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Path {
        let mut pb = PathBuilder::new();
        pb.move_to(0.0, 0.0);
        pb.line_to(100.0, 0.0);
        pb.line_to(0.0, 100.0);
        pb.close();
        pb.finish().unwrap()
    }

    #[test]
    fn test_clamp_radii() {
        assert_eq!(
            clamp_radii(20.0, 10.0, [2.0, 50.0, -1.0, 5.0]),
            [2.0, 5.0, 0.0, 5.0]
        );
    }

    #[test]
    fn test_rounded_rect_empty() {
        assert!(rounded_rect(0.0, 0.0, 0.0, 10.0, [0.0; 4]).is_none());
        let path = rounded_rect(0.0, 0.0, 40.0, 20.0, [6.0; 4]).unwrap();
        let bounds = path.bounds();
        assert_eq!(bounds.width(), 40.0);
        assert_eq!(bounds.height(), 20.0);
    }

    #[test]
    fn test_contains_rounded_corners() {
        let radii = [10.0; 4];
        // Center and edge midpoints are inside
        assert!(contains_rounded(0.0, 0.0, 100.0, 50.0, radii, 50.0, 25.0));
        assert!(contains_rounded(0.0, 0.0, 100.0, 50.0, radii, 50.0, 0.0));
        // Corner pixel is cut off
        assert!(!contains_rounded(0.0, 0.0, 100.0, 50.0, radii, 1.0, 1.0));
        assert!(!contains_rounded(0.0, 0.0, 100.0, 50.0, radii, 99.0, 49.0));
        // Square box keeps its corners
        assert!(contains_rounded(0.0, 0.0, 100.0, 50.0, [0.0; 4], 0.0, 0.0));
    }

    #[test]
    fn test_contains_path_triangle() {
        let path = triangle();
        assert!(contains_path(&path, 10.0, 10.0));
        assert!(!contains_path(&path, 80.0, 80.0));
        assert!(!contains_path(&path, -1.0, 10.0));
    }

    #[test]
    fn test_contains_path_curve() {
        let path = rounded_rect(0.0, 0.0, 100.0, 100.0, [50.0; 4]).unwrap();
        assert!(contains_path(&path, 50.0, 50.0));
        assert!(!contains_path(&path, 3.0, 3.0));
    }

    #[test]
    fn test_non_zero_winding_fills_overlap() {
        // Two overlapping squares with the same orientation
        let mut pb = PathBuilder::new();
        pb.push_rect(Rect::from_xywh(0.0, 0.0, 20.0, 20.0).unwrap());
        pb.push_rect(Rect::from_xywh(10.0, 10.0, 20.0, 20.0).unwrap());
        let path = pb.finish().unwrap();
        assert!(contains_path(&path, 15.0, 15.0));
        assert!(contains_path(&path, 25.0, 25.0));
        assert!(!contains_path(&path, 25.0, 5.0));
    }
}
