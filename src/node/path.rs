use resvg::tiny_skia::{Path, Transform};

use crate::bounding_rect::BoundingRect;
use crate::canvas::Canvas;
use crate::shape;
use crate::style::Style;

use super::{
    fill_background, stroke_border, Clippable, ComputedLayout, Env, Layoutable, Measure, PaintStatus,
    Paintable,
};

/// An arbitrary vector path.
///
/// Path coordinates are logical pixels in the parent's content frame; the
/// node is not positioned by left/top. Rotation and scale still apply about
/// the node's origin within the path bounds. The interior is filled with
/// `background` and the outline stroked with `border_color`.
#[derive(Debug, Clone, Default)]
pub struct PathNode {
    path: Option<Path>,
    device_path: Option<Path>,
}

impl PathNode {
    pub fn new(path: Path) -> Self {
        Self {
            path: Some(path),
            device_path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub(crate) fn set_path(&mut self, path: Option<Path>) {
        self.path = path;
        self.device_path = None;
    }
}

impl Layoutable for PathNode {
    fn measure(&mut self, _style: &Style, _: Option<f32>, _: Option<f32>, env: &mut Env) -> Measure {
        self.device_path = self
            .path
            .clone()
            .and_then(|path| path.transform(Transform::from_scale(env.dpr, env.dpr)));

        let bounds = self.local_frame().unwrap_or_default();
        Measure::Ready {
            width: Some(bounds.width),
            height: Some(bounds.height),
        }
    }

    fn local_frame(&self) -> Option<BoundingRect> {
        self.device_path.as_ref().map(|path| {
            let b = path.bounds();
            BoundingRect::new(b.x(), b.y(), b.width(), b.height())
        })
    }
}

impl Paintable for PathNode {
    fn paint(&self, style: &Style, _layout: &ComputedLayout, canvas: &mut Canvas, env: &mut Env) -> PaintStatus {
        let Some(path) = &self.device_path else {
            return PaintStatus::Done;
        };

        fill_background(style, path, canvas, env.dpr);
        let width = if style.border > 0.0 {
            style.border * env.dpr
        } else {
            env.dpr
        };
        stroke_border(style, path, width, canvas, env.dpr);
        PaintStatus::Done
    }
}

impl Clippable for PathNode {
    fn clip_path(&self, _layout: &ComputedLayout) -> Option<Path> {
        self.device_path.clone()
    }

    fn contains_local(&self, _layout: &ComputedLayout, x: f32, y: f32) -> bool {
        self.device_path
            .as_ref()
            .is_some_and(|path| shape::contains_path(path, x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoResources;
    use crate::text::MonospaceMeasurer;
    use resvg::tiny_skia::PathBuilder;

    #[test]
    fn test_measure_uses_scaled_bounds() {
        let mut pb = PathBuilder::new();
        pb.move_to(10.0, 10.0);
        pb.line_to(30.0, 10.0);
        pb.line_to(30.0, 50.0);
        pb.close();
        let mut node = PathNode::new(pb.finish().unwrap());

        let mut text = MonospaceMeasurer::new();
        let mut env = Env {
            dpr: 2.0,
            resources: &NoResources,
            text: &mut text,
        };
        let m = node.measure(&Style::default(), None, None, &mut env);

        assert_eq!(
            m,
            Measure::Ready {
                width: Some(40.0),
                height: Some(80.0)
            }
        );
        assert_eq!(
            node.local_frame(),
            Some(BoundingRect::new(20.0, 20.0, 40.0, 80.0))
        );
        assert!(node.contains_local(&ComputedLayout::default(), 55.0, 30.0));
        assert!(!node.contains_local(&ComputedLayout::default(), 25.0, 90.0));
    }
}
