//! A small immediate-mode 2D context over a `tiny_skia` pixmap.
//!
//! Nodes paint through this instead of touching the pixmap directly so that
//! the current transform, clip stack and global alpha are applied uniformly.

use std::path::Path as FsPath;

use resvg::tiny_skia::{
    BlendMode, FillRule, GradientStop, IntRect, LinearGradient, Mask, Paint, Path, Pixmap,
    PixmapPaint, PixmapRef, Point, SpreadMode, Stroke, StrokeDash, Transform,
};

use crate::error::ResourceError;
use crate::matrix::Matrix;
use crate::shape;
use crate::style::{Color, Gradient};

pub struct Canvas {
    pixmap: Pixmap,
    transform: Matrix,
    clips: Vec<Mask>,
    alpha: f32,
    blend: BlendMode,
}

impl Canvas {
    /// A transparent canvas. Zero-sized surfaces are bumped to 1x1.
    pub fn new(width: u32, height: u32) -> Result<Self, ResourceError> {
        let pixmap = allocate(width, height)?;
        Ok(Self {
            pixmap,
            transform: Matrix::IDENTITY,
            clips: Vec::new(),
            alpha: 1.0,
            blend: BlendMode::SourceOver,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.pixmap = allocate(width, height)?;
        self.clips.clear();
        Ok(())
    }

    pub fn transform(&self) -> Matrix {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Matrix) {
        self.transform = transform;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// How subsequent draws combine with the pixels already present.
    pub fn set_blend_mode(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    /// Reset to a transparent surface with no clip and identity transform.
    pub fn clear(&mut self) {
        self.pixmap.fill(resvg::tiny_skia::Color::TRANSPARENT);
        self.clips.clear();
        self.transform = Matrix::IDENTITY;
        self.alpha = 1.0;
        self.blend = BlendMode::SourceOver;
    }

    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(color.to_skia());
    }

    /// Intersect the current clip with `path` under the current transform.
    pub fn push_clip(&mut self, path: &Path) {
        let transform = self.transform.to_skia();
        let mask = match self.clips.last() {
            Some(current) => {
                let mut mask = current.clone();
                mask.intersect_path(path, FillRule::Winding, true, transform);
                Some(mask)
            }
            None => Mask::new(self.pixmap.width(), self.pixmap.height()).map(|mut mask| {
                mask.fill_path(path, FillRule::Winding, true, transform);
                mask
            }),
        };

        match mask {
            Some(mask) => self.clips.push(mask),
            None => log::warn!("failed to allocate a clip mask"),
        }
    }

    pub fn pop_clip(&mut self) {
        self.clips.pop();
    }

    pub fn clip_depth(&self) -> usize {
        self.clips.len()
    }

    /// Drop clips pushed after `depth`.
    pub fn truncate_clips(&mut self, depth: usize) {
        self.clips.truncate(depth);
    }

    pub fn fill_path(&mut self, path: &Path, color: Color) {
        if color.is_transparent() {
            return;
        }
        let paint = self.paint(color);
        self.pixmap.fill_path(
            path,
            &paint,
            FillRule::Winding,
            self.transform.to_skia(),
            self.clips.last(),
        );
    }

    /// Fill `path` with a linear gradient whose points are in local space
    /// units of `scale`.
    pub fn fill_path_gradient(&mut self, path: &Path, gradient: &Gradient, scale: f32) {
        let stops = gradient
            .stops
            .iter()
            .map(|(offset, color)| {
                GradientStop::new(*offset, color.with_alpha(color.a * self.alpha).to_skia())
            })
            .collect::<Vec<_>>();
        if stops.is_empty() {
            return;
        }
        let [x0, y0] = gradient.start;
        let [x1, y1] = gradient.end;
        let Some(shader) = LinearGradient::new(
            Point::from_xy(x0 * scale, y0 * scale),
            Point::from_xy(x1 * scale, y1 * scale),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            log::debug!("degenerate gradient {gradient:?}");
            return;
        };

        let mut paint = self.paint(Color::TRANSPARENT);
        paint.shader = shader;
        self.pixmap.fill_path(
            path,
            &paint,
            FillRule::Winding,
            self.transform.to_skia(),
            self.clips.last(),
        );
    }

    /// Stroke `path`. `dash` alternates on and off lengths in device
    /// pixels; an empty pattern strokes solid.
    pub fn stroke_path(&mut self, path: &Path, color: Color, width: f32, dash: &[f32]) {
        if color.is_transparent() || width <= 0.0 {
            return;
        }
        let paint = self.paint(color);
        let stroke = Stroke {
            width,
            dash: dash_pattern(dash),
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            path,
            &paint,
            &stroke,
            self.transform.to_skia(),
            self.clips.last(),
        );
    }

    /// Draw `image` with its top-left corner at `(x, y)` in local space.
    pub fn draw_pixmap(&mut self, image: PixmapRef, x: f32, y: f32) {
        let transform = Matrix::from_translate(x, y).then(&self.transform);
        self.blit(image, transform);
    }

    /// Draw `image` stretched into the `width` x `height` box at `(x, y)`.
    pub fn draw_pixmap_scaled(&mut self, image: PixmapRef, x: f32, y: f32, width: f32, height: f32) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let transform = Matrix::from_scale(
            width / image.width() as f32,
            height / image.height() as f32,
        )
        .translate(x, y)
        .then(&self.transform);
        self.blit(image, transform);
    }

    /// Draw the `source` sub-rectangle of `image` into the destination box.
    pub fn draw_pixmap_region(
        &mut self,
        image: PixmapRef,
        source: IntRect,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) {
        match image.clone_rect(source) {
            Some(region) => self.draw_pixmap_scaled(region.as_ref(), x, y, width, height),
            None => log::warn!("sprite region {source:?} lies outside the image"),
        }
    }

    /// Whether `(x, y)` in device space is inside `path` drawn with the
    /// current transform.
    pub fn is_point_in_path(&self, path: &Path, x: f32, y: f32) -> bool {
        let (lx, ly) = self.transform.invert().apply(x, y);
        shape::contains_path(path, lx, ly)
    }

    /// Copy the canvas into a straight-alpha RGBA image.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut data = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        image::RgbaImage::from_raw(self.width(), self.height(), data)
            .unwrap_or_else(|| image::RgbaImage::new(self.width(), self.height()))
    }

    pub fn save_png(&self, path: impl AsRef<FsPath>) -> Result<(), ResourceError> {
        self.to_rgba_image()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    fn blit(&mut self, image: PixmapRef, transform: Matrix) {
        let paint = PixmapPaint {
            opacity: self.alpha,
            blend_mode: self.blend,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            image,
            &paint,
            transform.to_skia(),
            self.clips.last(),
        );
    }

    fn paint(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.with_alpha(color.a * self.alpha).to_skia());
        paint.anti_alias = true;
        paint.blend_mode = self.blend;
        paint
    }
}

/// Odd patterns repeat, as with `setLineDash`. Patterns that cannot be
/// drawn (all zero) fall back to a solid line.
fn dash_pattern(dash: &[f32]) -> Option<StrokeDash> {
    if dash.is_empty() {
        return None;
    }
    let mut intervals = dash.to_vec();
    if intervals.len() % 2 == 1 {
        intervals.extend_from_slice(dash);
    }
    StrokeDash::new(intervals, 0.0)
}

pub(crate) fn allocate(width: u32, height: u32) -> Result<Pixmap, ResourceError> {
    let (width, height) = (width.max(1), height.max(1));
    Pixmap::new(width, height).ok_or(ResourceError::Allocation { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use resvg::tiny_skia::{PathBuilder, Rect};

    fn square(size: f32) -> Path {
        PathBuilder::from_rect(Rect::from_xywh(0.0, 0.0, size, size).unwrap())
    }

    fn pixel(canvas: &Canvas, x: u32, y: u32) -> [u8; 4] {
        let c = canvas.pixmap().pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn test_fill_respects_transform() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.set_transform(Matrix::from_translate(10.0, 10.0));
        canvas.fill_path(&square(5.0), Color::rgb(1.0, 0.0, 0.0));

        assert_eq!(pixel(&canvas, 12, 12), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 2, 2)[3], 0);
    }

    #[test]
    fn test_clip_stack() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.push_clip(&square(10.0));
        assert_eq!(canvas.clip_depth(), 1);
        canvas.fill_path(&square(20.0), Color::WHITE);
        assert_eq!(pixel(&canvas, 5, 5)[3], 255);
        assert_eq!(pixel(&canvas, 15, 15)[3], 0);

        canvas.pop_clip();
        canvas.fill_path(&square(20.0), Color::WHITE);
        assert_eq!(pixel(&canvas, 15, 15)[3], 255);
    }

    #[test]
    fn test_alpha_applies_to_fill() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        canvas.set_alpha(0.5);
        canvas.fill_path(&square(4.0), Color::BLACK);
        let alpha = pixel(&canvas, 1, 1)[3];
        assert!((126..=129).contains(&alpha));
    }

    #[test]
    fn test_draw_pixmap_offsets() {
        let mut src = Pixmap::new(2, 2).unwrap();
        src.fill(resvg::tiny_skia::Color::from_rgba8(0, 0, 255, 255));

        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.draw_pixmap(src.as_ref(), 4.0, 4.0);
        assert_eq!(pixel(&canvas, 4, 4), [0, 0, 255, 255]);
        assert_eq!(pixel(&canvas, 7, 7)[3], 0);
    }

    #[test]
    fn test_point_in_path_uses_transform() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.set_transform(Matrix::from_translate(100.0, 0.0));
        assert!(canvas.is_point_in_path(&square(10.0), 105.0, 5.0));
        assert!(!canvas.is_point_in_path(&square(10.0), 5.0, 5.0));
    }

    #[test]
    fn test_zero_size_is_bumped() {
        let canvas = Canvas::new(0, 0).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (1, 1));
    }

    #[test]
    fn test_dashed_stroke_leaves_gaps() {
        let mut canvas = Canvas::new(40, 10).unwrap();
        let mut builder = PathBuilder::new();
        builder.move_to(0.0, 5.0);
        builder.line_to(40.0, 5.0);
        let line = builder.finish().unwrap();

        canvas.stroke_path(&line, Color::BLACK, 2.0, &[10.0]);
        assert_eq!(pixel(&canvas, 5, 5)[3], 255);
        assert_eq!(pixel(&canvas, 15, 5)[3], 0);
        assert_eq!(pixel(&canvas, 25, 5)[3], 255);
    }

    #[test]
    fn test_gradient_fill_runs_between_stops() {
        let mut canvas = Canvas::new(20, 4).unwrap();
        let gradient = Gradient::linear([0.0, 0.0], [10.0, 0.0])
            .stop(0.0, Color::rgb(1.0, 0.0, 0.0))
            .stop(1.0, Color::rgb(0.0, 0.0, 1.0));
        canvas.fill_path_gradient(&square(20.0), &gradient, 2.0);

        let left = pixel(&canvas, 0, 1);
        let right = pixel(&canvas, 19, 1);
        assert!(left[0] > 240 && left[2] < 15, "{left:?}");
        assert!(right[2] > 240 && right[0] < 15, "{right:?}");
        assert_eq!(right[3], 255);
    }

    #[test]
    fn test_blend_mode_applies_to_fills() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.fill_path(&square(10.0), Color::BLACK);
        canvas.set_blend_mode(BlendMode::DestinationOut);
        canvas.fill_path(&square(5.0), Color::WHITE);

        assert_eq!(pixel(&canvas, 2, 2)[3], 0);
        assert_eq!(pixel(&canvas, 8, 8)[3], 255);

        canvas.clear();
        canvas.fill_path(&square(5.0), Color::WHITE);
        assert_eq!(pixel(&canvas, 2, 2)[3], 255);
    }
}
