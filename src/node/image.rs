use resvg::tiny_skia::{IntRect, Pixmap};

use crate::canvas::Canvas;
use crate::resource::Resource;
use crate::shape;
use crate::style::{Color, Style};

use super::{Clippable, ComputedLayout, Env, Layoutable, Measure, PaintStatus, Paintable};

const PLACEHOLDER: Color = Color::rgb(0.6, 0.6, 0.6);

/// Side of the outlined box shown for a missing image, in logical pixels.
pub const PLACEHOLDER_SIZE: f32 = 24.0;

/// One frame of a sprite sheet laid out as a row-major grid of
/// `width` x `height` cells (image pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteCell {
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

impl SpriteCell {
    /// Source rectangle of this cell inside a `image_width` x `image_height`
    /// sheet. Cells past the end clamp to the last row.
    pub fn source_rect(&self, image_width: u32, image_height: u32) -> Option<IntRect> {
        let w = self.width.min(image_width);
        let h = self.height.min(image_height);
        if w == 0 || h == 0 {
            return None;
        }

        let columns = (image_width / w).max(1);
        let x = (self.index % columns) * w;
        let y = ((self.index / columns) * h).min(image_height - h);
        IntRect::from_xywh(x as i32, y as i32, w, h)
    }
}

/// A bitmap loaded through the scene's resource loader.
///
/// With both sides `auto` the node takes the image's natural size; with one
/// side fixed the other follows the aspect ratio.
#[derive(Debug, Clone, Default)]
pub struct ImageNode {
    src: Option<String>,
    cell: Option<SpriteCell>,
}

impl ImageNode {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            cell: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, cell: SpriteCell) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn cell(&self) -> Option<SpriteCell> {
        self.cell
    }

    /// Returns the previous source when it changed.
    pub(crate) fn set_src(&mut self, src: Option<&str>) -> Option<Option<String>> {
        if self.src.as_deref() == src {
            return None;
        }
        Some(std::mem::replace(&mut self.src, src.map(str::to_string)))
    }

    pub(crate) fn set_cell(&mut self, cell: Option<SpriteCell>) -> bool {
        if self.cell == cell {
            return false;
        }
        self.cell = cell;
        true
    }
}

impl Layoutable for ImageNode {
    fn measure(
        &mut self,
        _style: &Style,
        fixed_width: Option<f32>,
        fixed_height: Option<f32>,
        env: &mut Env,
    ) -> Measure {
        if fixed_width.is_some() && fixed_height.is_some() {
            return Measure::NONE;
        }

        let bitmap = match self.src.as_deref().map(|src| env.resources.get(src)) {
            Some(Resource::Ready(bitmap)) => bitmap,
            Some(Resource::Pending) => return Measure::Pending,
            Some(Resource::Unavailable) | None => {
                let side = PLACEHOLDER_SIZE * env.dpr;
                return Measure::Ready {
                    width: Some(fixed_width.unwrap_or(side)),
                    height: Some(fixed_height.unwrap_or(side)),
                };
            }
        };

        let (natural_w, natural_h) = match self.cell {
            Some(cell) => (
                cell.width.min(bitmap.width()) as f32,
                cell.height.min(bitmap.height()) as f32,
            ),
            None => (bitmap.width() as f32, bitmap.height() as f32),
        };
        if natural_w <= 0.0 || natural_h <= 0.0 {
            return Measure::Ready {
                width: Some(0.0),
                height: Some(0.0),
            };
        }

        let (width, height) = match (fixed_width, fixed_height) {
            (Some(w), None) => (w, w * natural_h / natural_w),
            (None, Some(h)) => (h * natural_w / natural_h, h),
            _ => (natural_w, natural_h),
        };
        Measure::Ready {
            width: Some(width),
            height: Some(height),
        }
    }
}

impl Paintable for ImageNode {
    fn paint(&self, _style: &Style, layout: &ComputedLayout, canvas: &mut Canvas, env: &mut Env) -> PaintStatus {
        let (w, h) = (layout.width, layout.height);

        match self.src.as_deref().map(|src| env.resources.get(src)) {
            Some(Resource::Ready(bitmap)) => {
                let pixmap: &Pixmap = &bitmap;
                let region = self
                    .cell
                    .and_then(|cell| cell.source_rect(pixmap.width(), pixmap.height()));
                match region {
                    Some(region) => {
                        canvas.draw_pixmap_region(pixmap.as_ref(), region, 0.0, 0.0, w, h)
                    }
                    None => canvas.draw_pixmap_scaled(pixmap.as_ref(), 0.0, 0.0, w, h),
                }
                PaintStatus::Done
            }
            Some(Resource::Pending) => PaintStatus::Suspended,
            Some(Resource::Unavailable) | None => {
                if let Some(outline) = shape::rounded_rect(0.5, 0.5, w - 1.0, h - 1.0, [0.0; 4]) {
                    canvas.stroke_path(&outline, PLACEHOLDER, 1.0, &[]);
                }
                PaintStatus::Done
            }
        }
    }
}

impl Clippable for ImageNode {}
