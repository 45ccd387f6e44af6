//! Text measurement and rasterization.
//!
//! Layout only needs widths and line heights; painting asks for a bitmap of
//! one line at a time. Both go through [`TextMeasure`] so a headless
//! implementation can stand in for the real font stack.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use resvg::tiny_skia::{Paint, Pixmap, Rect, Transform};

use crate::style::Color;

/// Font description. `size` is in whatever unit the caller works in;
/// nodes scale it by the device pixel ratio before measuring.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub family: Option<String>,
    pub size: f32,
    pub weight: u16,
    /// Explicit line height, defaults to 1.2 × size
    pub line_height: Option<f32>,
}

impl Font {
    pub fn new(size: f32) -> Self {
        Self {
            family: None,
            size,
            weight: 400,
            line_height: None,
        }
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn line_height(mut self, line_height: f32) -> Self {
        self.line_height = Some(line_height);
        self
    }

    pub fn scaled(&self, factor: f32) -> Font {
        Font {
            family: self.family.clone(),
            size: self.size * factor,
            weight: self.weight,
            line_height: self.line_height.map(|h| h * factor),
        }
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(12.0)
    }
}

impl Eq for Font {}

impl Hash for Font {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.size.to_bits().hash(state);
        self.weight.hash(state);
        self.line_height.map(f32::to_bits).hash(state);
    }
}

pub trait TextMeasure {
    /// Advance width of a single line.
    fn measure(&mut self, text: &str, font: &Font) -> f32;

    fn line_height(&mut self, font: &Font) -> f32 {
        font.line_height.unwrap_or(font.size * 6.0 / 5.0)
    }

    /// Render one line of text. `None` means nothing to draw.
    fn rasterize(&mut self, text: &str, font: &Font, color: Color) -> Option<Pixmap> {
        let _ = (text, font, color);
        None
    }
}

/// Fixed-advance measurer for headless use.
///
/// Every character advances `0.6 × size`; glyphs rasterize as solid blocks.
#[derive(Debug, Default, Clone)]
pub struct MonospaceMeasurer;

impl MonospaceMeasurer {
    pub fn new() -> Self {
        Self
    }

    pub fn advance(font: &Font) -> f32 {
        font.size * 3.0 / 5.0
    }
}

impl TextMeasure for MonospaceMeasurer {
    fn measure(&mut self, text: &str, font: &Font) -> f32 {
        text.chars().count() as f32 * Self::advance(font)
    }

    fn rasterize(&mut self, text: &str, font: &Font, color: Color) -> Option<Pixmap> {
        let width = self.measure(text, font).ceil() as u32;
        let height = self.line_height(font).ceil() as u32;
        let mut pixmap = Pixmap::new(width, height)?;

        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        let advance = Self::advance(font);
        let top = (height as f32 - font.size * 0.7) / 2.0;

        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            if let Some(rect) =
                Rect::from_xywh(i as f32 * advance, top, advance * 0.8, font.size * 0.7)
            {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
        Some(pixmap)
    }
}

/// Measurer backed by `cosmic-text` shaping with system fonts.
pub struct CosmicTextMeasurer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    widths: HashMap<(String, Font), f32>,
}

impl CosmicTextMeasurer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            widths: HashMap::new(),
        }
    }

    fn shape(&mut self, text: &str, font: &Font) -> Buffer {
        let line_height = self.line_height(font);
        let metrics = Metrics::new(font.size, line_height);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);

        let family = match &font.family {
            Some(name) => Family::Name(name.as_str()),
            None => Family::SansSerif,
        };
        let attrs = Attrs::new().family(family).weight(Weight(font.weight));

        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, true);
        buffer
    }
}

impl Default for CosmicTextMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasurer {
    fn measure(&mut self, text: &str, font: &Font) -> f32 {
        let key = (text.to_string(), font.clone());
        if let Some(width) = self.widths.get(&key) {
            return *width;
        }

        let buffer = self.shape(text, font);
        let width = buffer
            .layout_runs()
            .fold(0.0f32, |width, run| width.max(run.line_w));

        self.widths.insert(key, width);
        width
    }

    fn rasterize(&mut self, text: &str, font: &Font, color: Color) -> Option<Pixmap> {
        let width = self.measure(text, font).ceil() as u32;
        let height = self.line_height(font).ceil() as u32;
        let mut pixmap = Pixmap::new(width.max(1), height.max(1))?;

        let mut buffer = self.shape(text, font);
        let text_color = cosmic_text::Color::rgba(
            (color.r * 255.0) as u8,
            (color.g * 255.0) as u8,
            (color.b * 255.0) as u8,
            (color.a * 255.0) as u8,
        );

        let mut paint = Paint::default();
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            text_color,
            |x, y, w, h, c| {
                if c.a() == 0 {
                    return;
                }
                let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) else {
                    return;
                };
                paint.set_color_rgba8(c.r(), c.g(), c.b(), c.a());
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            },
        );
        Some(pixmap)
    }
}
