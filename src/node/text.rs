use crate::canvas::Canvas;
use crate::style::Style;
use crate::text::Font;

use super::{paint_box, Clippable, ComputedLayout, Env, Layoutable, Measure, PaintStatus, Paintable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextLine {
    pub text: String,
    pub width: f32,
}

/// A block of text. Lines break on `\n` and, when wrapping is enabled and
/// the width is fixed, wherever the next character would overflow.
#[derive(Debug, Clone)]
pub struct TextNode {
    text: String,
    font: Font,
    align: TextAlign,
    wrap: bool,
    lines: Vec<TextLine>,
    /// Font scaled to device pixels at the last measure
    device_font: Font,
    line_height: f32,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: Font::default(),
            align: TextAlign::Left,
            wrap: true,
            lines: Vec::new(),
            device_font: Font::default(),
            line_height: 0.0,
        }
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        true
    }

    pub(crate) fn set_font(&mut self, font: Font) -> bool {
        if self.font == font {
            return false;
        }
        self.font = font;
        true
    }

    pub(crate) fn set_align(&mut self, align: TextAlign) -> bool {
        if self.align == align {
            return false;
        }
        self.align = align;
        true
    }

    fn break_lines(&self, env: &mut Env, max_width: Option<f32>) -> Vec<TextLine> {
        let mut lines = Vec::new();

        for paragraph in self.text.trim_end_matches('\n').split('\n') {
            let mut line = TextLine {
                text: String::new(),
                width: 0.0,
            };

            for c in paragraph.chars() {
                let mut buf = [0u8; 4];
                let advance = env.text.measure(c.encode_utf8(&mut buf), &self.device_font);

                if let Some(max) = max_width {
                    if !line.text.is_empty() && line.width + advance > max {
                        lines.push(std::mem::replace(
                            &mut line,
                            TextLine {
                                text: String::new(),
                                width: 0.0,
                            },
                        ));
                    }
                }

                line.text.push(c);
                line.width += advance;
            }
            lines.push(line);
        }

        if self.text.is_empty() {
            lines.clear();
        }
        lines
    }
}

impl Layoutable for TextNode {
    fn measure(
        &mut self,
        _style: &Style,
        fixed_width: Option<f32>,
        _fixed_height: Option<f32>,
        env: &mut Env,
    ) -> Measure {
        self.device_font = self.font.scaled(env.dpr);
        self.line_height = env.text.line_height(&self.device_font);

        let max_width = if self.wrap { fixed_width } else { None };
        self.lines = self.break_lines(env, max_width);

        let width = self.lines.iter().fold(0.0f32, |w, line| w.max(line.width));
        Measure::Ready {
            width: Some(width),
            height: Some(self.lines.len() as f32 * self.line_height),
        }
    }
}

impl Paintable for TextNode {
    fn paint(&self, style: &Style, layout: &ComputedLayout, canvas: &mut Canvas, env: &mut Env) -> PaintStatus {
        if style.has_fill() || layout.border > 0.0 {
            paint_box(style, layout, canvas, env.dpr);
        }

        for (i, line) in self.lines.iter().enumerate() {
            let spare = (layout.width - line.width).max(0.0);
            let x = match self.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => spare / 2.0,
                TextAlign::Right => spare,
            };
            let y = i as f32 * self.line_height;

            if let Some(bitmap) = env.text.rasterize(&line.text, &self.device_font, style.color) {
                canvas.draw_pixmap(bitmap.as_ref(), x, y);
            }
        }
        PaintStatus::Done
    }
}

impl Clippable for TextNode {}
