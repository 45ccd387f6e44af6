//! Scene nodes.
//!
//! Every node is a [`Node`]: the shared record (style, computed layout,
//! dirty flags, cached bitmap, hit memo) plus a [`NodeKind`] holding the
//! kind-specific data. Kinds are composed from four capabilities:
//!
//! - [`Layoutable`]: intrinsic sizing for `auto` lengths
//! - [`Paintable`]: drawing the node's own pixels in its local frame
//! - [`Clippable`]: the node's shape, for clipping and hit-testing
//! - [`HasChildren`]: an ordered child list (containers only)
//!
//! The algorithms that need the whole tree (layout, paint walk, picking)
//! live in `layout`, `paint` and `hit_test` and reach kinds only through
//! these traits.

mod container;
mod image;
mod path;
mod text;

use std::collections::HashMap;

use bitflags::bitflags;
use resvg::tiny_skia::{Path, Pixmap};

use crate::bounding_rect::BoundingRect;
use crate::canvas::Canvas;
use crate::matrix::Matrix;
use crate::resource::ResourceLoader;
use crate::shape;
use crate::style::Style;
use crate::text::TextMeasure;
use crate::tree::Owner;

pub use container::{Arrangement, Container};
pub use image::{ImageNode, SpriteCell};
pub use path::PathNode;
pub use text::{TextAlign, TextNode};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// Size, transform and world rect are stale
        const LAYOUT  = 0b01;
        /// The node changed since it was last painted
        const REPAINT = 0b10;
    }
}

/// Collaborators needed while laying out and painting.
pub struct Env<'a> {
    pub dpr: f32,
    pub resources: &'a dyn ResourceLoader,
    pub text: &'a mut dyn TextMeasure,
}

/// Result of intrinsic sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// Content size per axis in device pixels. `None` falls back to the
    /// full base size.
    Ready {
        width: Option<f32>,
        height: Option<f32>,
    },
    /// Content is not available yet (image still decoding)
    Pending,
}

impl Measure {
    pub const NONE: Measure = Measure::Ready {
        width: None,
        height: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStatus {
    Done,
    Suspended,
}

pub trait Layoutable {
    /// Intrinsic size for the axes whose length is `auto`. `fixed_*` holds
    /// the axes that already resolved to a value.
    fn measure(
        &mut self,
        style: &Style,
        fixed_width: Option<f32>,
        fixed_height: Option<f32>,
        env: &mut Env,
    ) -> Measure {
        let _ = (style, fixed_width, fixed_height, env);
        Measure::NONE
    }

    /// Path-like nodes draw in their parent's content frame instead of
    /// being positioned by left/top.
    fn local_frame(&self) -> Option<BoundingRect> {
        None
    }
}

pub trait Paintable {
    /// Draw the node. The canvas transform already maps the node's local
    /// frame to the target surface.
    fn paint(&self, style: &Style, layout: &ComputedLayout, canvas: &mut Canvas, env: &mut Env)
        -> PaintStatus;
}

pub trait Clippable {
    /// Content area used when the node clips its children.
    fn clip_path(&self, layout: &ComputedLayout) -> Option<Path> {
        content_outline(layout)
    }

    /// Whether a point in the node's local frame lies on its shape.
    fn contains_local(&self, layout: &ComputedLayout, x: f32, y: f32) -> bool {
        shape::contains_rounded(0.0, 0.0, layout.width, layout.height, layout.radii, x, y)
    }
}

pub trait HasChildren {
    fn children(&self) -> &[crate::tree::NodeId];
    fn children_mut(&mut self) -> &mut Vec<crate::tree::NodeId>;
    fn arrangement(&self) -> Arrangement;
}

/// A plain box: background, border and rounded corners.
#[derive(Debug, Default, Clone)]
pub struct Div;

impl Layoutable for Div {}

impl Paintable for Div {
    fn paint(&self, style: &Style, layout: &ComputedLayout, canvas: &mut Canvas, env: &mut Env) -> PaintStatus {
        paint_box(style, layout, canvas, env.dpr);
        PaintStatus::Done
    }
}

impl Clippable for Div {}

pub enum NodeKind {
    Div(Div),
    Container(Container),
    Text(TextNode),
    Image(ImageNode),
    Path(PathNode),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Div(_) => "div",
            NodeKind::Container(_) => "container",
            NodeKind::Text(_) => "text",
            NodeKind::Image(_) => "image",
            NodeKind::Path(_) => "path",
        }
    }

    /// Style a freshly created node of this kind starts with.
    pub fn default_style(&self) -> Style {
        match self {
            NodeKind::Div(_) => Style::default(),
            NodeKind::Path(_) => Style::auto_sized(),
            NodeKind::Container(c) => match c.arrangement() {
                Arrangement::Free => Style::default(),
                Arrangement::Stack { .. } => Style::auto_sized(),
                Arrangement::Wrap => Style {
                    height: crate::style::Length::Auto,
                    ..Style::default()
                },
            },
            NodeKind::Text(_) => Style {
                height: crate::style::Length::Auto,
                ..Style::default()
            },
            NodeKind::Image(_) => Style::auto_sized(),
        }
    }

    pub fn layoutable(&mut self) -> &mut dyn Layoutable {
        match self {
            NodeKind::Div(n) => n,
            NodeKind::Container(n) => n,
            NodeKind::Text(n) => n,
            NodeKind::Image(n) => n,
            NodeKind::Path(n) => n,
        }
    }

    pub fn local_frame(&self) -> Option<BoundingRect> {
        match self {
            NodeKind::Div(n) => n.local_frame(),
            NodeKind::Container(n) => n.local_frame(),
            NodeKind::Text(n) => n.local_frame(),
            NodeKind::Image(n) => n.local_frame(),
            NodeKind::Path(n) => n.local_frame(),
        }
    }

    pub fn paintable(&self) -> &dyn Paintable {
        match self {
            NodeKind::Div(n) => n,
            NodeKind::Container(n) => n,
            NodeKind::Text(n) => n,
            NodeKind::Image(n) => n,
            NodeKind::Path(n) => n,
        }
    }

    pub fn clippable(&self) -> &dyn Clippable {
        match self {
            NodeKind::Div(n) => n,
            NodeKind::Container(n) => n,
            NodeKind::Text(n) => n,
            NodeKind::Image(n) => n,
            NodeKind::Path(n) => n,
        }
    }

    pub fn children(&self) -> Option<&dyn HasChildren> {
        match self {
            NodeKind::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Container> {
        match self {
            NodeKind::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageNode> {
        match self {
            NodeKind::Image(i) => Some(i),
            _ => None,
        }
    }
}

/// Layout results, all in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedLayout {
    pub width: f32,
    pub height: f32,
    /// Border width after clamping to half the smaller side
    pub border: f32,
    pub radii: [f32; 4],
    pub origin: (f32, f32),
    /// Size of the box percentages resolve against
    pub base: (f32, f32),
    /// Top-left of the box in the parent's content frame
    pub position: (f32, f32),
    /// Local frame → layer pixels
    pub transform: Matrix,
    /// World-space AABB
    pub rect: BoundingRect,
    /// Local-space box (non-zero origin only for path nodes)
    pub bounds: BoundingRect,
}

impl Default for ComputedLayout {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            border: 0.0,
            radii: [0.0; 4],
            origin: (0.0, 0.0),
            base: (0.0, 0.0),
            position: (0.0, 0.0),
            transform: Matrix::IDENTITY,
            rect: BoundingRect::default(),
            bounds: BoundingRect::default(),
        }
    }
}

impl ComputedLayout {
    /// Width and height of the content box.
    pub fn content_size(&self) -> (f32, f32) {
        (
            (self.width - self.border * 2.0).max(0.0),
            (self.height - self.border * 2.0).max(0.0),
        )
    }

    /// Transform children are positioned relative to.
    pub fn content_transform(&self) -> Matrix {
        Matrix::from_translate(self.border, self.border).then(&self.transform)
    }
}

/// Position assigned by an arranging parent, overriding left/top.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Placement {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

/// A rendered bitmap of a static node (and, for containers, its subtree).
pub struct CachedBitmap {
    pub pixmap: Pixmap,
    /// Local-space position of the bitmap's top-left corner
    pub offset: (f32, f32),
}

pub struct Node {
    pub(crate) key: String,
    pub(crate) index: u64,
    pub(crate) owner: Option<Owner>,
    pub(crate) style: Style,
    pub(crate) visible: bool,
    pub(crate) kind: NodeKind,
    pub(crate) layout: ComputedLayout,
    pub(crate) placement: Placement,
    /// Layer viewport, used as the base size of root nodes
    pub(crate) viewport: (f32, f32),
    pub(crate) dirty: DirtyFlags,
    pub(crate) cache: Option<CachedBitmap>,
    pub(crate) hit_memo: HashMap<(u32, u32), bool>,
}

impl Node {
    pub fn new(key: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            key: key.into(),
            index: 0,
            owner: None,
            style: kind.default_style(),
            visible: true,
            kind,
            layout: ComputedLayout::default(),
            placement: Placement::default(),
            viewport: (0.0, 0.0),
            dirty: DirtyFlags::LAYOUT | DirtyFlags::REPAINT,
            cache: None,
            hit_memo: HashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn layout(&self) -> &ComputedLayout {
        &self.layout
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn needs_layout(&self) -> bool {
        self.dirty.contains(DirtyFlags::LAYOUT)
    }

    pub fn needs_repaint(&self) -> bool {
        self.dirty.contains(DirtyFlags::REPAINT)
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container(_))
    }

    pub fn children(&self) -> &[crate::tree::NodeId] {
        self.kind.children().map(|c| c.children()).unwrap_or(&[])
    }

    /// Sort key among siblings.
    pub(crate) fn order(&self) -> (i32, u64) {
        (self.style.z_index, self.index)
    }
}

/// Fill and stroke the node's rounded box in its local frame.
pub(crate) fn paint_box(style: &Style, layout: &ComputedLayout, canvas: &mut Canvas, dpr: f32) {
    let (w, h, b) = (layout.width, layout.height, layout.border);

    if style.has_fill() {
        if let Some(path) = shape::rounded_rect(0.0, 0.0, w, h, layout.radii) {
            fill_background(style, &path, canvas, dpr);
        }
    }

    if b > 0.0 && !style.border_color.is_transparent() {
        let half = b / 2.0;
        let radii = layout.radii.map(|r| (r - half).max(0.0));
        if let Some(path) = shape::rounded_rect(half, half, w - b, h - b, radii) {
            stroke_border(style, &path, b, canvas, dpr);
        }
    }
}

/// The gradient when one is set, the background color otherwise.
pub(crate) fn fill_background(style: &Style, path: &Path, canvas: &mut Canvas, dpr: f32) {
    match &style.gradient {
        Some(gradient) => canvas.fill_path_gradient(path, gradient, dpr),
        None => canvas.fill_path(path, style.background),
    }
}

pub(crate) fn stroke_border(style: &Style, path: &Path, width: f32, canvas: &mut Canvas, dpr: f32) {
    let dash = style.border_dash.iter().map(|d| d * dpr).collect::<Vec<_>>();
    canvas.stroke_path(path, style.border_color, width, &dash);
}

/// The box inside the border.
pub(crate) fn content_outline(layout: &ComputedLayout) -> Option<Path> {
    let b = layout.border;
    let (w, h) = layout.content_size();
    let radii = layout.radii.map(|r| (r - b).max(0.0));
    shape::rounded_rect(b, b, w, h, radii)
}
