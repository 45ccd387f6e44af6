//! Node style record and typed property patches.
//!
//! A [`Style`] is a plain record. It is never mutated field-by-field from the
//! outside: callers build a [`StylePatch`] (a list of [`StyleProp`] values, the
//! tagged union of every settable attribute) and hand it to
//! `Scene::attr`. [`Style::apply`] reports, per property, whether anything
//! changed and what kind of work the change requires ([`ChangeFlags`]).
//!
//! String attribute names map onto typed setters through a fixed dispatch
//! table ([`StylePatch::set`]), which is what animation patches and other
//! data-driven callers use.

use bitflags::bitflags;
use resvg::tiny_skia::BlendMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    fn has_nan(&self) -> bool {
        [self.r, self.g, self.b, self.a].iter().any(|v| v.is_nan())
    }

    pub fn to_skia(&self) -> resvg::tiny_skia::Color {
        resvg::tiny_skia::Color::from_rgba(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
        .unwrap_or(resvg::tiny_skia::Color::TRANSPARENT)
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

/// A length that is resolved against the parent's content box during layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Logical pixels, multiplied by the device pixel ratio at layout time
    Px(f32),
    /// Percentage (0-100) of the parent's content box on the same axis
    Percent(f32),
    /// Size comes from the node's content (text, image, stacked children)
    Auto,
}

impl Length {
    pub fn px(v: f32) -> Self {
        Length::Px(v)
    }

    pub fn percent(v: f32) -> Self {
        Length::Percent(v)
    }

    /// Resolve to device pixels. `Auto` has no value on its own.
    pub fn resolve(&self, base: f32, dpr: f32) -> Option<f32> {
        match self {
            Length::Px(v) => Some(v * dpr),
            Length::Percent(p) => Some(base * p / 100.0),
            Length::Auto => None,
        }
    }

    /// Parse `"25%"`, `"12"`, `"12px"` or `"auto"`. Unparseable numbers become zero.
    pub fn parse(s: &str) -> Length {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            Length::Auto
        } else if let Some(p) = s.strip_suffix('%') {
            Length::Percent(p.trim().parse().unwrap_or(0.0))
        } else {
            Length::Px(s.trim_end_matches("px").trim().parse().unwrap_or(0.0))
        }
    }
}

impl From<f32> for Length {
    fn from(v: f32) -> Self {
        Length::Px(v)
    }
}

impl From<i32> for Length {
    fn from(v: i32) -> Self {
        Length::Px(v as f32)
    }
}

impl From<&str> for Length {
    fn from(s: &str) -> Self {
        Length::parse(s)
    }
}

/// A linear gradient fill in the node's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    /// Logical pixels
    pub start: [f32; 2],
    pub end: [f32; 2],
    /// `(offset, color)` with offsets in [0, 1]
    pub stops: Vec<(f32, Color)>,
}

impl Gradient {
    pub fn linear(start: [f32; 2], end: [f32; 2]) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    pub fn stop(mut self, offset: f32, color: Color) -> Self {
        self.stops.push((offset.clamp(0.0, 1.0), color));
        self
    }

    fn has_nan(&self) -> bool {
        self.start.iter().chain(&self.end).any(|v| v.is_nan())
            || self
                .stops
                .iter()
                .any(|(offset, color)| offset.is_nan() || color.has_nan())
    }
}

/// How a node's pixels combine with what is already on the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOp {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    SourceAtop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    /// Adds the channels
    Lighter,
    Darken,
    /// Replaces the destination
    Copy,
    Xor,
}

impl CompositeOp {
    /// Parse a canvas operation name such as `"destination-out"`.
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name.trim() {
            "source-over" => CompositeOp::SourceOver,
            "source-in" => CompositeOp::SourceIn,
            "source-out" => CompositeOp::SourceOut,
            "source-atop" => CompositeOp::SourceAtop,
            "destination-over" => CompositeOp::DestinationOver,
            "destination-in" => CompositeOp::DestinationIn,
            "destination-out" => CompositeOp::DestinationOut,
            "destination-atop" => CompositeOp::DestinationAtop,
            "lighter" => CompositeOp::Lighter,
            "darken" => CompositeOp::Darken,
            "copy" => CompositeOp::Copy,
            "xor" => CompositeOp::Xor,
            _ => return None,
        };
        Some(op)
    }

    pub fn blend_mode(self) -> BlendMode {
        match self {
            CompositeOp::SourceOver => BlendMode::SourceOver,
            CompositeOp::SourceIn => BlendMode::SourceIn,
            CompositeOp::SourceOut => BlendMode::SourceOut,
            CompositeOp::SourceAtop => BlendMode::SourceAtop,
            CompositeOp::DestinationOver => BlendMode::DestinationOver,
            CompositeOp::DestinationIn => BlendMode::DestinationIn,
            CompositeOp::DestinationOut => BlendMode::DestinationOut,
            CompositeOp::DestinationAtop => BlendMode::DestinationAtop,
            CompositeOp::Lighter => BlendMode::Plus,
            CompositeOp::Darken => BlendMode::Darken,
            CompositeOp::Copy => BlendMode::Source,
            CompositeOp::Xor => BlendMode::Xor,
        }
    }
}

bitflags! {
    /// What kind of work a style change requires.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChangeFlags: u8 {
        /// Something visible changed: the owning layer must repaint
        const PAINT   = 0b00001;
        /// Size, position or shape changed: relayout the node and its subtree
        const LAYOUT  = 0b00010;
        /// What the node's own pixels look like changed (not just where they go)
        const CONTENT = 0b00100;
        /// z-index changed: re-sort within the owner
        const ORDER   = 0b01000;
        /// Static caching was toggled
        const CACHE   = 0b10000;
    }
}

/// The full style record of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub left: Option<Length>,
    pub right: Option<Length>,
    pub top: Option<Length>,
    pub bottom: Option<Length>,
    pub width: Length,
    pub height: Length,
    /// Degrees
    pub rotation: f32,
    pub scale: [f32; 2],
    /// Fraction of the node's own size
    pub origin: [f32; 2],
    /// Logical pixels, never negative
    pub border: f32,
    pub border_color: Color,
    /// Dash pattern of the border in logical pixels, alternating on and off.
    /// Empty means solid.
    pub border_dash: Vec<f32>,
    /// Corner radii in logical pixels: top-left, top-right, bottom-right, bottom-left
    pub border_radius: [f32; 4],
    pub background: Color,
    /// Painted instead of `background` while set
    pub gradient: Option<Gradient>,
    pub color: Color,
    /// Always within [0, 1]
    pub opacity: f32,
    pub composite: CompositeOp,
    pub z_index: i32,
    pub clip: bool,
    /// Request that the node be painted from a cached bitmap
    pub is_static: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            top: None,
            bottom: None,
            width: Length::Percent(100.0),
            height: Length::Percent(100.0),
            rotation: 0.0,
            scale: [1.0, 1.0],
            origin: [0.5, 0.5],
            border: 0.0,
            border_color: Color::BLACK,
            border_dash: Vec::new(),
            border_radius: [0.0; 4],
            background: Color::TRANSPARENT,
            gradient: None,
            color: Color::BLACK,
            opacity: 1.0,
            composite: CompositeOp::SourceOver,
            z_index: 0,
            clip: false,
            is_static: false,
        }
    }
}

impl Style {
    /// Default style for nodes whose size comes from their content.
    pub fn auto_sized() -> Self {
        Self {
            width: Length::Auto,
            height: Length::Auto,
            ..Self::default()
        }
    }

    pub fn has_radius(&self) -> bool {
        self.border_radius.iter().any(|r| *r > 0.0)
    }

    /// Whether the node's box has a fill.
    pub fn has_fill(&self) -> bool {
        self.gradient.is_some() || !self.background.is_transparent()
    }

    /// Apply one property. Returns an empty set when the value is unchanged.
    /// Values containing NaN are ignored and keep the current value.
    pub fn apply(&mut self, prop: &StyleProp) -> ChangeFlags {
        fn set<T: PartialEq + Copy>(slot: &mut T, value: T, flags: ChangeFlags) -> ChangeFlags {
            if *slot == value {
                ChangeFlags::empty()
            } else {
                *slot = value;
                flags
            }
        }

        fn replace<T: PartialEq + Clone>(slot: &mut T, value: &T, flags: ChangeFlags) -> ChangeFlags {
            if slot == value {
                ChangeFlags::empty()
            } else {
                slot.clone_from(value);
                flags
            }
        }

        if prop.has_nan() {
            log::debug!("ignoring {prop:?}");
            return ChangeFlags::empty();
        }

        // Moving a node keeps its pixels; resizing or restyling does not
        let transform = ChangeFlags::PAINT | ChangeFlags::LAYOUT;
        let shape = transform | ChangeFlags::CONTENT;
        let look = ChangeFlags::PAINT | ChangeFlags::CONTENT;

        match *prop {
            StyleProp::Left(v) => set(&mut self.left, v, transform),
            StyleProp::Right(v) => set(&mut self.right, v, transform),
            StyleProp::Top(v) => set(&mut self.top, v, transform),
            StyleProp::Bottom(v) => set(&mut self.bottom, v, transform),
            StyleProp::Width(v) => set(&mut self.width, v, shape),
            StyleProp::Height(v) => set(&mut self.height, v, shape),
            StyleProp::Rotation(v) => set(&mut self.rotation, v, transform),
            StyleProp::Scale(v) => set(&mut self.scale, v, transform),
            StyleProp::ScaleX(v) => set(&mut self.scale[0], v, transform),
            StyleProp::ScaleY(v) => set(&mut self.scale[1], v, transform),
            StyleProp::Origin(v) => set(&mut self.origin, v, transform),
            StyleProp::OriginX(v) => set(&mut self.origin[0], v, transform),
            StyleProp::OriginY(v) => set(&mut self.origin[1], v, transform),
            StyleProp::Border(v) => set(&mut self.border, v.max(0.0), shape),
            StyleProp::BorderColor(v) => set(&mut self.border_color, v, look),
            StyleProp::BorderDash(ref v) if v.iter().any(|d| *d < 0.0 || d.is_infinite()) => {
                log::debug!("ignoring border dash {v:?}");
                ChangeFlags::empty()
            }
            StyleProp::BorderDash(ref v) => replace(&mut self.border_dash, v, look),
            StyleProp::BorderRadius(v) => {
                set(&mut self.border_radius, v.map(|r| r.max(0.0)), shape)
            }
            StyleProp::Background(v) => {
                set(&mut self.background, v, look) | replace(&mut self.gradient, &None, look)
            }
            StyleProp::Gradient(ref v) => replace(&mut self.gradient, v, look),
            StyleProp::Color(v) => set(&mut self.color, v, look),
            StyleProp::Opacity(v) => set(
                &mut self.opacity,
                v.clamp(0.0, 1.0),
                ChangeFlags::PAINT,
            ),
            StyleProp::ZIndex(v) => set(
                &mut self.z_index,
                v,
                ChangeFlags::ORDER | ChangeFlags::PAINT,
            ),
            StyleProp::Clip(v) => set(&mut self.clip, v, shape),
            StyleProp::Static(v) => set(
                &mut self.is_static,
                v,
                ChangeFlags::CACHE | ChangeFlags::PAINT,
            ),
            StyleProp::Composite(v) => set(&mut self.composite, v, ChangeFlags::PAINT),
        }
    }
}

/// One settable style attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleProp {
    Left(Option<Length>),
    Right(Option<Length>),
    Top(Option<Length>),
    Bottom(Option<Length>),
    Width(Length),
    Height(Length),
    Rotation(f32),
    Scale([f32; 2]),
    ScaleX(f32),
    ScaleY(f32),
    Origin([f32; 2]),
    OriginX(f32),
    OriginY(f32),
    Border(f32),
    BorderColor(Color),
    BorderDash(Vec<f32>),
    BorderRadius([f32; 4]),
    /// Also clears any gradient
    Background(Color),
    Gradient(Option<Gradient>),
    Color(Color),
    Opacity(f32),
    ZIndex(i32),
    Clip(bool),
    Static(bool),
    Composite(CompositeOp),
}

impl StyleProp {
    fn has_nan(&self) -> bool {
        fn length(l: &Length) -> bool {
            matches!(l, Length::Px(v) | Length::Percent(v) if v.is_nan())
        }

        match self {
            StyleProp::Left(v) | StyleProp::Right(v) | StyleProp::Top(v) | StyleProp::Bottom(v) => {
                v.as_ref().is_some_and(length)
            }
            StyleProp::Width(v) | StyleProp::Height(v) => length(v),
            StyleProp::Rotation(v)
            | StyleProp::ScaleX(v)
            | StyleProp::ScaleY(v)
            | StyleProp::OriginX(v)
            | StyleProp::OriginY(v)
            | StyleProp::Border(v)
            | StyleProp::Opacity(v) => v.is_nan(),
            StyleProp::Scale(v) | StyleProp::Origin(v) => v.iter().any(|x| x.is_nan()),
            StyleProp::BorderRadius(v) => v.iter().any(|x| x.is_nan()),
            StyleProp::BorderDash(v) => v.iter().any(|x| x.is_nan()),
            StyleProp::BorderColor(c) | StyleProp::Background(c) | StyleProp::Color(c) => c.has_nan(),
            StyleProp::Gradient(g) => g.as_ref().is_some_and(Gradient::has_nan),
            StyleProp::ZIndex(_) | StyleProp::Clip(_) | StyleProp::Static(_) | StyleProp::Composite(_) => {
                false
            }
        }
    }
}

/// A loosely typed attribute value, used with attribute names.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    None,
    Number(f32),
    Text(String),
    Pair([f32; 2]),
    Quad([f32; 4]),
    Bool(bool),
    Color(Color),
    List(Vec<f32>),
    Gradient(Gradient),
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Number(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Number(v as f32)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<[f32; 2]> for AttrValue {
    fn from(v: [f32; 2]) -> Self {
        AttrValue::Pair(v)
    }
}

impl From<[f32; 4]> for AttrValue {
    fn from(v: [f32; 4]) -> Self {
        AttrValue::Quad(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<Color> for AttrValue {
    fn from(v: Color) -> Self {
        AttrValue::Color(v)
    }
}

impl From<Vec<f32>> for AttrValue {
    fn from(v: Vec<f32>) -> Self {
        AttrValue::List(v)
    }
}

impl From<Gradient> for AttrValue {
    fn from(v: Gradient) -> Self {
        AttrValue::Gradient(v)
    }
}

impl AttrValue {
    fn length(&self) -> Option<Length> {
        match self {
            AttrValue::Number(v) => Some(Length::Px(*v)),
            AttrValue::Text(s) => Some(Length::parse(s)),
            _ => None,
        }
    }

    fn optional_length(&self) -> Option<Option<Length>> {
        match self {
            AttrValue::None => Some(None),
            other => other.length().map(Some),
        }
    }

    fn number(&self) -> Option<f32> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A scalar is broadcast to both components.
    fn pair(&self) -> Option<[f32; 2]> {
        match self {
            AttrValue::Pair(v) => Some(*v),
            other => other.number().map(|v| [v, v]),
        }
    }

    /// CSS-style shorthand: 1, 2 or 4 values.
    fn quad(&self) -> Option<[f32; 4]> {
        match self {
            AttrValue::Quad(v) => Some(*v),
            AttrValue::Pair([a, b]) => Some([*a, *b, *a, *b]),
            other => other.number().map(|v| [v; 4]),
        }
    }

    fn boolean(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            AttrValue::Number(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    fn color(&self) -> Option<Color> {
        match self {
            AttrValue::Color(c) => Some(*c),
            AttrValue::Text(s) => parse_hex_color(s),
            _ => None,
        }
    }

    /// `None` clears the list; text is split on commas and spaces.
    fn list(&self) -> Option<Vec<f32>> {
        match self {
            AttrValue::None => Some(Vec::new()),
            AttrValue::List(v) => Some(v.clone()),
            AttrValue::Pair(v) => Some(v.to_vec()),
            AttrValue::Quad(v) => Some(v.to_vec()),
            AttrValue::Number(v) => Some(vec![*v]),
            AttrValue::Text(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(|part| part.parse().ok())
                .collect(),
            _ => None,
        }
    }

    fn gradient(&self) -> Option<Option<Gradient>> {
        match self {
            AttrValue::None => Some(None),
            AttrValue::Gradient(g) => Some(Some(g.clone())),
            _ => None,
        }
    }
}

/// `#rgb`, `#rrggbb` or `#rrggbbaa`.
fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.trim().strip_prefix('#')?;
    let value = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        3 => {
            let expand = |n: u32| ((n & 0xF) * 17) as f32 / 255.0;
            Some(Color::rgb(expand(value >> 8), expand(value >> 4), expand(value)))
        }
        6 => Some(Color::from_hex(value)),
        8 => Some(Color::from_hex(value >> 8).with_alpha((value & 0xFF) as f32 / 255.0)),
        _ => None,
    }
}

type Setter = fn(&AttrValue) -> Option<StyleProp>;

/// Attribute name → typed setter.
const ATTRIBUTES: &[(&str, Setter)] = &[
    ("left", |v| v.optional_length().map(StyleProp::Left)),
    ("right", |v| v.optional_length().map(StyleProp::Right)),
    ("top", |v| v.optional_length().map(StyleProp::Top)),
    ("bottom", |v| v.optional_length().map(StyleProp::Bottom)),
    ("width", |v| v.length().map(StyleProp::Width)),
    ("height", |v| v.length().map(StyleProp::Height)),
    ("rotation", |v| v.number().map(StyleProp::Rotation)),
    ("scale", |v| v.pair().map(StyleProp::Scale)),
    ("scaleX", |v| v.number().map(StyleProp::ScaleX)),
    ("scaleY", |v| v.number().map(StyleProp::ScaleY)),
    ("origin", |v| v.pair().map(StyleProp::Origin)),
    ("originX", |v| v.number().map(StyleProp::OriginX)),
    ("originY", |v| v.number().map(StyleProp::OriginY)),
    ("border", |v| v.number().map(StyleProp::Border)),
    ("borderColor", |v| v.color().map(StyleProp::BorderColor)),
    ("borderRadius", |v| v.quad().map(StyleProp::BorderRadius)),
    ("borderStyle", |v| v.list().map(StyleProp::BorderDash)),
    ("background", |v| match v {
        AttrValue::Gradient(g) => Some(StyleProp::Gradient(Some(g.clone()))),
        other => other.color().map(StyleProp::Background),
    }),
    ("gradient", |v| v.gradient().map(StyleProp::Gradient)),
    ("color", |v| v.color().map(StyleProp::Color)),
    ("opacity", |v| v.number().map(StyleProp::Opacity)),
    ("zIndex", |v| v.number().map(|z| StyleProp::ZIndex(z as i32))),
    ("clip", |v| v.boolean().map(StyleProp::Clip)),
    ("static", |v| v.boolean().map(StyleProp::Static)),
    ("compositeOperation", |v| match v {
        AttrValue::Text(name) => CompositeOp::parse(name).map(StyleProp::Composite),
        _ => None,
    }),
];

/// A partial style update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePatch {
    props: Vec<StyleProp>,
}

impl StylePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(&self) -> &[StyleProp] {
        &self.props
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn push(&mut self, prop: StyleProp) {
        self.props.push(prop);
    }

    pub fn with(mut self, prop: StyleProp) -> Self {
        self.props.push(prop);
        self
    }

    /// Set an attribute by name. Unknown names and values of the wrong type
    /// are logged and skipped.
    pub fn set(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        match ATTRIBUTES.iter().find(|(key, _)| *key == name) {
            Some((_, setter)) => match setter(&value) {
                Some(prop) => self.props.push(prop),
                None => log::warn!("ignoring attribute {name}: unsupported value {value:?}"),
            },
            None => log::warn!("ignoring unknown attribute {name}"),
        }
        self
    }

    pub fn left(self, v: impl Into<Length>) -> Self {
        self.with(StyleProp::Left(Some(v.into())))
    }

    pub fn right(self, v: impl Into<Length>) -> Self {
        self.with(StyleProp::Right(Some(v.into())))
    }

    pub fn top(self, v: impl Into<Length>) -> Self {
        self.with(StyleProp::Top(Some(v.into())))
    }

    pub fn bottom(self, v: impl Into<Length>) -> Self {
        self.with(StyleProp::Bottom(Some(v.into())))
    }

    pub fn width(self, v: impl Into<Length>) -> Self {
        self.with(StyleProp::Width(v.into()))
    }

    pub fn height(self, v: impl Into<Length>) -> Self {
        self.with(StyleProp::Height(v.into()))
    }

    pub fn size(self, width: impl Into<Length>, height: impl Into<Length>) -> Self {
        self.width(width).height(height)
    }

    pub fn rotation(self, degrees: f32) -> Self {
        self.with(StyleProp::Rotation(degrees))
    }

    pub fn scale(self, sx: f32, sy: f32) -> Self {
        self.with(StyleProp::Scale([sx, sy]))
    }

    pub fn origin(self, ox: f32, oy: f32) -> Self {
        self.with(StyleProp::Origin([ox, oy]))
    }

    pub fn border(self, width: f32, color: Color) -> Self {
        self.with(StyleProp::Border(width))
            .with(StyleProp::BorderColor(color))
    }

    /// Dash the border: alternating on and off lengths. An odd count is
    /// repeated to make it even.
    pub fn border_dash(self, pattern: &[f32]) -> Self {
        self.with(StyleProp::BorderDash(pattern.to_vec()))
    }

    pub fn border_radius(self, radius: f32) -> Self {
        self.with(StyleProp::BorderRadius([radius; 4]))
    }

    pub fn background(self, color: Color) -> Self {
        self.with(StyleProp::Background(color))
    }

    pub fn gradient(self, gradient: Gradient) -> Self {
        self.with(StyleProp::Gradient(Some(gradient)))
    }

    pub fn composite(self, op: CompositeOp) -> Self {
        self.with(StyleProp::Composite(op))
    }

    pub fn color(self, color: Color) -> Self {
        self.with(StyleProp::Color(color))
    }

    pub fn opacity(self, opacity: f32) -> Self {
        self.with(StyleProp::Opacity(opacity))
    }

    pub fn z_index(self, z: i32) -> Self {
        self.with(StyleProp::ZIndex(z))
    }

    pub fn clip(self, clip: bool) -> Self {
        self.with(StyleProp::Clip(clip))
    }

    pub fn cached(self, is_static: bool) -> Self {
        self.with(StyleProp::Static(is_static))
    }
}
