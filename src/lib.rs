//! A retained-mode 2D scene graph rendered with `tiny-skia`.
//!
//! Nodes (boxes, containers, text, images and vector paths) live in an
//! arena owned by a [`Scene`]. Mutations mark nodes dirty; each frame the
//! affected layers lay out lazily, repaint through a resumable, time-boxed
//! walk and are composited by the [`Engine`] onto one display pixmap.
//!
//! ```no_run
//! use canvas2d::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::default().size(320, 240)).unwrap();
//! let scene = engine.scene_mut();
//! let root = scene.container("root");
//! let card = scene.div("card");
//! scene.add_root(LayerId(0), root).unwrap();
//! scene.add(root, card).unwrap();
//! scene
//!     .attr(card, &StylePatch::new().size(120.0, 80.0).background(Color::from_hex(0x3366cc)))
//!     .unwrap();
//!
//! engine.frame();
//! engine.save_png("card.png").unwrap();
//! ```

pub mod animation;
pub mod bounding_rect;
pub mod canvas;
pub mod engine;
pub mod error;
pub mod event;
pub mod layer;
pub mod layout;
pub mod matrix;
pub mod node;
pub mod paint;
pub mod resource;
pub mod scene;
pub mod shape;
pub mod style;
pub mod text;
pub mod tree;

pub use resvg::tiny_skia;

pub use engine::{Engine, EngineConfig};
pub use error::{ResourceError, SceneError};
pub use scene::Scene;

pub mod prelude {
    pub use crate::animation::{animation_channel, AnimationSource, TimingFunction, Tween};
    pub use crate::bounding_rect::BoundingRect;
    pub use crate::engine::{Engine, EngineConfig};
    pub use crate::error::{ResourceError, SceneError};
    pub use crate::event::{Event, EventKind, EventResponse, PointerInput, PointerSource};
    pub use crate::layer::LayerId;
    pub use crate::matrix::Matrix;
    pub use crate::node::{Arrangement, NodeKind, SpriteCell, TextAlign};
    pub use crate::resource::{ImageCache, Resource, ResourceLoader};
    pub use crate::scene::Scene;
    pub use crate::style::{Color, CompositeOp, Gradient, Length, StylePatch, StyleProp};
    pub use crate::text::{Font, MonospaceMeasurer, TextMeasure};
    pub use crate::tree::NodeId;
}
