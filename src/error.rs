use thiserror::Error;

use crate::layer::LayerId;
use crate::tree::NodeId;

/// Structural misuse of the scene graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} has been disposed")]
    StaleNode(NodeId),

    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),

    #[error("node {id:?} is not a {expected} node")]
    WrongKind { id: NodeId, expected: &'static str },

    #[error("adding {child:?} to {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("no layer with z-index {0}")]
    UnknownLayer(LayerId),
}

/// Failure to load, decode or export a bitmap.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("svg error: {0}")]
    Svg(#[from] resvg::usvg::Error),

    #[error("cannot allocate a {width}x{height} bitmap")]
    Allocation { width: u32, height: u32 },
}
