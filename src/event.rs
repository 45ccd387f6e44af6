//! Pointer events delivered to scene nodes.

use crate::scene::Scene;
use crate::tree::NodeId;

/// Where pointer input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
}

/// Raw input from the host, in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    /// The pointer left the surface
    Leave,
    /// The host aborted the gesture
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerDown,
    PointerUp,
    PointerMove,
    PointerEnter,
    PointerLeave,
    PointerCancel,
    /// Press and release on the same node
    Click,
}

/// An event as seen by a handler. Coordinates are in layer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub x: f32,
    pub y: f32,
    pub source: PointerSource,
    /// The node the event was dispatched to
    pub target: NodeId,
    /// The node whose handler is running (the target or an ancestor)
    pub current_target: NodeId,
    /// The node entered or left on the other side of an enter/leave pair
    pub related_target: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    /// Keep bubbling
    Ignored,
    /// Stop propagation after this node
    Handled,
}

/// Handlers get the scene so they can mutate it in response.
pub type Handler = Box<dyn FnMut(&mut Scene, &Event) -> EventResponse>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);
