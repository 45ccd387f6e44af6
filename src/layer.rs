//! Layers: independently repainted surfaces stacked by z-index.
//!
//! A layer owns a set of root nodes and a back canvas the paint walk draws
//! into. Only a completed walk is copied to the front pixmap, so a frame
//! that ran out of budget or is waiting on an image never shows half a
//! scene.

use std::fmt;
use std::time::{Duration, Instant};

use resvg::tiny_skia::Pixmap;

use crate::bounding_rect::BoundingRect;
use crate::canvas::{self, Canvas};
use crate::error::ResourceError;
use crate::hit_test;
use crate::node::Env;
use crate::paint::{self, Target, WalkStatus, Work};
use crate::tree::{NodeId, Owner, Tree};

/// Identifies a layer. Doubles as its z-index: higher ids draw on top.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct LayerId(pub i32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderProgress {
    /// Nothing to do
    Idle,
    /// A walk finished and the front pixmap was updated
    Presented,
    /// The frame budget ran out; the walk continues next frame
    InProgress,
    /// Waiting for a resource to load
    Waiting,
}

pub struct Layer {
    id: LayerId,
    canvas: Canvas,
    front: Pixmap,
    dirty: bool,
    waiting: bool,
    roots: Vec<NodeId>,
    walk: Option<Vec<Work>>,
}

impl Layer {
    pub fn new(id: LayerId, width: u32, height: u32) -> Result<Self, ResourceError> {
        Ok(Self {
            id,
            canvas: Canvas::new(width, height)?,
            front: canvas::allocate(width, height)?,
            dirty: true,
            waiting: false,
            roots: Vec::new(),
            walk: None,
        })
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The last completed frame.
    pub fn front(&self) -> &Pixmap {
        &self.front
    }

    pub fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    pub fn viewport(&self) -> BoundingRect {
        BoundingRect::from_size(self.canvas.width() as f32, self.canvas.height() as f32)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Whether a walk is in flight.
    pub fn is_painting(&self) -> bool {
        self.walk.is_some()
    }

    /// Request a fresh walk on the next render.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Let a walk that was waiting on a resource continue.
    pub fn wake(&mut self) {
        self.waiting = false;
    }

    pub(crate) fn add_root(&mut self, tree: &mut Tree, id: NodeId) {
        let viewport = self.size();
        if let Some(node) = tree.get_mut(id) {
            node.owner = Some(Owner::Layer(self.id));
            node.viewport = (viewport.0 as f32, viewport.1 as f32);
        }
        tree.assign_order(id);
        tree.insert_sorted(&mut self.roots, id);
        tree.mark_layout(id);
        self.dirty = true;
    }

    pub(crate) fn remove_root(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|r| *r != id);
        if let Some(node) = tree.get_mut(id) {
            if node.owner == Some(Owner::Layer(self.id)) {
                node.owner = None;
            }
        }
        let removed = self.roots.len() != before;
        self.dirty |= removed;
        removed
    }

    /// Move a root to its sorted position after a z-index change.
    pub(crate) fn resort_root(&mut self, tree: &Tree, id: NodeId) {
        if self.roots.contains(&id) {
            self.roots.retain(|r| *r != id);
            tree.insert_sorted(&mut self.roots, id);
        }
    }

    /// Resize the surfaces. Root nodes get the new viewport and are laid out
    /// again.
    pub fn resize(&mut self, tree: &mut Tree, width: u32, height: u32) -> Result<(), ResourceError> {
        self.canvas.resize(width, height)?;
        self.front = canvas::allocate(width, height)?;
        self.walk = None;
        self.dirty = true;

        let viewport = self.size();
        for root in &self.roots {
            if let Some(node) = tree.get_mut(*root) {
                node.viewport = (viewport.0 as f32, viewport.1 as f32);
            }
            tree.mark_layout(*root);
        }
        Ok(())
    }

    /// Advance painting by up to `budget`.
    ///
    /// A walk in flight always runs to completion before a new one starts,
    /// so a layer mutated every frame still presents. Mutations made
    /// meanwhile leave the layer dirty and are picked up by the next walk.
    /// A dirty layer that is waiting on a resource retries the blocked item.
    pub fn render(&mut self, tree: &mut Tree, env: &mut Env, budget: Option<Duration>) -> RenderProgress {
        let start = Instant::now();

        if self.walk.is_none() {
            if !self.dirty {
                return RenderProgress::Idle;
            }
            self.dirty = false;
            self.waiting = false;
            self.canvas.clear();
            self.roots.retain(|r| tree.contains(*r));
            self.walk = Some(self.roots.iter().rev().map(|r| Work::Visit(*r, 1.0)).collect());
        } else if self.waiting {
            if !self.dirty {
                return RenderProgress::Waiting;
            }
            self.waiting = false;
        }

        let Some(mut stack) = self.walk.take() else {
            return RenderProgress::Idle;
        };

        let mut target = Target {
            canvas: &mut self.canvas,
            post: crate::matrix::Matrix::IDENTITY,
            cull: Some(BoundingRect::from_size(
                self.front.width() as f32,
                self.front.height() as f32,
            )),
        };
        let deadline = budget.map(|b| start + b);

        match paint::run(tree, env, &mut target, &mut stack, deadline) {
            WalkStatus::Complete => {
                self.front.data_mut().copy_from_slice(self.canvas.pixmap().data());
                log::trace!("{} presented in {:?}", self.id, start.elapsed());
                RenderProgress::Presented
            }
            WalkStatus::Yielded => {
                self.walk = Some(stack);
                RenderProgress::InProgress
            }
            WalkStatus::Suspended => {
                log::debug!("{} waiting for resources", self.id);
                self.walk = Some(stack);
                self.waiting = true;
                RenderProgress::Waiting
            }
        }
    }

    /// Topmost node under the point, in layer pixels.
    pub fn get_target(&self, tree: &mut Tree, x: f32, y: f32, env: &mut Env) -> Option<NodeId> {
        hit_test::pick_roots(tree, &self.roots, self.viewport(), x, y, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Div, Node, NodeKind};
    use crate::resource::{Resource, ResourceLoader};
    use crate::style::{Color, Length, StyleProp};
    use crate::text::MonospaceMeasurer;

    struct PendingLoader;

    impl ResourceLoader for PendingLoader {
        fn load(&mut self, _src: &str) {}
        fn release(&mut self, _src: &str) {}
        fn get(&self, _src: &str) -> Resource {
            Resource::Pending
        }
    }

    fn square(tree: &mut Tree, x: f32, color: Color) -> NodeId {
        let mut node = Node::new("", NodeKind::Div(Div));
        for prop in [
            StyleProp::Width(Length::Px(10.0)),
            StyleProp::Height(Length::Px(10.0)),
            StyleProp::Left(Some(x.into())),
            StyleProp::Top(Some(Length::Px(0.0))),
            StyleProp::Background(color),
        ] {
            node.style.apply(&prop);
        }
        tree.insert(node)
    }

    fn render(layer: &mut Layer, tree: &mut Tree, resources: &dyn ResourceLoader) -> RenderProgress {
        let mut text = MonospaceMeasurer::new();
        let mut env = Env {
            dpr: 1.0,
            resources,
            text: &mut text,
        };
        layer.render(tree, &mut env, None)
    }

    #[test]
    fn test_render_presents_and_goes_idle() {
        let mut tree = Tree::new();
        let mut layer = Layer::new(LayerId(0), 30, 10).unwrap();
        let id = square(&mut tree, 0.0, Color::BLACK);
        layer.add_root(&mut tree, id);

        assert_eq!(render(&mut layer, &mut tree, &crate::resource::NoResources), RenderProgress::Presented);
        assert_eq!(layer.front().pixel(5, 5).unwrap().alpha(), 255);
        assert_eq!(render(&mut layer, &mut tree, &crate::resource::NoResources), RenderProgress::Idle);
    }

    #[test]
    fn test_roots_sorted_by_z() {
        let mut tree = Tree::new();
        let mut layer = Layer::new(LayerId(0), 30, 10).unwrap();
        let a = square(&mut tree, 0.0, Color::BLACK);
        let b = square(&mut tree, 0.0, Color::WHITE);
        tree.get_mut(a).unwrap().style.apply(&StyleProp::ZIndex(1));
        layer.add_root(&mut tree, a);
        layer.add_root(&mut tree, b);
        assert_eq!(layer.roots(), &[b, a]);

        render(&mut layer, &mut tree, &crate::resource::NoResources);
        // `a` is on top
        assert_eq!(layer.front().pixel(5, 5).unwrap().red(), 0);

        let mut text = MonospaceMeasurer::new();
        let mut env = Env {
            dpr: 1.0,
            resources: &crate::resource::NoResources,
            text: &mut text,
        };
        assert_eq!(layer.get_target(&mut tree, 5.0, 5.0, &mut env), Some(a));
        assert_eq!(layer.get_target(&mut tree, 25.0, 5.0, &mut env), None);
    }

    #[test]
    fn test_suspended_walk_keeps_old_front() {
        let mut tree = Tree::new();
        let mut layer = Layer::new(LayerId(0), 30, 10).unwrap();
        let first = square(&mut tree, 0.0, Color::BLACK);
        layer.add_root(&mut tree, first);
        render(&mut layer, &mut tree, &crate::resource::NoResources);

        let image = tree.insert(Node::new("", NodeKind::Image(crate::node::ImageNode::new("slow.png"))));
        layer.add_root(&mut tree, image);

        assert_eq!(render(&mut layer, &mut tree, &PendingLoader), RenderProgress::Waiting);
        assert!(layer.is_waiting());
        assert!(layer.is_painting());
        assert_eq!(layer.front().pixel(5, 5).unwrap().alpha(), 255);
        assert_eq!(render(&mut layer, &mut tree, &PendingLoader), RenderProgress::Waiting);

        // Disposing the blocking node lets the walk finish
        tree.remove(image);
        layer.wake();
        assert_eq!(render(&mut layer, &mut tree, &PendingLoader), RenderProgress::Presented);
    }

    #[test]
    fn test_resize_updates_root_viewport() {
        let mut tree = Tree::new();
        let mut layer = Layer::new(LayerId(0), 30, 10).unwrap();
        let id = tree.insert(Node::new("", NodeKind::Div(Div)));
        layer.add_root(&mut tree, id);

        layer.resize(&mut tree, 60, 20).unwrap();
        assert_eq!(tree.get(id).unwrap().viewport, (60.0, 20.0));
        assert!(tree.get(id).unwrap().needs_layout());
        assert_eq!(layer.size(), (60, 20));
    }
}
