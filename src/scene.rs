//! The scene graph facade.
//!
//! [`Scene`] is the single writer of the node tree. Every structural change
//! and style mutation goes through it so dirty flags, static caches, sort
//! order and resource references stay consistent.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use resvg::tiny_skia::Path;

use crate::bounding_rect::BoundingRect;
use crate::error::{ResourceError, SceneError};
use crate::layer::{Layer, LayerId, RenderProgress};
use crate::layout;
use crate::node::{
    Arrangement, Container, Div, Env, ImageNode, Node, NodeKind, PathNode, Placement, SpriteCell,
    TextAlign, TextNode,
};
use crate::resource::{ImageCache, NoResources, ResourceLoader};
use crate::style::{ChangeFlags, StylePatch};
use crate::text::{CosmicTextMeasurer, Font, MonospaceMeasurer, TextMeasure};
use crate::tree::{NodeId, Owner, Tree};

pub struct Scene {
    tree: Tree,
    layers: BTreeMap<LayerId, Layer>,
    resources: Box<dyn ResourceLoader>,
    text: Box<dyn TextMeasure>,
    dpr: f32,
    size: (u32, u32),
}

impl Scene {
    /// An empty scene with a `width` x `height` device-pixel surface, the
    /// default image cache and system fonts.
    pub fn new(width: u32, height: u32, dpr: f32) -> Self {
        Self {
            tree: Tree::new(),
            layers: BTreeMap::new(),
            resources: Box::new(ImageCache::default()),
            text: Box::new(CosmicTextMeasurer::new()),
            dpr: if dpr > 0.0 { dpr } else { 1.0 },
            size: (width, height),
        }
    }

    /// A scene that loads nothing and measures text with a fixed advance.
    pub fn headless(width: u32, height: u32, dpr: f32) -> Self {
        Self {
            tree: Tree::new(),
            layers: BTreeMap::new(),
            resources: Box::new(NoResources),
            text: Box::new(MonospaceMeasurer::new()),
            dpr: if dpr > 0.0 { dpr } else { 1.0 },
            size: (width, height),
        }
    }

    pub fn with_resources(mut self, resources: impl ResourceLoader + 'static) -> Self {
        self.resources = Box::new(resources);
        self
    }

    pub fn with_text_measure(mut self, text: impl TextMeasure + 'static) -> Self {
        self.text = Box::new(text);
        self
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn resources(&self) -> &dyn ResourceLoader {
        self.resources.as_ref()
    }

    fn parts(&mut self) -> (&mut Tree, &mut BTreeMap<LayerId, Layer>, Env<'_>) {
        (
            &mut self.tree,
            &mut self.layers,
            Env {
                dpr: self.dpr,
                resources: self.resources.as_ref(),
                text: self.text.as_mut(),
            },
        )
    }

    // Layers

    /// Create the layer with z-index `id` if it does not exist yet.
    pub fn add_layer(&mut self, id: LayerId) -> Result<LayerId, ResourceError> {
        if !self.layers.contains_key(&id) {
            let layer = Layer::new(id, self.size.0, self.size.1)?;
            log::info!("created {id} ({}x{})", self.size.0, self.size.1);
            self.layers.insert(id, layer);
        }
        Ok(id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    /// Layers in ascending z.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.size = (width, height);
        for layer in self.layers.values_mut() {
            layer.resize(&mut self.tree, width, height)?;
        }
        log::info!("scene resized to {width}x{height}");
        Ok(())
    }

    // Node creation

    /// Create a detached node. An empty or taken key is replaced by a
    /// generated one.
    pub fn create(&mut self, key: &str, kind: NodeKind) -> NodeId {
        if let Some(src) = kind.as_image().and_then(ImageNode::src) {
            self.resources.load(src);
        }
        let id = self.tree.insert(Node::new(key, kind));
        log::trace!("created {id:?}");
        id
    }

    pub fn div(&mut self, key: &str) -> NodeId {
        self.create(key, NodeKind::Div(Div))
    }

    pub fn container(&mut self, key: &str) -> NodeId {
        self.create(key, NodeKind::Container(Container::new()))
    }

    pub fn stack(&mut self, key: &str, vertical: bool) -> NodeId {
        self.create(key, NodeKind::Container(Container::stack(vertical)))
    }

    pub fn wrap(&mut self, key: &str) -> NodeId {
        self.create(key, NodeKind::Container(Container::wrap()))
    }

    pub fn text(&mut self, key: &str, text: &str, font: Font) -> NodeId {
        self.create(key, NodeKind::Text(TextNode::new(text).with_font(font)))
    }

    pub fn image(&mut self, key: &str, src: &str) -> NodeId {
        self.create(key, NodeKind::Image(ImageNode::new(src)))
    }

    pub fn path(&mut self, key: &str, path: Path) -> NodeId {
        self.create(key, NodeKind::Path(PathNode::new(path)))
    }

    // Mutation

    /// Merge a style patch. Returns whether anything changed.
    pub fn attr(&mut self, id: NodeId, patch: &StylePatch) -> Result<bool, SceneError> {
        let node = self.tree.get_mut(id).ok_or(SceneError::StaleNode(id))?;

        let mut changed = ChangeFlags::empty();
        for prop in patch.props() {
            changed |= node.style.apply(prop);
        }
        if changed.is_empty() {
            return Ok(false);
        }

        if changed.intersects(ChangeFlags::CONTENT | ChangeFlags::CACHE) {
            node.cache = None;
        }
        if changed.contains(ChangeFlags::LAYOUT) {
            self.relayout(id);
        }
        if changed.contains(ChangeFlags::ORDER) {
            self.resort(id);
        }
        self.tree.invalidate_ancestor_caches(id);
        self.tree.mark_dirty(id);
        Ok(true)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<bool, SceneError> {
        let node = self.tree.get_mut(id).ok_or(SceneError::StaleNode(id))?;
        if node.visible == visible {
            return Ok(false);
        }
        node.visible = visible;
        if let Some(parent) = self.arranging_parent(id) {
            self.relayout(parent);
        }
        self.tree.invalidate_ancestor_caches(id);
        self.tree.mark_dirty(id);
        Ok(true)
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<bool, SceneError> {
        let changed = self.text_node_mut(id)?.set_text(text);
        self.after_content_change(id, changed)
    }

    pub fn set_font(&mut self, id: NodeId, font: Font) -> Result<bool, SceneError> {
        let changed = self.text_node_mut(id)?.set_font(font);
        self.after_content_change(id, changed)
    }

    pub fn set_align(&mut self, id: NodeId, align: TextAlign) -> Result<bool, SceneError> {
        let changed = self.text_node_mut(id)?.set_align(align);
        self.after_content_change(id, changed)
    }

    /// Point an image node at a new source, moving the resource reference.
    pub fn set_src(&mut self, id: NodeId, src: Option<&str>) -> Result<bool, SceneError> {
        let previous = self.image_node_mut(id)?.set_src(src);
        let Some(previous) = previous else {
            return Ok(false);
        };
        if let Some(src) = src {
            self.resources.load(src);
        }
        if let Some(previous) = previous {
            self.resources.release(&previous);
        }
        self.after_content_change(id, true)
    }

    pub fn set_cell(&mut self, id: NodeId, cell: Option<SpriteCell>) -> Result<bool, SceneError> {
        let changed = self.image_node_mut(id)?.set_cell(cell);
        self.after_content_change(id, changed)
    }

    pub fn set_path(&mut self, id: NodeId, path: Option<Path>) -> Result<bool, SceneError> {
        match self.tree.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Path(p)) => p.set_path(path),
            Some(_) => {
                return Err(SceneError::WrongKind {
                    id,
                    expected: "path",
                })
            }
            None => return Err(SceneError::StaleNode(id)),
        }
        self.after_content_change(id, true)
    }

    pub fn set_arrangement(&mut self, id: NodeId, arrangement: Arrangement) -> Result<bool, SceneError> {
        let node = self.tree.get_mut(id).ok_or(SceneError::StaleNode(id))?;
        let container = node
            .kind
            .children_mut()
            .ok_or(SceneError::NotAContainer(id))?;
        if !container.set_arrangement(arrangement) {
            return Ok(false);
        }

        for child in self.tree.children(id).to_vec() {
            if let Some(child) = self.tree.get_mut(child) {
                child.placement = Placement::default();
            }
        }
        self.after_content_change(id, true)
    }

    fn text_node_mut(&mut self, id: NodeId) -> Result<&mut TextNode, SceneError> {
        match self.tree.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(t)) => Ok(t),
            Some(_) => Err(SceneError::WrongKind {
                id,
                expected: "text",
            }),
            None => Err(SceneError::StaleNode(id)),
        }
    }

    fn image_node_mut(&mut self, id: NodeId) -> Result<&mut ImageNode, SceneError> {
        match self.tree.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Image(i)) => Ok(i),
            Some(_) => Err(SceneError::WrongKind {
                id,
                expected: "image",
            }),
            None => Err(SceneError::StaleNode(id)),
        }
    }

    fn after_content_change(&mut self, id: NodeId, changed: bool) -> Result<bool, SceneError> {
        if changed {
            if let Some(node) = self.tree.get_mut(id) {
                node.cache = None;
            }
            self.relayout(id);
            self.tree.invalidate_ancestor_caches(id);
            self.tree.mark_dirty(id);
        }
        Ok(changed)
    }

    /// The owning container when it positions its children itself.
    fn arranging_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.tree.parent(id)?;
        let arranges = self
            .tree
            .get(parent)
            .and_then(|p| p.kind.children())
            .is_some_and(|c| c.arrangement() != Arrangement::Free);
        arranges.then_some(parent)
    }

    /// Flag `id` for layout. Geometry inside an arranging container moves
    /// its siblings too, so the outermost arranging ancestor is flagged.
    fn relayout(&mut self, id: NodeId) {
        let mut target = id;
        while let Some(parent) = self.arranging_parent(target) {
            target = parent;
        }
        self.tree.mark_layout(target);
    }

    fn resort(&mut self, id: NodeId) {
        match self.tree.owner(id) {
            Some(Owner::Container(parent)) => self.tree.resort_child(parent, id),
            Some(Owner::Layer(layer)) => {
                if let Some(layer) = self.layers.get_mut(&layer) {
                    layer.resort_root(&self.tree, id);
                    layer.mark_dirty();
                }
            }
            None => {}
        }
    }

    // Structure

    /// Append `child` to `container`, detaching it from its previous owner.
    pub fn add(&mut self, container: NodeId, child: NodeId) -> Result<(), SceneError> {
        let parent = self
            .tree
            .get(container)
            .ok_or(SceneError::StaleNode(container))?;
        if !parent.is_container() {
            return Err(SceneError::NotAContainer(container));
        }
        if !self.tree.contains(child) {
            return Err(SceneError::StaleNode(child));
        }
        if self.tree.is_ancestor_or_self(child, container) {
            return Err(SceneError::Cycle {
                parent: container,
                child,
            });
        }

        self.detach(child);
        self.tree.attach_child(container, child);
        if let Some(node) = self.tree.get_mut(child) {
            node.placement = Placement::default();
        }
        self.tree.mark_layout(child);
        self.relayout(child);
        self.tree.invalidate_ancestor_caches(child);
        self.tree.mark_dirty(child);
        Ok(())
    }

    /// Make `node` a root of `layer`.
    pub fn add_root(&mut self, layer: LayerId, node: NodeId) -> Result<(), SceneError> {
        if !self.layers.contains_key(&layer) {
            return Err(SceneError::UnknownLayer(layer));
        }
        if !self.tree.contains(node) {
            return Err(SceneError::StaleNode(node));
        }

        self.detach(node);
        if let Some(n) = self.tree.get_mut(node) {
            n.placement = Placement::default();
        }
        if let Some(target) = self.layers.get_mut(&layer) {
            target.add_root(&mut self.tree, node);
        }
        self.tree.mark_dirty(node);
        Ok(())
    }

    /// Detach `node` from its owner, optionally disposing it.
    pub fn remove(&mut self, node: NodeId, dispose: bool) -> Result<(), SceneError> {
        if !self.tree.contains(node) {
            return Err(SceneError::StaleNode(node));
        }
        self.detach(node);
        if dispose {
            self.dispose(node);
        }
        Ok(())
    }

    /// Detach and free `node` and its whole subtree. Ids held elsewhere
    /// become stale. Unknown ids are ignored.
    pub fn dispose(&mut self, node: NodeId) {
        if !self.tree.contains(node) {
            return;
        }
        self.detach(node);

        let subtree = self.tree.subtree(node);
        log::debug!("disposing {} node(s) under {node:?}", subtree.len());
        for id in subtree {
            if let Some(removed) = self.tree.remove(id) {
                if let Some(src) = removed.kind.as_image().and_then(ImageNode::src) {
                    self.resources.release(src);
                }
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        match self.tree.owner(node) {
            Some(Owner::Container(parent)) => {
                self.tree.invalidate_ancestor_caches(node);
                self.tree.detach_child(parent, node);
                if let Some(arranging) = self.arranging_parent_of_container(parent) {
                    self.relayout(arranging);
                }
                self.tree.mark_dirty(parent);
            }
            Some(Owner::Layer(layer)) => {
                if let Some(layer) = self.layers.get_mut(&layer) {
                    layer.remove_root(&mut self.tree, node);
                }
            }
            None => {}
        }
    }

    fn arranging_parent_of_container(&self, container: NodeId) -> Option<NodeId> {
        self.tree
            .get(container)
            .and_then(|c| c.kind.children())
            .is_some_and(|c| c.arrangement() != Arrangement::Free)
            .then_some(container)
    }

    // Queries

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.tree.find(key)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.tree.children(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.parent(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    /// World rect in layer pixels. `None` for stale ids and while content
    /// is still loading.
    pub fn bounding_rect(&mut self, id: NodeId) -> Option<BoundingRect> {
        let (tree, _, mut env) = self.parts();
        layout::bounding_rect(tree, id, &mut env)
    }

    /// Topmost node of `layer` under the layer-space point.
    pub fn get_target(&mut self, layer: LayerId, x: f32, y: f32) -> Option<NodeId> {
        let (tree, layers, mut env) = self.parts();
        layers.get(&layer)?.get_target(tree, x, y, &mut env)
    }

    /// Topmost node under the point across all layers.
    pub fn hit_test(&mut self, x: f32, y: f32) -> Option<NodeId> {
        let (tree, layers, mut env) = self.parts();
        layers
            .values()
            .rev()
            .find_map(|layer| layer.get_target(tree, x, y, &mut env))
    }

    // Frames

    /// Apply (key, patch) pairs. Unknown keys are skipped. Returns how many
    /// patches changed something.
    pub fn apply_patches(&mut self, patches: Vec<(String, StylePatch)>) -> usize {
        let mut applied = 0;
        for (key, patch) in patches {
            let Some(id) = self.tree.find(&key) else {
                log::debug!("dropping patch for unknown key {key:?}");
                continue;
            };
            if let Ok(true) = self.attr(id, &patch) {
                applied += 1;
            }
        }
        applied
    }

    /// Collect finished loads and advance every dirty layer, sharing
    /// `budget` between them. Returns true while any layer has work left.
    pub fn render(&mut self, budget: Option<Duration>) -> bool {
        let start = Instant::now();

        if self.resources.poll() {
            for layer in self.layers.values_mut() {
                layer.wake();
            }
        }
        for id in self.tree.take_dirty_layers() {
            if let Some(layer) = self.layers.get_mut(&id) {
                layer.mark_dirty();
            }
        }

        let (tree, layers, mut env) = self.parts();
        let mut busy = false;
        for layer in layers.values_mut() {
            let remaining = budget.map(|b| b.saturating_sub(start.elapsed()));
            match layer.render(tree, &mut env, remaining) {
                RenderProgress::InProgress | RenderProgress::Waiting => busy = true,
                RenderProgress::Idle | RenderProgress::Presented => {}
            }
        }
        busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    fn scene() -> Scene {
        let mut scene = Scene::headless(100, 100, 1.0);
        scene.add_layer(LayerId(0)).unwrap();
        scene
    }

    #[test]
    fn test_add_rejects_misuse() {
        let mut scene = scene();
        let a = scene.container("a");
        let b = scene.container("b");
        let leaf = scene.div("leaf");

        assert_eq!(scene.add(leaf, a), Err(SceneError::NotAContainer(leaf)));
        scene.add(a, b).unwrap();
        assert_eq!(
            scene.add(b, a),
            Err(SceneError::Cycle {
                parent: b,
                child: a
            })
        );
        assert_eq!(
            scene.add(a, a),
            Err(SceneError::Cycle {
                parent: a,
                child: a
            })
        );
        assert_eq!(
            scene.add_root(LayerId(9), a),
            Err(SceneError::UnknownLayer(LayerId(9)))
        );
    }

    #[test]
    fn test_reparent_moves_node_once() {
        let mut scene = scene();
        let a = scene.container("a");
        let b = scene.container("b");
        let child = scene.div("child");
        scene.add(a, child).unwrap();
        scene.add(b, child).unwrap();

        assert!(scene.children(a).is_empty());
        assert_eq!(scene.children(b), &[child]);
        assert_eq!(scene.parent(child), Some(b));
    }

    #[test]
    fn test_attr_is_idempotent() {
        let mut scene = scene();
        let id = scene.div("d");
        let patch = StylePatch::new().left(10.0).background(Color::WHITE);
        assert_eq!(scene.attr(id, &patch), Ok(true));
        assert_eq!(scene.attr(id, &patch), Ok(false));
    }

    #[test]
    fn test_attr_ignores_nan() {
        let mut scene = scene();
        let id = scene.div("d");
        let patch = StylePatch::new().opacity(f32::NAN).set("rotation", "NaN");
        assert_eq!(scene.attr(id, &patch), Ok(false));
        assert_eq!(scene.attr(id, &patch), Ok(false));
        assert_eq!(scene.get(id).map(|n| n.style().opacity), Some(1.0));
    }

    #[test]
    fn test_color_change_keeps_layout() {
        let mut scene = scene();
        let root = scene.container("root");
        let leaf = scene.div("leaf");
        scene.add_root(LayerId(0), root).unwrap();
        scene.add(root, leaf).unwrap();
        scene.render(None);
        assert!(!scene.get(leaf).unwrap().needs_layout());

        scene
            .attr(leaf, &StylePatch::new().background(Color::WHITE))
            .unwrap();
        assert!(!scene.get(leaf).unwrap().needs_layout());
        assert!(scene.get(root).unwrap().needs_repaint());

        scene.attr(leaf, &StylePatch::new().width(5.0)).unwrap();
        assert!(scene.get(leaf).unwrap().needs_layout());
        assert!(!scene.get(root).unwrap().needs_layout());
        assert!(scene.tree().has_dirty_layers());
    }

    #[test]
    fn test_z_change_resorts() {
        let mut scene = scene();
        let root = scene.container("root");
        let a = scene.div("a");
        let b = scene.div("b");
        scene.add(root, a).unwrap();
        scene.add(root, b).unwrap();

        scene.attr(a, &StylePatch::new().z_index(3)).unwrap();
        assert_eq!(scene.children(root), &[b, a]);
    }

    #[test]
    fn test_dispose_frees_subtree_and_keys() {
        let mut scene = scene();
        let root = scene.container("root");
        let child = scene.div("child");
        scene.add_root(LayerId(0), root).unwrap();
        scene.add(root, child).unwrap();

        scene.dispose(root);
        assert!(!scene.contains(root));
        assert!(!scene.contains(child));
        assert_eq!(scene.find("child"), None);
        assert!(scene.layer(LayerId(0)).unwrap().roots().is_empty());
        assert_eq!(scene.attr(child, &StylePatch::new()), Err(SceneError::StaleNode(child)));
    }

    #[test]
    fn test_remove_without_dispose_keeps_node() {
        let mut scene = scene();
        let root = scene.container("root");
        let child = scene.div("child");
        scene.add(root, child).unwrap();

        scene.remove(child, false).unwrap();
        assert!(scene.contains(child));
        assert_eq!(scene.parent(child), None);
    }

    #[test]
    fn test_static_cache_rules() {
        let mut scene = scene();
        let root = scene.container("root");
        let leaf = scene.div("leaf");
        scene.add_root(LayerId(0), root).unwrap();
        scene.add(root, leaf).unwrap();
        scene
            .attr(root, &StylePatch::new().cached(true))
            .unwrap();
        scene
            .attr(leaf, &StylePatch::new().size(10.0, 10.0).background(Color::BLACK))
            .unwrap();
        scene.render(None);
        assert!(scene.get(root).unwrap().has_cache());

        // Moving the static node keeps its bitmap
        scene.attr(root, &StylePatch::new().left(5.0)).unwrap();
        assert!(scene.get(root).unwrap().has_cache());

        // Any change below it does not
        scene
            .attr(leaf, &StylePatch::new().background(Color::WHITE))
            .unwrap();
        assert!(!scene.get(root).unwrap().has_cache());
    }

    #[test]
    fn test_wrong_kind_setters() {
        let mut scene = scene();
        let id = scene.div("d");
        assert_eq!(
            scene.set_text(id, "hi"),
            Err(SceneError::WrongKind {
                id,
                expected: "text"
            })
        );
        assert_eq!(
            scene.set_arrangement(id, Arrangement::Wrap),
            Err(SceneError::NotAContainer(id))
        );
    }

    #[test]
    fn test_apply_patches_skips_unknown_keys() {
        let mut scene = scene();
        scene.div("known");
        let applied = scene.apply_patches(vec![
            ("known".to_string(), StylePatch::new().opacity(0.5)),
            ("missing".to_string(), StylePatch::new().opacity(0.5)),
        ]);
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_walk_finishes_under_per_frame_mutation() {
        let mut scene = scene();
        let root = scene.container("root");
        scene.add_root(LayerId(0), root).unwrap();
        let children: Vec<_> = (0..6)
            .map(|i| {
                let child = scene.div(&format!("child-{i}"));
                scene.add(root, child).unwrap();
                scene
                    .attr(child, &StylePatch::new().size(10.0, 10.0).background(Color::BLACK))
                    .unwrap();
                child
            })
            .collect();

        let mut presented = 0;
        for frame in 0..60 {
            let opacity = if frame % 2 == 0 { 0.5 } else { 0.6 };
            scene
                .attr(children[2], &StylePatch::new().opacity(opacity))
                .unwrap();
            scene.render(Some(Duration::ZERO));
            if !scene.layer(LayerId(0)).unwrap().is_painting() {
                presented += 1;
            }
        }
        // One item per frame and seven items per walk gives eight walks
        assert!(presented >= 5, "only {presented} walks finished");
    }

}
