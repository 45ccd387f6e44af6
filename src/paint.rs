//! The paint walk.
//!
//! Painting is an explicit worklist instead of recursion so that a layer can
//! stop after its frame budget, or when an image is still decoding, and pick
//! up at the same item on the next frame. Items hold [`NodeId`]s only; an
//! item whose node was disposed in the meantime is skipped.

use std::time::Instant;

use crate::bounding_rect::BoundingRect;
use crate::canvas::Canvas;
use crate::layout::{ensure_layout, LayoutProgress};
use crate::matrix::Matrix;
use crate::node::{CachedBitmap, DirtyFlags, Env, PaintStatus};
use crate::tree::{NodeId, Tree};

/// Padding around cached bitmaps so antialiased edges are not cut off.
const CACHE_PADDING: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Work {
    /// Paint a node with the opacity inherited from its ancestors
    Visit(NodeId, f32),
    /// Restore the clip saved by a clipping container
    PopClip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkStatus {
    Complete,
    /// Out of time; the remaining work stays on the stack
    Yielded,
    /// Waiting for a resource; the blocked item is back on the stack
    Suspended,
}

/// Where the walk draws.
pub(crate) struct Target<'c> {
    pub canvas: &'c mut Canvas,
    /// Applied after every node transform (maps into a cache bitmap)
    pub post: Matrix,
    /// Nodes whose rect misses this are skipped; `None` paints everything
    pub cull: Option<BoundingRect>,
}

/// Run work items until the stack is empty, `deadline` passes or a node
/// suspends. At least one item is always processed.
pub(crate) fn run(
    tree: &mut Tree,
    env: &mut Env,
    target: &mut Target,
    stack: &mut Vec<Work>,
    deadline: Option<Instant>,
) -> WalkStatus {
    while let Some(item) = stack.pop() {
        match item {
            Work::PopClip => target.canvas.pop_clip(),
            Work::Visit(id, alpha) => {
                if visit(tree, env, target, stack, id, alpha) == PaintStatus::Suspended {
                    stack.push(item);
                    return WalkStatus::Suspended;
                }
            }
        }

        if deadline.is_some_and(|d| Instant::now() >= d) && !stack.is_empty() {
            return WalkStatus::Yielded;
        }
    }
    WalkStatus::Complete
}

/// Whether a node takes part in painting and picking at all.
pub fn should_paint(tree: &Tree, id: NodeId, viewport: Option<BoundingRect>) -> bool {
    let Some(node) = tree.get(id) else {
        return false;
    };
    let style = &node.style;
    if !node.visible || style.opacity <= 0.0 || style.scale[0] == 0.0 || style.scale[1] == 0.0 {
        return false;
    }

    let area = match tree.clip_ancestor(id) {
        Some(clip) => tree.get(clip).map(|n| n.layout.rect),
        None => viewport,
    };
    area.map_or(true, |area| node.layout.rect.intersect(&area))
}

fn visit(
    tree: &mut Tree,
    env: &mut Env,
    target: &mut Target,
    stack: &mut Vec<Work>,
    id: NodeId,
    inherited_alpha: f32,
) -> PaintStatus {
    if !tree.contains(id) {
        return PaintStatus::Done;
    }
    if ensure_layout(tree, id, env) == LayoutProgress::Suspended {
        return PaintStatus::Suspended;
    }
    if !should_paint(tree, id, target.cull) {
        clear_repaint(tree, id);
        return PaintStatus::Done;
    }

    let Some(node) = tree.get(id) else {
        return PaintStatus::Done;
    };
    let alpha = inherited_alpha * node.style.opacity;
    let blend = node.style.composite.blend_mode();
    let transform = node.layout.transform.then(&target.post);

    if node.style.is_static {
        if !node.has_cache() {
            match build_cache(tree, env, id) {
                CacheBuild::Built(bitmap) => {
                    if let Some(node) = tree.get_mut(id) {
                        node.cache = Some(bitmap);
                    }
                }
                CacheBuild::Suspended => return PaintStatus::Suspended,
                CacheBuild::Failed => {}
            }
        }

        if let Some(bitmap) = tree.get(id).and_then(|n| n.cache.as_ref()) {
            target.canvas.set_transform(transform);
            target.canvas.set_alpha(alpha);
            target.canvas.set_blend_mode(blend);
            target
                .canvas
                .draw_pixmap(bitmap.pixmap.as_ref(), bitmap.offset.0, bitmap.offset.1);
            clear_repaint_subtree(tree, id);
            return PaintStatus::Done;
        }
    } else if let Some(node) = tree.get_mut(id) {
        node.cache = None;
    }

    let Some(node) = tree.get(id) else {
        return PaintStatus::Done;
    };
    target.canvas.set_transform(transform);
    target.canvas.set_alpha(alpha);
    target.canvas.set_blend_mode(blend);
    if node
        .kind
        .paintable()
        .paint(&node.style, &node.layout, target.canvas, env)
        == PaintStatus::Suspended
    {
        return PaintStatus::Suspended;
    }

    let children = node.children();
    if !children.is_empty() {
        if node.style.clip {
            if let Some(path) = node.kind.clippable().clip_path(&node.layout) {
                target.canvas.set_transform(transform);
                target.canvas.push_clip(&path);
                stack.push(Work::PopClip);
            }
        }
        stack.extend(children.iter().rev().map(|c| Work::Visit(*c, alpha)));
    }

    clear_repaint(tree, id);
    PaintStatus::Done
}

fn clear_repaint(tree: &mut Tree, id: NodeId) {
    if let Some(node) = tree.get_mut(id) {
        node.dirty.remove(DirtyFlags::REPAINT);
    }
}

fn clear_repaint_subtree(tree: &mut Tree, id: NodeId) {
    for node in tree.subtree(id) {
        clear_repaint(tree, node);
    }
}

enum CacheBuild {
    Built(CachedBitmap),
    Suspended,
    Failed,
}

/// Render a static node and its subtree into a bitmap in the node's local
/// frame.
fn build_cache(tree: &mut Tree, env: &mut Env, id: NodeId) -> CacheBuild {
    let subtree = tree.subtree(id);
    for node in &subtree {
        if ensure_layout(tree, *node, env) == LayoutProgress::Suspended {
            return CacheBuild::Suspended;
        }
    }

    let Some(node) = tree.get(id) else {
        return CacheBuild::Failed;
    };
    let to_local = node.layout.transform.invert();
    let mut extent = node.layout.bounds;
    for descendant in subtree.iter().skip(1) {
        if let Some(d) = tree.get(*descendant).filter(|d| d.visible) {
            extent = extent.extend(&d.layout.bounds.transform(&d.layout.transform.then(&to_local)));
        }
    }
    let extent = extent.outset(CACHE_PADDING);

    let offset = (extent.x.floor(), extent.y.floor());
    let width = (extent.right() - offset.0).ceil().max(1.0) as u32;
    let height = (extent.bottom() - offset.1).ceil().max(1.0) as u32;

    let mut canvas = match Canvas::new(width, height) {
        Ok(canvas) => canvas,
        Err(err) => {
            log::warn!("cannot cache {:?}, painting live: {err}", node.key);
            return CacheBuild::Failed;
        }
    };
    log::debug!("caching {:?} as {width}x{height}", node.key);

    // The node's own opacity is applied when the bitmap is drawn
    let mut target = Target {
        canvas: &mut canvas,
        post: to_local.then(&Matrix::from_translate(-offset.0, -offset.1)),
        cull: None,
    };

    // Paint the node as if it were not static, then its children
    let mut stack = Vec::new();
    let Some(node) = tree.get(id) else {
        return CacheBuild::Failed;
    };
    target.canvas.set_transform(node.layout.transform.then(&target.post));
    if node
        .kind
        .paintable()
        .paint(&node.style, &node.layout, target.canvas, env)
        == PaintStatus::Suspended
    {
        return CacheBuild::Suspended;
    }
    if node.style.clip {
        if let Some(path) = node.kind.clippable().clip_path(&node.layout) {
            target.canvas.push_clip(&path);
        }
    }
    stack.extend(node.children().iter().rev().map(|c| Work::Visit(*c, 1.0)));

    if run(tree, env, &mut target, &mut stack, None) == WalkStatus::Suspended {
        return CacheBuild::Suspended;
    }

    CacheBuild::Built(CachedBitmap {
        pixmap: canvas.into_pixmap(),
        offset,
    })
}
