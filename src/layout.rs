//! Box-model resolution.
//!
//! Layout is lazy and top-down: a node is only recomputed while it carries
//! [`DirtyFlags::LAYOUT`], and recomputing a container flags its direct
//! children so the walk continues below it. [`ensure_layout`] brings a node
//! and its whole ancestor chain up to date, which is what both the paint
//! walk and hit-testing rely on.

use crate::bounding_rect::BoundingRect;
use crate::matrix::Matrix;
use crate::node::{Arrangement, ComputedLayout, DirtyFlags, Env, Measure};
use crate::shape;
use crate::style::Length;
use crate::tree::{NodeId, Owner, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutProgress {
    Ready,
    /// Some content is still loading; retry on a later frame
    Suspended,
}

/// Lay out `id` and any stale ancestors, outermost first.
pub fn ensure_layout(tree: &mut Tree, id: NodeId, env: &mut Env) -> LayoutProgress {
    let mut chain = tree.ancestors(id);
    chain.reverse();
    chain.push(id);

    for node in chain {
        if tree.get(node).is_some_and(|n| n.needs_layout())
            && update(tree, node, env) == LayoutProgress::Suspended
        {
            return LayoutProgress::Suspended;
        }
    }
    LayoutProgress::Ready
}

/// World-space bounding box of `id`, laying it out first if needed.
pub fn bounding_rect(tree: &mut Tree, id: NodeId, env: &mut Env) -> Option<BoundingRect> {
    match ensure_layout(tree, id, env) {
        LayoutProgress::Ready => tree.get(id).map(|n| n.layout.rect),
        LayoutProgress::Suspended => None,
    }
}

/// Recompute one node. Its parent must already be up to date.
fn update(tree: &mut Tree, id: NodeId, env: &mut Env) -> LayoutProgress {
    let (base, parent_transform) = match tree.owner(id) {
        Some(Owner::Container(parent)) => match tree.get(parent) {
            Some(p) => (p.layout.content_size(), p.layout.content_transform()),
            None => return LayoutProgress::Ready,
        },
        Some(Owner::Layer(_)) | None => match tree.get(id) {
            Some(n) => (n.viewport, Matrix::IDENTITY),
            None => return LayoutProgress::Ready,
        },
    };

    let Some((width, height)) = resolve_size(tree, id, base, env) else {
        log::debug!("layout of {id:?} suspended");
        return LayoutProgress::Suspended;
    };

    let dpr = env.dpr;
    let Some(node) = tree.get_mut(id) else {
        return LayoutProgress::Ready;
    };
    let style = &node.style;

    let border = (style.border * dpr).clamp(0.0, width.min(height) / 2.0);
    let radii = shape::clamp_radii(width, height, style.border_radius.map(|r| r * dpr));

    let (transform, bounds, origin, position) = match node.kind.local_frame() {
        Some(frame) => {
            // Drawn in the parent's content frame, pivoting inside its own bounds
            let origin = (style.origin[0] * frame.width, style.origin[1] * frame.height);
            let pivot = (frame.x + origin.0, frame.y + origin.1);
            let local = Matrix::IDENTITY
                .translate(-pivot.0, -pivot.1)
                .scale(style.scale[0], style.scale[1])
                .rotate(style.rotation)
                .translate(pivot.0, pivot.1);
            (
                local.then(&parent_transform),
                frame,
                origin,
                (frame.x, frame.y),
            )
        }
        None => {
            let origin = (style.origin[0] * width, style.origin[1] * height);
            let x = node.placement.x.unwrap_or_else(|| {
                resolve_position(style.left, style.right, base.0, width, dpr)
            });
            let y = node.placement.y.unwrap_or_else(|| {
                resolve_position(style.top, style.bottom, base.1, height, dpr)
            });
            let local = Matrix::IDENTITY
                .translate(-origin.0, -origin.1)
                .scale(style.scale[0], style.scale[1])
                .rotate(style.rotation)
                .translate(x + origin.0, y + origin.1);
            (
                local.then(&parent_transform),
                BoundingRect::from_size(width, height),
                origin,
                (x, y),
            )
        }
    };

    if node.layout.width != width || node.layout.height != height {
        node.cache = None;
    }
    node.layout = ComputedLayout {
        width,
        height,
        border,
        radii,
        origin,
        base,
        position,
        transform,
        rect: bounds.transform(&transform),
        bounds,
    };
    node.hit_memo.clear();
    node.dirty.remove(DirtyFlags::LAYOUT);

    let children = node.children().to_vec();
    for child in children {
        if let Some(child) = tree.get_mut(child) {
            child.dirty |= DirtyFlags::LAYOUT;
        }
    }
    LayoutProgress::Ready
}

/// Explicit leading offset, else trailing offset, else centered.
fn resolve_position(
    lead: Option<Length>,
    trail: Option<Length>,
    base: f32,
    size: f32,
    dpr: f32,
) -> f32 {
    if let Some(v) = lead.and_then(|l| l.resolve(base, dpr)) {
        return v;
    }
    if let Some(v) = trail.and_then(|t| t.resolve(base, dpr)) {
        return base - v - size;
    }
    (base - size) / 2.0
}

/// Width and height of `id` against a base box. Arranging containers also
/// place their children. `None` while some content is pending.
fn resolve_size(tree: &mut Tree, id: NodeId, base: (f32, f32), env: &mut Env) -> Option<(f32, f32)> {
    let dpr = env.dpr;
    let node = match tree.get_mut(id) {
        Some(node) => node,
        None => return Some((0.0, 0.0)),
    };

    let fixed_w = node.style.width.resolve(base.0, dpr);
    let fixed_h = node.style.height.resolve(base.1, dpr);
    let border = (node.style.border * dpr).max(0.0);
    let arrangement = node
        .kind
        .children()
        .map(|c| c.arrangement())
        .unwrap_or_default();

    let (measured_w, measured_h) = match node
        .kind
        .layoutable()
        .measure(&node.style, fixed_w, fixed_h, env)
    {
        Measure::Ready { width, height } => (width, height),
        Measure::Pending => return None,
    };

    let mut width = fixed_w.or(measured_w).unwrap_or(base.0);
    let mut height = fixed_h.or(measured_h).unwrap_or(base.1);

    if arrangement != Arrangement::Free {
        let content = (
            (fixed_w.unwrap_or(base.0) - border * 2.0).max(0.0),
            (fixed_h.unwrap_or(base.1) - border * 2.0).max(0.0),
        );
        let extent = arrange(tree, id, arrangement, content, env)?;
        if fixed_w.is_none() {
            width = extent.0 + border * 2.0;
        }
        if fixed_h.is_none() {
            height = extent.1 + border * 2.0;
        }
    }

    Some((width.max(0.0), height.max(0.0)))
}

/// A gap length. Percentages have nothing to resolve against and count as zero.
fn gap(length: Option<Length>, dpr: f32) -> f32 {
    length.and_then(|l| l.resolve(0.0, dpr)).unwrap_or(0.0)
}

/// Assign placements to the children of an arranging container and return
/// the content extent.
fn arrange(
    tree: &mut Tree,
    id: NodeId,
    arrangement: Arrangement,
    content: (f32, f32),
    env: &mut Env,
) -> Option<(f32, f32)> {
    let dpr = env.dpr;

    // Arrangement follows insertion order, not paint order
    let mut children: Vec<_> = tree
        .children(id)
        .iter()
        .filter_map(|c| tree.get(*c).filter(|n| n.visible).map(|n| (n.index, *c)))
        .collect();
    children.sort_unstable();

    match arrangement {
        Arrangement::Free => Some((0.0, 0.0)),
        Arrangement::Stack { vertical } => {
            let mut cursor = 0.0f32;
            let mut cross = 0.0f32;

            for (_, child) in children {
                let (w, h) = resolve_size(tree, child, content, env)?;
                let node = tree.get_mut(child)?;
                let style = &node.style;

                if vertical {
                    cursor += gap(style.top, dpr);
                    node.placement.y = Some(cursor);
                    cursor += h + gap(style.bottom, dpr);
                    cross = cross.max(w);
                } else {
                    cursor += gap(style.left, dpr);
                    node.placement.x = Some(cursor);
                    cursor += w + gap(style.right, dpr);
                    cross = cross.max(h);
                }
            }

            Some(if vertical {
                (cross, cursor)
            } else {
                (cursor, cross)
            })
        }
        Arrangement::Wrap => {
            let max_width = content.0;
            // (line height, [(child, child height)])
            let mut lines: Vec<(f32, Vec<(NodeId, f32)>)> = vec![(0.0, Vec::new())];
            let mut x = 0.0f32;
            let mut widest = 0.0f32;

            for (_, child) in children {
                let (w, h) = resolve_size(tree, child, content, env)?;
                let node = tree.get_mut(child)?;
                let style = &node.style;
                let left = gap(style.left, dpr);

                if x > 0.0 && x + left + w > max_width {
                    x = 0.0;
                    lines.push((0.0, Vec::new()));
                }

                x += left;
                node.placement.x = Some(x);
                x += w + gap(style.right, dpr);
                widest = widest.max(x);

                let outer = gap(style.top, dpr) + h + gap(style.bottom, dpr);
                if let Some(line) = lines.last_mut() {
                    line.0 = line.0.max(outer);
                    line.1.push((child, h));
                }
            }

            let mut y = 0.0f32;
            for (line_height, nodes) in lines {
                for (child, h) in nodes {
                    if let Some(node) = tree.get_mut(child) {
                        node.placement.y = Some(y + (line_height - h) / 2.0);
                    }
                }
                y += line_height;
            }

            Some((widest, y))
        }
    }
}
