//! Arena storage for scene nodes.
//!
//! The Tree owns every node using a sparse-set architecture with
//! generational indices. Parents own their children through id lists;
//! children only keep a non-owning [`Owner`] handle for upward traversal.
//!
//! ## Key Features
//!
//! - **Generational Indices**: NodeId contains index + generation, so an id
//!   kept by a pending work item or an event handler becomes a harmless
//!   tombstone once its node is disposed and the slot reused.
//!
//! - **Dense Storage**: Nodes are stored contiguously, with swap-remove on
//!   disposal.
//!
//! - **Keys**: Every node has a unique string key for lookup. Duplicate keys
//!   are replaced by a generated one.
//!
//! - **Dirty Propagation**: Marking a node dirty walks the owner chain to
//!   the layer, which is queued for repaint.

use std::collections::{HashMap, HashSet};

use crate::layer::LayerId;
use crate::node::{DirtyFlags, Node};

/// Unique identifier for a node in the tree.
///
/// - `index`: Position in the sparse array (reusable after removal)
/// - `generation`: Version counter that increments when a slot is reused
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Combines generation (high bits) with index (low bits).
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

/// Who owns a node. A node has at most one owner.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Owner {
    Container(NodeId),
    Layer(LayerId),
}

/// Entry in the sparse map, pointing to a dense array slot.
struct SparseEntry {
    /// Index into the dense array, `None` while the slot is free
    dense_index: Option<usize>,
    /// Survives removal so that a reused slot gets a fresh generation
    generation: u32,
}

struct Slot {
    node: Node,
    /// Back-pointer to sparse array index (for swap-remove fixup)
    sparse_index: u32,
}

pub struct Tree {
    dense: Vec<Slot>,
    sparse: Vec<SparseEntry>,
    free_indices: Vec<u32>,
    keys: HashMap<String, NodeId>,
    /// Monotonic counter handing out insertion indices
    next_order: u64,
    next_key: u64,
    dirty_layers: HashSet<LayerId>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
            keys: HashMap::new(),
            next_order: 0,
            next_key: 0,
            dirty_layers: HashSet::new(),
        }
    }

    /// Store a detached node and return its id.
    ///
    /// An empty key is replaced by a generated one. A key that is already
    /// taken gets a numeric suffix.
    pub fn insert(&mut self, mut node: Node) -> NodeId {
        node.key = self.unique_key(std::mem::take(&mut node.key));

        let (sparse_index, generation) = match self.free_indices.pop() {
            Some(idx) => {
                let entry = &mut self.sparse[idx as usize];
                entry.generation = entry.generation.wrapping_add(1);
                (idx, entry.generation)
            }
            None => {
                let idx = self.sparse.len() as u32;
                self.sparse.push(SparseEntry {
                    dense_index: None,
                    generation: 0,
                });
                (idx, 0)
            }
        };

        let id = NodeId::new(sparse_index, generation);
        self.keys.insert(node.key.clone(), id);
        self.sparse[sparse_index as usize].dense_index = Some(self.dense.len());
        self.dense.push(Slot { node, sparse_index });
        id
    }

    /// Remove a node from the arena. Ownership links are not touched; the
    /// caller detaches first.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let dense_index = self.dense_index(id)?;
        let last = self.dense.len() - 1;
        let slot = self.dense.swap_remove(dense_index);

        if dense_index != last {
            let moved = self.dense[dense_index].sparse_index;
            self.sparse[moved as usize].dense_index = Some(dense_index);
        }

        self.sparse[id.index as usize].dense_index = None;
        self.free_indices.push(id.index);
        self.keys.remove(&slot.node.key);
        Some(slot.node)
    }

    fn dense_index(&self, id: NodeId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.dense_index)
    }

    fn unique_key(&mut self, key: String) -> String {
        if !key.is_empty() && !self.keys.contains_key(&key) {
            return key;
        }

        let base = if key.is_empty() { "node" } else { key.as_str() };
        loop {
            self.next_key += 1;
            let candidate = format!("{base}-{}", self.next_key);
            if !self.keys.contains_key(&candidate) {
                if !key.is_empty() {
                    log::warn!("duplicate node key {key:?}, using {candidate:?}");
                }
                return candidate;
            }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.dense_index(id).map(|idx| &self.dense[idx].node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.dense_index(id).map(|idx| &mut self.dense[idx].node)
    }

    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.sparse
            .iter()
            .enumerate()
            .filter(|(_, e)| e.dense_index.is_some())
            .map(|(i, e)| NodeId::new(i as u32, e.generation))
            .collect()
    }

    pub fn owner(&self, id: NodeId) -> Option<Owner> {
        self.get(id).and_then(|n| n.owner)
    }

    /// The owning container, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self.owner(id)? {
            Owner::Container(parent) => Some(parent),
            Owner::Layer(_) => None,
        }
    }

    /// Container ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// The layer at the top of the owner chain.
    pub fn layer_of(&self, id: NodeId) -> Option<LayerId> {
        let root = self.ancestors(id).last().copied().unwrap_or(id);
        match self.owner(root)? {
            Owner::Layer(layer) => Some(layer),
            Owner::Container(_) => None,
        }
    }

    /// Whether `ancestor` is `id` itself or one of its containers.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    /// Nearest ancestor container with `clip` set.
    pub fn clip_ancestor(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|a| self.get(*a).is_some_and(|n| n.style.clip))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// `id` and everything below it, parents before children.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Hand out the next insertion index for `id`.
    pub(crate) fn assign_order(&mut self, id: NodeId) {
        self.next_order += 1;
        let order = self.next_order;
        if let Some(node) = self.get_mut(id) {
            node.index = order;
        }
    }

    /// Insert `id` into an id list sorted by (z-index, insertion index).
    pub(crate) fn insert_sorted(&self, list: &mut Vec<NodeId>, id: NodeId) {
        let Some(key) = self.get(id).map(Node::order) else {
            return;
        };
        let pos = list.partition_point(|other| {
            self.get(*other)
                .map(Node::order)
                .is_some_and(|other_key| other_key <= key)
        });
        list.insert(pos, id);
    }

    /// Append `child` to `parent`'s child list and record the ownership.
    /// The caller has already detached `child` and checked for cycles.
    pub(crate) fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        self.assign_order(child);

        let mut children = match self.get_mut(parent).and_then(|n| n.kind.children_mut()) {
            Some(container) => std::mem::take(&mut container.children),
            None => return,
        };
        self.insert_sorted(&mut children, child);
        if let Some(container) = self.get_mut(parent).and_then(|n| n.kind.children_mut()) {
            container.children = children;
        }

        if let Some(node) = self.get_mut(child) {
            node.owner = Some(Owner::Container(parent));
        }
    }

    /// Remove `child` from `parent`'s child list. Returns false if it was
    /// not there.
    pub(crate) fn detach_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let removed = match self.get_mut(parent).and_then(|n| n.kind.children_mut()) {
            Some(container) => {
                let before = container.children.len();
                container.children.retain(|c| *c != child);
                container.children.len() != before
            }
            None => false,
        };
        if let Some(node) = self.get_mut(child) {
            if node.owner == Some(Owner::Container(parent)) {
                node.owner = None;
            }
        }
        removed
    }

    /// Move `child` to its sorted position after a z-index change.
    pub(crate) fn resort_child(&mut self, parent: NodeId, child: NodeId) {
        let mut children = match self.get_mut(parent).and_then(|n| n.kind.children_mut()) {
            Some(container) => std::mem::take(&mut container.children),
            None => return,
        };
        children.retain(|c| *c != child);
        self.insert_sorted(&mut children, child);
        if let Some(container) = self.get_mut(parent).and_then(|n| n.kind.children_mut()) {
            container.children = children;
        }
    }

    /// Flag `id` and every container above it for repaint and queue the
    /// owning layer.
    pub fn mark_dirty(&mut self, id: NodeId) {
        let mut current = id;
        loop {
            let Some(node) = self.get_mut(current) else {
                return;
            };
            node.dirty |= DirtyFlags::REPAINT;

            match node.owner {
                Some(Owner::Container(parent)) => current = parent,
                Some(Owner::Layer(layer)) => {
                    self.dirty_layers.insert(layer);
                    return;
                }
                None => return,
            }
        }
    }

    /// Flag `id` and its whole subtree for layout.
    pub fn mark_layout(&mut self, id: NodeId) {
        for node_id in self.subtree(id) {
            if let Some(node) = self.get_mut(node_id) {
                node.dirty |= DirtyFlags::LAYOUT;
            }
        }
    }

    /// Drop the cached bitmaps of every ancestor of `id`.
    pub fn invalidate_ancestor_caches(&mut self, id: NodeId) {
        for ancestor in self.ancestors(id) {
            if let Some(node) = self.get_mut(ancestor) {
                if node.cache.take().is_some() {
                    log::debug!("dropped cached bitmap of {:?}", node.key);
                }
            }
        }
    }

    pub fn mark_layer_dirty(&mut self, layer: LayerId) {
        self.dirty_layers.insert(layer);
    }

    /// Take all queued layers (clears the set).
    pub fn take_dirty_layers(&mut self) -> Vec<LayerId> {
        self.dirty_layers.drain().collect()
    }

    pub fn has_dirty_layers(&self) -> bool {
        !self.dirty_layers.is_empty()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
