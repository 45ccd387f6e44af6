use crate::canvas::Canvas;
use crate::style::Style;
use crate::tree::NodeId;

use super::{paint_box, Clippable, ComputedLayout, Env, HasChildren, Layoutable, PaintStatus, Paintable};

/// How a container positions its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arrangement {
    /// Children position themselves with left/right/top/bottom
    #[default]
    Free,
    /// Children follow each other along one axis in insertion order. The
    /// child's leading and trailing offsets on that axis act as gaps.
    Stack { vertical: bool },
    /// Children flow left to right and break onto new lines when the
    /// content width is exhausted.
    Wrap,
}

/// A box that owns child nodes.
///
/// `children` is kept sorted by (z-index, insertion index), which is the
/// paint order. Hit-testing walks it backwards.
#[derive(Debug, Default, Clone)]
pub struct Container {
    pub(crate) children: Vec<NodeId>,
    arrangement: Arrangement,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(vertical: bool) -> Self {
        Self {
            children: Vec::new(),
            arrangement: Arrangement::Stack { vertical },
        }
    }

    pub fn wrap() -> Self {
        Self {
            children: Vec::new(),
            arrangement: Arrangement::Wrap,
        }
    }

    pub(crate) fn set_arrangement(&mut self, arrangement: Arrangement) -> bool {
        if self.arrangement == arrangement {
            return false;
        }
        self.arrangement = arrangement;
        true
    }
}

impl HasChildren for Container {
    fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }

    fn arrangement(&self) -> Arrangement {
        self.arrangement
    }
}

// Arranged sizing needs the children, so it is resolved by the layout pass.
impl Layoutable for Container {}

impl Paintable for Container {
    fn paint(&self, style: &Style, layout: &ComputedLayout, canvas: &mut Canvas, env: &mut Env) -> PaintStatus {
        paint_box(style, layout, canvas, env.dpr);
        PaintStatus::Done
    }
}

impl Clippable for Container {}
