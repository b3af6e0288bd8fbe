use crate::error::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Stable numeric identity of a kernel node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Absolute kernel coordinate: `x` is the horizontal center, `y` the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Which node is pinned to the coordinate origin after a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// The root sits at `(0, 0)`.
    #[default]
    Root,
    /// The root's first child sits at `(0, 0)`; the root itself ends up above and beside it.
    ///
    /// Useful when the root is synthetic: appending new children to the root then leaves the
    /// existing ones in place.
    FirstChild,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TidyConfig {
    /// Vertical gap between a parent's bottom edge and its children's top edges.
    pub parent_child_margin: f64,
    /// Minimum horizontal gap between neighboring subtree contours.
    pub peer_margin: f64,
    pub anchor: Anchor,
}

impl Default for TidyConfig {
    fn default() -> Self {
        Self {
            parent_child_margin: 150.0,
            peer_margin: 100.0,
            anchor: Anchor::Root,
        }
    }
}

/// Contour and threading state of one node.
///
/// Node references are arena slots. `None` means "no thread" / "not computed yet".
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ContourState {
    pub(crate) thread_left: Option<usize>,
    pub(crate) thread_right: Option<usize>,
    pub(crate) extreme_left: Option<usize>,
    pub(crate) extreme_right: Option<usize>,
    pub(crate) shift_acceleration: f64,
    pub(crate) shift_change: f64,
    pub(crate) modifier_to_subtree: f64,
    pub(crate) modifier_thread_left: f64,
    pub(crate) modifier_thread_right: f64,
    pub(crate) modifier_extreme_left: f64,
    pub(crate) modifier_extreme_right: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct TreeNode {
    pub(crate) id: NodeId,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) relative_x: f64,
    pub(crate) depth: u32,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    pub(crate) contour: ContourState,
}

impl TreeNode {
    fn new(id: NodeId, parent: Option<usize>, depth: u32, width: f64, height: f64) -> Self {
        Self {
            id,
            width,
            height,
            x: 0.0,
            y: 0.0,
            relative_x: 0.0,
            depth,
            parent,
            children: Vec::new(),
            contour: ContourState::default(),
        }
    }

    pub(crate) fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A persistent, arena-backed tidy tree.
///
/// The tree always has exactly one root, supplied at construction. Nodes are appended as the last
/// child of an existing parent and are never removed individually; [`TidyTree::clear`] drops
/// everything except the root.
#[derive(Debug, Clone)]
pub struct TidyTree {
    pub(crate) config: TidyConfig,
    pub(crate) nodes: Vec<TreeNode>,
    slots: FxHashMap<NodeId, usize>,
}

pub(crate) const ROOT_SLOT: usize = 0;

impl TidyTree {
    pub fn new(config: TidyConfig, root: NodeId, width: f64, height: f64) -> Self {
        let mut slots = FxHashMap::default();
        slots.insert(root, ROOT_SLOT);
        let mut tree = Self {
            config,
            nodes: vec![TreeNode::new(root, None, 0, width, height)],
            slots,
        };
        tree.nodes[ROOT_SLOT].y = tree.root_y();
        tree
    }

    pub fn root(&self) -> NodeId {
        self.nodes[ROOT_SLOT].id
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when only the root is left.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Drops every node except the root and forgets all computed positions.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[ROOT_SLOT];
        root.children.clear();
        root.x = 0.0;
        root.relative_x = 0.0;
        root.contour = ContourState::default();
        let root_id = root.id;
        self.nodes[ROOT_SLOT].y = self.root_y();
        self.slots.clear();
        self.slots.insert(root_id, ROOT_SLOT);
    }

    /// Appends `id` as the last child of `parent`.
    ///
    /// The new node has no position until the next [`layout`](Self::layout) or
    /// [`partial_layout`](Self::partial_layout) that includes it.
    ///
    /// # Panics
    ///
    /// Panics when `parent` is not in the tree. Callers must insert parents before children.
    pub fn insert(&mut self, id: NodeId, parent: NodeId, width: f64, height: f64) -> Result<()> {
        if self.slots.contains_key(&id) {
            return Err(Error::DuplicateNode { id });
        }
        let Some(&parent_slot) = self.slots.get(&parent) else {
            panic!("tidy tree: parent {parent} of node {id} must be inserted before its children");
        };

        let slot = self.nodes.len();
        let depth = self.nodes[parent_slot].depth + 1;
        self.nodes
            .push(TreeNode::new(id, Some(parent_slot), depth, width, height));
        self.nodes[parent_slot].children.push(slot);
        self.slots.insert(id, slot);
        Ok(())
    }

    /// Changes the bounding box of an existing node. Pass the id to the next
    /// [`partial_layout`](Self::partial_layout) to apply it.
    pub fn update_size(&mut self, id: NodeId, width: f64, height: f64) -> Result<()> {
        let slot = self.slot(id)?;
        let node = &mut self.nodes[slot];
        node.width = width;
        node.height = height;
        Ok(())
    }

    pub fn position(&self, id: NodeId) -> Option<Point> {
        let node = &self.nodes[*self.slots.get(&id)?];
        Some(Point {
            x: node.x,
            y: node.y,
        })
    }

    pub fn size(&self, id: NodeId) -> Option<(f64, f64)> {
        let node = &self.nodes[*self.slots.get(&id)?];
        Some((node.width, node.height))
    }

    pub fn depth(&self, id: NodeId) -> Option<u32> {
        Some(self.nodes[*self.slots.get(&id)?].depth)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let node = &self.nodes[*self.slots.get(&id)?];
        node.parent.map(|slot| self.nodes[slot].id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.slots
            .get(&id)
            .map(|&slot| {
                self.nodes[slot]
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All nodes in insertion order, root first.
    pub fn positions(&self) -> impl Iterator<Item = (NodeId, Point)> + '_ {
        self.nodes
            .iter()
            .map(|n| (n.id, Point { x: n.x, y: n.y }))
    }

    /// Bulk layout of the whole tree. O(n).
    pub fn layout(&mut self) {
        let start = std::time::Instant::now();
        for node in &mut self.nodes {
            node.relative_x = 0.0;
            node.contour = ContourState::default();
        }
        let mut touched = Vec::new();
        self.set_y_subtree(ROOT_SLOT, &mut touched);
        self.first_walk(None);
        self.second_walk(None, &mut touched);
        tracing::trace!(nodes = self.nodes.len(), elapsed = ?start.elapsed(), "tidy layout");
    }

    /// Incremental layout restricted to `changed` nodes, their subtrees' vertical extent, and
    /// their ancestor chains.
    ///
    /// `changed` lists nodes inserted or resized since the last walk, parents before children.
    /// Returns every node whose position was rewritten, in walk order.
    pub fn partial_layout(&mut self, changed: &[NodeId]) -> Result<Vec<NodeId>> {
        if changed.is_empty() {
            return Ok(Vec::new());
        }
        let start = std::time::Instant::now();
        // Children of the root take their y from it, so it must hold the anchored value even
        // before the first bulk layout.
        self.nodes[ROOT_SLOT].y = self.root_y();
        let slots = changed
            .iter()
            .map(|&id| self.slot(id))
            .collect::<Result<Vec<_>>>()?;

        let mut touched = Vec::new();
        for &slot in &slots {
            self.set_y_subtree(slot, &mut touched);
        }

        // Each ancestor chain is collected on its own; chains that meet stop at the first node
        // another chain already claimed.
        let mut dirty: FxHashSet<usize> = FxHashSet::default();
        for &slot in &slots {
            dirty.insert(slot);
            let mut current = slot;
            while let Some(parent) = self.nodes[current].parent {
                self.invalidate_extreme_thread(current);
                if !dirty.insert(parent) {
                    break;
                }
                current = parent;
            }
        }

        self.first_walk(Some(&dirty));
        self.second_walk(Some(&dirty), &mut touched);

        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let moved: Vec<NodeId> = touched
            .into_iter()
            .filter(|slot| seen.insert(*slot))
            .map(|slot| self.nodes[slot].id)
            .collect();
        tracing::trace!(
            changed = changed.len(),
            dirty = dirty.len(),
            moved = moved.len(),
            elapsed = ?start.elapsed(),
            "tidy partial layout"
        );
        Ok(moved)
    }

    fn slot(&self, id: NodeId) -> Result<usize> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(Error::UnknownNode { id })
    }
}
