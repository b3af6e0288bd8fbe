//! The live graph the engine reads from and writes positions back to.

use crate::model::{NodeSize, Position, Rect};
use indexmap::IndexMap;

/// Read/write access to a host graph.
pub trait GraphSurface {
    /// Node ids in graph order.
    fn node_ids(&self) -> Vec<String>;

    fn position(&self, id: &str) -> Option<Position>;

    /// Current rendered size, if the node has been measured.
    fn bounding_box(&self, id: &str) -> Option<NodeSize>;

    /// Explicit parent stored on the node.
    fn stored_parent(&self, id: &str) -> Option<String>;

    /// Explicit link list stored on the node. `None` means "derive from edges".
    fn stored_links(&self, id: &str) -> Option<Vec<String>>;

    /// Targets of the node's outgoing edges, in edge order.
    fn outgoing_edges(&self, id: &str) -> Vec<String>;

    /// Visible area, used to seed placement in an empty graph.
    fn viewport(&self) -> Option<Rect> {
        None
    }

    /// Writes a batch of positions. Observers should see the batch as one update.
    fn apply(&mut self, batch: PositionBatch);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub id: String,
    pub position: Position,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBatch {
    pub updates: Vec<PositionUpdate>,
    /// `0` applies the positions immediately.
    pub duration_ms: u64,
}

impl PositionBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// An animated move from one position to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: Position,
    pub to: Position,
    pub duration_ms: u64,
}

impl Transition {
    /// Position at `progress` (clamped to `0..=1`) along an ease-out cubic curve.
    pub fn sample(&self, progress: f64) -> Position {
        if self.duration_ms == 0 || progress >= 1.0 {
            return self.to;
        }
        let t = progress.max(0.0);
        let eased = 1.0 - (1.0 - t).powi(3);
        Position::new(
            self.from.x + (self.to.x - self.from.x) * eased,
            self.from.y + (self.to.y - self.from.y) * eased,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveNode {
    pub position: Position,
    pub size: Option<NodeSize>,
    pub parent: Option<String>,
    pub links: Option<Vec<String>>,
}

/// In-memory [`GraphSurface`] that keeps nodes and edges in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LiveGraph {
    nodes: IndexMap<String, LiveNode>,
    edges: Vec<(String, String)>,
    viewport: Option<Rect>,
    revision: u64,
    transitions: IndexMap<String, Transition>,
}

impl LiveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a node and returns it for further setup.
    pub fn add_node(&mut self, id: impl Into<String>, size: Option<NodeSize>) -> &mut LiveNode {
        let entry = self.nodes.entry(id.into()).or_default();
        entry.size = size;
        entry
    }

    pub fn node(&self, id: &str) -> Option<&LiveNode> {
        self.nodes.get(id)
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push((from.into(), to.into()));
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = Some(viewport);
    }

    /// Drops every node, edge and pending transition.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.transitions.clear();
        self.revision += 1;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bumped once per applied non-empty batch (and on [`clear`](Self::clear)).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The last animated move recorded for `id`.
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }
}

impl GraphSurface for LiveGraph {
    fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    fn position(&self, id: &str) -> Option<Position> {
        self.nodes.get(id).map(|n| n.position)
    }

    fn bounding_box(&self, id: &str) -> Option<NodeSize> {
        self.nodes.get(id).and_then(|n| n.size)
    }

    fn stored_parent(&self, id: &str) -> Option<String> {
        self.nodes.get(id).and_then(|n| n.parent.clone())
    }

    fn stored_links(&self, id: &str) -> Option<Vec<String>> {
        self.nodes.get(id).and_then(|n| n.links.clone())
    }

    fn outgoing_edges(&self, id: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(from, _)| from == id)
            .map(|(_, to)| to.clone())
            .collect()
    }

    fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    fn apply(&mut self, batch: PositionBatch) {
        if batch.is_empty() {
            return;
        }
        for update in batch.updates {
            let Some(node) = self.nodes.get_mut(&update.id) else {
                continue;
            };
            if batch.duration_ms > 0 {
                self.transitions.insert(
                    update.id.clone(),
                    Transition {
                        from: node.position,
                        to: update.position,
                        duration_ms: batch.duration_ms,
                    },
                );
            } else {
                self.transitions.shift_remove(&update.id);
            }
            node.position = update.position;
        }
        self.revision += 1;
    }
}
