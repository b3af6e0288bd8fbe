//! Engine-facing snapshot of the graph and the positions computed for it.
//!
//! Coordinates follow the rendering surface: `x` is a node's horizontal center and `y` its top
//! edge. Strategies that reason about node centers convert internally.

use crate::config::ParentPolicy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

impl NodeSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `true` when both sides are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle in surface coordinates (`x`/`y` is the top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// The engine's view of one graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    pub size: NodeSize,
    /// Explicit single-parent tree edge.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Explicit children. A node listed here is parented to this node unless it names its own
    /// `parent_id`.
    #[serde(default)]
    pub children: Vec<String>,
    /// Outgoing links (this node -> target).
    #[serde(default)]
    pub linked_node_ids: Vec<String>,
}

impl NodeInfo {
    pub fn new(id: impl Into<String>, size: NodeSize) -> Self {
        Self {
            id: id.into(),
            position: Position::ORIGIN,
            size,
            parent_id: None,
            children: Vec::new(),
            linked_node_ids: Vec::new(),
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linked_node_ids = links.into_iter().map(Into::into).collect();
        self
    }

    /// Ids this node names as its own parent, in priority order.
    ///
    /// Under [`ParentPolicy::FirstLink`] outgoing links point at the parent, so they follow the
    /// explicit `parent_id`. Under [`ParentPolicy::ExplicitOnly`] links are never parents.
    /// Parents declared through another node's `children` list are resolved by the caller.
    pub fn parent_candidate_ids(&self, policy: ParentPolicy) -> impl Iterator<Item = &str> + '_ {
        let links: &[String] = match policy {
            ParentPolicy::FirstLink => self.linked_node_ids.as_slice(),
            ParentPolicy::ExplicitOnly => &[],
        };
        self.parent_id
            .as_deref()
            .into_iter()
            .chain(links.iter().map(String::as_str))
    }

    /// Top-left corner to center.
    pub(crate) fn center(&self, size: NodeSize) -> Position {
        Position::new(self.position.x, self.position.y + size.height / 2.0)
    }
}

/// Input of a positioning call. `nodes` are already placed, `new_nodes` need placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositioningContext {
    pub nodes: Vec<NodeInfo>,
    pub new_nodes: Vec<NodeInfo>,
    /// Viewport hint used to seed nodes when the graph is empty.
    #[serde(default)]
    pub bounds: Option<Rect>,
}

impl PositioningContext {
    pub fn new(nodes: Vec<NodeInfo>, new_nodes: Vec<NodeInfo>) -> Self {
        Self {
            nodes,
            new_nodes,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Existing nodes followed by new ones. A new node shadows an existing one with the same id;
    /// later duplicates are dropped.
    pub fn all_nodes(&self) -> Vec<&NodeInfo> {
        let mut seen = rustc_hash::FxHashSet::default();
        let new_ids: rustc_hash::FxHashSet<&str> =
            self.new_nodes.iter().map(|n| n.id.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !new_ids.contains(n.id.as_str()))
            .chain(self.new_nodes.iter())
            .filter(|n| seen.insert(n.id.as_str()))
            .collect()
    }
}

/// Soft degradations observed while positioning. They never change the computed positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// The park phase found no free spot and kept the seed position.
    ParkFallback { id: String },
    /// `id` resolved more than one parent; `parent` was ignored.
    DroppedParent { id: String, parent: String },
    /// Link-derived parents formed a cycle; `id` was detached and treated as a root.
    CycleBroken { id: String },
    /// The persistent tree state did not match the graph and was rebuilt.
    FullRebuild { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositioningResult {
    /// Only nodes the strategy actually (re)positioned, in placement order.
    pub positions: IndexMap<String, Position>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl PositioningResult {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn get(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }
}
