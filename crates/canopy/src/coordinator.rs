//! String-keyed façade over the persistent tidy kernel.

use crate::config::LayoutConfig;
use crate::hierarchy::Hierarchy;
use crate::model::{Diagnostic, NodeInfo, NodeSize, Position, PositioningContext, PositioningResult};
use canopy_tidy::{NodeId, TidyTree};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

/// Kernel id of the synthetic root that every parent-less node hangs off.
pub const GHOST_ROOT: NodeId = NodeId(0);

/// Context positions closer than this to the computed ones count as unchanged.
const MOVE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placed {
    parent: NodeId,
    size: NodeSize,
}

/// Owns one kernel instance for the lifetime of a session.
///
/// String ids are mapped to numeric kernel ids on first sight and keep that id until
/// [`reset`](Self::reset); a full build reuses the existing mapping.
#[derive(Debug)]
pub struct TreeCoordinator {
    config: LayoutConfig,
    kernel: TidyTree,
    ids: FxHashMap<String, NodeId>,
    /// `names[n - 1]` is the string id of `NodeId(n)`.
    names: Vec<String>,
    /// What the kernel currently holds, per real node.
    placed: FxHashMap<NodeId, Placed>,
}

impl TreeCoordinator {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            kernel: TidyTree::new(config.tidy_config(), GHOST_ROOT, 0.0, 0.0),
            config,
            ids: FxHashMap::default(),
            names: Vec::new(),
            placed: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Numeric id assigned to `id`, if it was ever seen by this coordinator.
    pub fn node_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Number of real nodes in the kernel.
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_id(id)
            .is_some_and(|n| self.placed.contains_key(&n))
    }

    /// Current kernel position of `id`.
    pub fn position(&self, id: &str) -> Option<Position> {
        let n = self.node_id(id)?;
        if !self.placed.contains_key(&n) {
            return None;
        }
        self.kernel.position(n).map(|p| Position::new(p.x, p.y))
    }

    /// Discards the kernel, the id map and every cache. The next call starts a new session.
    pub fn reset(&mut self) {
        self.kernel = TidyTree::new(self.config.tidy_config(), GHOST_ROOT, 0.0, 0.0);
        self.ids.clear();
        self.names.clear();
        self.placed.clear();
    }

    pub fn dispose(self) {
        debug!(nodes = self.placed.len(), ids = self.names.len(), "tree coordinator disposed");
    }

    /// Rebuilds the kernel from every node in `context` and lays it out in bulk.
    ///
    /// The result holds the new nodes plus every existing node whose computed position differs
    /// from the one in the context.
    pub fn full_build(&mut self, context: &PositioningContext) -> PositioningResult {
        let nodes = context.all_nodes();
        let mut diagnostics = Vec::new();
        self.rebuild(&nodes, &mut diagnostics);
        let positions = self.changed_positions(&nodes, context, nodes.iter().map(|n| n.id.as_str()));
        PositioningResult {
            positions,
            diagnostics,
        }
    }

    /// Inserts `context.new_nodes` into the persistent kernel and re-lays out only what they
    /// affect.
    ///
    /// Existing nodes whose size changed are resized in place. When the kernel no longer matches
    /// `context.nodes` (nodes missing on either side, or a known node changed parent) the kernel
    /// is rebuilt from scratch and a [`Diagnostic::FullRebuild`] is reported.
    pub fn incremental_add(&mut self, context: &PositioningContext) -> PositioningResult {
        if context.new_nodes.is_empty() {
            return PositioningResult::default();
        }
        let nodes = context.all_nodes();
        let new_ids: FxHashSet<&str> = context.new_nodes.iter().map(|n| n.id.as_str()).collect();
        let mut diagnostics = Vec::new();

        if self.placed.is_empty() && nodes.len() > new_ids.len() {
            let existing: Vec<&NodeInfo> = nodes
                .iter()
                .copied()
                .filter(|n| !new_ids.contains(n.id.as_str()))
                .collect();
            debug!(nodes = existing.len(), "seeding tree coordinator from existing nodes");
            self.rebuild(&existing, &mut diagnostics);
        }

        let moved = match self.try_incremental(&nodes, &new_ids, &mut diagnostics) {
            Ok(moved) => moved,
            Err(reason) => {
                warn!(%reason, "layout tree out of sync with the graph; rebuilding");
                diagnostics.push(Diagnostic::FullRebuild { reason });
                self.rebuild(&nodes, &mut diagnostics);
                nodes.iter().map(|n| n.id.clone()).collect()
            }
        };

        let positions = self.changed_positions(&nodes, context, moved.iter().map(String::as_str));
        PositioningResult {
            positions,
            diagnostics,
        }
    }

    fn try_incremental(
        &mut self,
        nodes: &[&NodeInfo],
        new_ids: &FxHashSet<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<String>, String> {
        let known: Vec<Option<NodeId>> = nodes
            .iter()
            .map(|n| self.node_id(&n.id).filter(|id| self.placed.contains_key(id)))
            .collect();

        if let Some(missing) = nodes
            .iter()
            .zip(&known)
            .find(|(n, k)| k.is_none() && !new_ids.contains(n.id.as_str()))
        {
            return Err(format!("node `{}` is not in the layout tree", missing.0.id));
        }
        let known_count = known.iter().flatten().count();
        if known_count != self.placed.len() {
            return Err(format!(
                "layout tree holds {} nodes but the graph has {known_count} of them",
                self.placed.len()
            ));
        }

        let hierarchy = Hierarchy::resolve(nodes, self.config.parent_policy);
        let mut changed = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let Some(id) = known[i] else {
                continue;
            };
            let expected = match hierarchy.parent[i] {
                None => Some(GHOST_ROOT),
                Some(p) => known[p],
            };
            let placed = self.placed[&id];
            if expected != Some(placed.parent) {
                return Err(format!("parent of `{}` changed", node.id));
            }
            let size = self.config.sanitize_size(node.size);
            if size != placed.size {
                self.kernel
                    .update_size(id, size.width, size.height)
                    .map_err(|err| err.to_string())?;
                self.placed.insert(id, Placed { size, ..placed });
                changed.push(id);
            }
        }

        for &i in &hierarchy.order {
            if known[i].is_some() {
                continue;
            }
            let parent = match hierarchy.parent[i] {
                None => GHOST_ROOT,
                Some(p) => self
                    .node_id(&nodes[p].id)
                    .ok_or_else(|| format!("parent of `{}` was never inserted", nodes[i].id))?,
            };
            let id = self
                .insert(nodes[i], parent)
                .map_err(|err| err.to_string())?;
            changed.push(id);
        }

        // Parent diagnostics for untouched nodes were already reported when they were inserted.
        let touched: FxHashSet<&str> = changed.iter().filter_map(|id| self.name(*id)).collect();
        diagnostics.extend(hierarchy.diagnostics.into_iter().filter(|d| match d {
            Diagnostic::DroppedParent { id, .. } | Diagnostic::CycleBroken { id } => {
                touched.contains(id.as_str())
            }
            _ => true,
        }));

        let moved = self
            .kernel
            .partial_layout(&changed)
            .map_err(|err| err.to_string())?;
        Ok(moved
            .into_iter()
            .filter(|&id| id != GHOST_ROOT)
            .filter_map(|id| self.name(id).map(str::to_string))
            .collect())
    }

    fn rebuild(&mut self, nodes: &[&NodeInfo], diagnostics: &mut Vec<Diagnostic>) {
        self.kernel.clear();
        self.placed.clear();

        let hierarchy = Hierarchy::resolve(nodes, self.config.parent_policy);
        for &i in &hierarchy.order {
            let parent = hierarchy.parent[i].map_or(GHOST_ROOT, |p| self.intern(&nodes[p].id));
            if let Err(err) = self.insert(nodes[i], parent) {
                warn!(node = %nodes[i].id, %err, "skipping node during full build");
            }
        }
        diagnostics.extend(hierarchy.diagnostics);
        self.kernel.layout();
        debug!(nodes = self.placed.len(), "tree coordinator rebuilt");
    }

    fn insert(&mut self, node: &NodeInfo, parent: NodeId) -> canopy_tidy::Result<NodeId> {
        let id = self.intern(&node.id);
        let size = self.config.sanitize_size(node.size);
        self.kernel.insert(id, parent, size.width, size.height)?;
        self.placed.insert(id, Placed { parent, size });
        Ok(id)
    }

    fn intern(&mut self, id: &str) -> NodeId {
        if let Some(&n) = self.ids.get(id) {
            return n;
        }
        self.names.push(id.to_string());
        let n = NodeId(self.names.len() as u32);
        self.ids.insert(id.to_string(), n);
        n
    }

    fn name(&self, id: NodeId) -> Option<&str> {
        let index = id.0.checked_sub(1)? as usize;
        self.names.get(index).map(String::as_str)
    }

    /// Kernel positions for `candidates`, keeping new nodes and nodes that moved relative to the
    /// context. Keys follow `candidates` order.
    fn changed_positions<'a>(
        &self,
        nodes: &[&NodeInfo],
        context: &PositioningContext,
        candidates: impl Iterator<Item = &'a str>,
    ) -> indexmap::IndexMap<String, Position> {
        let new_ids: FxHashSet<&str> = context.new_nodes.iter().map(|n| n.id.as_str()).collect();
        let before: FxHashMap<&str, Position> =
            nodes.iter().map(|n| (n.id.as_str(), n.position)).collect();

        let mut positions = indexmap::IndexMap::new();
        for id in candidates {
            let Some(position) = self.position(id) else {
                continue;
            };
            let moved = before.get(id).is_none_or(|old| {
                (old.x - position.x).abs() > MOVE_EPSILON || (old.y - position.y).abs() > MOVE_EPSILON
            });
            if new_ids.contains(id) || moved {
                positions.insert(id.to_string(), position);
            }
        }
        positions
    }
}
