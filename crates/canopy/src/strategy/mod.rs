//! Positioning strategies and the contract they share.

pub mod hierarchical;
pub mod physics;
pub mod tree;

use crate::model::{PositioningContext, PositioningResult};
use serde::{Deserialize, Serialize};

pub use hierarchical::HierarchicalStrategy;
pub use physics::PhysicsStrategy;
pub use tree::{TidyTreeStrategy, TreeMode};

/// Computes positions for the new nodes of a [`PositioningContext`].
///
/// Implementations are deterministic for identical input, return an empty result when
/// `new_nodes` is empty, and never fail: soft degradations are reported through
/// [`PositioningResult::diagnostics`].
pub trait PositioningStrategy {
    fn name(&self) -> &'static str;

    fn position(&mut self, context: &PositioningContext) -> PositioningResult;
}

/// Strategy chosen explicitly by the caller for each layout call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    /// Rebuild the persistent tidy tree from every node.
    TreeFull,
    /// Insert the new nodes into the persistent tidy tree and relayout what they affect.
    TreeIncremental,
    /// Seed, park and relax each new node next to its placed neighbors.
    Physics,
    /// Stateless block-based tree placement.
    Hierarchical,
}
