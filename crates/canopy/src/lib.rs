#![forbid(unsafe_code)]

//! Incremental node placement for growing node/edge graphs.
//!
//! A host graph hands the engine a [`PositioningContext`] (already placed nodes plus the nodes
//! that need a position) and gets back a [`PositioningResult`] holding only the nodes that were
//! (re)positioned. The caller picks the strategy explicitly with [`StrategyKind`]:
//!
//! - `TreeFull` / `TreeIncremental`: tidy tree over a persistent [`canopy_tidy`] kernel, owned by
//!   a [`TreeCoordinator`] that maps string ids to kernel ids and hangs disconnected components
//!   off a hidden ghost root.
//! - `Physics`: seed / park / relax placement next to connected neighbors.
//! - `Hierarchical`: stateless block-based tree placement.
//!
//! [`LayoutManager`] ties a [`GraphSurface`] to the strategies: it extracts contexts, runs a
//! strategy and writes the positions back in one (optionally animated) batch.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod manager;
pub mod model;
pub mod strategy;
pub mod surface;

mod hierarchy;

pub use config::{LayoutConfig, ParentPolicy};
pub use coordinator::{GHOST_ROOT, TreeCoordinator};
pub use error::{Error, Result};
pub use manager::{AnimationOptions, LayoutManager};
pub use model::{Diagnostic, NodeInfo, NodeSize, Position, PositioningContext, PositioningResult, Rect};
pub use strategy::{
    HierarchicalStrategy, PhysicsStrategy, PositioningStrategy, StrategyKind, TidyTreeStrategy,
    TreeMode,
};
pub use surface::{GraphSurface, LiveGraph, LiveNode, PositionBatch, PositionUpdate, Transition};

/// One-shot positioning with a throwaway strategy instance.
///
/// `TreeIncremental` starts from an empty kernel, seeds it with `context.nodes` and then inserts
/// `context.new_nodes` incrementally.
pub fn position(
    context: &PositioningContext,
    kind: StrategyKind,
    config: &LayoutConfig,
) -> Result<PositioningResult> {
    config.validate()?;
    let mut strategy: Box<dyn PositioningStrategy> = match kind {
        StrategyKind::TreeFull => Box::new(TidyTreeStrategy::new(config.clone(), TreeMode::Full)),
        StrategyKind::TreeIncremental => {
            Box::new(TidyTreeStrategy::new(config.clone(), TreeMode::Incremental))
        }
        StrategyKind::Physics => Box::new(PhysicsStrategy::new(config.clone())),
        StrategyKind::Hierarchical => Box::new(HierarchicalStrategy::new(config.clone())),
    };
    Ok(strategy.position(context))
}
