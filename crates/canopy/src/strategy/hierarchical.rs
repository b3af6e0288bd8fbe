//! Stateless tree placement: every subtree gets a horizontal block as wide as the subtree, leaves
//! sit in the middle of their block and parents are centered over their first and last child.
//!
//! Looser than the tidy kernel (blocks never interleave) but needs no persistent state.

use super::PositioningStrategy;
use crate::config::LayoutConfig;
use crate::hierarchy::Hierarchy;
use crate::model::{NodeSize, Position, PositioningContext, PositioningResult};
use rustc_hash::FxHashSet;

const MOVE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct HierarchicalStrategy {
    config: LayoutConfig,
}

impl HierarchicalStrategy {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }
}

impl PositioningStrategy for HierarchicalStrategy {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn position(&mut self, context: &PositioningContext) -> PositioningResult {
        if context.new_nodes.is_empty() {
            return PositioningResult::default();
        }
        let nodes = context.all_nodes();
        let hierarchy = Hierarchy::resolve(&nodes, self.config.parent_policy);
        let sizes: Vec<NodeSize> = nodes
            .iter()
            .map(|n| self.config.sanitize_size(n.size))
            .collect();
        let placed = place(&hierarchy, &sizes, &self.config);

        let new_ids: FxHashSet<&str> = context.new_nodes.iter().map(|n| n.id.as_str()).collect();
        let positions = nodes
            .iter()
            .zip(placed)
            .filter(|(node, at)| {
                new_ids.contains(node.id.as_str())
                    || (node.position.x - at.x).abs() > MOVE_EPSILON
                    || (node.position.y - at.y).abs() > MOVE_EPSILON
            })
            .map(|(node, at)| (node.id.clone(), at))
            .collect();
        PositioningResult {
            positions,
            diagnostics: hierarchy.diagnostics,
        }
    }
}

/// Positions indexed like `sizes`. Roots are laid out left to right starting at `x = 0`.
fn place(hierarchy: &Hierarchy, sizes: &[NodeSize], config: &LayoutConfig) -> Vec<Position> {
    let gap = config.peer_margin;
    let mut width = vec![0.0_f64; sizes.len()];
    for &i in hierarchy.order.iter().rev() {
        let children = &hierarchy.children[i];
        let spread: f64 = children.iter().map(|&c| width[c]).sum::<f64>()
            + gap * children.len().saturating_sub(1) as f64;
        width[i] = sizes[i].width.max(spread);
    }

    // Left edge of each node's block.
    let mut left = vec![0.0_f64; sizes.len()];
    let mut cursor = 0.0;
    for root in hierarchy.roots() {
        left[root] = cursor;
        cursor += width[root] + gap;
    }
    let mut y = vec![0.0_f64; sizes.len()];
    for &i in &hierarchy.order {
        let children = &hierarchy.children[i];
        let spread: f64 = children.iter().map(|&c| width[c]).sum::<f64>()
            + gap * children.len().saturating_sub(1) as f64;
        let mut next = left[i] + (width[i] - spread) / 2.0;
        for &c in children {
            left[c] = next;
            next += width[c] + gap;
            y[c] = y[i] + sizes[i].height + config.parent_child_margin;
        }
    }

    let mut x = vec![0.0_f64; sizes.len()];
    for &i in hierarchy.order.iter().rev() {
        let children = &hierarchy.children[i];
        x[i] = match (children.first(), children.last()) {
            (Some(&first), Some(&last)) => (x[first] + x[last]) / 2.0,
            _ => left[i] + width[i] / 2.0,
        };
    }

    x.into_iter()
        .zip(y)
        .map(|(x, y)| Position::new(x, y))
        .collect()
}
