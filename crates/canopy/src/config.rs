use crate::model::NodeSize;
use crate::{Error, Result};
use canopy_tidy::{Anchor, TidyConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How parents are derived from [`NodeInfo`](crate::NodeInfo) data.
///
/// When several candidates resolve, the first one in declaration order wins and the rest are
/// reported as [`Diagnostic::DroppedParent`](crate::Diagnostic::DroppedParent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParentPolicy {
    /// `parent_id`, then `children` declarations, then outgoing links (link target = parent).
    #[default]
    FirstLink,
    /// `parent_id` and `children` declarations only.
    ExplicitOnly,
}

/// Tuning constants shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Vertical gap between a parent's bottom edge and its children.
    pub parent_child_margin: f64,
    /// Minimum horizontal gap between neighboring subtrees.
    pub peer_margin: f64,
    /// Preferred distance between connected node centers (physics, breadth-first).
    pub target_edge_length: f64,
    pub relax_iterations: usize,
    /// Largest relax displacement per iteration, as a fraction of the node radius.
    pub relax_step: f64,
    /// Relaxation stops once an iteration moves the node less than this.
    pub relax_threshold: f64,
    /// Added to half the larger side of a node to get its collision radius.
    pub collision_padding: f64,
    pub spiral_tries: usize,
    pub repulsion_strength: f64,
    pub spring_strength: f64,
    /// Used for nodes that report no usable size.
    pub default_node_size: NodeSize,
    pub parent_policy: ParentPolicy,
    pub animation_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            parent_child_margin: 150.0,
            peer_margin: 100.0,
            target_edge_length: 200.0,
            relax_iterations: 12,
            relax_step: 0.25,
            relax_threshold: 0.5,
            collision_padding: 20.0,
            spiral_tries: 36,
            repulsion_strength: 40_000.0,
            spring_strength: 0.1,
            default_node_size: NodeSize::new(100.0, 50.0),
            parent_policy: ParentPolicy::FirstLink,
            animation_ms: 300,
        }
    }
}

impl LayoutConfig {
    /// Parses a partial JSON object (missing keys keep their defaults) and validates it.
    pub fn from_json(value: &Value) -> Result<Self> {
        let config = Self::deserialize(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &'static str, message: impl Into<String>) -> Error {
            Error::InvalidConfig {
                field,
                message: message.into(),
            }
        }

        for (field, value) in [
            ("parentChildMargin", self.parent_child_margin),
            ("peerMargin", self.peer_margin),
            ("collisionPadding", self.collision_padding),
            ("repulsionStrength", self.repulsion_strength),
            ("springStrength", self.spring_strength),
            ("relaxThreshold", self.relax_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, format!("expected a finite value >= 0, got {value}")));
            }
        }
        for (field, value) in [
            ("targetEdgeLength", self.target_edge_length),
            ("relaxStep", self.relax_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("expected a finite value > 0, got {value}")));
            }
        }
        if !self.default_node_size.is_valid() {
            return Err(invalid(
                "defaultNodeSize",
                format!(
                    "expected a positive size, got {}x{}",
                    self.default_node_size.width, self.default_node_size.height
                ),
            ));
        }
        Ok(())
    }

    /// Kernel settings for the tree strategies. Output is anchored at the first component root.
    pub fn tidy_config(&self) -> TidyConfig {
        TidyConfig {
            parent_child_margin: self.parent_child_margin,
            peer_margin: self.peer_margin,
            anchor: Anchor::FirstChild,
        }
    }

    /// Replaces unusable sides with the configured default.
    pub fn sanitize_size(&self, size: NodeSize) -> NodeSize {
        let pick = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        NodeSize::new(
            pick(size.width, self.default_node_size.width),
            pick(size.height, self.default_node_size.height),
        )
    }

    /// Collision radius of a node: half its larger side plus padding.
    pub fn collision_radius(&self, size: NodeSize) -> f64 {
        size.width.max(size.height) / 2.0 + self.collision_padding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_each_bad_side_independently() {
        let config = LayoutConfig::default();
        assert_eq!(
            config.sanitize_size(NodeSize::new(0.0, 30.0)),
            NodeSize::new(100.0, 30.0)
        );
        assert_eq!(
            config.sanitize_size(NodeSize::new(40.0, f64::NAN)),
            NodeSize::new(40.0, 50.0)
        );
    }

    #[test]
    fn collision_radius_uses_the_larger_side() {
        let config = LayoutConfig::default();
        assert_eq!(config.collision_radius(NodeSize::new(100.0, 50.0)), 70.0);
        assert_eq!(config.collision_radius(NodeSize::new(30.0, 80.0)), 60.0);
    }
}
