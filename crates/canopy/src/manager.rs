//! Glue between a [`GraphSurface`] and the strategies.

use crate::config::LayoutConfig;
use crate::model::{NodeInfo, Position, PositioningContext, PositioningResult};
use crate::strategy::{
    HierarchicalStrategy, PhysicsStrategy, PositioningStrategy, StrategyKind, TidyTreeStrategy,
    TreeMode,
};
use crate::surface::{GraphSurface, PositionBatch, PositionUpdate};
use crate::Result;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::debug;

/// Set to `1` to disable animated transitions.
pub const HEADLESS_ENV: &str = "CANOPY_HEADLESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationOptions {
    pub duration_ms: u64,
}

impl AnimationOptions {
    pub const DISABLED: AnimationOptions = AnimationOptions { duration_ms: 0 };

    pub fn resolve(headless: bool, duration_ms: u64) -> Self {
        if headless {
            Self::DISABLED
        } else {
            Self { duration_ms }
        }
    }

    /// Uses `config.animation_ms` unless `CANOPY_HEADLESS=1` or `CI` is set.
    pub fn from_env(config: &LayoutConfig) -> Self {
        let headless = std::env::var(HEADLESS_ENV).is_ok_and(|v| v.trim() == "1")
            || std::env::var_os("CI").is_some();
        Self::resolve(headless, config.animation_ms)
    }

    pub fn is_animated(&self) -> bool {
        self.duration_ms > 0
    }
}

/// Owns one instance of every strategy for a session.
///
/// The tree strategies share a single persistent coordinator, so `TreeFull` and
/// `TreeIncremental` calls can be mixed freely.
#[derive(Debug)]
pub struct LayoutManager {
    config: LayoutConfig,
    animation: AnimationOptions,
    tree: TidyTreeStrategy,
    physics: PhysicsStrategy,
    hierarchical: HierarchicalStrategy,
}

impl LayoutManager {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            animation: AnimationOptions::from_env(&config),
            tree: TidyTreeStrategy::new(config.clone(), TreeMode::Incremental),
            physics: PhysicsStrategy::new(config.clone()),
            hierarchical: HierarchicalStrategy::new(config.clone()),
            config,
        })
    }

    pub fn with_animation(mut self, animation: AnimationOptions) -> Self {
        self.animation = animation;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn animation(&self) -> AnimationOptions {
        self.animation
    }

    pub fn tree(&self) -> &TidyTreeStrategy {
        &self.tree
    }

    /// Snapshots `surface`. Nodes named in `new_ids` go to `new_nodes`, the rest to `nodes`;
    /// both keep graph order. Ids not present in the graph are ignored.
    pub fn extract_context(
        &self,
        surface: &dyn GraphSurface,
        new_ids: &[String],
    ) -> PositioningContext {
        let fresh: FxHashSet<&str> = new_ids.iter().map(String::as_str).collect();
        let mut context = PositioningContext::default();
        for id in surface.node_ids() {
            let size = surface
                .bounding_box(&id)
                .map(|s| self.config.sanitize_size(s))
                .unwrap_or(self.config.default_node_size);
            let info = NodeInfo {
                position: surface.position(&id).unwrap_or_default(),
                size,
                parent_id: surface.stored_parent(&id),
                children: Vec::new(),
                linked_node_ids: surface
                    .stored_links(&id)
                    .unwrap_or_else(|| surface.outgoing_edges(&id)),
                id,
            };
            if fresh.contains(info.id.as_str()) {
                context.new_nodes.push(info);
            } else {
                context.nodes.push(info);
            }
        }
        if context.new_nodes.len() < fresh.len() {
            debug!(
                requested = fresh.len(),
                found = context.new_nodes.len(),
                "some new node ids are not in the graph"
            );
        }
        context.bounds = surface.viewport();
        context
    }

    pub fn position(&mut self, context: &PositioningContext, kind: StrategyKind) -> PositioningResult {
        let strategy: &mut dyn PositioningStrategy = match kind {
            StrategyKind::TreeFull => {
                self.tree.set_mode(TreeMode::Full);
                &mut self.tree
            }
            StrategyKind::TreeIncremental => {
                self.tree.set_mode(TreeMode::Incremental);
                &mut self.tree
            }
            StrategyKind::Physics => &mut self.physics,
            StrategyKind::Hierarchical => &mut self.hierarchical,
        };
        let result = strategy.position(context);
        debug!(
            strategy = strategy.name(),
            new = context.new_nodes.len(),
            placed = result.len(),
            diagnostics = result.diagnostics.len(),
            "positioned nodes"
        );
        result
    }

    /// Writes `result` back as one batch, animated when enabled.
    pub fn apply(&self, surface: &mut dyn GraphSurface, result: &PositioningResult) {
        if result.is_empty() {
            return;
        }
        let updates = result
            .positions
            .iter()
            .map(|(id, &position)| PositionUpdate {
                id: id.clone(),
                position,
            })
            .collect();
        surface.apply(PositionBatch {
            updates,
            duration_ms: self.animation.duration_ms,
        });
    }

    /// Extracts, positions and applies in one go.
    pub fn layout(
        &mut self,
        surface: &mut dyn GraphSurface,
        new_ids: &[String],
        kind: StrategyKind,
    ) -> PositioningResult {
        let context = self.extract_context(&*surface, new_ids);
        let result = self.position(&context, kind);
        self.apply(surface, &result);
        result
    }

    /// Ad hoc radial placement of the whole graph.
    ///
    /// Each connected component is rooted at its highest-degree node (graph order breaks ties);
    /// breadth-first level `k` sits on a ring of radius `k * target_edge_length`. Components are
    /// laid out left to right. Nothing is applied to the surface.
    pub fn place_breadth_first(&self, surface: &dyn GraphSurface) -> PositioningResult {
        let ids = surface.node_ids();
        let index: IndexMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
        for (i, id) in ids.iter().enumerate() {
            let targets = surface
                .stored_links(id)
                .unwrap_or_else(|| surface.outgoing_edges(id));
            for target in targets.iter().chain(surface.stored_parent(id).iter()) {
                let Some(&j) = index.get(target.as_str()) else {
                    continue;
                };
                if i != j && !adjacency[i].contains(&j) {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }

        let length = self.config.target_edge_length;
        let mut result = PositioningResult::default();
        let mut visited = vec![false; ids.len()];
        let mut cursor = 0.0;
        while let Some(root) = (0..ids.len())
            .filter(|&i| !visited[i])
            .max_by(|&a, &b| adjacency[a].len().cmp(&adjacency[b].len()).then(b.cmp(&a)))
        {
            let mut levels: Vec<Vec<usize>> = Vec::new();
            let mut queue = VecDeque::from([(root, 0usize)]);
            visited[root] = true;
            while let Some((i, level)) = queue.pop_front() {
                if levels.len() <= level {
                    levels.push(Vec::new());
                }
                levels[level].push(i);
                for &j in &adjacency[i] {
                    if !visited[j] {
                        visited[j] = true;
                        queue.push_back((j, level + 1));
                    }
                }
            }

            let extent = levels
                .iter()
                .flatten()
                .map(|&i| {
                    let size = surface
                        .bounding_box(&ids[i])
                        .map_or(self.config.default_node_size, |s| self.config.sanitize_size(s));
                    size.width.max(size.height) / 2.0
                })
                .fold(0.0_f64, f64::max);
            let radius = (levels.len() - 1) as f64 * length + extent;
            let center = Position::new(cursor + radius, radius);
            cursor += 2.0 * radius + self.config.peer_margin;

            for (level, members) in levels.iter().enumerate() {
                let ring = level as f64 * length;
                for (k, &i) in members.iter().enumerate() {
                    let angle = std::f64::consts::TAU * k as f64 / members.len() as f64;
                    let size = surface
                        .bounding_box(&ids[i])
                        .map_or(self.config.default_node_size, |s| self.config.sanitize_size(s));
                    let at = Position::new(
                        center.x + ring * angle.cos(),
                        center.y + ring * angle.sin() - size.height / 2.0,
                    );
                    result.positions.insert(ids[i].clone(), at);
                }
            }
        }
        result
    }

    /// Starts a new session: the persistent tree state and its id map are discarded.
    pub fn reset(&mut self) {
        self.tree.coordinator_mut().reset();
    }
}
