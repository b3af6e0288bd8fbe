//! Seed / park / relax placement for free-form graphs.
//!
//! New nodes are placed one at a time; each placed node immediately becomes an obstacle and a
//! potential anchor for the next one. Existing nodes never move. All geometry works on node
//! centers approximated by circles of radius `max(w, h) / 2 + padding`.

use super::PositioningStrategy;
use crate::config::LayoutConfig;
use crate::model::{Diagnostic, Position, PositioningContext, PositioningResult};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use std::f64::consts::TAU;
use tracing::debug;

/// Candidate directions for seeding and points per spiral turn.
const DIRECTIONS: usize = 12;
/// Repulsion only considers nodes within this many target edge lengths.
const LOCAL_RADIUS_FACTOR: f64 = 2.5;
const OVERLAP_REPULSION_FACTOR: f64 = 4.0;
const MIN_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct Body {
    center: Position,
    radius: f64,
}

#[derive(Debug, Clone)]
pub struct PhysicsStrategy {
    config: LayoutConfig,
}

impl PhysicsStrategy {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }
}

impl PositioningStrategy for PhysicsStrategy {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn position(&mut self, context: &PositioningContext) -> PositioningResult {
        let mut result = PositioningResult::default();
        if context.new_nodes.is_empty() {
            return result;
        }

        let mut scene = Scene::new(&self.config, context);
        for node in &context.new_nodes {
            if result.positions.contains_key(&node.id) {
                continue;
            }
            let size = self.config.sanitize_size(node.size);
            let radius = self.config.collision_radius(size);

            let seed = scene.seed(&node.id, context.bounds.map(|b| b.center()));
            let parked = match scene.park(seed, radius) {
                Some(parked) => parked,
                None => {
                    debug!(node = %node.id, "no free spot around seed; keeping it");
                    result.diagnostics.push(Diagnostic::ParkFallback {
                        id: node.id.clone(),
                    });
                    seed
                }
            };
            let center = scene.relax(&node.id, parked, radius);

            scene.bodies.insert(&node.id, Body { center, radius });
            result.positions.insert(
                node.id.clone(),
                Position::new(center.x, center.y - size.height / 2.0),
            );
        }
        result
    }
}

struct Scene<'a> {
    config: &'a LayoutConfig,
    /// Placed nodes: existing ones first, then new ones as they land.
    bodies: IndexMap<&'a str, Body>,
    /// Undirected adjacency over every node of the context.
    neighbors: IndexMap<&'a str, IndexSet<&'a str>>,
}

impl<'a> Scene<'a> {
    fn new(config: &'a LayoutConfig, context: &'a PositioningContext) -> Self {
        let new_ids: FxHashSet<&str> = context.new_nodes.iter().map(|n| n.id.as_str()).collect();
        let bodies = context
            .nodes
            .iter()
            .filter(|n| !new_ids.contains(n.id.as_str()))
            .map(|n| {
                let size = config.sanitize_size(n.size);
                let body = Body {
                    center: n.center(size),
                    radius: config.collision_radius(size),
                };
                (n.id.as_str(), body)
            })
            .collect();

        let nodes = context.all_nodes();
        let known: FxHashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let mut neighbors: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
        for node in nodes {
            let targets = node
                .parent_id
                .iter()
                .chain(&node.children)
                .chain(&node.linked_node_ids);
            for target in targets {
                let (from, to) = (node.id.as_str(), target.as_str());
                if from == to || !known.contains(to) {
                    continue;
                }
                neighbors.entry(from).or_default().insert(to);
                neighbors.entry(to).or_default().insert(from);
            }
        }

        Self {
            config,
            bodies,
            neighbors,
        }
    }

    /// Placed neighbors of `id`, in adjacency order.
    fn placed_neighbors(&self, id: &str) -> Vec<(&'a str, Position)> {
        self.neighbors
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|&n| self.bodies.get(n).map(|b| (n, b.center)))
            .collect()
    }

    fn seed(&self, id: &str, viewport_center: Option<Position>) -> Position {
        let connected = self.placed_neighbors(id);
        match connected.as_slice() {
            [] => centroid(self.bodies.values().map(|b| b.center))
                .or(viewport_center)
                .unwrap_or(Position::ORIGIN),
            [(anchor, at)] => {
                let occupied: Vec<f64> = self
                    .placed_neighbors(anchor)
                    .into_iter()
                    .filter(|(n, _)| *n != id)
                    .map(|(_, p)| (p.y - at.y).atan2(p.x - at.x))
                    .collect();
                let angle = best_angle(&occupied);
                let length = self.config.target_edge_length;
                Position::new(at.x + length * angle.cos(), at.y + length * angle.sin())
            }
            many => weighted_barycenter(
                many.iter().map(|(_, p)| *p),
                self.config.target_edge_length,
            ),
        }
    }

    fn is_free(&self, at: Position, radius: f64) -> bool {
        self.bodies
            .values()
            .all(|b| at.distance(b.center) >= radius + b.radius)
    }

    /// First free point among the seed, a spiral around it, and a wider ring.
    fn park(&self, seed: Position, radius: f64) -> Option<Position> {
        if self.is_free(seed, radius) {
            return Some(seed);
        }
        let tries = self.config.spiral_tries;
        if let Some(found) = (1..=tries)
            .map(|t| spiral_point(seed, radius, t))
            .find(|&p| self.is_free(p, radius))
        {
            return Some(found);
        }
        let ring = radius * (1.0 + tries as f64 / DIRECTIONS as f64) + self.config.target_edge_length;
        (0..DIRECTIONS)
            .map(|k| {
                let angle = k as f64 * TAU / DIRECTIONS as f64;
                Position::new(seed.x + ring * angle.cos(), seed.y + ring * angle.sin())
            })
            .find(|&p| self.is_free(p, radius))
    }

    /// Springs along real connections plus local inverse-square repulsion. A step that would
    /// move a free node into an overlap ends the relaxation.
    fn relax(&self, id: &str, start: Position, radius: f64) -> Position {
        let config = self.config;
        let connected = self.placed_neighbors(id);
        let local = LOCAL_RADIUS_FACTOR * config.target_edge_length;
        let max_step = config.relax_step * radius;

        let mut at = start;
        for _ in 0..config.relax_iterations {
            let (mut fx, mut fy) = (0.0, 0.0);
            for (_, other) in &connected {
                let (dx, dy) = (other.x - at.x, other.y - at.y);
                let dist = dx.hypot(dy);
                if dist > MIN_DISTANCE {
                    let f = config.spring_strength * (dist - config.target_edge_length);
                    fx += dx / dist * f;
                    fy += dy / dist * f;
                }
            }
            for body in self.bodies.values() {
                let (dx, dy) = (at.x - body.center.x, at.y - body.center.y);
                let dist = dx.hypot(dy);
                if dist >= local {
                    continue;
                }
                if dist < MIN_DISTANCE {
                    fx += max_step;
                    continue;
                }
                let mut f = config.repulsion_strength / (dist * dist);
                if dist < radius + body.radius {
                    f *= OVERLAP_REPULSION_FACTOR;
                }
                fx += dx / dist * f;
                fy += dy / dist * f;
            }

            let len = fx.hypot(fy);
            if len > max_step {
                fx *= max_step / len;
                fy *= max_step / len;
            }
            let next = Position::new(at.x + fx, at.y + fy);
            if !self.is_free(next, radius) && self.is_free(at, radius) {
                break;
            }
            at = next;
            if len.min(max_step) < config.relax_threshold {
                break;
            }
        }
        at
    }
}

fn centroid(points: impl Iterator<Item = Position>) -> Option<Position> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for p in points {
        sx += p.x;
        sy += p.y;
        n += 1;
    }
    (n > 0).then(|| Position::new(sx / n as f64, sy / n as f64))
}

/// Barycenter where points far from the plain centroid weigh less: `w = 1 / (1 + d / length)`.
fn weighted_barycenter(points: impl Iterator<Item = Position> + Clone, length: f64) -> Position {
    let Some(center) = centroid(points.clone()) else {
        return Position::ORIGIN;
    };
    let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
    for p in points {
        let w = 1.0 / (1.0 + p.distance(center) / length);
        sx += p.x * w;
        sy += p.y * w;
        sw += w;
    }
    Position::new(sx / sw, sy / sw)
}

/// The candidate direction farthest from every occupied angle. Ties keep the earliest.
fn best_angle(occupied: &[f64]) -> f64 {
    let mut best = (0.0, f64::NEG_INFINITY);
    for k in 0..DIRECTIONS {
        let angle = k as f64 * TAU / DIRECTIONS as f64;
        let clearance = occupied
            .iter()
            .map(|&o| angular_distance(angle, o))
            .fold(f64::INFINITY, f64::min);
        if clearance > best.1 {
            best = (angle, clearance);
        }
    }
    best.0
}

fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Point `t` of a spiral with `DIRECTIONS` points per turn, growing by `step / DIRECTIONS`
/// per point.
fn spiral_point(center: Position, step: f64, t: usize) -> Position {
    let r = step * (1.0 + t as f64 / DIRECTIONS as f64);
    let angle = t as f64 * TAU / DIRECTIONS as f64;
    Position::new(center.x + r * angle.cos(), center.y + r * angle.sin())
}
