use canopy::{
    Diagnostic, LayoutConfig, NodeInfo, NodeSize, PhysicsStrategy, Position, PositioningContext,
    PositioningStrategy, Rect,
};

const EPS: f64 = 1e-9;

fn node(id: &str, x: f64, y: f64) -> NodeInfo {
    NodeInfo::new(id, NodeSize::new(100.0, 50.0)).at(Position::new(x, y))
}

fn no_relax() -> LayoutConfig {
    LayoutConfig {
        relax_iterations: 0,
        ..LayoutConfig::default()
    }
}

fn center(p: Position, size: NodeSize) -> Position {
    Position::new(p.x, p.y + size.height / 2.0)
}

#[test]
fn single_neighbor_seeds_at_the_target_edge_length() {
    let existing = vec![node("y", 0.0, 0.0)];
    let new = vec![node("x", 0.0, 0.0).with_links(["y"])];
    let mut strategy = PhysicsStrategy::new(no_relax());
    let result = strategy.position(&PositioningContext::new(existing, new));

    let x = result.get("x").unwrap();
    assert!((x.x - 200.0).abs() < EPS);
    assert!(x.y.abs() < EPS);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn overlapping_seed_is_parked_on_the_spiral() {
    let existing = vec![node("y", 0.0, 0.0), node("z", 200.0, 0.0)];
    let new = vec![node("x", 0.0, 0.0).with_links(["y"])];
    let mut strategy = PhysicsStrategy::new(no_relax());
    let result = strategy.position(&PositioningContext::new(existing, new));

    // Radius 70 for both nodes: the first spiral point 140 away from z is one full turn out.
    let x = result.get("x").unwrap();
    assert!((x.x - 340.0).abs() < EPS, "{x:?}");
    assert!(x.y.abs() < EPS, "{x:?}");
}

#[test]
fn seed_avoids_the_neighbors_existing_edges() {
    let existing = vec![
        node("hub", 0.0, 0.0),
        node("east", 200.0, 0.0).with_links(["hub"]),
    ];
    let new = vec![node("x", 0.0, 0.0).with_links(["hub"])];
    let mut strategy = PhysicsStrategy::new(no_relax());
    let result = strategy.position(&PositioningContext::new(existing, new));

    let x = result.get("x").unwrap();
    assert!((x.x + 200.0).abs() < EPS, "{x:?}");
    assert!(x.y.abs() < EPS, "{x:?}");
}

#[test]
fn several_neighbors_seed_between_them() {
    let existing = vec![node("a", -300.0, 0.0), node("b", 300.0, 0.0)];
    let new = vec![node("x", 0.0, 0.0).with_links(["a", "b"])];
    let mut strategy = PhysicsStrategy::new(no_relax());
    let result = strategy.position(&PositioningContext::new(existing, new));

    let x = result.get("x").unwrap();
    assert!(x.x.abs() < EPS);
    assert!(x.y.abs() < EPS);
}

#[test]
fn unconnected_nodes_seed_at_the_viewport_center_of_an_empty_graph() {
    let context = PositioningContext::new(Vec::new(), vec![node("x", 0.0, 0.0)]).with_bounds(Rect {
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
    });
    let mut strategy = PhysicsStrategy::new(no_relax());
    let result = strategy.position(&context);
    assert_eq!(result.get("x"), Some(Position::new(400.0, 275.0)));
}

#[test]
fn no_free_spot_keeps_the_seed_and_reports_it() {
    let huge = NodeInfo::new("wall", NodeSize::new(2000.0, 2000.0)).at(Position::new(0.0, 0.0));
    let mut strategy = PhysicsStrategy::new(no_relax());
    let result = strategy.position(&PositioningContext::new(vec![huge], vec![node("x", 0.0, 0.0)]));

    assert_eq!(result.get("x"), Some(Position::new(0.0, 975.0)));
    assert_eq!(
        result.diagnostics,
        vec![Diagnostic::ParkFallback { id: "x".to_string() }]
    );
}

#[test]
fn batch_insertions_do_not_overlap_each_other() {
    let config = LayoutConfig::default();
    let size = NodeSize::new(100.0, 50.0);
    let existing = vec![node("hub", 0.0, 0.0)];
    let new: Vec<NodeInfo> = (0..16)
        .map(|i| node(&format!("leaf{i}"), 0.0, 0.0).with_links(["hub"]))
        .collect();
    let mut strategy = PhysicsStrategy::new(config.clone());
    let result = strategy.position(&PositioningContext::new(existing.clone(), new));

    assert_eq!(result.len(), 16);
    assert!(result.diagnostics.is_empty());
    let mut centers: Vec<Position> = result.positions.values().map(|&p| center(p, size)).collect();
    centers.push(center(existing[0].position, size));
    let min_gap = 2.0 * config.collision_radius(size);
    for (i, a) in centers.iter().enumerate() {
        for b in &centers[i + 1..] {
            assert!(a.distance(*b) >= min_gap - 1e-6, "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn existing_nodes_never_move() {
    let existing = vec![node("a", 0.0, 0.0), node("b", 500.0, 0.0)];
    let new = vec![node("x", 0.0, 0.0).with_links(["a", "b"])];
    let mut strategy = PhysicsStrategy::new(LayoutConfig::default());
    let result = strategy.position(&PositioningContext::new(existing, new));
    assert_eq!(result.positions.keys().collect::<Vec<_>>(), ["x"]);
}

#[test]
fn identical_contexts_give_identical_results() {
    let existing: Vec<NodeInfo> = (0..6)
        .map(|i| node(&format!("e{i}"), i as f64 * 150.0, (i % 2) as f64 * 180.0))
        .collect();
    let new: Vec<NodeInfo> = (0..5)
        .map(|i| node(&format!("n{i}"), 0.0, 0.0).with_links([format!("e{}", i % 6)]))
        .collect();
    let context = PositioningContext::new(existing, new);
    let first = PhysicsStrategy::new(LayoutConfig::default()).position(&context);
    let second = PhysicsStrategy::new(LayoutConfig::default()).position(&context);
    assert_eq!(first, second);
}

#[test]
fn empty_new_nodes_give_an_empty_result() {
    let mut strategy = PhysicsStrategy::new(LayoutConfig::default());
    let result = strategy.position(&PositioningContext::new(vec![node("a", 0.0, 0.0)], Vec::new()));
    assert!(result.is_empty());
}
