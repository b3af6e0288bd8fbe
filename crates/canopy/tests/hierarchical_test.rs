use canopy::{
    Diagnostic, HierarchicalStrategy, LayoutConfig, NodeInfo, NodeSize, Position,
    PositioningContext, PositioningStrategy,
};

fn node(id: &str) -> NodeInfo {
    NodeInfo::new(id, NodeSize::new(100.0, 50.0))
}

fn run(nodes: Vec<NodeInfo>, new_nodes: Vec<NodeInfo>) -> canopy::PositioningResult {
    HierarchicalStrategy::new(LayoutConfig::default())
        .position(&PositioningContext::new(nodes, new_nodes))
}

#[test]
fn parents_are_centered_over_their_children() {
    let result = run(
        Vec::new(),
        vec![
            node("root"),
            node("a").with_parent("root"),
            node("b").with_parent("root"),
            node("c").with_parent("root"),
            node("a1").with_links(["a"]),
        ],
    );
    let root = result.get("root").unwrap();
    let a = result.get("a").unwrap();
    let c = result.get("c").unwrap();
    assert_eq!(root.x, (a.x + c.x) / 2.0);
    assert_eq!(result.get("a1").unwrap().x, a.x);
}

#[test]
fn children_sit_one_margin_below_their_parent() {
    let result = run(
        Vec::new(),
        vec![
            NodeInfo::new("root", NodeSize::new(80.0, 70.0)),
            node("a").with_parent("root"),
            node("a1").with_parent("a"),
        ],
    );
    assert_eq!(result.get("root").unwrap().y, 0.0);
    assert_eq!(result.get("a").unwrap().y, 220.0);
    assert_eq!(result.get("a1").unwrap().y, 420.0);
}

#[test]
fn sibling_blocks_keep_the_peer_margin() {
    let result = run(
        Vec::new(),
        vec![
            node("root"),
            node("a").with_parent("root"),
            node("b").with_parent("root"),
            node("a1").with_parent("a"),
            node("a2").with_parent("a"),
            node("b1").with_parent("b"),
        ],
    );
    let get = |id: &str| result.get(id).unwrap();
    // Same row: a1, a2, b1.
    assert_eq!(get("a2").x - get("a1").x, 200.0);
    assert_eq!(get("b1").x - get("a2").x, 200.0);
    assert_eq!(get("b").x, get("b1").x);
    assert_eq!(get("a").x, (get("a1").x + get("a2").x) / 2.0);
}

#[test]
fn roots_are_laid_out_left_to_right() {
    let result = run(
        Vec::new(),
        vec![
            node("left"),
            node("l1").with_parent("left"),
            node("l2").with_parent("left"),
            node("right"),
        ],
    );
    assert_eq!(result.get("left"), Some(Position::new(150.0, 0.0)));
    assert_eq!(result.get("right"), Some(Position::new(450.0, 0.0)));
}

#[test]
fn only_new_and_moved_nodes_are_reported() {
    let first = run(Vec::new(), vec![node("root"), node("a").with_parent("root")]);
    let existing: Vec<NodeInfo> = [node("root"), node("a").with_parent("root")]
        .into_iter()
        .map(|n| {
            let at = first.get(&n.id).unwrap();
            n.at(at)
        })
        .collect();

    // A second child widens the block: `root` re-centers, `a` keeps the left edge.
    let second = run(existing.clone(), vec![node("b").with_parent("root")]);
    assert_eq!(second.positions.keys().collect::<Vec<_>>(), ["root", "b"]);
    assert_eq!(second.get("root"), Some(Position::new(150.0, 0.0)));

    // A disconnected node to the right leaves the first tree alone.
    let third = run(existing, vec![node("c")]);
    assert_eq!(third.positions.keys().collect::<Vec<_>>(), ["c"]);
}

#[test]
fn cycles_and_dropped_parents_are_reported() {
    let result = run(
        Vec::new(),
        vec![
            node("a").with_links(["b"]),
            node("b").with_links(["a"]),
            node("c").with_parent("a").with_links(["b"]),
        ],
    );
    assert_eq!(result.len(), 3);
    assert!(result.diagnostics.contains(&Diagnostic::CycleBroken { id: "a".to_string() }));
    assert!(result.diagnostics.contains(&Diagnostic::DroppedParent {
        id: "c".to_string(),
        parent: "b".to_string(),
    }));
}

#[test]
fn identical_contexts_give_identical_results() {
    let nodes: Vec<NodeInfo> = (0..40)
        .map(|i| {
            let n = node(&format!("n{i}"));
            if i == 0 { n } else { n.with_parent(format!("n{}", (i - 1) / 3)) }
        })
        .collect();
    let context = PositioningContext::new(Vec::new(), nodes);
    let mut strategy = HierarchicalStrategy::new(LayoutConfig::default());
    assert_eq!(strategy.position(&context), strategy.position(&context));
}
