//! Parent resolution and parent-first ordering shared by the tree strategies.

use crate::config::ParentPolicy;
use crate::model::{Diagnostic, NodeInfo};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

/// A forest over a node list, addressed by index into that list.
#[derive(Debug, Clone, Default)]
pub(crate) struct Hierarchy {
    pub(crate) parent: Vec<Option<usize>>,
    pub(crate) children: Vec<Vec<usize>>,
    /// Every node exactly once, parents before children. Roots and siblings keep input order.
    pub(crate) order: Vec<usize>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Hierarchy {
    pub(crate) fn resolve(nodes: &[&NodeInfo], policy: ParentPolicy) -> Self {
        let index: FxHashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .rev()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        // Parents declared through `children` lists, in input order.
        let mut declared: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for child in &node.children {
                if let Some(&c) = index.get(child.as_str()) {
                    declared[c].push(i);
                }
            }
        }

        let mut diagnostics = Vec::new();
        let mut parent = vec![None; nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            let explicit = node
                .parent_id
                .as_deref()
                .and_then(|id| index.get(id).copied());
            let links = node
                .parent_candidate_ids(policy)
                .skip(usize::from(node.parent_id.is_some()))
                .filter_map(|id| index.get(id).copied());
            let candidates = explicit
                .into_iter()
                .chain(declared[i].iter().copied())
                .chain(links);

            let mut seen = FxHashSet::default();
            for candidate in candidates.filter(|&c| c != i) {
                if !seen.insert(candidate) {
                    continue;
                }
                if parent[i].is_none() {
                    parent[i] = Some(candidate);
                    continue;
                }
                debug!(
                    node = %node.id,
                    dropped = %nodes[candidate].id,
                    "multiple parents resolved; keeping the first"
                );
                diagnostics.push(Diagnostic::DroppedParent {
                    id: node.id.clone(),
                    parent: nodes[candidate].id.clone(),
                });
            }
        }

        let mut hierarchy = Self {
            children: vec![Vec::new(); nodes.len()],
            parent,
            order: Vec::with_capacity(nodes.len()),
            diagnostics,
        };
        for i in 0..nodes.len() {
            if let Some(p) = hierarchy.parent[i] {
                hierarchy.children[p].push(i);
            }
        }
        hierarchy.sort(nodes);
        hierarchy
    }

    pub(crate) fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.parent.len()).filter(|&i| self.parent[i].is_none())
    }

    /// Pre-order from every root, roots in input order. Nodes that no real root reaches sit on
    /// (or below) a parent cycle; each cycle is broken at its earliest member in input order
    /// before any node is ordered, so a cut node takes its input slot among the roots.
    fn sort(&mut self, nodes: &[&NodeInfo]) {
        let mut reached = vec![false; nodes.len()];
        let roots: Vec<usize> = self.roots().collect();
        for root in roots {
            self.reach(root, &mut reached);
        }

        let mut next = 0;
        while let Some(start) = (next..nodes.len()).find(|&i| !reached[i]) {
            next = start;
            let cut = self.cycle_member(start);
            if let Some(p) = self.parent[cut].take() {
                self.children[p].retain(|&c| c != cut);
            }
            warn!(node = %nodes[cut].id, "parent links form a cycle; attaching node to the root");
            self.diagnostics.push(Diagnostic::CycleBroken {
                id: nodes[cut].id.clone(),
            });
            self.reach(cut, &mut reached);
        }

        let mut visited = vec![false; nodes.len()];
        let roots: Vec<usize> = self.roots().collect();
        for root in roots {
            self.visit(root, &mut visited);
        }
    }

    fn visit(&mut self, root: usize, visited: &mut [bool]) {
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            if std::mem::replace(&mut visited[i], true) {
                continue;
            }
            self.order.push(i);
            stack.extend(self.children[i].iter().rev().copied());
        }
    }

    fn reach(&self, root: usize, reached: &mut [bool]) {
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            if !std::mem::replace(&mut reached[i], true) {
                stack.extend(self.children[i].iter().copied());
            }
        }
    }

    /// Follows parents from `start` until a node repeats and returns the lowest index on that
    /// cycle.
    fn cycle_member(&self, start: usize) -> usize {
        let mut step = FxHashMap::default();
        let mut path = Vec::new();
        let mut current = start;
        loop {
            if let Some(&at) = step.get(&current) {
                return path[at..].iter().copied().min().unwrap_or(current);
            }
            step.insert(current, path.len());
            path.push(current);
            match self.parent[current] {
                Some(p) => current = p,
                // Unreachable for unvisited nodes; treat the chain top as the cut point.
                None => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeSize;

    fn node(id: &str) -> NodeInfo {
        NodeInfo::new(id, NodeSize::new(10.0, 10.0))
    }

    fn ids<'a>(nodes: &[&'a NodeInfo], order: &[usize]) -> Vec<&'a str> {
        order.iter().map(|&i| nodes[i].id.as_str()).collect()
    }

    #[test]
    fn orders_parents_before_children() {
        let c = node("c").with_parent("b");
        let b = node("b").with_links(["a"]);
        let a = node("a");
        let nodes = [&c, &b, &a];
        let h = Hierarchy::resolve(&nodes, ParentPolicy::FirstLink);
        assert_eq!(ids(&nodes, &h.order), ["a", "b", "c"]);
        assert!(h.diagnostics.is_empty());
    }

    #[test]
    fn explicit_only_ignores_links() {
        let a = node("a");
        let b = node("b").with_links(["a"]);
        let nodes = [&a, &b];
        let h = Hierarchy::resolve(&nodes, ParentPolicy::ExplicitOnly);
        assert_eq!(h.parent, vec![None, None]);
    }

    #[test]
    fn children_lists_declare_parents() {
        let a = node("a").with_children(["b"]);
        let b = node("b");
        let nodes = [&b, &a];
        let h = Hierarchy::resolve(&nodes, ParentPolicy::ExplicitOnly);
        assert_eq!(h.parent, vec![Some(1), None]);
        assert_eq!(ids(&nodes, &h.order), ["a", "b"]);
    }

    #[test]
    fn cycles_are_cut_at_their_first_member() {
        let x = node("x").with_links(["a"]);
        let a = node("a").with_links(["b"]);
        let b = node("b").with_links(["a"]);
        let nodes = [&x, &a, &b];
        let h = Hierarchy::resolve(&nodes, ParentPolicy::FirstLink);
        assert_eq!(
            h.diagnostics,
            vec![Diagnostic::CycleBroken { id: "a".to_string() }]
        );
        assert_eq!(ids(&nodes, &h.order), ["a", "x", "b"]);
    }

    #[test]
    fn cut_nodes_keep_their_input_slot_among_roots() {
        let r = node("r");
        let x = node("x").with_links(["y"]);
        let y = node("y").with_links(["x"]);
        let s = node("s");
        let nodes = [&r, &x, &y, &s];
        let h = Hierarchy::resolve(&nodes, ParentPolicy::FirstLink);
        assert_eq!(h.roots().collect::<Vec<_>>(), [0, 1, 3]);
        assert_eq!(ids(&nodes, &h.order), ["r", "x", "y", "s"]);
    }
}
