use crate::tree::TreeNode;

/// Walks one side of a subtree's contour, following threads across subtree boundaries.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContourWalker {
    is_left: bool,
    pub(crate) current: Option<usize>,
    pub(crate) modifier_sum: f64,
}

impl ContourWalker {
    pub(crate) fn new(nodes: &[TreeNode], is_left: bool, start: usize) -> Self {
        Self {
            is_left,
            current: Some(start),
            modifier_sum: nodes[start].contour.modifier_to_subtree,
        }
    }

    pub(crate) fn left(&self, node: &TreeNode) -> f64 {
        node.relative_x + self.modifier_sum - node.width / 2.0
    }

    pub(crate) fn right(&self, node: &TreeNode) -> f64 {
        node.relative_x + self.modifier_sum + node.width / 2.0
    }

    pub(crate) fn advance(&mut self, nodes: &[TreeNode]) {
        let Some(current) = self.current else {
            return;
        };
        let node = &nodes[current];
        let next_child = if self.is_left {
            node.children.first()
        } else {
            node.children.last()
        };
        match next_child {
            Some(&child) => {
                self.current = Some(child);
                self.modifier_sum += nodes[child].contour.modifier_to_subtree;
            }
            None if self.is_left => {
                self.modifier_sum += node.contour.modifier_thread_left;
                self.current = node.contour.thread_left;
            }
            None => {
                self.modifier_sum += node.contour.modifier_thread_right;
                self.current = node.contour.thread_right;
            }
        }
    }
}

/// Stack of `(sibling index, lowest y)` pairs describing which already-placed sibling owns the
/// right contour at each depth band. The top of the stack is the shallowest band.
#[derive(Debug, Clone, Default)]
pub(crate) struct YStack {
    entries: Vec<(usize, f64)>,
}

impl YStack {
    pub(crate) fn new(index: usize, bottom: f64) -> Self {
        Self {
            entries: vec![(index, bottom)],
        }
    }

    pub(crate) fn bottom(&self) -> f64 {
        self.entries.last().map_or(f64::INFINITY, |e| e.1)
    }

    pub(crate) fn index(&self) -> usize {
        self.entries.last().map_or(0, |e| e.0)
    }

    /// Drops bands that end above `y`, keeping the deepest band in place.
    pub(crate) fn descend_to(&mut self, y: f64) {
        while y > self.bottom() && self.entries.len() > 1 {
            self.entries.pop();
        }
    }

    /// Records sibling `index` as owning every band down to `bottom`.
    pub(crate) fn update(&mut self, index: usize, bottom: f64) {
        while self.entries.last().is_some_and(|e| e.1 <= bottom) {
            self.entries.pop();
        }
        self.entries.push((index, bottom));
    }
}

#[cfg(test)]
mod tests {
    use super::YStack;

    #[test]
    fn update_replaces_shallower_bands() {
        let mut ys = YStack::new(0, 100.0);
        ys.update(1, 50.0);
        assert_eq!(ys.index(), 1);
        assert_eq!(ys.bottom(), 50.0);

        ys.update(2, 120.0);
        assert_eq!(ys.index(), 2);
        assert_eq!(ys.bottom(), 120.0);
        ys.descend_to(500.0);
        assert_eq!(ys.index(), 2, "the deepest band is never popped");
    }

    #[test]
    fn descend_pops_until_band_covers_y() {
        let mut ys = YStack::new(0, 300.0);
        ys.update(1, 200.0);
        ys.update(2, 100.0);
        ys.descend_to(250.0);
        assert_eq!(ys.index(), 0);
        assert_eq!(ys.bottom(), 300.0);
    }
}
