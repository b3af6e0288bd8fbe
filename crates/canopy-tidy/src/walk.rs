//! First and second walk of the tidy-tree algorithm.
//!
//! The first walk is post-order: each subtree is laid out relative to its own root, then merged
//! into the parent by separating it from its left siblings along their contours. The second walk
//! is pre-order and turns relative positions into absolute ones by accumulating
//! `modifier_to_subtree` top-down.
//!
//! Both walks accept an optional dirty set. Nodes outside the set keep the relative layout of
//! their subtree from the previous walk; only their extremes and threads are refreshed.

use crate::contour::{ContourWalker, YStack};
use crate::tree::{Anchor, ROOT_SLOT, TidyTree};
use rustc_hash::FxHashSet;

/// Positions closer than this are treated as unchanged by the filtered second walk.
const MOVE_EPSILON: f64 = 1e-8;

#[derive(Debug)]
struct Frame {
    slot: usize,
    next_child: usize,
    ys: YStack,
}

impl Frame {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            next_child: 0,
            ys: YStack::default(),
        }
    }
}

impl TidyTree {
    pub(crate) fn set_y_subtree(&mut self, start: usize, touched: &mut Vec<usize>) {
        let margin = self.config.parent_child_margin;
        let mut stack = vec![start];
        while let Some(slot) = stack.pop() {
            let y = match self.nodes[slot].parent {
                Some(parent) => self.nodes[parent].bottom() + margin,
                None => self.root_y(),
            };
            let node = &mut self.nodes[slot];
            if node.y != y {
                touched.push(slot);
            }
            node.y = y;
            stack.extend(node.children.iter().rev().copied());
        }
    }

    pub(crate) fn root_y(&self) -> f64 {
        match self.config.anchor {
            Anchor::Root => 0.0,
            Anchor::FirstChild => -(self.nodes[ROOT_SLOT].height + self.config.parent_child_margin),
        }
    }

    pub(crate) fn first_walk(&mut self, dirty: Option<&FxHashSet<usize>>) {
        let is_clean = |slot: usize| dirty.is_some_and(|set| !set.contains(&slot));
        if is_clean(ROOT_SLOT) {
            return;
        }

        let mut stack = vec![Frame::new(ROOT_SLOT)];
        while let Some(top) = stack.last_mut() {
            let slot = top.slot;
            let index = top.next_child;
            if let Some(&child) = self.nodes[slot].children.get(index) {
                top.next_child += 1;
                if index > 0 {
                    // Previous walks may have shifted this child; start again from its own center.
                    let node = &mut self.nodes[child];
                    node.contour.modifier_to_subtree = -node.relative_x;
                }
                if is_clean(child) {
                    self.invalidate_extreme_thread(child);
                    self.merge_child(slot, index, &mut top.ys);
                } else {
                    stack.push(Frame::new(child));
                }
                continue;
            }

            if !self.nodes[slot].children.is_empty() {
                self.position_root(slot);
            }
            self.set_extreme(slot);
            stack.pop();
            if let Some(parent) = stack.last_mut() {
                let index = parent.next_child - 1;
                self.merge_child(parent.slot, index, &mut parent.ys);
            }
        }
    }

    pub(crate) fn second_walk(&mut self, dirty: Option<&FxHashSet<usize>>, touched: &mut Vec<usize>) {
        let mut stack = vec![(ROOT_SLOT, self.anchor_offset())];
        while let Some((slot, parent_sum)) = stack.pop() {
            let node = &self.nodes[slot];
            let modifier_sum = parent_sum + node.contour.modifier_to_subtree;
            let x = node.relative_x + modifier_sum;
            if let Some(set) = dirty {
                if (x - node.x).abs() < MOVE_EPSILON && !set.contains(&slot) {
                    continue;
                }
            }
            self.nodes[slot].x = x;
            touched.push(slot);
            self.add_child_spacing(slot);
            stack.extend(
                self.nodes[slot]
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (child, modifier_sum)),
            );
        }
    }

    /// Initial modifier sum that pins the configured anchor to `x = 0`.
    fn anchor_offset(&self) -> f64 {
        let root = &self.nodes[ROOT_SLOT];
        match self.config.anchor {
            Anchor::Root => 0.0,
            Anchor::FirstChild => match root.children.first() {
                // The first child never receives spacing from `add_child_spacing`, so its
                // modifier is already final here.
                Some(&first) => {
                    let first = &self.nodes[first];
                    -(first.relative_x
                        + first.contour.modifier_to_subtree
                        + root.contour.modifier_to_subtree)
                }
                None => -(root.relative_x + root.contour.modifier_to_subtree),
            },
        }
    }

    fn merge_child(&mut self, parent: usize, index: usize, ys: &mut YStack) {
        let child = self.nodes[parent].children[index];
        if index == 0 {
            *ys = YStack::new(0, self.extreme_right_bottom(child));
            return;
        }
        let lowest = self.extreme_left_bottom(child);
        self.separate(parent, index, ys);
        ys.update(index, lowest);
    }

    /// Pushes child `index` right until its left contour clears the right contour of the
    /// siblings before it by at least the peer margin.
    fn separate(&mut self, parent: usize, index: usize, ys: &mut YStack) {
        let left_start = self.nodes[parent].children[index - 1];
        let right_start = self.nodes[parent].children[index];
        let mut left = ContourWalker::new(&self.nodes, false, left_start);
        let mut right = ContourWalker::new(&self.nodes, true, right_start);

        while let (Some(l), Some(r)) = (left.current, right.current) {
            let left_bottom = self.nodes[l].bottom();
            ys.descend_to(left_bottom);

            let distance =
                left.right(&self.nodes[l]) - right.left(&self.nodes[r]) + self.config.peer_margin;
            if distance > 0.0 {
                right.modifier_sum += distance;
                self.move_subtree(parent, index, ys.index(), distance);
            }

            let right_bottom = self.nodes[r].bottom();
            if left_bottom <= right_bottom {
                left.advance(&self.nodes);
            }
            if left_bottom >= right_bottom {
                right.advance(&self.nodes);
            }
        }

        match (left.current, right.current) {
            (None, Some(r)) => self.set_left_thread(parent, index, r, right.modifier_sum),
            (Some(l), None) => self.set_right_thread(parent, index, l, left.modifier_sum),
            _ => {}
        }
    }

    /// Shifts child `index` by `distance` and spreads the same shift evenly over the siblings
    /// between `from` and `index` (applied later by `add_child_spacing`).
    fn move_subtree(&mut self, parent: usize, index: usize, from: usize, distance: f64) {
        let child = self.nodes[parent].children[index];
        self.nodes[child].contour.modifier_to_subtree += distance;

        if from + 1 != index {
            let steps = (index - from) as f64;
            let first_between = self.nodes[parent].children[from + 1];
            self.nodes[first_between].contour.shift_acceleration += distance / steps;
            let contour = &mut self.nodes[child].contour;
            contour.shift_acceleration -= distance / steps;
            contour.shift_change -= distance - distance / steps;
        }
    }

    /// The merged left contour ran out first: thread its deepest node to the right contour.
    fn set_left_thread(&mut self, parent: usize, index: usize, target: usize, modifier: f64) {
        let first = self.nodes[parent].children[0];
        let current = self.nodes[parent].children[index];
        let first_contour = self.nodes[first].contour;

        let diff = modifier
            - first_contour.modifier_extreme_left
            - first_contour.modifier_to_subtree;
        if let Some(extreme) = first_contour.extreme_left {
            let contour = &mut self.nodes[extreme].contour;
            contour.thread_left = Some(target);
            contour.modifier_thread_left = diff;
        }

        let current_contour = self.nodes[current].contour;
        let contour = &mut self.nodes[first].contour;
        contour.extreme_left = current_contour.extreme_left;
        contour.modifier_extreme_left = current_contour.modifier_extreme_left
            + current_contour.modifier_to_subtree
            - first_contour.modifier_to_subtree;
    }

    /// The new child's right contour ran out first: thread it to the siblings' right contour.
    fn set_right_thread(&mut self, parent: usize, index: usize, target: usize, modifier: f64) {
        let current = self.nodes[parent].children[index];
        let previous = self.nodes[parent].children[index - 1];
        let current_contour = self.nodes[current].contour;

        let diff = modifier
            - current_contour.modifier_extreme_right
            - current_contour.modifier_to_subtree;
        if let Some(extreme) = current_contour.extreme_right {
            let contour = &mut self.nodes[extreme].contour;
            contour.thread_right = Some(target);
            contour.modifier_thread_right = diff;
        }

        let previous_contour = self.nodes[previous].contour;
        let contour = &mut self.nodes[current].contour;
        contour.extreme_right = previous_contour.extreme_right;
        contour.modifier_extreme_right = previous_contour.modifier_extreme_right
            + previous_contour.modifier_to_subtree
            - current_contour.modifier_to_subtree;
    }

    fn position_root(&mut self, slot: usize) {
        let children = &self.nodes[slot].children;
        let (first, last) = (children[0], children[children.len() - 1]);
        let first_x = self.nodes[first].relative_x + self.nodes[first].contour.modifier_to_subtree;
        let last_x = self.nodes[last].relative_x + self.nodes[last].contour.modifier_to_subtree;

        let node = &mut self.nodes[slot];
        node.relative_x = (first_x + last_x) / 2.0;
        // Start the subtree centered on zero so the first separation pass always compares it.
        node.contour.modifier_to_subtree = -node.relative_x;
    }

    fn set_extreme(&mut self, slot: usize) {
        let children = &self.nodes[slot].children;
        match (children.first().copied(), children.last().copied()) {
            (Some(first), Some(last)) => {
                let first = self.nodes[first].contour;
                let last = self.nodes[last].contour;
                let contour = &mut self.nodes[slot].contour;
                contour.extreme_left = first.extreme_left;
                contour.modifier_extreme_left =
                    first.modifier_to_subtree + first.modifier_extreme_left;
                contour.extreme_right = last.extreme_right;
                contour.modifier_extreme_right =
                    last.modifier_to_subtree + last.modifier_extreme_right;
            }
            _ => {
                let contour = &mut self.nodes[slot].contour;
                contour.extreme_left = Some(slot);
                contour.extreme_right = Some(slot);
                contour.modifier_extreme_left = 0.0;
                contour.modifier_extreme_right = 0.0;
            }
        }
    }

    /// Recomputes the extremes of `slot` and clears the threads hanging off them: those threads
    /// were recorded against the old siblings and are rebuilt when the parent is walked again.
    pub(crate) fn invalidate_extreme_thread(&mut self, slot: usize) {
        self.set_extreme(slot);
        let contour = self.nodes[slot].contour;
        for extreme in [contour.extreme_left, contour.extreme_right]
            .into_iter()
            .flatten()
        {
            let c = &mut self.nodes[extreme].contour;
            c.thread_left = None;
            c.thread_right = None;
            c.modifier_thread_left = 0.0;
            c.modifier_thread_right = 0.0;
        }
    }

    fn add_child_spacing(&mut self, slot: usize) {
        let mut speed = 0.0;
        let mut delta = 0.0;
        for i in 0..self.nodes[slot].children.len() {
            let child = self.nodes[slot].children[i];
            let contour = &mut self.nodes[child].contour;
            speed += contour.shift_acceleration;
            delta += speed + contour.shift_change;
            contour.modifier_to_subtree += delta;
            contour.shift_acceleration = 0.0;
            contour.shift_change = 0.0;
        }
    }

    fn extreme_left_bottom(&self, slot: usize) -> f64 {
        let extreme = self.nodes[slot].contour.extreme_left.unwrap_or(slot);
        self.nodes[extreme].bottom()
    }

    fn extreme_right_bottom(&self, slot: usize) -> f64 {
        let extreme = self.nodes[slot].contour.extreme_right.unwrap_or(slot);
        self.nodes[extreme].bottom()
    }
}
