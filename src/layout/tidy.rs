//! Tidy tree pass with a fixed node size.
//!
//! This is the linear-time Walker algorithm as improved by Buchheim, Jünger and
//! Leipert, with the same conventions as d3-hierarchy's `tree().nodeSize()`:
//! separation is expressed in node widths, the root lands at x = 0 and
//! y = depth × level spacing.

use super::hierarchy::Hierarchy;

#[derive(Debug, Clone)]
struct WalkNode {
    parent: usize,
    children: Vec<usize>,
    default_ancestor: Option<usize>,
    ancestor: usize,
    prelim: f32,
    modifier: f32,
    change: f32,
    shift: f32,
    thread: Option<usize>,
    number: usize,
}

struct Walker<'s, F> {
    nodes: Vec<WalkNode>,
    separation: &'s mut F,
}

/// Lays out `hierarchy` and returns `(x, y)` per hierarchy node.
///
/// `separation(a, b)` receives hierarchy node indices of two horizontally
/// adjacent nodes and returns their distance in units of `node_size.0`.
pub fn tidy_layout<F>(hierarchy: &Hierarchy, node_size: (f32, f32), mut separation: F) -> Vec<(f32, f32)>
where
    F: FnMut(usize, usize) -> f32,
{
    let n = hierarchy.len();
    if n == 0 {
        return Vec::new();
    }
    let virtual_root = n;
    let mut nodes: Vec<WalkNode> = Vec::with_capacity(n + 1);
    for (idx, node) in hierarchy.nodes.iter().enumerate() {
        nodes.push(WalkNode {
            parent: node.parent.unwrap_or(virtual_root),
            children: node.children.clone(),
            default_ancestor: None,
            ancestor: idx,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            number: 0,
        });
    }
    nodes.push(WalkNode {
        parent: virtual_root,
        children: vec![0],
        default_ancestor: None,
        ancestor: virtual_root,
        prelim: 0.0,
        modifier: 0.0,
        change: 0.0,
        shift: 0.0,
        thread: None,
        number: 0,
    });
    for idx in 0..=n {
        let children = nodes[idx].children.clone();
        for (number, child) in children.into_iter().enumerate() {
            nodes[child].number = number;
        }
    }

    let mut walker = Walker {
        nodes,
        separation: &mut separation,
    };
    for v in post_order(&walker.nodes) {
        walker.first_walk(v);
    }
    walker.nodes[virtual_root].modifier = -walker.nodes[0].prelim;

    let mut x = vec![0.0f32; n];
    for v in pre_order(&walker.nodes) {
        let parent_mod = walker.nodes[walker.nodes[v].parent].modifier;
        x[v] = walker.nodes[v].prelim + parent_mod;
        walker.nodes[v].modifier += parent_mod;
    }

    let (dx, dy) = node_size;
    hierarchy
        .nodes
        .iter()
        .zip(x)
        .map(|(node, x)| (x * dx, node.depth as f32 * dy))
        .collect()
}

fn post_order(nodes: &[WalkNode]) -> Vec<usize> {
    let mut stack = vec![0usize];
    let mut visited = Vec::with_capacity(nodes.len());
    while let Some(v) = stack.pop() {
        visited.push(v);
        stack.extend(nodes[v].children.iter().copied());
    }
    visited.reverse();
    visited
}

fn pre_order(nodes: &[WalkNode]) -> Vec<usize> {
    let mut stack = vec![0usize];
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(v) = stack.pop() {
        order.push(v);
        stack.extend(nodes[v].children.iter().rev().copied());
    }
    order
}

impl<F> Walker<'_, F>
where
    F: FnMut(usize, usize) -> f32,
{
    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.first().copied().or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.last().copied().or(self.nodes[v].thread)
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let number = self.nodes[v].number;
        if number == 0 {
            return None;
        }
        let parent = self.nodes[v].parent;
        self.nodes[parent].children.get(number - 1).copied()
    }

    fn first_walk(&mut self, v: usize) {
        let left = self.left_sibling(v);
        let first = self.nodes[v].children.first().copied();
        let last = self.nodes[v].children.last().copied();

        if let (Some(first), Some(last)) = (first, last) {
            self.execute_shifts(v);
            let midpoint = (self.nodes[first].prelim + self.nodes[last].prelim) / 2.0;
            if let Some(w) = left {
                let prelim = self.nodes[w].prelim + (self.separation)(v, w);
                self.nodes[v].prelim = prelim;
                self.nodes[v].modifier = prelim - midpoint;
            } else {
                self.nodes[v].prelim = midpoint;
            }
        } else if let Some(w) = left {
            self.nodes[v].prelim = self.nodes[w].prelim + (self.separation)(v, w);
        }

        let parent = self.nodes[v].parent;
        let default_ancestor = self.nodes[parent]
            .default_ancestor
            .unwrap_or(self.nodes[parent].children[0]);
        let ancestor = self.apportion(v, left, default_ancestor);
        self.nodes[parent].default_ancestor = Some(ancestor);
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.nodes[v].children.clone();
        for &w in children.iter().rev() {
            let node = &mut self.nodes[w];
            node.prelim += shift;
            node.modifier += shift;
            change += node.change;
            shift += node.shift + change;
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f32) {
        let subtrees = (self.nodes[wp].number - self.nodes[wm].number) as f32;
        let change = shift / subtrees;
        self.nodes[wp].change -= change;
        self.nodes[wp].shift += shift;
        self.nodes[wm].change += change;
        self.nodes[wp].prelim += shift;
        self.nodes[wp].modifier += shift;
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let candidate = self.nodes[vim].ancestor;
        if self.nodes[candidate].parent == self.nodes[v].parent {
            candidate
        } else {
            ancestor
        }
    }

    fn apportion(&mut self, v: usize, left: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = left else {
            return ancestor;
        };
        let parent = self.nodes[v].parent;
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.nodes[parent].children[0];
        let mut sip = self.nodes[vip].modifier;
        let mut sop = self.nodes[vop].modifier;
        let mut sim = self.nodes[vim].modifier;
        let mut som = self.nodes[vom].modifier;

        let mut next_im = self.next_right(vim);
        let mut next_ip = self.next_left(vip);
        while let (Some(im), Some(ip)) = (next_im, next_ip) {
            vim = im;
            vip = ip;
            let (Some(om), Some(op)) = (self.next_left(vom), self.next_right(vop)) else {
                break;
            };
            vom = om;
            vop = op;
            self.nodes[vop].ancestor = v;
            let shift = self.nodes[vim].prelim + sim - self.nodes[vip].prelim - sip
                + (self.separation)(vim, vip);
            if shift > 0.0 {
                let from = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(from, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.nodes[vim].modifier;
            sip += self.nodes[vip].modifier;
            som += self.nodes[vom].modifier;
            sop += self.nodes[vop].modifier;
            next_im = self.next_right(vim);
            next_ip = self.next_left(vip);
        }

        if next_im.is_some() && self.next_right(vop).is_none() {
            self.nodes[vop].thread = next_im;
            self.nodes[vop].modifier += sim - sop;
        }
        if next_ip.is_some() && self.next_left(vom).is_none() {
            self.nodes[vom].thread = next_ip;
            self.nodes[vom].modifier += sip - som;
            ancestor = v;
        }
        ancestor
    }
}
