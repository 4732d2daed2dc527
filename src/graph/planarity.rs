//! Left-right planarity test (Brandes' formulation) over the undirected simple graph underlying
//! a directed graph. Only the yes/no answer is computed; no embedding is produced.
//!
//! Both depth-first passes run on explicit stacks so deep graphs cannot exhaust the call
//! stack.

use petgraph::visit::{EdgeRef, IntoEdgeReferences, IntoNodeIdentifiers, NodeCount, NodeIndexable};
use std::collections::{BTreeSet, HashMap, HashSet};

type Edge = (usize, usize);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Interval {
    low: Option<Edge>,
    high: Option<Edge>,
}

impl Interval {
    fn is_empty(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ConflictPair {
    left: Interval,
    right: Interval,
}

impl ConflictPair {
    fn swap(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
    }
}

/// Whether the undirected simple graph underlying `graph` is planar. Edge direction, parallel
/// edges and self-loops are ignored.
pub fn is_planar<G>(graph: G) -> bool
where
    G: IntoEdgeReferences + IntoNodeIdentifiers + NodeCount + NodeIndexable,
{
    let n = graph.node_count();
    let mut neighbours = vec![BTreeSet::new(); graph.node_bound()];
    for edge in graph.edge_references() {
        let (a, b) = (graph.to_index(edge.source()), graph.to_index(edge.target()));
        if a != b {
            neighbours[a].insert(b);
            neighbours[b].insert(a);
        }
    }
    let m = neighbours.iter().map(BTreeSet::len).sum::<usize>() / 2;
    if n > 2 && m > 3 * n - 6 {
        return false;
    }
    let nodes = graph
        .node_identifiers()
        .map(|id| graph.to_index(id))
        .collect::<Vec<_>>();
    let adjacency = neighbours
        .into_iter()
        .map(|set| set.into_iter().collect())
        .collect();
    LrState::new(adjacency).run(&nodes)
}

struct LrState {
    adjacency: Vec<Vec<usize>>,
    height: Vec<Option<usize>>,
    parent_edge: Vec<Option<Edge>>,
    oriented: HashSet<Edge>,
    ordered: Vec<Vec<usize>>,
    lowpt: HashMap<Edge, usize>,
    lowpt2: HashMap<Edge, usize>,
    nesting_depth: HashMap<Edge, usize>,
    lowpt_edge: HashMap<Edge, Edge>,
    reference: HashMap<Edge, Option<Edge>>,
    /// Stack depth when each edge was first examined; stands in for its stack bottom.
    stack_bottom: HashMap<Edge, usize>,
    stack: Vec<ConflictPair>,
}

impl LrState {
    fn new(adjacency: Vec<Vec<usize>>) -> Self {
        let n = adjacency.len();
        LrState {
            adjacency,
            height: vec![None; n],
            parent_edge: vec![None; n],
            oriented: HashSet::new(),
            ordered: vec![Vec::new(); n],
            lowpt: HashMap::new(),
            lowpt2: HashMap::new(),
            nesting_depth: HashMap::new(),
            lowpt_edge: HashMap::new(),
            reference: HashMap::new(),
            stack_bottom: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self, nodes: &[usize]) -> bool {
        let mut roots = Vec::new();
        for &v in nodes {
            if self.height[v].is_none() {
                self.height[v] = Some(0);
                roots.push(v);
                self.orient(v);
            }
        }
        for v in 0..self.ordered.len() {
            let depth = &self.nesting_depth;
            self.ordered[v].sort_by_key(|w| depth.get(&(v, *w)).copied().unwrap_or(0));
        }
        roots.into_iter().all(|root| self.test(root))
    }

    fn height(&self, v: usize) -> usize {
        self.height[v].unwrap_or(0)
    }

    fn lowpt(&self, e: &Edge) -> usize {
        self.lowpt.get(e).copied().unwrap_or(usize::MAX)
    }

    /// First pass: orient edges along a depth-first search and compute lowpoints and
    /// nesting depths.
    fn orient(&mut self, root: usize) {
        let mut dfs = vec![root];
        let mut next_adjacent = vec![0usize; self.adjacency.len()];
        let mut descended: HashSet<Edge> = HashSet::new();
        while let Some(v) = dfs.pop() {
            let parent = self.parent_edge[v];
            while next_adjacent[v] < self.adjacency[v].len() {
                let w = self.adjacency[v][next_adjacent[v]];
                let vw = (v, w);
                if !descended.contains(&vw) {
                    if self.oriented.contains(&vw) || self.oriented.contains(&(w, v)) {
                        next_adjacent[v] += 1;
                        continue;
                    }
                    let height_v = self.height(v);
                    self.oriented.insert(vw);
                    self.ordered[v].push(w);
                    self.lowpt.insert(vw, height_v);
                    self.lowpt2.insert(vw, height_v);
                    match self.height[w] {
                        None => {
                            self.parent_edge[w] = Some(vw);
                            self.height[w] = Some(height_v + 1);
                            dfs.push(v);
                            dfs.push(w);
                            descended.insert(vw);
                            break;
                        }
                        Some(height_w) => {
                            self.lowpt.insert(vw, height_w);
                        }
                    }
                }

                let mut depth = 2 * self.lowpt(&vw);
                if self.lowpt2.get(&vw).copied().unwrap_or(0) < self.height(v) {
                    depth += 1;
                }
                self.nesting_depth.insert(vw, depth);

                if let Some(e) = parent {
                    let (low_vw, low2_vw) = (self.lowpt(&vw), self.lowpt2[&vw]);
                    let (low_e, low2_e) = (self.lowpt(&e), self.lowpt2[&e]);
                    if low_vw < low_e {
                        self.lowpt2.insert(e, low_e.min(low2_vw));
                        self.lowpt.insert(e, low_vw);
                    } else if low_vw > low_e {
                        self.lowpt2.insert(e, low2_e.min(low_vw));
                    } else {
                        self.lowpt2.insert(e, low2_e.min(low2_vw));
                    }
                }
                next_adjacent[v] += 1;
            }
        }
    }

    /// Second pass: test the constraints edge by edge in nesting order.
    fn test(&mut self, root: usize) -> bool {
        let mut dfs = vec![root];
        let mut next_adjacent = vec![0usize; self.ordered.len()];
        let mut descended: HashSet<Edge> = HashSet::new();
        while let Some(v) = dfs.pop() {
            let parent = self.parent_edge[v];
            let mut suspended = false;
            while next_adjacent[v] < self.ordered[v].len() {
                let w = self.ordered[v][next_adjacent[v]];
                let ei = (v, w);
                if !descended.contains(&ei) {
                    self.stack_bottom.insert(ei, self.stack.len());
                    if self.parent_edge[w] == Some(ei) {
                        dfs.push(v);
                        dfs.push(w);
                        descended.insert(ei);
                        suspended = true;
                        break;
                    }
                    self.lowpt_edge.insert(ei, ei);
                    self.stack.push(ConflictPair {
                        left: Interval::default(),
                        right: Interval {
                            low: Some(ei),
                            high: Some(ei),
                        },
                    });
                }

                if self.lowpt(&ei) < self.height(v) {
                    if let Some(e) = parent {
                        if Some(&w) == self.ordered[v].first() {
                            if let Some(low) = self.lowpt_edge.get(&ei).copied() {
                                self.lowpt_edge.insert(e, low);
                            }
                        } else if !self.add_constraints(ei, e) {
                            return false;
                        }
                    }
                }
                next_adjacent[v] += 1;
            }
            if !suspended {
                if let Some(e) = parent {
                    self.remove_back_edges(e);
                }
            }
        }
        true
    }

    fn conflicting(&self, interval: &Interval, edge: &Edge) -> bool {
        match interval.high {
            Some(high) if !interval.is_empty() => self.lowpt(&high) > self.lowpt(edge),
            _ => false,
        }
    }

    fn lowest(&self, pair: &ConflictPair) -> usize {
        let low = |interval: &Interval| {
            interval
                .low
                .map(|low| self.lowpt(&low))
                .unwrap_or(usize::MAX)
        };
        if pair.left.is_empty() {
            return low(&pair.right);
        }
        if pair.right.is_empty() {
            return low(&pair.left);
        }
        low(&pair.left).min(low(&pair.right))
    }

    fn set_reference(&mut self, edge: Option<Edge>, target: Option<Edge>) {
        if let Some(edge) = edge {
            self.reference.insert(edge, target);
        }
    }

    fn add_constraints(&mut self, ei: Edge, e: Edge) -> bool {
        let mut pair = ConflictPair::default();
        let bottom = self.stack_bottom.get(&ei).copied().unwrap_or(0);

        // Merge the return edges of ei into the right interval.
        loop {
            let Some(mut q) = self.stack.pop() else {
                break;
            };
            if !q.left.is_empty() {
                q.swap();
            }
            if !q.left.is_empty() {
                return false;
            }
            let q_low = q.right.low.map(|low| self.lowpt(&low)).unwrap_or(usize::MAX);
            if q_low > self.lowpt(&e) {
                if pair.right.is_empty() {
                    pair.right = q.right;
                } else {
                    self.set_reference(pair.right.low, q.right.high);
                }
                pair.right.low = q.right.low;
            } else {
                let aligned = self.lowpt_edge.get(&e).copied();
                self.set_reference(q.right.low, aligned);
            }
            if self.stack.len() <= bottom {
                break;
            }
        }

        // Merge conflicting return edges of earlier siblings into the left interval.
        while let Some(top) = self.stack.last().copied() {
            if !(self.conflicting(&top.left, &ei) || self.conflicting(&top.right, &ei)) {
                break;
            }
            self.stack.pop();
            let mut q = top;
            if self.conflicting(&q.right, &ei) {
                q.swap();
            }
            if self.conflicting(&q.right, &ei) {
                return false;
            }
            self.set_reference(pair.right.low, q.right.high);
            if q.right.low.is_some() {
                pair.right.low = q.right.low;
            }
            if pair.left.is_empty() {
                pair.left = q.left;
            } else {
                self.set_reference(pair.left.low, q.left.high);
            }
            pair.left.low = q.left.low;
        }

        if !(pair.left.is_empty() && pair.right.is_empty()) {
            self.stack.push(pair);
        }
        true
    }

    /// Drop the back edges ending at `u` from the top of `interval`. When that empties it, the
    /// old low edge is returned with the reference it should take.
    fn trim(
        &self,
        mut interval: Interval,
        other_low: Option<Edge>,
        u: usize,
    ) -> (Interval, Option<(Edge, Option<Edge>)>) {
        while let Some(high) = interval.high {
            if high.1 != u {
                break;
            }
            interval.high = self.reference.get(&high).copied().flatten();
        }
        let mut emptied = None;
        if interval.high.is_none() {
            if let Some(low) = interval.low {
                emptied = Some((low, other_low));
                interval.low = None;
            }
        }
        (interval, emptied)
    }

    fn remove_back_edges(&mut self, e: Edge) {
        let u = e.0;
        let height_u = self.height(u);
        while let Some(top) = self.stack.last() {
            if self.lowest(top) != height_u {
                break;
            }
            self.stack.pop();
        }

        if let Some(mut pair) = self.stack.pop() {
            let (left, emptied) = self.trim(pair.left, pair.right.low, u);
            pair.left = left;
            if let Some((low, target)) = emptied {
                self.reference.insert(low, target);
            }
            let (right, emptied) = self.trim(pair.right, pair.left.low, u);
            pair.right = right;
            if let Some((low, target)) = emptied {
                self.reference.insert(low, target);
            }
            self.stack.push(pair);
        }

        if self.lowpt(&e) < height_u {
            if let Some(top) = self.stack.last() {
                let (hl, hr) = (top.left.high, top.right.high);
                let reference = match (hl, hr) {
                    (Some(l), Some(r)) if self.lowpt(&l) > self.lowpt(&r) => Some(l),
                    (Some(l), None) => Some(l),
                    _ => hr,
                };
                self.reference.insert(e, reference);
            }
        }
    }
}
