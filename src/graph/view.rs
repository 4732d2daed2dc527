//! Read-only views over a [`DocumentGraph`].
//!
//! A [`GraphView`] pairs a borrowed graph with optional vertex and edge selection masks. Masked
//! and closure views share the owner's storage; nothing is copied and nothing can be mutated
//! through a view. An edge is visible when its own mask bit is set and both endpoints are
//! visible.

use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
    sync::Arc,
};
use uuid::Uuid;

use crate::{
    codec::{Document, Element},
    error::ExoError,
};

use super::{
    base::{DocumentGraph, EdgeData, VertexData},
    calc::{CalcArgs, CalcGraph, CalcOutput, CalculationRegistry, Recipe, Recipes},
    planarity,
};

/// Hierarchy predicate: `a in b` files `a` under `b`.
pub const IN_PREDICATE: &str = "in";
pub const REF_PREDICATE: &str = "ref";
pub const EMBED_PREDICATE: &str = "embed";
pub const MEDIA_PREDICATE: &str = "media";
/// Predicates unioned by [`GraphView::tags`].
pub const TAG_PREDICATES: [&str; 5] = ["is", "has", "about", "uses", "tag"];

#[derive(Clone)]
pub struct GraphView<'g> {
    graph: &'g DocumentGraph,
    vertex_mask: Option<Arc<Vec<bool>>>,
    edge_mask: Option<Arc<Vec<bool>>>,
}

impl fmt::Debug for GraphView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphView")
            .field("vertices", &self.vertex_count())
            .field("edges", &self.edge_count())
            .field("derivative", &self.is_derivative())
            .finish()
    }
}

impl<'g> GraphView<'g> {
    pub(crate) fn new(graph: &'g DocumentGraph) -> Self {
        GraphView {
            graph,
            vertex_mask: None,
            edge_mask: None,
        }
    }

    /// Whether this view filters its owner in any way.
    pub fn is_derivative(&self) -> bool {
        self.vertex_mask.is_some() || self.edge_mask.is_some()
    }

    /// The owning graph, for operations only an unfiltered graph supports (such as saving).
    /// A derivative view refuses, since acting on the owner would ignore its filter.
    pub fn owner(&self) -> Result<&'g DocumentGraph, ExoError> {
        if self.is_derivative() {
            return Err(ExoError::Invariant(
                "a masked or closure view cannot stand in for its owning graph".to_string(),
            ));
        }
        Ok(self.graph)
    }

    pub(crate) fn has_vertex(&self, index: NodeIndex) -> bool {
        index.index() < self.graph.graph.node_count()
            && self
                .vertex_mask
                .as_ref()
                .map(|mask| mask[index.index()])
                .unwrap_or(true)
    }

    pub(crate) fn has_edge(&self, index: EdgeIndex) -> bool {
        let Some((source, target)) = self.graph.graph.edge_endpoints(index) else {
            return false;
        };
        self.edge_mask
            .as_ref()
            .map(|mask| mask[index.index()])
            .unwrap_or(true)
            && self.has_vertex(source)
            && self.has_vertex(target)
    }

    fn wrap_vertex(&self, index: NodeIndex) -> Vertex<'g> {
        Vertex {
            view: self.clone(),
            index,
        }
    }

    fn wrap_edge(&self, index: EdgeIndex) -> Edge<'g> {
        Edge {
            view: self.clone(),
            index,
        }
    }

    /// Visible vertices in allocation order.
    pub fn vertices(&self) -> Vec<Vertex<'g>> {
        self.graph
            .graph
            .node_indices()
            .filter(|i| self.has_vertex(*i))
            .map(|i| self.wrap_vertex(i))
            .collect()
    }

    /// Visible edges in creation order.
    pub fn edges(&self) -> Vec<Edge<'g>> {
        self.graph
            .graph
            .edge_indices()
            .filter(|i| self.has_edge(*i))
            .map(|i| self.wrap_edge(i))
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        match &self.vertex_mask {
            Some(mask) => mask.iter().filter(|v| **v).count(),
            None => self.graph.vertex_count(),
        }
    }

    pub fn edge_count(&self) -> usize {
        if !self.is_derivative() {
            return self.graph.edge_count();
        }
        self.graph
            .graph
            .edge_indices()
            .filter(|i| self.has_edge(*i))
            .count()
    }

    pub fn vertex(&self, name: &str) -> Result<Vertex<'g>, ExoError> {
        self.graph
            .index_of(name)
            .filter(|i| self.has_vertex(*i))
            .map(|i| self.wrap_vertex(i))
            .ok_or_else(|| ExoError::not_found("vertex", name))
    }

    pub fn vertex_by_uuid(&self, uuid: &Uuid) -> Result<Vertex<'g>, ExoError> {
        self.graph
            .index_of_uuid(uuid)
            .filter(|i| self.has_vertex(*i))
            .map(|i| self.wrap_vertex(i))
            .ok_or_else(|| ExoError::not_found("vertex uuid", uuid))
    }

    /// The edge from `source` to `target`, if it exists and is visible.
    pub fn edge(&self, source: &str, target: &str) -> Result<Edge<'g>, ExoError> {
        let source_index = self.vertex(source)?.index;
        let target_index = self.vertex(target)?.index;
        self.graph
            .edge_between(source_index, target_index)
            .filter(|e| self.has_edge(*e))
            .map(|e| self.wrap_edge(e))
            .ok_or_else(|| ExoError::not_found("edge", format!("{source} -> {target}")))
    }

    fn with_edge_filter<F: Fn(&EdgeData) -> bool>(&self, keep: F) -> GraphView<'g> {
        let mask = self
            .graph
            .graph
            .edge_indices()
            .map(|i| {
                self.edge_mask
                    .as_ref()
                    .map(|mask| mask[i.index()])
                    .unwrap_or(true)
                    && keep(&self.graph.graph[i])
            })
            .collect::<Vec<_>>();
        GraphView {
            graph: self.graph,
            vertex_mask: self.vertex_mask.clone(),
            edge_mask: Some(Arc::new(mask)),
        }
    }

    fn with_vertex_filter(&self, selected: &BTreeSet<NodeIndex>) -> GraphView<'g> {
        let mask = self
            .graph
            .graph
            .node_indices()
            .map(|i| self.has_vertex(i) && selected.contains(&i))
            .collect::<Vec<_>>();
        GraphView {
            graph: self.graph,
            vertex_mask: Some(Arc::new(mask)),
            edge_mask: self.edge_mask.clone(),
        }
    }

    /// Keep only edges carrying `predicate`. Vertices are kept even when left edgeless.
    pub fn predicate_masked(&self, predicate: &str) -> GraphView<'g> {
        self.with_edge_filter(|edge| edge.has_predicate(predicate))
    }

    /// Keep only edges carrying at least one of `predicates`.
    pub fn predicates_masked<S: AsRef<str>>(&self, predicates: &[S]) -> GraphView<'g> {
        self.with_edge_filter(|edge| edge.has_any_predicate(predicates))
    }

    pub fn hierarchy(&self) -> GraphView<'g> {
        self.predicate_masked(IN_PREDICATE)
    }

    pub fn references(&self) -> GraphView<'g> {
        self.predicate_masked(REF_PREDICATE)
    }

    pub fn embeds(&self) -> GraphView<'g> {
        self.predicate_masked(EMBED_PREDICATE)
    }

    pub fn media(&self) -> GraphView<'g> {
        self.predicate_masked(MEDIA_PREDICATE)
    }

    pub fn tags(&self) -> GraphView<'g> {
        self.predicates_masked(&TAG_PREDICATES)
    }

    /// The root and every vertex that is transitively `in` it, following in-edges of the
    /// hierarchy view. Edges of any predicate between selected vertices stay visible.
    /// Cycles in the hierarchy are walked once.
    pub fn subgraph_around(&self, root: &str, include_root: bool) -> Result<GraphView<'g>, ExoError> {
        let hierarchy = self.hierarchy();
        let root = hierarchy.vertex(root)?.index;
        let mut selected = BTreeSet::from([root]);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for edge in self.graph.graph.edges_directed(current, Direction::Incoming) {
                if hierarchy.has_edge(edge.id()) && selected.insert(edge.source()) {
                    stack.push(edge.source());
                }
            }
        }
        if !include_root {
            selected.remove(&root);
        }
        Ok(self.with_vertex_filter(&selected))
    }

    /// Number of occurrences of each predicate across visible edges.
    pub fn predicate_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for edge in self.edges() {
            for predicate in edge.predicates() {
                *counts.entry(predicate.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// The distinct predicates in use, sorted.
    pub fn predicates(&self) -> Vec<String> {
        self.predicate_counts().into_keys().collect()
    }

    /// Copy the visible structure into a plain petgraph graph of names and predicate lists.
    pub fn to_calc_graph(&self) -> CalcGraph {
        let mut calc = CalcGraph::with_capacity(self.vertex_count(), 0);
        let mut mapping = BTreeMap::new();
        for vertex in self.vertices() {
            mapping.insert(vertex.index, calc.add_node(vertex.name().to_string()));
        }
        for edge in self.edges() {
            let (Some(source), Some(target)) = (
                mapping.get(&edge.source_index()),
                mapping.get(&edge.target_index()),
            ) else {
                continue;
            };
            calc.add_edge(*source, *target, edge.predicates().to_vec());
        }
        calc
    }

    pub fn is_dag(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.to_calc_graph())
    }

    /// Planarity of the underlying undirected graph.
    pub fn is_planar(&self) -> bool {
        planarity::is_planar(&self.to_calc_graph())
    }

    pub fn is_tree(&self) -> Result<bool, ExoError> {
        Err(ExoError::Unsupported("is_tree".to_string()))
    }

    pub fn is_connected(&self) -> Result<bool, ExoError> {
        Err(ExoError::Unsupported("is_connected".to_string()))
    }

    pub fn disconnected_subgraphs(&self) -> Result<Vec<GraphView<'g>>, ExoError> {
        Err(ExoError::Unsupported("disconnected_subgraphs".to_string()))
    }

    /// Run the calculation registered as `name` over this view.
    pub fn calculate(
        &self,
        registry: &CalculationRegistry,
        name: &str,
        args: &CalcArgs,
    ) -> Result<CalcOutput, ExoError> {
        let calculation = registry.get(name)?;
        tracing::debug!("calculating '{name}' over {:?}", self);
        calculation.calculate(&self.to_calc_graph(), args)
    }

    /// Evaluate every enabled recipe over the view masked by its predicate, keyed by predicate
    /// and then by calculation name.
    pub fn calculate_recipes(
        &self,
        registry: &CalculationRegistry,
        recipes: &Recipes,
    ) -> Result<BTreeMap<String, BTreeMap<String, CalcOutput>>, ExoError> {
        let mut results = BTreeMap::new();
        for (predicate, calculations) in recipes.predicates.iter() {
            let masked = self.predicate_masked(predicate);
            let mut outputs = BTreeMap::new();
            for (name, recipe) in calculations.iter() {
                let args = match recipe {
                    Recipe::Enabled(false) => continue,
                    Recipe::Enabled(true) => CalcArgs::default(),
                    Recipe::Args(args) => args.clone(),
                };
                outputs.insert(name.clone(), masked.calculate(registry, name, &args)?);
            }
            results.insert(predicate.clone(), outputs);
        }
        Ok(results)
    }
}

/// A vertex of a view. Neighbour and edge enumeration honour the view's masks.
#[derive(Clone)]
pub struct Vertex<'g> {
    view: GraphView<'g>,
    index: NodeIndex,
}

impl<'g> Vertex<'g> {
    fn data(&self) -> &'g VertexData {
        &self.view.graph.graph[self.index]
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn name(&self) -> &'g str {
        &self.data().name
    }

    pub fn uuid(&self) -> Uuid {
        self.data().uuid
    }

    pub fn document(&self) -> &'g Document {
        &self.data().document
    }

    fn edges_directed(&self, direction: Direction) -> Vec<Edge<'g>> {
        let mut edges = self
            .view
            .graph
            .graph
            .edges_directed(self.index, direction)
            .map(|e| e.id())
            .filter(|e| self.view.has_edge(*e))
            .collect::<Vec<_>>();
        edges.sort();
        edges.into_iter().map(|e| self.view.wrap_edge(e)).collect()
    }

    pub fn in_edges(&self) -> Vec<Edge<'g>> {
        self.edges_directed(Direction::Incoming)
    }

    pub fn out_edges(&self) -> Vec<Edge<'g>> {
        self.edges_directed(Direction::Outgoing)
    }

    /// In-edges then out-edges. A self-loop appears once.
    pub fn all_edges(&self) -> Vec<Edge<'g>> {
        let mut edges = self.in_edges();
        edges.extend(
            self.out_edges()
                .into_iter()
                .filter(|e| e.source_index() != e.target_index()),
        );
        edges
    }

    pub fn in_neighbors(&self) -> Vec<Vertex<'g>> {
        self.in_edges().into_iter().map(|e| e.source()).collect()
    }

    pub fn out_neighbors(&self) -> Vec<Vertex<'g>> {
        self.out_edges().into_iter().map(|e| e.target()).collect()
    }

    /// In-neighbours then out-neighbours, each vertex once.
    pub fn all_neighbors(&self) -> Vec<Vertex<'g>> {
        let mut seen = BTreeSet::new();
        self.in_neighbors()
            .into_iter()
            .chain(self.out_neighbors())
            .filter(|v| seen.insert(v.index))
            .collect()
    }

    pub fn in_degree(&self) -> usize {
        self.in_edges().len()
    }

    pub fn out_degree(&self) -> usize {
        self.out_edges().len()
    }

    /// Fewest-edges directed path to `other` within the view, as the vertices and edges walked.
    /// `None` when `other` is unreachable.
    pub fn shortest_path_to(&self, other: &Vertex<'_>) -> Option<(Vec<Vertex<'g>>, Vec<Edge<'g>>)> {
        let graph = &self.view.graph.graph;
        let mut came_from: BTreeMap<NodeIndex, EdgeIndex> = BTreeMap::new();
        let mut queue = VecDeque::from([self.index]);
        let mut found = self.index == other.index;
        while let Some(current) = queue.pop_front() {
            if found {
                break;
            }
            let mut out = graph
                .edges_directed(current, Direction::Outgoing)
                .filter(|e| self.view.has_edge(e.id()))
                .map(|e| (e.id(), e.target()))
                .collect::<Vec<_>>();
            out.sort();
            for (edge, next) in out {
                if next == self.index || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, edge);
                if next == other.index {
                    found = true;
                    break;
                }
                queue.push_back(next);
            }
        }
        if !found {
            return None;
        }
        let mut vertices = vec![self.view.wrap_vertex(other.index)];
        let mut edges = Vec::new();
        let mut current = other.index;
        while let Some(edge) = came_from.get(&current) {
            let (source, _) = graph.edge_endpoints(*edge)?;
            edges.push(self.view.wrap_edge(*edge));
            vertices.push(self.view.wrap_vertex(source));
            current = source;
        }
        vertices.reverse();
        edges.reverse();
        Some((vertices, edges))
    }
}

impl fmt::Display for Vertex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Vertex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Vertex '{}'>", self.name())
    }
}

#[derive(Clone)]
pub struct Edge<'g> {
    view: GraphView<'g>,
    index: EdgeIndex,
}

impl<'g> Edge<'g> {
    fn data(&self) -> &'g EdgeData {
        &self.view.graph.graph[self.index]
    }

    fn endpoints(&self) -> (NodeIndex, NodeIndex) {
        // Edges are never removed from an owned graph, so a wrapped index always resolves.
        self.view
            .graph
            .graph
            .edge_endpoints(self.index)
            .unwrap_or((NodeIndex::end(), NodeIndex::end()))
    }

    pub fn index(&self) -> EdgeIndex {
        self.index
    }

    pub(crate) fn source_index(&self) -> NodeIndex {
        self.endpoints().0
    }

    pub(crate) fn target_index(&self) -> NodeIndex {
        self.endpoints().1
    }

    pub fn source(&self) -> Vertex<'g> {
        self.view.wrap_vertex(self.source_index())
    }

    pub fn target(&self) -> Vertex<'g> {
        self.view.wrap_vertex(self.target_index())
    }

    pub fn predicates(&self) -> &'g [String] {
        &self.data().predicates
    }

    pub fn elements(&self) -> &'g [Element] {
        &self.data().elements
    }

    /// Each predicate with the element that declared it.
    pub fn links(&self) -> impl Iterator<Item = (&'g str, &'g Element)> {
        self.predicates()
            .iter()
            .map(String::as_str)
            .zip(self.elements().iter())
    }
}

impl fmt::Display for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' -[{}]-> '{}'",
            self.source().name(),
            self.predicates().join(","),
            self.target().name()
        )
    }
}

impl fmt::Debug for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Edge \"{self}\">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::MARKUP, graph::DocumentMap};

    fn graph(sources: &[(&str, &str)]) -> DocumentGraph {
        DocumentGraph::build(DocumentMap::from_sources(&MARKUP, sources.iter().copied()).unwrap()).0
    }

    fn names(vertices: &[Vertex<'_>]) -> Vec<String> {
        vertices.iter().map(|v| v.name().to_string()).collect()
    }

    #[test]
    fn edge_display() {
        let g = graph(&[("a", "[[in|b]] [[b]]"), ("b", "")]);
        assert_eq!(g.view().edge("a", "b").unwrap().to_string(), "'a' -[in,ref]-> 'b'");
    }

    #[test]
    fn masked_views_keep_vertices() {
        let g = graph(&[("a", "[[in|b]]"), ("b", "[[c]]"), ("c", "")]);
        let masked = g.view().hierarchy();
        assert!(masked.is_derivative());
        assert_eq!(masked.vertex_count(), 3);
        assert_eq!(masked.edge_count(), 1);
        assert!(masked.edge("b", "c").unwrap_err().is_not_found());
        assert!(masked.owner().is_err());
        assert!(g.view().owner().is_ok());
    }

    #[test]
    fn neighbours_follow_masks() {
        let g = graph(&[("a", "[[in|c]]"), ("b", "[[c]]"), ("c", "[[tag|a]]")]);
        let c = g.view().vertex("c").unwrap();
        assert_eq!(names(&c.in_neighbors()), vec!["a", "b"]);
        assert_eq!(names(&c.out_neighbors()), vec!["a"]);
        assert_eq!(names(&c.all_neighbors()), vec!["a", "b"]);
        assert_eq!(c.all_edges().len(), 3);

        let tags = g.view().tags();
        let c = tags.vertex("c").unwrap();
        assert!(c.in_neighbors().is_empty());
        assert_eq!(c.out_degree(), 1);
    }

    #[test]
    fn closure_excludes_unrelated_vertices() {
        let g = graph(&[
            ("root", ""),
            ("child", "[[in|root]]"),
            ("grandchild", "[[in|child]] [[other]]"),
            ("other", "[[ref|root]]"),
        ]);
        let around = g.view().subgraph_around("root", true).unwrap();
        assert_eq!(
            names(&around.vertices()),
            vec!["root", "child", "grandchild"]
        );
        let without_root = g.view().subgraph_around("root", false).unwrap();
        assert_eq!(names(&without_root.vertices()), vec!["child", "grandchild"]);
        assert!(g.view().subgraph_around("nope", true).unwrap_err().is_not_found());
    }

    #[test]
    fn shortest_path_walks_fewest_edges() {
        let g = graph(&[
            ("a", "[[b]] [[d]]"),
            ("b", "[[c]]"),
            ("c", "[[e]]"),
            ("d", "[[e]]"),
            ("e", ""),
        ]);
        let view = g.view();
        let a = view.vertex("a").unwrap();
        let e = view.vertex("e").unwrap();
        let (vertices, edges) = a.shortest_path_to(&e).unwrap();
        assert_eq!(names(&vertices), vec!["a", "d", "e"]);
        assert_eq!(edges.len(), 2);
        assert!(e.shortest_path_to(&a).is_none());
        let (vertices, edges) = a.shortest_path_to(&a).unwrap();
        assert_eq!(names(&vertices), vec!["a"]);
        assert!(edges.is_empty());
    }

    #[test]
    fn structural_queries() {
        let dag = graph(&[("a", "[[b]]"), ("b", "[[c]]"), ("c", "")]);
        assert!(dag.view().is_dag());
        assert!(dag.view().is_planar());
        let cyclic = graph(&[("a", "[[b]]"), ("b", "[[a]]")]);
        assert!(!cyclic.view().is_dag());
        assert!(cyclic.view().is_tree().is_err());
        assert!(matches!(
            cyclic.view().is_connected(),
            Err(ExoError::Unsupported(_))
        ));
        assert!(cyclic.view().disconnected_subgraphs().is_err());
    }

    #[test]
    fn predicate_statistics() {
        let g = graph(&[("a", "[[in|b]] [[in|b]] [[c]]"), ("b", "[[tag|c]]"), ("c", "")]);
        let counts = g.view().predicate_counts();
        assert_eq!(counts.get("in"), Some(&2));
        assert_eq!(counts.get("ref"), Some(&1));
        assert_eq!(counts.get("tag"), Some(&1));
        assert_eq!(g.view().predicates(), vec!["in", "ref", "tag"]);
    }
}
