//! Owned storage of a document graph: vertex and edge attributes, the name/uuid/endpoint
//! indexes, and persistence.

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{read_to_string, write},
    path::Path,
};
use uuid::Uuid;

use crate::{
    codec::{Document, Element},
    error::ExoError,
};

use super::view::GraphView;

/// Namespace for identities derived from document names.
pub const UUID_NAMESPACE_EXO: Uuid = Uuid::from_bytes([
    0x2f, 0x8e, 0x41, 0x0c, 0x5d, 0x77, 0x4b, 0x1a, 0x9e, 0x03, 0x6a, 0xc4, 0x12, 0xd9, 0x7b, 0x55,
]);

/// The stable identity of a document that does not declare one.
pub fn name_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&UUID_NAMESPACE_EXO, name.as_bytes())
}

/// Bumped whenever the persisted layout changes incompatibly.
const GRAPH_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    pub name: String,
    pub uuid: Uuid,
    pub document: Document,
}

/// Attributes of the single edge between an ordered vertex pair. `predicates[i]` was declared
/// by `elements[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub predicates: Vec<String>,
    pub elements: Vec<Element>,
}

impl EdgeData {
    pub(crate) fn push(&mut self, predicate: String, element: Element) {
        self.predicates.push(predicate);
        self.elements.push(element);
    }

    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.predicates.iter().any(|p| p == predicate)
    }

    pub fn has_any_predicate<S: AsRef<str>>(&self, predicates: &[S]) -> bool {
        predicates.iter().any(|p| self.has_predicate(p.as_ref()))
    }
}

pub type DocGraph = petgraph::Graph<VertexData, EdgeData>;

#[derive(Deserialize)]
struct PersistedGraph {
    version: u32,
    graph: DocGraph,
}

#[derive(Serialize)]
struct PersistedGraphRef<'a> {
    version: u32,
    graph: &'a DocGraph,
}

/// A directed graph with one vertex per document and at most one edge per ordered
/// (source, target) pair.
#[derive(Debug, Clone, Default)]
pub struct DocumentGraph {
    pub(crate) graph: DocGraph,
    pub(crate) by_name: BTreeMap<String, NodeIndex>,
    pub(crate) by_uuid: BTreeMap<Uuid, NodeIndex>,
    pub(crate) by_endpoints: BTreeMap<(NodeIndex, NodeIndex), EdgeIndex>,
}

impl DocumentGraph {
    /// Rebuild the indexes over `graph`, checking every invariant an owned graph must hold.
    pub fn from_graph(graph: DocGraph) -> Result<DocumentGraph, ExoError> {
        let mut by_name = BTreeMap::new();
        let mut by_uuid = BTreeMap::new();
        let mut by_endpoints = BTreeMap::new();
        for index in graph.node_indices() {
            let vertex = &graph[index];
            if by_name.insert(vertex.name.clone(), index).is_some() {
                return Err(ExoError::Invariant(format!(
                    "vertex name '{}' is not unique",
                    vertex.name
                )));
            }
            if by_uuid.insert(vertex.uuid, index).is_some() {
                return Err(ExoError::Invariant(format!(
                    "vertex uuid {} is not unique",
                    vertex.uuid
                )));
            }
        }
        for edge in graph.edge_indices() {
            let Some((source, target)) = graph.edge_endpoints(edge) else {
                continue;
            };
            let data = &graph[edge];
            let label = || format!("'{}' -> '{}'", graph[source].name, graph[target].name);
            if data.predicates.is_empty() {
                return Err(ExoError::Invariant(format!(
                    "edge {} has no predicates",
                    label()
                )));
            }
            if data.predicates.len() != data.elements.len() {
                return Err(ExoError::Invariant(format!(
                    "edge {} has {} predicates but {} elements",
                    label(),
                    data.predicates.len(),
                    data.elements.len()
                )));
            }
            if by_endpoints.insert((source, target), edge).is_some() {
                return Err(ExoError::Invariant(format!(
                    "edge {} is duplicated",
                    label()
                )));
            }
        }
        Ok(DocumentGraph {
            graph,
            by_name,
            by_uuid,
            by_endpoints,
        })
    }

    pub fn as_graph(&self) -> &DocGraph {
        &self.graph
    }

    /// Read-only view over every vertex and edge.
    pub fn view(&self) -> GraphView<'_> {
        GraphView::new(self)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.by_name.get(name).copied()
    }

    pub fn index_of_uuid(&self, uuid: &Uuid) -> Option<NodeIndex> {
        self.by_uuid.get(uuid).copied()
    }

    pub fn edge_between(&self, source: NodeIndex, target: NodeIndex) -> Option<EdgeIndex> {
        self.by_endpoints.get(&(source, target)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn to_json(&self) -> Result<String, ExoError> {
        Ok(serde_json::to_string(&PersistedGraphRef {
            version: GRAPH_FORMAT_VERSION,
            graph: &self.graph,
        })?)
    }

    pub fn from_json(json: &str) -> Result<DocumentGraph, ExoError> {
        let persisted: PersistedGraph = serde_json::from_str(json)?;
        if persisted.version != GRAPH_FORMAT_VERSION {
            return Err(ExoError::Serialization(format!(
                "unsupported graph format version {} (expected {GRAPH_FORMAT_VERSION})",
                persisted.version
            )));
        }
        DocumentGraph::from_graph(persisted.graph)
    }

    /// Write the whole graph to `path` as JSON.
    #[tracing::instrument(skip(self))]
    pub fn save(&self, path: &Path) -> Result<(), ExoError> {
        write(path, self.to_json()?)?;
        tracing::info!(
            "saved graph with {} vertices and {} edges",
            self.vertex_count(),
            self.edge_count()
        );
        Ok(())
    }

    /// Read a graph written by [`DocumentGraph::save`], validating its invariants.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<DocumentGraph, ExoError> {
        let graph = DocumentGraph::from_json(&read_to_string(path)?)?;
        tracing::info!(
            "loaded graph with {} vertices and {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ElementKind;

    fn vertex(name: &str) -> VertexData {
        VertexData {
            name: name.to_string(),
            uuid: name_uuid(name),
            document: Document::new(name, Element::new(ElementKind::Document, None)),
        }
    }

    fn link_element() -> Element {
        Element::new(
            ElementKind::InternalLink {
                predicate: "ref".to_string(),
                object: "b".to_string(),
                view: String::new(),
            },
            None,
        )
    }

    #[test]
    fn name_uuids_are_deterministic() {
        assert_eq!(name_uuid("physics"), name_uuid("physics"));
        assert_ne!(name_uuid("physics"), name_uuid("chemistry"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = DocGraph::new();
        graph.add_node(vertex("a"));
        let mut dup = vertex("a");
        dup.uuid = Uuid::nil();
        graph.add_node(dup);
        assert!(matches!(
            DocumentGraph::from_graph(graph),
            Err(ExoError::Invariant(_))
        ));
    }

    #[test]
    fn empty_and_misaligned_edges_are_rejected() {
        let mut graph = DocGraph::new();
        let a = graph.add_node(vertex("a"));
        let b = graph.add_node(vertex("b"));
        graph.add_edge(a, b, EdgeData::default());
        assert!(DocumentGraph::from_graph(graph.clone()).is_err());

        graph.clear_edges();
        graph.add_edge(
            a,
            b,
            EdgeData {
                predicates: vec!["ref".to_string(), "in".to_string()],
                elements: vec![link_element()],
            },
        );
        assert!(DocumentGraph::from_graph(graph).is_err());
    }

    #[test]
    fn parallel_edges_are_rejected() {
        let mut graph = DocGraph::new();
        let a = graph.add_node(vertex("a"));
        let b = graph.add_node(vertex("b"));
        for _ in 0..2 {
            let mut data = EdgeData::default();
            data.push("ref".to_string(), link_element());
            graph.add_edge(a, b, data);
        }
        assert!(DocumentGraph::from_graph(graph).is_err());
    }

    #[test]
    fn json_version_is_checked() {
        let json = serde_json::json!({
            "version": 99,
            "graph": serde_json::to_value(DocGraph::new()).unwrap(),
        })
        .to_string();
        assert!(matches!(
            DocumentGraph::from_json(&json),
            Err(ExoError::Serialization(_))
        ));
    }
}
