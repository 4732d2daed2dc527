//! Assembly of a [`DocumentGraph`] from an ordered mapping of named documents.

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{
    codec::{Document, MarkupParser, SemanticLink},
    error::ExoError,
};

use super::{
    base::{name_uuid, DocGraph, DocumentGraph, EdgeData, VertexData},
    diagnostic::{BuildDiagnostic, BuildReport, UnresolvedTarget},
};

/// Documents keyed by name, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMap {
    documents: Vec<Document>,
    index: BTreeMap<String, usize>,
}

impl DocumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse each `(name, source)` pair with `parser`, in order.
    pub fn from_sources<I, N, S>(parser: &MarkupParser, sources: I) -> Result<Self, ExoError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut map = DocumentMap::new();
        for (name, source) in sources {
            map.insert(parser.parse_document(name.as_ref(), source.as_ref()))?;
        }
        Ok(map)
    }

    pub fn from_documents<I: IntoIterator<Item = Document>>(documents: I) -> Result<Self, ExoError> {
        let mut map = DocumentMap::new();
        for doc in documents {
            map.insert(doc)?;
        }
        Ok(map)
    }

    /// Append a document. Names are the vertex keys of the built graph and must be unique.
    pub fn insert(&mut self, document: Document) -> Result<(), ExoError> {
        if self.index.contains_key(&document.name) {
            return Err(ExoError::Invariant(format!(
                "document '{}' is already present",
                document.name
            )));
        }
        self.index.insert(document.name.clone(), self.documents.len());
        self.documents.push(document);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Document> {
        self.index.get(name).map(|i| &self.documents[*i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.name.as_str())
    }
}

impl IntoIterator for DocumentMap {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

/// The first of `name`'s derived identities, `name_uuid(name)` and then `name#1`, `name#2`...,
/// that `taken` does not reject.
fn fallback_uuid<F: Fn(&Uuid) -> bool>(name: &str, taken: F) -> Uuid {
    let mut candidate = name_uuid(name);
    let mut attempt = 1usize;
    while taken(&candidate) {
        candidate = name_uuid(&format!("{name}#{attempt}"));
        attempt += 1;
    }
    candidate
}

impl DocumentGraph {
    /// Build the graph for `documents`.
    ///
    /// One vertex is allocated per document in map order. Every semantic link whose object
    /// names a document in the map is appended, in depth-first encounter order, to the single
    /// edge for its (source, target) pair. Links to unknown documents create no edge and are
    /// listed in the returned report.
    #[tracing::instrument(skip_all, fields(documents = documents.len()))]
    pub fn build(documents: DocumentMap) -> (DocumentGraph, BuildReport) {
        let mut report = BuildReport {
            documents: documents.len(),
            ..Default::default()
        };
        let links: Vec<Vec<SemanticLink>> =
            documents.iter().map(Document::semantic_links).collect();

        // First declarer of a uuid owns it, whatever the order of derived identities.
        let mut declared_by: BTreeMap<Uuid, String> = BTreeMap::new();
        for document in documents.iter() {
            if let Some(declared) = document.uuid {
                declared_by
                    .entry(declared)
                    .or_insert_with(|| document.name.clone());
            }
        }

        let mut graph = DocumentGraph {
            graph: DocGraph::with_capacity(documents.len(), 0),
            ..Default::default()
        };
        for document in documents {
            let name = document.name.clone();
            let wanted = document.uuid.unwrap_or_else(|| name_uuid(&name));
            let held_by = match document.uuid {
                Some(declared) => declared_by.get(&declared).filter(|owner| **owner != name),
                None => declared_by.get(&wanted),
            }
            .cloned()
            .or_else(|| {
                graph
                    .index_of_uuid(&wanted)
                    .map(|holder| graph.graph[holder].name.clone())
            });
            let uuid = match held_by {
                None => wanted,
                Some(held_by) => {
                    let assigned = fallback_uuid(&name, |candidate| {
                        graph.by_uuid.contains_key(candidate) || declared_by.contains_key(candidate)
                    });
                    tracing::warn!(
                        "[{name}] uuid {wanted} already held by '{held_by}', using {assigned}"
                    );
                    report.diagnostics.push(BuildDiagnostic::DuplicateUuid {
                        document: name.clone(),
                        uuid: wanted,
                        held_by,
                        assigned,
                    });
                    assigned
                }
            };
            let index = graph.graph.add_node(VertexData {
                name: name.clone(),
                uuid,
                document,
            });
            graph.by_name.insert(name, index);
            graph.by_uuid.insert(uuid, index);
        }

        for (source, source_links) in graph.graph.node_indices().zip(links) {
            for link in source_links {
                report.links += 1;
                let Some(target) = graph.index_of(&link.object) else {
                    let unresolved = UnresolvedTarget::from_link(&graph.graph[source].name, &link);
                    tracing::warn!("dropping link {unresolved}");
                    report
                        .diagnostics
                        .push(BuildDiagnostic::UnresolvedTarget(unresolved));
                    continue;
                };
                let edge = match graph.edge_between(source, target) {
                    Some(edge) => edge,
                    None => {
                        tracing::debug!(
                            "new edge '{}' -> '{}'",
                            graph.graph[source].name,
                            graph.graph[target].name
                        );
                        let edge = graph.graph.add_edge(source, target, EdgeData::default());
                        graph.by_endpoints.insert((source, target), edge);
                        edge
                    }
                };
                graph.graph[edge].push(link.predicate, link.element);
            }
        }

        report.edges = graph.edge_count();
        tracing::info!("built graph: {report}");
        (graph, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MARKUP;
    use test_log::test;
    use uuid::Uuid;

    fn build(sources: &[(&str, &str)]) -> (DocumentGraph, BuildReport) {
        let map = DocumentMap::from_sources(&MARKUP, sources.iter().copied()).unwrap();
        DocumentGraph::build(map)
    }

    #[test]
    fn duplicate_document_names_are_rejected() {
        let err = DocumentMap::from_sources(&MARKUP, [("a", ""), ("a", "")]).unwrap_err();
        assert!(matches!(err, ExoError::Invariant(_)));
    }

    #[test]
    fn vertices_follow_map_order() {
        let (graph, _) = build(&[("c", ""), ("a", ""), ("b", "")]);
        let names = graph
            .as_graph()
            .node_weights()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn repeated_predicates_accumulate_on_one_edge() {
        let (graph, report) = build(&[
            ("a", "[[in|b]] and again [[in|b]] and [[b]]"),
            ("b", ""),
        ]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(report.links, 3);
        let edge = graph
            .edge_between(graph.index_of("a").unwrap(), graph.index_of("b").unwrap())
            .unwrap();
        let data = &graph.as_graph()[edge];
        assert_eq!(data.predicates, vec!["in", "in", "ref"]);
        assert_eq!(data.elements.len(), 3);
        assert_ne!(data.elements[0].span, data.elements[1].span);
    }

    #[test]
    fn unresolved_targets_are_reported() {
        let (graph, report) = build(&[("a", "[[in|missing]] [[b]]"), ("b", "")]);
        assert_eq!(graph.edge_count(), 1);
        let unresolved = report.unresolved().collect::<Vec<_>>();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].source, "a");
        assert_eq!(unresolved[0].object, "missing");
        assert_eq!(unresolved[0].predicate, "in");
    }

    #[test]
    fn self_links_make_self_loops() {
        let (graph, report) = build(&[("a", "see [[a]]")]);
        assert!(report.is_clean());
        let a = graph.index_of("a").unwrap();
        assert!(graph.edge_between(a, a).is_some());
    }

    #[test]
    fn declared_uuids_win_and_duplicates_fall_back() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let source = format!("---\nuuid = \"{id}\"\n---\n");
        let (graph, report) = build(&[("a", source.as_str()), ("b", source.as_str()), ("c", "")]);
        let a = graph.index_of("a").unwrap();
        let b = graph.index_of("b").unwrap();
        assert_eq!(graph.as_graph()[a].uuid, Uuid::parse_str(id).unwrap());
        assert_eq!(graph.as_graph()[b].uuid, name_uuid("b"));
        assert_eq!(
            graph.as_graph()[graph.index_of("c").unwrap()].uuid,
            name_uuid("c")
        );
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn derived_uuid_yields_to_an_earlier_declaration() {
        let source = format!("---\nuuid = \"{}\"\n---\n", name_uuid("b"));
        let (graph, report) = build(&[("a", source.as_str()), ("b", "")]);
        let a = graph.index_of("a").unwrap();
        let b = graph.index_of("b").unwrap();
        assert_eq!(graph.as_graph()[a].uuid, name_uuid("b"));
        assert_ne!(graph.as_graph()[b].uuid, name_uuid("b"));
        assert_eq!(graph.index_of_uuid(&name_uuid("b")), Some(a));
        assert_eq!(graph.index_of_uuid(&graph.as_graph()[b].uuid), Some(b));
        match report.diagnostics.as_slice() {
            [BuildDiagnostic::DuplicateUuid {
                document,
                held_by,
                assigned,
                ..
            }] => {
                assert_eq!(document, "b");
                assert_eq!(held_by, "a");
                assert_eq!(*assigned, graph.as_graph()[b].uuid);
            }
            other => panic!("expected one duplicate uuid diagnostic, got {other:?}"),
        }
    }

    #[test]
    fn later_declaration_of_a_derived_uuid_still_wins() {
        let source = format!("---\nuuid = \"{}\"\n---\n", name_uuid("a"));
        let (graph, report) = build(&[("a", ""), ("b", source.as_str())]);
        let a = graph.index_of("a").unwrap();
        let b = graph.index_of("b").unwrap();
        assert_eq!(graph.as_graph()[b].uuid, name_uuid("a"));
        assert_ne!(graph.as_graph()[a].uuid, graph.as_graph()[b].uuid);
        assert_eq!(report.diagnostics.len(), 1);
    }
}
