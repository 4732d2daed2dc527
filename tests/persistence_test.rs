use std::collections::BTreeSet;
use tempfile::tempdir;
use test_log::test;

use exograph::{
    codec::MARKUP,
    config::ExoConfig,
    corpus,
    graph::{name_uuid, DocumentGraph, DocumentMap, GraphView},
    ExoError,
};

mod common;

type EdgeKey = (String, String, Vec<String>);

fn snapshot(view: &GraphView<'_>) -> (BTreeSet<String>, BTreeSet<EdgeKey>) {
    let vertices = view
        .vertices()
        .iter()
        .map(|v| v.name().to_string())
        .collect();
    let edges = view
        .edges()
        .iter()
        .map(|e| {
            (
                e.source().name().to_string(),
                e.target().name().to_string(),
                e.predicates().to_vec(),
            )
        })
        .collect();
    (vertices, edges)
}

#[test]
fn save_then_load_round_trips() {
    let (graph, _) = common::wiki();
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.json");
    graph.save(&path).unwrap();

    let loaded = DocumentGraph::load(&path).unwrap();
    assert_eq!(snapshot(&loaded.view()), snapshot(&graph.view()));

    for vertex in graph.view().vertices() {
        let other = loaded.view().vertex(vertex.name()).unwrap();
        assert_eq!(other.uuid(), vertex.uuid());
        assert_eq!(other.document(), vertex.document());
    }
    for edge in graph.view().edges() {
        let other = loaded
            .view()
            .edge(edge.source().name(), edge.target().name())
            .unwrap();
        assert_eq!(other.elements(), edge.elements());
    }
}

#[test]
fn loaded_graph_answers_queries() {
    let (graph, _) = common::wiki();
    let loaded = DocumentGraph::from_json(&graph.to_json().unwrap()).unwrap();
    let closure = loaded.view().subgraph_around("physics", true).unwrap();
    assert_eq!(closure.vertex_count(), 3);
    assert_eq!(
        loaded.view().vertex("science").unwrap().document().title().as_deref(),
        Some("Science")
    );
}

#[test]
fn load_rejects_missing_and_corrupt_files() {
    let dir = tempdir().unwrap();
    let missing = DocumentGraph::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(missing.is_not_found());

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{\"version\": 1, \"graph\": 7}").unwrap();
    assert!(matches!(
        DocumentGraph::load(&corrupt),
        Err(ExoError::Serialization(_))
    ));
}

#[test]
fn derivative_views_cannot_stand_in_for_their_owner() {
    let (graph, _) = common::wiki();
    let dir = tempdir().unwrap();
    let masked = graph.view().tags();
    let err = masked.owner().unwrap_err();
    assert!(matches!(err, ExoError::Invariant(_)));
    graph
        .view()
        .owner()
        .unwrap()
        .save(&dir.path().join("graph.json"))
        .unwrap();
}

#[test]
fn corpus_to_saved_graph() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let content = dir.path().join("content");
    std::fs::create_dir(&content).unwrap();
    common::write_wiki(&content);

    let config = ExoConfig::default().relative_to(dir.path());
    let documents = corpus::load_dir(&MARKUP, &config.content_root, &config.extension).unwrap();
    assert_eq!(
        documents.names().collect::<Vec<_>>(),
        vec!["chemistry", "mechanics", "nature", "optics", "physics", "science"]
    );
    let (graph, report) = DocumentGraph::build(documents);
    assert_eq!(report.unresolved().count(), 1);
    graph.save(&config.graph_file).unwrap();

    let (expected, _) = common::wiki();
    let loaded = DocumentGraph::load(&config.graph_file).unwrap();
    let (vertices, edges) = snapshot(&loaded.view());
    let (expected_vertices, expected_edges) = snapshot(&expected.view());
    assert_eq!(vertices, expected_vertices);
    assert_eq!(edges, expected_edges);
}

#[test]
fn identity_collisions_survive_a_round_trip() {
    let declared = format!("---\nuuid = \"{}\"\n---\nsee [[b]]\n", name_uuid("b"));
    let documents =
        DocumentMap::from_sources(&MARKUP, [("a", declared.as_str()), ("b", "see [[a]]")])
            .unwrap();
    let (graph, report) = DocumentGraph::build(documents);
    assert_eq!(report.diagnostics.len(), 1);

    let loaded = DocumentGraph::from_json(&graph.to_json().unwrap()).unwrap();
    assert_eq!(snapshot(&loaded.view()), snapshot(&graph.view()));
    assert_eq!(
        loaded.view().vertex("a").unwrap().uuid(),
        graph.view().vertex("a").unwrap().uuid()
    );
    assert_ne!(
        loaded.view().vertex("a").unwrap().uuid(),
        loaded.view().vertex("b").unwrap().uuid()
    );
}

#[test]
fn non_finite_front_matter_still_saves_and_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let documents = DocumentMap::from_sources(
        &MARKUP,
        [("a", "---\nweight = nan\nrange = [0.5, inf]\n---\n[[b]]\n"), ("b", "")],
    )
    .unwrap();
    let (graph, _) = DocumentGraph::build(documents);
    graph.save(&path).unwrap();

    let loaded = DocumentGraph::load(&path).unwrap();
    assert_eq!(snapshot(&loaded.view()), snapshot(&graph.view()));
    let metadata = &loaded.view().vertex("a").unwrap().document().metadata;
    assert!(!metadata.contains_key("weight"));
    assert_eq!(metadata["range"].as_array().map(Vec::len), Some(1));
}
