//! Performance benchmarks for graph construction and querying
//!
//! These benchmarks run over a generated corpus to measure:
//! - Markup parsing into documents
//! - Link resolution and graph assembly
//! - Masked view queries and hierarchy closure
//! - JSON persistence
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use exograph::{
    codec::MARKUP,
    graph::{CalcArgs, DocumentGraph, DocumentMap, CALCULATIONS},
};
use std::hint::black_box;

// Each topic is filed under its parent (a binary tree) and references two siblings.
fn corpus(size: usize) -> Vec<(String, String)> {
    (0..size)
        .map(|i| {
            let mut body = format!("# Topic {i}\n\nSome prose about topic {i}.\n\n");
            if i > 0 {
                body.push_str(&format!("Filed [[in|topic{}]].\n\n", (i - 1) / 2));
            }
            body.push_str(&format!(
                "See [[topic{}]] and [related]([tag|topic{}.summary]).\n\n",
                (i + 1) % size,
                (i + 7) % size
            ));
            if i % 5 == 0 {
                body.push_str(&format!(
                    ".. note:: aside\n   Compare {{[topic{}]}}this{{[/topic{}]}}, with $x_{i}$.\n",
                    (i + 3) % size,
                    (i + 3) % size
                ));
            }
            (format!("topic{i}"), body)
        })
        .collect()
}

fn built(size: usize) -> DocumentGraph {
    let documents = DocumentMap::from_sources(&MARKUP, corpus(size)).unwrap();
    DocumentGraph::build(documents).0
}

fn bench_parse_corpus(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_corpus");
    for size in [100, 1000] {
        let sources = corpus(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &sources, |b, sources| {
            b.iter(|| DocumentMap::from_sources(&MARKUP, sources.iter().cloned()).unwrap())
        });
    }
    group.finish();
}

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");
    for size in [100, 1000] {
        let documents = DocumentMap::from_sources(&MARKUP, corpus(size)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &documents,
            |b, documents| {
                b.iter(|| {
                    let (graph, report) = DocumentGraph::build(documents.clone());
                    (graph.edge_count(), report.diagnostics.len())
                })
            },
        );
    }
    group.finish();
}

fn bench_view_queries(c: &mut Criterion) {
    let graph = built(1000);

    c.bench_function("hierarchy_closure", |b| {
        b.iter(|| {
            let closure = graph
                .view()
                .subgraph_around(black_box("topic1"), true)
                .unwrap();
            closure.vertex_count()
        })
    });

    c.bench_function("masked_neighbors", |b| {
        b.iter(|| {
            let view = graph.view();
            let refs = view.references().tags();
            let mut total = 0;
            for vertex in refs.vertices() {
                total += vertex.out_neighbors().len();
            }
            total
        })
    });

    c.bench_function("pagerank_hierarchy", |b| {
        b.iter(|| {
            graph
                .view()
                .hierarchy()
                .calculate(&CALCULATIONS, "pagerank", &CalcArgs::default())
                .unwrap()
        })
    });

    c.bench_function("is_planar", |b| b.iter(|| graph.view().is_planar()));
}

fn bench_json_persistence(c: &mut Criterion) {
    let graph = built(1000);
    let json = graph.to_json().unwrap();

    c.bench_function("to_json", |b| b.iter(|| graph.to_json().unwrap().len()));
    c.bench_function("from_json", |b| {
        b.iter(|| DocumentGraph::from_json(black_box(&json)).unwrap().vertex_count())
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(30)
        .measurement_time(std::time::Duration::from_secs(8));
    targets =
        bench_parse_corpus,
        bench_build_graph,
        bench_view_queries,
        bench_json_persistence
}

criterion_main!(benches);
