//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use exograph::{
    codec::MARKUP,
    graph::{BuildReport, DocumentGraph, DocumentMap},
};
use std::path::Path;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times. Later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A small science wiki using every built-in link syntax.
///
/// `optics` and `mechanics` are filed `in` physics; physics and chemistry are `in` science.
/// `optics` also links to `lasers`, which does not exist.
#[allow(dead_code)]
pub const WIKI: [(&str, &str); 6] = [
    (
        "science",
        "---\ntitle = \"Science\"\n---\n\nThe study of [[nature]].\n",
    ),
    (
        "physics",
        "# Physics\n\n[[in|science]]. Overlaps with [[chemistry]] via [[tag|chemistry]].\n",
    ),
    (
        "chemistry",
        "# Chemistry\n\nFiled [under science]([in|science]).\n",
    ),
    (
        "optics",
        "[[in|physics]] and again [[in|physics.flat]]; see {[mechanics]}lenses{[/mechanics]} \
         and [[ref|lasers]].\n",
    ),
    (
        "mechanics",
        ".. note:: Classical\n   :level: intro\n\n   Belongs [[in|physics]], uses $F = ma$.\n",
    ),
    ("nature", "$$\n\\nabla \\cdot E = \\rho\n$$\n"),
];

/// Build [`WIKI`] with the default parser.
#[allow(dead_code)]
pub fn wiki() -> (DocumentGraph, BuildReport) {
    init_logging();
    let documents = DocumentMap::from_sources(&MARKUP, WIKI).expect("unique names");
    DocumentGraph::build(documents)
}

/// Write [`WIKI`] into `dir` as markdown files.
#[allow(dead_code)]
pub fn write_wiki(dir: &Path) {
    for (name, source) in WIKI {
        std::fs::write(dir.join(format!("{name}.md")), source).expect("writable temp dir");
    }
}
