//! # exograph
//!
//! A Rust library for turning a set of interlinked markdown documents into a queryable,
//! typed document graph.
//!
//! ## Overview
//!
//! Documents declare relations to each other inline. `[[in|physics]]` files a note under
//! `physics`; `[[calculus]]` is a plain reference. Each such construct is a *semantic link*:
//! a predicate (`in`, `ref`, `embed`, `tag`, ...) and an object naming another document.
//! exograph parses the documents, collects their semantic links and assembles a directed graph
//! with one vertex per document and one edge per linked ordered pair. An edge keeps every
//! predicate declared between its endpoints together with the syntax element that declared
//! it, so nothing is lost when two documents relate in more than one way.
//!
//! ### Key Features
//!
//! - **Extensible markup**: generic markdown (via pulldown-cmark) plus registered extension
//!   matchers for internal links, format links, math and directive blocks
//! - **Accumulating edges**: repeated and differing predicates between the same pair land on
//!   one edge, in document order
//! - **Non-copying views**: predicate masks and hierarchy closures are read-only filters over
//!   the owning graph
//! - **Stable identities**: every document gets a UUID, declared in front matter or derived from
//!   its name
//! - **Diagnostics, not failures**: links to unknown documents are reported, never dangling
//! - **Semantic paths**: `/site/~view/predicate/object` request paths parse into structured
//!   queries
//!
//! ## Architecture
//!
//! - **[`codec`]**: markup parsing (`MarkupParser`, `Element`, `SemanticLink`)
//! - **[`graph`]**: graph construction, persistence, views and calculations
//! - **[`query`]**: serialisable query results for serving a graph
//! - **[`paths`]**: the semantic request path grammar
//! - **[`corpus`]**: loading documents from a content directory
//! - **[`config`]**: `exo.toml` settings
//!
//! ## Quick Start
//!
//! ```rust
//! use exograph::{codec::MARKUP, graph::{DocumentGraph, DocumentMap}};
//!
//! let documents = DocumentMap::from_sources(
//!     &MARKUP,
//!     [
//!         ("physics", "# Physics\n\nSee [[mathematics]] and [[in|science]]."),
//!         ("mathematics", ".. note::\n   Filed under [[in|science]].\n"),
//!         ("science", "Nothing links [[from|nowhere]] here."),
//!     ],
//! )?;
//! let (graph, report) = DocumentGraph::build(documents);
//!
//! // the link to `nowhere` created no edge
//! assert_eq!(report.unresolved().count(), 1);
//!
//! let science = graph.view().hierarchy().subgraph_around("science", true)?;
//! let names = science.vertices().iter().map(|v| v.name().to_string()).collect::<Vec<_>>();
//! assert_eq!(names, vec!["physics", "mathematics", "science"]);
//! # Ok::<(), exograph::ExoError>(())
//! ```
//!
//! ### Loading a content directory
//!
//! ```rust,no_run
//! use exograph::{codec::MARKUP, config::ExoConfig, corpus, graph::DocumentGraph};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), exograph::ExoError> {
//! let config = ExoConfig::load(Path::new("exo.toml"))?;
//! let documents = corpus::load_dir(&MARKUP, &config.content_root, &config.extension)?;
//! let (graph, report) = DocumentGraph::build(documents);
//! for unresolved in report.unresolved() {
//!     eprintln!("{unresolved}");
//! }
//! graph.save(&config.graph_file)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `exo` command line tool (`clap`, `tracing-subscriber`)

pub mod codec;
pub mod config;
pub mod corpus;
pub mod error;
pub mod graph;
pub mod paths;
pub mod query;

pub use error::*;
