//! The document graph: one vertex per document, one edge per ordered pair of documents that
//! link to each other, each edge accumulating every predicate declared between the pair.
//!
//! ## Key Components
//!
//! - [`DocumentGraph`] - owned storage, built from a [`DocumentMap`] and persisted as JSON
//! - [`GraphView`] - a read-only, optionally masked window onto a graph ([`Vertex`] and
//!   [`Edge`] handles are obtained through it)
//! - [`BuildReport`] - counts and diagnostics (such as unresolved link targets) from a build
//! - [`CalculationRegistry`] - whole-graph algorithms invoked by name
//!
//! ```rust
//! use exograph::{codec::MARKUP, graph::{DocumentGraph, DocumentMap}};
//!
//! let documents = DocumentMap::from_sources(
//!     &MARKUP,
//!     [
//!         ("mechanics", "[[in|physics]] builds on [[calculus]]"),
//!         ("physics", ""),
//!         ("calculus", ""),
//!     ],
//! )
//! .unwrap();
//! let (graph, report) = DocumentGraph::build(documents);
//! assert!(report.is_clean());
//!
//! let hierarchy = graph.view().hierarchy();
//! let physics = hierarchy.vertex("physics").unwrap();
//! assert_eq!(physics.in_neighbors()[0].name(), "mechanics");
//! assert_eq!(graph.view().vertex("calculus").unwrap().in_degree(), 1);
//! ```

pub mod base;
pub mod builder;
pub mod calc;
pub mod diagnostic;
pub mod planarity;
pub mod view;

pub use base::{name_uuid, DocGraph, DocumentGraph, EdgeData, VertexData, UUID_NAMESPACE_EXO};
pub use builder::DocumentMap;
pub use calc::{
    CalcArgs, CalcGraph, CalcOutput, Calculation, CalculationRegistry, Degree, Recipe, Recipes,
    CALCULATIONS,
};
pub use diagnostic::{BuildDiagnostic, BuildReport, UnresolvedTarget};
pub use view::{
    Edge, GraphView, Vertex, EMBED_PREDICATE, IN_PREDICATE, MEDIA_PREDICATE, REF_PREDICATE,
    TAG_PREDICATES,
};
