//! Serialisable query results for callers serving a graph, such as the `exo` CLI.
//!
//! Each function takes a [`GraphView`] and answers with owned records, so results can outlive
//! the view and be written out as JSON directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    codec::Element,
    error::ExoError,
    graph::{Edge, GraphView, Vertex},
    paths::{BundleKind, SemanticPath},
};

/// Restricts the vertices a query sees.
///
/// The ancestor closure is taken first, over the unmasked hierarchy; the predicate mask is
/// then applied to what remains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFilter {
    /// Keep only this vertex and everything transitively `in` it
    pub in_subgraph: Option<String>,
    /// Keep only edges carrying this predicate
    pub predicate: Option<String>,
}

impl NodeFilter {
    pub fn apply<'g>(&self, view: &GraphView<'g>) -> Result<GraphView<'g>, ExoError> {
        let mut filtered = match &self.in_subgraph {
            Some(root) => view.subgraph_around(root, true)?,
            None => view.clone(),
        };
        if let Some(predicate) = &self.predicate {
            filtered = filtered.predicate_masked(predicate);
        }
        Ok(filtered)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum Direction {
    #[default]
    All,
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Uuid,
    pub name: String,
    pub title: Option<String>,
}

impl From<&Vertex<'_>> for NodeRecord {
    fn from(vertex: &Vertex<'_>) -> Self {
        NodeRecord {
            id: vertex.uuid(),
            name: vertex.name().to_string(),
            title: vertex.document().title(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeRecord,
    pub target: NodeRecord,
    pub predicates: Vec<String>,
    pub elements: Vec<Element>,
}

impl From<&Edge<'_>> for EdgeRecord {
    fn from(edge: &Edge<'_>) -> Self {
        EdgeRecord {
            source: NodeRecord::from(&edge.source()),
            target: NodeRecord::from(&edge.target()),
            predicates: edge.predicates().to_vec(),
            elements: edge.elements().to_vec(),
        }
    }
}

/// What a [`SemanticPath`] points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathResolution {
    /// A built asset; no graph lookup was made
    Bundle {
        bundle: BundleKind,
        mime: String,
    },
    /// The site root: every vertex
    Site {
        site: String,
        view: Option<String>,
        nodes: Vec<NodeRecord>,
    },
    /// One vertex and its edges carrying the path's predicate
    Object {
        site: String,
        view: Option<String>,
        predicate: String,
        node: NodeRecord,
        edges: Vec<EdgeRecord>,
    },
}

/// Every vertex visible through `filter`, in allocation order.
pub fn nodes(view: &GraphView<'_>, filter: &NodeFilter) -> Result<Vec<NodeRecord>, ExoError> {
    Ok(filter
        .apply(view)?
        .vertices()
        .iter()
        .map(NodeRecord::from)
        .collect())
}

pub fn node_by_name(view: &GraphView<'_>, name: &str) -> Result<NodeRecord, ExoError> {
    Ok(NodeRecord::from(&view.vertex(name)?))
}

pub fn node_by_id(view: &GraphView<'_>, id: &Uuid) -> Result<NodeRecord, ExoError> {
    Ok(NodeRecord::from(&view.vertex_by_uuid(id)?))
}

/// Neighbours of `name` in the filtered view. Fails when the filter excludes `name` itself.
pub fn neighbors(
    view: &GraphView<'_>,
    name: &str,
    direction: Direction,
    filter: &NodeFilter,
) -> Result<Vec<NodeRecord>, ExoError> {
    let filtered = filter.apply(view)?;
    let vertex = filtered.vertex(name)?;
    let neighbors = match direction {
        Direction::All => vertex.all_neighbors(),
        Direction::In => vertex.in_neighbors(),
        Direction::Out => vertex.out_neighbors(),
    };
    Ok(neighbors.iter().map(NodeRecord::from).collect())
}

pub fn edges(
    view: &GraphView<'_>,
    name: &str,
    direction: Direction,
    filter: &NodeFilter,
) -> Result<Vec<EdgeRecord>, ExoError> {
    let filtered = filter.apply(view)?;
    let vertex = filtered.vertex(name)?;
    let edges = match direction {
        Direction::All => vertex.all_edges(),
        Direction::In => vertex.in_edges(),
        Direction::Out => vertex.out_edges(),
    };
    Ok(edges.iter().map(EdgeRecord::from).collect())
}

/// Resolve a parsed path against `view`. Bundle paths resolve without touching the graph.
#[tracing::instrument(skip(view), fields(path = %path))]
pub fn resolve_path(view: &GraphView<'_>, path: &SemanticPath) -> Result<PathResolution, ExoError> {
    if let Some(bundle) = path.bundle {
        return Ok(PathResolution::Bundle {
            bundle,
            mime: bundle.mime().to_string(),
        });
    }
    let Some(object) = &path.object else {
        return Ok(PathResolution::Site {
            site: path.site.clone(),
            view: path.view.clone(),
            nodes: nodes(view, &NodeFilter::default())?,
        });
    };
    let edges = edges(
        view,
        object,
        Direction::All,
        &NodeFilter {
            in_subgraph: None,
            predicate: Some(path.predicate.clone()),
        },
    )?;
    Ok(PathResolution::Object {
        site: path.site.clone(),
        view: path.view.clone(),
        predicate: path.predicate.clone(),
        node: node_by_name(view, object)?,
        edges,
    })
}
