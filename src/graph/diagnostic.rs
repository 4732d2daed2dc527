//! Diagnostics collected while building a [`DocumentGraph`](super::DocumentGraph).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::codec::SemanticLink;

/// A link whose object does not name any document in the build input.
///
/// No edge is created for it; the link is reported instead.
///
/// ```
/// # use exograph::graph::UnresolvedTarget;
/// let unresolved = UnresolvedTarget {
///     source: "notes/physics".to_string(),
///     predicate: "in".to_string(),
///     object: "notes/science".to_string(),
///     span: Some(12..30),
/// };
/// assert_eq!(unresolved.to_string(), "'notes/physics' -[in]-> 'notes/science' (unresolved, bytes 12..30)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedTarget {
    /// Name of the document declaring the link
    pub source: String,
    pub predicate: String,
    /// The object name that failed to resolve
    pub object: String,
    /// Location of the link in the source document, when known
    pub span: Option<std::ops::Range<usize>>,
}

impl UnresolvedTarget {
    pub fn from_link(source: &str, link: &SemanticLink) -> Self {
        UnresolvedTarget {
            source: source.to_string(),
            predicate: link.predicate.clone(),
            object: link.object.clone(),
            span: link.element.span.clone(),
        }
    }
}

impl fmt::Display for UnresolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' -[{}]-> '{}' (unresolved",
            self.source, self.predicate, self.object
        )?;
        if let Some(span) = &self.span {
            write!(f, ", bytes {}..{}", span.start, span.end)?;
        }
        write!(f, ")")
    }
}

/// Non-fatal findings of a graph build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildDiagnostic {
    /// A link to an unknown document was dropped
    UnresolvedTarget(UnresolvedTarget),

    /// The uuid a document declared, or the one derived from its name, is already held by
    /// another document. The document was assigned a fresh derived identity instead.
    DuplicateUuid {
        document: String,
        uuid: Uuid,
        held_by: String,
        assigned: Uuid,
    },
}

impl fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildDiagnostic::UnresolvedTarget(target) => write!(f, "{target}"),
            BuildDiagnostic::DuplicateUuid {
                document,
                uuid,
                held_by,
                assigned,
            } => write!(
                f,
                "'{document}' cannot take uuid {uuid} held by '{held_by}', assigned {assigned}"
            ),
        }
    }
}

/// Summary of a graph build, returned alongside the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub documents: usize,
    /// Semantic links collected across all documents, resolved or not
    pub links: usize,
    pub edges: usize,
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl BuildReport {
    pub fn unresolved(&self) -> impl Iterator<Item = &UnresolvedTarget> {
        self.diagnostics.iter().filter_map(|d| match d {
            BuildDiagnostic::UnresolvedTarget(target) => Some(target),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents, {} links, {} edges, {} unresolved",
            self.documents,
            self.links,
            self.edges,
            self.unresolved().count()
        )
    }
}
