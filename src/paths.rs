//! Semantic request paths.
//!
//! A path addresses either a content object inside a site, optionally through a view and a
//! predicate, or a built asset bundle of the site:
//!
//! ```text
//! path       ::= "/"? site ( "/" tail )? "/"?
//! tail       ::= bundle | view ( "/" triple )? | triple
//! bundle     ::= "_bundle" "/" ( "js" | "map" | "css" )
//! view       ::= "~" NAME
//! triple     ::= ( predicate "/" )? object
//! NAME       ::= ( [A-Za-z0-9_.-] | "%" HEX HEX )+
//! ```
//!
//! Parsing first produces a [`PathNode`] tree, which a visitor then folds into a flat
//! [`SemanticPath`]. Every rejection is an [`ExoError::MalformedPath`] naming the byte offset
//! at which the grammar failed.
//!
//! ```rust
//! use exograph::paths::SemanticPath;
//!
//! let path: SemanticPath = "/wiki/~outline/in/physics".parse().unwrap();
//! assert_eq!(path.site, "wiki");
//! assert_eq!(path.view.as_deref(), Some("outline"));
//! assert_eq!(path.predicate, "in");
//! assert_eq!(path.object.as_deref(), Some("physics"));
//! assert_eq!(path.to_string(), "/wiki/~outline/in/physics");
//! ```

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{codec::DEFAULT_PREDICATE, error::ExoError};

/// Tail segment reserved for asset bundles.
pub const BUNDLE_SEGMENT: &str = "_bundle";
const VIEW_SIGIL: char = '~';

/// Built asset kinds a site serves under [`BUNDLE_SEGMENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    Js,
    Map,
    Css,
}

impl BundleKind {
    pub const ALL: [BundleKind; 3] = [BundleKind::Js, BundleKind::Map, BundleKind::Css];

    pub fn as_str(&self) -> &'static str {
        match self {
            BundleKind::Js => "js",
            BundleKind::Map => "map",
            BundleKind::Css => "css",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            BundleKind::Js => "application/javascript",
            BundleKind::Map => "application/json",
            BundleKind::Css => "text/css",
        }
    }

    fn from_segment(segment: &str) -> Option<BundleKind> {
        BundleKind::ALL.into_iter().find(|k| k.as_str() == segment)
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse tree of a semantic path. Names are stored decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathNode {
    Path(Vec<PathNode>),
    Site(String),
    Bundle(BundleKind),
    View(String),
    Triple(Vec<PathNode>),
    Predicate(String),
    Object(String),
}

/// A `/`-separated segment and its byte offset in the original path.
#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    text: &'a str,
    offset: usize,
}

struct PathParser<'a> {
    path: &'a str,
}

impl<'a> PathParser<'a> {
    fn malformed(&self, position: usize, expected: &str) -> ExoError {
        ExoError::MalformedPath {
            path: self.path.to_string(),
            position,
            expected: expected.to_string(),
        }
    }

    fn segments(&self) -> Result<Vec<Segment<'a>>, ExoError> {
        let mut body = self.path;
        let mut offset = 0;
        if let Some(rest) = body.strip_prefix('/') {
            body = rest;
            offset = 1;
        }
        if let Some(rest) = body.strip_suffix('/') {
            body = rest;
        }
        if body.is_empty() {
            return Err(self.malformed(offset, "site name"));
        }
        let mut segments = Vec::new();
        for text in body.split('/') {
            if text.is_empty() {
                return Err(self.malformed(offset, "path segment"));
            }
            segments.push(Segment { text, offset });
            offset += text.len() + 1;
        }
        Ok(segments)
    }

    fn name(&self, segment: Segment<'_>) -> Result<String, ExoError> {
        if segment.text.is_empty() {
            return Err(self.malformed(segment.offset, "name"));
        }
        let bytes = segment.text.as_bytes();
        let mut decoded = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if is_name_byte(b) {
                decoded.push(b);
                i += 1;
            } else if b == b'%' {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| self.malformed(segment.offset + i, "two hex digits after '%'"))?;
                decoded.push(hex);
                i += 3;
            } else {
                return Err(self.malformed(
                    segment.offset + i,
                    "name character [A-Za-z0-9_.-] or percent-encoding",
                ));
            }
        }
        String::from_utf8(decoded)
            .map_err(|_| self.malformed(segment.offset, "percent-encoded UTF-8"))
    }

    fn parse(&self) -> Result<PathNode, ExoError> {
        let segments = self.segments()?;
        let (site, tail) = segments
            .split_first()
            .ok_or_else(|| self.malformed(0, "site name"))?;
        let mut children = vec![PathNode::Site(self.name(*site)?)];
        if let Some(first) = tail.first() {
            if first.text == BUNDLE_SEGMENT {
                children.push(self.bundle(&tail[1..], first)?);
            } else if let Some(view) = first.text.strip_prefix(VIEW_SIGIL) {
                children.push(PathNode::View(self.name(Segment {
                    text: view,
                    offset: first.offset + VIEW_SIGIL.len_utf8(),
                })?));
                if tail.len() > 1 {
                    children.push(self.triple(&tail[1..])?);
                }
            } else {
                children.push(self.triple(tail)?);
            }
        }
        Ok(PathNode::Path(children))
    }

    fn bundle(&self, rest: &[Segment<'_>], marker: &Segment<'_>) -> Result<PathNode, ExoError> {
        let Some(kind) = rest.first() else {
            return Err(self.malformed(
                marker.offset + marker.text.len(),
                "bundle kind (js, map, css)",
            ));
        };
        let bundle = BundleKind::from_segment(kind.text)
            .ok_or_else(|| self.malformed(kind.offset, "bundle kind (js, map, css)"))?;
        if let Some(extra) = rest.get(1) {
            return Err(self.malformed(extra.offset, "end of path"));
        }
        Ok(PathNode::Bundle(bundle))
    }

    fn triple(&self, segments: &[Segment<'_>]) -> Result<PathNode, ExoError> {
        match segments {
            [object] => Ok(PathNode::Triple(vec![PathNode::Object(self.name(*object)?)])),
            [predicate, object] => Ok(PathNode::Triple(vec![
                PathNode::Predicate(self.name(*predicate)?),
                PathNode::Object(self.name(*object)?),
            ])),
            [_, _, extra, ..] => Err(self.malformed(extra.offset, "end of path")),
            [] => Err(self.malformed(self.path.len(), "object name")),
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}

fn encode_name(name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in name.bytes() {
        if is_name_byte(b) {
            write!(f, "{}", b as char)?;
        } else {
            write!(f, "%{b:02X}")?;
        }
    }
    Ok(())
}

/// Encode a triple name, escaping it when it would read back as the bundle marker.
fn encode_triple_name(name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match name.strip_prefix('_') {
        Some(rest) if name == BUNDLE_SEGMENT => {
            write!(f, "%5F")?;
            encode_name(rest, f)
        }
        _ => encode_name(name, f),
    }
}

impl PathNode {
    pub fn parse(path: &str) -> Result<PathNode, ExoError> {
        PathParser { path }.parse()
    }
}

/// The decoded fields of a semantic path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticPath {
    pub site: String,
    pub view: Option<String>,
    /// Defaults to `ref` when the path names only an object
    pub predicate: String,
    pub object: Option<String>,
    /// Set when the path addresses a built asset rather than content
    pub bundle: Option<BundleKind>,
}

impl SemanticPath {
    pub fn new(site: impl Into<String>) -> Self {
        SemanticPath {
            site: site.into(),
            view: None,
            predicate: DEFAULT_PREDICATE.to_string(),
            object: None,
            bundle: None,
        }
    }

    /// Fold a parse tree into its fields, top-down.
    pub fn from_tree(tree: &PathNode) -> SemanticPath {
        let mut path = SemanticPath::new(String::new());
        let mut stack = vec![tree];
        while let Some(node) = stack.pop() {
            match node {
                PathNode::Path(children) | PathNode::Triple(children) => {
                    stack.extend(children.iter().rev())
                }
                PathNode::Site(site) => path.site = site.clone(),
                PathNode::Bundle(kind) => path.bundle = Some(*kind),
                PathNode::View(view) => path.view = Some(view.clone()),
                PathNode::Predicate(predicate) => path.predicate = predicate.clone(),
                PathNode::Object(object) => path.object = Some(object.clone()),
            }
        }
        path
    }

    pub fn is_bundle(&self) -> bool {
        self.bundle.is_some()
    }

    /// Content type of the addressed bundle, if this path addresses one.
    pub fn bundle_mime(&self) -> Option<&'static str> {
        self.bundle.map(|b| b.mime())
    }
}

impl FromStr for SemanticPath {
    type Err = ExoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SemanticPath::from_tree(&PathNode::parse(s)?))
    }
}

impl fmt::Display for SemanticPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        encode_name(&self.site, f)?;
        if let Some(bundle) = self.bundle {
            return write!(f, "/{BUNDLE_SEGMENT}/{bundle}");
        }
        if let Some(view) = &self.view {
            write!(f, "/{VIEW_SIGIL}")?;
            encode_name(view, f)?;
        }
        if let Some(object) = &self.object {
            if self.predicate != DEFAULT_PREDICATE {
                write!(f, "/")?;
                encode_triple_name(&self.predicate, f)?;
            }
            write!(f, "/")?;
            encode_triple_name(object, f)?;
        }
        Ok(())
    }
}
