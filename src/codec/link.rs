//! Semantic links: the typed relations a document declares towards other documents.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    element::{Element, ElementKind},
    LinkMatcher,
};

/// Predicate used when a link does not name one.
pub const DEFAULT_PREDICATE: &str = "ref";

/// Predicate carried by every `{[object]}...{[/object]}` link.
pub const FORMAT_PREDICATE: &str = "format";

/// A relation extracted from a parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticLink {
    pub predicate: String,
    pub object: String,
    pub view: String,
    /// A copy of the markup element the link was parsed from.
    pub element: Element,
}

impl SemanticLink {
    pub fn from_element(element: &Element) -> Option<SemanticLink> {
        let (predicate, object, view) = match &element.kind {
            ElementKind::InternalLink {
                predicate,
                object,
                view,
            }
            | ElementKind::DestinationLink {
                predicate,
                object,
                view,
            } => (predicate.clone(), object.clone(), view.clone()),
            ElementKind::FormatLink { object, .. } => {
                (FORMAT_PREDICATE.to_string(), object.clone(), String::new())
            }
            _ => return None,
        };
        Some(SemanticLink {
            predicate,
            object,
            view,
            element: element.clone(),
        })
    }
}

impl fmt::Display for SemanticLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}|{}", self.predicate, self.object)?;
        if !self.view.is_empty() {
            write!(f, ".{}", self.view)?;
        }
        write!(f, "]]")
    }
}

/// Split `object.view` on the first `.`; the view is empty when there is no dot.
pub fn split_view(target: &str) -> (String, String) {
    match target.split_once('.') {
        Some((object, view)) => (object.trim().to_string(), view.trim().to_string()),
        None => (target.trim().to_string(), String::new()),
    }
}

/// Split `predicate|object.view` into its three parts, defaulting the predicate to `ref`.
pub fn split_triple(body: &str) -> (String, String, String) {
    let (predicate, target) = match body.split_once('|') {
        Some((predicate, target)) => (predicate.trim(), target),
        None => (DEFAULT_PREDICATE, body),
    };
    let predicate = if predicate.is_empty() {
        DEFAULT_PREDICATE
    } else {
        predicate
    };
    let (object, view) = split_view(target);
    (predicate.to_string(), object, view)
}

/// Recognizes `[text]([predicate|object])`: an ordinary link whose destination is itself
/// wrapped in brackets. The destination is dropped in favor of the semantic triple.
#[derive(Debug, Default, Clone)]
pub struct DestinationLinkMatcher;

impl LinkMatcher for DestinationLinkMatcher {
    fn name(&self) -> &'static str {
        "destination_link"
    }

    fn priority(&self) -> i32 {
        6
    }

    fn try_match(&self, dest: &str) -> Option<ElementKind> {
        let inner = dest.strip_prefix('[')?.strip_suffix(']')?;
        if inner.trim().is_empty() {
            return None;
        }
        let (predicate, object, view) = split_triple(inner);
        if object.is_empty() {
            return None;
        }
        Some(ElementKind::DestinationLink {
            predicate,
            object,
            view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_triple_defaults_predicate() {
        assert_eq!(
            split_triple("physics"),
            ("ref".to_string(), "physics".to_string(), String::new())
        );
        assert_eq!(
            split_triple("in|physics.flat"),
            ("in".to_string(), "physics".to_string(), "flat".to_string())
        );
    }

    #[test]
    fn split_view_uses_first_dot() {
        assert_eq!(
            split_view("notes.v2.json"),
            ("notes".to_string(), "v2.json".to_string())
        );
    }

    #[test]
    fn destination_matcher_requires_brackets() {
        let matcher = DestinationLinkMatcher;
        assert!(matcher.try_match("https://example.com").is_none());
        assert!(matcher.try_match("[]").is_none());
        assert_eq!(
            matcher.try_match("[embed|figure]"),
            Some(ElementKind::DestinationLink {
                predicate: "embed".to_string(),
                object: "figure".to_string(),
                view: String::new(),
            })
        );
    }

    #[test]
    fn format_links_carry_format_predicate() {
        let element = Element::new(
            ElementKind::FormatLink {
                object: "callout".to_string(),
                text: "hi".to_string(),
            },
            None,
        );
        let link = element.semantic_link().unwrap();
        assert_eq!(link.predicate, "format");
        assert_eq!(link.object, "callout");
        assert_eq!(link.to_string(), "[[format|callout]]");
    }
}
