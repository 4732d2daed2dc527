//! Generic syntax tree produced by the markup pipeline.
//!
//! Every construct, whether it comes from the base markdown engine or from one of the
//! extension matchers, is an [`Element`] carrying an [`ElementKind`], an optional byte span
//! into the source, and its children. Keeping one node type makes depth-first collection of
//! semantic links a flat walk instead of a visitor per construct.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use uuid::Uuid;

use super::link::SemanticLink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Document,
    FrontMatter {
        source: String,
    },
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    List {
        start: Option<u64>,
    },
    Item,
    CodeBlock {
        info: String,
        code: String,
    },
    HtmlBlock {
        html: String,
    },
    ThematicBreak,
    Table,
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition {
        label: String,
    },
    FootnoteReference {
        label: String,
    },
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        dest: String,
        title: String,
    },
    Image {
        dest: String,
        title: String,
    },
    Code {
        code: String,
    },
    Html {
        html: String,
    },
    Text {
        text: String,
    },
    HardBreak,
    TaskMarker {
        checked: bool,
    },
    /// Any base-engine container this crate does not model explicitly.
    Container {
        name: String,
    },
    /// `[[predicate|object.view]]`
    InternalLink {
        predicate: String,
        object: String,
        view: String,
    },
    /// `{[object]}text{[/object]}`
    FormatLink {
        object: String,
        text: String,
    },
    /// `[text]([predicate|object])`: a standard link whose destination is bracket-wrapped.
    DestinationLink {
        predicate: String,
        object: String,
        view: String,
    },
    InlineMath {
        latex: String,
    },
    BlockMath {
        latex: String,
    },
    Directive {
        directive_type: String,
        argument: Option<String>,
    },
    DirectiveOption {
        option: String,
        value: Option<String>,
    },
    DirectiveContent {
        content: String,
    },
}

impl ElementKind {
    /// The type name used for filtering, matching the variant name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Document => "Document",
            ElementKind::FrontMatter { .. } => "FrontMatter",
            ElementKind::Paragraph => "Paragraph",
            ElementKind::Heading { .. } => "Heading",
            ElementKind::BlockQuote => "BlockQuote",
            ElementKind::List { .. } => "List",
            ElementKind::Item => "Item",
            ElementKind::CodeBlock { .. } => "CodeBlock",
            ElementKind::HtmlBlock { .. } => "HtmlBlock",
            ElementKind::ThematicBreak => "ThematicBreak",
            ElementKind::Table => "Table",
            ElementKind::TableHead => "TableHead",
            ElementKind::TableRow => "TableRow",
            ElementKind::TableCell => "TableCell",
            ElementKind::FootnoteDefinition { .. } => "FootnoteDefinition",
            ElementKind::FootnoteReference { .. } => "FootnoteReference",
            ElementKind::Emphasis => "Emphasis",
            ElementKind::Strong => "Strong",
            ElementKind::Strikethrough => "Strikethrough",
            ElementKind::Link { .. } => "Link",
            ElementKind::Image { .. } => "Image",
            ElementKind::Code { .. } => "Code",
            ElementKind::Html { .. } => "Html",
            ElementKind::Text { .. } => "Text",
            ElementKind::HardBreak => "HardBreak",
            ElementKind::TaskMarker { .. } => "TaskMarker",
            ElementKind::Container { .. } => "Container",
            ElementKind::InternalLink { .. } => "InternalLink",
            ElementKind::FormatLink { .. } => "FormatLink",
            ElementKind::DestinationLink { .. } => "DestinationLink",
            ElementKind::InlineMath { .. } => "InlineMath",
            ElementKind::BlockMath { .. } => "BlockMath",
            ElementKind::Directive { .. } => "Directive",
            ElementKind::DirectiveOption { .. } => "DirectiveOption",
            ElementKind::DirectiveContent { .. } => "DirectiveContent",
        }
    }

    /// Whether the base engine's text inside this element must be kept verbatim rather than
    /// run through the inline extension matchers.
    pub fn is_verbatim(&self) -> bool {
        matches!(
            self,
            ElementKind::CodeBlock { .. }
                | ElementKind::HtmlBlock { .. }
                | ElementKind::FrontMatter { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Range<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(kind: ElementKind, span: Option<Range<usize>>) -> Element {
        Element {
            kind,
            span,
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>, span: Option<Range<usize>>) -> Element {
        Element::new(ElementKind::Text { text: text.into() }, span)
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Element {
        self.children = children;
        self
    }

    /// Depth-first, top-down iteration over this element and all of its descendants.
    pub fn iter(&self) -> ElementIter<'_> {
        ElementIter { stack: vec![self] }
    }

    /// All descendants (including self) whose type name is one of `types` and which pass
    /// `filter`, in traversal order.
    pub fn filter<'a, F>(&'a self, types: &[&str], filter: F) -> Vec<&'a Element>
    where
        F: Fn(&Element) -> bool,
    {
        self.iter()
            .filter(|e| types.contains(&e.kind.type_name()) && filter(e))
            .collect()
    }

    /// Concatenated plain text of this element's subtree.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for elem in self.iter() {
            match &elem.kind {
                ElementKind::Text { text } => out += text,
                ElementKind::Code { code } => out += code,
                ElementKind::InlineMath { latex } => out += latex,
                ElementKind::HardBreak => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    /// Strip source spans from the subtree. Used for content parsed out of a re-indented
    /// buffer, where offsets would not point into the owning document.
    pub fn clear_spans(&mut self) {
        let mut stack = vec![self];
        while let Some(elem) = stack.pop() {
            elem.span = None;
            stack.extend(elem.children.iter_mut());
        }
    }

    /// The semantic link this element declares, if it is one of the link-producing kinds.
    pub fn semantic_link(&self) -> Option<SemanticLink> {
        SemanticLink::from_element(self)
    }
}

pub struct ElementIter<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for ElementIter<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let elem = self.stack.pop()?;
        self.stack.extend(elem.children.iter().rev());
        Some(elem)
    }
}

/// One named content unit and its parsed syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub metadata: toml::Table,
    pub root: Element,
}

impl Document {
    pub fn new(name: impl Into<String>, root: Element) -> Document {
        Document {
            name: name.into(),
            uuid: None,
            metadata: toml::Table::new(),
            root,
        }
    }

    pub fn iter(&self) -> ElementIter<'_> {
        self.root.iter()
    }

    /// Every semantic link declared anywhere in the document, in depth-first, top-down
    /// encounter order.
    pub fn semantic_links(&self) -> Vec<SemanticLink> {
        self.iter().filter_map(Element::semantic_link).collect()
    }

    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.metadata.get("title").and_then(|v| v.as_str()) {
            return Some(title.to_string());
        }
        self.iter()
            .find(|e| matches!(e.kind, ElementKind::Heading { level: 1 }))
            .map(|e| e.plain_text())
    }
}
