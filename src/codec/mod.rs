//! Markup parsing: generic markdown plus the semantic extensions that declare links between
//! documents.
//!
//! ## Key Components
//!
//! - [`MarkupParser`] - an explicit table of extension matchers layered over the base markdown
//!   engine (accessible pre-built via [`MARKUP`])
//! - [`InlineMatcher`], [`BlockMatcher`], [`LinkMatcher`] - the capability contracts an
//!   extension implements
//! - [`Element`] / [`Document`] - the generic syntax tree produced by a parse
//! - [`SemanticLink`] - a typed relation collected from a parsed document
//!
//! ## Pipeline
//!
//! 1. **Block pass**: the source is scanned line by line (outside of code fences and front
//!    matter). At every line start the block matchers are offered the input in descending
//!    priority; a match claims the lines it covers and produces an element directly.
//! 2. **Base pass**: every run of lines no block matcher claimed goes through pulldown-cmark.
//!    Link destinations are offered to the link matchers as they are encountered.
//! 3. **Inline pass**: merged text runs from the base pass are offered to the inline matchers
//!    at each trigger character, again in descending priority. When an inline container
//!    closes, paired constructs whose opener and closer landed in different runs (a format
//!    link around emphasis, say) are joined across the markup between them.
//!
//! A matcher that fails its pattern declines by returning `None`; the input then falls
//! through to the next candidate, or stays plain text.
//!
//! ## Built-in Extensions
//!
//! | name                 | kind   | priority | syntax                              |
//! |----------------------|--------|----------|-------------------------------------|
//! | `directive`          | block  | 9        | `.. type:: argument` + indented body |
//! | `block_math`         | block  | 8        | `$$` ... `$$` on their own lines    |
//! | `inline_block_math`  | inline | 8        | `$$...$$` inside a paragraph        |
//! | `inline_math`        | inline | 7        | `$...$`                             |
//! | `destination_link`   | link   | 6        | `[text]([predicate\|object])`       |
//! | `internal_link`      | inline | 5        | `[[predicate\|object.view]]`        |
//! | `format_link`        | inline | 5        | `{[object]}text{[/object]}`         |
//!
//! Register custom extensions through [`MarkupParser::builder`]:
//!
//! ```rust
//! use exograph::codec::{element::ElementKind, InlineMatch, InlineMatcher, MarkupParser};
//! use std::sync::Arc;
//!
//! struct Hashtag;
//!
//! impl InlineMatcher for Hashtag {
//!     fn name(&self) -> &'static str {
//!         "hashtag"
//!     }
//!     fn priority(&self) -> i32 {
//!         4
//!     }
//!     fn triggers(&self) -> &'static [char] {
//!         &['#']
//!     }
//!     fn try_match(&self, text: &str) -> Option<InlineMatch> {
//!         let len = 1 + text[1..]
//!             .find(|c: char| !c.is_alphanumeric())
//!             .unwrap_or(text.len() - 1);
//!         (len > 1).then(|| InlineMatch {
//!             len,
//!             kind: ElementKind::InternalLink {
//!                 predicate: "tag".to_string(),
//!                 object: text[1..len].to_string(),
//!                 view: String::new(),
//!             },
//!             inner: None,
//!         })
//!     }
//! }
//!
//! let parser = MarkupParser::builder()
//!     .with_builtins()
//!     .inline(Arc::new(Hashtag))
//!     .unwrap()
//!     .build();
//! let doc = parser.parse_document("note", "filed under #physics");
//! assert_eq!(doc.semantic_links()[0].predicate, "tag");
//! ```

use once_cell::sync::Lazy;
use std::{collections::BTreeSet, ops::Range, sync::Arc};
use uuid::Uuid;

use crate::error::ExoError;

pub mod block;
pub mod element;
pub mod inline;
pub mod link;
pub mod md;

pub use element::{Document, Element, ElementKind};
pub use link::{SemanticLink, DEFAULT_PREDICATE, FORMAT_PREDICATE};

/// The default parser with every built-in extension registered.
pub static MARKUP: Lazy<MarkupParser> = Lazy::new(MarkupParser::default);

/// A successful inline match, relative to the text the matcher was offered.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineMatch {
    /// Bytes consumed, counted from the trigger character.
    pub len: usize,
    pub kind: ElementKind,
    /// Sub-range whose text is itself run through the inline pass to produce children.
    /// `None` keeps the content opaque.
    pub inner: Option<Range<usize>>,
}

/// An inline extension, offered text starting at one of its trigger characters.
pub trait InlineMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32;

    /// Characters at which this matcher wants to be tried.
    fn triggers(&self) -> &'static [char];

    /// Match anchored at the start of `text`, or decline.
    fn try_match(&self, text: &str) -> Option<InlineMatch>;

    /// Delimiters for a construct whose body may hold other inline markup (emphasis, code,
    /// standard links), so that its opener and closer land in different text runs.
    fn paired(&self) -> Option<&dyn PairedDelimiters> {
        None
    }
}

/// Opener and closer of a paired inline construct, matched across the children of one inline
/// container after the base pass.
pub trait PairedDelimiters {
    /// An opener anchored at the start of `text`, as its byte length and the key a closer
    /// must echo.
    fn open(&self, text: &str) -> Option<(usize, String)>;

    /// The first closer for `key` within `text`.
    fn close(&self, text: &str, key: &str) -> Option<Range<usize>>;

    /// The element wrapping a body of source text `body`.
    fn wrap(&self, key: String, body: String) -> ElementKind;
}

/// A successful block match.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatch {
    /// Byte offset into the offered source just past the last claimed line.
    pub end: usize,
    pub element: Element,
}

/// A block extension, offered the whole source and the offset of a line start.
pub trait BlockMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32;

    /// `parser` is handed over so block content can be parsed recursively.
    fn try_match(&self, source: &str, line_start: usize, parser: &MarkupParser)
        -> Option<BlockMatch>;
}

/// A standard-link extension, offered the destination of every markdown link.
pub trait LinkMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32;

    /// The element kind that replaces the standard link, or decline.
    fn try_match(&self, dest: &str) -> Option<ElementKind>;
}

#[derive(Clone)]
pub struct MarkupParser {
    block: Vec<Arc<dyn BlockMatcher>>,
    inline: Vec<Arc<dyn InlineMatcher>>,
    link: Vec<Arc<dyn LinkMatcher>>,
}

impl std::fmt::Debug for MarkupParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupParser")
            .field("block", &self.block.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("inline", &self.inline.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("link", &self.link.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl MarkupParser {
    /// A parser with no extensions: plain markdown.
    pub fn plain() -> MarkupParser {
        MarkupParser {
            block: Vec::new(),
            inline: Vec::new(),
            link: Vec::new(),
        }
    }

    pub fn builder() -> MarkupParserBuilder {
        MarkupParserBuilder::default()
    }

    /// Names of every registered matcher, highest priority first within each kind.
    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.block
            .iter()
            .map(|m| m.name())
            .chain(self.inline.iter().map(|m| m.name()))
            .chain(self.link.iter().map(|m| m.name()))
            .collect()
    }

    pub(crate) fn inline_matchers(&self) -> &[Arc<dyn InlineMatcher>] {
        &self.inline
    }

    pub(crate) fn link_matchers(&self) -> &[Arc<dyn LinkMatcher>] {
        &self.link
    }

    /// Parse `source` into a syntax tree rooted at a `Document` element.
    pub fn parse(&self, source: &str) -> Element {
        Element::new(ElementKind::Document, Some(0..source.len()))
            .with_children(self.parse_blocks(source, true))
    }

    /// Parse `source` as the named document, lifting TOML front matter into the metadata
    /// table and its `uuid` key into the document identity.
    #[tracing::instrument(skip(self, source))]
    pub fn parse_document(&self, name: &str, source: &str) -> Document {
        let mut doc = Document::new(name, self.parse(source));
        let front_matter = doc.root.children.first().and_then(|e| match &e.kind {
            ElementKind::FrontMatter { source } => Some(source.clone()),
            _ => None,
        });
        if let Some(front_matter) = front_matter {
            match toml::from_str::<toml::Table>(&front_matter) {
                Ok(mut table) => {
                    let dropped = drop_non_finite(&mut table);
                    if dropped > 0 {
                        tracing::warn!(
                            "[{name}] dropped {dropped} non-finite float value(s) from front matter"
                        );
                    }
                    doc.metadata = table;
                }
                Err(e) => tracing::warn!("[{name}] front matter is not valid TOML: {e}"),
            }
        }
        if let Some(raw) = doc.metadata.get("uuid").and_then(|v| v.as_str()) {
            match Uuid::parse_str(raw) {
                Ok(id) => doc.uuid = Some(id),
                Err(e) => tracing::warn!("[{name}] ignoring invalid uuid '{raw}': {e}"),
            }
        }
        doc
    }

    /// Block pass: hand lines to block matchers, everything else to the base engine.
    /// `front_matter` allows a leading `---` block to be read as front matter; nested content
    /// such as a directive body passes `false`.
    pub(crate) fn parse_blocks(&self, source: &str, front_matter: bool) -> Vec<Element> {
        let mut out = Vec::new();
        let mut segment_start = 0;
        let mut pos = 0;
        let mut fence = FenceState::None;
        while pos < source.len() {
            if fence == FenceState::None {
                let found = self
                    .block
                    .iter()
                    .find_map(|m| m.try_match(source, pos, self))
                    .filter(|found| found.end > pos);
                if let Some(found) = found {
                    if segment_start < pos {
                        out.extend(md::parse_markdown(
                            self,
                            &source[segment_start..pos],
                            segment_start,
                            front_matter,
                        ));
                    }
                    out.push(found.element);
                    pos = found.end;
                    segment_start = pos;
                    continue;
                }
            }
            let line_end = line_end(source, pos);
            fence = fence.advance(&source[pos..line_end], front_matter && pos == 0);
            pos = line_end;
        }
        if segment_start < source.len() {
            out.extend(md::parse_markdown(
                self,
                &source[segment_start..],
                segment_start,
                front_matter,
            ));
        }
        out
    }
}

/// Offset just past the newline ending the line that starts at `pos`.
pub(crate) fn line_end(source: &str, pos: usize) -> usize {
    source[pos..]
        .find('\n')
        .map(|i| pos + i + 1)
        .unwrap_or(source.len())
}

/// Regions where block matchers must not look: fenced code and leading front matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    None,
    Code { marker: char, count: usize },
    FrontMatter,
}

impl FenceState {
    fn advance(self, line: &str, first_line: bool) -> FenceState {
        let content = line.trim_end();
        match self {
            FenceState::None if first_line && content == "---" => FenceState::FrontMatter,
            FenceState::None => match fence_marker(line) {
                Some((marker, count)) => FenceState::Code { marker, count },
                None => FenceState::None,
            },
            FenceState::FrontMatter if content == "---" || content == "..." => FenceState::None,
            FenceState::FrontMatter => FenceState::FrontMatter,
            FenceState::Code { marker, count } => match fence_marker(line) {
                Some((close, close_count))
                    if close == marker
                        && close_count >= count
                        && line.trim_start().trim_start_matches(marker).trim().is_empty() =>
                {
                    FenceState::None
                }
                _ => self,
            },
        }
    }
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let count = rest.chars().take_while(|c| *c == marker).count();
    (count >= 3).then_some((marker, count))
}

/// Explicit registration of extension matchers. Names must be unique across all kinds.
pub struct MarkupParserBuilder {
    parser: MarkupParser,
    names: BTreeSet<&'static str>,
}

impl Default for MarkupParserBuilder {
    fn default() -> Self {
        MarkupParserBuilder {
            parser: MarkupParser::plain(),
            names: BTreeSet::new(),
        }
    }
}

impl MarkupParserBuilder {
    fn claim(&mut self, name: &'static str) -> Result<(), ExoError> {
        if !self.names.insert(name) {
            return Err(ExoError::Invariant(format!(
                "a markup matcher named '{name}' is already registered"
            )));
        }
        Ok(())
    }

    pub fn block(mut self, matcher: Arc<dyn BlockMatcher>) -> Result<Self, ExoError> {
        self.claim(matcher.name())?;
        self.parser.block.push(matcher);
        Ok(self)
    }

    pub fn inline(mut self, matcher: Arc<dyn InlineMatcher>) -> Result<Self, ExoError> {
        self.claim(matcher.name())?;
        self.parser.inline.push(matcher);
        Ok(self)
    }

    pub fn link(mut self, matcher: Arc<dyn LinkMatcher>) -> Result<Self, ExoError> {
        self.claim(matcher.name())?;
        self.parser.link.push(matcher);
        Ok(self)
    }

    /// Register the built-in extensions. Must be called on a fresh builder.
    pub fn with_builtins(mut self) -> Self {
        let builtins = builtin_parser();
        self.names.extend(builtins.matcher_names());
        self.parser.block.extend(builtins.block);
        self.parser.inline.extend(builtins.inline);
        self.parser.link.extend(builtins.link);
        self
    }

    /// Finish registration. Matchers are ordered by descending priority; ties keep
    /// registration order.
    pub fn build(mut self) -> MarkupParser {
        self.parser
            .block
            .sort_by_key(|m| std::cmp::Reverse(m.priority()));
        self.parser
            .inline
            .sort_by_key(|m| std::cmp::Reverse(m.priority()));
        self.parser
            .link
            .sort_by_key(|m| std::cmp::Reverse(m.priority()));
        self.parser
    }
}

fn builtin_parser() -> MarkupParser {
    MarkupParser {
        block: vec![
            Arc::new(block::DirectiveMatcher),
            Arc::new(block::MathBlockMatcher),
        ],
        inline: vec![
            Arc::new(inline::InlineBlockMathMatcher),
            Arc::new(inline::InlineMathMatcher),
            Arc::new(inline::InternalLinkMatcher),
            Arc::new(inline::FormatLinkMatcher),
        ],
        link: vec![Arc::new(link::DestinationLinkMatcher)],
    }
}

impl Default for MarkupParser {
    fn default() -> Self {
        MarkupParser::builder().with_builtins().build()
    }
}

/// Remove nan and infinite floats from a front matter table, recursing into arrays and
/// tables. Graph snapshots are JSON, which cannot hold them. Returns the number removed.
fn drop_non_finite(table: &mut toml::Table) -> usize {
    fn keep(value: &mut toml::Value, dropped: &mut usize) -> bool {
        match value {
            toml::Value::Float(f) if !f.is_finite() => {
                *dropped += 1;
                false
            }
            toml::Value::Array(items) => {
                items.retain_mut(|item| keep(item, dropped));
                true
            }
            toml::Value::Table(table) => {
                *dropped += drop_non_finite(table);
                true
            }
            _ => true,
        }
    }

    let mut dropped = 0;
    let rejected = table
        .iter_mut()
        .filter_map(|(key, value)| (!keep(value, &mut dropped)).then(|| key.clone()))
        .collect::<Vec<_>>();
    for key in rejected {
        table.remove(&key);
    }
    dropped
}
