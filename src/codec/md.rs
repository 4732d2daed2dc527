//! Base markdown pass: pulldown-cmark events folded into an [`Element`] tree.

use pulldown_cmark::{
    CodeBlockKind, Event as MdEvent, Options, Parser as MdParser, Tag as MdTag,
};
use std::ops::Range;

use super::{
    element::{Element, ElementKind},
    inline::{match_inline, pair_across_markup},
    MarkupParser,
};

pub use pulldown_cmark;

/// Markdown dialect handed to pulldown-cmark. Front matter is only recognized at the very
/// start of a document, never in a segment that follows a block extension.
pub fn exo_md_options(front_matter: bool) -> Options {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    if front_matter {
        md_options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    }
    md_options
}

/// Parse one segment of markdown whose first byte sits at `base` in the full source.
/// `front_matter` allows a leading metadata block when the segment opens the source.
pub(crate) fn parse_markdown(
    parser: &MarkupParser,
    text: &str,
    base: usize,
    front_matter: bool,
) -> Vec<Element> {
    let mut builder = TreeBuilder {
        parser,
        source: text,
        base,
        stack: vec![Element::new(ElementKind::Document, None)],
        pending: None,
    };
    let options = exo_md_options(front_matter && base == 0);
    for (event, range) in MdParser::new_ext(text, options).into_offset_iter() {
        builder.push(event, range);
    }
    builder.finish()
}

struct TreeBuilder<'a> {
    parser: &'a MarkupParser,
    source: &'a str,
    base: usize,
    /// Open containers; the bottom entry collects the segment's top level blocks.
    stack: Vec<Element>,
    /// Text (and soft breaks) not yet handed to the inline matchers, with its local range.
    pending: Option<(String, Range<usize>)>,
}

impl TreeBuilder<'_> {
    fn span(&self, range: &Range<usize>) -> Option<Range<usize>> {
        Some(self.base + range.start..self.base + range.end)
    }

    fn top(&mut self) -> &mut Element {
        // The bottom container is never popped.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn in_verbatim(&self) -> bool {
        self.stack
            .last()
            .map(|e| e.kind.is_verbatim())
            .unwrap_or(false)
    }

    fn buffer(&mut self, text: &str, range: Range<usize>) {
        match self.pending.as_mut() {
            Some((buffer, pending_range)) => {
                buffer.push_str(text);
                pending_range.end = range.end;
            }
            None => self.pending = Some((text.to_string(), range)),
        }
    }

    fn flush(&mut self) {
        let Some((text, range)) = self.pending.take() else {
            return;
        };
        let exact = self.source.get(range.clone()) == Some(text.as_str());
        let span = self.span(&range);
        let elements = match_inline(self.parser.inline_matchers(), &text, span, exact);
        self.top().children.extend(elements);
    }

    fn leaf(&mut self, kind: ElementKind, range: &Range<usize>) {
        self.flush();
        let span = self.span(range);
        self.top().children.push(Element::new(kind, span));
    }

    fn open(&mut self, tag: MdTag<'_>, range: &Range<usize>) {
        self.flush();
        let kind = match tag {
            MdTag::Paragraph => ElementKind::Paragraph,
            MdTag::Heading { level, .. } => ElementKind::Heading { level: level as u8 },
            MdTag::BlockQuote(_) => ElementKind::BlockQuote,
            MdTag::CodeBlock(kind) => ElementKind::CodeBlock {
                info: match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                },
                code: String::new(),
            },
            MdTag::HtmlBlock => ElementKind::HtmlBlock {
                html: String::new(),
            },
            MdTag::List(start) => ElementKind::List { start },
            MdTag::Item => ElementKind::Item,
            MdTag::FootnoteDefinition(label) => ElementKind::FootnoteDefinition {
                label: label.to_string(),
            },
            MdTag::Table(_) => ElementKind::Table,
            MdTag::TableHead => ElementKind::TableHead,
            MdTag::TableRow => ElementKind::TableRow,
            MdTag::TableCell => ElementKind::TableCell,
            MdTag::Emphasis => ElementKind::Emphasis,
            MdTag::Strong => ElementKind::Strong,
            MdTag::Strikethrough => ElementKind::Strikethrough,
            MdTag::Link {
                dest_url, title, ..
            } => self
                .parser
                .link_matchers()
                .iter()
                .find_map(|m| m.try_match(&dest_url))
                .unwrap_or_else(|| ElementKind::Link {
                    dest: dest_url.to_string(),
                    title: title.to_string(),
                }),
            MdTag::Image {
                dest_url, title, ..
            } => ElementKind::Image {
                dest: dest_url.to_string(),
                title: title.to_string(),
            },
            MdTag::MetadataBlock(_) => ElementKind::FrontMatter {
                source: String::new(),
            },
            other => ElementKind::Container {
                name: format!("{other:?}"),
            },
        };
        let span = self.span(range);
        self.stack.push(Element::new(kind, span));
    }

    fn close(&mut self) {
        self.flush();
        if self.stack.len() < 2 {
            tracing::warn!("unbalanced markdown end event ignored");
            return;
        }
        if let Some(mut elem) = self.stack.pop() {
            let children = std::mem::take(&mut elem.children);
            elem.children =
                pair_across_markup(self.parser.inline_matchers(), children, self.source, self.base);
            self.top().children.push(elem);
        }
    }

    fn verbatim(&mut self, text: &str) {
        match &mut self.top().kind {
            ElementKind::CodeBlock { code, .. } => code.push_str(text),
            ElementKind::HtmlBlock { html } => html.push_str(text),
            ElementKind::FrontMatter { source } => source.push_str(text),
            _ => {}
        }
    }

    fn push(&mut self, event: MdEvent<'_>, range: Range<usize>) {
        match event {
            MdEvent::Start(tag) => self.open(tag, &range),
            MdEvent::End(_) => self.close(),
            MdEvent::Text(text) if self.in_verbatim() => self.verbatim(&text),
            MdEvent::Html(html) if self.in_verbatim() => self.verbatim(&html),
            MdEvent::Text(text) => self.buffer(&text, range),
            MdEvent::SoftBreak => self.buffer("\n", range),
            MdEvent::HardBreak => self.leaf(ElementKind::HardBreak, &range),
            MdEvent::Code(code) => self.leaf(
                ElementKind::Code {
                    code: code.to_string(),
                },
                &range,
            ),
            MdEvent::Html(html) | MdEvent::InlineHtml(html) => self.leaf(
                ElementKind::Html {
                    html: html.to_string(),
                },
                &range,
            ),
            MdEvent::InlineMath(latex) => self.leaf(
                ElementKind::InlineMath {
                    latex: latex.to_string(),
                },
                &range,
            ),
            MdEvent::DisplayMath(latex) => self.leaf(
                ElementKind::BlockMath {
                    latex: latex.to_string(),
                },
                &range,
            ),
            MdEvent::FootnoteReference(label) => self.leaf(
                ElementKind::FootnoteReference {
                    label: label.to_string(),
                },
                &range,
            ),
            MdEvent::Rule => self.leaf(ElementKind::ThematicBreak, &range),
            MdEvent::TaskListMarker(checked) => {
                self.leaf(ElementKind::TaskMarker { checked }, &range)
            }
        }
    }

    fn finish(mut self) -> Vec<Element> {
        self.flush();
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .map(|root| root.children)
            .unwrap_or_default()
    }
}
