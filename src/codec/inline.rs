//! Inline extension matchers and the pass that applies them to runs of plain text.
//!
//! The base engine hands over merged text runs (adjacent text and soft breaks of one inline
//! container). At every character that some matcher lists as a trigger, candidates are tried in
//! descending priority and the first one that matches wins; a matcher that does not match
//! simply declines and the text stays plain.

use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::VecDeque, ops::Range, sync::Arc};

use super::{
    element::{Element, ElementKind},
    link::split_triple,
    InlineMatch, InlineMatcher, PairedDelimiters,
};

static INTERNAL_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\[([^\[\]\n]+?)\]\]").expect("valid internal link pattern"));

static FORMAT_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\[ *([^\[\]\{\}/\n][^\[\]\{\}\n]*?) *\]\}").expect("valid format link pattern")
});

static FORMAT_CLOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\[ */ *([^\[\]\{\}\n]+?) *\]\}").expect("valid format link close pattern")
});

static INLINE_MATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([^$\n]+?)\$").expect("valid inline math pattern"));

static BLOCK_MATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\$([\s\S]+?)\$\$").expect("valid block math pattern"));

/// `[[ predicate | object.view ]]`; the pipe segment and the view suffix are optional.
#[derive(Debug, Default, Clone)]
pub struct InternalLinkMatcher;

impl InlineMatcher for InternalLinkMatcher {
    fn name(&self) -> &'static str {
        "internal_link"
    }

    fn priority(&self) -> i32 {
        5
    }

    fn triggers(&self) -> &'static [char] {
        &['[']
    }

    fn try_match(&self, text: &str) -> Option<InlineMatch> {
        let caps = INTERNAL_LINK_RE.captures(text)?;
        let whole = caps.get(0)?;
        let (predicate, object, view) = split_triple(caps.get(1)?.as_str());
        if object.is_empty() {
            return None;
        }
        Some(InlineMatch {
            len: whole.end(),
            kind: ElementKind::InternalLink {
                predicate,
                object,
                view,
            },
            inner: None,
        })
    }
}

/// `{[ object ]} text {[ /object ]}`. The closing tag must echo the opener's object, which is
/// checked structurally since the pattern language has no back-references.
#[derive(Debug, Default, Clone)]
pub struct FormatLinkMatcher;

impl InlineMatcher for FormatLinkMatcher {
    fn name(&self) -> &'static str {
        "format_link"
    }

    fn priority(&self) -> i32 {
        5
    }

    fn triggers(&self) -> &'static [char] {
        &['{']
    }

    fn try_match(&self, text: &str) -> Option<InlineMatch> {
        let (opener_end, object) = self.open(text)?;
        let close = self.close(&text[opener_end..], &object)?;
        let inner = opener_end..opener_end + close.start;
        Some(InlineMatch {
            len: opener_end + close.end,
            kind: self.wrap(object, text[inner.clone()].to_string()),
            inner: Some(inner),
        })
    }

    fn paired(&self) -> Option<&dyn PairedDelimiters> {
        Some(self)
    }
}

impl PairedDelimiters for FormatLinkMatcher {
    fn open(&self, text: &str) -> Option<(usize, String)> {
        let open = FORMAT_OPEN_RE.captures(text)?;
        Some((open.get(0)?.end(), open.get(1)?.as_str().trim().to_string()))
    }

    fn close(&self, text: &str, key: &str) -> Option<Range<usize>> {
        FORMAT_CLOSE_RE
            .captures_iter(text)
            .find(|caps| {
                caps.get(1)
                    .map(|id| id.as_str().trim() == key)
                    .unwrap_or(false)
            })?
            .get(0)
            .map(|m| m.range())
    }

    fn wrap(&self, key: String, body: String) -> ElementKind {
        ElementKind::FormatLink {
            object: key,
            text: body,
        }
    }
}

/// `$...$`, content kept verbatim.
#[derive(Debug, Default, Clone)]
pub struct InlineMathMatcher;

impl InlineMatcher for InlineMathMatcher {
    fn name(&self) -> &'static str {
        "inline_math"
    }

    fn priority(&self) -> i32 {
        7
    }

    fn triggers(&self) -> &'static [char] {
        &['$']
    }

    fn try_match(&self, text: &str) -> Option<InlineMatch> {
        let caps = INLINE_MATH_RE.captures(text)?;
        Some(InlineMatch {
            len: caps.get(0)?.end(),
            kind: ElementKind::InlineMath {
                latex: caps.get(1)?.as_str().to_string(),
            },
            inner: None,
        })
    }
}

/// `$$...$$` inside a text run, possibly spanning soft line breaks. Content kept verbatim.
#[derive(Debug, Default, Clone)]
pub struct InlineBlockMathMatcher;

impl InlineMatcher for InlineBlockMathMatcher {
    fn name(&self) -> &'static str {
        "inline_block_math"
    }

    fn priority(&self) -> i32 {
        8
    }

    fn triggers(&self) -> &'static [char] {
        &['$']
    }

    fn try_match(&self, text: &str) -> Option<InlineMatch> {
        let caps = BLOCK_MATH_RE.captures(text)?;
        Some(InlineMatch {
            len: caps.get(0)?.end(),
            kind: ElementKind::BlockMath {
                latex: caps.get(1)?.as_str().to_string(),
            },
            inner: None,
        })
    }
}

fn sub_span(base: &Option<Range<usize>>, exact: bool, range: Range<usize>) -> Option<Range<usize>> {
    match (base, exact) {
        (Some(base), true) => Some(base.start + range.start..base.start + range.end),
        (Some(base), false) => Some(base.clone()),
        (None, _) => None,
    }
}

/// Split `text` into plain text and extension elements. `matchers` must already be sorted by
/// descending priority.
///
/// `span` is the source range the text came from; `exact` says whether byte offsets inside
/// `text` line up with that range (false when the base engine unescaped or merged pieces), in
/// which case every produced element just inherits the whole span.
pub(crate) fn match_inline(
    matchers: &[Arc<dyn InlineMatcher>],
    text: &str,
    span: Option<Range<usize>>,
    exact: bool,
) -> Vec<Element> {
    let mut out = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        let found = matchers
            .iter()
            .filter(|m| m.triggers().contains(&c))
            .find_map(|m| m.try_match(&text[pos..]).filter(|found| found.len > 0));

        let Some(found) = found else {
            pos += c.len_utf8();
            continue;
        };

        if plain_start < pos {
            out.push(Element::text(
                &text[plain_start..pos],
                sub_span(&span, exact, plain_start..pos),
            ));
        }
        let children = match &found.inner {
            Some(inner) => {
                let absolute = pos + inner.start..pos + inner.end;
                match_inline(
                    matchers,
                    &text[absolute.clone()],
                    sub_span(&span, exact, absolute),
                    exact,
                )
            }
            None => Vec::new(),
        };
        out.push(
            Element::new(found.kind, sub_span(&span, exact, pos..pos + found.len))
                .with_children(children),
        );
        pos += found.len;
        plain_start = pos;
    }
    if plain_start < text.len() {
        out.push(Element::text(
            &text[plain_start..],
            sub_span(&span, exact, plain_start..text.len()),
        ));
    }
    out
}

/// An opener in one text child and the closer it pairs with in a later sibling.
struct Pair<'m> {
    delimiters: &'m dyn PairedDelimiters,
    key: String,
    /// Opener range within the opening text
    open: Range<usize>,
    /// Index of the closing text among the remaining siblings
    sibling: usize,
    /// Closer range within the closing text
    close: Range<usize>,
}

fn text_of(elem: &Element) -> Option<&str> {
    match &elem.kind {
        ElementKind::Text { text } => Some(text),
        _ => None,
    }
}

fn find_pair<'m>(
    matchers: &'m [Arc<dyn InlineMatcher>],
    text: &str,
    rest: &VecDeque<Element>,
) -> Option<Pair<'m>> {
    for (offset, c) in text.char_indices() {
        for matcher in matchers.iter().filter(|m| m.triggers().contains(&c)) {
            let Some(delimiters) = matcher.paired() else {
                continue;
            };
            let Some((len, key)) = delimiters.open(&text[offset..]) else {
                continue;
            };
            let closing = rest.iter().enumerate().find_map(|(i, sibling)| {
                text_of(sibling)
                    .and_then(|text| delimiters.close(text, &key))
                    .map(|close| (i, close))
            });
            if let Some((sibling, close)) = closing {
                return Some(Pair {
                    delimiters,
                    key,
                    open: offset..offset + len,
                    sibling,
                    close,
                });
            }
        }
    }
    None
}

/// Whether the text element's span covers exactly its text in `source`.
fn spans_own_text(elem: &Element, text: &str, source: &str, base: usize) -> bool {
    elem.span
        .as_ref()
        .and_then(|span| source.get(span.start.checked_sub(base)?..span.end.checked_sub(base)?))
        == Some(text)
}

fn piece(elem: &Element, text: &str, range: Range<usize>, exact: bool) -> Option<Element> {
    if range.is_empty() {
        return None;
    }
    let span = match (&elem.span, exact) {
        (Some(span), true) => Some(span.start + range.start..span.start + range.end),
        (span, _) => span.clone(),
    };
    Some(Element::text(&text[range], span))
}

/// Pair up paired constructs (format links) whose opener and closer sit in different text
/// children of one inline container, because emphasis, code or a standard link split the
/// text between them. The siblings in between become the construct's children.
///
/// `source` is the markdown segment that spans point into once `base` is subtracted.
pub(crate) fn pair_across_markup(
    matchers: &[Arc<dyn InlineMatcher>],
    children: Vec<Element>,
    source: &str,
    base: usize,
) -> Vec<Element> {
    let mut rest = VecDeque::from(children);
    let mut out = Vec::with_capacity(rest.len());
    while let Some(elem) = rest.pop_front() {
        let Some(text) = text_of(&elem).map(str::to_string) else {
            out.push(elem);
            continue;
        };
        let Some(pair) = find_pair(matchers, &text, &rest) else {
            out.push(elem);
            continue;
        };
        let middle = rest.drain(..pair.sibling).collect::<Vec<_>>();
        let Some(closer) = rest.pop_front() else {
            out.push(elem);
            out.extend(middle);
            continue;
        };
        let closer_text = text_of(&closer).unwrap_or_default().to_string();
        let open_exact = spans_own_text(&elem, &text, source, base);
        let close_exact = spans_own_text(&closer, &closer_text, source, base);

        out.extend(piece(&elem, &text, 0..pair.open.start, open_exact));
        let mut body = Vec::new();
        body.extend(piece(&elem, &text, pair.open.end..text.len(), open_exact));
        body.extend(middle);
        body.extend(piece(&closer, &closer_text, 0..pair.close.start, close_exact));

        let (span, body_text) = match (&elem.span, &closer.span) {
            (Some(first), Some(last)) => {
                let start = if open_exact { first.start + pair.open.start } else { first.start };
                let end = if close_exact { last.start + pair.close.end } else { last.end };
                let body_text = (open_exact && close_exact)
                    .then(|| {
                        source.get(
                            first.start + pair.open.end - base..last.start + pair.close.start - base,
                        )
                    })
                    .flatten()
                    .map(str::to_string);
                (Some(start..end), body_text)
            }
            _ => (None, None),
        };
        let body_text =
            body_text.unwrap_or_else(|| body.iter().map(Element::plain_text).collect::<String>());
        let body = pair_across_markup(matchers, body, source, base);
        out.push(
            Element::new(pair.delimiters.wrap(pair.key, body_text), span).with_children(body),
        );
        if let Some(after) = piece(
            &closer,
            &closer_text,
            pair.close.end..closer_text.len(),
            close_exact,
        ) {
            rest.push_front(after);
        }
    }
    out
}
