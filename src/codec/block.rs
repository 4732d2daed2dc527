//! Block extension matchers: directive blocks and display math regions.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    element::{Element, ElementKind},
    line_end, BlockMatch, BlockMatcher, MarkupParser,
};

static DIRECTIVE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.\. ([\w\s]*?)::([\w\s]*)$").expect("valid directive header pattern")
});

static DIRECTIVE_OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {3}:([\w\-]+):(.*)$").expect("valid directive option pattern"));

/// Directive bodies are indented by exactly this prefix.
const DIRECTIVE_INDENT: &str = "   ";

const ANONYMOUS_DIRECTIVE: &str = "anon";

fn line_text(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// ```text
/// .. type:: argument
///    :option: value
///    content line
/// ```
///
/// Options are only recognized before the first content line. Blank lines are consumed. The
/// block ends at the first line that is neither blank, an option (while options are still
/// accepted) nor indented content.
#[derive(Debug, Default, Clone)]
pub struct DirectiveMatcher;

impl BlockMatcher for DirectiveMatcher {
    fn name(&self) -> &'static str {
        "directive"
    }

    fn priority(&self) -> i32 {
        9
    }

    fn try_match(
        &self,
        source: &str,
        line_start: usize,
        parser: &MarkupParser,
    ) -> Option<BlockMatch> {
        let header_end = line_end(source, line_start);
        let header = DIRECTIVE_HEADER_RE.captures(line_text(&source[line_start..header_end]))?;
        let directive_type = match header.get(1)?.as_str().trim() {
            "" => ANONYMOUS_DIRECTIVE.to_string(),
            name => name.to_string(),
        };
        let argument = Some(header.get(2)?.as_str().trim())
            .filter(|arg| !arg.is_empty())
            .map(str::to_string);

        let mut children = Vec::new();
        let mut accepting_options = true;
        let mut content_lines: Vec<&str> = Vec::new();
        let mut content_span: Option<(usize, usize)> = None;
        let mut pos = header_end;
        while pos < source.len() {
            let next = line_end(source, pos);
            let line = line_text(&source[pos..next]);
            if line.trim().is_empty() {
                if !content_lines.is_empty() {
                    content_lines.push("");
                }
            } else if let Some(option) = DIRECTIVE_OPTION_RE
                .captures(line)
                .filter(|_| accepting_options)
            {
                let value = option
                    .get(2)
                    .map(|v| v.as_str().trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                children.push(Element::new(
                    ElementKind::DirectiveOption {
                        option: option
                            .get(1)
                            .map(|o| o.as_str().to_string())
                            .unwrap_or_default(),
                        value,
                    },
                    Some(pos..pos + line.len()),
                ));
            } else if let Some(content) = line.strip_prefix(DIRECTIVE_INDENT) {
                accepting_options = false;
                content_lines.push(content);
                let start = content_span.map(|(start, _)| start).unwrap_or(pos);
                content_span = Some((start, pos + line.len()));
            } else {
                break;
            }
            pos = next;
        }

        while content_lines.last() == Some(&"") {
            content_lines.pop();
        }
        if !content_lines.is_empty() {
            let content = content_lines.join("\n");
            let mut body = parser.parse_blocks(&content, false);
            for elem in body.iter_mut() {
                elem.clear_spans();
            }
            children.push(
                Element::new(
                    ElementKind::DirectiveContent { content },
                    content_span.map(|(start, end)| start..end),
                )
                .with_children(body),
            );
        }

        Some(BlockMatch {
            end: pos,
            element: Element::new(
                ElementKind::Directive {
                    directive_type,
                    argument,
                },
                Some(line_start..pos),
            )
            .with_children(children),
        })
    }
}

/// `$$` at the start of a line through the next `$$` that ends its line. The content is kept
/// verbatim and may span any number of lines.
#[derive(Debug, Default, Clone)]
pub struct MathBlockMatcher;

impl BlockMatcher for MathBlockMatcher {
    fn name(&self) -> &'static str {
        "block_math"
    }

    fn priority(&self) -> i32 {
        8
    }

    fn try_match(
        &self,
        source: &str,
        line_start: usize,
        _parser: &MarkupParser,
    ) -> Option<BlockMatch> {
        let body_start = line_start + 2;
        if !source[line_start..].starts_with("$$") {
            return None;
        }
        let close = body_start + source[body_start..].find("$$")?;
        let end = line_end(source, close);
        if !source[close + 2..end].trim().is_empty() {
            return None;
        }
        Some(BlockMatch {
            end,
            element: Element::new(
                ElementKind::BlockMath {
                    latex: source[body_start..close].to_string(),
                },
                Some(line_start..end),
            ),
        })
    }
}
