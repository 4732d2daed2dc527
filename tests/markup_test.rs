use std::sync::Arc;
use test_log::test;

use exograph::{
    codec::{
        block::MathBlockMatcher, Element, ElementKind, MarkupParser, SemanticLink, MARKUP,
    },
    ExoError,
};

mod common;

fn links(source: &str) -> Vec<SemanticLink> {
    MARKUP.parse_document("doc", source).semantic_links()
}

fn triples(source: &str) -> Vec<(String, String, String)> {
    links(source)
        .into_iter()
        .map(|l| (l.predicate, l.object, l.view))
        .collect()
}

fn triple(p: &str, o: &str, v: &str) -> (String, String, String) {
    (p.to_string(), o.to_string(), v.to_string())
}

fn find<'a>(root: &'a Element, type_name: &str) -> Vec<&'a Element> {
    root.iter().filter(|e| e.kind.type_name() == type_name).collect()
}

#[test]
fn internal_link_forms() {
    assert_eq!(triples("[[in|physics.flat]]"), vec![triple("in", "physics", "flat")]);
    assert_eq!(triples("[[physics]]"), vec![triple("ref", "physics", "")]);
    assert_eq!(triples("[[physics.flat]]"), vec![triple("ref", "physics", "flat")]);
    assert_eq!(
        triples("a [[x]] b [[is|y]] c"),
        vec![triple("ref", "x", ""), triple("is", "y", "")]
    );
}

#[test]
fn link_element_keeps_its_source_span() {
    let source = "Some text then [[in|physics]] here.";
    let found = links(source);
    let span = found[0].element.span.clone().unwrap();
    assert_eq!(&source[span], "[[in|physics]]");
}

#[test]
fn every_link_syntax_yields_a_semantic_link() {
    let source = "[[a]] {[b]}text{[/b]} [label]([embed|c.v])\n";
    assert_eq!(
        triples(source),
        vec![
            triple("ref", "a", ""),
            triple("format", "b", ""),
            triple("embed", "c", "v"),
        ]
    );
}

#[test]
fn format_link_wraps_parsed_text() {
    let doc = MARKUP.parse_document("doc", "{[physics]}see [[optics]]{[/physics]}");
    let found = doc.semantic_links();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].predicate, "format");
    assert_eq!(found[1].object, "optics");
    assert_eq!(found[0].element.children.len(), 2);
}

#[test]
fn mismatched_format_close_stays_text() {
    assert!(links("{[physics]}text{[/chemistry]}").is_empty());
}

fn format_link(source: &str) -> Element {
    let root = MARKUP.parse(source);
    let found = find(&root, "FormatLink");
    assert_eq!(found.len(), 1, "expected one format link in {source:?}");
    found[0].clone()
}

#[test]
fn format_link_body_may_hold_emphasis() {
    let source = "{[callout]}be **careful** here{[/callout]}";
    let link = format_link(source);
    assert_eq!(
        link.kind,
        ElementKind::FormatLink {
            object: "callout".to_string(),
            text: "be **careful** here".to_string(),
        }
    );
    assert_eq!(&source[link.span.clone().unwrap()], source);
    assert_eq!(find(&link, "Strong").len(), 1);

    let found = links(source);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].predicate, "format");
    assert_eq!(found[0].object, "callout");
}

#[test]
fn format_link_body_may_hold_code() {
    let link = format_link("Then {[tool]}run `cargo` now{[/tool]}.");
    assert!(matches!(
        &link.kind,
        ElementKind::FormatLink { object, .. } if object == "tool"
    ));
    assert_eq!(find(&link, "Code").len(), 1);
    assert_eq!(link.plain_text(), "run cargo now");
}

#[test]
fn format_link_body_may_hold_a_standard_link() {
    let source = "{[manual]}read [the docs](https://example.com) first{[/manual]} [[b]]";
    let link = format_link(source);
    assert_eq!(find(&link, "Link").len(), 1);
    assert_eq!(
        triples(source),
        vec![triple("format", "manual", ""), triple("ref", "b", "")]
    );
}

#[test]
fn links_inside_a_marked_up_format_body_are_collected() {
    assert_eq!(
        triples("{[physics]}*see* [[in|optics]] too{[/physics]}"),
        vec![triple("format", "physics", ""), triple("in", "optics", "")]
    );
    assert!(links("{[physics]}be **bold**{[/chemistry]}").is_empty());
}

#[test]
fn directive_body_dashes_are_not_front_matter() {
    let source = "# T\n\n.. note::\n   ---\n   see [[in|x]]\n   ---\n";
    let doc = MARKUP.parse_document("t", source);
    assert_eq!(triples(source), vec![triple("in", "x", "")]);
    assert!(doc.metadata.is_empty());
    assert!(find(&doc.root, "FrontMatter").is_empty());
}

#[test]
fn directive_with_option_and_body() {
    let root = MARKUP.parse(".. note:: \n   :key: val\n   body line\n");
    let directive = find(&root, "Directive");
    assert_eq!(directive.len(), 1);
    assert_eq!(
        directive[0].kind,
        ElementKind::Directive {
            directive_type: "note".to_string(),
            argument: None,
        }
    );
    assert_eq!(directive[0].children.len(), 2);
    assert_eq!(
        directive[0].children[0].kind,
        ElementKind::DirectiveOption {
            option: "key".to_string(),
            value: Some("val".to_string()),
        }
    );
    let content = &directive[0].children[1];
    assert_eq!(content.kind.type_name(), "DirectiveContent");
    assert!(content.plain_text().contains("body line"));
}

#[test]
fn option_after_content_is_content() {
    let root = MARKUP.parse(".. note::\n   body line\n   :key: val\n");
    let directive = find(&root, "Directive");
    assert!(find(directive[0], "DirectiveOption").is_empty());
    assert_eq!(
        directive[0].children[0].kind,
        ElementKind::DirectiveContent {
            content: "body line\n:key: val".to_string(),
        }
    );
}

#[test]
fn links_inside_directives_are_collected() {
    let source = ".. seealso:: related\n   Read [[in|physics]] first.\n\nAfter [[chemistry]].\n";
    assert_eq!(
        triples(source),
        vec![triple("in", "physics", ""), triple("ref", "chemistry", "")]
    );
}

#[test]
fn code_and_math_hide_link_syntax() {
    let source = "`[[a]]`\n\n```\n[[b]]\n```\n\n$[[c]]$ and\n\n$$\n[[d]]\n$$\n\n[[e]]\n";
    assert_eq!(triples(source), vec![triple("ref", "e", "")]);
}

#[test]
fn math_is_recognized_inline_and_as_blocks() {
    let root = MARKUP.parse("Energy $E = mc^2$ and $$\\int f$$ inline.\n\n$$\nx^2\n$$\n");
    assert_eq!(
        find(&root, "InlineMath")[0].kind,
        ElementKind::InlineMath {
            latex: "E = mc^2".to_string(),
        }
    );
    let blocks = find(&root, "BlockMath");
    assert_eq!(blocks.len(), 2);
}

#[test]
fn front_matter_sets_identity_and_title() {
    let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    let doc = MARKUP.parse_document(
        "doc",
        &format!("---\nuuid = \"{id}\"\ntitle = \"Declared\"\n---\n# Heading\n"),
    );
    assert_eq!(doc.uuid.unwrap().to_string(), id);
    assert_eq!(doc.title().as_deref(), Some("Declared"));
    assert_eq!(
        MARKUP.parse_document("doc", "# Heading\n").title().as_deref(),
        Some("Heading")
    );
}

#[test]
fn invalid_front_matter_is_tolerated() {
    let doc = MARKUP.parse_document("doc", "---\nnot toml at all [\n---\n[[a]]\n");
    assert!(doc.metadata.is_empty());
    assert_eq!(doc.semantic_links().len(), 1);
}

#[test]
fn plain_parser_only_sees_markdown() {
    let plain = MarkupParser::plain();
    assert!(plain.matcher_names().is_empty());
    assert!(plain.parse_document("doc", "[[a]] $x$").semantic_links().is_empty());
}

#[test]
fn matcher_names_are_unique() {
    let result = MarkupParser::builder()
        .with_builtins()
        .block(Arc::new(MathBlockMatcher));
    assert!(matches!(result, Err(ExoError::Invariant(_))));
}

#[test]
fn wiki_documents_declare_expected_links() {
    for (name, source) in common::WIKI {
        let doc = MARKUP.parse_document(name, source);
        let count = doc.semantic_links().len();
        let expected = match name {
            "science" => 1,
            "physics" => 3,
            "chemistry" => 1,
            "optics" => 4,
            "mechanics" => 1,
            _ => 0,
        };
        assert_eq!(count, expected, "{name}");
    }
}
