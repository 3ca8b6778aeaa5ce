use super::{FragmentContext, TreeBuilder};
use crate::dom::Namespace;
use crate::error::ErrorCode;
use crate::serialize::test_format_string;
use crate::tokenizer::Tokenizer;

fn build(input: &str) -> super::BuildOutput {
    TreeBuilder::new(Tokenizer::new(input), None, true, true).run()
}

fn build_fragment(input: &str, context: FragmentContext) -> super::BuildOutput {
    TreeBuilder::new(Tokenizer::new(input), Some(context), true, false).run()
}

fn tree(input: &str) -> String {
    test_format_string(&build(input).dom)
}

#[test]
fn builder_materializes_scaffolding_for_empty_input() {
    assert_eq!(tree(""), "<html>\n  <head>\n  <body>");
}

#[test]
fn builder_merges_duplicate_scaffold_attributes_first_write_wins() {
    let output = build("<html lang=a><head></head><body class=x></body><html lang=b><body class=y id=z>");
    let dom = &output.dom;
    let html = dom.children(dom.root())[0];
    assert_eq!(dom.attr(html, "lang"), Some("a"));
    let body = *dom.children(html).last().expect("body exists");
    assert_eq!(dom.attr(body, "class"), Some("x"));
    assert_eq!(dom.attr(body, "id"), Some("z"), "new keys still merge in");
}

#[test]
fn builder_reports_eof_for_unclosed_elements() {
    let output = build("<div><b>");
    let codes: Vec<_> = output.errors.iter().map(|e| e.code).collect();
    assert_eq!(
        codes,
        vec![
            ErrorCode::ExpectedClosingTagButGotEof,
            ErrorCode::ExpectedClosingTagButGotEof,
        ]
    );
    // Position order follows the open tags.
    assert!(output.errors[0].column < output.errors[1].column);
}

#[test]
fn builder_ignores_second_doctype() {
    assert_eq!(
        tree("<!doctype html><!doctype other><p>x"),
        "<!DOCTYPE html>\n<html>\n  <head>\n  <body>\n    <p>\n      \"x\""
    );
}

#[test]
fn builder_logs_unexpected_end_tags() {
    let output = build("<p>x</p></i>");
    assert!(
        output
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::UnexpectedEndTag),
        "expected an unexpected-end-tag record, got {:?}",
        output.errors
    );
}

#[test]
fn builder_pops_foreign_content_without_recovery() {
    // The </div> match sits below open foreign elements; everything above
    // pops with no formatting recovery.
    assert_eq!(
        tree("<div><svg><g></div>x"),
        "<html>\n  <head>\n  <body>\n    <div>\n      <svg svg>\n        <svg g>\n    \"x\""
    );
}

#[test]
fn builder_routes_head_tags_until_body_has_content() {
    assert_eq!(
        tree("<meta charset=x><p>y</p><link rel=z>"),
        "<html>\n  <head>\n    <meta>\n      charset=\"x\"\n  <body>\n    <p>\n      \"y\"\n    <link>\n      rel=\"z\""
    );
}

#[test]
fn builder_keeps_whitespace_after_body_content_exists() {
    assert_eq!(
        tree("<p>x</p> "),
        "<html>\n  <head>\n  <body>\n    <p>\n      \"x\"\n    \" \""
    );
}

#[test]
fn fragment_builder_uses_context_namespace() {
    let output = build_fragment("<path d=m0>", FragmentContext::new("svg", Namespace::Svg));
    assert_eq!(test_format_string(&output.dom), "<svg path>\n  d=\"m0\"");
}

#[test]
fn fragment_in_integration_point_context_parses_html() {
    let output = build_fragment(
        "<b>x</b>",
        FragmentContext::new("foreignObject", Namespace::Svg),
    );
    assert_eq!(test_format_string(&output.dom), "<b>\n  \"x\"");
}

#[test]
fn fragment_end_br_lands_at_the_root_of_foreign_contexts() {
    let output = build_fragment("</br>", FragmentContext::new("svg", Namespace::Svg));
    assert_eq!(test_format_string(&output.dom), "<br>");
}

#[test]
fn builder_trees_uphold_dom_invariants_on_hostile_inputs() {
    let samples = [
        "",
        "<",
        "</",
        "<>",
        "<p><p><p>",
        "</b></b></b>",
        "<b><i><u><s>x</b></i>y",
        "<table><table><td><td><tr><table>",
        "<svg><svg><math><mi><b><table>",
        "<select><select><option><optgroup><input>",
        "<a><a><div><a><address><a>",
        "<ul><li><ul><li></ul>x",
        "<template><template><p>",
        "<frameset><body><p>x",
        "<p>&#x0;&#xD800;&notin&amp",
        "<table><colgroup>x<col>y",
        "<b>1<aside>2</b>3</aside>",
        "\0\0<pre>\n\n</pre>",
    ];
    for input in samples {
        let output = build(input);
        output.dom.assert_tree_invariants();
    }
}
