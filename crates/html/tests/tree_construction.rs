//! Tree-construction golden tests: parse an input, render the fixture tree
//! format, and compare line-for-line.

use html::dom::Namespace;
use html::{FragmentContext, ParseOptions, parse, parse_fragment};
use html_test_support::{TreeCase, diff_lines, parse_tree_cases};

const FIXTURES: &str = r##"
#case doctype-document
#input
<!doctype html><html><body><p>Hello</p></body></html>
#tree
<!DOCTYPE html>
<html>
  <head>
  <body>
    <p>
      "Hello"
#end

#case implicit-scaffolding
#input
<p>Hello
#tree
<html>
  <head>
  <body>
    <p>
      "Hello"
#end

#case table-cell-synthesis
#input
<table><td>x</table>
#tree
<html>
  <head>
  <body>
    <table>
      <tbody>
        <tr>
          <td>
            "x"
#end

#case formatting-across-paragraph
#input
<b>1<p>2</p>3</b>
#tree
<html>
  <head>
  <body>
    <b>
      "1"
    <p>
      <b>
        "2"
    <b>
      "3"
#end

#case svg-breakout
#input
<svg><g><b>hi</b></g></svg>
#tree
<html>
  <head>
  <body>
    <svg svg>
      <svg g>
    <b>
      "hi"
#end

#case named-entity-greed
#input
<p>&amp;&notin;</p>
#tree
<html>
  <head>
  <body>
    <p>
      "&∉"
#end

#case empty-input
#input
#tree
<html>
  <head>
  <body>
#end

#case text-only
#input
hi
#tree
<html>
  <head>
  <body>
    "hi"
#end

#case unterminated-comment
#input
<!--x
#tree
<!-- x -->
<html>
  <head>
  <body>
#end

#case unterminated-doctype
#input
<!doctype html
#tree
<!DOCTYPE html>
<html>
  <head>
  <body>
#end

#case cdata-outside-foreign-is-bogus
#input
<![CDATA[x]]>
#tree
<!-- [CDATA[x]] -->
<html>
  <head>
  <body>
#end

#case cdata-inside-svg-is-text
#input
<svg><![CDATA[x<y]]></svg>
#tree
<html>
  <head>
  <body>
    <svg svg>
      "x<y"
#end

#case end-br-synthesizes-br
#input
x</br>
#tree
<html>
  <head>
  <body>
    "x"
    <br>
#end

#case end-form-is-silent
#input
x</form>
#tree
<html>
  <head>
  <body>
    "x"
#end

#case table-fosters-text
#input
<table>x</table>
#tree
<html>
  <head>
  <body>
    "x"
    <table>
#end

#case paragraph-reopens-formatting
#input
<p><b><i></p>z
#tree
<html>
  <head>
  <body>
    <p>
      <b>
        <i>
    <b>
      <i>
        "z"
#end

#case c1-numeric-entity
#input
<p>&#x80;</p>
#tree
<html>
  <head>
  <body>
    <p>
      "€"
#end

#case li-implied-close
#input
<ul><li>a<li>b</ul>
#tree
<html>
  <head>
  <body>
    <ul>
      <li>
        "a"
      <li>
        "b"
#end

#case nested-list-keeps-outer-li
#input
<ul><li>a<ol><li>b</ol></ul>
#tree
<html>
  <head>
  <body>
    <ul>
      <li>
        "a"
        <ol>
          <li>
            "b"
#end

#case definition-list-implied-close
#input
<dl><dt>a<dd>b</dl>
#tree
<html>
  <head>
  <body>
    <dl>
      <dt>
        "a"
      <dd>
        "b"
#end

#case anchor-closes-open-anchor
#input
<a>1<a>2</a>
#tree
<html>
  <head>
  <body>
    <a>
      "1"
    <a>
      "2"
#end

#case anchor-reopens-inside-div
#input
<a>1<div>2</div>3</a>
#tree
<html>
  <head>
  <body>
    <a>
      "1"
    <div>
      <a>
        "2"
    "3"
#end

#case formatting-split-recovery
#input
<b><i>x</b>y
#tree
<html>
  <head>
  <body>
    <b>
      <i>
        "x"
    <i>
      "y"
#end

#case misnested-formatting-recovery
#input
<b>1<div>2</b>3</div>
#tree
<html>
  <head>
  <body>
    <b>
      "1"
    <div>
      <b>
        "2"
      "3"
#end

#case anchor-sprinkle-into-blocks
#input
<a>1<section>2<article>3</article></a>
#tree
<html>
  <head>
  <body>
    <a>
      "1"
    <section>
      <a>
        "2"
      <article>
        <a>
          "3"
#end

#case trailing-aside-hoist
#input
<b>x<aside>y</b>z
#tree
<html>
  <head>
  <body>
    <b>
      "x"
    <aside>
      <b>
        "y"
      "z"
#end

#case select-rewrites-children
#input
<select><option>a<option>b<hr><option>c</select>
#tree
<html>
  <head>
  <body>
    <select>
      <option>
        "a"
      <option>
        "b"
      <hr>
      <option>
        "c"
#end

#case nested-select-closes-outer
#input
<select><option>x<select>y
#tree
<html>
  <head>
  <body>
    <select>
      <option>
        "x"
    "y"
#end

#case input-escapes-select
#input
<select><option>a<input type=text>b</select>
#tree
<html>
  <head>
  <body>
    <select>
      <option>
        "a"
    <input>
      type="text"
    "b"
#end

#case head-routing-while-body-empty
#input
<title>T</title><p>x
#tree
<html>
  <head>
    <title>
      "T"
  <body>
    <p>
      "x"
#end

#case comments-before-and-after-body
#input
<!--a--><p>x</p></body><!--c-->
#tree
<!-- a -->
<html>
  <head>
  <body>
    <p>
      "x"
<!-- c -->
#end

#case processing-instruction-leads-document
#input
<p>x</p><?pi stuff>
#tree
<!-- ?pi stuff -->
<html>
  <head>
  <body>
    <p>
      "x"
#end

#case frameset-replaces-body
#input
<frameset><frame></frameset>
#tree
<html>
  <head>
  <frameset>
    <frame>
#end

#case frameset-ignored-after-content
#input
x<frameset></frameset>
#tree
<html>
  <head>
  <body>
    "x"
#end

#case nested-table-in-cell
#input
<table><td>1<table><td>2</table></table>
#tree
<html>
  <head>
  <body>
    <table>
      <tbody>
        <tr>
          <td>
            "1"
            <table>
              <tbody>
                <tr>
                  <td>
                    "2"
#end

#case table-keeps-form-and-hidden-input
#input
<table><form><input type=hidden><input type=text></table>
#tree
<html>
  <head>
  <body>
    <input>
      type="text"
    <table>
      <form>
      <input>
        type="hidden"
#end

#case colgroup-splits-text
#input
<table><colgroup>  x</table>
#tree
<html>
  <head>
  <body>
    "x"
    <table>
      <colgroup>
        "  "
#end

#case svg-integration-point-hosts-html
#input
<svg><foreignObject><p>x</p></foreignObject></svg>
#tree
<html>
  <head>
  <body>
    <svg svg>
      <svg foreignObject>
        <p>
          "x"
#end

#case mathml-integration-point-hosts-html
#input
<math><mi>x<b>y</b></mi></math>
#tree
<html>
  <head>
  <body>
    <math math>
      <math mi>
        "x"
        <b>
          "y"
#end

#case font-with-color-breaks-out
#input
<svg><font color=red>x</font></svg>
#tree
<html>
  <head>
  <body>
    <svg svg>
    <font>
      color="red"
      "x"
#end

#case plain-font-stays-foreign
#input
<svg><font>x</font></svg>
#tree
<html>
  <head>
  <body>
    <svg svg>
      <svg font>
        "x"
#end

#case nul-stripped-in-body-kept-in-script
#input
<p>a␀b</p><script>c␀d</script>
#tree
<html>
  <head>
  <body>
    <p>
      "ab"
    <script>
      "c�d"
#end

#case frameset-doctype-closes-p-on-table
#input
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN"><p>a<table></table>
#tree
<!DOCTYPE html "-//W3C//DTD XHTML 1.0 Frameset//EN" "">
<html>
  <head>
  <body>
    <p>
      "a"
    <table>
#end

#case standard-doctype-keeps-table-in-p
#input
<p>a<table></table>
#tree
<html>
  <head>
  <body>
    <p>
      "a"
      <table>
#end

#case pre-strips-leading-newline
#input
<pre>
x</pre>
#tree
<html>
  <head>
  <body>
    <pre>
      "x"
#end

#case whitespace-before-body-is-dropped
#input
<!doctype html>   <p>x
#tree
<!DOCTYPE html>
<html>
  <head>
  <body>
    <p>
      "x"
#end

#case fragment-default-div
#input
<li>x</li>
#fragment div
#tree
<li>
  "x"
#end

#case fragment-td-context
#input
a<b>c</b>
#fragment td
#tree
"a"
<b>
  "c"
#end

#case fragment-svg-context-parses-foreign
#input
<circle r="1"/>text
#fragment svg svg
#tree
<svg circle>
  r="1"
"text"
#end

#case fragment-svg-end-p-synthesizes-paragraph
#input
</p>
#fragment svg svg
#tree
<p>
#end

#case fragment-ignores-document-structure-tags
#input
<html><head><body><p>x
#fragment div
#tree
<p>
  "x"
#end

#case selectedcontent-mirrors-selected-option
#input
<select><button><selectedcontent></selectedcontent></button><option>a<option selected>b</select>
#tree
<html>
  <head>
  <body>
    <select>
      <button>
        <selectedcontent>
          "b"
      <option>
        "a"
      <option>
        selected=""
        "b"
#end

#case template-children-live-in-contents
#input
<template><p>x</p></template>
#tree
<html>
  <head>
    <template>
      <p>
        "x"
#end
"##;

fn run_case(case: &TreeCase) {
    let options = ParseOptions::default();
    // The fixture text cannot hold literal NUL bytes; ␀ stands in for one.
    let input = case.input.replace('␀', "\0");
    let parsed = match &case.fragment {
        None => parse(&input, &options),
        Some(context) => {
            let context = match context.split_once(' ') {
                Some(("svg", tag)) => FragmentContext::new(tag, Namespace::Svg),
                Some(("math", tag)) => FragmentContext::new(tag, Namespace::MathMl),
                _ => FragmentContext::new(context.as_str(), Namespace::Html),
            };
            parse_fragment(&input, context, &options)
        }
    }
    .unwrap_or_else(|error| panic!("case '{}' failed to parse: {error}", case.name));

    let actual = parsed.test_format();
    if let Some(report) = diff_lines(&case.expected, &actual) {
        panic!("case '{}' tree mismatch:\n{report}", case.name);
    }
}

#[test]
fn tree_construction_fixtures() {
    let cases = parse_tree_cases(FIXTURES);
    assert!(cases.len() > 40, "fixture block failed to parse");
    for case in &cases {
        run_case(case);
    }
}

#[test]
fn fixture_trees_are_invariant_under_reparse_of_roundtrip_html() {
    // Idempotence law for well-formed HTML-namespace documents.
    let inputs = [
        "<!doctype html><html><body><p>Hello</p></body></html>",
        "<div id=a class=\"b c\"><p>1</p><p>2</p></div>",
        "<ul><li>a</li><li>b</li></ul>",
        "<table><tbody><tr><td>x</td></tr></tbody></table>",
    ];
    let options = ParseOptions::default();
    for input in inputs {
        let first = parse(input, &options).unwrap();
        let html = first.to_html();
        let second = parse(&html, &options).unwrap();
        if let Some(report) = diff_lines(&first.test_format(), &second.test_format()) {
            panic!("round-trip changed the tree for {input:?}:\n{report}");
        }
    }
}
