//! Serialisers: round-trip HTML, text extraction, and the fixture tree
//! format used by tree-construction tests.

use crate::dom::{Dom, Namespace, NodeData, NodeId};
use crate::tag_tables::{is_raw_text_element, is_void_element};
use std::fmt::Write;

/// Round-trip HTML for the subtree rooted at `id` (the node itself when it
/// is an element; only children for document and fragment roots).
pub fn to_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    match dom.data(id) {
        NodeData::Document | NodeData::Fragment => {
            for &child in dom.children(id) {
                write_node(dom, child, &mut out);
            }
        }
        _ => write_node(dom, id, &mut out),
    }
    out
}

/// Concatenated text content of the subtree rooted at `id`.
pub fn to_text(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for node in dom.descendants(id) {
        if let Some(text) = dom.text(node) {
            out.push_str(text);
        }
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    match dom.data(id) {
        NodeData::Document | NodeData::Fragment => {
            for &child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        NodeData::Element { name, ns, attrs, .. } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            let raw = *ns == Namespace::Html && is_raw_text_element(name);
            for &child in dom.children(id) {
                if raw {
                    if let Some(text) = dom.text(child) {
                        out.push_str(text);
                    }
                } else {
                    write_node(dom, child, out);
                }
            }
            if *ns == Namespace::Html && is_void_element(name) {
                return;
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text { data } => escape_text(data, out),
        NodeData::Comment { data } => {
            out.push_str("<!--");
            out.push_str(data);
            out.push_str("-->");
        }
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            out.push_str("<!DOCTYPE");
            if let Some(name) = name {
                out.push(' ');
                out.push_str(name);
            }
            match (public_id, system_id) {
                (Some(public), system) if !public.is_empty() => {
                    out.push_str(" PUBLIC \"");
                    out.push_str(public);
                    out.push('"');
                    if let Some(system) = system
                        && !system.is_empty()
                    {
                        out.push_str(" \"");
                        out.push_str(system);
                        out.push('"');
                    }
                }
                (_, Some(system)) if !system.is_empty() => {
                    out.push_str(" SYSTEM \"");
                    out.push_str(system);
                    out.push('"');
                }
                _ => {}
            }
            out.push('>');
        }
    }
}

fn escape_text(data: &str, out: &mut String) {
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(data: &str, out: &mut String) {
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Fixture tree format: one line per node, two-space indent per depth,
/// attributes sorted by key on their own lines, adjacent text coalesced at
/// render time.
pub fn test_format(dom: &Dom) -> Vec<String> {
    let mut lines = Vec::new();
    render_children(dom, dom.root(), 0, &mut lines);
    lines
}

fn render_children(dom: &Dom, parent: NodeId, depth: usize, lines: &mut Vec<String>) {
    let children = dom.children(parent);
    let mut i = 0;
    while i < children.len() {
        let child = children[i];
        if let Some(text) = dom.text(child) {
            let mut data = text.to_string();
            while i + 1 < children.len()
                && let Some(next) = dom.text(children[i + 1])
            {
                data.push_str(next);
                i += 1;
            }
            lines.push(format!("{}\"{}\"", indent(depth), data));
            i += 1;
            continue;
        }
        render_node(dom, child, depth, lines);
        i += 1;
    }
}

fn render_node(dom: &Dom, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    match dom.data(id) {
        NodeData::Element { name, ns, attrs, .. } => {
            let qualified = qualified_name(name, *ns);
            lines.push(format!("{}<{}>", indent(depth), qualified));
            let mut sorted: Vec<(String, &str)> = attrs
                .iter()
                .map(|(key, value)| (test_attr_name(key, *ns), value.as_str()))
                .collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in sorted {
                lines.push(format!("{}{}=\"{}\"", indent(depth + 1), key, value));
            }
            render_children(dom, id, depth + 1, lines);
        }
        NodeData::Comment { data } => {
            lines.push(format!("{}<!-- {} -->", indent(depth), data));
        }
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            let name = name.as_deref().unwrap_or("");
            if public_id.is_some() || system_id.is_some() {
                lines.push(format!(
                    "{}<!DOCTYPE {} \"{}\" \"{}\">",
                    indent(depth),
                    name,
                    public_id.as_deref().unwrap_or(""),
                    system_id.as_deref().unwrap_or(""),
                ));
            } else if name.is_empty() {
                lines.push(format!("{}<!DOCTYPE >", indent(depth)));
            } else {
                lines.push(format!("{}<!DOCTYPE {}>", indent(depth), name));
            }
        }
        NodeData::Text { .. } => unreachable!("text handled by render_children"),
        NodeData::Document | NodeData::Fragment => {
            render_children(dom, id, depth, lines);
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn qualified_name(name: &str, ns: Namespace) -> String {
    match ns.test_prefix() {
        None => name.to_string(),
        Some(prefix) => {
            let local = if ns == Namespace::Svg {
                svg_adjusted_name(name)
            } else {
                name
            };
            format!("{prefix} {local}")
        }
    }
}

/// Attribute names in foreign content flatten `xml:lang` to `xml lang` and
/// `xlink:href` to `xlink href`.
fn test_attr_name(key: &str, ns: Namespace) -> String {
    if ns != Namespace::Html
        && let Some((prefix, local)) = key.split_once(':')
        && matches!(prefix, "xml" | "xlink" | "xmlns")
    {
        return format!("{prefix} {local}");
    }
    key.to_string()
}

/// SVG local names the tree format renders in camel case.
fn svg_adjusted_name(name: &str) -> &str {
    match name {
        "altglyph" => "altGlyph",
        "altglyphdef" => "altGlyphDef",
        "altglyphitem" => "altGlyphItem",
        "animatecolor" => "animateColor",
        "animatemotion" => "animateMotion",
        "animatetransform" => "animateTransform",
        "clippath" => "clipPath",
        "feblend" => "feBlend",
        "fecolormatrix" => "feColorMatrix",
        "fecomponenttransfer" => "feComponentTransfer",
        "fecomposite" => "feComposite",
        "feconvolvematrix" => "feConvolveMatrix",
        "fediffuselighting" => "feDiffuseLighting",
        "fedisplacementmap" => "feDisplacementMap",
        "fedistantlight" => "feDistantLight",
        "fedropshadow" => "feDropShadow",
        "feflood" => "feFlood",
        "fefunca" => "feFuncA",
        "fefuncb" => "feFuncB",
        "fefuncg" => "feFuncG",
        "fefuncr" => "feFuncR",
        "fegaussianblur" => "feGaussianBlur",
        "feimage" => "feImage",
        "femerge" => "feMerge",
        "femergenode" => "feMergeNode",
        "femorphology" => "feMorphology",
        "feoffset" => "feOffset",
        "fepointlight" => "fePointLight",
        "fespecularlighting" => "feSpecularLighting",
        "fespotlight" => "feSpotLight",
        "fetile" => "feTile",
        "feturbulence" => "feTurbulence",
        "foreignobject" => "foreignObject",
        "glyphref" => "glyphRef",
        "lineargradient" => "linearGradient",
        "radialgradient" => "radialGradient",
        "textpath" => "textPath",
        other => other,
    }
}

/// Render the test format as one newline-joined string; handy in asserts.
pub fn test_format_string(dom: &Dom) -> String {
    let mut out = String::new();
    for (i, line) in test_format(dom).iter().enumerate() {
        if i != 0 {
            out.push('\n');
        }
        let _ = write!(out, "{line}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Dom, Namespace};

    fn sample_dom() -> (Dom, NodeId) {
        let mut dom = Dom::new_document();
        let html = dom.create_element("html", Namespace::Html, Vec::new());
        dom.append(dom.root(), html);
        let body = dom.create_element("body", Namespace::Html, Vec::new());
        dom.append(html, body);
        (dom, body)
    }

    #[test]
    fn to_html_escapes_text_and_attributes() {
        let (mut dom, body) = sample_dom();
        let p = dom.create_element(
            "p",
            Namespace::Html,
            vec![("title".to_string(), "a\"b&c".to_string())],
        );
        dom.append(body, p);
        dom.append_text(p, "x < y & z");
        assert_eq!(
            to_html(&dom, p),
            "<p title=\"a&quot;b&amp;c\">x &lt; y &amp; z</p>"
        );
    }

    #[test]
    fn to_html_leaves_raw_text_content_verbatim() {
        let (mut dom, body) = sample_dom();
        let script = dom.create_element("script", Namespace::Html, Vec::new());
        dom.append(body, script);
        dom.append_text(script, "if (a < b && c > d) {}");
        assert_eq!(
            to_html(&dom, script),
            "<script>if (a < b && c > d) {}</script>"
        );
    }

    #[test]
    fn to_html_does_not_close_void_elements() {
        let (mut dom, body) = sample_dom();
        let br = dom.create_element("br", Namespace::Html, Vec::new());
        dom.append(body, br);
        dom.append_text(body, "x");
        assert_eq!(to_html(&dom, body), "<body><br>x</body>");
    }

    #[test]
    fn test_format_indents_and_sorts_attributes() {
        let (mut dom, body) = sample_dom();
        let p = dom.create_element(
            "p",
            Namespace::Html,
            vec![
                ("id".to_string(), "x".to_string()),
                ("class".to_string(), "y".to_string()),
            ],
        );
        dom.append(body, p);
        dom.append_text(p, "Hello");
        assert_eq!(
            test_format(&dom),
            vec![
                "<html>".to_string(),
                "  <body>".to_string(),
                "    <p>".to_string(),
                "      class=\"y\"".to_string(),
                "      id=\"x\"".to_string(),
                "      \"Hello\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_prefixes_foreign_elements_and_camel_cases_svg() {
        let (mut dom, body) = sample_dom();
        let svg = dom.create_element("svg", Namespace::Svg, Vec::new());
        dom.append(body, svg);
        let fo = dom.create_element(
            "foreignobject",
            Namespace::Svg,
            vec![("xlink:href".to_string(), "#a".to_string())],
        );
        dom.append(svg, fo);
        assert_eq!(
            test_format(&dom),
            vec![
                "<html>".to_string(),
                "  <body>".to_string(),
                "    <svg svg>".to_string(),
                "      <svg foreignObject>".to_string(),
                "        xlink href=\"#a\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_renders_doctype_variants() {
        let mut dom = Dom::new_document();
        let dt = dom.create_doctype(Some("html".to_string()), None, None);
        dom.append(dom.root(), dt);
        assert_eq!(test_format(&dom), vec!["<!DOCTYPE html>".to_string()]);

        let mut dom = Dom::new_document();
        let dt = dom.create_doctype(
            Some("html".to_string()),
            Some("pub".to_string()),
            Some("sys".to_string()),
        );
        dom.append(dom.root(), dt);
        assert_eq!(
            test_format(&dom),
            vec!["<!DOCTYPE html \"pub\" \"sys\">".to_string()]
        );
    }

    #[test]
    fn test_format_coalesces_adjacent_text_children() {
        let (mut dom, body) = sample_dom();
        let a = dom.create_text("a");
        dom.append(body, a);
        let br = dom.create_element("br", Namespace::Html, Vec::new());
        dom.append(body, br);
        let b = dom.create_text("b");
        dom.append(body, b);
        dom.remove(br);
        // body now has two adjacent text nodes; the renderer joins them.
        assert_eq!(
            test_format(&dom),
            vec![
                "<html>".to_string(),
                "  <body>".to_string(),
                "    \"ab\"".to_string(),
            ]
        );
    }

    #[test]
    fn to_text_concatenates_text_nodes() {
        let (mut dom, body) = sample_dom();
        let p = dom.create_element("p", Namespace::Html, Vec::new());
        dom.append(body, p);
        dom.append_text(p, "a");
        let em = dom.create_element("em", Namespace::Html, Vec::new());
        dom.append(p, em);
        dom.append_text(em, "b");
        dom.append_text(p, "c");
        assert_eq!(to_text(&dom, dom.root()), "abc");
    }
}
