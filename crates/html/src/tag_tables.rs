//! Frozen tag-classification sets.
//!
//! All classifiers take canonical lowercase names (the tokenizer lowercases
//! tag and attribute names at emission). These sets are initialization-free
//! read-only data; nothing mutates them at runtime.

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is consumed as raw text until the matching close tag.
pub(crate) fn is_raw_text_element(name: &str) -> bool {
    matches!(
        name,
        "script"
            | "style"
            | "xmp"
            | "iframe"
            | "noembed"
            | "noframes"
            | "plaintext"
            | "textarea"
            | "title"
    )
}

/// Raw-text elements whose content still gets character references decoded.
pub(crate) fn is_rcdata_element(name: &str) -> bool {
    matches!(name, "textarea" | "title")
}

pub(crate) fn is_formatting_element(name: &str) -> bool {
    matches!(
        name,
        "a" | "b"
            | "big"
            | "code"
            | "em"
            | "font"
            | "i"
            | "nobr"
            | "s"
            | "small"
            | "strike"
            | "strong"
            | "tt"
            | "u"
    )
}

fn is_heading(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() == 2 && b[0] == b'h' && (b'1'..=b'6').contains(&b[1])
}

/// Block-level tags whose start tag closes an open `<p>`.
pub(crate) fn closes_p(name: &str) -> bool {
    is_heading(name)
        || matches!(
            name,
            "address"
                | "article"
                | "aside"
                | "blockquote"
                | "center"
                | "details"
                | "dialog"
                | "dir"
                | "div"
                | "dl"
                | "fieldset"
                | "figcaption"
                | "figure"
                | "footer"
                | "form"
                | "hgroup"
                | "header"
                | "hr"
                | "listing"
                | "main"
                | "menu"
                | "nav"
                | "ol"
                | "p"
                | "pre"
                | "section"
                | "search"
                | "summary"
                | "ul"
        )
}

/// Tags that return parsing to the HTML namespace from inside SVG or MathML.
pub(crate) fn is_foreign_breakout(name: &str) -> bool {
    is_heading(name)
        || matches!(
            name,
            "b" | "big"
                | "blockquote"
                | "body"
                | "br"
                | "center"
                | "code"
                | "dd"
                | "div"
                | "dl"
                | "dt"
                | "em"
                | "embed"
                | "head"
                | "hr"
                | "i"
                | "img"
                | "li"
                | "listing"
                | "menu"
                | "meta"
                | "nobr"
                | "ol"
                | "p"
                | "pre"
                | "ruby"
                | "s"
                | "small"
                | "span"
                | "strong"
                | "strike"
                | "sub"
                | "sup"
                | "table"
                | "tt"
                | "u"
                | "ul"
                | "var"
        )
}

pub(crate) fn is_head_tag(name: &str) -> bool {
    matches!(
        name,
        "base" | "link" | "meta" | "noscript" | "script" | "style" | "template" | "title"
    )
}

/// End tags that only match open elements in the HTML namespace.
pub(crate) fn is_table_scoped_end_tag(name: &str) -> bool {
    matches!(
        name,
        "table" | "tbody" | "thead" | "tfoot" | "tr" | "td" | "th" | "caption" | "colgroup"
    )
}

/// SVG elements inside which HTML-namespace parsing resumes.
pub(crate) fn is_svg_integration_point(name: &str) -> bool {
    matches!(name, "foreignobject" | "desc" | "title")
}

/// MathML elements inside which HTML-namespace parsing resumes.
pub(crate) fn is_mathml_integration_point(name: &str) -> bool {
    matches!(name, "mi" | "mo" | "mn" | "ms" | "mtext")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_classify_as_p_closers_and_breakouts() {
        for name in ["h1", "h2", "h3", "h4", "h5", "h6"] {
            assert!(closes_p(name), "{name} should close an open p");
            assert!(is_foreign_breakout(name), "{name} should break out");
        }
        assert!(!closes_p("h7"));
        assert!(!is_foreign_breakout("h0"));
    }

    #[test]
    fn formatting_and_void_sets_are_disjoint() {
        for name in [
            "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong",
            "tt", "u",
        ] {
            assert!(is_formatting_element(name));
            assert!(!is_void_element(name));
        }
    }

    #[test]
    fn rcdata_is_a_subset_of_raw_text() {
        for name in ["textarea", "title"] {
            assert!(is_rcdata_element(name));
            assert!(is_raw_text_element(name));
        }
        assert!(!is_rcdata_element("script"));
    }
}
