//! Public parse entry points and the parsed-document handle.
//!
//! A session wires decoder, tokenizer, and tree builder together, applies
//! the error policy (collect, drop, or strict-escalate), and exposes the
//! result behind [`Parsed`].

use crate::decode::decode_bytes;
use crate::dom::{Dom, NodeId};
use crate::error::{ParseError, ParseFailure, sort_by_position};
use crate::select::Selector;
use crate::serialize;
use crate::tokenizer::Tokenizer;
use crate::tree_builder::{FragmentContext, TreeBuilder};

#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Parse as a fragment with the default `<div>` HTML context.
    pub fragment: bool,
    /// Context element for fragment parsing; implies `fragment`.
    pub fragment_context: Option<FragmentContext>,
    /// Populate the error list; off means errors are discarded.
    pub collect_errors: bool,
    /// Implies `collect_errors`; the first error by source order aborts the
    /// parse.
    pub strict: bool,
    /// Populate `(offset, line, column)` on every created node.
    pub track_node_locations: bool,
    /// Transport-supplied encoding label, honored for byte input only.
    pub encoding: Option<String>,
    /// Reserved; conflicting values are rejected.
    pub sanitize: Option<bool>,
    /// Reserved alias of `sanitize`.
    pub safe: Option<bool>,
}

/// Result of a successful parse.
#[derive(Clone, Debug)]
pub struct Parsed {
    dom: Dom,
    errors: Vec<ParseError>,
    encoding: Option<&'static str>,
}

impl Parsed {
    pub fn root(&self) -> NodeId {
        self.dom.root()
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Errors sorted by `(line, column, emission order)`, unknown positions
    /// last. Empty unless `collect_errors` (or `strict`) was set.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Name of the encoding chosen by the decoder; `None` for string input.
    pub fn encoding(&self) -> Option<&'static str> {
        self.encoding
    }

    /// Elements matching a selector, in document order. An unparsable
    /// selector matches nothing.
    pub fn query(&self, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(parsed) => parsed.query(&self.dom, self.dom.root()),
            Err(error) => {
                log::debug!(target: "html.select", "query dropped: {error}");
                Vec::new()
            }
        }
    }

    pub fn query_one(&self, selector: &str) -> Option<NodeId> {
        self.query(selector).into_iter().next()
    }

    pub fn to_html(&self) -> String {
        serialize::to_html(&self.dom, self.dom.root())
    }

    pub fn to_text(&self) -> String {
        serialize::to_text(&self.dom, self.dom.root())
    }

    /// Fixture-format rendering of the tree, one line per node.
    pub fn test_format(&self) -> Vec<String> {
        serialize::test_format(&self.dom)
    }
}

/// Parse a complete document (or a fragment when the options say so).
pub fn parse(input: &str, options: &ParseOptions) -> Result<Parsed, ParseFailure> {
    let fragment = fragment_from_options(options);
    run(input, fragment, options, None)
}

/// Decode bytes first, then parse; `options.encoding` is the transport
/// label.
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Parsed, ParseFailure> {
    validate_options(options)?;
    let (text, encoding) = decode_bytes(bytes, options.encoding.as_deref());
    let fragment = fragment_from_options(options);
    run(&text, fragment, options, Some(encoding))
}

/// Parse a fragment with an explicit context element.
pub fn parse_fragment(
    input: &str,
    context: FragmentContext,
    options: &ParseOptions,
) -> Result<Parsed, ParseFailure> {
    run(input, Some(context), options, None)
}

fn fragment_from_options(options: &ParseOptions) -> Option<FragmentContext> {
    match &options.fragment_context {
        Some(context) => Some(context.clone()),
        None if options.fragment => Some(FragmentContext::default()),
        None => None,
    }
}

fn run(
    input: &str,
    fragment: Option<FragmentContext>,
    options: &ParseOptions,
    encoding: Option<&'static str>,
) -> Result<Parsed, ParseFailure> {
    validate_options(options)?;
    let collect = options.collect_errors || options.strict;
    let tokenizer = Tokenizer::new(input);
    let builder = TreeBuilder::new(tokenizer, fragment, collect, options.track_node_locations);
    let output = builder.run();
    let mut errors = output.errors;
    if !collect {
        errors.clear();
    }
    sort_by_position(&mut errors);
    if options.strict
        && let Some(first) = errors.first()
    {
        return Err(ParseFailure::Strict(first.clone()));
    }
    Ok(Parsed {
        dom: output.dom,
        errors,
        encoding,
    })
}

fn validate_options(options: &ParseOptions) -> Result<(), ParseFailure> {
    if let (Some(sanitize), Some(safe)) = (options.sanitize, options.safe)
        && sanitize != safe
    {
        return Err(ParseFailure::Options(
            "`sanitize` and `safe` were both set but disagree",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ParseFailure};

    #[test]
    fn parse_builds_scaffolding_for_bare_text() {
        let parsed = parse("<p>Hello", &ParseOptions::default()).unwrap();
        assert_eq!(
            parsed.test_format(),
            vec!["<html>", "  <head>", "  <body>", "    <p>", "      \"Hello\""]
        );
    }

    #[test]
    fn errors_are_dropped_without_collect_errors() {
        let parsed = parse("<!--x", &ParseOptions::default()).unwrap();
        assert!(parsed.errors().is_empty());
    }

    #[test]
    fn errors_are_sorted_by_position_when_collected() {
        let options = ParseOptions {
            collect_errors: true,
            ..ParseOptions::default()
        };
        let parsed = parse("<b>\n</i>\n<!--x", &options).unwrap();
        let errors = parsed.errors();
        assert!(errors.len() >= 2);
        let positions: Vec<_> = errors.iter().map(|e| (e.line, e.column)).collect();
        let mut sorted = positions.clone();
        sorted.sort_by_key(|&(line, column)| {
            (line.unwrap_or(u32::MAX), column.unwrap_or(u32::MAX))
        });
        assert_eq!(positions, sorted);
    }

    #[test]
    fn strict_mode_escalates_the_first_error() {
        let options = ParseOptions {
            strict: true,
            ..ParseOptions::default()
        };
        let result = parse("x</nope>", &options);
        let Err(ParseFailure::Strict(error)) = result else {
            panic!("expected a strict failure, got {result:?}");
        };
        assert_eq!(error.code, ErrorCode::UnexpectedEndTag);
    }

    #[test]
    fn strict_mode_passes_clean_documents() {
        let options = ParseOptions {
            strict: true,
            ..ParseOptions::default()
        };
        let parsed =
            parse("<!doctype html><html><body><p>ok</p></body></html>", &options).unwrap();
        assert!(parsed.errors().is_empty());
    }

    #[test]
    fn conflicting_sanitize_and_safe_are_rejected() {
        let options = ParseOptions {
            sanitize: Some(true),
            safe: Some(false),
            ..ParseOptions::default()
        };
        assert!(matches!(
            parse("<p>x</p>", &options),
            Err(ParseFailure::Options(_))
        ));
        // Agreeing values pass.
        let options = ParseOptions {
            sanitize: Some(true),
            safe: Some(true),
            ..ParseOptions::default()
        };
        assert!(parse("<p>x</p>", &options).is_ok());
    }

    #[test]
    fn parse_bytes_reports_the_chosen_encoding() {
        let parsed = parse_bytes(b"<p>caf\xE9</p>", &ParseOptions::default()).unwrap();
        assert_eq!(parsed.encoding(), Some("windows-1252"));
        assert_eq!(parsed.to_text(), "café");
    }

    #[test]
    fn fragment_option_defaults_to_div_context() {
        let options = ParseOptions {
            fragment: true,
            ..ParseOptions::default()
        };
        let parsed = parse("<li>x</li>", &options).unwrap();
        assert_eq!(parsed.test_format(), vec!["<li>", "  \"x\""]);
    }

    #[test]
    fn query_delegates_to_the_selector_subset() {
        let parsed = parse(
            "<div id=a><p class='x'>1</p><p>2</p></div>",
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(parsed.query("p").len(), 2);
        let one = parsed.query_one("#a > p.x").unwrap();
        assert_eq!(parsed.dom().element_name(one), Some("p"));
        assert!(parsed.query("???").is_empty());
    }

    #[test]
    fn track_node_locations_populates_origins() {
        let options = ParseOptions {
            track_node_locations: true,
            ..ParseOptions::default()
        };
        let parsed = parse("<p>x</p>", &options).unwrap();
        let p = parsed.query_one("p").unwrap();
        let origin = parsed.dom().origin(p).expect("tracked origin");
        assert_eq!(origin.offset, 0);
        assert_eq!((origin.line, origin.column), (1, 1));
    }
}
