//! Selector subset backing `query`/`query_one`.
//!
//! Supported: type selectors, `*`, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, descendant and child combinators, and comma-separated
//! groups. Matching walks the arena in document order. Deliberately not a
//! full Selectors engine.

use crate::dom::{Dom, Namespace, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Simple {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    AttrPresent(String),
    AttrEquals(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Compound {
    simples: Vec<Simple>,
}

/// One complex selector: a chain of compounds linked by combinators. The
/// combinator at index `i` relates `compounds[i]` (an ancestor constraint)
/// to `compounds[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Complex>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorParseError {
    pub message: String,
}

impl std::fmt::Display for SelectorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid selector: {}", self.message)
    }
}

impl std::error::Error for SelectorParseError {}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        let mut groups = Vec::new();
        for group in input.split(',') {
            groups.push(parse_complex(group.trim())?);
        }
        if groups.is_empty() {
            return Err(SelectorParseError {
                message: "empty selector".to_string(),
            });
        }
        Ok(Self { groups })
    }

    /// All elements under `root` matching the selector, in document order.
    pub fn query(&self, dom: &Dom, root: NodeId) -> Vec<NodeId> {
        dom.descendants(root)
            .filter(|&id| dom.is_element(id) && self.matches(dom, id))
            .collect()
    }

    pub fn query_one(&self, dom: &Dom, root: NodeId) -> Option<NodeId> {
        dom.descendants(root)
            .find(|&id| dom.is_element(id) && self.matches(dom, id))
    }

    pub fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        self.groups.iter().any(|complex| complex.matches(dom, id))
    }
}

impl Complex {
    fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        let last = self.compounds.len() - 1;
        if !self.compounds[last].matches(dom, id) {
            return false;
        }
        self.match_ancestors(dom, id, last)
    }

    /// Right-to-left: `compound_index` already matched at `id`; check the
    /// remaining chain against ancestors.
    fn match_ancestors(&self, dom: &Dom, id: NodeId, compound_index: usize) -> bool {
        if compound_index == 0 {
            return true;
        }
        let combinator = self.combinators[compound_index - 1];
        let target = &self.compounds[compound_index - 1];
        let mut ancestor = dom.parent(id);
        while let Some(candidate) = ancestor {
            if dom.is_element(candidate) && target.matches(dom, candidate) {
                if self.match_ancestors(dom, candidate, compound_index - 1) {
                    return true;
                }
            }
            if combinator == Combinator::Child {
                return false;
            }
            ancestor = dom.parent(candidate);
        }
        false
    }
}

impl Compound {
    fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        self.simples.iter().all(|simple| match simple {
            Simple::Universal => true,
            Simple::Type(name) => {
                dom.element_name(id) == Some(name.as_str())
                    && dom.element_ns(id) == Some(Namespace::Html)
            }
            Simple::Id(value) => dom.attr(id, "id") == Some(value.as_str()),
            Simple::Class(value) => dom
                .attr(id, "class")
                .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == value)),
            Simple::AttrPresent(name) => dom.attr(id, name).is_some(),
            Simple::AttrEquals(name, value) => dom.attr(id, name) == Some(value.as_str()),
        })
    }
}

fn parse_complex(input: &str) -> Result<Complex, SelectorParseError> {
    if input.is_empty() {
        return Err(SelectorParseError {
            message: "empty selector group".to_string(),
        });
    }
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut rest = input;
    loop {
        rest = rest.trim_start();
        let (compound, remaining) = parse_compound(rest)?;
        compounds.push(compound);
        rest = remaining.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix('>') {
            combinators.push(Combinator::Child);
            rest = after;
        } else {
            combinators.push(Combinator::Descendant);
        }
    }
    Ok(Complex {
        compounds,
        combinators,
    })
}

fn parse_compound(input: &str) -> Result<(Compound, &str), SelectorParseError> {
    let mut simples = Vec::new();
    let mut rest = input;
    loop {
        let Some(first) = rest.chars().next() else {
            break;
        };
        match first {
            '*' => {
                simples.push(Simple::Universal);
                rest = &rest[1..];
            }
            '#' => {
                let (ident, remaining) = take_identifier(&rest[1..]);
                require_ident(ident, "id selector")?;
                simples.push(Simple::Id(ident.to_string()));
                rest = remaining;
            }
            '.' => {
                let (ident, remaining) = take_identifier(&rest[1..]);
                require_ident(ident, "class selector")?;
                simples.push(Simple::Class(ident.to_string()));
                rest = remaining;
            }
            '[' => {
                let end = rest.find(']').ok_or_else(|| SelectorParseError {
                    message: "unterminated attribute selector".to_string(),
                })?;
                let body = &rest[1..end];
                match body.split_once('=') {
                    Some((name, value)) => {
                        let name = name.trim().to_ascii_lowercase();
                        require_ident(&name, "attribute selector")?;
                        let value = value.trim().trim_matches(['"', '\'']);
                        simples.push(Simple::AttrEquals(name, value.to_string()));
                    }
                    None => {
                        let name = body.trim().to_ascii_lowercase();
                        require_ident(&name, "attribute selector")?;
                        simples.push(Simple::AttrPresent(name));
                    }
                }
                rest = &rest[end + 1..];
            }
            c if c.is_ascii_alphabetic() => {
                let (ident, remaining) = take_identifier(rest);
                simples.push(Simple::Type(ident.to_ascii_lowercase()));
                rest = remaining;
            }
            _ => break,
        }
    }
    if simples.is_empty() {
        return Err(SelectorParseError {
            message: format!("expected a selector at {input:?}"),
        });
    }
    Ok((Compound { simples }, rest))
}

fn take_identifier(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(input.len());
    input.split_at(end)
}

fn require_ident(ident: &str, what: &str) -> Result<(), SelectorParseError> {
    if ident.is_empty() {
        return Err(SelectorParseError {
            message: format!("{what} needs a name"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Dom, Namespace};

    fn build() -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new_document();
        let html = dom.create_element("html", Namespace::Html, Vec::new());
        dom.append(dom.root(), html);
        let body = dom.create_element("body", Namespace::Html, Vec::new());
        dom.append(html, body);
        let div = dom.create_element(
            "div",
            Namespace::Html,
            vec![
                ("id".to_string(), "main".to_string()),
                ("class".to_string(), "outer box".to_string()),
            ],
        );
        dom.append(body, div);
        let p = dom.create_element(
            "p",
            Namespace::Html,
            vec![("data-x".to_string(), "1".to_string())],
        );
        dom.append(div, p);
        (dom, body, div, p)
    }

    #[test]
    fn type_id_and_class_selectors_match() {
        let (dom, _, div, p) = build();
        let sel = Selector::parse("div").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![div]);
        let sel = Selector::parse("#main").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![div]);
        let sel = Selector::parse(".box").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![div]);
        let sel = Selector::parse("p").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![p]);
    }

    #[test]
    fn attribute_selectors_match_presence_and_value() {
        let (dom, _, _, p) = build();
        let sel = Selector::parse("[data-x]").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![p]);
        let sel = Selector::parse("p[data-x=1]").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![p]);
        let sel = Selector::parse("p[data-x=2]").unwrap();
        assert!(sel.query(&dom, dom.root()).is_empty());
    }

    #[test]
    fn combinators_respect_structure() {
        let (dom, body, div, p) = build();
        let _ = body;
        let sel = Selector::parse("div p").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![p]);
        let sel = Selector::parse("body > div").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![div]);
        let sel = Selector::parse("body > p").unwrap();
        assert!(sel.query(&dom, dom.root()).is_empty());
        let sel = Selector::parse("html p").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![p]);
    }

    #[test]
    fn groups_union_in_document_order() {
        let (dom, _, div, p) = build();
        let sel = Selector::parse("p, div").unwrap();
        assert_eq!(sel.query(&dom, dom.root()), vec![div, p]);
    }

    #[test]
    fn parse_rejects_malformed_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("#").is_err());
        assert!(Selector::parse("[unclosed").is_err());
        assert!(Selector::parse("div,, p").is_err());
    }
}
