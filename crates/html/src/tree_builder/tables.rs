//! Table insertion rules: foster parenting, section/row/cell synthesis, and
//! the select-subtree rewrites.

use super::stack::Scope;
use super::{InsertPos, TreeBuilder};
use crate::dom::{Namespace, NodeId};

impl TreeBuilder<'_> {
    /// True when start tags and text arriving at `parent` follow the
    /// table-internal insertion rules.
    pub(super) fn is_table_internal_parent(&self, parent: NodeId) -> bool {
        self.dom.element_ns(parent) == Some(Namespace::Html)
            && matches!(
                self.dom.element_name(parent),
                Some("table") | Some("tbody") | Some("thead") | Some("tfoot") | Some("tr")
                    | Some("colgroup")
            )
    }

    /// Nearest open `<table>` in the HTML namespace.
    pub(super) fn nearest_table(&self) -> Option<NodeId> {
        self.open.items()[1..]
            .iter()
            .rev()
            .map(|entry| entry.node)
            .find(|&node| self.dom.is_html_element_named(node, "table"))
    }

    /// Insert position immediately before the nearest open table, in the
    /// table's parent. Falls back to the current insertion point when no
    /// table is open (fragment contexts).
    pub(super) fn foster_pos(&self) -> InsertPos {
        if let Some(table) = self.nearest_table()
            && let Some(parent) = self.dom.parent(table)
        {
            return InsertPos {
                parent,
                before: Some(table),
            };
        }
        InsertPos::under(self.open.current())
    }

    /// Pop cells, rows, and sections that a new table-structure tag
    /// implicitly closes.
    pub(super) fn close_implied_table_structure(&mut self, name: &str) {
        match name {
            "td" | "th" => {
                if let Some(i) = self
                    .open
                    .find_any_in_scope(&self.dom, &["td", "th"], Scope::Table)
                {
                    self.open.pop_through(i);
                }
            }
            "tr" => {
                if let Some(i) = self.open.find_in_scope(&self.dom, "tr", Scope::Table) {
                    self.open.pop_through(i);
                }
            }
            "tbody" | "thead" | "tfoot" => {
                if let Some(i) = self.open.find_any_in_scope(
                    &self.dom,
                    &["tbody", "thead", "tfoot"],
                    Scope::Table,
                ) {
                    self.open.pop_through(i);
                }
            }
            "caption" | "colgroup" => {
                while self.open.len() > 1
                    && matches!(
                        self.dom.element_name(self.open.current()),
                        Some("td") | Some("th") | Some("tr") | Some("tbody") | Some("thead")
                            | Some("tfoot") | Some("caption") | Some("colgroup")
                    )
                {
                    self.open.pop();
                }
            }
            _ => {}
        }
    }

    pub(super) fn start_tag_in_table_context(
        &mut self,
        pos: usize,
        parent: NodeId,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) {
        let parent_name = self.dom.element_name(parent).unwrap_or_default().to_string();
        match parent_name.as_str() {
            "table" => match name {
                "caption" | "colgroup" | "tbody" | "thead" | "tfoot" => {
                    self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
                }
                "tr" => {
                    let tbody = self.synthesize_table_child(pos, parent, "tbody");
                    self.insert_element(pos, InsertPos::under(tbody), name, attrs, self_closing);
                }
                "td" | "th" => {
                    let tbody = self.synthesize_table_child(pos, parent, "tbody");
                    let tr = self.synthesize_table_child(pos, tbody, "tr");
                    self.insert_element(pos, InsertPos::under(tr), name, attrs, self_closing);
                }
                _ => self.table_exempt_or_foster(pos, parent, name, attrs, self_closing),
            },
            "tbody" | "thead" | "tfoot" => match name {
                "tr" => {
                    self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
                }
                "td" | "th" => {
                    let tr = self.synthesize_table_child(pos, parent, "tr");
                    self.insert_element(pos, InsertPos::under(tr), name, attrs, self_closing);
                }
                _ => self.table_exempt_or_foster(pos, parent, name, attrs, self_closing),
            },
            "tr" => match name {
                "td" | "th" => {
                    self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
                }
                _ => self.table_exempt_or_foster(pos, parent, name, attrs, self_closing),
            },
            "colgroup" => match name {
                "col" => {
                    self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
                }
                _ => {
                    // Anything else closes the colgroup and re-routes.
                    self.open.pop();
                    let outer = self.open.current();
                    if self.is_table_internal_parent(outer) {
                        self.start_tag_in_table_context(pos, outer, name, attrs, self_closing);
                    } else {
                        self.insert_element(
                            pos,
                            InsertPos::under(outer),
                            name,
                            attrs,
                            self_closing,
                        );
                    }
                }
            },
            _ => {
                self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
            }
        }
    }

    /// Form and hidden inputs append to the table itself; everything else
    /// foster-parents before it.
    fn table_exempt_or_foster(
        &mut self,
        pos: usize,
        parent: NodeId,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) {
        let table = self.nearest_table().unwrap_or(parent);
        match name {
            "form" => {
                // Appended but never opened, so it cannot capture content.
                let node = self.dom.create_element("form", Namespace::Html, attrs);
                self.dom.append(table, node);
                self.set_origin(node, pos);
            }
            "input"
                if attrs
                    .iter()
                    .any(|(k, v)| k == "type" && v.eq_ignore_ascii_case("hidden")) =>
            {
                self.insert_element(pos, InsertPos::under(table), name, attrs, self_closing);
            }
            _ => {
                log::debug!(target: "html.tree_builder", "foster parenting <{name}> out of the table");
                let at = self.foster_pos();
                self.insert_element(pos, at, name, attrs, self_closing);
            }
        }
    }

    fn synthesize_table_child(&mut self, pos: usize, parent: NodeId, name: &str) -> NodeId {
        let node = self.dom.create_element(name, Namespace::Html, Vec::new());
        self.dom.append(parent, node);
        self.set_origin(node, pos);
        self.open.push(node, pos);
        node
    }

    /// Text arriving while the insertion point is table-internal. Returns
    /// true when this function placed (or dropped) the text.
    pub(super) fn text_into_table_context(
        &mut self,
        pos: usize,
        parent: NodeId,
        data: &str,
        is_whitespace: bool,
    ) -> bool {
        if !self.is_table_internal_parent(parent) {
            return false;
        }
        if self.dom.is_html_element_named(parent, "colgroup") {
            // Leading whitespace stays; the remainder foster-parents.
            let split = data
                .find(|c: char| !c.is_ascii_whitespace())
                .unwrap_or(data.len());
            let (lead, rest) = data.split_at(split);
            if !lead.is_empty() {
                self.append_text_tracked(parent, lead, pos);
            }
            if !rest.is_empty() {
                self.foster_text(rest, pos);
            }
            return true;
        }
        if is_whitespace {
            self.append_text_tracked(parent, data, pos);
        } else {
            self.foster_text(data, pos);
        }
        true
    }

    fn foster_text(&mut self, data: &str, pos: usize) {
        let at = self.foster_pos();
        match at.before {
            Some(before) => {
                let node = self.dom.create_text(data);
                let placed = self.dom.insert_before(at.parent, before, node);
                if self.dom.origin(placed).is_none() {
                    self.set_origin(placed, pos);
                }
            }
            None => self.append_text_tracked(at.parent, data, pos),
        }
    }

    pub(super) fn append_text_tracked(&mut self, parent: NodeId, data: &str, pos: usize) {
        if let Some(node) = self.dom.append_text(parent, data)
            && self.dom.origin(node).is_none()
        {
            self.set_origin(node, pos);
        }
    }

    /// Start tags rewritten inside an open `<select>`.
    pub(super) fn start_tag_in_select(
        &mut self,
        pos: usize,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) {
        match name {
            "option" => {
                if self.dom.is_html_element_named(self.open.current(), "option") {
                    self.open.pop();
                }
                let parent = self.open.current();
                self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
            }
            "optgroup" => {
                if self.dom.is_html_element_named(self.open.current(), "option") {
                    self.open.pop();
                }
                if self.dom.is_html_element_named(self.open.current(), "optgroup") {
                    self.open.pop();
                }
                let parent = self.open.current();
                self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
            }
            "hr" => {
                while matches!(
                    self.dom.element_name(self.open.current()),
                    Some("option") | Some("optgroup")
                ) {
                    self.open.pop();
                }
                let parent = self.open.current();
                self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);
            }
            "select" => {
                // A nested select closes the enclosing one instead.
                if let Some(i) = self.open.find_in_scope(&self.dom, "select", Scope::Select) {
                    self.open.pop_through(i);
                }
            }
            "input" | "keygen" | "textarea" => {
                if let Some(i) = self.open.find_in_scope(&self.dom, "select", Scope::Select) {
                    self.open.pop_through(i);
                }
                self.process_html_start_tag(pos, name, attrs, self_closing);
            }
            _ => unreachable!("select rewrite covers a fixed tag set"),
        }
    }
}
