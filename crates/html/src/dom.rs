//! Arena document tree.
//!
//! All nodes of one parse live in a single [`Dom`] arena and are addressed by
//! [`NodeId`] handles; `parent`/`children` are handle fields, so reparenting
//! is pointer swaps and deep cloning is an arena copy. Parent links are
//! non-owning back-references.
//!
//! Invariants maintained by the mutation methods:
//! - `parent(c) == Some(p)` iff `c` is in `children(p)`, where `children` of
//!   an HTML-namespace `<template>` transparently reads its shadow contents.
//! - No empty text node is ever attached; appending or inserting text next to
//!   a text sibling merges by concatenation (inserting between two text
//!   siblings collapses all three into one node).
//! - Element names and attribute keys are ASCII-lowercased at construction;
//!   duplicate attribute keys are dropped after the first occurrence.
//! - Document and fragment nodes only ever appear as roots.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    /// Prefix used by the fixture tree format; `None` for HTML.
    pub fn test_prefix(self) -> Option<&'static str> {
        match self {
            Namespace::Html => None,
            Namespace::Svg => Some("svg"),
            Namespace::MathMl => Some("math"),
        }
    }
}

/// Source origin of a node, populated when location tracking is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug)]
pub enum NodeData {
    Document,
    Fragment,
    Element {
        name: String,
        ns: Namespace,
        attrs: Vec<(String, String)>,
        /// Shadow child container; `Some` only for HTML-namespace templates.
        template_contents: Option<NodeId>,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
    Doctype {
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

#[derive(Clone, Debug)]
struct NodeSlot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
    origin: Option<Origin>,
}

#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<NodeSlot>,
    root: NodeId,
}

impl Dom {
    pub fn new_document() -> Self {
        Self::with_root(NodeData::Document)
    }

    pub fn new_fragment() -> Self {
        Self::with_root(NodeData::Fragment)
    }

    fn with_root(data: NodeData) -> Self {
        let mut dom = Self {
            nodes: Vec::with_capacity(16),
            root: NodeId(0),
        };
        dom.root = dom.alloc(data);
        dom
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(NodeSlot {
            parent: None,
            children: Vec::new(),
            data,
            origin: None,
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn origin(&self, id: NodeId) -> Option<Origin> {
        self.nodes[id.index()].origin
    }

    pub(crate) fn set_origin(&mut self, id: NodeId, origin: Origin) {
        self.nodes[id.index()].origin = Some(origin);
    }

    /// Children of `id`, reading through the template shadow container.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[self.content_holder(id).index()].children
    }

    /// The node whose child list `id` presents: the shadow fragment for an
    /// HTML template, `id` itself otherwise.
    fn content_holder(&self, id: NodeId) -> NodeId {
        match &self.nodes[id.index()].data {
            NodeData::Element {
                template_contents: Some(contents),
                ..
            } => *contents,
            _ => id,
        }
    }

    pub fn template_contents(&self, id: NodeId) -> Option<NodeId> {
        match &self.nodes[id.index()].data {
            NodeData::Element {
                template_contents, ..
            } => *template_contents,
            _ => None,
        }
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Semantic name: tag for elements, `#document`, `#document-fragment`,
    /// `#text`, `#comment`, or `!doctype`.
    pub fn name(&self, id: NodeId) -> &str {
        match &self.nodes[id.index()].data {
            NodeData::Document => "#document",
            NodeData::Fragment => "#document-fragment",
            NodeData::Element { name, .. } => name,
            NodeData::Text { .. } => "#text",
            NodeData::Comment { .. } => "#comment",
            NodeData::Doctype { .. } => "!doctype",
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].data, NodeData::Element { .. })
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn element_ns(&self, id: NodeId) -> Option<Namespace> {
        match &self.nodes[id.index()].data {
            NodeData::Element { ns, .. } => Some(*ns),
            _ => None,
        }
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.element_name(id) == Some(name)
    }

    pub fn is_html_element_named(&self, id: NodeId, name: &str) -> bool {
        self.element_name(id) == Some(name) && self.element_ns(id) == Some(Namespace::Html)
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id.index()].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.index()].data {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].data {
            NodeData::Text { data } => Some(data),
            _ => None,
        }
    }

    pub fn comment_text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].data {
            NodeData::Comment { data } => Some(data),
            _ => None,
        }
    }

    /// Create a detached element. The name and attribute keys are
    /// ASCII-lowercased; duplicate attribute keys keep the first value.
    /// HTML-namespace templates get their shadow contents fragment here.
    pub fn create_element(
        &mut self,
        name: &str,
        ns: Namespace,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let name = name.to_ascii_lowercase();
        let mut clean: Vec<(String, String)> = Vec::with_capacity(attrs.len());
        for (key, value) in attrs {
            let key = key.to_ascii_lowercase();
            if !clean.iter().any(|(existing, _)| *existing == key) {
                clean.push((key, value));
            }
        }
        let template_contents = if ns == Namespace::Html && name == "template" {
            Some(self.alloc(NodeData::Fragment))
        } else {
            None
        };
        self.alloc(NodeData::Element {
            name,
            ns,
            attrs: clean,
            template_contents,
        })
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text { data: data.into() })
    }

    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment { data: data.into() })
    }

    pub fn create_doctype(
        &mut self,
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    ) -> NodeId {
        self.alloc(NodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    /// Merge attributes into an existing element, first-write-wins.
    pub fn merge_attrs(&mut self, id: NodeId, extra: Vec<(String, String)>) {
        let NodeData::Element { attrs, .. } = &mut self.nodes[id.index()].data else {
            return;
        };
        for (key, value) in extra {
            let key = key.to_ascii_lowercase();
            if !attrs.iter().any(|(existing, _)| *existing == key) {
                attrs.push((key, value));
            }
        }
    }

    /// Append `child` under `parent` (through the template redirect),
    /// merging adjacent text. Returns the node that now holds the content,
    /// which is the prior sibling when a text merge happened.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        let holder = self.content_holder(parent);
        debug_assert!(self.nodes[child.index()].parent.is_none(), "child attached");
        if let NodeData::Text { data } = &self.nodes[child.index()].data
            && let Some(last) = self.nodes[holder.index()].children.last().copied()
            && matches!(self.nodes[last.index()].data, NodeData::Text { .. })
        {
            let merged = data.clone();
            let NodeData::Text { data: dst } = &mut self.nodes[last.index()].data else {
                unreachable!("checked text sibling");
            };
            dst.push_str(&merged);
            return last;
        }
        self.nodes[child.index()].parent = Some(holder);
        self.nodes[holder.index()].children.push(child);
        child
    }

    /// Append text under `parent`, merging with a trailing text sibling.
    /// Empty input attaches nothing.
    pub fn append_text(&mut self, parent: NodeId, data: &str) -> Option<NodeId> {
        if data.is_empty() {
            return None;
        }
        let holder = self.content_holder(parent);
        if let Some(last) = self.nodes[holder.index()].children.last().copied()
            && let NodeData::Text { data: dst } = &mut self.nodes[last.index()].data
        {
            dst.push_str(data);
            return Some(last);
        }
        let text = self.create_text(data);
        Some(self.append(parent, text))
    }

    /// Insert `child` under `parent` immediately before `reference`.
    /// Text inserted next to text siblings merges; inserting between two
    /// text siblings collapses them into one node.
    pub fn insert_before(&mut self, parent: NodeId, reference: NodeId, child: NodeId) -> NodeId {
        let holder = self.content_holder(parent);
        let Some(ref_index) = self.child_index(holder, reference) else {
            return self.append(parent, child);
        };
        debug_assert!(self.nodes[child.index()].parent.is_none(), "child attached");

        if matches!(self.nodes[child.index()].data, NodeData::Text { .. }) {
            let prev = ref_index
                .checked_sub(1)
                .map(|i| self.nodes[holder.index()].children[i]);
            if let Some(prev) = prev
                && matches!(self.nodes[prev.index()].data, NodeData::Text { .. })
            {
                let NodeData::Text { data } = &self.nodes[child.index()].data else {
                    unreachable!("checked text child");
                };
                let incoming = data.clone();
                self.push_text(prev, &incoming);
                // Between two text siblings: fold the following one in too.
                if matches!(self.nodes[reference.index()].data, NodeData::Text { .. }) {
                    let NodeData::Text { data } = &self.nodes[reference.index()].data else {
                        unreachable!("checked text reference");
                    };
                    let trailing = data.clone();
                    self.push_text(prev, &trailing);
                    self.remove(reference);
                }
                return prev;
            }
            if matches!(self.nodes[reference.index()].data, NodeData::Text { .. }) {
                let NodeData::Text { data } = &self.nodes[child.index()].data else {
                    unreachable!("checked text child");
                };
                let incoming = data.clone();
                let NodeData::Text { data: dst } = &mut self.nodes[reference.index()].data else {
                    unreachable!("checked text reference");
                };
                dst.insert_str(0, &incoming);
                return reference;
            }
        }

        self.nodes[child.index()].parent = Some(holder);
        self.nodes[holder.index()].children.insert(ref_index, child);
        child
    }

    /// Insert `child` under `parent` immediately after `reference`,
    /// appending when `reference` is the last child or absent.
    pub fn insert_after(&mut self, parent: NodeId, reference: NodeId, child: NodeId) -> NodeId {
        let holder = self.content_holder(parent);
        let next = self
            .child_index(holder, reference)
            .and_then(|i| self.nodes[holder.index()].children.get(i + 1).copied());
        match next {
            Some(next) => self.insert_before(parent, next, child),
            None => self.append(parent, child),
        }
    }

    fn push_text(&mut self, id: NodeId, extra: &str) {
        let NodeData::Text { data } = &mut self.nodes[id.index()].data else {
            unreachable!("push_text target must be text");
        };
        data.push_str(extra);
    }

    fn child_index(&self, holder: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[holder.index()]
            .children
            .iter()
            .position(|&c| c == child)
    }

    /// Detach `id` from its parent; the node and its subtree stay alive in
    /// the arena and can be re-attached.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index()].parent.take() else {
            return;
        };
        let children = &mut self.nodes[parent.index()].children;
        if let Some(index) = children.iter().position(|&c| c == id) {
            children.remove(index);
        }
    }

    /// Deep-clone the subtree rooted at `id`; the clone is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id.index()].data.clone();
        let origin = self.nodes[id.index()].origin;
        let clone = match data {
            NodeData::Element {
                name, ns, attrs, ..
            } => {
                // create_element re-derives the template contents fragment;
                // the child walk below reads through the redirect on both
                // sides, so template contents copy like ordinary children.
                self.create_element(&name, ns, attrs)
            }
            other => self.alloc(other),
        };
        self.nodes[clone.index()].origin = origin;
        for child in self.nodes[self.content_holder(id).index()].children.clone() {
            let child_clone = self.clone_subtree(child);
            self.append(clone, child_clone);
        }
        clone
    }

    /// Preorder walk of the subtree rooted at `id`, excluding `id` itself.
    /// Template shadow contents are traversed like ordinary children.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { dom: self, stack }
    }

    #[cfg(test)]
    pub(crate) fn assert_tree_invariants(&self) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let holder = self.content_holder(id);
            let children = &self.nodes[holder.index()].children;
            let mut previous_was_text = false;
            for &child in children {
                assert_eq!(
                    self.nodes[child.index()].parent,
                    Some(holder),
                    "child {child:?} of {id:?} has a stale parent link"
                );
                let is_text = matches!(self.nodes[child.index()].data, NodeData::Text { .. });
                assert!(
                    !(is_text && previous_was_text),
                    "adjacent text children under {id:?}"
                );
                if let NodeData::Text { data } = &self.nodes[child.index()].data {
                    assert!(!data.is_empty(), "empty text node under {id:?}");
                }
                assert!(
                    !matches!(
                        self.nodes[child.index()].data,
                        NodeData::Document | NodeData::Fragment
                    ),
                    "document/fragment attached as child of {id:?}"
                );
                previous_was_text = is_text;
                stack.push(child);
            }
        }
    }
}

pub struct Descendants<'a> {
    dom: &'a Dom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        for &child in self.dom.children(id).iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Html => "html",
            Namespace::Svg => "svg",
            Namespace::MathMl => "math",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn element_names_and_attr_keys_are_lowercased() {
        let mut dom = Dom::new_document();
        let div = dom.create_element("DiV", Namespace::Html, attrs(&[("ID", "a"), ("id", "b")]));
        assert_eq!(dom.element_name(div), Some("div"));
        assert_eq!(dom.attr(div, "id"), Some("a"), "first write should win");
        assert_eq!(dom.attrs(div).len(), 1);
    }

    #[test]
    fn append_merges_adjacent_text() {
        let mut dom = Dom::new_document();
        let p = dom.create_element("p", Namespace::Html, Vec::new());
        dom.append(dom.root(), p);
        dom.append_text(p, "Hello");
        dom.append_text(p, ", world");
        assert_eq!(dom.children(p).len(), 1);
        assert_eq!(dom.text(dom.children(p)[0]), Some("Hello, world"));
        dom.assert_tree_invariants();
    }

    #[test]
    fn append_text_skips_empty_input() {
        let mut dom = Dom::new_document();
        let p = dom.create_element("p", Namespace::Html, Vec::new());
        dom.append(dom.root(), p);
        assert!(dom.append_text(p, "").is_none());
        assert!(dom.children(p).is_empty());
    }

    #[test]
    fn insert_between_text_siblings_collapses_to_one_node() {
        let mut dom = Dom::new_document();
        let p = dom.create_element("p", Namespace::Html, Vec::new());
        dom.append(dom.root(), p);
        let a = dom.create_text("a");
        dom.append(p, a);
        let br = dom.create_element("br", Namespace::Html, Vec::new());
        dom.append(p, br);
        let c = dom.create_text("c");
        dom.append(p, c);
        dom.remove(br);
        // p now has ["a", "c"] as two nodes; drop "b" between them.
        let b = dom.create_text("b");
        let merged = dom.insert_before(p, c, b);
        assert_eq!(dom.children(p), &[merged]);
        assert_eq!(dom.text(merged), Some("abc"));
        dom.assert_tree_invariants();
    }

    #[test]
    fn insert_before_prepends_into_a_following_text_sibling() {
        let mut dom = Dom::new_document();
        let p = dom.create_element("p", Namespace::Html, Vec::new());
        dom.append(dom.root(), p);
        let tail = dom.create_text("tail");
        dom.append(p, tail);
        let head = dom.create_text("head ");
        let merged = dom.insert_before(p, tail, head);
        assert_eq!(merged, tail);
        assert_eq!(dom.text(tail), Some("head tail"));
    }

    #[test]
    fn template_children_redirect_to_shadow_contents() {
        let mut dom = Dom::new_document();
        let template = dom.create_element("template", Namespace::Html, Vec::new());
        dom.append(dom.root(), template);
        let div = dom.create_element("div", Namespace::Html, Vec::new());
        dom.append(template, div);
        let contents = dom.template_contents(template).expect("shadow contents");
        assert_eq!(dom.children(template), &[div]);
        assert_eq!(dom.parent(div), Some(contents));
        dom.assert_tree_invariants();
    }

    #[test]
    fn svg_template_has_no_shadow_contents() {
        let mut dom = Dom::new_document();
        let template = dom.create_element("template", Namespace::Svg, Vec::new());
        assert!(dom.template_contents(template).is_none());
    }

    #[test]
    fn remove_detaches_and_nulls_parent() {
        let mut dom = Dom::new_document();
        let div = dom.create_element("div", Namespace::Html, Vec::new());
        dom.append(dom.root(), div);
        dom.remove(div);
        assert_eq!(dom.parent(div), None);
        assert!(dom.children(dom.root()).is_empty());
    }

    #[test]
    fn clone_subtree_copies_structure_and_template_contents() {
        let mut dom = Dom::new_document();
        let template = dom.create_element("template", Namespace::Html, Vec::new());
        dom.append(dom.root(), template);
        let span = dom.create_element("span", Namespace::Html, attrs(&[("class", "x")]));
        dom.append(template, span);
        dom.append_text(span, "inner");

        let clone = dom.clone_subtree(template);
        assert!(dom.parent(clone).is_none(), "clone starts detached");
        let cloned_children = dom.children(clone).to_vec();
        assert_eq!(cloned_children.len(), 1);
        let span_clone = cloned_children[0];
        assert_ne!(span_clone, span);
        assert_eq!(dom.element_name(span_clone), Some("span"));
        assert_eq!(dom.attr(span_clone, "class"), Some("x"));
        assert_eq!(dom.text(dom.children(span_clone)[0]), Some("inner"));
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let mut dom = Dom::new_document();
        let html = dom.create_element("html", Namespace::Html, Vec::new());
        dom.append(dom.root(), html);
        let head = dom.create_element("head", Namespace::Html, Vec::new());
        dom.append(html, head);
        let body = dom.create_element("body", Namespace::Html, Vec::new());
        dom.append(html, body);
        let p = dom.create_element("p", Namespace::Html, Vec::new());
        dom.append(body, p);

        let names: Vec<_> = dom
            .descendants(dom.root())
            .map(|id| dom.name(id).to_string())
            .collect();
        assert_eq!(names, vec!["html", "head", "body", "p"]);
    }
}
