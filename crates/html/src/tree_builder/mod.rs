//! Tree builder: token stream to document tree.
//!
//! A state machine over the tokenizer's output. State is the open-elements
//! stack, cached `html`/`head`/`body` handles, and four flags
//! (`seen_doctype`, `after_body`, `frameset_ok`, and the frameset-doctype
//! quirk). The stack keeps the root at the bottom and `html` directly above
//! it for the whole document parse; `head` and `body` are never pushed, so
//! an insertion arriving while `html` is the top routes into head or body by
//! the rules in `insertion_parent_for`.
//!
//! The formatting-element recoveries here are deliberate deviations from the
//! full adoption agency: a split recovery when everything above the matched
//! element is itself formatting, and a misnested recovery that relocates one
//! pivot. Both live in `formatting.rs`.

mod foreign;
mod formatting;
mod stack;
mod tables;

#[cfg(test)]
mod tests;

use crate::dom::{Dom, Namespace, NodeData, NodeId, Origin};
use crate::error::{ErrorCode, ErrorOrigin, ParseError};
use crate::tag_tables::{
    is_formatting_element, is_head_tag, is_mathml_integration_point, is_svg_integration_point,
    is_table_scoped_end_tag, is_void_element,
};
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use stack::{OpenElements, Scope};

/// Context element for fragment parsing.
#[derive(Clone, Debug)]
pub struct FragmentContext {
    pub tag_name: String,
    pub namespace: Namespace,
}

impl Default for FragmentContext {
    fn default() -> Self {
        Self {
            tag_name: "div".to_string(),
            namespace: Namespace::Html,
        }
    }
}

impl FragmentContext {
    pub fn new(tag_name: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            namespace,
        }
    }

    /// Namespace the fragment's top-level children parse in.
    fn base_namespace(&self) -> Namespace {
        match self.namespace {
            Namespace::Html => Namespace::Html,
            Namespace::Svg if is_svg_integration_point(&self.tag_name) => Namespace::Html,
            Namespace::MathMl if is_mathml_integration_point(&self.tag_name) => Namespace::Html,
            ns => ns,
        }
    }
}

pub(crate) struct BuildOutput {
    pub(crate) dom: Dom,
    pub(crate) errors: Vec<ParseError>,
}

struct InsertPos {
    parent: NodeId,
    before: Option<NodeId>,
}

impl InsertPos {
    fn under(parent: NodeId) -> Self {
        Self {
            parent,
            before: None,
        }
    }
}

pub(crate) struct TreeBuilder<'a> {
    tokenizer: Tokenizer<'a>,
    dom: Dom,
    open: OpenElements,
    html_el: Option<NodeId>,
    head_el: Option<NodeId>,
    body_el: Option<NodeId>,
    seen_doctype: bool,
    after_body: bool,
    frameset_ok: bool,
    has_frameset: bool,
    /// XHTML-Frameset doctype widens the p-closer set with `table`.
    frameset_doctype: bool,
    fragment: Option<FragmentContext>,
    collect_errors: bool,
    track_locations: bool,
    errors: Vec<ParseError>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        tokenizer: Tokenizer<'a>,
        fragment: Option<FragmentContext>,
        collect_errors: bool,
        track_locations: bool,
    ) -> Self {
        let dom = if fragment.is_some() {
            Dom::new_fragment()
        } else {
            Dom::new_document()
        };
        let open = OpenElements::new(dom.root());
        Self {
            tokenizer,
            dom,
            open,
            html_el: None,
            head_el: None,
            body_el: None,
            seen_doctype: false,
            after_body: false,
            frameset_ok: true,
            has_frameset: false,
            frameset_doctype: false,
            fragment,
            collect_errors,
            track_locations,
            errors: Vec::new(),
        }
    }

    pub(crate) fn run(mut self) -> BuildOutput {
        while let Some(token) = self.tokenizer.next() {
            self.process(token);
        }
        self.finish();
        let mut errors = self.tokenizer.take_errors();
        errors.append(&mut self.errors);
        BuildOutput {
            dom: self.dom,
            errors,
        }
    }

    fn process(&mut self, token: Token) {
        let pos = token.pos;
        match token.kind {
            TokenKind::Doctype {
                name,
                public_id,
                system_id,
            } => self.process_doctype(pos, name, public_id, system_id),
            TokenKind::Comment { data } => self.process_comment(pos, data),
            TokenKind::Text { data } => self.process_text(pos, data),
            TokenKind::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                if self.insertion_namespace() == Namespace::Html {
                    self.process_html_start_tag(pos, &name, attrs, self_closing);
                } else {
                    self.process_foreign_start_tag(pos, &name, attrs, self_closing);
                }
            }
            TokenKind::EndTag { name } => self.process_end_tag(pos, &name),
        }
    }

    fn error(&mut self, code: ErrorCode, pos: Option<usize>, message: impl Into<String>) {
        if !self.collect_errors {
            return;
        }
        let (line, column) = match pos {
            Some(pos) => {
                let (line, column) = self.tokenizer.locate(pos);
                (Some(line), Some(column))
            }
            None => (None, None),
        };
        self.errors.push(ParseError {
            origin: ErrorOrigin::TreeBuilder,
            code,
            message: message.into(),
            line,
            column,
        });
    }

    fn set_origin(&mut self, node: NodeId, pos: usize) {
        if !self.track_locations {
            return;
        }
        let (line, column) = self.tokenizer.locate(pos);
        self.dom.set_origin(
            node,
            Origin {
                offset: pos,
                line,
                column,
            },
        );
    }

    /// Namespace the next child inserted at the current position would get.
    fn insertion_namespace(&self) -> Namespace {
        self.child_namespace(self.open.current())
    }

    fn child_namespace(&self, parent: NodeId) -> Namespace {
        let Some(ns) = self.dom.element_ns(parent) else {
            // At the root: fragments inherit from their context element.
            return self
                .fragment
                .as_ref()
                .map_or(Namespace::Html, FragmentContext::base_namespace);
        };
        let name = self.dom.element_name(parent).unwrap_or_default();
        match ns {
            Namespace::Html => Namespace::Html,
            Namespace::Svg if is_svg_integration_point(name) => Namespace::Html,
            Namespace::MathMl if is_mathml_integration_point(name) => Namespace::Html,
            ns => ns,
        }
    }

    // ----- scaffolding -------------------------------------------------

    fn ensure_html(&mut self, pos: usize) -> NodeId {
        debug_assert!(self.fragment.is_none());
        if let Some(html) = self.html_el {
            return html;
        }
        let html = self.dom.create_element("html", Namespace::Html, Vec::new());
        let root = self.dom.root();
        self.dom.append(root, html);
        self.set_origin(html, pos);
        self.open.push(html, pos);
        self.html_el = Some(html);
        html
    }

    fn ensure_head(&mut self, pos: usize) -> NodeId {
        let html = self.ensure_html(pos);
        if let Some(head) = self.head_el {
            return head;
        }
        let head = self.dom.create_element("head", Namespace::Html, Vec::new());
        self.dom.append(html, head);
        self.set_origin(head, pos);
        self.head_el = Some(head);
        head
    }

    fn ensure_body(&mut self, pos: usize) -> NodeId {
        self.ensure_head(pos);
        let html = self.html_el.expect("ensure_head creates html");
        if let Some(body) = self.body_el {
            return body;
        }
        if self.has_frameset {
            // A frameset document never grows a body.
            return html;
        }
        let body = self.dom.create_element("body", Namespace::Html, Vec::new());
        self.dom.append(html, body);
        self.set_origin(body, pos);
        self.body_el = Some(body);
        body
    }

    /// Insertion parent with the html-level routing applied: head tags go to
    /// the head while the body is still empty, everything else to the body.
    fn insertion_parent_for(&mut self, pos: usize, name: &str) -> NodeId {
        if self.fragment.is_some() {
            return self.open.current();
        }
        self.ensure_html(pos);
        let top = self.open.current();
        if Some(top) == self.html_el {
            let body_empty = self
                .body_el
                .is_none_or(|body| self.dom.children(body).is_empty());
            if is_head_tag(name) && body_empty {
                return self.ensure_head(pos);
            }
            return self.ensure_body(pos);
        }
        top
    }

    fn insert_node(&mut self, at: InsertPos, node: NodeId) -> NodeId {
        match at.before {
            Some(before) => self.dom.insert_before(at.parent, before, node),
            None => self.dom.append(at.parent, node),
        }
    }

    // ----- doctype ------------------------------------------------------

    fn process_doctype(
        &mut self,
        pos: usize,
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    ) {
        if self.fragment.is_some() || self.seen_doctype || self.html_el.is_some() {
            return;
        }
        self.seen_doctype = true;
        if public_id
            .as_deref()
            .is_some_and(|id| id.contains("XHTML 1.0 Frameset"))
        {
            self.frameset_doctype = true;
        }
        let node = self.dom.create_doctype(name, public_id, system_id);
        let root = self.dom.root();
        self.dom.append(root, node);
        self.set_origin(node, pos);
    }

    // ----- comments -----------------------------------------------------

    fn process_comment(&mut self, pos: usize, data: String) {
        // CDATA sections arrive wrapped; in foreign content they are text.
        if let Some(payload) = data
            .strip_prefix("[CDATA[")
            .and_then(|rest| rest.strip_suffix("]]"))
            && self.insertion_namespace() != Namespace::Html
        {
            let parent = self.open.current();
            self.dom.append_text(parent, payload);
            return;
        }

        if self.fragment.is_some() {
            let parent = self.open.current();
            let node = self.dom.create_comment(data);
            self.dom.append(parent, node);
            self.set_origin(node, pos);
            return;
        }

        let node = self.dom.create_comment(data.clone());
        self.set_origin(node, pos);
        let root = self.dom.root();

        if data.starts_with('?') {
            // Processing-instruction-like comments lead the document.
            match self.dom.first_child(root) {
                Some(first) => self.dom.insert_before(root, first, node),
                None => self.dom.append(root, node),
            };
            return;
        }
        if self.html_el.is_none() || self.after_body {
            self.dom.append(root, node);
            return;
        }
        let top = self.open.current();
        if Some(top) == self.html_el
            && let Some(head) = self.head_el
            && self.dom.children(head).is_empty()
            && self
                .body_el
                .is_none_or(|body| self.dom.children(body).is_empty())
        {
            let html = self.html_el.expect("checked above");
            self.dom.insert_before(html, head, node);
            return;
        }
        self.dom.append(top, node);
    }

    // ----- text ---------------------------------------------------------

    fn process_text(&mut self, pos: usize, data: String) {
        let is_whitespace = data.chars().all(|c| c.is_ascii_whitespace());

        if self.fragment.is_none()
            && self.body_el.is_none()
            && is_whitespace
            && self.frameset_ok
        {
            // Inter-scaffold whitespace is dropped until real content lands.
            return;
        }

        let Some(data) = self.scrub_nul_bytes(data) else {
            return;
        };

        if !is_whitespace {
            self.frameset_ok = false;
            self.after_body = false;
        }

        let parent = if self.fragment.is_some() {
            self.open.current()
        } else {
            self.insertion_parent_for(pos, "#text")
        };

        if self.text_into_table_context(pos, parent, &data, is_whitespace) {
            return;
        }

        let data = self.strip_pre_leading_newline(parent, data);
        if data.is_empty() {
            return;
        }
        let node = self.dom.append_text(parent, &data);
        if let Some(node) = node
            && self.dom.origin(node).is_none()
        {
            self.set_origin(node, pos);
        }
    }

    /// NUL policy by context: kept as U+FFFD inside `script`/`style`/
    /// `plaintext` and in foreign non-integration-point content, stripped
    /// everywhere else. Returns `None` when nothing survives.
    fn scrub_nul_bytes(&self, data: String) -> Option<String> {
        if !data.contains('\0') {
            return Some(data);
        }
        let top = self.open.current();
        let replace = if self.insertion_namespace() == Namespace::Html {
            matches!(
                self.dom.element_name(top),
                Some("script") | Some("style") | Some("plaintext")
            ) && self.dom.element_ns(top) == Some(Namespace::Html)
        } else {
            true
        };
        let scrubbed = if replace {
            data.replace('\0', "\u{FFFD}")
        } else {
            data.replace('\0', "")
        };
        (!scrubbed.is_empty()).then_some(scrubbed)
    }

    fn strip_pre_leading_newline(&self, parent: NodeId, data: String) -> String {
        if self.dom.is_html_element_named(parent, "pre")
            && self.dom.children(parent).is_empty()
            && let Some(rest) = data.strip_prefix('\n')
        {
            return rest.to_string();
        }
        data
    }

    // ----- start tags -----------------------------------------------------

    fn process_html_start_tag(
        &mut self,
        pos: usize,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) {
        self.after_body = false;

        if self.fragment.is_some() {
            if matches!(name, "html" | "head" | "body" | "frameset") {
                return;
            }
        } else {
            match name {
                "html" => {
                    let html = self.ensure_html(pos);
                    self.dom.merge_attrs(html, attrs);
                    return;
                }
                "head" => {
                    let head = self.ensure_head(pos);
                    self.dom.merge_attrs(head, attrs);
                    return;
                }
                "body" => {
                    let body = self.ensure_body(pos);
                    self.dom.merge_attrs(body, attrs);
                    return;
                }
                "frameset" => {
                    self.open_frameset(pos, attrs);
                    return;
                }
                _ => {}
            }
        }

        // Select subtrees rewrite a fixed set of children.
        if matches!(
            name,
            "option" | "optgroup" | "hr" | "input" | "keygen" | "textarea" | "select"
        ) && self
            .open
            .find_in_scope(&self.dom, "select", Scope::Select)
            .is_some()
        {
            self.start_tag_in_select(pos, name, attrs, self_closing);
            return;
        }

        if start_tag_clears_frameset_ok(name, &attrs) {
            self.frameset_ok = false;
        }

        // Implied end tags for list items, ruby annotations, and an open <a>.
        match name {
            "li" => {
                if let Some(i) = self.open.find_in_scope(&self.dom, "li", Scope::ListItem) {
                    self.open.pop_through(i);
                }
            }
            "dd" | "dt" => {
                if let Some(i) =
                    self.open
                        .find_any_in_scope(&self.dom, &["dd", "dt"], Scope::Default)
                {
                    self.open.pop_through(i);
                }
            }
            "rb" | "rt" | "rp" | "rtc" => self.close_to_ruby(name),
            "a" => {
                if let Some(i) = self.open.find_in_scope(&self.dom, "a", Scope::Default) {
                    self.open.pop_through(i);
                }
            }
            _ => {}
        }

        if name == "p" {
            self.open_paragraph(pos, attrs);
            return;
        }
        if self.closes_paragraph(name)
            && let Some(i) = self.open.find_in_scope(&self.dom, "p", Scope::Button)
        {
            self.open.pop_through(i);
        }

        // An open <a> continues inside a new div/address block.
        let reopen_a = if matches!(name, "div" | "address") {
            self.take_open_anchor()
        } else {
            None
        };

        if matches!(name, "svg" | "math") {
            self.open_foreign_root(pos, name, attrs, self_closing);
            return;
        }
        // MathML text-shaped leaves keep the math namespace even at an
        // integration point.
        if matches!(name, "mglyph" | "malignmark")
            && self.dom.element_ns(self.open.current()) == Some(Namespace::MathMl)
        {
            self.process_foreign_start_tag(pos, name, attrs, self_closing);
            return;
        }

        self.close_implied_table_structure(name);

        let parent = self.insertion_parent_for(pos, name);
        if self.is_table_internal_parent(parent) {
            self.start_tag_in_table_context(pos, parent, name, attrs, self_closing);
            return;
        }

        let node = self.insert_element(pos, InsertPos::under(parent), name, attrs, self_closing);

        if let Some(anchor) = reopen_a {
            let clone = self.clone_element_shell(anchor);
            self.dom.append(node, clone);
            self.open.push(clone, pos);
        }
    }

    fn closes_paragraph(&self, name: &str) -> bool {
        crate::tag_tables::closes_p(name) || (name == "table" && self.frameset_doctype)
    }

    /// Create and attach an element; pushes it unless it cannot hold
    /// children.
    fn insert_element(
        &mut self,
        pos: usize,
        at: InsertPos,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) -> NodeId {
        let node = self.dom.create_element(name, Namespace::Html, attrs);
        self.insert_node(at, node);
        self.set_origin(node, pos);
        if !self_closing && !is_void_element(name) {
            self.open.push(node, pos);
        }
        node
    }

    fn clone_element_shell(&mut self, source: NodeId) -> NodeId {
        let NodeData::Element {
            name, ns, attrs, ..
        } = self.dom.data(source).clone()
        else {
            unreachable!("formatting clones start from elements");
        };
        self.dom.create_element(&name, ns, attrs)
    }

    /// Pop an open `<a>` so it can be reopened inside a new block. Returns
    /// the popped node for cloning.
    fn take_open_anchor(&mut self) -> Option<NodeId> {
        let i = self.open.find_in_scope(&self.dom, "a", Scope::Default)?;
        let anchor = self.open.node_at(i);
        self.open.pop_through(i);
        Some(anchor)
    }

    /// Close a predecessor annotation down to the enclosing ruby. `rb`,
    /// `rt`, and `rp` may also stop at an open `rtc`; a new `rtc` closes all
    /// the way to the ruby.
    fn close_to_ruby(&mut self, incoming: &str) {
        if self
            .open
            .find_in_scope(&self.dom, "ruby", Scope::Default)
            .is_none()
        {
            return;
        }
        let stop_at_rtc = incoming != "rtc";
        while self.open.len() > 1 {
            let name = self.dom.element_name(self.open.current()).unwrap_or("");
            if name == "ruby" || (stop_at_rtc && name == "rtc") {
                break;
            }
            self.open.pop();
        }
    }

    fn open_frameset(&mut self, pos: usize, attrs: Vec<(String, String)>) {
        if self.has_frameset {
            // Nested framesets chain under the current one.
            let parent = self.open.current();
            let node = self.dom.create_element("frameset", Namespace::Html, attrs);
            self.dom.append(parent, node);
            self.set_origin(node, pos);
            self.open.push(node, pos);
            return;
        }
        if !self.frameset_ok {
            return;
        }
        self.ensure_head(pos);
        let html = self.ensure_html(pos);
        if let Some(body) = self.body_el
            && self.dom.children(body).is_empty()
        {
            self.dom.remove(body);
            self.body_el = None;
        }
        let node = self.dom.create_element("frameset", Namespace::Html, attrs);
        self.dom.append(html, node);
        self.set_origin(node, pos);
        self.open.push(node, pos);
        self.has_frameset = true;
    }

    // ----- end tags -------------------------------------------------------

    fn process_end_tag(&mut self, pos: usize, name: &str) {
        if self.fragment.is_none() && matches!(name, "body" | "html") {
            self.ensure_body(pos);
            self.after_body = true;
            return;
        }
        if matches!(name, "head" | "body" | "html") {
            // Scaffold elements never sit on the stack (fragments drop the
            // tags entirely).
            return;
        }
        if name == "br" {
            self.synthesize_end_tag_br(pos);
            return;
        }

        let Some(index) = self.find_end_tag_target(name) else {
            if name == "form" {
                return;
            }
            if matches!(name, "p")
                && self
                    .fragment
                    .as_ref()
                    .is_some_and(|ctx| ctx.base_namespace() != Namespace::Html)
            {
                // A </p> that closes into a foreign fragment context leaves
                // an HTML paragraph at the root.
                let root = self.dom.root();
                let node = self.dom.create_element("p", Namespace::Html, Vec::new());
                self.dom.append(root, node);
                self.set_origin(node, pos);
                return;
            }
            self.error(
                ErrorCode::UnexpectedEndTag,
                Some(pos),
                format!("no open element matches </{name}>"),
            );
            return;
        };

        // Foreign content above the match pops without recovery.
        let foreign_above = self.open.items()[index + 1..]
            .iter()
            .any(|entry| self.dom.element_ns(entry.node).is_some_and(|ns| ns != Namespace::Html));
        if foreign_above {
            self.open.pop_through(index);
            return;
        }

        if name == "p" {
            self.close_paragraph_with_continuation(index);
            return;
        }
        if name == "b" && self.try_hoist_trailing_aside(index) {
            return;
        }
        if is_formatting_element(name)
            && self.dom.element_ns(self.open.node_at(index)) == Some(Namespace::Html)
        {
            self.close_formatting_element(index);
            return;
        }
        self.open.pop_through(index);
    }

    fn find_end_tag_target(&self, name: &str) -> Option<usize> {
        let items = self.open.items();
        for i in (1..items.len()).rev() {
            let node = items[i].node;
            if self.dom.element_name(node) != Some(name) {
                continue;
            }
            if is_table_scoped_end_tag(name) && self.dom.element_ns(node) != Some(Namespace::Html)
            {
                continue;
            }
            return Some(i);
        }
        None
    }

    /// `</br>` synthesizes a `<br>` at the current insertion point; in a
    /// foreign fragment context it lands at the root in the HTML namespace.
    fn synthesize_end_tag_br(&mut self, pos: usize) {
        let parent = if self
            .fragment
            .as_ref()
            .is_some_and(|ctx| ctx.base_namespace() != Namespace::Html)
        {
            self.dom.root()
        } else if self.fragment.is_some() {
            self.open.current()
        } else {
            self.insertion_parent_for(pos, "br")
        };
        let node = self.dom.create_element("br", Namespace::Html, Vec::new());
        self.dom.append(parent, node);
        self.set_origin(node, pos);
        self.frameset_ok = false;
    }

    // ----- termination ------------------------------------------------

    fn finish(&mut self) {
        if self.collect_errors {
            let unclosed: Vec<(NodeId, usize)> = self.open.items()[1..]
                .iter()
                .filter(|entry| {
                    Some(entry.node) != self.html_el
                        && Some(entry.node) != self.head_el
                        && Some(entry.node) != self.body_el
                })
                .map(|entry| (entry.node, entry.pos))
                .collect();
            for (node, pos) in unclosed {
                let name = self.dom.element_name(node).unwrap_or("?").to_string();
                self.error(
                    ErrorCode::ExpectedClosingTagButGotEof,
                    Some(pos),
                    format!("<{name}> left open at end of input"),
                );
            }
        }
        if self.fragment.is_none() {
            let end = self.tokenizer.input_len();
            self.ensure_body(end);
        }
        self.populate_selected_content();
    }

    /// Fill each `<selectedcontent>` under `<select><button>` with a deep
    /// clone of the selected option's children (first selected, or first).
    fn populate_selected_content(&mut self) {
        let root = self.dom.root();
        let selects: Vec<NodeId> = self
            .dom
            .descendants(root)
            .filter(|&id| self.dom.is_html_element_named(id, "select"))
            .collect();
        for select in selects {
            let mut targets: Vec<NodeId> = Vec::new();
            for &child in self.dom.children(select) {
                if !self.dom.is_html_element_named(child, "button") {
                    continue;
                }
                targets.extend(
                    self.dom
                        .descendants(child)
                        .filter(|&id| self.dom.is_html_element_named(id, "selectedcontent")),
                );
            }
            if targets.is_empty() {
                continue;
            }
            let options: Vec<NodeId> = self
                .dom
                .descendants(select)
                .filter(|&id| self.dom.is_html_element_named(id, "option"))
                .collect();
            let chosen = options
                .iter()
                .copied()
                .find(|&o| self.dom.attr(o, "selected").is_some())
                .or(options.first().copied());
            let Some(chosen) = chosen else {
                continue;
            };
            for target in targets {
                while let Some(child) = self.dom.first_child(target) {
                    self.dom.remove(child);
                }
                for child in self.dom.children(chosen).to_vec() {
                    let clone = self.dom.clone_subtree(child);
                    self.dom.append(target, clone);
                }
            }
        }
    }
}

fn start_tag_clears_frameset_ok(name: &str, attrs: &[(String, String)]) -> bool {
    match name {
        "html" | "head" | "body" | "frameset" | "frame" | "base" | "basefont" | "bgsound"
        | "link" | "meta" | "noframes" | "script" | "style" | "template" | "title" => false,
        "input" => !attrs
            .iter()
            .any(|(k, v)| k == "type" && v.eq_ignore_ascii_case("hidden")),
        _ => true,
    }
}
