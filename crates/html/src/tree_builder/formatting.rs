//! Formatting-element continuation and recovery.
//!
//! Misnested formatting never runs the full adoption agency. Instead:
//! a split recovery when everything above the matched element is itself
//! formatting, a misnested recovery that relocates a single non-formatting
//! pivot (with an extra "sprinkle" pass for `<a>`), paragraph open/close
//! continuation, and the narrowly-fenced trailing-aside hoist.

use super::stack::{OpenEntry, Scope};
use super::{InsertPos, TreeBuilder};
use crate::dom::{Namespace, NodeId};
use crate::tag_tables::{closes_p, is_formatting_element};

impl TreeBuilder<'_> {
    fn is_open_formatting(&self, node: NodeId) -> bool {
        self.dom.element_ns(node) == Some(Namespace::Html)
            && self
                .dom
                .element_name(node)
                .is_some_and(is_formatting_element)
    }

    fn is_block_element(&self, node: NodeId) -> bool {
        self.dom.element_ns(node) == Some(Namespace::Html)
            && self.dom.element_name(node).is_some_and(closes_p)
    }

    /// Contiguous run of formatting elements at the top of the stack,
    /// bottom-first.
    fn top_formatting_run(&self) -> Vec<OpenEntry> {
        let items = self.open.items();
        let mut run: Vec<OpenEntry> = items
            .iter()
            .rev()
            .take_while(|entry| self.is_open_formatting(entry.node))
            .copied()
            .collect();
        run.reverse();
        run
    }

    /// `<p>` start tag: close any open paragraph, eject a trailing
    /// formatting run, and reopen clones of the run inside the new
    /// paragraph so inline formatting continues across the block.
    pub(super) fn open_paragraph(&mut self, pos: usize, attrs: Vec<(String, String)>) {
        let run = self.top_formatting_run();
        if let Some(i) = self.open.find_in_scope(&self.dom, "p", Scope::Button) {
            self.open.pop_through(i);
        } else if !run.is_empty() {
            let base = self.open.len() - run.len();
            self.open.pop_through(base);
        }

        let parent = self.insertion_parent_for(pos, "p");
        let at = if self.is_table_internal_parent(parent) {
            self.foster_pos()
        } else {
            InsertPos::under(parent)
        };
        let p = self.insert_element(pos, at, "p", attrs, false);

        let mut container = p;
        for entry in run {
            let clone = self.clone_element_shell(entry.node);
            self.dom.append(container, clone);
            self.open.push(clone, entry.pos);
            container = clone;
        }
    }

    /// `</p>`: pop the paragraph; formatting elements that were open above
    /// it continue as a cloned chain right after it.
    pub(super) fn close_paragraph_with_continuation(&mut self, index: usize) {
        let p = self.open.node_at(index);
        let continued: Vec<OpenEntry> = self.open.items()[index + 1..]
            .iter()
            .filter(|entry| self.is_open_formatting(entry.node))
            .copied()
            .collect();
        self.open.pop_through(index);
        if continued.is_empty() {
            return;
        }
        let Some(parent) = self.dom.parent(p) else {
            return;
        };
        log::debug!(
            target: "html.tree_builder",
            "continuing {} formatting element(s) past </p>",
            continued.len()
        );
        let mut container: Option<NodeId> = None;
        for entry in continued {
            let clone = self.clone_element_shell(entry.node);
            match container {
                None => self.dom.insert_after(parent, p, clone),
                Some(c) => self.dom.append(c, clone),
            };
            self.open.push(clone, entry.pos);
            container = Some(clone);
        }
    }

    /// End tag for a formatting element with other elements open above it.
    pub(super) fn close_formatting_element(&mut self, index: usize) {
        let above: Vec<OpenEntry> = self.open.items()[index + 1..].to_vec();
        if above.is_empty() {
            self.open.pop_through(index);
            return;
        }
        if above
            .iter()
            .all(|entry| self.is_open_formatting(entry.node))
        {
            self.formatting_split_recovery(index, above);
        } else {
            self.misnested_formatting_recovery(index, above);
        }
    }

    /// Everything above the matched element is formatting: close the run
    /// and reopen clones as a next-sibling chain after it.
    fn formatting_split_recovery(&mut self, index: usize, above: Vec<OpenEntry>) {
        let fmt = self.open.node_at(index);
        self.open.pop_through(index);
        let Some(parent) = self.dom.parent(fmt) else {
            return;
        };
        log::debug!(
            target: "html.tree_builder",
            "formatting split recovery reopens {} element(s)",
            above.len()
        );
        let mut container: Option<NodeId> = None;
        for entry in above {
            let clone = self.clone_element_shell(entry.node);
            match container {
                None => self.dom.insert_after(parent, fmt, clone),
                Some(c) => self.dom.append(c, clone),
            };
            self.open.push(clone, entry.pos);
            container = Some(clone);
        }
    }

    /// A non-formatting pivot is open above the matched element: relocate
    /// the pivot to the formatting element's next sibling (through shallow
    /// clones of any formatting wrappers in between), wrap the pivot's
    /// leading inline children in a clone of the formatting, and for `<a>`
    /// propagate wrappers into block descendants.
    fn misnested_formatting_recovery(&mut self, index: usize, above: Vec<OpenEntry>) {
        let fmt = self.open.node_at(index);
        let sprinkle = self.dom.element_name(fmt) == Some("a");
        let pivot_rel = above
            .iter()
            .position(|entry| !self.is_open_formatting(entry.node))
            .expect("caller verified a non-formatting pivot exists");
        let prefix = &above[..pivot_rel];
        let pivot = above[pivot_rel].node;
        let Some(fmt_parent) = self.dom.parent(fmt) else {
            self.open.pop_through(index);
            return;
        };
        log::debug!(
            target: "html.tree_builder",
            "misnested formatting recovery around <{}>",
            self.dom.element_name(pivot).unwrap_or("?")
        );

        self.dom.remove(pivot);
        let mut cloned_prefix: Vec<OpenEntry> = Vec::new();
        let mut container: Option<NodeId> = None;
        for entry in prefix {
            let clone = self.clone_element_shell(entry.node);
            match container {
                None => self.dom.insert_after(fmt_parent, fmt, clone),
                Some(c) => self.dom.append(c, clone),
            };
            cloned_prefix.push(OpenEntry {
                node: clone,
                pos: entry.pos,
            });
            container = Some(clone);
        }
        match container {
            None => self.dom.insert_after(fmt_parent, fmt, pivot),
            Some(c) => self.dom.append(c, pivot),
        };

        self.wrap_leading_inline_children(pivot, fmt);
        if sprinkle {
            let blocks: Vec<NodeId> = self
                .dom
                .descendants(pivot)
                .filter(|&id| self.is_block_element(id))
                .collect();
            for block in blocks {
                self.wrap_leading_inline_children(block, fmt);
            }
        }

        // Stack rewrite: the formatting element and the wrapper prefix are
        // gone; their clones hold the pivot, which stays open.
        self.open.splice(index, 1 + prefix.len(), &cloned_prefix);
    }

    /// Move the leading run of non-block children of `parent` into a fresh
    /// clone of `fmt_source` placed first.
    fn wrap_leading_inline_children(&mut self, parent: NodeId, fmt_source: NodeId) {
        let children = self.dom.children(parent).to_vec();
        let leading: Vec<NodeId> = children
            .iter()
            .copied()
            .take_while(|&child| !self.is_block_element(child))
            .collect();
        if leading.is_empty() {
            return;
        }
        for &child in &leading {
            self.dom.remove(child);
        }
        let clone = self.clone_element_shell(fmt_source);
        match self.dom.first_child(parent) {
            Some(first) => self.dom.insert_before(parent, first, clone),
            None => self.dom.append(parent, clone),
        };
        for child in leading {
            self.dom.append(clone, child);
        }
    }

    /// `</b>` with an `<aside>` sitting immediately on top of the matched
    /// `<b>`: hoist the aside out to be the b's next sibling and wrap its
    /// first child in a fresh `<b>`. Anything shaped differently falls
    /// through to the general recoveries.
    pub(super) fn try_hoist_trailing_aside(&mut self, index: usize) -> bool {
        if index + 2 != self.open.len() {
            return false;
        }
        let aside = self.open.current();
        if !self.dom.is_html_element_named(aside, "aside") {
            return false;
        }
        let b = self.open.node_at(index);
        if self.dom.parent(aside) != Some(b) {
            return false;
        }
        let Some(parent) = self.dom.parent(b) else {
            return false;
        };
        log::debug!(target: "html.tree_builder", "hoisting trailing aside out of </b>");
        self.dom.remove(aside);
        self.dom.insert_after(parent, b, aside);
        if let Some(first) = self.dom.first_child(aside) {
            self.dom.remove(first);
            let wrap = self.clone_element_shell(b);
            match self.dom.first_child(aside) {
                Some(next) => self.dom.insert_before(aside, next, wrap),
                None => self.dom.append(aside, wrap),
            };
            self.dom.append(wrap, first);
        }
        // The aside stays open; the b entry goes away.
        self.open.splice(index, 1, &[]);
        true
    }
}
