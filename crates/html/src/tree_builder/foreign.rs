//! Foreign content: SVG and MathML subtrees, breakout back to HTML, and
//! integration points.

use super::{InsertPos, TreeBuilder};
use crate::dom::Namespace;
use crate::tag_tables::is_foreign_breakout;

impl TreeBuilder<'_> {
    /// `<svg>` or `<math>` arriving in HTML context opens a foreign subtree.
    pub(super) fn open_foreign_root(
        &mut self,
        pos: usize,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) {
        let ns = if name == "svg" {
            Namespace::Svg
        } else {
            Namespace::MathMl
        };
        let parent = self.insertion_parent_for(pos, name);
        let at = if self.is_table_internal_parent(parent) {
            self.foster_pos()
        } else {
            InsertPos::under(parent)
        };
        let node = self.dom.create_element(name, ns, attrs);
        self.insert_node(at, node);
        self.set_origin(node, pos);
        if !self_closing {
            self.open.push(node, pos);
        }
    }

    /// Start tag while the insertion namespace is not HTML (plus the
    /// `mglyph`/`malignmark` special case, which keeps the math namespace
    /// even at an integration point).
    pub(super) fn process_foreign_start_tag(
        &mut self,
        pos: usize,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    ) {
        let font_breakout = name == "font"
            && attrs
                .iter()
                .any(|(k, _)| matches!(k.as_str(), "color" | "face" | "size"));
        if is_foreign_breakout(name) || font_breakout {
            log::debug!(target: "html.tree_builder", "<{name}> breaks out of foreign content");
            while self.open.len() > 1
                && self
                    .dom
                    .element_ns(self.open.current())
                    .is_some_and(|ns| ns != Namespace::Html)
            {
                self.open.pop();
            }
            self.process_html_start_tag(pos, name, attrs, self_closing);
            return;
        }

        let parent = self.open.current();
        let ns = match name {
            "svg" => Namespace::Svg,
            "math" => Namespace::MathMl,
            "mglyph" | "malignmark"
                if self.dom.element_ns(parent) == Some(Namespace::MathMl) =>
            {
                Namespace::MathMl
            }
            _ => self.child_namespace(parent),
        };
        let node = self.dom.create_element(name, ns, attrs);
        self.dom.append(parent, node);
        self.set_origin(node, pos);
        if !self_closing {
            self.open.push(node, pos);
        }
    }
}
