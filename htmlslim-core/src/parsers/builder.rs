//! Open-element stack shared by the parser adapters.

use crate::dom::{node::is_void_tag, Attributes, ElementData, NodeData, NodeId, Tree};

/// Builds a [`Tree`] from a flat stream of start tags, end tags and
/// character data without any HTML5 insertion-mode rules.
///
/// - start tags nest under the current open element
/// - void elements and self-closing tags never take children
/// - an end tag closes the nearest open element with that name, together
///   with everything opened after it; with no such element it is ignored
/// - elements still open at the end are closed implicitly
#[derive(Debug, Default)]
pub struct LenientBuilder {
    tree: Tree,
    open: Vec<NodeId>,
}

impl LenientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.tree.root())
    }

    /// Insert an element and return its id. The element becomes the
    /// current node unless it is void or self-closing.
    pub fn start_element(
        &mut self,
        tag_name: &str,
        attributes: Attributes,
        self_closing: bool,
    ) -> NodeId {
        let tag_name = tag_name.to_ascii_lowercase();
        let leaf = self_closing || is_void_tag(&tag_name);
        let parent = self.current();
        let id = self.tree.append(
            parent,
            NodeData::Element(ElementData::with_attributes(tag_name, attributes)),
        );
        if !leaf {
            self.open.push(id);
        }
        id
    }

    /// Close the nearest open element named `tag_name`. Returns false when
    /// no such element is open and the end tag was dropped.
    pub fn end_element(&mut self, tag_name: &str) -> bool {
        let tag_name = tag_name.to_ascii_lowercase();
        let position = self
            .open
            .iter()
            .rposition(|id| self.tree.is_element_named(*id, &tag_name));
        match position {
            Some(index) => {
                self.open.truncate(index);
                true
            }
            None => false,
        }
    }

    pub fn text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let parent = self.current();
        self.tree.append_text(parent, content);
    }

    pub fn comment(&mut self, content: &str) {
        let parent = self.current();
        self.tree.append(parent, NodeData::Comment(content.to_string()));
    }

    pub fn doctype(&mut self, name: &str) {
        let parent = self.current();
        self.tree.append(
            parent,
            NodeData::Doctype {
                name: name.to_string(),
            },
        );
    }

    /// Name of the current open element, if any
    pub fn current_tag(&self) -> Option<&str> {
        self.open.last().and_then(|id| self.tree.tag_name(*id))
    }

    pub fn finish(self) -> Tree {
        self.tree
    }
}
