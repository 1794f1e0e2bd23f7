//! Arena-backed tree with in-place structural edits.
//!
//! Removed nodes vacate their arena slot, so a [`NodeId`] either resolves to
//! a node reachable from the root or to nothing.

use super::node::NodeData;
use std::fmt;

/// Stable index into the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Option<Slot>>,
    live: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only the document root
    pub fn new() -> Self {
        Self {
            slots: vec![Some(Slot {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            })],
            live: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 1
    }

    fn slot(&self, id: NodeId) -> &Slot {
        match self.slots.get(id.0) {
            Some(Some(slot)) => slot,
            _ => panic!("node {id} is not part of the tree"),
        }
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        match self.slots.get_mut(id.0) {
            Some(Some(slot)) => slot,
            _ => panic!("node {id} is not part of the tree"),
        }
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots.get(id.0)?.as_ref().map(|slot| &slot.data)
    }

    /// Payload of a live node. Panics on a removed id.
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.slot(id).data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.slot_mut(id).data
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.data(id).tag_name()
    }

    pub fn is_element_named(&self, id: NodeId, tag_name: &str) -> bool {
        self.tag_name(id) == Some(tag_name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.data(*child).is_element())
    }

    /// Direct element children carrying one of `tag_names`
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        tag_names: &'a [&'a str],
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).iter().copied().filter(move |child| {
            self.tag_name(*child)
                .is_some_and(|tag| tag_names.contains(&tag))
        })
    }

    fn position_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.position_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.position_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Number of ancestors between `id` and the root (the root itself counts)
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// All descendants of `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every live element in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.data(*id).is_element())
            .collect()
    }

    /// Descendant elements of `id` named `tag_name`, in document order
    pub fn find_all(&self, id: NodeId, tag_name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_element_named(*node, tag_name))
            .collect()
    }

    /// First descendant of `id` (document order) matching `predicate`
    pub fn find_first<F>(&self, id: NodeId, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&NodeData) -> bool,
    {
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if predicate(self.data(next)) {
                return Some(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        None
    }

    /// Concatenated text content of `id` and its descendants, document order.
    /// Comments and doctypes contribute nothing.
    pub fn text(&self, id: NodeId) -> String {
        if let NodeData::Text(content) = self.data(id) {
            return content.clone();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeData::Text(content) = self.data(node) {
                out.push_str(content);
            }
        }
        out
    }

    /// Append a new node as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        assert!(self.is_live(parent), "cannot append to removed node {parent}");
        let id = NodeId(self.slots.len());
        self.slots.push(Some(Slot {
            data,
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.slot_mut(parent).children.push(id);
        self.live += 1;
        id
    }

    /// Append text under `parent`, merging into a trailing text child
    pub fn append_text(&mut self, parent: NodeId, content: &str) -> NodeId {
        if let Some(&last) = self.children(parent).last() {
            if let NodeData::Text(existing) = self.data_mut(last) {
                existing.push_str(content);
                return last;
            }
        }
        self.append(parent, NodeData::text(content))
    }

    /// Remove `id` from its parent's child list without freeing it
    fn detach(&mut self, id: NodeId) {
        if let Some((parent, index)) = self.position_in_parent(id) {
            self.slot_mut(parent).children.remove(index);
        }
        self.slot_mut(id).parent = None;
    }

    /// Detach `id` and destroy it together with its whole subtree.
    /// Returns the number of nodes freed.
    pub fn decompose(&mut self, id: NodeId) -> usize {
        assert_ne!(id, self.root(), "the document root cannot be removed");
        self.detach(id);
        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(slot) = self.slots[next.0].take() {
                stack.extend(slot.children);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }

    /// Replace `id` with its children in place, preserving their order and
    /// position. Content is never lost; only the node itself is freed.
    /// Returns the number of children moved up.
    pub fn unwrap(&mut self, id: NodeId) -> usize {
        assert_ne!(id, self.root(), "the document root cannot be unwrapped");
        let (parent, index) = self
            .position_in_parent(id)
            .unwrap_or_else(|| panic!("node {id} is detached"));

        let children = std::mem::take(&mut self.slot_mut(id).children);
        for child in &children {
            self.slot_mut(*child).parent = Some(parent);
        }
        let moved = children.len();
        self.slot_mut(parent)
            .children
            .splice(index..=index, children);

        self.slots[id.0] = None;
        self.live -= 1;
        moved
    }

    /// Check the parent/child relation: every live node except the root is
    /// listed exactly once by its parent and is reachable from the root.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = vec![false; self.slots.len()];
        seen[0] = true;
        let mut reachable = 1;
        for id in self.descendants(self.root()) {
            if std::mem::replace(&mut seen[id.0], true) {
                return Err(format!("node {id} is listed more than once"));
            }
            reachable += 1;
            let parent = self
                .parent(id)
                .ok_or_else(|| format!("node {id} has no parent"))?;
            if !self.children(parent).contains(&id) {
                return Err(format!("node {id} is not a child of its parent {parent}"));
            }
        }
        if reachable != self.live {
            return Err(format!(
                "{} live nodes but only {} reachable from the root",
                self.live, reachable
            ));
        }
        Ok(())
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
