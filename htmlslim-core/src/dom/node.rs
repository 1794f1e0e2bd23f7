//! Node payloads stored in the tree arena.

use serde::{Deserialize, Serialize};

/// Tags that carry tabular semantics and are exempt from collapsing and
/// pruning in the table-aware pipeline.
pub const TABLE_STRUCTURE_TAGS: [&str; 6] = ["table", "tbody", "thead", "tr", "td", "th"];

/// Elements that never have children or an end tag.
pub const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is emitted verbatim, without escaping.
pub const RAW_TEXT_TAGS: [&str; 6] = ["script", "style", "xmp", "iframe", "noembed", "noframes"];

pub fn is_void_tag(tag_name: &str) -> bool {
    VOID_TAGS.contains(&tag_name)
}

pub fn is_raw_text_tag(tag_name: &str) -> bool {
    RAW_TEXT_TAGS.contains(&tag_name)
}

pub fn is_table_structure_tag(tag_name: &str) -> bool {
    TABLE_STRUCTURE_TAGS.contains(&tag_name)
}

/// Ordered attribute mapping. Insertion order is the source order and is
/// preserved through serialization; keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Set an attribute, replacing the value in place if the key exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Keep only the attributes whose name satisfies `keep`. Returns how many
    /// were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|(key, _)| keep(key));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.set(key, value);
        }
        attributes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag_name: String,
    pub attributes: Attributes,
}

impl ElementData {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(tag_name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Tree root; has no parent and is never removed
    Document,
    Doctype { name: String },
    Element(ElementData),
    Text(String),
    Comment(String),
}

impl NodeData {
    pub fn element(tag_name: impl Into<String>) -> Self {
        NodeData::Element(ElementData::new(tag_name))
    }

    pub fn text(content: impl Into<String>) -> Self {
        NodeData::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match self {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|element| element.tag_name.as_str())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, NodeData::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeData::Text(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, NodeData::Comment(_))
    }
}
