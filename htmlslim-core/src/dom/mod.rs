//! Owned, mutable document tree
//!
//! All nodes live in a single arena owned by [`Tree`] and are addressed by
//! stable [`NodeId`]s. Parser adapters build a tree once per document, the
//! rewrite passes mutate it in place, and the serializer renders it exactly
//! once before it is dropped.

pub mod node;
pub mod tree;

pub use node::{Attributes, ElementData, NodeData, TABLE_STRUCTURE_TAGS};
pub use tree::{NodeId, Tree};
