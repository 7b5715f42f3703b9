//! Ordered labeled tree abstractions: [`Traversable`] and [`Addressable`].
//!
//! Mutation lives in [`crate::mutable_tree`]; this module only defines the
//! read-only capability tiers spec.md §4.1 describes, plus the [`Node`] type
//! both tiers expose. Keeping read and write capabilities as separate traits
//! lets the merger depend on addressable-read only, per spec.md §9.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::TreeError;

/// A single node: its own content plus the shape of its place in the tree.
#[derive(Debug, Clone)]
pub struct Node<K, C> {
    pub(crate) id: K,
    pub(crate) content: C,
    pub(crate) parent: Option<K>,
    pub(crate) children: Vec<K>,
}

impl<K, C> PartialEq for Node<K, C>
where
    K: PartialEq,
    C: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.content == other.content
            && self.parent == other.parent
            && self.children == other.children
    }
}

impl<K: Clone, C> Node<K, C> {
    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn parent(&self) -> Option<&K> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[K] {
        &self.children
    }
}

/// Tier 1: expose the root and let callers walk from node to node.
pub trait Traversable<K, C> {
    fn root(&self) -> Option<&K>;
    fn node(&self, id: &K) -> Option<&Node<K, C>>;

    fn is_empty(&self) -> bool {
        self.root().is_none()
    }
}

/// Tier 2: lookup by id, with [`TreeError::NodeNotFound`] on unknown ids.
pub trait Addressable<K, C>: Traversable<K, C>
where
    K: Clone + Eq + Hash + Debug,
{
    fn contains(&self, id: &K) -> bool {
        self.node(id).is_some()
    }

    fn get(&self, id: &K) -> Result<&Node<K, C>, TreeError<K>> {
        self.node(id).ok_or_else(|| TreeError::node_not_found(id.clone()))
    }

    /// The id of `id`'s parent, or `None` if `id` is the root.
    ///
    /// Fails with `NodeNotFound` if `id` itself is unknown (spec.md §4.1).
    fn parent_id(&self, id: &K) -> Result<Option<K>, TreeError<K>> {
        Ok(self.get(id)?.parent().cloned())
    }

    fn children(&self, id: &K) -> Result<&[K], TreeError<K>> {
        Ok(self.get(id)?.children())
    }

    fn content(&self, id: &K) -> Result<&C, TreeError<K>> {
        Ok(self.get(id)?.content())
    }
}
