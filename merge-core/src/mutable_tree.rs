//! [`MutableTree`]: the owning, mutable implementation of the tree
//! abstractions from [`crate::tree`], per spec.md §4.1's `Mutable` tier.

use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::{InvalidMoveReason, TreeError};
use crate::tree::{Addressable, Node, Traversable};

/// An owning, ordered, by-id tree. Backs both the merge inputs and the
/// output tree under construction.
#[derive(Debug, Clone)]
pub struct MutableTree<K, C> {
    nodes: IndexMap<K, Node<K, C>>,
    root: Option<K>,
}

impl<K, C> PartialEq for MutableTree<K, C>
where
    K: Hash + Eq,
    C: PartialEq,
{
    /// Structural equality: same root, same id→node mapping (map order is
    /// irrelevant; child order within a node is not, since `Node` carries
    /// `children: Vec<K>`).
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.nodes == other.nodes
    }
}


impl<K, C> Default for MutableTree<K, C> {
    fn default() -> Self {
        MutableTree {
            nodes: IndexMap::new(),
            root: None,
        }
    }
}

impl<K, C> MutableTree<K, C> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, C> Traversable<K, C> for MutableTree<K, C>
where
    K: Hash + Eq,
{
    fn root(&self) -> Option<&K> {
        self.root.as_ref()
    }

    fn node(&self, id: &K) -> Option<&Node<K, C>> {
        self.nodes.get(id)
    }
}

impl<K, C> Addressable<K, C> for MutableTree<K, C> where K: Clone + Eq + Hash + Debug {}

/// Tier 3 of spec.md §4.1: structural mutation with the exact contracts the
/// spec lays out for `insert`/`delete`/`update`/`move`.
pub trait Mutable<K, C>: Addressable<K, C>
where
    K: Clone + Eq + Hash + Debug,
{
    /// `pos = None` means append (`DEFAULT_POS`).
    fn insert(
        &mut self,
        content: C,
        id: K,
        parent_id: Option<K>,
        pos: Option<usize>,
    ) -> Result<(), TreeError<K>>;

    fn delete(&mut self, id: &K) -> Result<(), TreeError<K>>;

    fn update(&mut self, content: C, id: &K) -> Result<(), TreeError<K>>;

    fn move_node(&mut self, id: &K, parent_id: &K, pos: Option<usize>) -> Result<(), TreeError<K>>;
}

impl<K, C> MutableTree<K, C>
where
    K: Clone + Eq + Hash + Debug,
{
    /// True if `maybe_ancestor` is `node` itself or one of its ancestors.
    fn is_ancestor_or_self(&self, maybe_ancestor: &K, node: &K) -> bool {
        let mut cur = Some(node.clone());
        while let Some(id) = cur {
            if &id == maybe_ancestor {
                return true;
            }
            cur = self.nodes.get(&id).and_then(|n| n.parent.clone());
        }
        false
    }
}

impl<K, C> Mutable<K, C> for MutableTree<K, C>
where
    K: Clone + Eq + Hash + Debug,
{
    fn insert(
        &mut self,
        content: C,
        id: K,
        parent_id: Option<K>,
        pos: Option<usize>,
    ) -> Result<(), TreeError<K>> {
        if self.nodes.contains_key(&id) {
            return Err(TreeError::DuplicateId(id));
        }
        match parent_id {
            None => {
                if !self.is_empty() {
                    // A second root has no valid attachment point; there is
                    // nowhere in an existing tree for a parentless node to
                    // go, so we report it the same way as any other
                    // out-of-range position.
                    return Err(TreeError::InvalidPosition {
                        pos: pos.unwrap_or(0),
                        max: 0,
                    });
                }
                self.nodes.insert(
                    id.clone(),
                    Node {
                        id: id.clone(),
                        content,
                        parent: None,
                        children: Vec::new(),
                    },
                );
                self.root = Some(id);
                Ok(())
            }
            Some(parent_id) => {
                let max = self
                    .nodes
                    .get(&parent_id)
                    .ok_or_else(|| TreeError::node_not_found(parent_id.clone()))?
                    .children
                    .len();
                let pos = pos.unwrap_or(max);
                if pos > max {
                    return Err(TreeError::InvalidPosition { pos, max });
                }
                self.nodes.insert(
                    id.clone(),
                    Node {
                        id: id.clone(),
                        content,
                        parent: Some(parent_id.clone()),
                        children: Vec::new(),
                    },
                );
                self.nodes
                    .get_mut(&parent_id)
                    .expect("just checked above")
                    .children
                    .insert(pos, id);
                Ok(())
            }
        }
    }

    fn delete(&mut self, id: &K) -> Result<(), TreeError<K>> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::node_not_found(id.clone()));
        }
        let parent = self.nodes.get(id).expect("checked above").parent.clone();
        match parent {
            Some(parent_id) => {
                if let Some(p) = self.nodes.get_mut(&parent_id) {
                    p.children.retain(|c| c != id);
                }
            }
            None => self.root = None,
        }
        let mut stack = vec![id.clone()];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.shift_remove(&cur) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    fn update(&mut self, content: C, id: &K) -> Result<(), TreeError<K>> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::node_not_found(id.clone()))?;
        node.content = content;
        Ok(())
    }

    fn move_node(&mut self, id: &K, parent_id: &K, pos: Option<usize>) -> Result<(), TreeError<K>> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::node_not_found(id.clone()));
        }
        if !self.nodes.contains_key(parent_id) {
            return Err(TreeError::node_not_found(parent_id.clone()));
        }
        if self.root.as_ref() == Some(id) {
            return Err(TreeError::InvalidMove {
                mover: id.clone(),
                target: parent_id.clone(),
                reason: InvalidMoveReason::MovingRoot,
            });
        }
        if id == parent_id || self.is_ancestor_or_self(id, parent_id) {
            return Err(TreeError::InvalidMove {
                mover: id.clone(),
                target: parent_id.clone(),
                reason: InvalidMoveReason::Cycle,
            });
        }

        let old_parent_id = self
            .nodes
            .get(id)
            .expect("checked above")
            .parent
            .clone()
            .expect("non-root has a parent (checked above)");
        let same_parent = &old_parent_id == parent_id;

        let max = if same_parent {
            self.nodes
                .get(&old_parent_id)
                .expect("parent of a live node exists")
                .children
                .len()
                - 1
        } else {
            self.nodes
                .get(parent_id)
                .expect("checked above")
                .children
                .len()
        };
        let pos = pos.unwrap_or(max);
        if pos > max {
            return Err(TreeError::InvalidPosition { pos, max });
        }

        let idx = self
            .nodes
            .get(&old_parent_id)
            .expect("parent of a live node exists")
            .children
            .iter()
            .position(|c| c == id)
            .expect("node is indexed under its recorded parent");
        self.nodes
            .get_mut(&old_parent_id)
            .expect("just looked up")
            .children
            .remove(idx);
        self.nodes
            .get_mut(parent_id)
            .expect("checked above")
            .children
            .insert(pos, id.clone());
        self.nodes.get_mut(id).expect("checked above").parent = Some(parent_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MutableTree<&'static str, &'static str> {
        let mut t = MutableTree::new();
        t.insert("r", "r", None, None).unwrap();
        t.insert("a", "a", Some("r"), None).unwrap();
        t.insert("b", "b", Some("r"), None).unwrap();
        t.insert("c", "c", Some("r"), None).unwrap();
        t
    }

    #[test]
    fn insert_delete_round_trip() {
        let base = sample();
        let mut t = base.clone();
        t.insert("x", "x", Some("r"), Some(1)).unwrap();
        t.delete(&"x").unwrap();
        assert_eq!(t, base);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut t = sample();
        assert!(matches!(
            t.insert("dup", "a", Some("r"), None),
            Err(TreeError::DuplicateId("a"))
        ));
    }

    #[test]
    fn insert_missing_parent() {
        let mut t = sample();
        assert!(matches!(
            t.insert("x", "x", Some("zzz"), None),
            Err(TreeError::NodeNotFound("zzz"))
        ));
    }

    #[test]
    fn move_same_parent_is_reorder() {
        let mut t = sample();
        t.move_node(&"c", &"r", Some(0)).unwrap();
        assert_eq!(t.get(&"r").unwrap().children(), &["c", "a", "b"]);
    }

    #[test]
    fn move_no_op_restores_itself() {
        let base = sample();
        let mut t = base.clone();
        t.move_node(&"b", &"r", Some(1)).unwrap();
        assert_eq!(t, base);
    }

    #[test]
    fn move_across_parents_and_back() {
        let mut t = sample();
        t.insert("d", "d", Some("a"), None).unwrap();
        let before = t.clone();
        t.move_node(&"d", &"r", Some(1)).unwrap();
        t.move_node(&"d", &"a", Some(0)).unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn move_cycle_rejected() {
        let mut t = sample();
        t.insert("d", "d", Some("a"), None).unwrap();
        let before = t.clone();
        let err = t.move_node(&"a", &"d", None).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidMove {
                reason: InvalidMoveReason::Cycle,
                ..
            }
        ));
        assert_eq!(t, before);
    }

    #[test]
    fn move_root_rejected() {
        let mut t = sample();
        let err = t.move_node(&"r", &"a", None).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidMove {
                reason: InvalidMoveReason::MovingRoot,
                ..
            }
        ));
    }

    #[test]
    fn deleted_ids_unreachable() {
        let mut t = sample();
        t.delete(&"a").unwrap();
        assert!(!t.contains(&"a"));
        assert!(matches!(t.get(&"a"), Err(TreeError::NodeNotFound("a"))));
    }

    #[test]
    fn delete_root_empties_tree() {
        let mut t = sample();
        t.delete(&"r").unwrap();
        assert!(t.is_empty());
    }
}
