//! [`EditScriptGenerator`]: derives insert/delete/move/update edits from a
//! base child list and a merged child list plus origin annotations, per
//! spec.md §4.5.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::tree::Addressable;

/// Which side(s) caused a change, attached to merged nodes by the merger to
/// drive edit-script derivation (spec.md glossary: "Origin").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    None,
    First,
    Second,
    Both,
}

/// One edit-script operation. `Insert`/`Move` positions are indices into
/// the *merged* child list, per spec.md §4.5's position tie-break rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit<K, C> {
    Insert {
        id: K,
        content: C,
        parent: K,
        pos: usize,
        origin: Origin,
    },
    Delete {
        id: K,
        origin: Origin,
    },
    Move {
        id: K,
        parent: K,
        pos: usize,
        origin: Origin,
    },
    Update {
        id: K,
        content: C,
        origin: Origin,
    },
}

pub trait EditHandler<K, C> {
    fn handle(&mut self, edit: Edit<K, C>);
}

/// An [`EditHandler`] that records edits in emission order.
#[derive(Debug, Default, Clone)]
pub struct EditLog<K, C> {
    pub edits: Vec<Edit<K, C>>,
}

impl<K, C> EditHandler<K, C> for EditLog<K, C> {
    fn handle(&mut self, edit: Edit<K, C>) {
        self.edits.push(edit);
    }
}

/// Per-node origin annotations the merger records while building the
/// merged tree (spec.md §4.5: `insertOrigin`, `reorderOrigin`,
/// `updateOrigin`). Absent entries default to [`Origin::None`].
#[derive(Debug, Clone, Default)]
pub struct NodeOrigins<K: Eq + Hash> {
    pub insert_origin: HashMap<K, Origin>,
    pub reorder_origin: HashMap<K, Origin>,
    pub update_origin: HashMap<K, Origin>,
}

impl<K: Eq + Hash> NodeOrigins<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_origin_of(&self, id: &K) -> Origin {
        self.insert_origin.get(id).copied().unwrap_or_default()
    }

    pub fn reorder_origin_of(&self, id: &K) -> Origin {
        self.reorder_origin.get(id).copied().unwrap_or_default()
    }

    pub fn update_origin_of(&self, id: &K) -> Origin {
        self.update_origin.get(id).copied().unwrap_or_default()
    }
}

fn collect_ids<K, C>(tree: &impl Addressable<K, C>) -> HashSet<K>
where
    K: Clone + Eq + Hash + Debug,
{
    let mut out = HashSet::new();
    if let Some(root) = tree.root() {
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            if let Ok(children) = tree.children(&id) {
                stack.extend(children.iter().cloned());
            }
            out.insert(id);
        }
    }
    out
}

/// Walks `merged` top-down, emitting insert/move/update edits for every
/// parent's child list before recursing (spec.md §4.5 rule 1), then walks
/// `base` to emit deletes for every subtree root that did not survive
/// (rule 2, "delayed delete": since all moves were already emitted in the
/// first pass, a node extracted from a deleted subtree has already been
/// relocated by the time its old home's delete edit is emitted).
pub fn generate<K, C>(
    base: &impl Addressable<K, C>,
    merged: &impl Addressable<K, C>,
    origins: &NodeOrigins<K>,
    handler: &mut impl EditHandler<K, C>,
) where
    K: Clone + Eq + Hash + Debug,
    C: Clone + Debug,
{
    let base_ids = collect_ids(base);
    let merged_ids = collect_ids(merged);

    if let Some(root) = merged.root() {
        generate_for_parent(base, merged, origins, handler, root, &base_ids, &merged_ids);
    }

    for id in &base_ids {
        if merged_ids.contains(id) {
            continue;
        }
        let parent = base.parent_id(id).expect("id came from base's own index");
        let parent_survives = match &parent {
            None => false,
            Some(p) => !base_ids.contains(p) || merged_ids.contains(p),
        };
        if parent_survives || parent.is_none() {
            handler.handle(Edit::Delete {
                id: id.clone(),
                origin: Origin::None,
            });
        }
    }
}

fn generate_for_parent<K, C>(
    base: &impl Addressable<K, C>,
    merged: &impl Addressable<K, C>,
    origins: &NodeOrigins<K>,
    handler: &mut impl EditHandler<K, C>,
    parent_id: &K,
    base_ids: &HashSet<K>,
    merged_ids: &HashSet<K>,
) where
    K: Clone + Eq + Hash + Debug,
    C: Clone + Debug,
{
    let merged_children: Vec<K> = merged
        .children(parent_id)
        .expect("parent_id came from merged's own index")
        .to_vec();

    for (pos, child_id) in merged_children.iter().enumerate() {
        if !base_ids.contains(child_id) {
            let content = merged
                .content(child_id)
                .expect("child_id came from merged's own index")
                .clone();
            handler.handle(Edit::Insert {
                id: child_id.clone(),
                content,
                parent: parent_id.clone(),
                pos,
                origin: origins.insert_origin_of(child_id),
            });
        } else {
            let base_parent = base
                .parent_id(child_id)
                .expect("child_id is known to be in base");
            let moved_parent = base_parent.as_ref() != Some(parent_id);
            let reorder_origin = origins.reorder_origin_of(child_id);
            if moved_parent || reorder_origin != Origin::None {
                handler.handle(Edit::Move {
                    id: child_id.clone(),
                    parent: parent_id.clone(),
                    pos,
                    origin: reorder_origin,
                });
            }

            let update_origin = origins.update_origin_of(child_id);
            if update_origin != Origin::None {
                let content = merged
                    .content(child_id)
                    .expect("child_id came from merged's own index")
                    .clone();
                handler.handle(Edit::Update {
                    id: child_id.clone(),
                    content,
                    origin: update_origin,
                });
            }
        }

        generate_for_parent(base, merged, origins, handler, child_id, base_ids, merged_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutable_tree::{Mutable, MutableTree};

    fn tree(pairs: &[(&'static str, Option<&'static str>)]) -> MutableTree<&'static str, &'static str> {
        let mut t = MutableTree::new();
        for (id, parent) in pairs {
            t.insert(id, id, *parent, None).unwrap();
        }
        t
    }

    #[test]
    fn insert_and_delete_replay() {
        // base: a (b c d); target: a (i b d)  — insert i@0, delete c.
        let base = tree(&[("a", None), ("b", Some("a")), ("c", Some("a")), ("d", Some("a"))]);
        let mut merged = MutableTree::new();
        merged.insert("a", "a", None, None).unwrap();
        merged.insert("i", "i", Some("a"), None).unwrap();
        merged.insert("b", "b", Some("a"), None).unwrap();
        merged.insert("d", "d", Some("a"), None).unwrap();

        let mut origins = NodeOrigins::new();
        origins.insert_origin.insert("i", Origin::First);

        let mut log = EditLog::default();
        generate(&base, &merged, &origins, &mut log);

        let inserts = log
            .edits
            .iter()
            .filter(|e| matches!(e, Edit::Insert { .. }))
            .count();
        let deletes = log
            .edits
            .iter()
            .filter(|e| matches!(e, Edit::Delete { .. }))
            .count();
        assert_eq!(inserts, 1);
        assert_eq!(deletes, 1);
    }

    #[test]
    fn move_across_parents_is_one_edit() {
        // a (g (b c d) h (e f)) -> a (g (b d) h (e c f)): move c.
        let base = tree(&[
            ("a", None),
            ("g", Some("a")),
            ("b", Some("g")),
            ("c", Some("g")),
            ("d", Some("g")),
            ("h", Some("a")),
            ("e", Some("h")),
            ("f", Some("h")),
        ]);
        let mut merged = MutableTree::new();
        merged.insert("a", "a", None, None).unwrap();
        merged.insert("g", "g", Some("a"), None).unwrap();
        merged.insert("b", "b", Some("g"), None).unwrap();
        merged.insert("d", "d", Some("g"), None).unwrap();
        merged.insert("h", "h", Some("a"), None).unwrap();
        merged.insert("e", "e", Some("h"), None).unwrap();
        merged.insert("c", "c", Some("h"), Some(1)).unwrap();
        merged.insert("f", "f", Some("h"), None).unwrap();

        let origins = NodeOrigins::new();
        let mut log = EditLog::default();
        generate(&base, &merged, &origins, &mut log);

        let moves: Vec<_> = log
            .edits
            .iter()
            .filter(|e| matches!(e, Edit::Move { id, .. } if *id == "c"))
            .collect();
        assert_eq!(moves.len(), 1);
    }
}
