//! [`TreeMerger`]: the three-way tree merge algorithm (spec.md §4.4), the
//! hardest and largest component.
//!
//! Implementation note (see DESIGN.md for the full writeup): this crate
//! realizes the PCS synchronized-cursor algorithm as two passes rather than
//! one combined recursive walk:
//!
//! 1. **Classification** — for every id appearing in any of the three
//!    trees, decide once whether it survives into the merged tree, what its
//!    merged content is, and which parent it naturally belongs under. This
//!    pass folds together the "Node merge" deletion-state table and the
//!    delete-vs-move disambiguation that spec.md's "Post-child-list checks"
//!    perform as a second validation pass — `MovedOutOfDeletedSubtree` is
//!    detected here directly (a node whose would-be parent was deleted, but
//!    whose surviving-branch parent differs from base, is rescued rather
//!    than deleted) rather than re-derived from a separate whole-list scan.
//! 2. **Sequencing** — for each surviving parent, order its children by
//!    walking the base/first/second child lists in sync (the literal
//!    cursor algorithm, restricted to siblings already known to share that
//!    parent), appending any rescued children deterministically at the
//!    end.
//!
//! Because nothing is written to the output tree until both passes
//! succeed, an error at any point discards the entire in-progress merge —
//! matching spec.md §7's "no partial result is observable".

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, info, trace, warn};

use crate::conflict_handler::{CollidingNodeResolution, ConflictHandler, PositionResolution};
use crate::edit_script::{NodeOrigins, Origin};
use crate::error::{CollidingContent, MergeError, StructuralConflict};
use crate::mutable_tree::{Mutable, MutableTree};
use crate::node_merger::NodeMerger;
use crate::tree::{Addressable, Traversable};

/// What a single id resolves to once base/first/second have been compared.
struct Verdict<K, C> {
    survives: bool,
    content: Option<C>,
    /// The parent this id's *contributing branch* places it under — before
    /// any re-homing past a deleted ancestor.
    natural_parent: Option<K>,
}

/// Runs one merge. Construct via [`merge`] rather than directly.
pub struct TreeMerger<'a, K, C, NM, CH> {
    base: &'a MutableTree<K, C>,
    first: &'a MutableTree<K, C>,
    second: &'a MutableTree<K, C>,
    node_merger: &'a NM,
    conflict_handler: &'a mut CH,
    verdicts: HashMap<K, Verdict<K, C>>,
    origins: NodeOrigins<K>,
}

/// Three-way merge: `merge(base, first, second) -> merged tree | conflict`
/// (spec.md §6.1). Returns the merged tree plus the per-node origin
/// annotations [`crate::edit_script::generate`] needs to derive an edit
/// script.
pub fn merge<K, C, NM, CH>(
    base: &MutableTree<K, C>,
    first: &MutableTree<K, C>,
    second: &MutableTree<K, C>,
    node_merger: &NM,
    conflict_handler: &mut CH,
) -> Result<(MutableTree<K, C>, NodeOrigins<K>), MergeError<K, C>>
where
    K: Clone + Eq + Hash + Debug,
    C: Clone + Debug,
    NM: NodeMerger<K, C>,
    CH: ConflictHandler<K, C>,
{
    let result = TreeMerger {
        base,
        first,
        second,
        node_merger,
        conflict_handler,
        verdicts: HashMap::new(),
        origins: NodeOrigins::new(),
    }
    .run();

    match &result {
        Ok((merged, _)) => info!(nodes = preorder(merged).len(), conflict = false, "merge finished"),
        Err(err) => info!(conflict = true, error = %err, "merge finished"),
    }
    result
}

#[derive(Debug, Clone, PartialEq)]
enum Slot<K> {
    Node(K),
    End,
}

fn slot_at<K: Clone>(seq: &[K], idx: usize) -> Slot<K> {
    seq.get(idx).cloned().map(Slot::Node).unwrap_or(Slot::End)
}

/// Repositions a cursor to just past `target`, searching only from `from`
/// onward so a seek can never move a cursor backward (which would re-expose
/// already-emitted nodes and loop forever when branches reorder siblings
/// differently).
fn seek<K: PartialEq>(seq: &[K], target: &K, from: usize) -> usize {
    seq[from.min(seq.len())..]
        .iter()
        .position(|x| x == target)
        .map(|p| from + p + 1)
        .unwrap_or(from)
}

fn preorder<K, C>(tree: &impl Addressable<K, C>) -> Vec<K>
where
    K: Clone + Eq + Hash + Debug,
{
    let mut out = Vec::new();
    if let Some(root) = tree.root() {
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            let children = tree.children(&id).expect("id came from this tree's own index");
            out.push(id.clone());
            for c in children.iter().rev() {
                stack.push(c.clone());
            }
        }
    }
    out
}

impl<'a, K, C, NM, CH> TreeMerger<'a, K, C, NM, CH>
where
    K: Clone + Eq + Hash + Debug,
    C: Clone + Debug,
    NM: NodeMerger<K, C>,
    CH: ConflictHandler<K, C>,
{
    fn run(mut self) -> Result<(MutableTree<K, C>, NodeOrigins<K>), MergeError<K, C>> {
        if self.base.is_empty() && self.first.is_empty() && self.second.is_empty() {
            return Ok((MutableTree::new(), self.origins));
        }
        let root = self.resolve_root()?;

        let mut seen = HashSet::new();
        let mut union_ids = Vec::new();
        for id in preorder(self.base)
            .into_iter()
            .chain(preorder(self.first))
            .chain(preorder(self.second))
        {
            if seen.insert(id.clone()) {
                union_ids.push(id);
            }
        }

        for id in &union_ids {
            let verdict = self.classify(id)?;
            self.verdicts.insert(id.clone(), verdict);
        }

        let mut target_parent: HashMap<K, Option<K>> = HashMap::new();
        for id in &union_ids {
            if self.verdicts[id].survives {
                let tp = self.resolve_target_parent(id)?;
                target_parent.insert(id.clone(), tp);
            }
        }

        let mut children_of: HashMap<K, Vec<K>> = HashMap::new();
        for id in &union_ids {
            if *id == root || !self.verdicts[id].survives {
                continue;
            }
            if let Some(parent) = target_parent[id].clone() {
                children_of.entry(parent).or_default().push(id.clone());
            }
        }

        let mut ordered_children: HashMap<K, Vec<K>> = HashMap::new();
        let parents: Vec<K> = children_of.keys().cloned().collect();
        for parent in parents {
            let members = children_of.remove(&parent).expect("just listed");
            let normal_set: HashSet<K> = members
                .iter()
                .filter(|m| self.verdicts[*m].natural_parent.as_ref() == Some(&parent))
                .cloned()
                .collect();
            let rescued: Vec<K> = members
                .iter()
                .filter(|m| !normal_set.contains(*m))
                .cloned()
                .collect();
            debug!(parent = ?parent, normal = normal_set.len(), rescued = rescued.len(), "merging child list");

            let base_seq = filtered_children(self.base, &parent, &normal_set);
            let first_seq = filtered_children(self.first, &parent, &normal_set);
            let second_seq = filtered_children(self.second, &parent, &normal_set);
            let mut order = self.sequence_children(&base_seq, &first_seq, &second_seq)?;

            let mut rescued_sorted = rescued;
            rescued_sorted.sort_by_key(|id| union_ids.iter().position(|u| u == id).unwrap_or(usize::MAX));
            order.extend(rescued_sorted);

            ordered_children.insert(parent, order);
        }

        let mut merged = MutableTree::new();
        let root_content = self.verdicts[&root].content.clone().expect("root survives");
        merged.insert(root_content, root.clone(), None, None)?;
        let mut queue = VecDeque::new();
        queue.push_back(root);
        while let Some(parent) = queue.pop_front() {
            if let Some(kids) = ordered_children.get(&parent) {
                for child in kids {
                    let content = self.verdicts[child].content.clone().expect("listed as surviving");
                    merged.insert(content, child.clone(), Some(parent.clone()), None)?;
                    queue.push_back(child.clone());
                }
            }
        }

        Ok((merged, self.origins))
    }

    fn resolve_root(&self) -> Result<K, MergeError<K, C>> {
        match (self.base.root(), self.first.root(), self.second.root()) {
            (Some(b), Some(f), Some(s)) if b == f && f == s => Ok(b.clone()),
            _ => Err(MergeError::Internal(
                "base/first/second must share one stable root id".to_string(),
            )),
        }
    }

    fn classify(&mut self, id: &K) -> Result<Verdict<K, C>, MergeError<K, C>> {
        let in_base = self.base.contains(id);
        let in_first = self.first.contains(id);
        let in_second = self.second.contains(id);
        trace!(id = ?id, in_base, in_first, in_second, "classifying node");

        match (in_base, in_first, in_second) {
            (true, true, true) => self.classify_common(id),
            (false, true, true) => self.classify_colliding_insert(id),
            (true, false, true) => self.classify_deleted_one_side(id, DeletedSide::First),
            (true, true, false) => self.classify_deleted_one_side(id, DeletedSide::Second),
            (true, false, false) => Ok(Verdict {
                survives: false,
                content: None,
                natural_parent: self.base.parent_id(id)?,
            }),
            (false, true, false) => self.classify_pure_insert(id, Side::First),
            (false, false, true) => self.classify_pure_insert(id, Side::Second),
            (false, false, false) => unreachable!("id came from the union of the three trees"),
        }
    }

    fn classify_common(&mut self, id: &K) -> Result<Verdict<K, C>, MergeError<K, C>> {
        let base_c = self.base.content(id)?.clone();
        let first_c = self.first.content(id)?.clone();
        let second_c = self.second.content(id)?.clone();

        let base_eq_first = self.node_merger.node_equals(&base_c, &first_c);
        let base_eq_second = self.node_merger.node_equals(&base_c, &second_c);
        let (content, update_origin) = match (base_eq_first, base_eq_second) {
            (true, true) => (base_c.clone(), Origin::None),
            (false, true) => (first_c.clone(), Origin::First),
            (true, false) => (second_c.clone(), Origin::Second),
            (false, false) => {
                if self.node_merger.node_equals(&first_c, &second_c) {
                    (first_c.clone(), Origin::Both)
                } else {
                    match self.node_merger.merge_content(&base_c, &first_c, &second_c, id) {
                        Ok(c) => (c, Origin::Both),
                        Err(conflict) => {
                            let resolved = self.conflict_handler.conflicting_content(conflict)?;
                            warn!(id = ?id, "conflicting_content resolved in place");
                            (resolved, Origin::Both)
                        }
                    }
                }
            }
        };
        self.origins.update_origin.insert(id.clone(), update_origin);

        let base_p = self.base.parent_id(id)?;
        let first_p = self.first.parent_id(id)?;
        let second_p = self.second.parent_id(id)?;
        let natural_parent = self.resolve_parent_triple(id, base_p, first_p, second_p)?;

        Ok(Verdict {
            survives: true,
            content: Some(content),
            natural_parent,
        })
    }

    fn classify_colliding_insert(&mut self, id: &K) -> Result<Verdict<K, C>, MergeError<K, C>> {
        let first_c = self.first.content(id)?.clone();
        let second_c = self.second.content(id)?.clone();
        let content = if self.node_merger.node_equals(&first_c, &second_c) {
            first_c
        } else {
            let resolved = self.conflict_handler.colliding_content(CollidingContent {
                id: id.clone(),
                first: first_c,
                second: second_c,
            })?;
            warn!(id = ?id, "colliding_content resolved in place");
            resolved
        };
        self.origins.insert_origin.insert(id.clone(), Origin::Both);

        let first_p = self.first.parent_id(id)?;
        let second_p = self.second.parent_id(id)?;
        let natural_parent = if first_p == second_p {
            first_p
        } else {
            let resolution = self.conflict_handler.conflicting_position(id)?;
            warn!(id = ?id, resolution = ?resolution, "conflicting_position resolved in place");
            match resolution {
                PositionResolution::KeepFirst => first_p,
                PositionResolution::KeepSecond => second_p,
            }
        };

        Ok(Verdict {
            survives: true,
            content: Some(content),
            natural_parent,
        })
    }

    fn classify_deleted_one_side(&mut self, id: &K, deleted: DeletedSide) -> Result<Verdict<K, C>, MergeError<K, C>> {
        let (surviving_tree, surviving_origin) = match deleted {
            DeletedSide::First => (self.second, Origin::Second),
            DeletedSide::Second => (self.first, Origin::First),
        };
        let base_c = self.base.content(id)?;
        let surv_c = surviving_tree.content(id)?.clone();
        let base_p = self.base.parent_id(id)?;
        let surv_p = surviving_tree.parent_id(id)?;

        let content_changed = !self.node_merger.node_equals(base_c, &surv_c);
        let moved = surv_p != base_p;

        if content_changed {
            return Err(StructuralConflict::DeleteChange { id: id.clone() }.into());
        }
        if moved {
            self.origins.reorder_origin.insert(id.clone(), surviving_origin);
            return Ok(Verdict {
                survives: true,
                content: Some(surv_c),
                natural_parent: surv_p,
            });
        }
        Ok(Verdict {
            survives: false,
            content: None,
            natural_parent: base_p,
        })
    }

    fn classify_pure_insert(&mut self, id: &K, side: Side) -> Result<Verdict<K, C>, MergeError<K, C>> {
        let (tree, origin) = match side {
            Side::First => (self.first, Origin::First),
            Side::Second => (self.second, Origin::Second),
        };
        let content = tree.content(id)?.clone();
        let parent = tree.parent_id(id)?;
        self.origins.insert_origin.insert(id.clone(), origin);
        Ok(Verdict {
            survives: true,
            content: Some(content),
            natural_parent: parent,
        })
    }

    fn resolve_parent_triple(
        &mut self,
        id: &K,
        base_p: Option<K>,
        first_p: Option<K>,
        second_p: Option<K>,
    ) -> Result<Option<K>, MergeError<K, C>> {
        let f_diff = first_p != base_p;
        let s_diff = second_p != base_p;
        match (f_diff, s_diff) {
            (false, false) => Ok(base_p),
            (true, false) => Ok(first_p),
            (false, true) => Ok(second_p),
            (true, true) => {
                if first_p == second_p {
                    Ok(first_p)
                } else {
                    let resolution = self.conflict_handler.conflicting_position(id)?;
                    warn!(id = ?id, resolution = ?resolution, "conflicting_position resolved in place");
                    match resolution {
                        PositionResolution::KeepFirst => Ok(first_p),
                        PositionResolution::KeepSecond => Ok(second_p),
                    }
                }
            }
        }
    }

    /// Climbs `natural_parent` links past deleted ancestors until it finds
    /// one that survives, or the root. Guards against the pathological
    /// cross-move cycles spec.md §4.4 calls out ("Cyclic merged tree").
    fn resolve_target_parent(&self, id: &K) -> Result<Option<K>, MergeError<K, C>> {
        let mut visited = HashSet::new();
        let mut cur = self.verdicts[id].natural_parent.clone();
        loop {
            match cur {
                None => return Ok(None),
                Some(p) => {
                    if !visited.insert(p.clone()) {
                        return Err(StructuralConflict::CyclicMerge { id: id.clone() }.into());
                    }
                    match self.verdicts.get(&p) {
                        Some(v) if v.survives => return Ok(Some(p)),
                        Some(v) => cur = v.natural_parent.clone(),
                        None => return Ok(Some(p)),
                    }
                }
            }
        }
    }

    /// Orders one parent's surviving "normal" children by walking the
    /// base/first/second child-id sequences in sync — the literal PCS
    /// cursor algorithm (spec.md §4.4 "Per-step decision"), restricted to
    /// ordering since survival was already decided in [`Self::classify`].
    fn sequence_children(
        &mut self,
        base_seq: &[K],
        first_seq: &[K],
        second_seq: &[K],
    ) -> Result<Vec<K>, MergeError<K, C>> {
        let mut i = 0;
        let mut j = 0;
        let mut k = 0;
        let mut out = Vec::new();

        loop {
            let n0 = slot_at(base_seq, i);
            let n1 = slot_at(first_seq, j);
            let n2 = slot_at(second_seq, k);
            trace!(?n0, ?n1, ?n2, i, j, k, "cursor decision");
            if n1 == Slot::End && n2 == Slot::End {
                break;
            }

            if n1 == n2 {
                if let Slot::Node(a) = &n1 {
                    if n1 != n0 {
                        self.origins.reorder_origin.insert(a.clone(), Origin::Both);
                    }
                    out.push(a.clone());
                    i = seek(base_seq, a, i);
                }
                j += 1;
                k += 1;
                continue;
            }

            let diff1 = n1 != n0;
            let diff2 = n2 != n0;

            if diff1 && diff2 {
                match (n1.clone(), n2.clone()) {
                    (Slot::Node(a), Slot::Node(b)) if !self.base.contains(&a) && !self.base.contains(&b) => {
                        let resolution = self.conflict_handler.colliding_node(&a, &b)?;
                        warn!(first = ?a, second = ?b, resolution = ?resolution, "colliding_node resolved in place");
                        match resolution {
                            CollidingNodeResolution::FirstThenSecond => {
                                self.origins.reorder_origin.insert(a.clone(), Origin::First);
                                out.push(a.clone());
                                j += 1;
                            }
                            CollidingNodeResolution::SecondThenFirst => {
                                self.origins.reorder_origin.insert(b.clone(), Origin::Second);
                                out.push(b.clone());
                                k += 1;
                            }
                        }
                    }
                    (Slot::Node(a), Slot::Node(b)) => {
                        let resolution = self.conflict_handler.conflicting_position(&a)?;
                        warn!(node = ?a, resolution = ?resolution, "conflicting_position resolved in place");
                        match resolution {
                            PositionResolution::KeepFirst => {
                                self.origins.reorder_origin.insert(a.clone(), Origin::First);
                                out.push(a.clone());
                                i = seek(base_seq, &a, i);
                                k = seek(second_seq, &a, k);
                                j += 1;
                            }
                            PositionResolution::KeepSecond => {
                                self.origins.reorder_origin.insert(b.clone(), Origin::Second);
                                out.push(b.clone());
                                i = seek(base_seq, &b, i);
                                j = seek(first_seq, &b, j);
                                k += 1;
                            }
                        }
                    }
                    (Slot::Node(a), Slot::End) => {
                        self.origins.reorder_origin.insert(a.clone(), Origin::First);
                        out.push(a.clone());
                        i = seek(base_seq, &a, i);
                        j += 1;
                    }
                    (Slot::End, Slot::Node(b)) => {
                        self.origins.reorder_origin.insert(b.clone(), Origin::Second);
                        out.push(b.clone());
                        i = seek(base_seq, &b, i);
                        k += 1;
                    }
                    (Slot::End, Slot::End) => unreachable!("loop guard excludes this"),
                }
            } else if diff1 {
                if let Slot::Node(a) = &n1 {
                    self.origins.reorder_origin.insert(a.clone(), Origin::First);
                    out.push(a.clone());
                    i = seek(base_seq, a, i);
                    k = seek(second_seq, a, k);
                }
                j += 1;
            } else {
                if let Slot::Node(b) = &n2 {
                    self.origins.reorder_origin.insert(b.clone(), Origin::Second);
                    out.push(b.clone());
                    i = seek(base_seq, b, i);
                    j = seek(first_seq, b, j);
                }
                k += 1;
            }
        }
        Ok(out)
    }
}

enum DeletedSide {
    First,
    Second,
}

enum Side {
    First,
    Second,
}

fn filtered_children<K, C>(tree: &MutableTree<K, C>, parent: &K, keep: &HashSet<K>) -> Vec<K>
where
    K: Clone + Eq + Hash + Debug,
{
    if !tree.contains(parent) {
        return Vec::new();
    }
    tree.children(parent)
        .expect("just checked contains")
        .iter()
        .filter(|c| keep.contains(*c))
        .cloned()
        .collect()
}
