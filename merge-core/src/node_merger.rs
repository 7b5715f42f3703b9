//! [`NodeMerger`]: the pluggable per-node content merge contract from
//! spec.md §4.2, plus the null reference implementation.

use std::fmt::Debug;

use crate::error::ContentConflict;

/// Three-way merge over an opaque content type `C`, plus the equality the
/// algorithm uses to decide "changed vs. unchanged" (spec.md §4.2).
pub trait NodeMerger<K: Debug, C> {
    /// May be called when no real merge is needed (two or three sides
    /// equal); implementations are expected to shortcut that case rather
    /// than relying on callers to skip it.
    fn merge_content(&self, base: &C, first: &C, second: &C, id: &K) -> Result<C, ContentConflict<K, C>>;

    fn node_equals(&self, a: &C, b: &C) -> bool;
}

/// Parameterized by a content comparator; implements the "Null merger" rule
/// from spec.md §4.2: if both branches equal base, keep base; if exactly
/// one side differs, take that side; if both differ but agree, take either;
/// otherwise `ContentConflict`.
pub struct NullNodeMerger<F> {
    eq: F,
}

impl<F> NullNodeMerger<F> {
    pub fn new(eq: F) -> Self {
        NullNodeMerger { eq }
    }
}

impl<C: PartialEq> NullNodeMerger<fn(&C, &C) -> bool> {
    pub fn from_partial_eq() -> Self {
        NullNodeMerger::new(PartialEq::eq as fn(&C, &C) -> bool)
    }
}

impl<K, C, F> NodeMerger<K, C> for NullNodeMerger<F>
where
    K: Debug + Clone,
    C: Clone + Debug,
    F: Fn(&C, &C) -> bool,
{
    fn merge_content(&self, base: &C, first: &C, second: &C, id: &K) -> Result<C, ContentConflict<K, C>> {
        let base_eq_first = (self.eq)(base, first);
        let base_eq_second = (self.eq)(base, second);
        match (base_eq_first, base_eq_second) {
            (true, true) => Ok(base.clone()),
            (false, true) => Ok(first.clone()),
            (true, false) => Ok(second.clone()),
            (false, false) => {
                if (self.eq)(first, second) {
                    Ok(first.clone())
                } else {
                    Err(ContentConflict {
                        id: id.clone(),
                        base: base.clone(),
                        first: first.clone(),
                        second: second.clone(),
                    })
                }
            }
        }
    }

    fn node_equals(&self, a: &C, b: &C) -> bool {
        (self.eq)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_unchanged_keeps_base() {
        let m = NullNodeMerger::from_partial_eq();
        let out = m.merge_content(&1, &1, &1, &"x").unwrap();
        assert_eq!(out, 1);
    }

    #[test]
    fn one_side_changed_wins() {
        let m = NullNodeMerger::from_partial_eq();
        assert_eq!(m.merge_content(&1, &2, &1, &"x").unwrap(), 2);
        assert_eq!(m.merge_content(&1, &1, &2, &"x").unwrap(), 2);
    }

    #[test]
    fn both_sides_agree_on_change() {
        let m = NullNodeMerger::from_partial_eq();
        assert_eq!(m.merge_content(&1, &2, &2, &"x").unwrap(), 2);
    }

    #[test]
    fn both_sides_diverge_conflicts() {
        let m = NullNodeMerger::from_partial_eq();
        assert!(m.merge_content(&1, &2, &3, &"x").is_err());
    }
}
