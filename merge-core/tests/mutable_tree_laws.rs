//! Mutable-tree laws from spec.md §8, run as whole-scenario integration
//! tests (teacher convention: property-style checks over the public API
//! live under `tests/`, not alongside the unit that implements them).

use merge_core::{Addressable, Mutable, MutableTree, TreeError};

fn sample() -> MutableTree<&'static str, &'static str> {
    let mut t = MutableTree::new();
    t.insert("r", "r", None, None).unwrap();
    t.insert("a", "a", Some("r"), None).unwrap();
    t.insert("b", "b", Some("r"), None).unwrap();
    t.insert("c", "c", Some("r"), None).unwrap();
    t.insert("d", "d", Some("a"), None).unwrap();
    t
}

#[test]
fn insert_then_delete_round_trips() {
    let base = sample();
    let mut t = base.clone();
    t.insert("x", "x", Some("a"), Some(0)).unwrap();
    t.delete(&"x").unwrap();
    assert_eq!(t, base);
}

#[test]
fn move_to_own_position_is_a_no_op() {
    let base = sample();
    let mut t = base.clone();
    let idx = t.get(&"r").unwrap().children().iter().position(|c| *c == "a").unwrap();
    t.move_node(&"a", &"r", Some(idx)).unwrap();
    assert_eq!(t, base);
}

#[test]
fn move_out_and_back_restores_the_tree() {
    let base = sample();
    let mut t = base.clone();
    t.move_node(&"d", &"c", None).unwrap();
    t.move_node(&"d", &"a", Some(0)).unwrap();
    assert_eq!(t, base);
}

#[test]
fn moving_into_a_descendant_fails_and_leaves_the_tree_unchanged() {
    let base = sample();
    let mut t = base.clone();
    let err = t.move_node(&"a", &"d", None).unwrap_err();
    assert!(matches!(err, TreeError::InvalidMove { .. }));
    assert_eq!(t, base);
}

#[test]
fn deleted_ids_are_unreachable() {
    let mut t = sample();
    t.delete(&"a").unwrap();
    assert!(!t.contains(&"a"));
    assert!(!t.contains(&"d"));
    assert!(matches!(t.get(&"a"), Err(TreeError::NodeNotFound("a"))));
}
