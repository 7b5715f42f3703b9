//! The numbered scenario table from spec.md §8, run end to end through
//! `merge`. Scenarios 1, 2, 4, 5 and 6 are also exercised as unit tests
//! inside `merger.rs`, where they were written alongside the algorithm
//! that implements them; scenario 3 (concurrent updates on disjoint
//! nodes) only has an integration-level check, so it lives here.

use merge_core::{merge, Addressable, DefaultConflictHandler, Mutable, MutableTree, NullNodeMerger};

fn leaf(id: &'static str, parent: Option<&'static str>) -> (&'static str, &'static str, Option<&'static str>) {
    (id, id, parent)
}

fn build(nodes: &[(&'static str, &'static str, Option<&'static str>)]) -> MutableTree<&'static str, &'static str> {
    let mut t = MutableTree::new();
    for (id, content, parent) in nodes {
        t.insert(*content, *id, *parent, None).unwrap();
    }
    t
}

#[test]
fn scenario_3_concurrent_updates_on_disjoint_nodes() {
    let base = build(&[leaf("r", None), leaf("a", Some("r")), leaf("b", Some("a")), leaf("c", Some("r"))]);
    let mut first = MutableTree::new();
    first.insert("R", "r", None, None).unwrap();
    first.insert("a", "a", Some("r"), None).unwrap();
    first.insert("b", "b", Some("a"), None).unwrap();
    first.insert("c", "c", Some("r"), None).unwrap();
    let mut second = MutableTree::new();
    second.insert("r", "r", None, None).unwrap();
    second.insert("a", "a", Some("r"), None).unwrap();
    second.insert("b", "b", Some("a"), None).unwrap();
    second.insert("C", "c", Some("r"), None).unwrap();

    let nm = NullNodeMerger::from_partial_eq();
    let mut ch = DefaultConflictHandler;
    let (merged, _) = merge(&base, &first, &second, &nm, &mut ch).unwrap();

    assert_eq!(merged.get(&"r").unwrap().content(), &"R");
    assert_eq!(merged.get(&"c").unwrap().content(), &"C");
    assert_eq!(merged.get(&"b").unwrap().content(), &"b");
    assert_eq!(merged.get(&"r").unwrap().children(), &["a", "c"]);
}
