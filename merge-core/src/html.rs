//! `HtmlContent`: a reference [`NodeMerger`] implementation exercising the
//! generic core, per spec.md §4.2 and SPEC_FULL.md §6.2. This is **not**
//! an HTML parser or serializer — it models just enough of an element/
//! text/comment content domain to drive three-way content merge.

use std::fmt::Debug;

use indexmap::IndexMap;
use similar::{DiffTag, TextDiff};

use crate::config::MergeConfig;
use crate::error::ContentConflict;
use crate::node_merger::NodeMerger;

/// Reserved for the external text-alignment matcher (out of scope here, per
/// spec.md §1) to mark ids it synthesizes, so they stay distinguishable
/// from author-supplied ids (spec.md §6, "Generated id format").
pub const GENERATED_ID_PREFIX: &str = "gen:";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum HtmlContent {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
}

/// Dispatches on node kind; mixed kinds always conflict (spec.md §4.2).
pub struct HtmlNodeMerger {
    config: MergeConfig,
}

impl HtmlNodeMerger {
    pub fn new(config: MergeConfig) -> Self {
        HtmlNodeMerger { config }
    }
}

impl Default for HtmlNodeMerger {
    fn default() -> Self {
        HtmlNodeMerger::new(MergeConfig::default())
    }
}

impl<K> NodeMerger<K, HtmlContent> for HtmlNodeMerger
where
    K: Debug + Clone,
{
    fn merge_content(
        &self,
        base: &HtmlContent,
        first: &HtmlContent,
        second: &HtmlContent,
        id: &K,
    ) -> Result<HtmlContent, ContentConflict<K, HtmlContent>> {
        let conflict = || ContentConflict {
            id: id.clone(),
            base: base.clone(),
            first: first.clone(),
            second: second.clone(),
        };
        match (base, first, second) {
            (
                HtmlContent::Element { tag: tb, attrs: ab },
                HtmlContent::Element { tag: t1, attrs: a1 },
                HtmlContent::Element { tag: t2, attrs: a2 },
            ) => {
                let tag = merge_scalar(tb, t1, t2).ok_or_else(conflict)?;
                let attrs = merge_attrs(ab, a1, a2).ok_or_else(conflict)?;
                Ok(HtmlContent::Element { tag, attrs })
            }
            (HtmlContent::Text(tb), HtmlContent::Text(t1), HtmlContent::Text(t2)) => {
                merge_text(tb, t1, t2, &self.config).map(HtmlContent::Text).ok_or_else(conflict)
            }
            (HtmlContent::Comment(cb), HtmlContent::Comment(c1), HtmlContent::Comment(c2)) => {
                merge_scalar(cb, c1, c2).map(HtmlContent::Comment).ok_or_else(conflict)
            }
            _ => Err(conflict()),
        }
    }

    fn node_equals(&self, a: &HtmlContent, b: &HtmlContent) -> bool {
        match (a, b) {
            (
                HtmlContent::Element { tag: t1, attrs: a1 },
                HtmlContent::Element { tag: t2, attrs: a2 },
            ) => t1 == t2 && attrs_equal(a1, a2),
            (HtmlContent::Text(x), HtmlContent::Text(y)) => x == y,
            (HtmlContent::Comment(x), HtmlContent::Comment(y)) => x == y,
            _ => false,
        }
    }
}

fn attrs_equal(a: &IndexMap<String, String>, b: &IndexMap<String, String>) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// The "Null merger" scalar rule (spec.md §4.2): both sides unchanged keeps
/// base, one side changed wins, both sides agreeing on the same change
/// wins, otherwise `None` (conflict).
fn merge_scalar<T: Clone + PartialEq>(base: &T, first: &T, second: &T) -> Option<T> {
    match (base == first, base == second) {
        (true, true) => Some(base.clone()),
        (false, true) => Some(first.clone()),
        (true, false) => Some(second.clone()),
        (false, false) => (first == second).then(|| first.clone()),
    }
}

/// Three-way attribute-map merge (spec.md §4.2): union of names in
/// insertion order base-then-first-then-second, scalar three-way rule per
/// name over the optional values, merged absence deletes the attribute.
fn merge_attrs(
    base: &IndexMap<String, String>,
    first: &IndexMap<String, String>,
    second: &IndexMap<String, String>,
) -> Option<IndexMap<String, String>> {
    let mut names: IndexMap<&String, ()> = IndexMap::new();
    for k in base.keys().chain(first.keys()).chain(second.keys()) {
        names.entry(k).or_insert(());
    }
    let mut out = IndexMap::new();
    for name in names.into_keys() {
        let b = base.get(name).cloned();
        let f = first.get(name).cloned();
        let s = second.get(name).cloned();
        match merge_scalar(&b, &f, &s)? {
            Some(v) => {
                out.insert(name.clone(), v);
            }
            None => {}
        }
    }
    Some(out)
}

struct Hunk {
    start: usize,
    end: usize,
    replacement: String,
}

fn hunks(base: &[char], other: &[char]) -> Vec<Hunk> {
    let diff = TextDiff::from_slices(base, other);
    diff.ops()
        .iter()
        .filter(|op| op.tag() != DiffTag::Equal)
        .map(|op| {
            let old = op.old_range();
            let new = op.new_range();
            Hunk {
                start: old.start,
                end: old.end,
                replacement: other[new].iter().collect(),
            }
        })
        .collect()
}

/// Character-level three-way text merge (spec.md §4.2): diff base→first and
/// base→second into non-overlapping edit hunks against base, apply both;
/// overlapping hunks that disagree conflict. `config` is accepted for
/// parity with the reference tunables even though this implementation
/// merges by exact hunk overlap rather than fuzzy patch matching.
fn merge_text(base: &str, first: &str, second: &str, config: &MergeConfig) -> Option<String> {
    let _ = config;
    if first == base {
        return Some(second.to_string());
    }
    if second == base {
        return Some(first.to_string());
    }
    if first == second {
        return Some(first.to_string());
    }

    let base_chars: Vec<char> = base.chars().collect();
    let first_chars: Vec<char> = first.chars().collect();
    let second_chars: Vec<char> = second.chars().collect();
    let h1 = hunks(&base_chars, &first_chars);
    let h2 = hunks(&base_chars, &second_chars);

    let mut touched: Vec<Option<usize>> = vec![None; base_chars.len()];
    for (i, h) in h1.iter().enumerate() {
        for slot in touched.iter_mut().take(h.end.min(base_chars.len())).skip(h.start) {
            *slot = Some(i);
        }
    }
    let mut touched_by_second: Vec<Option<usize>> = vec![None; base_chars.len()];
    for (i, h) in h2.iter().enumerate() {
        for slot in touched_by_second
            .iter_mut()
            .take(h.end.min(base_chars.len()))
            .skip(h.start)
        {
            *slot = Some(i);
        }
    }

    let mut out = String::new();
    let mut i = 0;
    while i < base_chars.len() {
        match (touched[i], touched_by_second[i]) {
            (None, None) => {
                out.push(base_chars[i]);
                i += 1;
            }
            (Some(hi), None) => {
                let h = &h1[hi];
                out.push_str(&h.replacement);
                i = h.end.max(i + 1);
            }
            (None, Some(hi)) => {
                let h = &h2[hi];
                out.push_str(&h.replacement);
                i = h.end.max(i + 1);
            }
            (Some(a), Some(b)) => {
                let ha = &h1[a];
                let hb = &h2[b];
                if ha.start == hb.start && ha.end == hb.end && ha.replacement == hb.replacement {
                    out.push_str(&ha.replacement);
                    i = ha.end.max(i + 1);
                } else {
                    return None;
                }
            }
        }
    }
    // trailing pure-insert hunks (start == end == base_chars.len()) never
    // get visited by the index walk above, so they bypass the overlap check
    // that (Some, Some) applies to every other position; apply the same
    // agree-or-conflict rule to them explicitly here.
    let trailing = |hunks: &[Hunk]| -> Option<&str> {
        hunks
            .iter()
            .find(|h| h.start == base_chars.len() && h.end == base_chars.len())
            .map(|h| h.replacement.as_str())
    };
    match (trailing(&h1), trailing(&h2)) {
        (None, None) => {}
        (Some(r), None) | (None, Some(r)) => out.push_str(r),
        (Some(r1), Some(r2)) => {
            if r1 == r2 {
                out.push_str(r1);
            } else {
                return None;
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)]) -> HtmlContent {
        HtmlContent::Element {
            tag: tag.to_string(),
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn mixed_kinds_conflict() {
        let m = HtmlNodeMerger::default();
        let base = element("div", &[]);
        let first = HtmlContent::Text("hi".into());
        let second = element("div", &[]);
        assert!(m.merge_content(&base, &first, &second, &"x").is_err());
    }

    #[test]
    fn attrs_merge_disjoint_changes() {
        let m = HtmlNodeMerger::default();
        let base = element("div", &[("class", "a")]);
        let first = element("div", &[("class", "a"), ("id", "x")]);
        let second = element("div", &[("class", "b")]);
        let merged = m.merge_content(&base, &first, &second, &"n").unwrap();
        match merged {
            HtmlContent::Element { attrs, .. } => {
                assert_eq!(attrs.get("class"), Some(&"b".to_string()));
                assert_eq!(attrs.get("id"), Some(&"x".to_string()));
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn attr_deleted_on_one_side_is_removed() {
        let m = HtmlNodeMerger::default();
        let base = element("div", &[("title", "t")]);
        let first = element("div", &[]);
        let second = element("div", &[("title", "t")]);
        let merged = m.merge_content(&base, &first, &second, &"n").unwrap();
        match merged {
            HtmlContent::Element { attrs, .. } => assert!(!attrs.contains_key("title")),
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn text_merges_disjoint_edits() {
        let m = HtmlNodeMerger::default();
        let base = HtmlContent::Text("hello world".into());
        let first = HtmlContent::Text("hello there world".into());
        let second = HtmlContent::Text("hello world!".into());
        let merged = m.merge_content(&base, &first, &second, &"n").unwrap();
        assert_eq!(merged, HtmlContent::Text("hello there world!".into()));
    }

    #[test]
    fn text_conflicts_on_overlapping_edits() {
        let m = HtmlNodeMerger::default();
        let base = HtmlContent::Text("hello world".into());
        let first = HtmlContent::Text("hello brave world".into());
        let second = HtmlContent::Text("hello cruel world".into());
        assert!(m.merge_content(&base, &first, &second, &"n").is_err());
    }

    #[test]
    fn text_conflicts_on_divergent_trailing_inserts() {
        let m = HtmlNodeMerger::default();
        let base = HtmlContent::Text("ab".into());
        let first = HtmlContent::Text("abX".into());
        let second = HtmlContent::Text("abY".into());
        assert!(m.merge_content(&base, &first, &second, &"n").is_err());
    }

    #[test]
    fn text_merges_agreeing_trailing_inserts() {
        let m = HtmlNodeMerger::default();
        let base = HtmlContent::Text("abc".into());
        let first = HtmlContent::Text("aXbcY".into());
        let second = HtmlContent::Text("abcY".into());
        let merged = m.merge_content(&base, &first, &second, &"n").unwrap();
        assert_eq!(merged, HtmlContent::Text("aXbcY".into()));
    }

    #[test]
    fn node_equals_is_order_insensitive_on_attrs() {
        let m = HtmlNodeMerger::default();
        let a = element("div", &[("a", "1"), ("b", "2")]);
        let b = element("div", &[("b", "2"), ("a", "1")]);
        assert!(NodeMerger::<&str, _>::node_equals(&m, &a, &b));
    }
}
