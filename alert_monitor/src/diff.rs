use std::{collections::HashSet, fmt};

use crate::models::ReferenceKey;

/// What changed between the last snapshot and the current fetch.
///
/// Keys are compared on `reference` alone; `identifier` only rides along for
/// the detail lookup. Both lists keep the order of the set they were taken
/// from (`added` from the current fetch, `removed` from the previous one).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultDiff {
    pub added: Vec<ReferenceKey>,
    pub removed: Vec<ReferenceKey>,
}

impl ResultDiff {
    /// True if nothing appeared or disappeared.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compares two key sets. An absent `previous` means nothing was seen before,
/// so every current key is added.
pub fn make_diff(previous: Option<&[ReferenceKey]>, current: &[ReferenceKey]) -> ResultDiff {
    let Some(previous) = previous else {
        return ResultDiff {
            added: current.to_vec(),
            removed: Vec::new(),
        };
    };

    let before: HashSet<&str> = previous.iter().map(|k| k.reference.as_str()).collect();
    let now: HashSet<&str> = current.iter().map(|k| k.reference.as_str()).collect();

    ResultDiff {
        added: current
            .iter()
            .filter(|k| !before.contains(k.reference.as_str()))
            .cloned()
            .collect(),
        removed: previous
            .iter()
            .filter(|k| !now.contains(k.reference.as_str()))
            .cloned()
            .collect(),
    }
}

impl fmt::Display for ResultDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return writeln!(f, "No changes");
        }
        let mut wrote_any = false;
        for (title, sign, keys) in [("Added", '+', &self.added), ("Removed", '-', &self.removed)] {
            if keys.is_empty() {
                continue;
            }
            if wrote_any {
                writeln!(f)?;
            }
            writeln!(f, "{title} ({})", keys.len())?;
            writeln!(f, "{}", "-".repeat(title.len()))?;
            for key in keys {
                writeln!(f, "{sign} {}  {}", key.reference, key.identifier)?;
            }
            wrote_any = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(reference: &str) -> ReferenceKey {
        ReferenceKey::new(reference, format!("ID-{reference}"))
    }

    #[test]
    fn new_reference_is_added() {
        let diff = make_diff(Some(&[key("A")][..]), &[key("A"), key("B")]);
        assert_eq!(diff.added, vec![key("B")]);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn identifier_change_is_not_a_change() {
        let previous = [ReferenceKey::new("A", "OLD")];
        let current = [ReferenceKey::new("A", "NEW")];
        assert!(make_diff(Some(&previous[..]), &current).is_noop());
    }

    #[test]
    fn display_lists_sections() {
        let diff = make_diff(Some(&[key("A")][..]), &[key("B")]);
        let text = diff.to_string();
        assert!(text.contains("Added (1)\n-----\n+ B  ID-B"));
        assert!(text.contains("Removed (1)\n-------\n- A  ID-A"));
        assert_eq!(ResultDiff::default().to_string(), "No changes\n");
    }

    fn keys() -> impl Strategy<Value = Vec<ReferenceKey>> {
        prop::collection::hash_set("[A-H]", 0..8)
            .prop_map(|refs| refs.into_iter().map(|r| key(&r)).collect())
    }

    proptest! {
        #[test]
        fn without_previous_everything_is_added(current in keys()) {
            let diff = make_diff(None, &current);
            prop_assert_eq!(diff.added, current);
            prop_assert!(diff.removed.is_empty());
        }

        #[test]
        fn membership_matches_set_difference(previous in keys(), current in keys()) {
            let diff = make_diff(Some(&previous[..]), &current);
            for k in previous.iter().chain(current.iter()) {
                let in_prev = previous.iter().any(|p| p.reference == k.reference);
                let in_cur = current.iter().any(|c| c.reference == k.reference);
                prop_assert_eq!(diff.added.iter().any(|a| a.reference == k.reference), in_cur && !in_prev);
                prop_assert_eq!(diff.removed.iter().any(|r| r.reference == k.reference), in_prev && !in_cur);
            }
        }

        #[test]
        fn order_of_inputs_does_not_matter(previous in keys(), current in keys()) {
            let mut shuffled_prev = previous.clone();
            shuffled_prev.reverse();
            let mut shuffled_cur = current.clone();
            shuffled_cur.reverse();

            let refs = |v: &[ReferenceKey]| {
                let mut r: Vec<String> = v.iter().map(|k| k.reference.clone()).collect();
                r.sort();
                r
            };
            let a = make_diff(Some(&previous[..]), &current);
            let b = make_diff(Some(&shuffled_prev[..]), &shuffled_cur);
            prop_assert_eq!(refs(&a.added), refs(&b.added));
            prop_assert_eq!(refs(&a.removed), refs(&b.removed));
        }
    }
}
