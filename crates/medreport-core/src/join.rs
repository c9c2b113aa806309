//! Enumerated clauses: "a, b, and c" from a set of flags.

use medreport_model::Section;
use medreport_rules::LabelTable;
use tracing::warn;

/// Joins the labels of every truthy flag, in flag order.
///
/// Flags without a label are logged and skipped.
pub fn join(labels: &LabelTable, flags: &Section) -> String {
    let mut unknown = Vec::new();
    join_into(labels, flags, &mut unknown)
}

/// Like [`join`], collecting the keys that had no label.
pub fn join_into(labels: &LabelTable, flags: &Section, unknown: &mut Vec<String>) -> String {
    let mut joined = String::new();
    for (key, value) in flags.iter() {
        if !value.is_truthy() {
            continue;
        }
        let Some(label) = labels.get(key) else {
            warn!(key, "no label for flag; left out of the list");
            unknown.push(key.to_string());
            continue;
        };
        if label.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push_str(", ");
        }
        joined.push_str(label);
    }
    replace_last(&joined, ",", ", and")
}

/// Replaces the last occurrence of `old` in `text`.
pub fn replace_last(text: &str, old: &str, new: &str) -> String {
    match text.rfind(old) {
        Some(at) => format!("{}{new}{}", &text[..at], &text[at + old.len()..]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels() -> LabelTable {
        [("a", "x"), ("b", "y"), ("c", "z")].into_iter().collect()
    }

    #[test]
    fn joins_with_final_and() {
        let flags = Section::new().with("a", true).with("b", true).with("c", true);
        assert_eq!(join(&labels(), &flags), "x, y, and z");
    }

    #[test]
    fn one_and_zero_items() {
        let one = Section::new().with("a", true).with("b", false);
        assert_eq!(join(&labels(), &one), "x");
        let none = Section::new().with("a", false).with("b", 0);
        assert_eq!(join(&labels(), &none), "");
    }

    #[test]
    fn two_items_keep_the_comma() {
        let flags = Section::new().with("b", true).with("a", true);
        assert_eq!(join(&labels(), &flags), "y, and x");
    }

    #[test]
    fn unknown_keys_are_skipped_and_reported() {
        let flags = Section::new().with("a", true).with("q", true).with("c", true);
        let mut unknown = Vec::new();
        assert_eq!(join_into(&labels(), &flags, &mut unknown), "x, and z");
        assert_eq!(unknown, vec!["q".to_string()]);
    }

    #[test]
    fn label_with_comma_moves_the_and() {
        let labels: LabelTable = [("a", "x"), ("b", "y, or w")].into_iter().collect();
        let flags = Section::new().with("a", true).with("b", true);
        assert_eq!(join(&labels, &flags), "x, y, and or w");
    }

    #[test]
    fn replace_last_only_touches_the_last() {
        assert_eq!(replace_last("a, b, c", ",", ", and"), "a, b, and c");
        assert_eq!(replace_last("abc", ",", ", and"), "abc");
    }

    proptest! {
        #[test]
        fn join_lists_each_selected_label(selected in proptest::collection::vec(any::<bool>(), 3)) {
            let keys = ["a", "b", "c"];
            let flags: Section = keys
                .iter()
                .zip(&selected)
                .map(|(key, flag)| (*key, *flag))
                .collect();
            let joined = join(&labels(), &flags);
            let count = selected.iter().filter(|flag| **flag).count();
            match count {
                0 => prop_assert_eq!(joined, ""),
                1 => prop_assert!(!joined.contains(',')),
                _ => {
                    prop_assert_eq!(joined.matches(',').count(), count - 1);
                    prop_assert!(joined.contains(", and "));
                }
            }
        }
    }
}
