//! Header specificity ordering.
//!
//! Used only among routes that already passed matching, to decide which of
//! several eligible routes is the narrowest match. The result is a preorder:
//! `Equal` means "indistinguishable by headers", not "identical".
//!
//! ```text
//! no rules  <  any rules
//! fewer rules  <  more rules
//! one rule each:   Exists < HeaderPrefix < ExactHeader
//!                  case-insensitive < case-sensitive (same mode)
//! two or more rules each, same count:  Equal
//! ```

use std::cmp::Ordering;

use crate::routing::rule::{HeaderMatchMode, HeaderRule, HeaderRuleSet};

/// Compare two rule sets by how constraining they are.
///
/// `Ordering::Greater` means `a` is more specific than `b`.
pub fn compare_specificity(a: &HeaderRuleSet, b: &HeaderRuleSet) -> Ordering {
    match (a.len(), b.len()) {
        (x, y) if x != y => x.cmp(&y),
        (1, 1) => compare_single(&a.as_slice()[0], &b.as_slice()[0]),
        // Same count, zero or several rules: no deeper discrimination.
        _ => Ordering::Equal,
    }
}

fn compare_single(a: &HeaderRule, b: &HeaderRule) -> Ordering {
    mode_rank(a.mode())
        .cmp(&mode_rank(b.mode()))
        .then_with(|| {
            if a.mode().requires_values() && a.mode() == b.mode() {
                a.is_case_sensitive().cmp(&b.is_case_sensitive())
            } else {
                Ordering::Equal
            }
        })
}

fn mode_rank(mode: HeaderMatchMode) -> u8 {
    match mode {
        HeaderMatchMode::Exists => 0,
        HeaderMatchMode::HeaderPrefix => 1,
        HeaderMatchMode::ExactHeader => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rules: Vec<HeaderRule>) -> HeaderRuleSet {
        HeaderRuleSet::new(rules)
    }

    #[test]
    fn test_any_rule_beats_no_rule() {
        let none = HeaderRuleSet::empty();
        let one = set(vec![HeaderRule::exists("A").unwrap()]);

        assert_eq!(compare_specificity(&one, &none), Ordering::Greater);
        assert_eq!(compare_specificity(&none, &one), Ordering::Less);
        assert_eq!(compare_specificity(&none, &none), Ordering::Equal);
    }

    #[test]
    fn test_more_rules_beat_fewer_regardless_of_content() {
        let two = set(vec![HeaderRule::exists("A").unwrap(), HeaderRule::exists("B").unwrap()]);
        let one = set(vec![HeaderRule::exact("A", ["x"], true).unwrap()]);

        assert_eq!(compare_specificity(&two, &one), Ordering::Greater);
        assert_eq!(compare_specificity(&one, &two), Ordering::Less);
    }

    #[test]
    fn test_single_rule_mode_ladder() {
        let exact = set(vec![HeaderRule::exact("A", ["x"], false).unwrap()]);
        let prefix = set(vec![HeaderRule::prefix("A", ["x"], false).unwrap()]);
        let exists = set(vec![HeaderRule::exists("A").unwrap()]);

        assert_eq!(compare_specificity(&exact, &prefix), Ordering::Greater);
        assert_eq!(compare_specificity(&prefix, &exact), Ordering::Less);
        assert_eq!(compare_specificity(&prefix, &exists), Ordering::Greater);
        assert_eq!(compare_specificity(&exact, &exists), Ordering::Greater);
        assert_eq!(compare_specificity(&exists, &exact), Ordering::Less);
    }

    #[test]
    fn test_case_sensitive_beats_insensitive_within_mode() {
        let sensitive = set(vec![HeaderRule::exact("A", ["x"], true).unwrap()]);
        let insensitive = set(vec![HeaderRule::exact("A", ["x"], false).unwrap()]);
        assert_eq!(compare_specificity(&sensitive, &insensitive), Ordering::Greater);
        assert_eq!(compare_specificity(&insensitive, &sensitive), Ordering::Less);

        // Mode wins over case sensitivity.
        let insensitive_exact = insensitive;
        let sensitive_prefix = set(vec![HeaderRule::prefix("A", ["x"], true).unwrap()]);
        assert_eq!(compare_specificity(&insensitive_exact, &sensitive_prefix), Ordering::Greater);
    }

    #[test]
    fn test_indistinguishable_single_rules_are_equal() {
        let a = set(vec![HeaderRule::exact("A", ["x"], true).unwrap()]);
        let b = set(vec![HeaderRule::exact("B", ["y", "z"], true).unwrap()]);
        assert_eq!(compare_specificity(&a, &b), Ordering::Equal);

        let a = set(vec![HeaderRule::exists("A").unwrap()]);
        let b = set(vec![HeaderRule::exists("B").unwrap()]);
        assert_eq!(compare_specificity(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_multi_rule_sets_of_equal_size_are_equal() {
        let strict = set(vec![
            HeaderRule::exact("A", ["x"], true).unwrap(),
            HeaderRule::exact("B", ["y"], true).unwrap(),
        ]);
        let loose = set(vec![HeaderRule::exists("A").unwrap(), HeaderRule::exists("B").unwrap()]);

        assert_eq!(compare_specificity(&strict, &loose), Ordering::Equal);
        assert_eq!(compare_specificity(&loose, &strict), Ordering::Equal);
    }
}
