//! Binding resolution: a member's rank plus the rule set determines the role
//! set they are entitled to. Pure; no transport or storage involved.

use std::collections::HashSet;

use tether_core::models::binding::{RankBinding, RankOperator};

/// Whether one rule's predicate holds for `rank`.
///
/// Rank 0 means "not a group member" and matches nothing unless a rule
/// explicitly targets rank 0 with `=`.
pub fn binding_matches(rank: i64, binding: &RankBinding) -> bool {
    if rank == 0 {
        return binding.operator == RankOperator::Eq && binding.rank == 0;
    }
    match binding.operator {
        RankOperator::Eq => rank == binding.rank,
        RankOperator::Gte => rank >= binding.rank,
        RankOperator::Lte => rank <= binding.rank,
        RankOperator::Between => {
            binding.rank <= rank && rank <= binding.secondary_rank.unwrap_or(binding.rank)
        }
    }
}

/// Union of the roles from every rule for `group_name` whose predicate holds.
/// Rules are additive, not prioritized.
pub fn resolve_entitled_roles(
    rank: i64,
    group_name: &str,
    bindings: &[RankBinding],
) -> HashSet<String> {
    bindings
        .iter()
        .filter(|b| b.group_name == group_name && binding_matches(rank, b))
        .flat_map(|b| b.roles.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(operator: RankOperator, rank: i64, secondary: Option<i64>, roles: &[&str]) -> RankBinding {
        RankBinding {
            id: 0,
            server_id: "srv".into(),
            group_name: "Eden".into(),
            operator,
            rank,
            secondary_rank: secondary,
            roles: roles.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn set(roles: &[&str]) -> HashSet<String> {
        roles.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn union_of_matching_rules() {
        let rules = vec![
            binding(RankOperator::Eq, 5, None, &["A"]),
            binding(RankOperator::Gte, 3, None, &["B"]),
        ];
        assert_eq!(resolve_entitled_roles(5, "Eden", &rules), set(&["A", "B"]));
        assert_eq!(resolve_entitled_roles(2, "Eden", &rules), set(&[]));
        assert_eq!(resolve_entitled_roles(3, "Eden", &rules), set(&["B"]));
    }

    #[test]
    fn rules_for_other_groups_are_ignored() {
        let mut other = binding(RankOperator::Gte, 1, None, &["X"]);
        other.group_name = "Vanguard".into();
        let rules = vec![other, binding(RankOperator::Gte, 1, None, &["A"])];
        assert_eq!(resolve_entitled_roles(2, "Eden", &rules), set(&["A"]));
    }

    #[test]
    fn between_bounds_are_inclusive() {
        let rules = vec![binding(RankOperator::Between, 2, Some(4), &["A"])];
        assert!(resolve_entitled_roles(2, "Eden", &rules).contains("A"));
        assert!(resolve_entitled_roles(3, "Eden", &rules).contains("A"));
        assert!(resolve_entitled_roles(4, "Eden", &rules).contains("A"));
        assert!(resolve_entitled_roles(1, "Eden", &rules).is_empty());
        assert!(resolve_entitled_roles(5, "Eden", &rules).is_empty());
    }

    #[test]
    fn rank_zero_matches_nothing_by_default() {
        let rules = vec![
            binding(RankOperator::Lte, 3, None, &["A"]),
            binding(RankOperator::Gte, 0, None, &["B"]),
            binding(RankOperator::Between, 0, Some(2), &["C"]),
        ];
        assert!(resolve_entitled_roles(0, "Eden", &rules).is_empty());
    }

    #[test]
    fn explicit_eq_zero_rule_matches_non_members() {
        let rules = vec![binding(RankOperator::Eq, 0, None, &["Guest"])];
        assert_eq!(resolve_entitled_roles(0, "Eden", &rules), set(&["Guest"]));
    }

    #[test]
    fn gte_is_monotone_in_rank() {
        let rules = vec![binding(RankOperator::Gte, 3, None, &["A"])];
        let mut granted = false;
        for rank in 1..=10 {
            let has = resolve_entitled_roles(rank, "Eden", &rules).contains("A");
            // Once crossed, the threshold never un-grants.
            assert!(!granted || has);
            granted = has;
        }
        assert!(granted);
    }

    #[test]
    fn lte_never_regains_after_loss() {
        let rules = vec![binding(RankOperator::Lte, 3, None, &["A"])];
        let mut lost = false;
        for rank in 1..=10 {
            let has = resolve_entitled_roles(rank, "Eden", &rules).contains("A");
            assert!(!lost || !has);
            lost = !has;
        }
        assert!(lost);
    }
}
