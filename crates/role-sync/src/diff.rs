//! Role diffing: the mutations needed to move a member's current roles to
//! the entitled set, bounded by what the bot may actually manage.

use std::collections::HashSet;

/// The mutations to apply. Sorted for deterministic application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl RoleDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the add/remove sets.
///
/// Adds are unfiltered: entitled sets are built from configured roles, which
/// validation already bounded to the server's catalog. Removals are
/// intersected with `manageable`: roles outside the bot's scope are never
/// removed even when not entitled.
pub fn diff_roles(
    current: &HashSet<String>,
    entitled: &HashSet<String>,
    manageable: &HashSet<String>,
) -> RoleDiff {
    let mut to_add: Vec<String> = entitled.difference(current).cloned().collect();
    let mut to_remove: Vec<String> = current
        .difference(entitled)
        .filter(|role| manageable.contains(*role))
        .cloned()
        .collect();
    to_add.sort();
    to_remove.sort();
    RoleDiff { to_add, to_remove }
}
