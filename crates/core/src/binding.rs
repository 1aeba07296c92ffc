//! Pre-transaction validation for binding mutation batches.
//!
//! Validation is pure and fails fast: a batch that trips any rule is rejected
//! wholesale before the repository opens a transaction, so nothing is ever
//! partially written.

use std::collections::HashSet;

use crate::error::{Result, TetherError};
use crate::group::GroupCatalog;
use crate::models::binding::{
    BindingBatch, BindingDraft, BindingUpdate, NewBinding, RankOperator, ValidatedBatch,
};

/// Maximum insert+update rows per batch, and maximum roles per rule.
pub const MAX_BINDINGS_PER_WRITE: usize = 25;

/// Validate a mutation batch against the group catalog and the server's live
/// role catalog. The role set must come from a fresh directory fetch, not a
/// cache: a stale or deleted role id rejects the whole batch.
pub fn validate_batch(
    batch: &BindingBatch,
    catalog: &GroupCatalog,
    server_roles: &HashSet<String>,
) -> Result<ValidatedBatch> {
    if batch.is_empty() {
        return Err(TetherError::Validation("no bindings provided".into()));
    }

    if batch.insert.len() + batch.update.len() > MAX_BINDINGS_PER_WRITE {
        return Err(TetherError::Validation(format!(
            "too many bindings: at most {MAX_BINDINGS_PER_WRITE} rows per write"
        )));
    }

    let mut validated = ValidatedBatch::default();

    for draft in &batch.insert {
        validated.insert.push(validate_draft(draft, catalog, server_roles)?);
    }

    for draft in &batch.update {
        let id = parse_rule_id(draft.id.as_deref())?;
        validated.update.push(BindingUpdate {
            id,
            binding: validate_draft(draft, catalog, server_roles)?,
        });
    }

    for id in &batch.delete {
        validated.delete.push(parse_rule_id(Some(id))?);
    }

    Ok(validated)
}

/// An update or delete must reference a rule by its numeric id; anything else
/// is rejected rather than silently treated as a new row.
fn parse_rule_id(id: Option<&str>) -> Result<i64> {
    let id = id.ok_or_else(|| TetherError::Validation("binding id is required".into()))?;
    id.parse::<i64>()
        .map_err(|_| TetherError::Validation(format!("invalid binding id '{id}'")))
}

fn validate_draft(
    draft: &BindingDraft,
    catalog: &GroupCatalog,
    server_roles: &HashSet<String>,
) -> Result<NewBinding> {
    let group = catalog
        .get(&draft.group_name)
        .ok_or_else(|| TetherError::Validation(format!("unknown group '{}'", draft.group_name)))?;

    match draft.operator {
        RankOperator::Between => {
            let secondary = draft.secondary_rank.ok_or_else(|| {
                TetherError::Validation("secondary rank is required for the between operator".into())
            })?;
            if secondary <= draft.rank {
                return Err(TetherError::Validation(
                    "secondary rank must be greater than the primary rank".into(),
                ));
            }
        }
        _ => {
            if draft.secondary_rank.is_some() {
                return Err(TetherError::Validation(
                    "secondary rank is only allowed for the between operator".into(),
                ));
            }
        }
    }

    let rank_count = group.rank_count();
    for rank in std::iter::once(draft.rank).chain(draft.secondary_rank) {
        if rank < 0 || rank > rank_count {
            return Err(TetherError::Validation(format!(
                "rank {rank} is outside 0..={rank_count} for group '{}'",
                draft.group_name
            )));
        }
    }

    if draft.roles.is_empty() || draft.roles.len() > MAX_BINDINGS_PER_WRITE {
        return Err(TetherError::Validation(format!(
            "a binding must map to between 1 and {MAX_BINDINGS_PER_WRITE} roles"
        )));
    }

    for role in &draft.roles {
        if !server_roles.contains(role) {
            return Err(TetherError::Validation(format!(
                "role '{role}' does not exist in this server"
            )));
        }
    }

    Ok(NewBinding {
        group_name: draft.group_name.clone(),
        operator: draft.operator,
        rank: draft.rank,
        secondary_rank: draft.secondary_rank,
        roles: draft.roles.clone(),
    })
}
