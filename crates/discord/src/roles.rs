//! Role scope rules: which of a server's roles the bot may grant or revoke.

use std::collections::HashSet;

use crate::models::GuildRole;

pub const ADMINISTRATOR: u64 = 1 << 3;
pub const MANAGE_ROLES: u64 = 1 << 28;

pub fn has_permission(bits: u64, flag: u64) -> bool {
    bits & ADMINISTRATOR == ADMINISTRATOR || bits & flag == flag
}

/// Whether the bot, whose highest role is `bot_role`, may manage `role`.
///
/// Integration-managed roles and the server default role are out of scope,
/// as is anything at or above the bot's own position.
pub fn can_manage_role(bot_role: &GuildRole, role: &GuildRole, guild_id: &str) -> bool {
    !role.managed
        && role.id != guild_id
        && role.position < bot_role.position
        && has_permission(bot_role.permission_bits(), MANAGE_ROLES)
}

/// The bot's highest role, given the full role list and the bot's role ids.
/// Every member implicitly holds the `@everyone` role (id == guild id).
pub fn bot_highest_role<'a>(
    all_roles: &'a [GuildRole],
    bot_role_ids: &HashSet<String>,
    guild_id: &str,
) -> Option<&'a GuildRole> {
    all_roles
        .iter()
        .filter(|r| bot_role_ids.contains(&r.id) || r.id == guild_id)
        .max_by_key(|r| r.position)
}

/// The set of role ids the bot may grant or revoke in this server.
pub fn manageable_role_ids(
    all_roles: &[GuildRole],
    bot_role_ids: &HashSet<String>,
    guild_id: &str,
) -> HashSet<String> {
    let Some(bot_role) = bot_highest_role(all_roles, bot_role_ids, guild_id) else {
        return HashSet::new();
    };
    all_roles
        .iter()
        .filter(|r| can_manage_role(bot_role, r, guild_id))
        .map(|r| r.id.clone())
        .collect()
}

/// Permission bits a member holds: the union over their roles plus the
/// server default role.
pub fn member_permission_bits(
    all_roles: &[GuildRole],
    member_role_ids: &[String],
    guild_id: &str,
) -> u64 {
    all_roles
        .iter()
        .filter(|r| r.id == guild_id || member_role_ids.iter().any(|id| id == &r.id))
        .fold(0, |bits, r| bits | r.permission_bits())
}

/// Whether a member's roles grant Administrator.
pub fn member_is_admin(all_roles: &[GuildRole], member_role_ids: &[String], guild_id: &str) -> bool {
    member_permission_bits(all_roles, member_role_ids, guild_id) & ADMINISTRATOR == ADMINISTRATOR
}
