//! Tether role sync — rank-to-role resolution, diffing, and the member sync engine.

pub mod diff;
pub mod resolve;
pub mod sync;

pub use diff::{diff_roles, RoleDiff};
pub use resolve::resolve_entitled_roles;
pub use sync::{GuildDirectory, RankProvider, RoleSyncEngine, SyncSummary};
