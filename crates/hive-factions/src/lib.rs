//! Faction state engine for the hive sector relay.
//!
//! Pure state transitions over [`Faction`](hive_types::Faction) records:
//! creation and identifier aliasing, profile edits, membership and the
//! two-sided relation algorithm. Nothing here performs I/O. Each transition
//! reports the rows it touched so the caller can persist them with
//! per-row upserts.
//!
//! # Modules
//!
//! - [`profile`] -- creation, aliasing, edits, lookups
//! - [`membership`] -- join, leave, accept, promote/demote
//! - [`relations`] -- peace requests, peace, war
//! - [`error`] -- [`FactionError`]

pub mod error;
pub mod membership;
pub mod profile;
pub mod relations;

pub use error::{FactionError, FactionErrorKind};
pub use membership::{
    MemberChange, apply_member_action, member_accept_join, member_leave, member_send_join,
    member_set_leader,
};
pub use profile::{
    add_sector_alias, create_faction, edit_faction, find_by_alias, find_by_tag, set_auto_accept,
};
pub use relations::{RelationRow, RelationUpdate, apply_relation_action, update_relation};
