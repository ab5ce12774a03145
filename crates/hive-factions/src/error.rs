//! Error types for the faction state engine.

use hive_types::{FactionId, HiveId, SteamId};

/// Coarse classification used by callers to map engine failures onto their
/// own taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactionErrorKind {
    /// A keyed lookup found nothing.
    NotFound,
    /// A uniqueness constraint would be violated.
    AlreadyExists,
    /// The request is structurally impossible.
    Invalid,
}

/// Errors that can occur during a faction state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactionError {
    /// Another faction in the hive already uses this tag.
    #[error("faction tag {tag:?} already exists in hive {hive_id}")]
    TagAlreadyExists {
        /// The hive.
        hive_id: HiveId,
        /// The colliding tag.
        tag: String,
    },

    /// The player is already a member or has a pending join request.
    #[error("steam id {steam_id} wants to join faction {faction_id} but is already listed")]
    MemberAlreadyExists {
        /// The faction.
        faction_id: FactionId,
        /// The player.
        steam_id: SteamId,
    },

    /// The player is not listed in the faction.
    #[error("steam id {steam_id} is not a member of faction {faction_id}")]
    MemberNotFound {
        /// The faction.
        faction_id: FactionId,
        /// The player.
        steam_id: SteamId,
    },

    /// A faction cannot hold a relation with itself.
    #[error("faction {0} cannot hold a relation with itself")]
    SelfRelation(FactionId),
}

impl FactionError {
    /// Classify this error.
    pub const fn kind(&self) -> FactionErrorKind {
        match self {
            Self::TagAlreadyExists { .. } | Self::MemberAlreadyExists { .. } => {
                FactionErrorKind::AlreadyExists
            }
            Self::MemberNotFound { .. } => FactionErrorKind::NotFound,
            Self::SelfRelation(_) => FactionErrorKind::Invalid,
        }
    }
}
