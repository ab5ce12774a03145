//! Enumeration types shared by the store, the state engine and the API.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of a sector as recorded by the entity store.
///
/// A sector is created `Offline`, moves to `Booting` when its connection
/// registers with the hub, to `Online` once the game server reports it has
/// loaded, and back to `Offline` when the connection goes away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SectorState {
    /// No state has been recorded yet.
    #[default]
    Unknown,
    /// No live connection.
    Offline,
    /// Connected, world still loading.
    Booting,
    /// Connected and loaded.
    Online,
}

/// Diplomatic status one faction holds towards another.
///
/// Stored once per faction per counterpart. The two rows describing a pair of
/// factions are independent and may transiently disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RelationState {
    /// No particular relation.
    #[default]
    Neutral,
    /// This faction has asked the counterpart for peace.
    PeaceRequested,
    /// Both sides agreed to peace.
    Peace,
    /// At war.
    War,
}

/// Membership status of a player in a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MemberState {
    /// The player asked to join and awaits acceptance.
    RequestedJoin,
    /// Full member.
    Joined,
}

/// Member-level faction events carried on the wire.
///
/// Kick, leave and cancel-join all remove the member; they stay distinct
/// here because sectors render them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberAction {
    /// A player asks to join.
    SendJoin,
    /// A player withdraws a pending join request.
    CancelJoin,
    /// A leader accepts a pending join request.
    AcceptJoin,
    /// A member is promoted to leader.
    Promote,
    /// A leader is demoted to member.
    Demote,
    /// A member is removed by a leader.
    Kick,
    /// A member leaves voluntarily.
    Leave,
}

/// Relation-level faction events carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationAction {
    /// The sending faction asks the target for peace.
    SendPeaceRequest,
    /// The sending faction withdraws its peace request.
    CancelPeaceRequest,
    /// The sending faction accepts peace with the target.
    AcceptPeace,
    /// The sending faction declares war on the target.
    DeclareWar,
}

impl RelationAction {
    /// The relation state the sending faction's row moves to.
    pub const fn target_state(self) -> RelationState {
        match self {
            Self::SendPeaceRequest => RelationState::PeaceRequested,
            Self::CancelPeaceRequest => RelationState::Neutral,
            Self::AcceptPeace => RelationState::Peace,
            Self::DeclareWar => RelationState::War,
        }
    }

    /// Whether the counterpart's row is written as well.
    ///
    /// Peace requests and their cancellation only touch the requesting side,
    /// so the target keeps observing its previous relation until it accepts.
    pub const fn is_mirrored(self) -> bool {
        matches!(self, Self::AcceptPeace | Self::DeclareWar)
    }
}
