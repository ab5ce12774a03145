//! Core records owned by the entity store: hives, sectors and factions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aliases::SectorAliases;
use crate::enums::{MemberState, RelationState, SectorState};
use crate::ids::{FactionId, HiveId, SectorId, SteamId};

// ---------------------------------------------------------------------------
// Hive
// ---------------------------------------------------------------------------

/// A named cluster of sectors sharing faction identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Hive {
    /// Unique hive identifier.
    pub id: HiveId,
    /// Display name.
    pub name: String,
    /// When the hive was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Sector
// ---------------------------------------------------------------------------

/// Where a sector is drawn on the hive map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SectorPosition {
    /// Horizontal map coordinate.
    pub x: i32,
    /// Vertical map coordinate.
    pub y: i32,
}

/// One game-server instance belonging to a hive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Sector {
    /// Unique sector identifier.
    pub id: SectorId,
    /// The hive this sector belongs to.
    pub hive_id: HiveId,
    /// Display name.
    pub name: String,
    /// Network address players connect to.
    pub address: String,
    /// Current lifecycle state.
    pub state: SectorState,
    /// Player slots configured on the server.
    pub max_players: u32,
    /// Players currently online.
    pub player_count: u32,
    /// Map position.
    pub position: SectorPosition,
    /// Last time the sector completed a faction sync.
    pub last_faction_sync: Option<DateTime<Utc>>,
    /// Last time the sector completed an economy sync.
    pub last_economy_sync: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Faction
// ---------------------------------------------------------------------------

/// A player's membership in a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FactionMember {
    /// The player.
    pub steam_id: SteamId,
    /// Whether the player is a full member or still asking to join.
    pub state: MemberState,
    /// Whether the player leads the faction.
    pub is_leader: bool,
}

/// This faction's relation towards one counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FactionRelation {
    /// The counterpart, by store identifier.
    pub faction_id: FactionId,
    /// Current relation state.
    pub state: RelationState,
}

/// A player organisation shared across the sectors of a hive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Faction {
    /// Store identifier, identical in every sector.
    pub id: FactionId,
    /// Owning hive.
    pub hive_id: HiveId,
    /// Short code, unique within the hive.
    pub tag: String,
    /// Display name.
    pub name: String,
    /// Public description.
    pub description: String,
    /// Text visible to members only.
    pub private_info: String,
    /// Whether human players may join.
    pub accept_humans: bool,
    /// The founding player.
    pub founder_steam_id: SteamId,
    /// Join requests are accepted without a leader.
    pub auto_accept_member: bool,
    /// Peace requests are accepted without a leader.
    pub auto_accept_peace: bool,
    /// One row per counterpart faction.
    pub relations: Vec<FactionRelation>,
    /// Members and pending join requests.
    pub members: Vec<FactionMember>,
    /// Per-sector identifier aliases.
    pub sectors: SectorAliases,
}

impl Faction {
    /// Look up a member by Steam ID.
    pub fn member(&self, steam_id: SteamId) -> Option<&FactionMember> {
        self.members.iter().find(|m| m.steam_id == steam_id)
    }

    /// The relation row this faction holds towards `other`, if any.
    pub fn relation_with(&self, other: FactionId) -> Option<RelationState> {
        self.relations
            .iter()
            .find(|r| r.faction_id == other)
            .map(|r| r.state)
    }
}
