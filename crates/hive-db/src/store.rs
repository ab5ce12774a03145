//! The entity store contract.
//!
//! The relay never talks to a database directly. It holds an
//! `Arc<dyn EntityStore>` and issues keyed reads and per-row writes. Faction
//! writes are deliberately granular (one alias, one member, one relation row
//! at a time) so that two concurrent transitions on the same faction only
//! overwrite each other when they touch the same row.

use async_trait::async_trait;
use hive_types::{
    Faction, FactionId, FactionMember, FactionRelation, FactionSector, Hive, HiveId,
    LocalFactionId, Sector, SectorId, SectorState, SteamId,
};

use crate::error::DbError;

/// Durable storage for hives, sectors and factions.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // =========================================================================
    // Hives
    // =========================================================================

    /// List every hive.
    async fn list_hives(&self) -> Result<Vec<Hive>, DbError>;

    /// Insert a new hive.
    async fn insert_hive(&self, hive: &Hive) -> Result<(), DbError>;

    /// Whether a hive exists.
    async fn hive_exists(&self, hive_id: HiveId) -> Result<bool, DbError>;

    // =========================================================================
    // Sectors
    // =========================================================================

    /// List the sectors of a hive.
    async fn list_sectors(&self, hive_id: HiveId) -> Result<Vec<Sector>, DbError>;

    /// Fetch one sector of a hive.
    async fn get_sector(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
    ) -> Result<Option<Sector>, DbError>;

    /// Insert a new sector. Fails with [`DbError::NotFound`] if its hive is
    /// missing.
    async fn insert_sector(&self, sector: &Sector) -> Result<(), DbError>;

    /// Delete a sector. Returns whether it existed.
    async fn delete_sector(&self, hive_id: HiveId, sector_id: SectorId) -> Result<bool, DbError>;

    /// Whether `sector_id` exists and belongs to `hive_id`.
    async fn sector_exists(&self, hive_id: HiveId, sector_id: SectorId) -> Result<bool, DbError> {
        Ok(self.get_sector(hive_id, sector_id).await?.is_some())
    }

    /// Record a sector lifecycle transition.
    async fn set_sector_state(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        state: SectorState,
    ) -> Result<(), DbError>;

    /// Record a sector's player counts.
    async fn set_sector_players(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        max_players: u32,
        player_count: u32,
    ) -> Result<(), DbError>;

    // =========================================================================
    // Factions
    // =========================================================================

    /// List the factions of a hive.
    async fn list_factions(&self, hive_id: HiveId) -> Result<Vec<Faction>, DbError>;

    /// Delete every faction of a hive. Returns how many were removed.
    async fn delete_factions(&self, hive_id: HiveId) -> Result<u64, DbError>;

    /// Fetch the faction carrying `tag` in a hive.
    async fn find_faction_by_tag(
        &self,
        hive_id: HiveId,
        tag: &str,
    ) -> Result<Option<Faction>, DbError>;

    /// Fetch the faction `sector_id` knows as `local_id`.
    async fn find_faction_by_alias(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        local_id: LocalFactionId,
    ) -> Result<Option<Faction>, DbError>;

    /// Insert a new faction with all its child rows. Fails with
    /// [`DbError::Conflict`] if the tag is taken in the hive.
    async fn insert_faction(&self, faction: &Faction) -> Result<(), DbError>;

    /// Overwrite the scalar fields of a faction (tag, name, texts, flags).
    async fn update_faction_profile(&self, faction: &Faction) -> Result<(), DbError>;

    /// Insert or replace the alias a sector holds for a faction.
    async fn upsert_alias(&self, faction_id: FactionId, alias: FactionSector)
    -> Result<(), DbError>;

    /// Insert or replace a member row.
    async fn upsert_member(
        &self,
        faction_id: FactionId,
        member: FactionMember,
    ) -> Result<(), DbError>;

    /// Delete a member row.
    async fn remove_member(&self, faction_id: FactionId, steam_id: SteamId)
    -> Result<(), DbError>;

    /// Insert or replace the relation row `faction_id` holds towards
    /// `relation.faction_id`.
    async fn upsert_relation(
        &self,
        faction_id: FactionId,
        relation: FactionRelation,
    ) -> Result<(), DbError>;
}
