//! In-process [`EntityStore`] backed by ordered maps.
//!
//! Used when no database URL is configured and by every relay and API test.
//! Records are keyed by their UUID v7 identifiers so iteration order matches
//! creation order, which keeps listings stable.

use std::collections::BTreeMap;

use async_trait::async_trait;
use hive_factions::{find_by_alias, find_by_tag};
use hive_types::{
    Faction, FactionId, FactionMember, FactionRelation, FactionSector, Hive, HiveId,
    LocalFactionId, Sector, SectorId, SectorState, SteamId,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::EntityStore;

#[derive(Debug, Default)]
struct Tables {
    hives: BTreeMap<HiveId, Hive>,
    sectors: BTreeMap<SectorId, Sector>,
    factions: BTreeMap<FactionId, Faction>,
}

impl Tables {
    fn sector_mut(&mut self, hive_id: HiveId, sector_id: SectorId) -> Result<&mut Sector, DbError> {
        self.sectors
            .get_mut(&sector_id)
            .filter(|sector| sector.hive_id == hive_id)
            .ok_or_else(|| DbError::NotFound(format!("sector {sector_id} in hive {hive_id}")))
    }

    fn faction_mut(&mut self, faction_id: FactionId) -> Result<&mut Faction, DbError> {
        self.factions
            .get_mut(&faction_id)
            .ok_or_else(|| DbError::NotFound(format!("faction {faction_id}")))
    }

    fn in_hive(&self, hive_id: HiveId) -> impl Iterator<Item = &Faction> {
        self.factions.values().filter(move |f| f.hive_id == hive_id)
    }

    fn tag_taken(&self, hive_id: HiveId, tag: &str, except: Option<FactionId>) -> bool {
        find_by_tag(self.in_hive(hive_id), tag).is_some_and(|f| Some(f.id) != except)
    }
}

/// An [`EntityStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list_hives(&self) -> Result<Vec<Hive>, DbError> {
        Ok(self.tables.read().await.hives.values().cloned().collect())
    }

    async fn insert_hive(&self, hive: &Hive) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.hives.contains_key(&hive.id) {
            return Err(DbError::Conflict(format!("hive {}", hive.id)));
        }
        tables.hives.insert(hive.id, hive.clone());
        Ok(())
    }

    async fn hive_exists(&self, hive_id: HiveId) -> Result<bool, DbError> {
        Ok(self.tables.read().await.hives.contains_key(&hive_id))
    }

    async fn list_sectors(&self, hive_id: HiveId) -> Result<Vec<Sector>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sectors
            .values()
            .filter(|sector| sector.hive_id == hive_id)
            .cloned()
            .collect())
    }

    async fn get_sector(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
    ) -> Result<Option<Sector>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sectors
            .get(&sector_id)
            .filter(|sector| sector.hive_id == hive_id)
            .cloned())
    }

    async fn insert_sector(&self, sector: &Sector) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if !tables.hives.contains_key(&sector.hive_id) {
            return Err(DbError::NotFound(format!("hive {}", sector.hive_id)));
        }
        if tables.sectors.contains_key(&sector.id) {
            return Err(DbError::Conflict(format!("sector {}", sector.id)));
        }
        tables.sectors.insert(sector.id, sector.clone());
        Ok(())
    }

    async fn delete_sector(&self, hive_id: HiveId, sector_id: SectorId) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .sectors
            .get(&sector_id)
            .is_some_and(|sector| sector.hive_id == hive_id);
        if owned {
            tables.sectors.remove(&sector_id);
        }
        Ok(owned)
    }

    async fn set_sector_state(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        state: SectorState,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.sector_mut(hive_id, sector_id)?.state = state;
        Ok(())
    }

    async fn set_sector_players(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        max_players: u32,
        player_count: u32,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let sector = tables.sector_mut(hive_id, sector_id)?;
        sector.max_players = max_players;
        sector.player_count = player_count;
        Ok(())
    }

    async fn list_factions(&self, hive_id: HiveId) -> Result<Vec<Faction>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .factions
            .values()
            .filter(|f| f.hive_id == hive_id)
            .cloned()
            .collect())
    }

    async fn delete_factions(&self, hive_id: HiveId) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        let before = tables.factions.len();
        tables.factions.retain(|_, f| f.hive_id != hive_id);
        let removed = before.saturating_sub(tables.factions.len());
        u64::try_from(removed).map_err(|e| DbError::OutOfRange(e.to_string()))
    }

    async fn find_faction_by_tag(
        &self,
        hive_id: HiveId,
        tag: &str,
    ) -> Result<Option<Faction>, DbError> {
        let tables = self.tables.read().await;
        Ok(find_by_tag(tables.in_hive(hive_id), tag).cloned())
    }

    async fn find_faction_by_alias(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        local_id: LocalFactionId,
    ) -> Result<Option<Faction>, DbError> {
        let tables = self.tables.read().await;
        Ok(find_by_alias(tables.in_hive(hive_id), sector_id, local_id).cloned())
    }

    async fn insert_faction(&self, faction: &Faction) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.tag_taken(faction.hive_id, &faction.tag, None) {
            return Err(DbError::Conflict(format!(
                "faction tag {} in hive {}",
                faction.tag, faction.hive_id
            )));
        }
        tables.factions.insert(faction.id, faction.clone());
        Ok(())
    }

    async fn update_faction_profile(&self, faction: &Faction) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.tag_taken(faction.hive_id, &faction.tag, Some(faction.id)) {
            return Err(DbError::Conflict(format!(
                "faction tag {} in hive {}",
                faction.tag, faction.hive_id
            )));
        }
        let stored = tables.faction_mut(faction.id)?;
        stored.tag.clone_from(&faction.tag);
        stored.name.clone_from(&faction.name);
        stored.description.clone_from(&faction.description);
        stored.private_info.clone_from(&faction.private_info);
        stored.accept_humans = faction.accept_humans;
        stored.auto_accept_member = faction.auto_accept_member;
        stored.auto_accept_peace = faction.auto_accept_peace;
        Ok(())
    }

    async fn upsert_alias(
        &self,
        faction_id: FactionId,
        alias: FactionSector,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables
            .faction_mut(faction_id)?
            .sectors
            .insert(alias.sector_id, alias.entity_id);
        Ok(())
    }

    async fn upsert_member(
        &self,
        faction_id: FactionId,
        member: FactionMember,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let faction = tables.faction_mut(faction_id)?;
        match faction
            .members
            .iter_mut()
            .find(|m| m.steam_id == member.steam_id)
        {
            Some(existing) => *existing = member,
            None => faction.members.push(member),
        }
        Ok(())
    }

    async fn remove_member(
        &self,
        faction_id: FactionId,
        steam_id: SteamId,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables
            .faction_mut(faction_id)?
            .members
            .retain(|m| m.steam_id != steam_id);
        Ok(())
    }

    async fn upsert_relation(
        &self,
        faction_id: FactionId,
        relation: FactionRelation,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let faction = tables.faction_mut(faction_id)?;
        match faction
            .relations
            .iter_mut()
            .find(|r| r.faction_id == relation.faction_id)
        {
            Some(existing) => existing.state = relation.state,
            None => faction.relations.push(relation),
        }
        Ok(())
    }
}
