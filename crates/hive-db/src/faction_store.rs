//! Faction persistence.
//!
//! A faction is spread over four tables: the scalar profile in `factions`
//! and one row per alias, member and relation in the child tables. Reads
//! hydrate whole [`Faction`] values; writes touch a single child row so that
//! concurrent transitions on different rows of the same faction never
//! clobber each other.

use std::collections::HashMap;

use hive_types::{
    Faction, FactionId, FactionMember, FactionRelation, FactionSector, HiveId, LocalFactionId,
    SectorAliases, SectorId, SteamId,
};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::DbError;
use crate::mapping::{
    classify, member_state_from_db, member_state_to_db, relation_state_from_db,
    relation_state_to_db, steam_from_db, steam_to_db,
};

/// Operations on the `factions` table and its child tables.
pub struct FactionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> FactionStore<'a> {
    /// Create a new faction store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List every faction of a hive with its child rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn list(&self, hive_id: HiveId) -> Result<Vec<Faction>, DbError> {
        let rows = sqlx::query_as::<_, FactionRow>(
            r"SELECT id, hive_id, tag, name, description, private_info, accept_humans,
                     founder_steam_id, auto_accept_member, auto_accept_peace
              FROM factions
              WHERE hive_id = $1
              ORDER BY id",
        )
        .bind(hive_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Fetch the faction carrying `tag` in a hive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn find_by_tag(&self, hive_id: HiveId, tag: &str) -> Result<Option<Faction>, DbError> {
        let row = sqlx::query_as::<_, FactionRow>(
            r"SELECT id, hive_id, tag, name, description, private_info, accept_humans,
                     founder_steam_id, auto_accept_member, auto_accept_peace
              FROM factions
              WHERE hive_id = $1 AND tag = $2",
        )
        .bind(hive_id.into_inner())
        .bind(tag)
        .fetch_optional(self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    /// Fetch the faction a sector knows under `local_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails.
    pub async fn find_by_alias(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        local_id: LocalFactionId,
    ) -> Result<Option<Faction>, DbError> {
        let row = sqlx::query_as::<_, FactionRow>(
            r"SELECT f.id, f.hive_id, f.tag, f.name, f.description, f.private_info,
                     f.accept_humans, f.founder_steam_id, f.auto_accept_member,
                     f.auto_accept_peace
              FROM factions f
              JOIN faction_sectors fs ON fs.faction_id = f.id
              WHERE f.hive_id = $1 AND fs.sector_id = $2 AND fs.entity_id = $3
              ORDER BY fs.seq
              LIMIT 1",
        )
        .bind(hive_id.into_inner())
        .bind(sector_id.into_inner())
        .bind(local_id.0)
        .fetch_optional(self.pool)
        .await?;

        self.hydrate_one(row).await
    }

    async fn hydrate_one(&self, row: Option<FactionRow>) -> Result<Option<Faction>, DbError> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    /// Attach alias, member and relation rows to each profile row.
    async fn hydrate(&self, rows: Vec<FactionRow>) -> Result<Vec<Faction>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let aliases = sqlx::query_as::<_, AliasRow>(
            r"SELECT faction_id, sector_id, entity_id
              FROM faction_sectors
              WHERE faction_id = ANY($1)
              ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let members = sqlx::query_as::<_, MemberRow>(
            r"SELECT faction_id, steam_id, state, is_leader
              FROM faction_members
              WHERE faction_id = ANY($1)
              ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let relations = sqlx::query_as::<_, RelationRow>(
            r"SELECT faction_id, other_faction_id, state
              FROM faction_relations
              WHERE faction_id = ANY($1)
              ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut alias_map: HashMap<Uuid, Vec<FactionSector>> = HashMap::new();
        for row in aliases {
            alias_map.entry(row.faction_id).or_default().push(FactionSector {
                sector_id: SectorId::from(row.sector_id),
                entity_id: LocalFactionId(row.entity_id),
            });
        }

        let mut member_map: HashMap<Uuid, Vec<FactionMember>> = HashMap::new();
        for row in members {
            member_map.entry(row.faction_id).or_default().push(FactionMember {
                steam_id: SteamId(steam_from_db(row.steam_id)?),
                state: member_state_from_db(&row.state)?,
                is_leader: row.is_leader,
            });
        }

        let mut relation_map: HashMap<Uuid, Vec<FactionRelation>> = HashMap::new();
        for row in relations {
            relation_map
                .entry(row.faction_id)
                .or_default()
                .push(FactionRelation {
                    faction_id: FactionId::from(row.other_faction_id),
                    state: relation_state_from_db(&row.state)?,
                });
        }

        rows.into_iter()
            .map(|row| {
                let sectors: SectorAliases =
                    alias_map.remove(&row.id).unwrap_or_default().into_iter().collect();
                Ok(Faction {
                    id: FactionId::from(row.id),
                    hive_id: HiveId::from(row.hive_id),
                    founder_steam_id: SteamId(steam_from_db(row.founder_steam_id)?),
                    members: member_map.remove(&row.id).unwrap_or_default(),
                    relations: relation_map.remove(&row.id).unwrap_or_default(),
                    sectors,
                    tag: row.tag,
                    name: row.name,
                    description: row.description,
                    private_info: row.private_info,
                    accept_humans: row.accept_humans,
                    auto_accept_member: row.auto_accept_member,
                    auto_accept_peace: row.auto_accept_peace,
                })
            })
            .collect()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a faction together with all of its child rows in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the tag is already used in the hive.
    pub async fn insert(&self, faction: &Faction) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO factions
              (id, hive_id, tag, name, description, private_info, accept_humans,
               founder_steam_id, auto_accept_member, auto_accept_peace)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(faction.id.into_inner())
        .bind(faction.hive_id.into_inner())
        .bind(&faction.tag)
        .bind(&faction.name)
        .bind(&faction.description)
        .bind(&faction.private_info)
        .bind(faction.accept_humans)
        .bind(steam_to_db(faction.founder_steam_id.0)?)
        .bind(faction.auto_accept_member)
        .bind(faction.auto_accept_peace)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            classify(e, || {
                format!("faction tag {} in hive {}", faction.tag, faction.hive_id)
            })
        })?;

        for alias in &faction.sectors {
            write_alias(&mut *tx, faction.id, *alias).await?;
        }
        for member in &faction.members {
            write_member(&mut *tx, faction.id, *member).await?;
        }
        for relation in &faction.relations {
            write_relation(&mut *tx, faction.id, *relation).await?;
        }

        tx.commit().await?;
        tracing::debug!(faction_id = %faction.id, tag = %faction.tag, "Inserted faction");
        Ok(())
    }

    /// Overwrite the scalar profile columns of a faction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the new tag collides,
    /// [`DbError::NotFound`] if the faction is gone.
    pub async fn update_profile(&self, faction: &Faction) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE factions SET
                tag = $2,
                name = $3,
                description = $4,
                private_info = $5,
                accept_humans = $6,
                auto_accept_member = $7,
                auto_accept_peace = $8
              WHERE id = $1",
        )
        .bind(faction.id.into_inner())
        .bind(&faction.tag)
        .bind(&faction.name)
        .bind(&faction.description)
        .bind(&faction.private_info)
        .bind(faction.accept_humans)
        .bind(faction.auto_accept_member)
        .bind(faction.auto_accept_peace)
        .execute(self.pool)
        .await
        .map_err(|e| {
            classify(e, || {
                format!("faction tag {} in hive {}", faction.tag, faction.hive_id)
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("faction {}", faction.id)));
        }
        Ok(())
    }

    /// Insert or replace one alias row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the faction is gone.
    pub async fn upsert_alias(&self, faction_id: FactionId, alias: FactionSector) -> Result<(), DbError> {
        write_alias(self.pool, faction_id, alias).await
    }

    /// Insert or replace one member row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the faction is gone.
    pub async fn upsert_member(&self, faction_id: FactionId, member: FactionMember) -> Result<(), DbError> {
        write_member(self.pool, faction_id, member).await
    }

    /// Delete one member row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn remove_member(&self, faction_id: FactionId, steam_id: SteamId) -> Result<(), DbError> {
        sqlx::query(r"DELETE FROM faction_members WHERE faction_id = $1 AND steam_id = $2")
            .bind(faction_id.into_inner())
            .bind(steam_to_db(steam_id.0)?)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Insert or replace one relation row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if either faction is gone.
    pub async fn upsert_relation(
        &self,
        faction_id: FactionId,
        relation: FactionRelation,
    ) -> Result<(), DbError> {
        write_relation(self.pool, faction_id, relation).await
    }

    /// Delete every faction of a hive. Child rows cascade.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_all(&self, hive_id: HiveId) -> Result<u64, DbError> {
        let result = sqlx::query(r"DELETE FROM factions WHERE hive_id = $1")
            .bind(hive_id.into_inner())
            .execute(self.pool)
            .await?;

        tracing::info!(hive_id = %hive_id, deleted = result.rows_affected(), "Deleted factions");
        Ok(result.rows_affected())
    }
}

async fn write_alias<'e>(
    executor: impl PgExecutor<'e>,
    faction_id: FactionId,
    alias: FactionSector,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO faction_sectors (faction_id, sector_id, entity_id)
          VALUES ($1, $2, $3)
          ON CONFLICT (faction_id, sector_id) DO UPDATE SET
            entity_id = EXCLUDED.entity_id",
    )
    .bind(faction_id.into_inner())
    .bind(alias.sector_id.into_inner())
    .bind(alias.entity_id.0)
    .execute(executor)
    .await
    .map_err(|e| classify(e, || format!("faction {faction_id}")))?;
    Ok(())
}

async fn write_member<'e>(
    executor: impl PgExecutor<'e>,
    faction_id: FactionId,
    member: FactionMember,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO faction_members (faction_id, steam_id, state, is_leader)
          VALUES ($1, $2, $3, $4)
          ON CONFLICT (faction_id, steam_id) DO UPDATE SET
            state = EXCLUDED.state,
            is_leader = EXCLUDED.is_leader",
    )
    .bind(faction_id.into_inner())
    .bind(steam_to_db(member.steam_id.0)?)
    .bind(member_state_to_db(member.state))
    .bind(member.is_leader)
    .execute(executor)
    .await
    .map_err(|e| classify(e, || format!("faction {faction_id}")))?;
    Ok(())
}

async fn write_relation<'e>(
    executor: impl PgExecutor<'e>,
    faction_id: FactionId,
    relation: FactionRelation,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO faction_relations (faction_id, other_faction_id, state)
          VALUES ($1, $2, $3)
          ON CONFLICT (faction_id, other_faction_id) DO UPDATE SET
            state = EXCLUDED.state",
    )
    .bind(faction_id.into_inner())
    .bind(relation.faction_id.into_inner())
    .bind(relation_state_to_db(relation.state))
    .execute(executor)
    .await
    .map_err(|e| {
        classify(e, || {
            format!("relation {faction_id} -> {}", relation.faction_id)
        })
    })?;
    Ok(())
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct FactionRow {
    id: Uuid,
    hive_id: Uuid,
    tag: String,
    name: String,
    description: String,
    private_info: String,
    accept_humans: bool,
    founder_steam_id: i64,
    auto_accept_member: bool,
    auto_accept_peace: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AliasRow {
    faction_id: Uuid,
    sector_id: Uuid,
    entity_id: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MemberRow {
    faction_id: Uuid,
    steam_id: i64,
    state: String,
    is_leader: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RelationRow {
    faction_id: Uuid,
    other_faction_id: Uuid,
    state: String,
}
