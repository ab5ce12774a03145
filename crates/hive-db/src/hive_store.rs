//! Hive and sector persistence.
//!
//! Sectors are always addressed together with their hive so that a sector id
//! presented under the wrong hive behaves as if it did not exist.

use chrono::{DateTime, Utc};
use hive_types::{Hive, HiveId, Sector, SectorId, SectorPosition, SectorState};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::mapping::{
    classify, count_from_db, count_to_db, sector_state_from_db, sector_state_to_db,
};

/// Operations on the `hives` and `sectors` tables.
pub struct HiveStore<'a> {
    pool: &'a PgPool,
}

impl<'a> HiveStore<'a> {
    /// Create a new hive store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Hives
    // =========================================================================

    /// List every hive, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_hives(&self) -> Result<Vec<Hive>, DbError> {
        let rows = sqlx::query_as::<_, HiveRow>(
            r"SELECT id, name, created_at FROM hives ORDER BY created_at, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Hive::from).collect())
    }

    /// Insert a hive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the id is taken.
    pub async fn insert_hive(&self, hive: &Hive) -> Result<(), DbError> {
        sqlx::query(r"INSERT INTO hives (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(hive.id.into_inner())
            .bind(&hive.name)
            .bind(hive.created_at)
            .execute(self.pool)
            .await
            .map_err(|e| classify(e, || format!("hive {}", hive.id)))?;

        tracing::debug!(hive_id = %hive.id, "Inserted hive");
        Ok(())
    }

    /// Whether a hive exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn hive_exists(&self, hive_id: HiveId) -> Result<bool, DbError> {
        let exists: bool = sqlx::query_scalar(r"SELECT EXISTS (SELECT 1 FROM hives WHERE id = $1)")
            .bind(hive_id.into_inner())
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    // =========================================================================
    // Sectors
    // =========================================================================

    /// List the sectors of a hive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::OutOfRange`] if a row holds an unmappable value.
    pub async fn list_sectors(&self, hive_id: HiveId) -> Result<Vec<Sector>, DbError> {
        let rows = sqlx::query_as::<_, SectorRow>(
            r"SELECT id, hive_id, name, address, state, max_players, player_count,
                     position_x, position_y, last_faction_sync, last_economy_sync
              FROM sectors
              WHERE hive_id = $1
              ORDER BY id",
        )
        .bind(hive_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Sector::try_from).collect()
    }

    /// Fetch one sector of a hive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_sector(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
    ) -> Result<Option<Sector>, DbError> {
        let row = sqlx::query_as::<_, SectorRow>(
            r"SELECT id, hive_id, name, address, state, max_players, player_count,
                     position_x, position_y, last_faction_sync, last_economy_sync
              FROM sectors
              WHERE id = $1 AND hive_id = $2",
        )
        .bind(sector_id.into_inner())
        .bind(hive_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(Sector::try_from).transpose()
    }

    /// Insert a sector.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the hive does not exist.
    pub async fn insert_sector(&self, sector: &Sector) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO sectors
              (id, hive_id, name, address, state, max_players, player_count,
               position_x, position_y, last_faction_sync, last_economy_sync)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(sector.id.into_inner())
        .bind(sector.hive_id.into_inner())
        .bind(&sector.name)
        .bind(&sector.address)
        .bind(sector_state_to_db(sector.state))
        .bind(count_to_db(sector.max_players)?)
        .bind(count_to_db(sector.player_count)?)
        .bind(sector.position.x)
        .bind(sector.position.y)
        .bind(sector.last_faction_sync)
        .bind(sector.last_economy_sync)
        .execute(self.pool)
        .await
        .map_err(|e| classify(e, || format!("hive {}", sector.hive_id)))?;

        tracing::debug!(sector_id = %sector.id, hive_id = %sector.hive_id, "Inserted sector");
        Ok(())
    }

    /// Delete a sector. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_sector(&self, hive_id: HiveId, sector_id: SectorId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM sectors WHERE id = $1 AND hive_id = $2")
            .bind(sector_id.into_inner())
            .bind(hive_id.into_inner())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update a sector's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such sector exists in the hive.
    pub async fn set_sector_state(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        state: SectorState,
    ) -> Result<(), DbError> {
        let result = sqlx::query(r"UPDATE sectors SET state = $3 WHERE id = $1 AND hive_id = $2")
            .bind(sector_id.into_inner())
            .bind(hive_id.into_inner())
            .bind(sector_state_to_db(state))
            .execute(self.pool)
            .await?;
        expect_row(result.rows_affected(), hive_id, sector_id)
    }

    /// Update a sector's player counts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such sector exists in the hive.
    pub async fn set_sector_players(
        &self,
        hive_id: HiveId,
        sector_id: SectorId,
        max_players: u32,
        player_count: u32,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE sectors SET max_players = $3, player_count = $4
              WHERE id = $1 AND hive_id = $2",
        )
        .bind(sector_id.into_inner())
        .bind(hive_id.into_inner())
        .bind(count_to_db(max_players)?)
        .bind(count_to_db(player_count)?)
        .execute(self.pool)
        .await?;
        expect_row(result.rows_affected(), hive_id, sector_id)
    }
}

fn expect_row(affected: u64, hive_id: HiveId, sector_id: SectorId) -> Result<(), DbError> {
    if affected == 0 {
        return Err(DbError::NotFound(format!(
            "sector {sector_id} in hive {hive_id}"
        )));
    }
    Ok(())
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct HiveRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<HiveRow> for Hive {
    fn from(row: HiveRow) -> Self {
        Self {
            id: HiveId::from(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SectorRow {
    id: Uuid,
    hive_id: Uuid,
    name: String,
    address: String,
    state: String,
    max_players: i32,
    player_count: i32,
    position_x: i32,
    position_y: i32,
    last_faction_sync: Option<DateTime<Utc>>,
    last_economy_sync: Option<DateTime<Utc>>,
}

impl TryFrom<SectorRow> for Sector {
    type Error = DbError;

    fn try_from(row: SectorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SectorId::from(row.id),
            hive_id: HiveId::from(row.hive_id),
            name: row.name,
            address: row.address,
            state: sector_state_from_db(&row.state)?,
            max_players: count_from_db(row.max_players)?,
            player_count: count_from_db(row.player_count)?,
            position: SectorPosition {
                x: row.position_x,
                y: row.position_y,
            },
            last_faction_sync: row.last_faction_sync,
            last_economy_sync: row.last_economy_sync,
        })
    }
}
