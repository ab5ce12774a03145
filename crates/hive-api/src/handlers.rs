//! REST endpoint handlers for hive, sector and faction management.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text status banner |
//! | `GET` | `/api/hive` | List hives |
//! | `POST` | `/api/hive` | Create a hive |
//! | `GET` | `/api/hive/{hive_id}/sector` | List a hive's sectors |
//! | `POST` | `/api/hive/{hive_id}/sector` | Create a sector |
//! | `DELETE` | `/api/hive/{hive_id}/sector/{sector_id}` | Delete a sector |
//! | `GET` | `/api/hive/{hive_id}/faction` | List a hive's factions |
//! | `DELETE` | `/api/hive/{hive_id}/faction` | Delete all of a hive's factions |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use hive_types::{Hive, HiveId, Sector, SectorId, SectorPosition, SectorState};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/hive`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateHiveRequest {
    /// Display name.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// Body of `POST /api/hive/{hive_id}/sector`.
#[derive(Debug, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectorRequest {
    /// Display name.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Address players use to reach the game server.
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    /// Configured player slots.
    #[serde(default, alias = "max_players")]
    #[validate(range(max = 4096))]
    pub max_players: Option<u32>,
    /// Placement on the hive map.
    #[serde(default)]
    pub position: Option<SectorPosition>,
}

// ---------------------------------------------------------------------------
// GET / -- status banner
// ---------------------------------------------------------------------------

/// Plain-text banner with the number of connected sectors.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let connections = state
        .hub
        .connection_count()
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    Ok(format!(
        "Hive sector relay v{}\nconnected sectors: {connections}\n",
        env!("CARGO_PKG_VERSION")
    ))
}

// ---------------------------------------------------------------------------
// Hives
// ---------------------------------------------------------------------------

/// List every hive.
pub async fn list_hives(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_hives().await?))
}

/// Create a hive.
pub async fn create_hive(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateHiveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate()?;

    let hive = Hive {
        id: HiveId::new(),
        name: request.name,
        created_at: Utc::now(),
    };
    state.store.insert_hive(&hive).await?;

    tracing::info!(hive = %hive.id, name = %hive.name, "Hive created");
    Ok((StatusCode::CREATED, Json(hive)))
}

// ---------------------------------------------------------------------------
// Sectors
// ---------------------------------------------------------------------------

/// List the sectors of a hive.
pub async fn list_sectors(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let hive_id = HiveId::from(parse_uuid(&hive_id)?);
    Ok(Json(state.store.list_sectors(hive_id).await?))
}

/// Create a sector in an existing hive. New sectors start offline.
pub async fn create_sector(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
    body: Result<Json<CreateSectorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let hive_id = HiveId::from(parse_uuid(&hive_id)?);
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate()?;

    if !state.store.hive_exists(hive_id).await? {
        return Err(ApiError::NotFound(format!("hive {hive_id}")));
    }

    let sector = Sector {
        id: SectorId::new(),
        hive_id,
        name: request.name,
        address: request.address,
        state: SectorState::Offline,
        max_players: request.max_players.unwrap_or_default(),
        player_count: 0,
        position: request.position.unwrap_or_default(),
        last_faction_sync: None,
        last_economy_sync: None,
    };
    state.store.insert_sector(&sector).await?;

    tracing::info!(hive = %hive_id, sector = %sector.id, name = %sector.name, "Sector created");
    Ok((StatusCode::CREATED, Json(sector)))
}

/// Delete a sector.
pub async fn delete_sector(
    State(state): State<Arc<AppState>>,
    Path((hive_id, sector_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let hive_id = HiveId::from(parse_uuid(&hive_id)?);
    let sector_id = SectorId::from(parse_uuid(&sector_id)?);

    if !state.store.delete_sector(hive_id, sector_id).await? {
        return Err(ApiError::NotFound(format!(
            "sector {sector_id} in hive {hive_id}"
        )));
    }

    tracing::info!(hive = %hive_id, sector = %sector_id, "Sector deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// List the factions of a hive.
pub async fn list_factions(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let hive_id = HiveId::from(parse_uuid(&hive_id)?);
    Ok(Json(state.store.list_factions(hive_id).await?))
}

/// Delete every faction of a hive.
pub async fn delete_factions(
    State(state): State<Arc<AppState>>,
    Path(hive_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let hive_id = HiveId::from(parse_uuid(&hive_id)?);
    let deleted = state.store.delete_factions(hive_id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}
