//! Conversions between domain values and their column representations.

use hive_types::{MemberState, RelationState, SectorState};

use crate::error::DbError;

pub(crate) const fn sector_state_to_db(state: SectorState) -> &'static str {
    match state {
        SectorState::Unknown => "unknown",
        SectorState::Offline => "offline",
        SectorState::Booting => "booting",
        SectorState::Online => "online",
    }
}

pub(crate) fn sector_state_from_db(s: &str) -> Result<SectorState, DbError> {
    match s {
        "unknown" => Ok(SectorState::Unknown),
        "offline" => Ok(SectorState::Offline),
        "booting" => Ok(SectorState::Booting),
        "online" => Ok(SectorState::Online),
        other => Err(DbError::OutOfRange(format!("sector state {other:?}"))),
    }
}

pub(crate) const fn relation_state_to_db(state: RelationState) -> &'static str {
    match state {
        RelationState::Neutral => "neutral",
        RelationState::PeaceRequested => "peace_requested",
        RelationState::Peace => "peace",
        RelationState::War => "war",
    }
}

pub(crate) fn relation_state_from_db(s: &str) -> Result<RelationState, DbError> {
    match s {
        "neutral" => Ok(RelationState::Neutral),
        "peace_requested" => Ok(RelationState::PeaceRequested),
        "peace" => Ok(RelationState::Peace),
        "war" => Ok(RelationState::War),
        other => Err(DbError::OutOfRange(format!("relation state {other:?}"))),
    }
}

pub(crate) const fn member_state_to_db(state: MemberState) -> &'static str {
    match state {
        MemberState::RequestedJoin => "requested_join",
        MemberState::Joined => "joined",
    }
}

pub(crate) fn member_state_from_db(s: &str) -> Result<MemberState, DbError> {
    match s {
        "requested_join" => Ok(MemberState::RequestedJoin),
        "joined" => Ok(MemberState::Joined),
        other => Err(DbError::OutOfRange(format!("member state {other:?}"))),
    }
}

/// Steam IDs are unsigned 64-bit but stored in a signed `BIGINT`.
pub(crate) fn steam_to_db(steam_id: u64) -> Result<i64, DbError> {
    i64::try_from(steam_id).map_err(|e| DbError::OutOfRange(format!("steam id {steam_id}: {e}")))
}

pub(crate) fn steam_from_db(raw: i64) -> Result<u64, DbError> {
    u64::try_from(raw).map_err(|e| DbError::OutOfRange(format!("steam id {raw}: {e}")))
}

pub(crate) fn count_to_db(count: u32) -> Result<i32, DbError> {
    i32::try_from(count).map_err(|e| DbError::OutOfRange(format!("player count {count}: {e}")))
}

pub(crate) fn count_from_db(raw: i32) -> Result<u32, DbError> {
    u32::try_from(raw).map_err(|e| DbError::OutOfRange(format!("player count {raw}: {e}")))
}

/// Map constraint violations onto the store's own error kinds.
pub(crate) fn classify(err: sqlx::Error, what: impl FnOnce() -> String) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Conflict(what()),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::NotFound(what()),
        _ => DbError::Postgres(err),
    }
}
