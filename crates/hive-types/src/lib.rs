//! Shared type definitions for the hive sector relay.
//!
//! This crate is the single source of truth for the records the entity store
//! holds and for the wire protocol spoken on sector connections. Records
//! served by the HTTP API flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (store UUIDs, sector-local ids, Steam IDs)
//! - [`enums`] -- Sector, relation and membership states; member/relation actions
//! - [`aliases`] -- The per-sector faction identifier alias table
//! - [`structs`] -- Hive, sector and faction records
//! - [`events`] -- Envelope and typed event payloads

pub mod aliases;
pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use aliases::{AliasChange, FactionSector, SectorAliases};
pub use enums::{MemberAction, MemberState, RelationAction, RelationState, SectorState};
pub use events::{
    Envelope, EventKind, FactionAutoAcceptChanged, FactionCreated, FactionCreatedComplete,
    FactionEdited, FactionMemberEvent, FactionRelationEvent, SectorEvent, ServerLifecycle,
    ServerPlayersChanged, ServerStateChange,
};
pub use ids::{FactionId, HiveId, LocalFactionId, SectorId, SteamId};
pub use structs::{Faction, FactionMember, FactionRelation, Hive, Sector, SectorPosition};
