//! Type-safe identifier wrappers.
//!
//! Store-assigned entities (hives, sectors, factions) carry a UUID v7
//! identifier wrapped in a dedicated newtype so they cannot be mixed up at
//! compile time. Identifiers that originate inside a game server (the
//! per-sector faction alias and the player Steam ID) are integer newtypes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a hive (a cluster of sectors).
    HiveId
}

define_id! {
    /// Unique identifier for a sector (one game-server instance).
    SectorId
}

define_id! {
    /// Store-assigned identifier for a faction.
    ///
    /// This is the only identifier that is the same in every sector. Relation
    /// rows are keyed by it, never by a sector-local alias.
    FactionId
}

/// The integer identifier a single sector uses for a faction in its own
/// simulation.
///
/// The same faction has a different `LocalFactionId` in every sector that has
/// instantiated it. Translation between them goes through
/// [`SectorAliases`](crate::aliases::SectorAliases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocalFactionId(pub i64);

impl core::fmt::Display for LocalFactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player's 64-bit Steam identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SteamId(pub u64);

impl core::fmt::Display for SteamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let hive = HiveId::new();
        let sector = SectorId::new();
        assert_ne!(hive.into_inner(), Uuid::nil());
        assert_ne!(sector.into_inner(), Uuid::nil());
    }

    #[test]
    fn integer_ids_serialize_as_bare_numbers() {
        let local = serde_json::to_string(&LocalFactionId(42)).ok();
        assert_eq!(local.as_deref(), Some("42"));

        let steam: Result<SteamId, _> = serde_json::from_str("76561198000000001");
        assert_eq!(steam.ok(), Some(SteamId(76_561_198_000_000_001)));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = FactionId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
