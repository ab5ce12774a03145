//! Wire protocol spoken between sectors and the relay.
//!
//! Every frame is an [`Envelope`]: an outer `type` discriminant plus a
//! type-specific JSON `payload`. Decoding is two-stage. [`Envelope::parse`]
//! reads the outer shape, then [`SectorEvent::decode`] turns it into a closed
//! enum over the known event kinds, with [`SectorEvent::Unknown`] for
//! anything else.
//!
//! Faction identifiers inside payloads are always the *sender's* local ids.
//! Relayed copies carry the destination's local ids under the same field
//! names.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::enums::{MemberAction, RelationAction};
use crate::ids::{LocalFactionId, SteamId};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Outer frame of every message on a sector connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event type discriminant, e.g. `factionCreated`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Type-specific payload. Older plugins send it under `raw`; a frame
    /// carrying both keys is rejected as a duplicate field.
    #[serde(alias = "raw", default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Parse the outer frame from raw text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `raw` is not an envelope.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Build an envelope of `kind` around a typed payload.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload cannot be serialized.
    pub fn new<T: Serialize>(kind: EventKind, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: kind.as_str().to_owned(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Serialize to compact JSON text ready for a text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Every event type the relay understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A sector created a faction locally.
    FactionCreated,
    /// A sector finished instantiating a faction announced by another sector.
    FactionCreatedComplete,
    /// Name, tag, description or private info changed.
    FactionEdited,
    /// Auto-accept policy flags changed.
    FactionAutoAcceptChanged,
    /// A member-level change.
    Member(MemberAction),
    /// A relation-level change between two factions.
    Relation(RelationAction),
    /// The game server reports a lifecycle transition.
    ServerStateChange,
    /// The game server reports its player counts.
    ServerPlayersChanged,
}

impl EventKind {
    /// All known kinds.
    pub const ALL: [Self; 17] = [
        Self::FactionCreated,
        Self::FactionCreatedComplete,
        Self::FactionEdited,
        Self::FactionAutoAcceptChanged,
        Self::Member(MemberAction::SendJoin),
        Self::Member(MemberAction::CancelJoin),
        Self::Member(MemberAction::AcceptJoin),
        Self::Member(MemberAction::Promote),
        Self::Member(MemberAction::Demote),
        Self::Member(MemberAction::Kick),
        Self::Member(MemberAction::Leave),
        Self::Relation(RelationAction::SendPeaceRequest),
        Self::Relation(RelationAction::CancelPeaceRequest),
        Self::Relation(RelationAction::AcceptPeace),
        Self::Relation(RelationAction::DeclareWar),
        Self::ServerStateChange,
        Self::ServerPlayersChanged,
    ];

    /// The wire `type` string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FactionCreated => "factionCreated",
            Self::FactionCreatedComplete => "factionCreatedComplete",
            Self::FactionEdited => "factionEdited",
            Self::FactionAutoAcceptChanged => "factionAutoAcceptChanged",
            Self::Member(MemberAction::SendJoin) => "factionMemberSendJoin",
            Self::Member(MemberAction::CancelJoin) => "factionMemberCancelJoin",
            Self::Member(MemberAction::AcceptJoin) => "factionMemberAcceptJoin",
            Self::Member(MemberAction::Promote) => "factionMemberPromote",
            Self::Member(MemberAction::Demote) => "factionMemberDemote",
            Self::Member(MemberAction::Kick) => "factionMemberKick",
            Self::Member(MemberAction::Leave) => "factionMemberLeave",
            Self::Relation(RelationAction::SendPeaceRequest) => "factionSendPeaceRequest",
            Self::Relation(RelationAction::CancelPeaceRequest) => "factionCancelPeaceRequest",
            Self::Relation(RelationAction::AcceptPeace) => "factionAcceptPeace",
            Self::Relation(RelationAction::DeclareWar) => "factionDeclareWar",
            Self::ServerStateChange => "serverStateChange",
            Self::ServerPlayersChanged => "serverPlayersChanged",
        }
    }

    /// Resolve a wire `type` string.
    pub fn from_wire(event_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == event_type)
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of `factionCreated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionCreated {
    /// The founding sector's local id for the new faction.
    #[serde(alias = "FactionId")]
    pub faction_id: LocalFactionId,
    /// Short code, unique within the hive.
    #[serde(alias = "Tag")]
    pub tag: String,
    /// Display name.
    #[serde(alias = "Name")]
    pub name: String,
    /// Public description.
    #[serde(alias = "Description", default)]
    pub description: String,
    /// Members-only text.
    #[serde(alias = "PrivateInfo", default)]
    pub private_info: String,
    /// Whether human players may join.
    #[serde(alias = "AcceptHumans", default)]
    pub accept_humans: bool,
    /// The founder's identity inside the founding sector.
    #[serde(alias = "FounderId", default)]
    pub founder_id: i64,
    /// The founder's Steam ID.
    #[serde(alias = "FounderSteamId")]
    pub founder_steam_id: SteamId,
    /// The founder's display name.
    #[serde(alias = "FounderName", default)]
    pub founder_name: String,
}

/// Payload of `factionCreatedComplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionCreatedComplete {
    /// The completing sector's local id for the faction.
    #[serde(alias = "FactionId")]
    pub faction_id: LocalFactionId,
    /// Tag of the faction announced earlier.
    #[serde(alias = "Tag")]
    pub tag: String,
}

/// Payload of `factionEdited`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionEdited {
    /// The sender's local id for the faction.
    pub faction_id: LocalFactionId,
    /// New tag.
    pub tag: String,
    /// New name.
    pub name: String,
    /// New description.
    #[serde(default)]
    pub description: String,
    /// New members-only text.
    #[serde(default)]
    pub private_info: String,
}

/// Payload of `factionAutoAcceptChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionAutoAcceptChanged {
    /// The sender's local id for the faction.
    pub faction_id: LocalFactionId,
    /// Accept join requests automatically.
    pub auto_accept_member: bool,
    /// Accept peace requests automatically.
    pub auto_accept_peace: bool,
}

/// Payload shared by all member events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionMemberEvent {
    /// The sender's local id for the faction.
    pub faction_id: LocalFactionId,
    /// The player concerned.
    pub player_steam_id: SteamId,
}

/// Payload shared by all relation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionRelationEvent {
    /// The acting faction.
    pub from_faction_id: LocalFactionId,
    /// The faction acted upon.
    pub to_faction_id: LocalFactionId,
}

/// Lifecycle transitions a game server reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerLifecycle {
    /// The world finished loading.
    Loaded,
    /// The server is shutting down.
    Unloading,
}

/// Payload of `serverStateChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStateChange {
    /// The reported transition.
    pub state: ServerLifecycle,
}

/// Payload of `serverPlayersChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPlayersChanged {
    /// Configured player slots.
    pub max_players: u32,
    /// Players currently online.
    pub current_players: u32,
}

// ---------------------------------------------------------------------------
// Decoded event
// ---------------------------------------------------------------------------

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorEvent {
    /// `factionCreated`
    FactionCreated(FactionCreated),
    /// `factionCreatedComplete`
    FactionCreatedComplete(FactionCreatedComplete),
    /// `factionEdited`
    FactionEdited(FactionEdited),
    /// `factionAutoAcceptChanged`
    FactionAutoAcceptChanged(FactionAutoAcceptChanged),
    /// One of the seven member events.
    Member {
        /// Which member event.
        action: MemberAction,
        /// Its payload.
        payload: FactionMemberEvent,
    },
    /// One of the four relation events.
    Relation {
        /// Which relation event.
        action: RelationAction,
        /// Its payload.
        payload: FactionRelationEvent,
    },
    /// `serverStateChange`
    ServerStateChange(ServerStateChange),
    /// `serverPlayersChanged`
    ServerPlayersChanged(ServerPlayersChanged),
    /// Any type the relay does not know. Carries the raw type string.
    Unknown(String),
}

impl SectorEvent {
    /// Decode the payload of an envelope according to its type.
    ///
    /// Unknown types decode successfully to [`SectorEvent::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload does not match the type.
    pub fn decode(envelope: &Envelope) -> Result<Self, serde_json::Error> {
        let Some(kind) = EventKind::from_wire(&envelope.event_type) else {
            return Ok(Self::Unknown(envelope.event_type.clone()));
        };

        let event = match kind {
            EventKind::FactionCreated => Self::FactionCreated(envelope.decode_payload()?),
            EventKind::FactionCreatedComplete => {
                Self::FactionCreatedComplete(envelope.decode_payload()?)
            }
            EventKind::FactionEdited => Self::FactionEdited(envelope.decode_payload()?),
            EventKind::FactionAutoAcceptChanged => {
                Self::FactionAutoAcceptChanged(envelope.decode_payload()?)
            }
            EventKind::Member(action) => Self::Member {
                action,
                payload: envelope.decode_payload()?,
            },
            EventKind::Relation(action) => Self::Relation {
                action,
                payload: envelope.decode_payload()?,
            },
            EventKind::ServerStateChange => Self::ServerStateChange(envelope.decode_payload()?),
            EventKind::ServerPlayersChanged => {
                Self::ServerPlayersChanged(envelope.decode_payload()?)
            }
        };
        Ok(event)
    }
}
