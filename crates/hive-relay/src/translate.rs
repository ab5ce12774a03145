//! Per-destination rewriting of faction identifiers.
//!
//! A sector only understands its own [`LocalFactionId`]s, so every targeted
//! event is re-encoded once per destination with the destination's alias in
//! place of the sender's. The sender's sector never receives its own event.

use std::collections::{BTreeMap, BTreeSet};

use hive_types::{
    Envelope, EventKind, Faction, FactionRelationEvent, LocalFactionId, RelationAction, SectorId,
};
use serde::Serialize;

use crate::routing::RoutingPlan;

/// Fan an event about one faction out to every other sector that knows it.
///
/// `payload_for` receives the destination's local id and returns the payload
/// to send there.
///
/// # Errors
///
/// Returns the JSON error if a payload fails to serialize.
pub fn fan_out<T, F>(
    faction: &Faction,
    origin: SectorId,
    kind: EventKind,
    mut payload_for: F,
) -> Result<RoutingPlan, serde_json::Error>
where
    T: Serialize,
    F: FnMut(LocalFactionId) -> T,
{
    let mut messages = BTreeMap::new();
    for alias in faction.sectors.iter().filter(|a| a.sector_id != origin) {
        let payload = payload_for(alias.entity_id);
        messages.insert(alias.sector_id, Envelope::new(kind, &payload)?.to_json()?);
    }
    Ok(RoutingPlan::targeted(messages))
}

/// Fan a relation event out to every sector that knows either faction.
///
/// `fromFactionId` and `toFactionId` are translated independently. A
/// destination with no alias for one side receives that side's id as the
/// sender wrote it.
///
/// # Errors
///
/// Returns the JSON error if a payload fails to serialize.
pub fn fan_out_relation(
    from: &Faction,
    to: &Faction,
    origin: SectorId,
    action: RelationAction,
    event: FactionRelationEvent,
) -> Result<RoutingPlan, serde_json::Error> {
    let destinations: BTreeSet<SectorId> = from
        .sectors
        .sectors()
        .chain(to.sectors.sectors())
        .filter(|sector| *sector != origin)
        .collect();

    let mut messages = BTreeMap::new();
    for sector in destinations {
        let payload = FactionRelationEvent {
            from_faction_id: from
                .sectors
                .local_id_for(sector)
                .unwrap_or(event.from_faction_id),
            to_faction_id: to
                .sectors
                .local_id_for(sector)
                .unwrap_or(event.to_faction_id),
        };
        let envelope = Envelope::new(EventKind::Relation(action), &payload)?;
        messages.insert(sector, envelope.to_json()?);
    }
    Ok(RoutingPlan::targeted(messages))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use hive_types::{
        FactionId, FactionMemberEvent, FactionSector, HiveId, MemberAction, SectorAliases, SteamId,
    };

    use super::*;

    fn faction(aliases: &[(SectorId, i64)]) -> Faction {
        Faction {
            id: FactionId::new(),
            hive_id: HiveId::new(),
            tag: "T".to_owned(),
            name: "t".to_owned(),
            description: String::new(),
            private_info: String::new(),
            accept_humans: true,
            founder_steam_id: SteamId(1),
            auto_accept_member: false,
            auto_accept_peace: false,
            relations: Vec::new(),
            members: Vec::new(),
            sectors: aliases
                .iter()
                .map(|&(sector_id, n)| FactionSector {
                    sector_id,
                    entity_id: LocalFactionId(n),
                })
                .collect::<SectorAliases>(),
        }
    }

    fn decode(text: &str) -> FactionRelationEvent {
        let envelope = Envelope::parse(text).unwrap();
        serde_json::from_value(envelope.payload).unwrap()
    }

    #[test]
    fn relation_ids_are_translated_per_destination() {
        let (s1, s2, s3) = (SectorId::new(), SectorId::new(), SectorId::new());
        let a = faction(&[(s1, 10), (s2, 20)]);
        let b = faction(&[(s1, 11), (s3, 31)]);
        let inbound = FactionRelationEvent {
            from_faction_id: LocalFactionId(10),
            to_faction_id: LocalFactionId(11),
        };

        let plan = fan_out_relation(&a, &b, s1, RelationAction::DeclareWar, inbound).unwrap();
        let RoutingPlan::Targeted(messages) = plan else {
            panic!("expected a targeted plan");
        };

        assert_eq!(messages.len(), 2);
        assert!(!messages.contains_key(&s1));
        assert_eq!(
            decode(&messages[&s2]),
            FactionRelationEvent {
                from_faction_id: LocalFactionId(20),
                to_faction_id: LocalFactionId(11),
            }
        );
        assert_eq!(
            decode(&messages[&s3]),
            FactionRelationEvent {
                from_faction_id: LocalFactionId(10),
                to_faction_id: LocalFactionId(31),
            }
        );
        assert!(messages[&s2].contains("\"factionDeclareWar\""));
    }

    #[test]
    fn single_faction_fan_out_skips_origin() {
        let (s1, s2) = (SectorId::new(), SectorId::new());
        let f = faction(&[(s1, 1), (s2, 2)]);
        let kind = EventKind::Member(MemberAction::Kick);

        let plan = fan_out(&f, s1, kind, |local| FactionMemberEvent {
            faction_id: local,
            player_steam_id: SteamId(9),
        })
        .unwrap();
        let RoutingPlan::Targeted(messages) = plan else {
            panic!("expected a targeted plan");
        };

        assert_eq!(messages.keys().copied().collect::<Vec<_>>(), vec![s2]);
        let envelope = Envelope::parse(&messages[&s2]).unwrap();
        assert_eq!(envelope.event_type, "factionMemberKick");
        assert_eq!(envelope.payload["factionId"], 2);
    }

    #[test]
    fn faction_known_only_to_origin_routes_nowhere() {
        let s1 = SectorId::new();
        let f = faction(&[(s1, 1)]);
        let plan = fan_out(&f, s1, EventKind::FactionEdited, |local| local).unwrap();
        assert!(plan.is_none());
    }
}
