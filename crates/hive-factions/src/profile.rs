//! Faction creation, identifier aliasing and profile edits.
//!
//! Every function here operates on an in-memory [`Faction`] and performs no
//! I/O. Callers fetch the record, apply the transition, and persist the
//! fields that changed.

use hive_types::{
    AliasChange, Faction, FactionCreated, FactionEdited, FactionId, HiveId, LocalFactionId,
    SectorAliases, SectorId,
};

use crate::error::FactionError;

/// Build a new faction announced by `sector_id`.
///
/// `existing_with_tag` is whatever faction the caller found under the same
/// hive and tag. If there is one the tag is taken and creation fails. The
/// new faction starts with a single alias mapping the founding sector to the
/// local id it announced.
///
/// # Errors
///
/// Returns [`FactionError::TagAlreadyExists`] if the tag is taken.
pub fn create_faction(
    existing_with_tag: Option<&Faction>,
    hive_id: HiveId,
    sector_id: SectorId,
    event: &FactionCreated,
) -> Result<Faction, FactionError> {
    if existing_with_tag.is_some() {
        return Err(FactionError::TagAlreadyExists {
            hive_id,
            tag: event.tag.clone(),
        });
    }

    Ok(Faction {
        id: FactionId::new(),
        hive_id,
        tag: event.tag.clone(),
        name: event.name.clone(),
        description: event.description.clone(),
        private_info: event.private_info.clone(),
        accept_humans: event.accept_humans,
        founder_steam_id: event.founder_steam_id,
        auto_accept_member: false,
        auto_accept_peace: false,
        relations: Vec::new(),
        members: Vec::new(),
        sectors: SectorAliases::single(sector_id, event.faction_id),
    })
}

/// Record that `sector_id` now knows `faction` as `local_id`.
///
/// Used when a second sector finishes instantiating its copy of a faction
/// announced elsewhere. A sector never holds two aliases for one faction.
pub fn add_sector_alias(
    faction: &mut Faction,
    sector_id: SectorId,
    local_id: LocalFactionId,
) -> AliasChange {
    let change = faction.sectors.insert(sector_id, local_id);
    if let AliasChange::Replaced { previous } = change {
        tracing::debug!(
            faction_id = %faction.id,
            sector_id = %sector_id,
            previous = %previous,
            local_id = %local_id,
            "sector re-aliased faction"
        );
    }
    change
}

/// Apply a profile edit in place.
pub fn edit_faction(faction: &mut Faction, event: &FactionEdited) {
    faction.tag.clone_from(&event.tag);
    faction.name.clone_from(&event.name);
    faction.description.clone_from(&event.description);
    faction.private_info.clone_from(&event.private_info);
}

/// Update the two auto-accept policy flags.
pub const fn set_auto_accept(faction: &mut Faction, auto_accept_member: bool, auto_accept_peace: bool) {
    faction.auto_accept_member = auto_accept_member;
    faction.auto_accept_peace = auto_accept_peace;
}

/// Find the faction `sector_id` knows as `local_id`.
pub fn find_by_alias<'a, I>(
    factions: I,
    sector_id: SectorId,
    local_id: LocalFactionId,
) -> Option<&'a Faction>
where
    I: IntoIterator<Item = &'a Faction>,
{
    factions
        .into_iter()
        .find(|faction| faction.sectors.contains(sector_id, local_id))
}

/// Find the faction carrying `tag`.
pub fn find_by_tag<'a, I>(factions: I, tag: &str) -> Option<&'a Faction>
where
    I: IntoIterator<Item = &'a Faction>,
{
    factions.into_iter().find(|faction| faction.tag == tag)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::SteamId;

    use super::*;

    fn created(tag: &str, local: i64) -> FactionCreated {
        FactionCreated {
            faction_id: LocalFactionId(local),
            tag: tag.to_owned(),
            name: format!("{tag} Corp"),
            description: String::from("desc"),
            private_info: String::from("secret"),
            accept_humans: true,
            founder_id: 1,
            founder_steam_id: SteamId(99),
            founder_name: String::from("Founder"),
        }
    }

    #[test]
    fn create_then_alias_grows_sectors_by_one() {
        let hive = HiveId::new();
        let s1 = SectorId::new();
        let s2 = SectorId::new();

        let mut faction = create_faction(None, hive, s1, &created("ABC", 10)).unwrap();
        assert_eq!(faction.sectors.len(), 1);
        assert_eq!(faction.sectors.local_id_for(s1), Some(LocalFactionId(10)));
        assert_eq!(faction.founder_steam_id, SteamId(99));

        let change = add_sector_alias(&mut faction, s2, LocalFactionId(20));
        assert_eq!(change, AliasChange::Added);
        assert_eq!(faction.sectors.len(), 2);
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let hive = HiveId::new();
        let s1 = SectorId::new();
        let first = create_faction(None, hive, s1, &created("ABC", 10)).unwrap();

        let err = create_faction(Some(&first), hive, SectorId::new(), &created("ABC", 3))
            .unwrap_err();
        assert_eq!(err.kind(), crate::FactionErrorKind::AlreadyExists);
    }

    #[test]
    fn repeated_alias_is_not_inserted_twice() {
        let s1 = SectorId::new();
        let mut faction =
            create_faction(None, HiveId::new(), s1, &created("ABC", 10)).unwrap();
        assert_eq!(
            add_sector_alias(&mut faction, s1, LocalFactionId(10)),
            AliasChange::Unchanged
        );
        assert_eq!(faction.sectors.len(), 1);
    }

    #[test]
    fn edit_and_auto_accept_mutate_in_place() {
        let mut faction =
            create_faction(None, HiveId::new(), SectorId::new(), &created("ABC", 10)).unwrap();
        edit_faction(
            &mut faction,
            &FactionEdited {
                faction_id: LocalFactionId(10),
                tag: String::from("XYZ"),
                name: String::from("Renamed"),
                description: String::from("new"),
                private_info: String::new(),
            },
        );
        set_auto_accept(&mut faction, true, false);

        assert_eq!(faction.tag, "XYZ");
        assert_eq!(faction.name, "Renamed");
        assert_eq!(faction.description, "new");
        assert!(faction.private_info.is_empty());
        assert!(faction.auto_accept_member);
        assert!(!faction.auto_accept_peace);
    }

    #[test]
    fn lookups_resolve_through_aliases() {
        let hive = HiveId::new();
        let s1 = SectorId::new();
        let s2 = SectorId::new();
        let mut a = create_faction(None, hive, s1, &created("AAA", 10)).unwrap();
        add_sector_alias(&mut a, s2, LocalFactionId(20));
        let b = create_faction(None, hive, s1, &created("BBB", 11)).unwrap();
        let factions = vec![a, b];

        assert_eq!(
            find_by_alias(&factions, s2, LocalFactionId(20)).map(|f| f.tag.as_str()),
            Some("AAA")
        );
        assert_eq!(
            find_by_alias(&factions, s1, LocalFactionId(11)).map(|f| f.tag.as_str()),
            Some("BBB")
        );
        // Sector 2 uses 20 for AAA; 10 means nothing there.
        assert!(find_by_alias(&factions, s2, LocalFactionId(10)).is_none());
        assert!(find_by_tag(&factions, "BBB").is_some());
        assert!(find_by_tag(&factions, "CCC").is_none());
    }
}
