//! Membership transitions.
//!
//! Steam IDs are unique within a faction's member list. Leave, kick and
//! cancel-join all collapse into the same removal.

use hive_types::{Faction, FactionMember, MemberAction, MemberState, SteamId};

use crate::error::FactionError;

/// The member row a transition touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberChange {
    /// The row was inserted or updated and now reads as given.
    Upserted(FactionMember),
    /// The row for this player was deleted.
    Removed(SteamId),
}

/// Append a pending join request.
///
/// # Errors
///
/// Returns [`FactionError::MemberAlreadyExists`] if the player is listed.
pub fn member_send_join(
    faction: &mut Faction,
    steam_id: SteamId,
) -> Result<MemberChange, FactionError> {
    if faction.member(steam_id).is_some() {
        return Err(FactionError::MemberAlreadyExists {
            faction_id: faction.id,
            steam_id,
        });
    }

    let member = FactionMember {
        steam_id,
        state: MemberState::RequestedJoin,
        is_leader: false,
    };
    faction.members.push(member);
    Ok(MemberChange::Upserted(member))
}

/// Remove a member or a pending join request.
///
/// # Errors
///
/// Returns [`FactionError::MemberNotFound`] if the player is not listed.
pub fn member_leave(
    faction: &mut Faction,
    steam_id: SteamId,
) -> Result<MemberChange, FactionError> {
    let before = faction.members.len();
    faction.members.retain(|m| m.steam_id != steam_id);
    if faction.members.len() == before {
        return Err(FactionError::MemberNotFound {
            faction_id: faction.id,
            steam_id,
        });
    }
    Ok(MemberChange::Removed(steam_id))
}

/// Turn a pending join request into full membership.
///
/// # Errors
///
/// Returns [`FactionError::MemberNotFound`] if the player is not listed.
pub fn member_accept_join(
    faction: &mut Faction,
    steam_id: SteamId,
) -> Result<MemberChange, FactionError> {
    update_member(faction, steam_id, |m| m.state = MemberState::Joined)
}

/// Promote a member to leader, or demote a leader.
///
/// # Errors
///
/// Returns [`FactionError::MemberNotFound`] if the player is not listed.
pub fn member_set_leader(
    faction: &mut Faction,
    steam_id: SteamId,
    promote: bool,
) -> Result<MemberChange, FactionError> {
    update_member(faction, steam_id, |m| m.is_leader = promote)
}

/// Apply any of the seven member events.
///
/// # Errors
///
/// Propagates the error of the underlying transition.
pub fn apply_member_action(
    faction: &mut Faction,
    action: MemberAction,
    steam_id: SteamId,
) -> Result<MemberChange, FactionError> {
    match action {
        MemberAction::SendJoin => member_send_join(faction, steam_id),
        MemberAction::CancelJoin | MemberAction::Kick | MemberAction::Leave => {
            member_leave(faction, steam_id)
        }
        MemberAction::AcceptJoin => member_accept_join(faction, steam_id),
        MemberAction::Promote => member_set_leader(faction, steam_id, true),
        MemberAction::Demote => member_set_leader(faction, steam_id, false),
    }
}

fn update_member(
    faction: &mut Faction,
    steam_id: SteamId,
    apply: impl FnOnce(&mut FactionMember),
) -> Result<MemberChange, FactionError> {
    let faction_id = faction.id;
    let member = faction
        .members
        .iter_mut()
        .find(|m| m.steam_id == steam_id)
        .ok_or(FactionError::MemberNotFound {
            faction_id,
            steam_id,
        })?;
    apply(member);
    Ok(MemberChange::Upserted(*member))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::{FactionId, HiveId, LocalFactionId, SectorAliases, SectorId};

    use super::*;
    use crate::FactionErrorKind;

    fn faction() -> Faction {
        Faction {
            id: FactionId::new(),
            hive_id: HiveId::new(),
            tag: String::from("ABC"),
            name: String::from("Alpha"),
            description: String::new(),
            private_info: String::new(),
            accept_humans: true,
            founder_steam_id: SteamId(1),
            auto_accept_member: false,
            auto_accept_peace: false,
            relations: Vec::new(),
            members: Vec::new(),
            sectors: SectorAliases::single(SectorId::new(), LocalFactionId(1)),
        }
    }

    #[test]
    fn join_request_is_appended_once() {
        let mut f = faction();
        let change = member_send_join(&mut f, SteamId(7)).unwrap();
        assert_eq!(
            change,
            MemberChange::Upserted(FactionMember {
                steam_id: SteamId(7),
                state: MemberState::RequestedJoin,
                is_leader: false,
            })
        );

        let err = member_send_join(&mut f, SteamId(7)).unwrap_err();
        assert_eq!(err.kind(), FactionErrorKind::AlreadyExists);
        assert_eq!(f.members.len(), 1);
    }

    #[test]
    fn leave_on_non_member_mutates_nothing() {
        let mut f = faction();
        member_send_join(&mut f, SteamId(7)).unwrap();
        let before = f.clone();

        let err = member_leave(&mut f, SteamId(8)).unwrap_err();
        assert_eq!(err.kind(), FactionErrorKind::NotFound);
        assert_eq!(f, before);
    }

    #[test]
    fn kick_leave_and_cancel_all_remove() {
        for action in [MemberAction::Kick, MemberAction::Leave, MemberAction::CancelJoin] {
            let mut f = faction();
            member_send_join(&mut f, SteamId(7)).unwrap();
            let change = apply_member_action(&mut f, action, SteamId(7)).unwrap();
            assert_eq!(change, MemberChange::Removed(SteamId(7)));
            assert!(f.members.is_empty());
        }
    }

    #[test]
    fn accept_then_promote_then_demote() {
        let mut f = faction();
        member_send_join(&mut f, SteamId(7)).unwrap();

        apply_member_action(&mut f, MemberAction::AcceptJoin, SteamId(7)).unwrap();
        assert_eq!(f.member(SteamId(7)).map(|m| m.state), Some(MemberState::Joined));

        apply_member_action(&mut f, MemberAction::Promote, SteamId(7)).unwrap();
        assert_eq!(f.member(SteamId(7)).map(|m| m.is_leader), Some(true));

        let change = apply_member_action(&mut f, MemberAction::Demote, SteamId(7)).unwrap();
        assert_eq!(
            change,
            MemberChange::Upserted(FactionMember {
                steam_id: SteamId(7),
                state: MemberState::Joined,
                is_leader: false,
            })
        );
    }

    #[test]
    fn updates_on_unknown_member_fail() {
        let mut f = faction();
        for action in [MemberAction::AcceptJoin, MemberAction::Promote, MemberAction::Demote] {
            let err = apply_member_action(&mut f, action, SteamId(3)).unwrap_err();
            assert_eq!(err.kind(), FactionErrorKind::NotFound);
        }
    }
}
