//! Two-sided relation state between factions.
//!
//! Each faction holds its own row per counterpart, keyed by the counterpart's
//! store identifier. The rows are written with find-or-insert-then-set, so
//! repeating a transition is harmless. The two rows of a pair are never
//! locked together: each write is an independent upsert and the pair may
//! transiently disagree.
//!
//! Peace requests are asymmetric. The requester's row moves to
//! [`RelationState::PeaceRequested`] while the target keeps its previous
//! relation (still `War`, say) until it accepts. Cancelling a request resets
//! only the requester's row to `Neutral`; whatever relation preceded the
//! request is not restored.

use hive_types::{Faction, FactionId, FactionRelation, RelationAction, RelationState};

use crate::error::FactionError;

/// A relation row after a write, together with the faction that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRow {
    /// The faction whose record holds the row.
    pub owner: FactionId,
    /// The row as written.
    pub relation: FactionRelation,
}

/// The rows a relation transition wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationUpdate {
    /// The acting faction's row keyed by the counterpart.
    pub requester: RelationRow,
    /// The counterpart's mirrored row, when the transition is symmetric.
    pub counterpart: Option<RelationRow>,
}

impl RelationUpdate {
    /// Iterate over the rows that need persisting.
    pub fn rows(&self) -> impl Iterator<Item = RelationRow> + use<> {
        core::iter::once(self.requester).chain(self.counterpart)
    }
}

/// Set `from`'s relation towards `to`, mirroring onto `to` unless the new
/// state is a peace request.
///
/// # Errors
///
/// Returns [`FactionError::SelfRelation`] if both records are the same
/// faction.
pub fn update_relation(
    from: &mut Faction,
    to: &mut Faction,
    state: RelationState,
) -> Result<RelationUpdate, FactionError> {
    write_relation(from, to, state, state != RelationState::PeaceRequested)
}

/// Apply one of the four relation events.
///
/// Send and cancel touch only the requester's row. Accept and war write both
/// sides.
///
/// # Errors
///
/// Returns [`FactionError::SelfRelation`] if both records are the same
/// faction.
pub fn apply_relation_action(
    from: &mut Faction,
    to: &mut Faction,
    action: RelationAction,
) -> Result<RelationUpdate, FactionError> {
    write_relation(from, to, action.target_state(), action.is_mirrored())
}

fn write_relation(
    from: &mut Faction,
    to: &mut Faction,
    state: RelationState,
    mirrored: bool,
) -> Result<RelationUpdate, FactionError> {
    if from.id == to.id {
        return Err(FactionError::SelfRelation(from.id));
    }

    let requester = upsert_relation(from, to.id, state);
    let counterpart = mirrored.then(|| upsert_relation(to, from.id, state));

    tracing::debug!(
        from = %from.id,
        to = %to.id,
        state = ?state,
        mirrored,
        "relation updated"
    );

    Ok(RelationUpdate {
        requester,
        counterpart,
    })
}

fn upsert_relation(owner: &mut Faction, other: FactionId, state: RelationState) -> RelationRow {
    let relation = FactionRelation {
        faction_id: other,
        state,
    };
    match owner.relations.iter_mut().find(|r| r.faction_id == other) {
        Some(existing) => existing.state = state,
        None => owner.relations.push(relation),
    }
    RelationRow {
        owner: owner.id,
        relation,
    }
}
