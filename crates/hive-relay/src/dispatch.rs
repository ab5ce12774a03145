//! Inbound event dispatch.
//!
//! [`Dispatcher::dispatch`] is called once per text frame, on the task of the
//! connection that sent it. It decodes the envelope, resolves the sender's
//! local faction ids through the entity store, runs the faction state
//! engine, persists exactly the rows the transition touched and returns a
//! [`RoutingPlan`] for the hub. Fetch and write are not locked together;
//! concurrent writers to the same row resolve last-write-wins.

use std::sync::Arc;

use hive_db::EntityStore;
use hive_factions::{
    MemberChange, add_sector_alias, apply_member_action, apply_relation_action, create_faction,
    edit_faction, set_auto_accept,
};
use hive_types::{
    AliasChange, Envelope, EventKind, Faction, FactionAutoAcceptChanged, FactionCreated,
    FactionCreatedComplete, FactionEdited, FactionMemberEvent, FactionRelationEvent,
    FactionSector, LocalFactionId, MemberAction, RelationAction, SectorEvent, SectorState,
    ServerLifecycle, ServerPlayersChanged,
};

use crate::error::DispatchError;
use crate::presence::{PresenceChange, PresenceSender};
use crate::routing::{Affinity, RoutingPlan};
use crate::translate::{fan_out, fan_out_relation};

/// Applies inbound events to the entity store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn EntityStore>,
    presence: Option<PresenceSender>,
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("presence", &self.presence.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher that writes lifecycle transitions straight to
    /// the store.
    pub const fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            presence: None,
        }
    }

    /// Queue lifecycle transitions behind the hub's own presence changes
    /// instead of writing them directly, so a sector's states are recorded
    /// in the order they happened.
    #[must_use]
    pub fn with_presence(mut self, presence: PresenceSender) -> Self {
        self.presence = Some(presence);
        self
    }

    /// The store this dispatcher writes to.
    pub const fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Apply one raw envelope sent by `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the envelope is malformed, refers to
    /// something that does not exist, would duplicate something that does,
    /// or the store fails. Unknown event types are not an error.
    pub async fn dispatch(&self, origin: Affinity, raw: &str) -> Result<RoutingPlan, DispatchError> {
        let envelope = Envelope::parse(raw)?;
        let event = SectorEvent::decode(&envelope)?;

        tracing::debug!(
            hive = %origin.hive_id,
            sector = %origin.sector_id,
            event_type = %envelope.event_type,
            "Dispatching event"
        );

        match event {
            SectorEvent::FactionCreated(payload) => {
                self.faction_created(origin, &payload, raw).await
            }
            SectorEvent::FactionCreatedComplete(payload) => {
                self.faction_created_complete(origin, &payload).await
            }
            SectorEvent::FactionEdited(payload) => self.faction_edited(origin, &payload).await,
            SectorEvent::FactionAutoAcceptChanged(payload) => {
                self.auto_accept_changed(origin, payload).await
            }
            SectorEvent::Member { action, payload } => {
                self.member_event(origin, action, payload).await
            }
            SectorEvent::Relation { action, payload } => {
                self.relation_event(origin, action, payload).await
            }
            SectorEvent::ServerStateChange(change) => {
                let state = match change.state {
                    ServerLifecycle::Loaded => SectorState::Online,
                    ServerLifecycle::Unloading => SectorState::Offline,
                };
                self.set_sector_state(origin, state).await?;
                Ok(RoutingPlan::None)
            }
            SectorEvent::ServerPlayersChanged(players) => {
                self.players_changed(origin, players).await
            }
            SectorEvent::Unknown(event_type) => {
                tracing::warn!(
                    hive = %origin.hive_id,
                    sector = %origin.sector_id,
                    event_type = %event_type,
                    "Ignoring unknown event type"
                );
                Ok(RoutingPlan::None)
            }
        }
    }

    // =========================================================================
    // Faction profile
    // =========================================================================

    async fn faction_created(
        &self,
        origin: Affinity,
        payload: &FactionCreated,
        raw: &str,
    ) -> Result<RoutingPlan, DispatchError> {
        let existing = self
            .store
            .find_faction_by_tag(origin.hive_id, &payload.tag)
            .await?;
        let faction = create_faction(existing.as_ref(), origin.hive_id, origin.sector_id, payload)?;
        self.store.insert_faction(&faction).await?;

        tracing::info!(
            hive = %origin.hive_id,
            sector = %origin.sector_id,
            faction = %faction.id,
            tag = %faction.tag,
            founder = %faction.founder_steam_id,
            "Faction created"
        );
        Ok(RoutingPlan::Broadcast(raw.to_owned()))
    }

    async fn faction_created_complete(
        &self,
        origin: Affinity,
        payload: &FactionCreatedComplete,
    ) -> Result<RoutingPlan, DispatchError> {
        let mut faction = self
            .store
            .find_faction_by_tag(origin.hive_id, &payload.tag)
            .await?
            .ok_or_else(|| {
                DispatchError::NotFound(format!(
                    "faction tag {:?} in hive {}",
                    payload.tag, origin.hive_id
                ))
            })?;

        let change = add_sector_alias(&mut faction, origin.sector_id, payload.faction_id);
        if change != AliasChange::Unchanged {
            self.store
                .upsert_alias(
                    faction.id,
                    FactionSector {
                        sector_id: origin.sector_id,
                        entity_id: payload.faction_id,
                    },
                )
                .await?;
        }

        tracing::debug!(
            faction = %faction.id,
            sector = %origin.sector_id,
            local_id = %payload.faction_id,
            aliases = faction.sectors.len(),
            "Faction alias recorded"
        );
        Ok(RoutingPlan::None)
    }

    async fn faction_edited(
        &self,
        origin: Affinity,
        payload: &FactionEdited,
    ) -> Result<RoutingPlan, DispatchError> {
        let mut faction = self.faction_by_alias(origin, payload.faction_id).await?;
        edit_faction(&mut faction, payload);
        self.store.update_faction_profile(&faction).await?;

        Ok(fan_out(
            &faction,
            origin.sector_id,
            EventKind::FactionEdited,
            |faction_id| FactionEdited {
                faction_id,
                ..payload.clone()
            },
        )?)
    }

    async fn auto_accept_changed(
        &self,
        origin: Affinity,
        payload: FactionAutoAcceptChanged,
    ) -> Result<RoutingPlan, DispatchError> {
        let mut faction = self.faction_by_alias(origin, payload.faction_id).await?;
        set_auto_accept(
            &mut faction,
            payload.auto_accept_member,
            payload.auto_accept_peace,
        );
        self.store.update_faction_profile(&faction).await?;

        Ok(fan_out(
            &faction,
            origin.sector_id,
            EventKind::FactionAutoAcceptChanged,
            |faction_id| FactionAutoAcceptChanged {
                faction_id,
                ..payload
            },
        )?)
    }

    // =========================================================================
    // Members and relations
    // =========================================================================

    async fn member_event(
        &self,
        origin: Affinity,
        action: MemberAction,
        payload: FactionMemberEvent,
    ) -> Result<RoutingPlan, DispatchError> {
        let mut faction = self.faction_by_alias(origin, payload.faction_id).await?;
        match apply_member_action(&mut faction, action, payload.player_steam_id)? {
            MemberChange::Upserted(member) => {
                self.store.upsert_member(faction.id, member).await?;
            }
            MemberChange::Removed(steam_id) => {
                self.store.remove_member(faction.id, steam_id).await?;
            }
        }

        tracing::debug!(
            faction = %faction.id,
            steam_id = %payload.player_steam_id,
            action = ?action,
            "Member updated"
        );
        Ok(fan_out(
            &faction,
            origin.sector_id,
            EventKind::Member(action),
            |faction_id| FactionMemberEvent {
                faction_id,
                ..payload
            },
        )?)
    }

    async fn relation_event(
        &self,
        origin: Affinity,
        action: RelationAction,
        payload: FactionRelationEvent,
    ) -> Result<RoutingPlan, DispatchError> {
        let (mut from, mut to) = tokio::try_join!(
            self.faction_by_alias(origin, payload.from_faction_id),
            self.faction_by_alias(origin, payload.to_faction_id),
        )?;

        let update = apply_relation_action(&mut from, &mut to, action)?;
        futures::future::try_join_all(
            update
                .rows()
                .map(|row| self.store.upsert_relation(row.owner, row.relation)),
        )
        .await?;

        tracing::debug!(
            from = %from.id,
            to = %to.id,
            action = ?action,
            "Relation updated"
        );
        Ok(fan_out_relation(
            &from,
            &to,
            origin.sector_id,
            action,
            payload,
        )?)
    }

    // =========================================================================
    // Sector lifecycle
    // =========================================================================

    async fn set_sector_state(
        &self,
        origin: Affinity,
        state: SectorState,
    ) -> Result<(), DispatchError> {
        if let Some(presence) = &self.presence {
            let change = PresenceChange {
                affinity: origin,
                state,
            };
            if presence.send(change).is_ok() {
                return Ok(());
            }
        }
        self.store
            .set_sector_state(origin.hive_id, origin.sector_id, state)
            .await?;
        Ok(())
    }

    async fn players_changed(
        &self,
        origin: Affinity,
        players: ServerPlayersChanged,
    ) -> Result<RoutingPlan, DispatchError> {
        self.store
            .set_sector_players(
                origin.hive_id,
                origin.sector_id,
                players.max_players,
                players.current_players,
            )
            .await?;
        Ok(RoutingPlan::None)
    }

    async fn faction_by_alias(
        &self,
        origin: Affinity,
        local_id: LocalFactionId,
    ) -> Result<Faction, DispatchError> {
        self.store
            .find_faction_by_alias(origin.hive_id, origin.sector_id, local_id)
            .await?
            .ok_or_else(|| {
                DispatchError::NotFound(format!(
                    "faction {local_id} in sector {}",
                    origin.sector_id
                ))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use chrono::Utc;
    use hive_db::MemoryStore;
    use hive_types::{
        Hive, HiveId, MemberState, RelationState, Sector, SectorId, SectorPosition, SteamId,
    };
    use serde_json::json;

    use super::*;

    struct Fixture {
        store: Arc<MemoryStore>,
        dispatcher: Dispatcher,
        hive: HiveId,
        s1: SectorId,
        s2: SectorId,
        s3: SectorId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let hive = Hive {
                id: HiveId::new(),
                name: "test".to_owned(),
                created_at: Utc::now(),
            };
            store.insert_hive(&hive).await.unwrap();
            let mut ids = Vec::new();
            for name in ["s1", "s2", "s3"] {
                let sector = Sector {
                    id: SectorId::new(),
                    hive_id: hive.id,
                    name: name.to_owned(),
                    address: String::new(),
                    state: SectorState::Offline,
                    max_players: 0,
                    player_count: 0,
                    position: SectorPosition::default(),
                    last_faction_sync: None,
                    last_economy_sync: None,
                };
                store.insert_sector(&sector).await.unwrap();
                ids.push(sector.id);
            }
            Self {
                dispatcher: Dispatcher::new(store.clone()),
                store,
                hive: hive.id,
                s1: ids[0],
                s2: ids[1],
                s3: ids[2],
            }
        }

        const fn at(&self, sector: SectorId) -> Affinity {
            Affinity::new(self.hive, sector)
        }

        async fn send(
            &self,
            sector: SectorId,
            event_type: &str,
            payload: serde_json::Value,
        ) -> Result<RoutingPlan, DispatchError> {
            let raw = json!({ "type": event_type, "payload": payload }).to_string();
            self.dispatcher.dispatch(self.at(sector), &raw).await
        }

        async fn create(&self, sector: SectorId, tag: &str, local: i64) {
            self.send(
                sector,
                "factionCreated",
                json!({
                    "factionId": local,
                    "tag": tag,
                    "name": format!("{tag} name"),
                    "founderSteamId": 76_561_198_000_000_001_u64,
                }),
            )
            .await
            .unwrap();
        }

        async fn complete(&self, sector: SectorId, tag: &str, local: i64) {
            self.send(
                sector,
                "factionCreatedComplete",
                json!({ "factionId": local, "tag": tag }),
            )
            .await
            .unwrap();
        }

        async fn faction(&self, tag: &str) -> Faction {
            self.store
                .find_faction_by_tag(self.hive, tag)
                .await
                .unwrap()
                .unwrap()
        }
    }

    fn payload_of(text: &str) -> serde_json::Value {
        Envelope::parse(text).unwrap().payload
    }

    #[tokio::test]
    async fn creation_broadcasts_raw_and_rejects_duplicate_tags() {
        let fx = Fixture::new().await;
        let raw = json!({
            "type": "factionCreated",
            "payload": { "FactionId": 10, "Tag": "ABC", "Name": "Alpha", "FounderSteamId": 5 }
        })
        .to_string();

        let plan = fx.dispatcher.dispatch(fx.at(fx.s1), &raw).await.unwrap();
        assert_eq!(plan, RoutingPlan::Broadcast(raw.clone()));

        let faction = fx.faction("ABC").await;
        assert_eq!(faction.sectors.local_id_for(fx.s1), Some(LocalFactionId(10)));
        assert!(faction.members.is_empty());
        assert_eq!(faction.founder_steam_id, SteamId(5));

        let dup = fx.dispatcher.dispatch(fx.at(fx.s2), &raw).await;
        assert!(matches!(dup, Err(DispatchError::AlreadyExists(_))));
        assert_eq!(fx.store.list_factions(fx.hive).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completion_adds_exactly_one_alias() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "ABC", 10).await;
        fx.complete(fx.s2, "ABC", 20).await;
        fx.complete(fx.s2, "ABC", 20).await;

        let faction = fx.faction("ABC").await;
        assert_eq!(faction.sectors.len(), 2);
        assert_eq!(faction.sectors.local_id_for(fx.s2), Some(LocalFactionId(20)));

        let missing = fx
            .send(fx.s2, "factionCreatedComplete", json!({ "factionId": 1, "tag": "NOPE" }))
            .await;
        assert!(matches!(missing, Err(DispatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn edits_fan_out_with_destination_ids() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "ABC", 10).await;
        fx.complete(fx.s2, "ABC", 20).await;

        let plan = fx
            .send(
                fx.s2,
                "factionEdited",
                json!({ "factionId": 20, "tag": "ABD", "name": "Renamed" }),
            )
            .await
            .unwrap();

        let RoutingPlan::Targeted(messages) = plan else {
            panic!("expected a targeted plan");
        };
        assert_eq!(messages.len(), 1);
        let payload = payload_of(&messages[&fx.s1]);
        assert_eq!(payload["factionId"], 10);
        assert_eq!(payload["tag"], "ABD");
        assert_eq!(fx.faction("ABD").await.name, "Renamed");
    }

    #[tokio::test]
    async fn member_and_policy_events_fan_out_with_destination_ids() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "ABC", 10).await;
        fx.complete(fx.s2, "ABC", 20).await;

        let plan = fx
            .send(
                fx.s1,
                "factionMemberSendJoin",
                json!({ "factionId": 10, "playerSteamId": 42 }),
            )
            .await
            .unwrap();
        let RoutingPlan::Targeted(messages) = plan else {
            panic!("expected a targeted plan");
        };
        assert_eq!(messages.keys().copied().collect::<Vec<_>>(), vec![fx.s2]);
        let envelope = Envelope::parse(&messages[&fx.s2]).unwrap();
        assert_eq!(envelope.event_type, "factionMemberSendJoin");
        assert_eq!(envelope.payload["factionId"], 20);
        assert_eq!(envelope.payload["playerSteamId"], 42);

        let plan = fx
            .send(
                fx.s2,
                "factionAutoAcceptChanged",
                json!({ "factionId": 20, "autoAcceptMember": true, "autoAcceptPeace": false }),
            )
            .await
            .unwrap();
        let RoutingPlan::Targeted(messages) = plan else {
            panic!("expected a targeted plan");
        };
        assert_eq!(messages.keys().copied().collect::<Vec<_>>(), vec![fx.s1]);
        let payload = payload_of(&messages[&fx.s1]);
        assert_eq!(payload["factionId"], 10);
        assert_eq!(payload["autoAcceptMember"], true);
        assert!(fx.faction("ABC").await.auto_accept_member);
    }

    #[tokio::test]
    async fn declare_war_is_symmetric_and_translated() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "AAA", 10).await;
        fx.complete(fx.s2, "AAA", 20).await;
        fx.create(fx.s1, "BBB", 11).await;
        fx.complete(fx.s3, "BBB", 31).await;

        let plan = fx
            .send(
                fx.s1,
                "factionDeclareWar",
                json!({ "fromFactionId": 10, "toFactionId": 11 }),
            )
            .await
            .unwrap();

        let (a, b) = (fx.faction("AAA").await, fx.faction("BBB").await);
        assert_eq!(a.relation_with(b.id), Some(RelationState::War));
        assert_eq!(b.relation_with(a.id), Some(RelationState::War));

        let RoutingPlan::Targeted(messages) = plan else {
            panic!("expected a targeted plan");
        };
        assert!(!messages.contains_key(&fx.s1));
        let to_s2 = payload_of(&messages[&fx.s2]);
        assert_eq!((to_s2["fromFactionId"].clone(), to_s2["toFactionId"].clone()), (json!(20), json!(11)));
        let to_s3 = payload_of(&messages[&fx.s3]);
        assert_eq!((to_s3["fromFactionId"].clone(), to_s3["toFactionId"].clone()), (json!(10), json!(31)));
    }

    #[tokio::test]
    async fn peace_request_leaves_target_row_alone() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "AAA", 10).await;
        fx.create(fx.s1, "BBB", 11).await;
        let ids = json!({ "fromFactionId": 10, "toFactionId": 11 });

        fx.send(fx.s1, "factionDeclareWar", ids.clone()).await.unwrap();
        fx.send(fx.s1, "factionSendPeaceRequest", ids.clone()).await.unwrap();

        let (a, b) = (fx.faction("AAA").await, fx.faction("BBB").await);
        assert_eq!(a.relation_with(b.id), Some(RelationState::PeaceRequested));
        assert_eq!(b.relation_with(a.id), Some(RelationState::War));

        fx.send(fx.s1, "factionCancelPeaceRequest", ids).await.unwrap();
        let (a, b) = (fx.faction("AAA").await, fx.faction("BBB").await);
        assert_eq!(a.relation_with(b.id), Some(RelationState::Neutral));
        assert_eq!(b.relation_with(a.id), Some(RelationState::War));
    }

    #[tokio::test]
    async fn self_relation_is_invalid() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "AAA", 10).await;
        let err = fx
            .send(
                fx.s1,
                "factionDeclareWar",
                json!({ "fromFactionId": 10, "toFactionId": 10 }),
            )
            .await;
        assert!(matches!(err, Err(DispatchError::Invalid(_))));
    }

    #[tokio::test]
    async fn membership_rejections_do_not_mutate() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "ABC", 10).await;
        let join = json!({ "factionId": 10, "playerSteamId": 7 });

        fx.send(fx.s1, "factionMemberSendJoin", join.clone()).await.unwrap();
        let dup = fx.send(fx.s1, "factionMemberSendJoin", join.clone()).await;
        assert!(matches!(dup, Err(DispatchError::AlreadyExists(_))));

        fx.send(fx.s1, "factionMemberAcceptJoin", join).await.unwrap();
        let faction = fx.faction("ABC").await;
        assert_eq!(faction.members.len(), 1);
        assert_eq!(faction.member(SteamId(7)).unwrap().state, MemberState::Joined);

        let stranger = fx
            .send(
                fx.s1,
                "factionMemberLeave",
                json!({ "factionId": 10, "playerSteamId": 8 }),
            )
            .await;
        assert!(matches!(stranger, Err(DispatchError::NotFound(_))));
        assert_eq!(fx.faction("ABC").await.members.len(), 1);
    }

    #[tokio::test]
    async fn unknown_alias_is_not_found() {
        let fx = Fixture::new().await;
        fx.create(fx.s1, "ABC", 10).await;
        let err = fx
            .send(
                fx.s2,
                "factionMemberKick",
                json!({ "factionId": 10, "playerSteamId": 1 }),
            )
            .await;
        assert!(matches!(err, Err(DispatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn server_reports_update_the_sector() {
        let fx = Fixture::new().await;
        fx.send(fx.s1, "serverStateChange", json!({ "state": "Loaded" }))
            .await
            .unwrap();
        fx.send(
            fx.s1,
            "serverPlayersChanged",
            json!({ "maxPlayers": 16, "currentPlayers": 4 }),
        )
        .await
        .unwrap();

        let sector = fx.store.get_sector(fx.hive, fx.s1).await.unwrap().unwrap();
        assert_eq!(sector.state, SectorState::Online);
        assert_eq!((sector.max_players, sector.player_count), (16, 4));

        fx.send(fx.s1, "serverStateChange", json!({ "state": "Unloading" }))
            .await
            .unwrap();
        let sector = fx.store.get_sector(fx.hive, fx.s1).await.unwrap().unwrap();
        assert_eq!(sector.state, SectorState::Offline);
    }

    #[tokio::test]
    async fn lifecycle_goes_through_presence_queue_when_attached() {
        let fx = Fixture::new().await;
        let (tx, mut rx) = crate::presence::presence_channel();
        let dispatcher = fx.dispatcher.clone().with_presence(tx);

        let raw = json!({ "type": "serverStateChange", "payload": { "state": "Loaded" } }).to_string();
        dispatcher.dispatch(fx.at(fx.s1), &raw).await.unwrap();

        let change = rx.try_recv().unwrap();
        assert_eq!(change.state, SectorState::Online);
        assert_eq!(change.affinity, fx.at(fx.s1));
    }

    #[tokio::test]
    async fn unknown_types_are_ignored_and_garbage_is_malformed() {
        let fx = Fixture::new().await;
        let plan = fx.send(fx.s1, "economyTick", json!({ "x": 1 })).await.unwrap();
        assert!(plan.is_none());

        let garbage = fx.dispatcher.dispatch(fx.at(fx.s1), "not json").await;
        assert!(matches!(garbage, Err(DispatchError::Malformed(_))));

        let wrong_shape = fx
            .send(fx.s1, "factionMemberKick", json!({ "factionId": "ten" }))
            .await;
        assert!(matches!(wrong_shape, Err(DispatchError::Malformed(_))));
    }
}
