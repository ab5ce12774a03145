//! Ordered persistence of sector lifecycle transitions.
//!
//! The hub reports registrations and removals as [`PresenceChange`]s on an
//! unbounded channel. A single writer task drains it in order and records
//! each transition in the entity store, so the hub loop itself never awaits
//! storage.

use std::sync::Arc;

use hive_db::EntityStore;
use hive_types::SectorState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::routing::Affinity;

/// A sector lifecycle transition to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    /// The sector whose state changed.
    pub affinity: Affinity,
    /// Its new state.
    pub state: SectorState,
}

/// Sending half of the presence queue.
pub type PresenceSender = mpsc::UnboundedSender<PresenceChange>;

/// Receiving half of the presence queue.
pub type PresenceReceiver = mpsc::UnboundedReceiver<PresenceChange>;

/// Create the presence queue.
pub fn presence_channel() -> (PresenceSender, PresenceReceiver) {
    mpsc::unbounded_channel()
}

/// Drain `changes` into the store until every sender is dropped.
///
/// Store failures are logged and skipped.
pub async fn run_presence_writer(store: Arc<dyn EntityStore>, mut changes: PresenceReceiver) {
    while let Some(change) = changes.recv().await {
        let PresenceChange { affinity, state } = change;
        match store
            .set_sector_state(affinity.hive_id, affinity.sector_id, state)
            .await
        {
            Ok(()) => tracing::debug!(
                hive = %affinity.hive_id,
                sector = %affinity.sector_id,
                state = ?state,
                "Sector state recorded"
            ),
            Err(e) => tracing::warn!(
                hive = %affinity.hive_id,
                sector = %affinity.sector_id,
                state = ?state,
                error = %e,
                "Failed to record sector state"
            ),
        }
    }
    tracing::debug!("Presence writer stopped");
}

/// Spawn [`run_presence_writer`] on the current runtime.
pub fn spawn_presence_writer(
    store: Arc<dyn EntityStore>,
    changes: PresenceReceiver,
) -> JoinHandle<()> {
    tokio::spawn(run_presence_writer(store, changes))
}
