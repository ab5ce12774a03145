//! Where a dispatched event goes next.

use std::collections::BTreeMap;

use hive_types::{HiveId, SectorId};

/// The hive and sector a connection speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Affinity {
    /// The hive the sector belongs to.
    pub hive_id: HiveId,
    /// The sector itself.
    pub sector_id: SectorId,
}

impl Affinity {
    /// Bundle a hive and sector.
    pub const fn new(hive_id: HiveId, sector_id: SectorId) -> Self {
        Self { hive_id, sector_id }
    }
}

/// The dispatcher's verdict on an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoutingPlan {
    /// Handled locally, nothing to forward.
    #[default]
    None,
    /// Forward this text verbatim to every other sector of the hive.
    Broadcast(String),
    /// Forward a sector-specific rewrite to each listed sector.
    Targeted(BTreeMap<SectorId, String>),
}

impl RoutingPlan {
    /// Build a targeted plan, collapsing an empty one to [`RoutingPlan::None`].
    pub fn targeted(messages: BTreeMap<SectorId, String>) -> Self {
        if messages.is_empty() {
            Self::None
        } else {
            Self::Targeted(messages)
        }
    }

    /// Whether there is nothing to forward.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
