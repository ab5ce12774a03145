//! The per-sector identifier alias table carried by every faction.
//!
//! A faction is held once by the store but every sector that instantiated it
//! knows it under its own [`LocalFactionId`]. [`SectorAliases`] records those
//! pairs in insertion order, at most one per sector, and answers lookups in
//! both directions. It is never collapsed into a single id space.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{LocalFactionId, SectorId};

/// One `(sector, local id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FactionSector {
    /// The sector holding the alias.
    pub sector_id: SectorId,
    /// The faction's identifier inside that sector.
    pub entity_id: LocalFactionId,
}

/// Outcome of recording an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasChange {
    /// A new entry was appended.
    Added,
    /// The exact pair was already present.
    Unchanged,
    /// The sector already had a different alias, which was overwritten.
    Replaced {
        /// The alias the sector held before.
        previous: LocalFactionId,
    },
}

/// Ordered alias table: sector to local faction id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SectorAliases(Vec<FactionSector>);

impl SectorAliases {
    /// Create a table holding a single alias.
    pub fn single(sector_id: SectorId, entity_id: LocalFactionId) -> Self {
        Self(vec![FactionSector {
            sector_id,
            entity_id,
        }])
    }

    /// The local id `sector_id` uses for this faction, if it has one.
    pub fn local_id_for(&self, sector_id: SectorId) -> Option<LocalFactionId> {
        self.0
            .iter()
            .find(|alias| alias.sector_id == sector_id)
            .map(|alias| alias.entity_id)
    }

    /// Whether `sector_id` knows this faction as `entity_id`.
    pub fn contains(&self, sector_id: SectorId, entity_id: LocalFactionId) -> bool {
        self.0
            .iter()
            .any(|alias| alias.sector_id == sector_id && alias.entity_id == entity_id)
    }

    /// Record an alias, keeping at most one entry per sector.
    pub fn insert(&mut self, sector_id: SectorId, entity_id: LocalFactionId) -> AliasChange {
        match self.0.iter_mut().find(|alias| alias.sector_id == sector_id) {
            Some(existing) if existing.entity_id == entity_id => AliasChange::Unchanged,
            Some(existing) => {
                let previous = existing.entity_id;
                existing.entity_id = entity_id;
                AliasChange::Replaced { previous }
            }
            None => {
                self.0.push(FactionSector {
                    sector_id,
                    entity_id,
                });
                AliasChange::Added
            }
        }
    }

    /// Iterate over the sectors holding an alias, in insertion order.
    pub fn sectors(&self) -> impl Iterator<Item = SectorId> + '_ {
        self.0.iter().map(|alias| alias.sector_id)
    }

    /// Iterate over all alias pairs, in insertion order.
    pub fn iter(&self) -> core::slice::Iter<'_, FactionSector> {
        self.0.iter()
    }

    /// Number of sectors holding an alias.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no sector holds an alias.
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<FactionSector> for SectorAliases {
    fn from_iter<I: IntoIterator<Item = FactionSector>>(iter: I) -> Self {
        let mut aliases = Self::default();
        for alias in iter {
            aliases.insert(alias.sector_id, alias.entity_id);
        }
        aliases
    }
}

impl<'a> IntoIterator for &'a SectorAliases {
    type Item = &'a FactionSector;
    type IntoIter = core::slice::Iter<'a, FactionSector>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_work_in_both_directions() {
        let s1 = SectorId::new();
        let s2 = SectorId::new();
        let mut aliases = SectorAliases::single(s1, LocalFactionId(10));
        assert_eq!(aliases.insert(s2, LocalFactionId(20)), AliasChange::Added);

        assert_eq!(aliases.local_id_for(s1), Some(LocalFactionId(10)));
        assert_eq!(aliases.local_id_for(s2), Some(LocalFactionId(20)));
        assert!(aliases.contains(s2, LocalFactionId(20)));
        assert!(!aliases.contains(s2, LocalFactionId(10)));
        assert_eq!(aliases.local_id_for(SectorId::new()), None);
    }

    #[test]
    fn one_entry_per_sector() {
        let s1 = SectorId::new();
        let mut aliases = SectorAliases::single(s1, LocalFactionId(10));

        assert_eq!(aliases.insert(s1, LocalFactionId(10)), AliasChange::Unchanged);
        assert_eq!(aliases.len(), 1);

        assert_eq!(
            aliases.insert(s1, LocalFactionId(11)),
            AliasChange::Replaced {
                previous: LocalFactionId(10)
            }
        );
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.local_id_for(s1), Some(LocalFactionId(11)));
    }

    #[test]
    fn preserves_insertion_order() {
        let sectors: Vec<SectorId> = (0..4).map(|_| SectorId::new()).collect();
        let aliases: SectorAliases = sectors
            .iter()
            .zip(1_i64..)
            .map(|(&sector_id, n)| FactionSector {
                sector_id,
                entity_id: LocalFactionId(n),
            })
            .collect();

        let order: Vec<SectorId> = aliases.sectors().collect();
        assert_eq!(order, sectors);
    }
}
