//! Administrative exclusions: (player, unit) pairs pruned from the bulk roster before it is
//! written back to the unit tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::player::PlayerData;
use crate::data::unit::{TagFilter, UnitInstance};
use crate::tables::{Grid, MAX_PLAYERS};

/// Unit name -> player name -> instance. The inverse of [PlayerData::units], shaped for
/// write-back where each unit is a row and each player a column.
pub type BulkUnits = BTreeMap<String, BTreeMap<String, UnitInstance>>;

/// Player name -> unit names marked for exclusion. Only marked pairs are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionMap {
    marks: BTreeMap<String, BTreeSet<String>>,
}

impl ExclusionMap {
    pub fn mark(&mut self, player: &str, unit: &str) {
        self.marks
            .entry(player.to_string())
            .or_default()
            .insert(unit.to_string());
    }

    pub fn is_excluded(&self, player: &str, unit: &str) -> bool {
        self.marks
            .get(player)
            .is_some_and(|units| units.contains(unit))
    }

    pub fn players(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.marks.iter().map(|(player, units)| (player.as_str(), units))
    }

    /// Number of players with at least one mark.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Rows with a blank first cell are ignored. The first kept row names the players (its
    /// first cell is a label); every later row starts with a unit name, and any non-blank cell
    /// under a player marks that pair.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut map = ExclusionMap::default();
        let mut rows = grid.rows().iter().filter(|row| {
            row.first().is_some_and(|cell| !cell.is_blank())
        });
        let Some(header) = rows.next() else {
            return map;
        };
        let players: Vec<Option<String>> = header
            .iter()
            .skip(1)
            .take(MAX_PLAYERS)
            .map(|cell| cell.as_label())
            .collect();

        for row in rows {
            let unit = row[0].display();
            let unit = unit.trim();
            for (cell, player) in row.iter().skip(1).zip(&players) {
                if let Some(player) = player {
                    if !cell.is_blank() {
                        map.mark(player, unit);
                    }
                }
            }
        }
        map
    }
}

/// What to prune once a player's marks have been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyKeyPolicy {
    /// Remove the top-level key named after the player, if present and empty.
    #[default]
    PlayerKey,
    /// Remove every unit whose player map became empty.
    UnitKeys,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusionEngine {
    policy: EmptyKeyPolicy,
}

impl ExclusionEngine {
    pub fn new(policy: EmptyKeyPolicy) -> Self {
        ExclusionEngine { policy }
    }

    /// Remove every marked (unit, player) pair present in `bulk`. With an alignment, only
    /// instances whose tags contain it are removed. Marks naming an unknown player or unit
    /// are ignored. Mutates in place and hands the same structure back.
    pub fn process<'b>(
        &self,
        bulk: &'b mut BulkUnits,
        exclusions: &ExclusionMap,
        alignment: Option<&str>,
    ) -> &'b mut BulkUnits {
        let filter = alignment.map(TagFilter::new).unwrap_or_default();
        let mut removed = 0usize;

        for (player, units) in exclusions.players() {
            for unit in units {
                let Some(owners) = bulk.get_mut(unit) else {
                    continue;
                };
                if owners.get(player).is_some_and(|inst| inst.matches_tag(&filter)) {
                    owners.remove(player);
                    removed += 1;
                }
            }
            match self.policy {
                EmptyKeyPolicy::PlayerKey => {
                    if bulk.get(player).is_some_and(BTreeMap::is_empty) {
                        bulk.remove(player);
                    }
                }
                EmptyKeyPolicy::UnitKeys => {
                    for unit in units {
                        if bulk.get(unit).is_some_and(BTreeMap::is_empty) {
                            bulk.remove(unit);
                        }
                    }
                }
            }
        }
        debug!(removed, policy = ?self.policy, "exclusions applied");
        bulk
    }
}

/// Regroup per-player units by unit name. Unidentified units have no name and are left out.
pub fn invert_players(players: &[PlayerData]) -> BulkUnits {
    let mut bulk = BulkUnits::new();
    for player in players {
        for unit in player.units.values() {
            let Some(name) = unit.name.as_ref() else {
                continue;
            };
            bulk.entry(name.clone())
                .or_default()
                .insert(player.name.clone(), unit.clone());
        }
    }
    bulk
}
