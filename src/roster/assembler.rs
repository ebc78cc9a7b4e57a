//! Builds [PlayerData] from either the local tables or a remote provider. The two paths are
//! never mixed within one call.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::data::directory::UnitDirectory;
use crate::data::player::PlayerData;
use crate::data::unit::TagFilter;
use crate::remote::DataProvider;
use crate::tables::{RosterStore, UnitTableStore};

/// Resolve every unit of `player` through `directory`, keeping only identified units whose
/// tags pass `tag_filter`. Kept units come back enriched. Returns how many were dropped.
pub fn enrich_units(
    player: &mut PlayerData,
    tag_filter: &TagFilter,
    directory: &mut UnitDirectory<'_>,
) -> usize {
    let mut dropped = 0;
    for (_, mut unit) in player.take_units() {
        match directory.lookup(&unit.base_id) {
            Some(definition) if tag_filter.matches(&definition.tags) => {
                unit.enrich(definition);
                player.add_unit(unit);
            }
            _ => dropped += 1,
        }
    }
    dropped
}

pub struct RosterAssembler<'a> {
    roster: &'a dyn RosterStore,
    heroes: &'a dyn UnitTableStore,
    ships: &'a dyn UnitTableStore,
    provider: Option<&'a dyn DataProvider>,
}

impl<'a> RosterAssembler<'a> {
    pub fn new(
        roster: &'a dyn RosterStore,
        heroes: &'a dyn UnitTableStore,
        ships: &'a dyn UnitTableStore,
    ) -> Self {
        RosterAssembler {
            roster,
            heroes,
            ships,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: &'a dyn DataProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn roster(&self) -> &dyn RosterStore {
        self.roster
    }

    /// Fetch one player from the configured provider and keep the units that resolve and
    /// match `tag_filter`. Any provider failure reads as "not found".
    pub fn assemble_from_remote(
        &self,
        ally_code: u64,
        tag_filter: &TagFilter,
        directory: &mut UnitDirectory<'_>,
    ) -> Option<PlayerData> {
        let Some(provider) = self.provider else {
            warn!(ally_code, "no remote provider configured");
            return None;
        };
        let mut player = match provider.fetch_player(ally_code) {
            Ok(player) => player,
            Err(err) => {
                warn!(ally_code, provider = provider.name(), error = %err, "player fetch failed");
                return None;
            }
        };
        let dropped = enrich_units(&mut player, tag_filter, directory);
        debug!(
            ally_code,
            kept = player.units.len(),
            dropped,
            "assembled player from remote"
        );
        Some(player)
    }

    /// Roster row by exact name plus that member's hero and ship instances that pass
    /// `tag_filter`.
    pub fn assemble_from_local_tables(
        &self,
        member_name: &str,
        tag_filter: &TagFilter,
    ) -> Option<PlayerData> {
        let Some(row) = self.roster.find_by_name(member_name) else {
            debug!(member_name, "member not in roster");
            return None;
        };
        let mut player = PlayerData::from_roster_row(row);
        let units = self
            .heroes
            .member_instances(member_name)
            .into_values()
            .chain(self.ships.member_instances(member_name).into_values());
        for unit in units {
            if unit.matches_tag(tag_filter) {
                player.add_unit(unit);
            }
        }
        Some(player)
    }

    /// Every roster member, unfiltered, in roster order. Both unit tables are indexed once.
    pub fn assemble_bulk(&self) -> Vec<PlayerData> {
        let mut heroes = self.heroes.all_instances_by_member();
        let mut ships = self.ships.all_instances_by_member();

        self.roster
            .base_attributes()
            .iter()
            .map(|row| {
                let mut player = PlayerData::from_roster_row(row);
                let owned = take_member(&mut heroes, &row.name)
                    .into_values()
                    .chain(take_member(&mut ships, &row.name).into_values());
                for unit in owned {
                    player.add_unit(unit);
                }
                player
            })
            .collect()
    }
}

fn take_member<V: Default>(index: &mut HashMap<String, V>, name: &str) -> V {
    index.remove(name).unwrap_or_default()
}
