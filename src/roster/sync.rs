//! Refresh the local CSV tables from the configured provider.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigurationProvider, GuildConfig};
use crate::data::directory::UnitDirectory;
use crate::data::exclusions::{invert_players, BulkUnits, ExclusionEngine};
use crate::data::player::PlayerData;
use crate::data::registry::{record_datasets, REGISTRY_FILE};
use crate::data::unit::{TagFilter, UnitKind};
use crate::remote::{DataProvider, RemoteError};
use crate::roster::assembler::enrich_units;
use crate::tables::workbook::{HEROES_CSV, ROSTER_CSV, SHIPS_CSV};
use crate::tables::{LocalTables, RosterStore, RosterTable, TableError, TablesLocation, UnitTable};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Tables(#[from] TableError),
    #[error("tables at '{0}' are read-only; sync needs a CSV directory")]
    ReadOnly(PathBuf),
    #[error("provider returned no guild members")]
    NoMembers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub members: usize,
    pub heroes: usize,
    pub ships: usize,
    pub dropped_units: usize,
    pub excluded: usize,
}

/// Keep only the units of each player that survived exclusion processing.
fn retain_bulk(players: &mut [PlayerData], bulk: &BulkUnits) -> usize {
    let mut removed = 0;
    for player in players.iter_mut() {
        let kept: HashSet<String> = player
            .units
            .values()
            .filter(|unit| {
                unit.name
                    .as_ref()
                    .and_then(|name| bulk.get(name))
                    .is_some_and(|owners| owners.contains_key(&player.name))
            })
            .map(|unit| unit.base_id.clone())
            .collect();
        for (base_id, unit) in player.take_units() {
            if kept.contains(&base_id) {
                player.add_unit(unit);
            } else {
                removed += 1;
            }
        }
    }
    removed
}

/// Pull definitions and members, enrich them, prune exclusions and rewrite `roster.csv`,
/// `heroes.csv` and `ships.csv` in the configured CSV directory.
pub fn sync_tables(config: &GuildConfig, provider: &dyn DataProvider) -> Result<SyncOutcome, SyncError> {
    let location = config.tables_location();
    let TablesLocation::CsvDir(dir) = &location else {
        return Err(SyncError::ReadOnly(location.path().to_path_buf()));
    };

    let existing = match LocalTables::load(&location, config.member_count()) {
        Ok(tables) => Some(tables),
        Err(err) => {
            warn!(error = %err, "no usable local tables, syncing from an empty roster");
            None
        }
    };
    let ally_codes = existing
        .as_ref()
        .map(|tables| tables.roster.ally_codes())
        .unwrap_or_default();

    let mut directory = UnitDirectory::from_remote(provider)?;
    let mut players = provider.fetch_guild(&ally_codes)?;
    players.truncate(config.member_count());
    if players.is_empty() {
        return Err(SyncError::NoMembers);
    }

    let any = TagFilter::any();
    let dropped_units = players
        .iter_mut()
        .map(|player| enrich_units(player, &any, &mut directory))
        .sum();

    let mut excluded = 0;
    if let Some(tables) = existing.as_ref().filter(|t| !t.exclusions.is_empty()) {
        let mut bulk = invert_players(&players);
        ExclusionEngine::new(config.exclusion_policy).process(&mut bulk, &tables.exclusions, None);
        excluded = retain_bulk(&mut players, &bulk);
    }

    let definitions = directory.to_definitions();
    RosterTable::from_players(&players).write_csv(&dir.join(ROSTER_CSV))?;
    UnitTable::build(UnitKind::Hero, &definitions.heroes, &players).write_csv(&dir.join(HEROES_CSV))?;
    UnitTable::build(UnitKind::Ship, &definitions.ships, &players).write_csv(&dir.join(SHIPS_CSV))?;
    record_datasets(
        &dir.join(REGISTRY_FILE),
        provider.name(),
        &[("roster", ROSTER_CSV), ("heroes", HEROES_CSV), ("ships", SHIPS_CSV)],
    )?;

    let outcome = SyncOutcome {
        members: players.len(),
        heroes: definitions.heroes.len(),
        ships: definitions.ships.len(),
        dropped_units,
        excluded,
    };
    info!(?outcome, provider = provider.name(), "tables synced");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::unit::{UnitDefinition, UnitDefinitions, UnitInstance, UnitStats};
    use crate::tables::{write_csv_rows, UnitTableStore};

    struct GuildFake;

    fn unit(base_id: &str, rarity: u8) -> UnitInstance {
        UnitInstance::new(
            base_id,
            UnitStats {
                rarity,
                gear_level: 12,
                level: 85,
                power: 25000,
            },
        )
    }

    impl DataProvider for GuildFake {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn fetch_player(&self, ally_code: u64) -> Result<PlayerData, RemoteError> {
            let mut player = match ally_code {
                111 => PlayerData::new(111, "Bob", 50000, 30000, 20000),
                222 => PlayerData::new(222, "Alice", 90000, 60000, 30000),
                _ => return Err(RemoteError::NotConfigured("player")),
            };
            player.add_unit(unit("REY", 7));
            player.add_unit(unit("EBONHAWK", 6));
            player.add_unit(unit("UNRELEASED", 1));
            Ok(player)
        }

        fn fetch_definitions(&self) -> Result<UnitDefinitions, RemoteError> {
            Ok(UnitDefinitions {
                heroes: vec![UnitDefinition::new("REY", "Rey", "Light Side Jedi", UnitKind::Hero)],
                ships: vec![UnitDefinition::new("EBONHAWK", "Ebon Hawk", "Light Side", UnitKind::Ship)],
            })
        }
    }

    fn seed(dir: &std::path::Path) {
        let rows = |raw: Vec<Vec<&str>>| -> Vec<Vec<String>> {
            raw.into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect()
        };
        write_csv_rows(
            &dir.join(ROSTER_CSV),
            &rows(vec![
                vec!["Name", "Ally Code", "GP", "GP Heroes", "GP Ships"],
                vec!["Bob", "111", "1", "1", "0"],
                vec!["Alice", "222", "1", "1", "0"],
            ]),
        )
        .expect("roster");
        let header = vec!["Unit", "Base ID", "Tags", "2*", "3*", "4*", "5*", "6*", "7*"];
        write_csv_rows(&dir.join(HEROES_CSV), &rows(vec![header.clone()])).expect("heroes");
        write_csv_rows(&dir.join(SHIPS_CSV), &rows(vec![header])).expect("ships");
        write_csv_rows(
            &dir.join("exclusions.csv"),
            &rows(vec![vec!["Unit", "Bob"], vec!["Rey", "x"]]),
        )
        .expect("exclusions");
    }

    #[test]
    fn sync_rewrites_tables_without_excluded_units() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());
        let config = GuildConfig {
            tables: dir.path().to_path_buf(),
            ..GuildConfig::default()
        };

        let outcome = sync_tables(&config, &GuildFake).expect("sync");
        assert_eq!(outcome.members, 2);
        assert_eq!(outcome.dropped_units, 2);
        assert_eq!(outcome.excluded, 1);

        let tables = LocalTables::load(&config.tables_location(), 50).expect("reload");
        assert_eq!(tables.roster.find_by_name("Bob").map(|r| r.gp), Some(50000));
        assert!(tables.heroes.member_instances("Bob").is_empty());
        assert_eq!(
            tables.heroes.member_instances("Alice")["REY"].stats.as_deref(),
            Some("7* G12 L85 P25000")
        );
        assert_eq!(tables.ships.member_instances("Bob").len(), 1);
        assert!(dir.path().join(REGISTRY_FILE).exists());
    }

    #[test]
    fn workbook_location_is_read_only() {
        let config = GuildConfig {
            tables: PathBuf::from("guild.xlsx"),
            ..GuildConfig::default()
        };
        assert!(matches!(
            sync_tables(&config, &GuildFake),
            Err(SyncError::ReadOnly(_))
        ));
    }
}
