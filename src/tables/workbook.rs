//! Loads every local sheet from one location: a CSV directory or an xlsx workbook.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::data::exclusions::ExclusionMap;
use crate::data::unit::UnitKind;
use crate::report::events::EventTable;
use crate::tables::{read_csv_grid, read_xlsx_grid, Grid, RosterTable, TableError, UnitTable};

pub const ROSTER_SHEET: &str = "Roster";
pub const HEROES_SHEET: &str = "Heroes";
pub const SHIPS_SHEET: &str = "Ships";
pub const EXCLUSIONS_SHEET: &str = "Exclusions";
pub const EVENTS_SHEET: &str = "Events";

pub const ROSTER_CSV: &str = "roster.csv";
pub const HEROES_CSV: &str = "heroes.csv";
pub const SHIPS_CSV: &str = "ships.csv";
pub const EXCLUSIONS_CSV: &str = "exclusions.csv";
pub const EVENTS_CSV: &str = "events.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablesLocation {
    CsvDir(PathBuf),
    Workbook(PathBuf),
}

impl TablesLocation {
    /// A path ending in `.xlsx` is a workbook; anything else is a CSV directory.
    pub fn from_path(path: &Path) -> Self {
        let is_xlsx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if is_xlsx {
            TablesLocation::Workbook(path.to_path_buf())
        } else {
            TablesLocation::CsvDir(path.to_path_buf())
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TablesLocation::CsvDir(path) | TablesLocation::Workbook(path) => path,
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, TablesLocation::CsvDir(_))
    }

    fn read_sheet(&self, sheet: &str, file_name: &str) -> Result<Grid, TableError> {
        match self {
            TablesLocation::CsvDir(dir) => read_csv_grid(&dir.join(file_name)),
            TablesLocation::Workbook(path) => read_xlsx_grid(path, sheet),
        }
    }

    /// Like `read_sheet`, but a sheet that does not exist reads as an empty grid.
    fn read_optional_sheet(&self, sheet: &str, file_name: &str) -> Result<Grid, TableError> {
        match self {
            TablesLocation::CsvDir(dir) if !dir.join(file_name).exists() => {
                debug!(sheet, "optional sheet absent");
                Ok(Grid::default())
            }
            _ => match self.read_sheet(sheet, file_name) {
                Err(TableError::MissingSheet(_)) => {
                    debug!(sheet, "optional sheet absent");
                    Ok(Grid::default())
                }
                other => other,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalTables {
    pub roster: RosterTable,
    pub heroes: UnitTable,
    pub ships: UnitTable,
    pub exclusions: ExclusionMap,
    pub events: EventTable,
}

impl LocalTables {
    /// Roster, heroes and ships are required; exclusions and events may be absent.
    pub fn load(location: &TablesLocation, member_count: usize) -> Result<Self, TableError> {
        let roster = RosterTable::from_grid(&location.read_sheet(ROSTER_SHEET, ROSTER_CSV)?, member_count);
        let heroes = UnitTable::from_grid(&location.read_sheet(HEROES_SHEET, HEROES_CSV)?, UnitKind::Hero);
        let ships = UnitTable::from_grid(&location.read_sheet(SHIPS_SHEET, SHIPS_CSV)?, UnitKind::Ship);
        let exclusions =
            ExclusionMap::from_grid(&location.read_optional_sheet(EXCLUSIONS_SHEET, EXCLUSIONS_CSV)?);
        let events = EventTable::from_grid(&location.read_optional_sheet(EVENTS_SHEET, EVENTS_CSV)?);

        info!(
            location = %location.path().display(),
            members = roster.len(),
            heroes = heroes.members().len(),
            excluded_players = exclusions.len(),
            "local tables loaded"
        );
        Ok(LocalTables {
            roster,
            heroes,
            ships,
            exclusions,
            events,
        })
    }
}
