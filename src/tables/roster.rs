//! Roster sheet: `name, allyCode, gp, heroesGp, shipsGp` after one header row.

use std::path::Path;

use tracing::warn;

use crate::data::player::{parse_ally_code, PlayerData, RosterRow};
use crate::tables::{write_csv_rows, Cell, Grid, RosterStore, TableError, TableIssue, MAX_PLAYERS};

const HEADER: [&str; 5] = ["Name", "Ally Code", "GP", "GP Heroes", "GP Ships"];

#[derive(Debug, Clone, Default)]
pub struct RosterTable {
    rows: Vec<RosterRow>,
    issues: Vec<TableIssue>,
}

fn ally_code_cell(cell: &Cell) -> Option<u64> {
    match cell {
        Cell::Text(s) => parse_ally_code(s),
        other => other.as_u64().filter(|code| *code > 0),
    }
}

impl RosterTable {
    pub fn new(rows: Vec<RosterRow>) -> Self {
        RosterTable {
            rows,
            issues: Vec::new(),
        }
    }

    /// Roster rows in member order, as written back after a sync.
    pub fn from_players(players: &[PlayerData]) -> Self {
        RosterTable::new(players.iter().map(PlayerData::roster_row).collect())
    }

    /// Parse at most `member_count` data rows (never more than [MAX_PLAYERS]).
    /// Rows with a blank name are ignored; rows with unreadable numbers are skipped and
    /// reported through [RosterTable::issues].
    pub fn from_grid(grid: &Grid, member_count: usize) -> Self {
        let limit = member_count.min(MAX_PLAYERS);
        let mut table = RosterTable::default();

        for (index, row) in grid.rows().iter().enumerate().skip(1).take(limit) {
            let cell = |column: usize| row.get(column).unwrap_or(&Cell::Empty);
            let Some(name) = cell(0).as_label() else {
                continue;
            };
            let name = name.as_str();
            let Some(ally_code) = ally_code_cell(cell(1)) else {
                warn!(row = index, name, "roster row skipped: invalid ally code");
                table.issues.push(TableIssue {
                    row: index,
                    column: 1,
                    message: format!("invalid ally code for '{name}'"),
                });
                continue;
            };
            let numbers = [cell(2), cell(3), cell(4)].map(|c| c.as_u64());
            let [Some(gp), Some(heroes_gp), Some(ships_gp)] = numbers else {
                let column = 2 + numbers.iter().position(Option::is_none).unwrap_or(0);
                warn!(row = index, name, "roster row skipped: invalid galactic power");
                table.issues.push(TableIssue {
                    row: index,
                    column,
                    message: format!("invalid galactic power for '{name}'"),
                });
                continue;
            };
            table.rows.push(RosterRow {
                name: name.to_string(),
                ally_code,
                gp,
                heroes_gp,
                ships_gp,
            });
        }
        table
    }

    pub fn issues(&self) -> &[TableIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut out = vec![HEADER.iter().map(|h| h.to_string()).collect()];
        out.extend(self.rows.iter().map(|r| {
            vec![
                r.name.clone(),
                r.ally_code.to_string(),
                r.gp.to_string(),
                r.heroes_gp.to_string(),
                r.ships_gp.to_string(),
            ]
        }));
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        write_csv_rows(path, &self.to_rows())
    }
}

impl RosterStore for RosterTable {
    fn base_attributes(&self) -> &[RosterRow] {
        &self.rows
    }
}
