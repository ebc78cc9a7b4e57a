//! Per-unit tables (heroes, ships): one row per unit definition, one column per member.
//!
//! Layout: `Unit, Base ID, Tags, 2*, 3*, 4*, 5*, 6*, 7*, <member...>`. A member cell holds the
//! stats string of that member's copy of the unit, or is blank when the unit is not owned.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::data::player::PlayerData;
use crate::data::unit::{UnitDefinition, UnitInstance, UnitKind, UnitStats, MAX_RARITY};
use crate::tables::{
    write_csv_rows, Cell, Grid, TableError, TableIssue, UnitTableStore, MAX_PLAYERS,
};

/// First member column; the columns before it hold the definition and owner counts.
pub const PLAYER_COL_OFFSET: usize = 9;
const MIN_COUNTED_RARITY: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    kind: UnitKind,
    definitions: Vec<UnitDefinition>,
    members: Vec<String>,
    instances: HashMap<String, HashMap<String, UnitInstance>>,
    issues: Vec<TableIssue>,
}

impl UnitTable {
    pub fn empty(kind: UnitKind) -> Self {
        UnitTable {
            kind,
            ..UnitTable::default()
        }
    }

    pub fn from_grid(grid: &Grid, kind: UnitKind) -> Self {
        let mut table = UnitTable::empty(kind);
        let Some(header) = grid.rows().first() else {
            return table;
        };

        // column index -> member name
        let members: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .skip(PLAYER_COL_OFFSET)
            .take(MAX_PLAYERS)
            .filter_map(|(column, cell)| cell.as_label().map(|name| (column, name)))
            .collect();
        table.members = members.iter().map(|(_, name)| name.clone()).collect();

        for (index, row) in grid.rows().iter().enumerate().skip(1) {
            let cell = |column: usize| row.get(column).unwrap_or(&Cell::Empty);
            let (Some(name), Some(base_id)) = (cell(0).as_text(), cell(1).as_text()) else {
                if !row.iter().all(Cell::is_blank) {
                    warn!(row = index, kind = kind.as_str(), "unit row skipped: missing name or base id");
                    table.issues.push(TableIssue {
                        row: index,
                        column: 0,
                        message: "missing unit name or base id".to_string(),
                    });
                }
                continue;
            };
            let tags = cell(2).as_text().unwrap_or("");
            let definition = UnitDefinition::new(base_id, name, tags, kind);

            for (column, member) in &members {
                let stats_cell = cell(*column);
                if stats_cell.is_blank() {
                    continue;
                }
                let raw = stats_cell.display();
                match raw.parse::<UnitStats>() {
                    Ok(stats) => {
                        let mut instance = UnitInstance::new(&definition.base_id, stats);
                        instance.enrich(&definition);
                        table
                            .instances
                            .entry(member.clone())
                            .or_default()
                            .insert(definition.base_id.clone(), instance);
                    }
                    Err(err) => {
                        warn!(row = index, member = %member, error = %err, "unit cell skipped");
                        table.issues.push(TableIssue {
                            row: index,
                            column: *column,
                            message: err.to_string(),
                        });
                    }
                }
            }
            table.definitions.push(definition);
        }
        table
    }

    /// Table for write-back: definitions in the given order, one column per player.
    /// Units a player owns that are not among `definitions` are left out.
    pub fn build(kind: UnitKind, definitions: &[UnitDefinition], players: &[PlayerData]) -> Self {
        let mut table = UnitTable::empty(kind);
        table.definitions = definitions.to_vec();
        for player in players {
            table.members.push(player.name.clone());
            let owned: HashMap<String, UnitInstance> = definitions
                .iter()
                .filter_map(|def| {
                    let mut unit = player.units.get(&def.base_id)?.clone();
                    unit.enrich(def);
                    Some((def.base_id.clone(), unit))
                })
                .collect();
            table.instances.insert(player.name.clone(), owned);
        }
        table
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn issues(&self) -> &[TableIssue] {
        &self.issues
    }

    /// Members owning `base_id` at `rarity` stars or more.
    pub fn owners_at_least(&self, base_id: &str, rarity: u8) -> usize {
        self.instances
            .values()
            .filter(|units| units.get(base_id).is_some_and(|u| u.rarity >= rarity))
            .count()
    }

    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut header: Vec<String> = vec!["Unit".into(), "Base ID".into(), "Tags".into()];
        header.extend((MIN_COUNTED_RARITY..=MAX_RARITY).map(|r| format!("{r}*")));
        header.extend(self.members.iter().cloned());

        let mut rows = vec![header];
        for def in &self.definitions {
            let mut row = vec![def.name.clone(), def.base_id.clone(), def.tags.clone()];
            row.extend(
                (MIN_COUNTED_RARITY..=MAX_RARITY)
                    .map(|r| self.owners_at_least(&def.base_id, r).to_string()),
            );
            row.extend(self.members.iter().map(|member| {
                self.instances
                    .get(member)
                    .and_then(|units| units.get(&def.base_id))
                    .map(UnitInstance::stats_string)
                    .unwrap_or_default()
            }));
            rows.push(row);
        }
        rows
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        write_csv_rows(path, &self.to_rows())
    }
}

impl UnitTableStore for UnitTable {
    fn definitions(&self) -> Vec<UnitDefinition> {
        self.definitions.clone()
    }

    fn all_instances_by_member(&self) -> HashMap<String, HashMap<String, UnitInstance>> {
        self.instances.clone()
    }

    fn member_instances(&self, member: &str) -> HashMap<String, UnitInstance> {
        self.instances.get(member).cloned().unwrap_or_default()
    }
}
