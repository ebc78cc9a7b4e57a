//! Per-member records: the roster row (base attributes) and the assembled [PlayerData].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::unit::UnitInstance;

/// Base attributes of one guild member as held by the roster table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub name: String,
    pub ally_code: u64,
    pub gp: u64,
    pub heroes_gp: u64,
    pub ships_gp: u64,
}

/// One player's units, keyed by base id.
///
/// `level` is the highest unit level seen so far, not the account level: the local tables
/// carry no account level, so both assembly paths derive it the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    pub ally_code: u64,
    pub name: String,
    pub gp: u64,
    pub heroes_gp: u64,
    pub ships_gp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default)]
    pub units: HashMap<String, UnitInstance>,
}

impl PlayerData {
    pub fn new(ally_code: u64, name: &str, gp: u64, heroes_gp: u64, ships_gp: u64) -> Self {
        PlayerData {
            ally_code,
            name: name.to_string(),
            gp,
            heroes_gp,
            ships_gp,
            level: None,
            units: HashMap::new(),
        }
    }

    pub fn from_roster_row(row: &RosterRow) -> Self {
        PlayerData::new(row.ally_code, &row.name, row.gp, row.heroes_gp, row.ships_gp)
    }

    pub fn roster_row(&self) -> RosterRow {
        RosterRow {
            name: self.name.clone(),
            ally_code: self.ally_code,
            gp: self.gp,
            heroes_gp: self.heroes_gp,
            ships_gp: self.ships_gp,
        }
    }

    /// Insert (or replace) a unit and keep the running level maximum current.
    pub fn add_unit(&mut self, unit: UnitInstance) {
        self.level = Some(self.level.map_or(unit.level, |level| level.max(unit.level)));
        self.units.insert(unit.base_id.clone(), unit);
    }

    /// Drop every unit, returning them; `level` is reset so it can be recomputed.
    pub fn take_units(&mut self) -> HashMap<String, UnitInstance> {
        self.level = None;
        std::mem::take(&mut self.units)
    }
}

/// Parse an ally code as typed by a person: `123-456-789`, `123 456 789` or `123456789`.
/// Zero and non-numeric input are rejected.
pub fn parse_ally_code(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '-' | ' '))
        .collect();
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().filter(|code| *code > 0)
}
